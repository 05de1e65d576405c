use rpde_core::{FeedItem, ItemKind};
use rpde_feed::{FeedError, FeedPage};

const FEED: &str = "https://www.example.com/feed";

fn body() -> serde_json::Value {
    serde_json::json!({
        "@type": "SessionSeries",
        "name": "Tai Chi",
    })
}

fn upd(id: &str, modified: i64) -> FeedItem<String> {
    FeedItem::updated(ItemKind::SessionSeries, id.to_string(), modified, body())
}

fn del(id: &str, modified: i64) -> FeedItem<String> {
    FeedItem::deleted(ItemKind::SessionSeries, id.to_string(), modified)
}

#[test]
fn ascending_batch_encodes_last_position() {
    let page =
        FeedPage::after_modified_id(FEED, 1, "1".to_string(), vec![upd("2", 4), del("1", 5)])
            .unwrap();
    assert_eq!(
        page.next,
        "https://www.example.com/feed?afterTimestamp=5&afterId=1"
    );
    assert_eq!(page.license, "https://creativecommons.org/licenses/by/4.0/");
    assert_eq!(page.items.len(), 2);
}

#[test]
fn wire_body_matches_protocol_shape() {
    let page =
        FeedPage::after_modified_id(FEED, 1, "1".to_string(), vec![upd("2", 4), del("1", 5)])
            .unwrap();
    let expected = concat!(
        "{\"next\":\"https://www.example.com/feed?afterTimestamp=5&afterId=1\",",
        "\"items\":[",
        "{\"state\":\"updated\",\"kind\":\"SessionSeries\",\"id\":\"2\",\"modified\":4,",
        "\"data\":{\"@context\":\"https://openactive.io/\",\"@type\":\"SessionSeries\",\"name\":\"Tai Chi\"}},",
        "{\"state\":\"deleted\",\"kind\":\"SessionSeries\",\"id\":\"1\",\"modified\":5}",
        "],",
        "\"license\":\"https://creativecommons.org/licenses/by/4.0/\"}",
    );
    assert_eq!(page.to_json_string().unwrap(), expected);
}

#[test]
fn modified_ties_break_by_ascending_id() {
    let page =
        FeedPage::after_modified_id(FEED, 1, "1".to_string(), vec![upd("1", 4), upd("2", 4)])
            .unwrap();
    assert_eq!(
        page.next,
        "https://www.example.com/feed?afterTimestamp=4&afterId=2"
    );
}

#[test]
fn decreasing_modified_is_rejected() {
    let err =
        FeedPage::after_modified_id(FEED, 1, "1".to_string(), vec![upd("2", 5), del("1", 4)])
            .unwrap_err();
    assert!(matches!(err, FeedError::OutOfOrder { index: 1, .. }));
    assert!(err
        .to_string()
        .contains("items must be ordered first by 'modified', then by 'id'"));
}

#[test]
fn duplicate_position_is_rejected() {
    let err =
        FeedPage::after_modified_id(FEED, 1, "9".to_string(), vec![upd("1", 4), upd("1", 4)])
            .unwrap_err();
    assert!(matches!(err, FeedError::OutOfOrder { index: 1, .. }));
}

#[test]
fn decreasing_id_on_equal_modified_is_rejected() {
    let err =
        FeedPage::after_modified_id(FEED, 1, "9".to_string(), vec![upd("2", 4), del("1", 4)])
            .unwrap_err();
    assert!(matches!(err, FeedError::OutOfOrder { index: 1, .. }));
}

#[test]
fn change_number_mode_rejects_equal_modified() {
    let err = FeedPage::after_change_number(FEED, 1, vec![upd("2", 4), del("1", 4)]).unwrap_err();
    assert!(matches!(err, FeedError::OutOfOrder { index: 1, .. }));
    assert!(err.to_string().contains("items must be ordered by 'modified'"));
}

#[test]
fn tombstone_with_data_is_rejected_anywhere() {
    let mut bad = del("1", 5);
    bad.data = Some(body());

    let err = FeedPage::after_modified_id(
        FEED,
        1,
        "9".to_string(),
        vec![upd("2", 4), bad.clone()],
    )
    .unwrap_err();
    assert_eq!(err, FeedError::TombstoneWithData { index: 1 });
    assert!(err.to_string().contains("deleted items must not contain data"));

    let err = FeedPage::after_change_number(FEED, 1, vec![bad]).unwrap_err();
    assert_eq!(err, FeedError::TombstoneWithData { index: 0 });
}

#[test]
fn tombstone_check_precedes_completeness() {
    let mut item = del("1", 5);
    item.kind = None;
    item.data = Some(body());
    let err = FeedPage::after_modified_id(FEED, 1, "9".to_string(), vec![item]).unwrap_err();
    assert_eq!(err, FeedError::TombstoneWithData { index: 0 });
}

#[test]
fn missing_metadata_is_rejected() {
    let mut no_kind = upd("2", 4);
    no_kind.kind = None;
    let err = FeedPage::after_change_number(FEED, 1, vec![no_kind]).unwrap_err();
    assert_eq!(err, FeedError::IncompleteItem { index: 0 });
    assert!(err
        .to_string()
        .contains("must include id, modified, state and kind"));

    let mut no_id = upd("2", 4);
    no_id.id = None;
    let err =
        FeedPage::after_modified_id(FEED, 1, "9".to_string(), vec![no_id]).unwrap_err();
    assert_eq!(err, FeedError::IncompleteItem { index: 0 });
}

#[test]
fn degenerate_cursor_is_rejected_in_both_modes() {
    let err =
        FeedPage::after_modified_id(FEED, 4, "2".to_string(), vec![upd("2", 4), del("1", 5)])
            .unwrap_err();
    assert!(matches!(err, FeedError::DegenerateCursor { .. }));
    assert!(err.to_string().contains("must never carry the same position"));

    let err =
        FeedPage::after_change_number(FEED, 4, vec![upd("2", 4), del("1", 5)]).unwrap_err();
    assert!(matches!(err, FeedError::DegenerateCursor { .. }));
}

#[test]
fn empty_batch_reencodes_the_callers_cursor() {
    let page = FeedPage::after_modified_id(FEED, 1, "1".to_string(), vec![]).unwrap();
    assert_eq!(
        page.next,
        "https://www.example.com/feed?afterTimestamp=1&afterId=1"
    );
    assert!(page.items.is_empty());

    let page = FeedPage::<i64>::after_change_number(FEED, 4, vec![]).unwrap();
    assert_eq!(page.next, "https://www.example.com/feed?afterChangeNumber=4");
}

#[test]
fn integer_id_feeds_work_end_to_end() {
    let items = vec![
        FeedItem::updated(ItemKind::FacilityUseSlot, 2i64, 4, body()),
        FeedItem::deleted(ItemKind::FacilityUseSlot, 1i64, 5),
    ];
    let page = FeedPage::after_modified_id(FEED, 1, 1i64, items).unwrap();
    assert_eq!(
        page.next,
        "https://www.example.com/feed?afterTimestamp=5&afterId=1"
    );
    let json = page.to_json_string().unwrap();
    assert!(json.contains("\"kind\":\"FacilityUse/Slot\""));
    assert!(json.contains("\"id\":2,"));
}

#[test]
fn update_without_body_passes_certification() {
    let mut item = upd("2", 4);
    item.data = None;
    let page = FeedPage::after_modified_id(FEED, 1, "1".to_string(), vec![item]).unwrap();
    assert!(page.items[0].data.is_none());
}

#[test]
fn record_bodies_flow_through_with_one_context() {
    use rpde_model::{JsonLd, Place, SessionSeries};

    let series = SessionSeries {
        name: Some("Virtual BODYPUMP".to_string()),
        location: Some(Place {
            name: Some("Santa Clara City Library".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let item = FeedItem::updated(
        ItemKind::SessionSeries,
        "12345".to_string(),
        3,
        series.to_jsonld().unwrap(),
    );
    let page = FeedPage::after_modified_id(FEED, 0, String::new(), vec![item]).unwrap();
    let json = page.to_json_string().unwrap();
    assert!(json.contains(
        "\"data\":{\"@context\":\"https://openactive.io/\",\"@type\":\"SessionSeries\""
    ));
    assert!(json.contains("\"location\":{\"@type\":\"Place\""));
    assert_eq!(json.matches("@context").count(), 1);
}

#[test]
fn served_page_reparses_and_recertifies() {
    let page =
        FeedPage::after_modified_id(FEED, 1, "1".to_string(), vec![upd("2", 4), del("1", 5)])
            .unwrap();
    let json = page.to_json_string().unwrap();
    let back: FeedPage<String> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, page);

    // A consumer can re-run certification on what it was served.
    let again = FeedPage::after_modified_id(FEED, 1, "1".to_string(), back.items).unwrap();
    assert_eq!(again.next, page.next);
}
