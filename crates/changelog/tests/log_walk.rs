#![forbid(unsafe_code)]

use rpde_changelog::{ChangeLog, ChangeSource, RecordUpdate};
use rpde_core::{ItemKind, ItemState};

const FEED: &str = "https://www.example.com/feed";

fn class(name: &str) -> serde_json::Value {
    serde_json::json!({ "@type": "SessionSeries", "name": name })
}

#[test]
fn log_coalesces_updates_per_record() {
    let mut log = ChangeLog::new();
    log.apply(RecordUpdate::upsert(ItemKind::SessionSeries, "a".to_string(), class("Yoga")));
    log.apply(RecordUpdate::upsert(ItemKind::SessionSeries, "b".to_string(), class("Pilates")));
    log.apply(RecordUpdate::upsert(ItemKind::SessionSeries, "a".to_string(), class("Hot Yoga")));

    let snap = log.freeze();
    assert_eq!(snap.len(), 2);
    // touching "a" again moved it behind "b"
    let items = snap.items();
    assert_eq!(items[0].id.as_deref(), Some("b"));
    assert_eq!(items[0].modified, Some(2));
    assert_eq!(items[1].id.as_deref(), Some("a"));
    assert_eq!(items[1].modified, Some(3));
    assert_eq!(items[1].data, Some(class("Hot Yoga")));
}

#[test]
fn deletion_becomes_an_advancing_tombstone() {
    let mut log = ChangeLog::new();
    log.apply(RecordUpdate::upsert(ItemKind::SessionSeries, "a".to_string(), class("Yoga")));
    log.apply(RecordUpdate::delete(ItemKind::SessionSeries, "a".to_string()));

    let snap = log.freeze();
    assert_eq!(snap.len(), 1);
    let item = &snap.items()[0];
    assert_eq!(item.state, Some(ItemState::Deleted));
    assert_eq!(item.modified, Some(2));
    assert!(item.data.is_none());
    assert_eq!(log.seq(), 2);
}

#[test]
fn full_walk_reaches_a_stable_next_url() {
    let mut log = ChangeLog::new();
    for (n, name) in ["Yoga", "Pilates", "Tai Chi", "Boxing", "Spin"].iter().enumerate() {
        log.apply(RecordUpdate::upsert(ItemKind::SessionSeries, format!("r{}", n), class(name)));
    }
    log.apply(RecordUpdate::delete(ItemKind::SessionSeries, "r1".to_string()));

    let snap = log.freeze();
    let mut after = (0i64, String::new());
    let mut seen = Vec::new();
    loop {
        let page = snap
            .page_after_modified_id(FEED, after.0, after.1.clone(), 2)
            .unwrap();
        if page.items.is_empty() {
            break;
        }
        for item in &page.items {
            seen.push((item.modified.unwrap(), item.id.clone().unwrap()));
        }
        let last = page.items.last().unwrap();
        after = (last.modified.unwrap(), last.id.clone().unwrap());
    }
    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "walk must follow feed order");
    assert_eq!(seen.last().map(|p| p.1.as_str()), Some("r1"));

    // polling at the end keeps handing back the same cursor
    let tail = snap
        .page_after_modified_id(FEED, after.0, after.1.clone(), 2)
        .unwrap();
    assert_eq!(
        tail.next,
        format!("{}?afterTimestamp={}&afterId={}", FEED, after.0, after.1)
    );
    assert!(tail.items.is_empty());
}

#[test]
fn change_number_walk_matches_assigned_sequence() {
    let mut log = ChangeLog::new();
    log.apply(RecordUpdate::upsert(ItemKind::FacilityUse, 10i64, class("Court")));
    log.apply(RecordUpdate::upsert(ItemKind::FacilityUse, 11i64, class("Pool")));
    let snap = log.freeze();

    let page = snap.page_after_change_number(FEED, 0, 16).unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next, "https://www.example.com/feed?afterChangeNumber=2");

    let page = snap.page_after_change_number(FEED, 2, 16).unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.next, "https://www.example.com/feed?afterChangeNumber=2");
}

#[test]
fn limit_slices_the_ordered_batch() {
    let mut log = ChangeLog::new();
    for n in 0..7i64 {
        log.apply(RecordUpdate::upsert(ItemKind::ScheduledSession, n, class("Session")));
    }
    let snap = log.freeze();

    let batch = snap.batch_after_modified_id(2, &1i64, 3);
    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0].modified, Some(3));
    assert_eq!(batch[2].modified, Some(5));

    let batch = snap.batch_after_change_number(5, 16);
    assert_eq!(batch.len(), 2);
}
