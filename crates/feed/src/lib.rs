//! Page construction for RPDE feeds: certify an ordered batch, compute
//! the forward cursor, render the wire body.

#![forbid(unsafe_code)]

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use rpde_core::{vocab, FeedId, FeedItem, ItemState, Position};

/// Why a batch failed certification. Construction aborts on the first
/// violation; no partial page escapes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The caller's prior cursor re-appeared as the first item, which
    /// means the feed query loops instead of advancing.
    #[error("first item must never carry the same position as the {cursor} query parameter; check the feed query against the ordering strategy")]
    DegenerateCursor { cursor: &'static str },
    #[error("item {index}: deleted items must not contain data")]
    TombstoneWithData { index: usize },
    #[error("item {index}: all feed items must include id, modified, state and kind")]
    IncompleteItem { index: usize },
    #[error("item {index}: items must be ordered {order}; check the feed query against the ordering strategy")]
    OutOfOrder { index: usize, order: &'static str },
}

/// One ordering strategy: how an item's position is keyed for comparison
/// and how a position is encoded into cursor query parameters. The two
/// feed modes differ only through this trait; the certification walk is
/// written once.
pub trait OrderKey<Id> {
    type Key: Ord;

    fn key(modified: i64, id: &Id) -> Self::Key;
    /// Key of a possibly incomplete item, for the first-item cursor check.
    /// None when the fields this mode compares are absent.
    fn try_key(item: &FeedItem<Id>) -> Option<Self::Key>;
    fn encode(base_url: &str, key: &Self::Key) -> String;
    /// Query parameter names, for the degenerate-cursor message.
    fn cursor_params() -> &'static str;
    /// Ordering rule, for the out-of-order message.
    fn order_rule() -> &'static str;
}

/// `(modified, id)` ascending, id as the tie-break.
pub struct ModifiedIdKey;

impl<Id: FeedId> OrderKey<Id> for ModifiedIdKey {
    type Key = Position<Id>;

    fn key(modified: i64, id: &Id) -> Position<Id> {
        Position::new(modified, id.clone())
    }

    fn try_key(item: &FeedItem<Id>) -> Option<Position<Id>> {
        match (item.modified, &item.id) {
            (Some(modified), Some(id)) => Some(Position::new(modified, id.clone())),
            _ => None,
        }
    }

    fn encode(base_url: &str, key: &Position<Id>) -> String {
        format!(
            "{}?{}={}&{}={}",
            base_url,
            vocab::PARAM_AFTER_TIMESTAMP,
            key.modified,
            vocab::PARAM_AFTER_ID,
            key.id
        )
    }

    fn cursor_params() -> &'static str {
        "afterTimestamp and afterId"
    }

    fn order_rule() -> &'static str {
        "first by 'modified', then by 'id'"
    }
}

/// Change sequence number alone; the id never breaks ties.
pub struct ChangeNumberKey;

impl<Id: FeedId> OrderKey<Id> for ChangeNumberKey {
    type Key = i64;

    fn key(modified: i64, _id: &Id) -> i64 {
        modified
    }

    fn try_key(item: &FeedItem<Id>) -> Option<i64> {
        item.modified
    }

    fn encode(base_url: &str, key: &i64) -> String {
        format!("{}?{}={}", base_url, vocab::PARAM_AFTER_CHANGE_NUMBER, key)
    }

    fn cursor_params() -> &'static str {
        "afterChangeNumber"
    }

    fn order_rule() -> &'static str {
        "by 'modified'"
    }
}

/// One served page: certified items plus the forward cursor.
///
/// Field order is the wire order. Items are kept exactly as received;
/// certification rejects a misordered batch rather than re-sorting it,
/// so a misbehaving source is caught instead of silently corrupting
/// client cursors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedPage<Id> {
    pub next: String,
    pub items: Vec<FeedItem<Id>>,
    pub license: String,
}

impl<Id: FeedId> FeedPage<Id> {
    /// Certify a batch ordered by `(modified, id)` and compute the next
    /// cursor, given the position the caller claims to have seen.
    pub fn after_modified_id(
        feed_base_url: &str,
        modified: i64,
        id: Id,
        items: Vec<FeedItem<Id>>,
    ) -> Result<Self, FeedError> {
        Self::build::<ModifiedIdKey>(feed_base_url, Position::new(modified, id), items)
    }

    /// Certify a batch ordered by change number alone.
    pub fn after_change_number(
        feed_base_url: &str,
        change_number: i64,
        items: Vec<FeedItem<Id>>,
    ) -> Result<Self, FeedError> {
        Self::build::<ChangeNumberKey>(feed_base_url, change_number, items)
    }

    fn build<K: OrderKey<Id>>(
        feed_base_url: &str,
        after: K::Key,
        mut items: Vec<FeedItem<Id>>,
    ) -> Result<Self, FeedError> {
        let started = std::time::Instant::now();
        let last_key = certify::<Id, K>(&items, &after)?;
        for item in items.iter_mut() {
            embed_context(&mut item.data);
        }
        let next = match last_key {
            Some(ref key) => K::encode(feed_base_url, key),
            None => K::encode(feed_base_url, &after),
        };
        histogram!("feed_page_build_ms", started.elapsed().as_secs_f64() * 1000.0);
        counter!("feed_pages_built_total", 1u64);
        debug!(count = items.len(), next = %next, "page certified");
        Ok(Self {
            next,
            items,
            license: vocab::LICENSE_CC_BY_4_0.to_string(),
        })
    }

    /// Wire body: `{"next":..,"items":[..],"license":..}` with items in
    /// certified order.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Single front-to-back pass over the batch: degenerate cursor, tombstone
/// payloads, completeness, strict order. Returns the last item's key, or
/// None for an empty batch (end-of-feed pages skip validation and re-encode
/// the caller's cursor).
fn certify<Id: FeedId, K: OrderKey<Id>>(
    items: &[FeedItem<Id>],
    after: &K::Key,
) -> Result<Option<K::Key>, FeedError> {
    if let Some(key) = items.first().and_then(K::try_key) {
        if key == *after {
            return Err(FeedError::DegenerateCursor {
                cursor: K::cursor_params(),
            });
        }
    }

    let mut best: Option<K::Key> = None;
    for (index, item) in items.iter().enumerate() {
        if item.state == Some(ItemState::Deleted) && item.data.is_some() {
            return Err(FeedError::TombstoneWithData { index });
        }
        let (modified, id) = match (item.state, item.kind, item.modified, &item.id) {
            (Some(_), Some(_), Some(m), Some(i)) => (m, i),
            _ => return Err(FeedError::IncompleteItem { index }),
        };
        let key = K::key(modified, id);
        match best {
            Some(ref b) if key <= *b => {
                return Err(FeedError::OutOfOrder {
                    index,
                    order: K::order_rule(),
                });
            }
            _ => best = Some(key),
        }
    }
    Ok(best)
}

/// Put the vocabulary context at the top of a present body. Bodies arrive
/// context-free from the renderer; one that already carries a context is
/// left alone, and non-object bodies pass through untouched.
fn embed_context(data: &mut Option<serde_json::Value>) {
    if let Some(serde_json::Value::Object(map)) = data {
        map.entry(vocab::CONTEXT_KEY.to_string())
            .or_insert_with(|| serde_json::Value::String(vocab::CONTEXT.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modified_id_key_breaks_ties_by_id() {
        let low = <ModifiedIdKey as OrderKey<i64>>::key(4, &1);
        let high = <ModifiedIdKey as OrderKey<i64>>::key(4, &2);
        let later = <ModifiedIdKey as OrderKey<i64>>::key(5, &1);
        assert!(low < high && high < later);
    }

    #[test]
    fn change_number_key_ignores_id() {
        assert_eq!(<ChangeNumberKey as OrderKey<i64>>::key(4, &9), 4);
        assert_eq!(<ChangeNumberKey as OrderKey<String>>::key(7, &"x".to_string()), 7);
    }

    #[test]
    fn first_item_key_is_mode_specific() {
        let item = FeedItem::<i64> {
            state: Some(ItemState::Updated),
            kind: None,
            id: None,
            modified: Some(4),
            data: None,
        };
        assert_eq!(<ChangeNumberKey as OrderKey<i64>>::try_key(&item), Some(4));
        assert!(<ModifiedIdKey as OrderKey<i64>>::try_key(&item).is_none());
    }

    #[test]
    fn cursor_encoding() {
        let key = Position::new(5, "1".to_string());
        assert_eq!(
            <ModifiedIdKey as OrderKey<String>>::encode("https://example.com/feed", &key),
            "https://example.com/feed?afterTimestamp=5&afterId=1"
        );
        assert_eq!(
            <ChangeNumberKey as OrderKey<String>>::encode("https://example.com/feed", &5),
            "https://example.com/feed?afterChangeNumber=5"
        );
    }

    #[test]
    fn embed_context_is_idempotent_and_object_only() {
        let mut data = Some(serde_json::json!({"name": "Tai Chi"}));
        embed_context(&mut data);
        embed_context(&mut data);
        assert_eq!(
            data,
            Some(serde_json::json!({
                "@context": "https://openactive.io/",
                "name": "Tai Chi"
            }))
        );

        let mut absent: Option<serde_json::Value> = None;
        embed_context(&mut absent);
        assert!(absent.is_none());
    }
}
