//! In-memory change log and async publisher: record updates in, certified
//! feed pages out.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::Arc;

use arc_swap::ArcSwap;
use metrics::{counter, gauge};
use rpde_core::{FeedId, FeedItem, ItemKind, ItemState, Position};
use rpde_feed::{FeedError, FeedPage};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Anything that can hand out ordered feed batches after a cursor.
///
/// The required methods are the seam a database-backed source would
/// implement; the provided ones run the page engine on top.
pub trait ChangeSource<Id: FeedId> {
    /// Items strictly after `(modified, id)`, at most `limit` of them,
    /// in feed order.
    fn batch_after_modified_id(&self, modified: i64, id: &Id, limit: usize) -> Vec<FeedItem<Id>>;

    /// Items strictly after the change number, at most `limit` of them,
    /// in feed order.
    fn batch_after_change_number(&self, after: i64, limit: usize) -> Vec<FeedItem<Id>>;

    fn page_after_modified_id(
        &self,
        base_url: &str,
        modified: i64,
        id: Id,
        limit: usize,
    ) -> Result<FeedPage<Id>, FeedError> {
        let batch = self.batch_after_modified_id(modified, &id, limit);
        FeedPage::after_modified_id(base_url, modified, id, batch)
    }

    fn page_after_change_number(
        &self,
        base_url: &str,
        after: i64,
        limit: usize,
    ) -> Result<FeedPage<Id>, FeedError> {
        FeedPage::after_change_number(base_url, after, self.batch_after_change_number(after, limit))
    }
}

/// Whether an update writes a record or retires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOp {
    Upsert,
    Delete,
}

/// One change observed against the published dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordUpdate<Id> {
    pub id: Id,
    pub kind: ItemKind,
    pub op: UpdateOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl<Id> RecordUpdate<Id> {
    pub fn upsert(kind: ItemKind, id: Id, data: serde_json::Value) -> Self {
        Self { id, kind, op: UpdateOp::Upsert, data: Some(data) }
    }

    pub fn delete(kind: ItemKind, id: Id) -> Self {
        Self { id, kind, op: UpdateOp::Delete, data: None }
    }
}

struct Entry {
    state: ItemState,
    kind: ItemKind,
    modified: i64,
    data: Option<serde_json::Value>,
}

/// Mutable change log keyed by record id.
///
/// Every `apply` assigns the next change number as the item's `modified`
/// marker, so a touched record moves to the back of the feed and appears
/// exactly once. Deletions stay in the log as tombstones.
pub struct ChangeLog<Id> {
    entries: FxHashMap<Id, Entry>,
    index: BTreeMap<Position<Id>, Id>,
    seq: i64,
}

impl<Id: FeedId + Hash> ChangeLog<Id> {
    pub fn new() -> Self {
        Self { entries: FxHashMap::default(), index: BTreeMap::new(), seq: 0 }
    }

    /// Number of live records plus tombstones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last assigned change number; 0 before the first update.
    pub fn seq(&self) -> i64 {
        self.seq
    }

    /// Fold one update into the log and return the change number it got.
    pub fn apply(&mut self, update: RecordUpdate<Id>) -> i64 {
        self.seq += 1;
        let modified = self.seq;
        if let Some(prev) = self.entries.get(&update.id) {
            self.index.remove(&Position::new(prev.modified, update.id.clone()));
        }
        let entry = match update.op {
            UpdateOp::Upsert => Entry {
                state: ItemState::Updated,
                kind: update.kind,
                modified,
                data: update.data,
            },
            UpdateOp::Delete => Entry {
                state: ItemState::Deleted,
                kind: update.kind,
                modified,
                data: None,
            },
        };
        self.index.insert(Position::new(modified, update.id.clone()), update.id.clone());
        self.entries.insert(update.id, entry);
        counter!("changelog_updates_total", 1u64);
        modified
    }

    /// Immutable, ordered view of the log as of now.
    pub fn freeze(&self) -> Arc<LogSnapshot<Id>> {
        let items = self
            .index
            .values()
            .map(|id| {
                let entry = &self.entries[id];
                FeedItem {
                    state: Some(entry.state),
                    kind: Some(entry.kind),
                    id: Some(id.clone()),
                    modified: Some(entry.modified),
                    data: entry.data.clone(),
                }
            })
            .collect();
        gauge!("changelog_records", self.entries.len() as f64);
        Arc::new(LogSnapshot { seq: self.seq, items })
    }
}

/// Frozen log: items in ascending `(modified, id)` order.
pub struct LogSnapshot<Id> {
    pub seq: i64,
    items: Vec<FeedItem<Id>>,
}

impl<Id> Default for LogSnapshot<Id> {
    fn default() -> Self {
        Self { seq: 0, items: Vec::new() }
    }
}

impl<Id> LogSnapshot<Id> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[FeedItem<Id>] {
        &self.items
    }
}

impl<Id: FeedId> ChangeSource<Id> for LogSnapshot<Id> {
    fn batch_after_modified_id(&self, modified: i64, id: &Id, limit: usize) -> Vec<FeedItem<Id>> {
        let start = self.items.partition_point(|item| match (item.modified, item.id.as_ref()) {
            (Some(m), Some(i)) => (m, i) <= (modified, id),
            _ => false,
        });
        self.items[start..].iter().take(limit).cloned().collect()
    }

    fn batch_after_change_number(&self, after: i64, limit: usize) -> Vec<FeedItem<Id>> {
        let start = self
            .items
            .partition_point(|item| item.modified.map_or(false, |m| m <= after));
        self.items[start..].iter().take(limit).cloned().collect()
    }
}

/// Reader side of a running publisher: snapshot access plus paging.
pub struct PublisherHandle<Id> {
    snap: Arc<ArcSwap<LogSnapshot<Id>>>,
    seq_rx: watch::Receiver<u64>,
}

impl<Id: FeedId> PublisherHandle<Id> {
    pub fn current(&self) -> Arc<LogSnapshot<Id>> {
        self.snap.load_full()
    }

    pub fn subscribe_seq(&self) -> watch::Receiver<u64> {
        self.seq_rx.clone()
    }

    pub fn page_after_modified_id(
        &self,
        base_url: &str,
        modified: i64,
        id: Id,
        limit: usize,
    ) -> Result<FeedPage<Id>, FeedError> {
        self.current().page_after_modified_id(base_url, modified, id, limit)
    }

    pub fn page_after_change_number(
        &self,
        base_url: &str,
        after: i64,
        limit: usize,
    ) -> Result<FeedPage<Id>, FeedError> {
        self.current().page_after_change_number(base_url, after, limit)
    }
}

/// Spawn a publisher loop consuming record updates and swapping log
/// snapshots. Returns a sender for updates and a handle for reads.
pub fn spawn_publisher<Id>(cap: usize) -> (mpsc::Sender<RecordUpdate<Id>>, PublisherHandle<Id>)
where
    Id: FeedId + Hash + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::channel::<RecordUpdate<Id>>(cap);
    let snap = Arc::new(ArcSwap::from_pointee(LogSnapshot::default()));
    let (seq_tx, seq_rx) = watch::channel(0u64);
    let snap_clone = Arc::clone(&snap);

    tokio::spawn(async move {
        let mut log = ChangeLog::new();
        let mut pending: Vec<RecordUpdate<Id>> = Vec::new();
        let mut ticker = tokio::time::interval(std::time::Duration::from_millis(8));
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    match maybe {
                        Some(u) => pending.push(u),
                        None => {
                            debug!("update channel closed; flushing and exiting publisher loop");
                            if !pending.is_empty() {
                                for u in pending.drain(..) { log.apply(u); }
                                let next = log.freeze();
                                let seq = next.seq as u64;
                                snap_clone.store(next);
                                let _ = seq_tx.send(seq);
                            }
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if !pending.is_empty() {
                        for u in pending.drain(..) { log.apply(u); }
                        let next = log.freeze();
                        let seq = next.seq as u64;
                        snap_clone.store(next);
                        let _ = seq_tx.send(seq);
                    }
                }
            }
        }
        info!("publisher loop stopped");
    });

    (tx, PublisherHandle { snap, seq_rx })
}
