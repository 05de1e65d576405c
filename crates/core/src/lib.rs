//! RPDE protocol vocabulary: item states, record kinds, feed items.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod media;
pub mod vocab;

/// Lifecycle state of a feed item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Updated,
    Deleted,
}

/// Record type carried by a feed, named as it appears on the wire.
///
/// Combined kinds (`ScheduledSession.SessionSeries` and friends) mark feeds
/// whose item bodies embed the named related record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ItemKind {
    SessionSeries,
    ScheduledSession,
    #[serde(rename = "ScheduledSession.SessionSeries")]
    ScheduledSessionSessionSeries,
    #[serde(rename = "SessionSeries.ScheduledSession")]
    SessionSeriesScheduledSession,
    FacilityUse,
    IndividualFacilityUse,
    #[serde(rename = "FacilityUse/Slot")]
    FacilityUseSlot,
    #[serde(rename = "IndividualFacilityUse/Slot")]
    IndividualFacilityUseSlot,
    Event,
    HeadlineEvent,
    EventSeries,
    CourseInstance,
    Course,
}

impl ItemKind {
    pub fn wire_name(self) -> &'static str {
        match self {
            ItemKind::SessionSeries => "SessionSeries",
            ItemKind::ScheduledSession => "ScheduledSession",
            ItemKind::ScheduledSessionSessionSeries => "ScheduledSession.SessionSeries",
            ItemKind::SessionSeriesScheduledSession => "SessionSeries.ScheduledSession",
            ItemKind::FacilityUse => "FacilityUse",
            ItemKind::IndividualFacilityUse => "IndividualFacilityUse",
            ItemKind::FacilityUseSlot => "FacilityUse/Slot",
            ItemKind::IndividualFacilityUseSlot => "IndividualFacilityUse/Slot",
            ItemKind::Event => "Event",
            ItemKind::HeadlineEvent => "HeadlineEvent",
            ItemKind::EventSeries => "EventSeries",
            ItemKind::CourseInstance => "CourseInstance",
            ItemKind::Course => "Course",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Types usable as feed item identifiers: integers and strings in practice.
/// Blanket-implemented for anything with the right bounds.
pub trait FeedId: Clone + Ord + fmt::Display + Serialize {}

impl<T> FeedId for T where T: Clone + Ord + fmt::Display + Serialize {}

/// One change-log entry as served on the wire.
///
/// Field order is the wire order. Every field is optional so partially
/// formed items are representable; completeness is a page-level check,
/// not an item-level one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem<Id> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ItemState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    /// Monotonic change marker: epoch timestamp or change sequence number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl<Id> FeedItem<Id> {
    /// Item carrying a record body.
    pub fn updated(kind: ItemKind, id: Id, modified: i64, data: serde_json::Value) -> Self {
        Self {
            state: Some(ItemState::Updated),
            kind: Some(kind),
            id: Some(id),
            modified: Some(modified),
            data: Some(data),
        }
    }

    /// Tombstone: a deletion marker that carries no body.
    pub fn deleted(kind: ItemKind, id: Id, modified: i64) -> Self {
        Self {
            state: Some(ItemState::Deleted),
            kind: Some(kind),
            id: Some(id),
            modified: Some(modified),
            data: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.state == Some(ItemState::Deleted)
    }
}

/// Position in a feed's total order. The derived ordering is the feed
/// order: `modified` first, `id` as tie-break.
///
/// A cursor at some position means "everything up to and including this
/// position has been seen".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position<Id> {
    pub modified: i64,
    pub id: Id,
}

impl<Id> Position<Id> {
    pub fn new(modified: i64, id: Id) -> Self {
        Self { modified, id }
    }
}

impl<Id: fmt::Display> fmt::Display for Position<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.modified, self.id)
    }
}

pub mod prelude {
    pub use super::{FeedId, FeedItem, ItemKind, ItemState, Position};
}
