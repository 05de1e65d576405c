//! Closed tagged union over three declared slot types.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Blank;

/// Which slot of a [`Union3`] holds the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    First,
    Second,
    Third,
}

/// A value that is exactly one of three declared shapes, or none.
///
/// Occupancy is the variant, so "at most one slot" holds by construction
/// and asking for an undeclared type is a compile error, not a runtime
/// one. `Empty` is a legal state of its own: record fields use it to
/// suppress emission entirely, and the slot constructors normalize blank
/// input down to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Union3<T1, T2, T3> {
    Empty,
    First(T1),
    Second(T2),
    Third(T3),
}

impl<T1, T2, T3> Union3<T1, T2, T3> {
    /// Load the first slot; blank input yields the empty union.
    pub fn first(value: impl Into<Option<T1>>) -> Self
    where
        T1: Blank,
    {
        match value.into() {
            Some(v) if !v.is_blank() => Union3::First(v),
            _ => Union3::Empty,
        }
    }

    /// Load the second slot; blank input yields the empty union.
    pub fn second(value: impl Into<Option<T2>>) -> Self
    where
        T2: Blank,
    {
        match value.into() {
            Some(v) if !v.is_blank() => Union3::Second(v),
            _ => Union3::Empty,
        }
    }

    /// Load the third slot; blank input yields the empty union.
    pub fn third(value: impl Into<Option<T3>>) -> Self
    where
        T3: Blank,
    {
        match value.into() {
            Some(v) if !v.is_blank() => Union3::Third(v),
            _ => Union3::Empty,
        }
    }

    pub fn slot(&self) -> Option<Slot> {
        match self {
            Union3::Empty => None,
            Union3::First(_) => Some(Slot::First),
            Union3::Second(_) => Some(Slot::Second),
            Union3::Third(_) => Some(Slot::Third),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Union3::Empty)
    }

    pub fn has_value(&self) -> bool {
        !self.is_empty()
    }

    pub fn as_first(&self) -> Option<&T1> {
        match self {
            Union3::First(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_second(&self) -> Option<&T2> {
        match self {
            Union3::Second(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_third(&self) -> Option<&T3> {
        match self {
            Union3::Third(v) => Some(v),
            _ => None,
        }
    }
}

impl<T1, T2, T3> Default for Union3<T1, T2, T3> {
    fn default() -> Self {
        Union3::Empty
    }
}

/// Renders the occupied value's own form; the empty union renders as the
/// empty string.
impl<T1, T2, T3> fmt::Display for Union3<T1, T2, T3>
where
    T1: fmt::Display,
    T2: fmt::Display,
    T3: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Union3::Empty => Ok(()),
            Union3::First(v) => v.fmt(f),
            Union3::Second(v) => v.fmt(f),
            Union3::Third(v) => v.fmt(f),
        }
    }
}

/// Untagged on the wire: the occupied value serializes bare, the empty
/// union as null. Record fields suppress the null with
/// `skip_serializing_if = "Union3::is_empty"`.
impl<T1, T2, T3> Serialize for Union3<T1, T2, T3>
where
    T1: Serialize,
    T2: Serialize,
    T3: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Union3::Empty => serializer.serialize_none(),
            Union3::First(v) => v.serialize(serializer),
            Union3::Second(v) => v.serialize(serializer),
            Union3::Third(v) => v.serialize(serializer),
        }
    }
}

/// Slots are tried in declared order, so declaration order is authoritative
/// when more than one slot could accept the input. Null, blank strings and
/// empty arrays read back as the empty union.
impl<'de, T1, T2, T3> Deserialize<'de> for Union3<T1, T2, T3>
where
    T1: DeserializeOwned + Blank,
    T2: DeserializeOwned + Blank,
    T3: DeserializeOwned + Blank,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        if is_blank_json(&raw) {
            return Ok(Union3::Empty);
        }
        if let Ok(v) = serde_json::from_value::<T1>(raw.clone()) {
            return Ok(Union3::first(v));
        }
        if let Ok(v) = serde_json::from_value::<T2>(raw.clone()) {
            return Ok(Union3::second(v));
        }
        if let Ok(v) = serde_json::from_value::<T3>(raw) {
            return Ok(Union3::third(v));
        }
        Err(serde::de::Error::custom(
            "value does not fit any declared union slot",
        ))
    }
}

fn is_blank_json(v: &serde_json::Value) -> bool {
    match v {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
