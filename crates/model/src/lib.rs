//! Record model: the union-value type, the JSON-LD render seam, and a
//! compact subset of record types exercising both.

#![forbid(unsafe_code)]

use serde::Serialize;
use thiserror::Error;

use rpde_core::vocab;

pub mod records;
pub mod union;

pub use records::{
    Concept, GeoCoordinates, ImageObject, Offer, Place, PostalAddress, PropertyValue,
    QuantitativeValue, SessionSeries,
};
pub use union::{Slot, Union3};

/// Identifier fields: a bare number, a string code, or a structured
/// property value.
pub type Identifier = Union3<i64, String, PropertyValue>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("render: {0}")]
    Render(#[from] serde_json::Error),
    #[error("rendered body is not a JSON object")]
    NotAnObject,
}

/// Absence rule applied when loading union slots: blank input normalizes
/// to the empty union. Empty and whitespace-only strings count as blank,
/// as do empty collections.
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Blank for i64 {
    fn is_blank(&self) -> bool {
        false
    }
}

impl Blank for f64 {
    fn is_blank(&self) -> bool {
        false
    }
}

impl Blank for bool {
    fn is_blank(&self) -> bool {
        false
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Rendered-record seam the page layer consumes: a vocabulary context plus
/// a compact, context-free JSON body.
pub trait JsonLd: Serialize {
    /// Type name as emitted in `@type`.
    fn type_name(&self) -> &'static str;

    /// Vocabulary context the record's terms come from.
    fn context(&self) -> &'static str {
        vocab::CONTEXT
    }

    /// Compact JSON object for embedding in a feed item. Blank members are
    /// pruned, and any top-level `@context` is stripped: context placement
    /// belongs to the page, not the record.
    fn to_jsonld(&self) -> Result<serde_json::Value, ModelError> {
        let mut value = serde_json::to_value(self)?;
        match value {
            serde_json::Value::Object(ref mut map) => {
                map.remove(vocab::CONTEXT_KEY);
            }
            _ => return Err(ModelError::NotAnObject),
        }
        prune_blank_members(&mut value);
        Ok(value)
    }

    /// Standalone document: the compact body with the context embedded.
    fn to_jsonld_string(&self) -> Result<String, ModelError> {
        let mut value = self.to_jsonld()?;
        if let serde_json::Value::Object(ref mut map) = value {
            map.insert(
                vocab::CONTEXT_KEY.to_string(),
                serde_json::Value::String(self.context().to_string()),
            );
        }
        Ok(serde_json::to_string(&value)?)
    }
}

/// Drop object members that are null or blank strings, recursively.
/// Array elements are kept as-is; empty collections are already suppressed
/// at the field level.
fn prune_blank_members(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            map.retain(|_, v| {
                !matches!(v, serde_json::Value::Null)
                    && !matches!(v, serde_json::Value::String(s) if s.trim().is_empty())
            });
            for v in map.values_mut() {
                prune_blank_members(v);
            }
        }
        serde_json::Value::Array(items) => {
            for v in items.iter_mut() {
                prune_blank_members(v);
            }
        }
        _ => {}
    }
}
