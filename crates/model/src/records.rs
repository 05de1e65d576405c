//! Compact record subset: enough concrete record types to exercise the
//! union model and the feed end to end. The exhaustive vocabulary lives
//! upstream; these carry the commonly-fed fields only.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{Blank, Identifier, JsonLd, Union3};

/// Declares the unit type serialized as a record's `@type` tag. The tag
/// is a required member, which is what lets union deserialization tell
/// record shapes apart.
macro_rules! jsonld_tag {
    ($name:ident => $tag:literal) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str($tag)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let got = String::deserialize(d)?;
                if got == $tag {
                    Ok($name)
                } else {
                    Err(serde::de::Error::custom(format!(
                        "expected @type {:?}, got {:?}",
                        $tag, got
                    )))
                }
            }
        }
    };
}

jsonld_tag!(SessionSeriesTag => "SessionSeries");
jsonld_tag!(PlaceTag => "Place");
jsonld_tag!(PostalAddressTag => "PostalAddress");
jsonld_tag!(GeoCoordinatesTag => "GeoCoordinates");
jsonld_tag!(OfferTag => "Offer");
jsonld_tag!(ConceptTag => "Concept");
jsonld_tag!(QuantitativeValueTag => "QuantitativeValue");
jsonld_tag!(PropertyValueTag => "PropertyValue");
jsonld_tag!(ImageObjectTag => "ImageObject");

/// A recurring bookable session, the record most feeds carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSeries {
    #[serde(rename = "@type")]
    pub type_tag: SessionSeriesTag,
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Union3::is_empty")]
    pub identifier: Identifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activity: Vec<Concept>,
    /// ISO 8601 duration, e.g. `P1D` or `PT1H30M`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Place>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image: Vec<ImageObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offers: Vec<Offer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_range: Option<QuantitativeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendee_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    #[serde(rename = "@type")]
    pub type_tag: PlaceTag,
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Union3::is_empty")]
    pub identifier: Identifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<PostalAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoCoordinates>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image: Vec<ImageObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    #[serde(rename = "@type")]
    pub type_tag: PostalAddressTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_country: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeoCoordinates {
    #[serde(rename = "@type")]
    pub type_tag: GeoCoordinatesTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(rename = "@type")]
    pub type_tag: OfferTag,
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Union3::is_empty")]
    pub identifier: Identifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_range: Option<QuantitativeValue>,
}

/// An entry in a published activity list, referenced by `@id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    #[serde(rename = "@type")]
    pub type_tag: ConceptTag,
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pref_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuantitativeValue {
    #[serde(rename = "@type")]
    pub type_tag: QuantitativeValueTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
}

/// A namespaced identifier, the structured shape of [`Identifier`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValue {
    #[serde(rename = "@type")]
    pub type_tag: PropertyValueTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "propertyID", skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageObject {
    #[serde(rename = "@type")]
    pub type_tag: ImageObjectTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
}

impl JsonLd for SessionSeries {
    fn type_name(&self) -> &'static str {
        "SessionSeries"
    }
}

impl JsonLd for Place {
    fn type_name(&self) -> &'static str {
        "Place"
    }
}

impl JsonLd for PostalAddress {
    fn type_name(&self) -> &'static str {
        "PostalAddress"
    }
}

impl JsonLd for GeoCoordinates {
    fn type_name(&self) -> &'static str {
        "GeoCoordinates"
    }
}

impl JsonLd for Offer {
    fn type_name(&self) -> &'static str {
        "Offer"
    }
}

impl JsonLd for Concept {
    fn type_name(&self) -> &'static str {
        "Concept"
    }
}

impl JsonLd for QuantitativeValue {
    fn type_name(&self) -> &'static str {
        "QuantitativeValue"
    }
}

impl JsonLd for PropertyValue {
    fn type_name(&self) -> &'static str {
        "PropertyValue"
    }
}

impl JsonLd for ImageObject {
    fn type_name(&self) -> &'static str {
        "ImageObject"
    }
}

// Constructed records always count as present in a union slot.
impl Blank for SessionSeries { fn is_blank(&self) -> bool { false } }
impl Blank for Place { fn is_blank(&self) -> bool { false } }
impl Blank for PostalAddress { fn is_blank(&self) -> bool { false } }
impl Blank for GeoCoordinates { fn is_blank(&self) -> bool { false } }
impl Blank for Offer { fn is_blank(&self) -> bool { false } }
impl Blank for Concept { fn is_blank(&self) -> bool { false } }
impl Blank for QuantitativeValue { fn is_blank(&self) -> bool { false } }
impl Blank for PropertyValue { fn is_blank(&self) -> bool { false } }
impl Blank for ImageObject { fn is_blank(&self) -> bool { false } }

/// A structured identifier's string form is its standalone JSON-LD document.
impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = self.to_jsonld_string().map_err(|_| fmt::Error)?;
        f.write_str(&doc)
    }
}
