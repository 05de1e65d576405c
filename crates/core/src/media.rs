//! Discovery media types for feed and booking endpoints.

/// Media type of a feed page body.
pub const RPDE: &str = "application/vnd.openactive.rpde+json";

/// Media type of booking interaction bodies.
pub const BOOKING: &str = "application/vnd.openactive.booking+json";

/// Protocol version advertised in content negotiation.
pub const VERSION: u32 = 1;

/// Versioned equivalent of a media type, for Accept/Content-Type headers.
pub fn versioned(media_type: &str, version: u32) -> String {
    format!("{}; version={}", media_type, version)
}
