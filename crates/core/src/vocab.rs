//! Stable protocol strings: envelope constants, JSON-LD keys, cursor
//! query parameters.

// ---------------- Page envelope ----------------
/// Every served page carries this license.
pub const LICENSE_CC_BY_4_0: &str = "https://creativecommons.org/licenses/by/4.0/";

// ---------------- JSON-LD vocabulary ----------------
/// Vocabulary context injected at the top level of each item body.
pub const CONTEXT: &str = "https://openactive.io/";
pub const CONTEXT_KEY: &str = "@context";

// ---------------- Cursor query parameters ----------------
pub const PARAM_AFTER_TIMESTAMP: &str = "afterTimestamp";
pub const PARAM_AFTER_ID: &str = "afterId";
pub const PARAM_AFTER_CHANGE_NUMBER: &str = "afterChangeNumber";
