//! The authorization model every generated tuple is written against.
//!
//! Four types: `user`, `repo`, `team` and `org`. A repo's `admin` is direct or
//! inherited from `repo_admin` on the owning org; `writer` includes `admin`;
//! `reader` includes `writer` and may be granted to `user:*`.
//!
//! The document is sent to the service byte for byte as stored in
//! `assets/authorization_model.json`.

/// The authorization model document (OpenFGA JSON, schema 1.1).
pub const AUTHORIZATION_MODEL_JSON: &str = include_str!("../assets/authorization_model.json");

/// Parses the embedded model.
///
/// The asset is checked by this crate's tests, so a parse failure here means
/// the binary was built from a corrupted asset.
pub fn authorization_model() -> serde_json::Result<serde_json::Value> {
    serde_json::from_str(AUTHORIZATION_MODEL_JSON)
}
