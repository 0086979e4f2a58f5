//! Parameter payload encoding for GET calls
//!
//! The API accepts read-style calls as GET requests but still expects the same
//! JSON parameter object as POST. The object is serialized compactly,
//! base64-encoded and sent as a single `_r` query parameter.

use base64::{Engine as _, engine::general_purpose};
use serde::Serialize;

/// Name of the query parameter carrying the encoded payload
pub const QUERY_PARAM: &str = "_r";

/// Empty parameter payload, serialized as `{}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoParams {}

/// Encode a parameter payload for the `_r` query parameter
///
/// `serde_json` emits no insignificant whitespace, so the encoded text is the
/// whitespace-free JSON form of `params`. Whitespace inside string values is
/// part of the data and is kept.
pub fn encode_get_payload<P: Serialize + ?Sized>(params: &P) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(params)?;
    Ok(general_purpose::STANDARD.encode(json))
}
