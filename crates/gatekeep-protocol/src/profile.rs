//! Parsing of profile service responses.
//!
//! Both profile lookups (name → account) and join checks answer with the
//! same JSON object. An HTTP 204 / empty body means "no such account" and
//! is mapped to `Ok(None)` by [`PremiumProfile::from_json_body`].

use crate::{PremiumProfile, ProtocolError};

impl PremiumProfile {
    /// Parses a profile from a JSON document.
    ///
    /// # Errors
    /// Returns [`ProtocolError::ProfileDecode`] if the document is not a
    /// profile object or its `id` is not a UUID.
    pub fn from_json(data: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::ProfileDecode)
    }

    /// Like [`from_json`](Self::from_json), but treats an empty (or
    /// whitespace-only) body as "account not found".
    ///
    /// # Errors
    /// Same as [`from_json`](Self::from_json) for non-empty bodies.
    pub fn from_json_body(data: &[u8]) -> Result<Option<Self>, ProtocolError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Self::from_json(data).map(Some)
    }
}
