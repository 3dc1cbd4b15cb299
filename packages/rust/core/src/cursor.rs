//! Opaque cursor tokens carrying a [`Watermark`] through the caller.
//!
//! Token layout: `wt1.<base64url(json)>.<tag>`, where the tag is the first
//! 16 hex digits of SHA-256 over the signing key, version and payload.
//! Callers only ever see the token; only [`CursorCodec`] looks inside it.
//!
//! Reset policy: a token that fails validation (corrupt, tampered with,
//! or minted by an incompatible version) decodes to an `InvalidCursor`
//! error. [`CursorCodec::decode_or_reset`] turns that into the null
//! watermark and logs it. Delivery then restarts from the current fetch
//! window, so the caller may see events again; the platform's `meta.id`
//! dedup absorbs that, whereas a hard failure would wedge the trigger.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use wikitrigger_shared::{Result, Watermark, WikiTriggerError};

/// Version prefix of the current token format.
const CURSOR_VERSION: &str = "wt1";

/// Hex digits of the digest kept as the integrity tag.
const TAG_LEN: usize = 16;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CursorPayload {
    i: Option<String>,
    t: Option<i64>,
}

/// Encodes and decodes cursor tokens.
#[derive(Clone, Default)]
pub struct CursorCodec {
    key: Vec<u8>,
}

impl std::fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorCodec")
            .field("keyed", &!self.key.is_empty())
            .finish()
    }
}

impl CursorCodec {
    /// A codec signing with `key`; an empty key still detects corruption.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Encode a watermark as an opaque token.
    pub fn encode(&self, watermark: &Watermark) -> String {
        let payload = serde_json::json!({
            "i": watermark.last_id,
            "t": watermark.last_occurred_at.map(|t| t.timestamp()),
        })
        .to_string();
        let tag = self.tag(payload.as_bytes());
        format!(
            "{CURSOR_VERSION}.{}.{tag}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes())
        )
    }

    /// Decode a token. Absent or blank tokens are the null watermark.
    pub fn decode(&self, cursor: Option<&str>) -> Result<Watermark> {
        let Some(token) = cursor.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(Watermark::null());
        };

        let mut parts = token.split('.');
        let (Some(version), Some(body), Some(tag), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(WikiTriggerError::invalid_cursor("malformed token"));
        };
        if version != CURSOR_VERSION {
            return Err(WikiTriggerError::invalid_cursor(format!(
                "unsupported cursor version '{version}'"
            )));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|e| WikiTriggerError::invalid_cursor(format!("bad encoding: {e}")))?;
        if tag != self.tag(&payload) {
            return Err(WikiTriggerError::invalid_cursor("integrity check failed"));
        }

        let decoded: CursorPayload = serde_json::from_slice(&payload)
            .map_err(|e| WikiTriggerError::invalid_cursor(format!("bad payload: {e}")))?;

        match (decoded.i, decoded.t) {
            (None, None) => Ok(Watermark::null()),
            (Some(id), Some(secs)) if !id.is_empty() => {
                let at = DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
                    WikiTriggerError::invalid_cursor(format!("timestamp {secs} out of range"))
                })?;
                Ok(Watermark::at(id, at))
            }
            _ => Err(WikiTriggerError::invalid_cursor("incomplete watermark")),
        }
    }

    /// Decode, substituting the null watermark for an invalid token.
    /// Returns the watermark and whether a reset happened.
    pub fn decode_or_reset(&self, cursor: Option<&str>) -> (Watermark, bool) {
        match self.decode(cursor) {
            Ok(watermark) => (watermark, false),
            Err(e) => {
                warn!(error = %e, "resetting trigger to the null watermark; events may be redelivered");
                (Watermark::null(), true)
            }
        }
    }

    fn tag(&self, payload: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.key.len() as u64).to_be_bytes());
        hasher.update(&self.key);
        hasher.update(CURSOR_VERSION.as_bytes());
        hasher.update(payload);
        let mut hex = format!("{:x}", hasher.finalize());
        hex.truncate(TAG_LEN);
        hex
    }
}
