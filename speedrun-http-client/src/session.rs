//! Session credential storage and `set-cookie` parsing

use crate::error::SpeedrunError;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use zeroize::{Zeroize, Zeroizing};

/// Cookie name the server uses for its session identifier
pub const SESSION_COOKIE: &str = "PHPSESSID";

static SESSION_REGEX: OnceLock<Regex> = OnceLock::new();

/// Get or compile the session cookie regex
fn session_regex() -> &'static Regex {
    SESSION_REGEX.get_or_init(|| Regex::new(r"(?:^|[;\s])PHPSESSID=([^;]+)").unwrap())
}

/// Extract a rotated session identifier from response headers
///
/// Looks at every `set-cookie` header and returns the value following
/// `PHPSESSID=` up to the next `;`. Returns `None` when no header carries a
/// non-empty session identifier.
pub fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    let regex = session_regex();
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let captures = regex.captures(cookie)?;
            let id = captures.get(1)?.as_str().trim();
            (!id.is_empty()).then(|| id.to_string())
        })
}

/// Create a sensitive cookie header value from a session identifier
///
/// The header is flagged sensitive so it never shows up in `Debug` output,
/// and the temporary string is zeroized after use.
pub(crate) fn create_cookie_header(session: &str) -> Result<HeaderValue, SpeedrunError> {
    let mut cookie_string = format!("{}={}", SESSION_COOKIE, session);
    let header_value = HeaderValue::from_bytes(cookie_string.as_bytes());
    cookie_string.zeroize();

    let mut sensitive_header = header_value
        .map_err(|_| SpeedrunError::ClientInit("Invalid session cookie format".to_string()))?;
    sensitive_header.set_sensitive(true);
    Ok(sensitive_header)
}

/// Outbound session cookie shared by a client and its clones
///
/// The slot is not a synchronization point for the session protocol: two
/// in-flight calls may both read the old value before either stores a
/// rotated one.
#[derive(Clone, Debug, Default)]
pub(crate) struct SessionSlot {
    cookie: Arc<RwLock<Option<HeaderValue>>>,
}

impl SessionSlot {
    /// Store a new session identifier, replacing any previous one
    pub fn set(&self, session: &str) -> Result<(), SpeedrunError> {
        let header = create_cookie_header(session)?;
        *self.cookie.write().unwrap_or_else(PoisonError::into_inner) = Some(header);
        Ok(())
    }

    /// Drop the stored session identifier
    pub fn clear(&self) {
        *self.cookie.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Cookie header to attach to the next outbound call
    pub fn header(&self) -> Option<HeaderValue> {
        self.cookie
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stored session identifier
    pub fn id(&self) -> Option<Zeroizing<String>> {
        let header = self.header()?;
        let cookie = header.to_str().ok()?;
        cookie
            .strip_prefix(SESSION_COOKIE)?
            .strip_prefix('=')
            .map(|id| Zeroizing::new(id.to_string()))
    }

    /// Whether a session identifier is currently stored
    pub fn is_set(&self) -> bool {
        self.cookie
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
