//! Gateway/REST client error types.
//!
//! Errors raised by the chat platform when the bot mutates roles or sends
//! replies. None of these are retried automatically.

use derive_getters::Getters;

/// Gateway error variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum GatewayErrorKind {
    /// The platform refused the mutation because of permissions or role order.
    #[display("Role hierarchy violation: {_0}")]
    HierarchyViolation(String),

    /// The platform rate limited the request.
    #[display("Rate limited: {_0}")]
    RateLimited(String),

    /// The referenced guild, member or role does not exist.
    #[display("Not found: {_0}")]
    NotFound(String),

    /// Any other transport or API failure.
    #[display("Transport error: {_0}")]
    Transport(String),

    /// Connection to the gateway failed.
    #[display("Connection failed: {_0}")]
    ConnectionFailed(String),
}

/// Gateway error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error, Getters)]
#[display("Gateway Error: {} at line {} in {}", kind, line, file)]
pub struct GatewayError {
    kind: GatewayErrorKind,
    line: u32,
    file: &'static str,
}

impl GatewayError {
    /// Create a new GatewayError with automatic location tracking.
    ///
    /// # Example
    /// ```
    /// use ilm_error::{GatewayError, GatewayErrorKind};
    ///
    /// let err = GatewayError::new(GatewayErrorKind::RateLimited("retry in 2s".into()));
    /// assert!(!err.is_hierarchy_violation());
    /// ```
    #[track_caller]
    pub fn new(kind: GatewayErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether the platform rejected the call on permission grounds.
    pub fn is_hierarchy_violation(&self) -> bool {
        matches!(self.kind, GatewayErrorKind::HierarchyViolation(_))
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Discord JSON error code for "Missing Permissions".
const MISSING_PERMISSIONS: isize = 50013;

impl GatewayErrorKind {
    /// Classify an unsuccessful REST response.
    ///
    /// Role calls go out on a client with the rate limiter disabled, so a 429
    /// reaches the caller as [`GatewayErrorKind::RateLimited`] instead of
    /// being slept on and re-sent.
    pub fn from_http_status(status: u16, code: isize, message: String) -> Self {
        match status {
            _ if code == MISSING_PERMISSIONS => Self::HierarchyViolation(message),
            403 => Self::HierarchyViolation(message),
            429 => Self::RateLimited(message),
            404 => Self::NotFound(message),
            _ => Self::Transport(format!("HTTP {}: {}", status, message)),
        }
    }
}

#[cfg(feature = "discord")]
impl From<serenity::Error> for GatewayError {
    #[track_caller]
    fn from(err: serenity::Error) -> Self {
        use serenity::http::HttpError;

        let kind = match &err {
            serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
                GatewayErrorKind::from_http_status(
                    response.status_code.as_u16(),
                    response.error.code,
                    response.error.message.clone(),
                )
            }
            serenity::Error::Gateway(e) => GatewayErrorKind::ConnectionFailed(e.to_string()),
            other => GatewayErrorKind::Transport(other.to_string()),
        };
        GatewayError::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_reaches_caller() {
        let kind = GatewayErrorKind::from_http_status(429, 0, "You are being rate limited.".into());
        assert_eq!(
            kind,
            GatewayErrorKind::RateLimited("You are being rate limited.".into())
        );
        assert!(!GatewayError::new(kind).is_hierarchy_violation());
    }

    #[test]
    fn test_missing_permissions_is_hierarchy() {
        let by_code = GatewayErrorKind::from_http_status(400, MISSING_PERMISSIONS, "nope".into());
        let by_status = GatewayErrorKind::from_http_status(403, 0, "nope".into());
        assert!(GatewayError::new(by_code).is_hierarchy_violation());
        assert!(GatewayError::new(by_status).is_hierarchy_violation());
    }

    #[test]
    fn test_other_statuses() {
        assert_eq!(
            GatewayErrorKind::from_http_status(404, 10007, "Unknown Member".into()),
            GatewayErrorKind::NotFound("Unknown Member".into())
        );
        assert_eq!(
            GatewayErrorKind::from_http_status(502, 0, "Bad Gateway".into()),
            GatewayErrorKind::Transport("HTTP 502: Bad Gateway".into())
        );
    }
}
