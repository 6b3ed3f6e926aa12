use postwatch_core::{CoreError, TwitterApiError};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:79.0) Gecko/20100101 Firefox/79.0";

/// Public bearer token the web app ships with; guest sessions are scoped by `x-guest-token`.
pub const WEB_AUTHORIZATION: &str = "Bearer AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

pub const GUEST_TOKEN_HEADER: &str = "x-guest-token";

const GUEST_TOKEN_PATTERN: &str = r#"\("gt=(\d+);"#;

/// Headers sent with every API call. Owned by a single client.
#[derive(Debug, Clone)]
pub struct Session {
    headers: HeaderMap,
    guest_token: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(AUTHORIZATION, HeaderValue::from_static(WEB_AUTHORIZATION));
        Self {
            headers,
            guest_token: None,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn guest_token(&self) -> Option<&str> {
        self.guest_token.as_deref()
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.guest_token.is_some()
    }

    pub fn install_guest_token(&mut self, token: &str) -> Result<(), CoreError> {
        let value = HeaderValue::from_str(token).map_err(|_| TwitterApiError::Bootstrap {
            reason: "guest token is not a valid header value".to_string(),
        })?;
        self.headers.insert(GUEST_TOKEN_HEADER, value);
        self.guest_token = Some(token.to_string());
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Finds the `gt=<digits>;` cookie the home page sets from inline script.
pub fn extract_guest_token(body: &str) -> Option<String> {
    let pattern = Regex::new(GUEST_TOKEN_PATTERN).ok()?;
    pattern
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME_PAGE: &str = r#"<script nonce="x">document.cookie = decodeURIComponent("gt=1296445245421330432; Max-Age=10800; Domain=.twitter.com; Path=/; Secure");</script>"#;

    #[test]
    fn test_extract_guest_token() {
        assert_eq!(
            extract_guest_token(HOME_PAGE),
            Some("1296445245421330432".to_string())
        );
    }

    #[test]
    fn test_extract_guest_token_missing() {
        assert_eq!(extract_guest_token("<html><body>hi</body></html>"), None);
        assert_eq!(extract_guest_token(r#"("gt=abc;"#), None);
    }

    #[test]
    fn test_new_session_has_static_headers() {
        let session = Session::new();
        assert!(!session.is_bootstrapped());
        assert_eq!(
            session.headers().get(USER_AGENT).unwrap(),
            BROWSER_USER_AGENT
        );
        assert_eq!(
            session.headers().get(AUTHORIZATION).unwrap(),
            WEB_AUTHORIZATION
        );
        assert!(session.headers().get(GUEST_TOKEN_HEADER).is_none());
    }

    #[test]
    fn test_install_guest_token() {
        let mut session = Session::new();
        session.install_guest_token("1234").unwrap();
        assert!(session.is_bootstrapped());
        assert_eq!(session.guest_token(), Some("1234"));
        assert_eq!(session.headers().get(GUEST_TOKEN_HEADER).unwrap(), "1234");
    }

    #[test]
    fn test_install_rejects_invalid_header_value() {
        let mut session = Session::new();
        assert!(session.install_guest_token("bad\ntoken").is_err());
        assert!(!session.is_bootstrapped());
    }
}
