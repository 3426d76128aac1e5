//! Axum extractor for the authenticated caller.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::HubError;

/// The user behind the request's session cookie.
///
/// Rejects with [`HubError::Unauthorized`] when the cookie is absent or the
/// session does not resolve.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = HubError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            session_cookie(&parts.headers, &state.session_cookie).ok_or(HubError::Unauthorized)?;
        match state.sessions.resolve(token).await? {
            Some(user) => Ok(Self(user)),
            None => {
                tracing::debug!("session token did not resolve");
                Err(HubError::Unauthorized)
            }
        }
    }
}

/// Finds the value of cookie `name` across all `Cookie` headers.
#[must_use]
pub fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(values: &[&'static str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for value in values {
            map.append(COOKIE, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn finds_cookie_among_others() {
        let map = headers(&["theme=dark; session_token=abc123; lang=en"]);
        assert_eq!(session_cookie(&map, "session_token"), Some("abc123"));
    }

    #[test]
    fn searches_every_cookie_header() {
        let map = headers(&["theme=dark", "session_token=\"xyz\""]);
        assert_eq!(session_cookie(&map, "session_token"), Some("xyz"));
    }

    #[test]
    fn empty_or_missing_cookie_is_none() {
        assert_eq!(session_cookie(&headers(&[]), "session_token"), None);
        assert_eq!(
            session_cookie(&headers(&["session_token="]), "session_token"),
            None
        );
        assert_eq!(
            session_cookie(&headers(&["other_session_token=1"]), "session_token"),
            None
        );
    }
}
