//! Mock identity: the caller is whoever the `userId` cookie says it is.
//!
//! Stand-in for real authentication. Handlers receive the result as a typed
//! [`Identity`] extractor instead of digging it out of request extensions.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use axie_ledger::UserId;

use crate::types::ApiError;

pub const USER_ID_COOKIE: &str = "userId";

/// Authenticated caller of a request
#[derive(Debug, Clone)]
pub struct Identity(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_from_headers(&parts.headers).map(Identity)
    }
}

/// First `userId` cookie across all `Cookie` headers
pub fn user_from_headers(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let value = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == USER_ID_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .ok_or(ApiError::Unauthorized)?;

    UserId::new(value).map_err(|_| ApiError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for cookie in cookies {
            map.append(COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        map
    }

    #[test]
    fn test_user_cookie_found() {
        let user = user_from_headers(&headers(&["theme=dark; userId=alice; lang=en"])).unwrap();
        assert_eq!(user.as_str(), "alice");

        let user = user_from_headers(&headers(&["theme=dark", "userId=\"bob\""])).unwrap();
        assert_eq!(user.as_str(), "bob");
    }

    #[test]
    fn test_missing_or_empty_cookie() {
        assert!(matches!(user_from_headers(&HeaderMap::new()), Err(ApiError::Unauthorized)));
        assert!(matches!(user_from_headers(&headers(&["theme=dark"])), Err(ApiError::Unauthorized)));
        assert!(matches!(user_from_headers(&headers(&["userId="])), Err(ApiError::Unauthorized)));
    }
}
