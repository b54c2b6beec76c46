use super::jwt::JwtAuth;
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::de::DeserializeOwned;

/// Bearer token from `Authorization`, falling back to the `access_token` cookie.
fn extract_token_from_request(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer ").map(|s| s.to_string()))
        .or_else(|| {
            headers
                .get("cookie")
                .and_then(|v| v.to_str().ok())
                .and_then(|cookies| {
                    cookies.split(';').find_map(|cookie| {
                        let (name, value) = cookie.trim().split_once('=')?;
                        (name == "access_token").then(|| value.to_string())
                    })
                })
        })
}

/// Verify the request token and insert the decoded `C` into extensions.
///
/// Answers 401 when the token is missing or fails verification.
///
/// ```ignore
/// let protected = Router::new()
///     .route("/{id}", get(query_by_id))
///     .route_layer(axum::middleware::from_fn_with_state(
///         jwt.clone(),
///         jwt_auth_middleware::<Claims>,
///     ));
/// ```
pub async fn jwt_auth_middleware<C>(
    State(auth): State<JwtAuth>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    C: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let Some(token) = extract_token_from_request(&headers) else {
        tracing::debug!("No JWT found in Authorization header or cookie");
        return Err(AppError::Unauthorized("No token provided".to_string()));
    };

    let claims = auth.verify::<C>(&token).map_err(|e| {
        tracing::debug!("JWT verification failed: {}", e);
        AppError::Unauthorized("Invalid token".to_string())
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Like [`jwt_auth_middleware`] for routes that also serve anonymous callers.
///
/// Inserts `Option<C>`: `None` without a token, the decoded claims with a
/// valid one. A token that is present but invalid is still a 401.
pub async fn optional_jwt_auth_middleware<C>(
    State(auth): State<JwtAuth>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    C: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let claims = match extract_token_from_request(&headers) {
        Some(token) => Some(auth.verify::<C>(&token).map_err(|e| {
            tracing::debug!("JWT verification failed: {}", e);
            AppError::Unauthorized("Invalid token".to_string())
        })?),
        None => None,
    };

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_token_from_request(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; access_token=abc.def.ghi"),
        );
        assert_eq!(extract_token_from_request(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_requires_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert!(extract_token_from_request(&headers).is_none());
    }
}
