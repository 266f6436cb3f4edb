use super::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use crucible_core::auth::CallerContext;
use std::convert::Infallible;

/// Caller context for a request. Extraction never fails: a missing or
/// invalid session simply yields an anonymous caller.
#[derive(Clone, Debug)]
pub struct Caller(pub CallerContext);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub(crate) fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let mut caller = CallerContext::anonymous();
        if let Some(token) = bearer_token(headers) {
            caller.session = state.verifier.verify(token).await;
            if caller.session.is_none() {
                tracing::debug!("ignoring invalid session token");
            }
        }
        caller.sso_token = cookie(headers, &state.sso_cookie).map(str::to_string);
        Ok(Caller(caller))
    }
}
