//! The single wildcard route: logout detection, orchestration, response shaping.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::auth::SessionPolicy;
use crate::fetch::FetchResult;
use crate::http::request::{request_id, QueryParams, RequestContext, LOGOUT_PARAM};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Body of the logout confirmation.
pub const LOGOUT_BODY: &str = "logout successful";

/// Entry point for every `GET` the gateway receives.
pub async fn gateway_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let gateway = &state.gateway;
    let request_id = request_id(&headers);
    let query = QueryParams::parse(uri.query());

    if query.contains(LOGOUT_PARAM) {
        tracing::debug!(request_id = %request_id, "Logout requested");
        metrics::record_request("logout", start);
        return logout_response(gateway.session());
    }

    let ctx = RequestContext {
        path: uri.path().to_string(),
        query,
        session_cookie: gateway.session().read_cookie(&headers),
        request_id,
    };

    match gateway.process(&ctx).await {
        Ok(result) => {
            metrics::record_request("ok", start);
            success_response(result, gateway.session())
        }
        Err(err) => {
            metrics::record_request(err.outcome(), start);
            err.into_response_with(gateway.upstream_failure_status())
        }
    }
}

fn logout_response(session: &SessionPolicy) -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, session.clear_cookie())],
        LOGOUT_BODY,
    )
        .into_response()
}

fn success_response(result: FetchResult, session: &SessionPolicy) -> Response {
    let mut response = Response::new(Body::from(result.body));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Some(content_type) = result
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    headers.append(header::SET_COOKIE, session.issue_cookie());
    response
}
