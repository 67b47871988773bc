use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use super::RelayError;
use crate::app_state::AppState;

const API_KEY_HEADER: &str = "x-redmine-api-key";
const UPSTREAM_URL_HEADER: &str = "x-redmine-url";

/// Response headers never copied back: the hop-by-hop set plus
/// `content-length`, which is recomputed for the relayed body.
const SKIPPED_RESPONSE_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Forwards `/api/*` to the Redmine named by the `x-redmine-url` header (or
/// the configured default), returning the upstream status and body verbatim.
#[instrument(name = "forward_to_redmine", skip_all)]
pub(crate) async fn to_redmine(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RelayError> {
    let upstream = headers
        .get(UPSTREAM_URL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| state.default_upstream.clone())
        .ok_or_else(|| {
            RelayError::bad_request("Redmine URL not configured").with_details(format!(
                "send an {} header or configure upstream.default_url",
                UPSTREAM_URL_HEADER
            ))
        })?;

    let target = build_target(&upstream, &uri);
    tracing::debug!(%method, %target, "forwarding request");

    let mut request = state
        .http
        .request(method, &target)
        .header("content-type", "application/json")
        .header(
            "user-agent",
            concat!("takt-relay/", env!("CARGO_PKG_VERSION")),
        );
    if let Some(api_key) = headers.get(API_KEY_HEADER) {
        request = request.header(API_KEY_HEADER, api_key);
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream_response = request.send().await?;
    let status = upstream_response.status();
    let response_headers = copy_response_headers(upstream_response.headers());
    let bytes = upstream_response.bytes().await?;

    Ok((status, response_headers, bytes).into_response())
}

/// Joins the upstream base with the request path (minus the `/api` mount)
/// and query string.
fn build_target(upstream: &str, uri: &Uri) -> String {
    let path = uri.path().strip_prefix("/api").unwrap_or(uri.path());
    let path = if path.is_empty() { "/" } else { path };
    let base = upstream.trim_end_matches('/');
    match uri.query() {
        Some(query) => format!("{}{}?{}", base, path, query),
        None => format!("{}{}", base, path),
    }
}

fn copy_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in upstream {
        if !SKIPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
            headers.insert(name.clone(), value.clone());
        }
    }
    headers
}
