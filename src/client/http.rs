use serde::de::DeserializeOwned;
use crate::error::{from_reqwest, parse_http_error, ErrorContext, UpstreamError};

/// Passes successful responses through; everything else becomes an [`UpstreamError`]
/// built from the status, the `Retry-After` header and the error body.
pub async fn check_response(
    resp: reqwest::Response,
    context: ErrorContext,
) -> Result<reqwest::Response, UpstreamError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = parse_retry_after(&resp);
    let body = resp.text().await.unwrap_or_default();
    Err(parse_http_error(
        status.as_u16(),
        &body,
        context.with_retry_after(retry_after),
    ))
}

pub async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
    context: ErrorContext,
) -> Result<T, UpstreamError> {
    let resp = check_response(resp, context.clone()).await?;
    resp.json::<T>().await.map_err(|e| from_reqwest(e, context))
}

fn parse_retry_after(resp: &reqwest::Response) -> Option<u64> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}
