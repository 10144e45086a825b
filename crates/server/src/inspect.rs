use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, Uri, Version},
};
use tracing::info;

/// Fallback for unrouted paths: logs the whole request and answers 200 with no body.
pub async fn log_request(
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let headers = headers
        .iter()
        .map(|(name, value)| format!("{name}: {}", String::from_utf8_lossy(value.as_bytes())))
        .collect::<Vec<_>>();

    info!(
        event_name = "http.request.inspected",
        correlation_id = "inspection",
        method = %method,
        uri = %uri,
        version = ?version,
        headers = ?headers,
        body = %String::from_utf8_lossy(&body),
        "unrouted request received"
    );

    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Bytes,
        http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, Version},
    };

    use super::log_request;

    #[tokio::test]
    async fn any_request_is_acknowledged() {
        let mut headers = HeaderMap::new();
        headers.insert("x-hub-signature", HeaderValue::from_static("sha1=abc"));

        let status = log_request(
            Method::PUT,
            Uri::from_static("/webhook?mode=subscribe"),
            Version::HTTP_11,
            headers,
            Bytes::from_static(&[0xff, b'{', b'}']),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
    }
}
