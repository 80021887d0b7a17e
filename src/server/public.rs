//! Public gateway route.
//!
//! Every inbound path has the shape `/{service}/{api_method}/{remainder}`,
//! where the remainder may be empty but its leading slash is required;
//! shorter paths are rejected with 400. The handler splits the path, caps
//! the body at 1 MiB, hands the request to the processor, and writes the
//! resulting status, headers, and body back verbatim.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, State};
use axum::http::{self, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::domain::{Headers, HttpMethod, ProcessRequest, ProviderProcessResponse};
use crate::processor::Processor;

/// Maximum accepted request body size
const MAX_BODY_SIZE: usize = 1 << 20; // 1 MiB

/// Build the public router around a processor
pub fn public_router(processor: Arc<dyn Processor>) -> Router {
    Router::new()
        .fallback(gateway_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(processor)
}

async fn gateway_handler(
    State(processor): State<Arc<dyn Processor>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();

    let trimmed = parts.uri.path().trim_start_matches('/');
    let mut segments = trimmed.splitn(3, '/');
    let (Some(service), Some(api_method), Some(path)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return json_error(StatusCode::BAD_REQUEST, "Invalid path");
    };
    if service.is_empty() || api_method.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "Invalid path");
    }

    let body = match to_bytes(body, MAX_BODY_SIZE).await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read body: {e}"),
            );
        }
    };

    let response = processor
        .process(ProcessRequest {
            service: service.to_string(),
            http_method: http_method_from(&parts.method),
            api_method: api_method.to_string(),
            path: path.to_string(),
            query: parts.uri.query().unwrap_or_default().to_string(),
            body,
            headers: headers_from(&parts.headers),
            remote_addr: remote_addr.to_string(),
        })
        .await;

    write_response(response)
}

fn http_method_from(method: &http::Method) -> HttpMethod {
    match method.as_str() {
        "GET" => HttpMethod::Get,
        "PUT" => HttpMethod::Put,
        "POST" => HttpMethod::Post,
        "DELETE" => HttpMethod::Delete,
        "PATCH" => HttpMethod::Patch,
        _ => HttpMethod::Unspecified,
    }
}

fn headers_from(header_map: &http::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in header_map {
        if let Ok(value) = value.to_str() {
            headers.append(name.as_str(), value);
        }
    }
    headers
}

fn write_response(response: ProviderProcessResponse) -> Response {
    let status = StatusCode::from_u16(response.status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = http::Response::builder().status(status);
    for (name, values) in &response.headers {
        for value in values {
            builder = builder.header(name, value);
        }
    }

    builder.body(Body::from(response.body)).unwrap_or_else(|e| {
        warn!(error = %e, "failed to build response");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(http::header::CONTENT_TYPE, "application/json")],
        json!({ "error_msg": message }).to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_methods_map_to_domain() {
        assert_eq!(http_method_from(&http::Method::GET), HttpMethod::Get);
        assert_eq!(http_method_from(&http::Method::PUT), HttpMethod::Put);
        assert_eq!(http_method_from(&http::Method::POST), HttpMethod::Post);
        assert_eq!(http_method_from(&http::Method::DELETE), HttpMethod::Delete);
        assert_eq!(http_method_from(&http::Method::PATCH), HttpMethod::Patch);
    }

    #[test]
    fn unknown_methods_map_to_unspecified() {
        assert_eq!(
            http_method_from(&http::Method::OPTIONS),
            HttpMethod::Unspecified
        );
        assert_eq!(
            http_method_from(&http::Method::HEAD),
            HttpMethod::Unspecified
        );
    }

    #[test]
    fn header_map_converts_with_values() {
        let mut header_map = http::HeaderMap::new();
        header_map.insert("x-request-id", http::HeaderValue::from_static("1"));
        header_map.append("accept", http::HeaderValue::from_static("text/html"));
        header_map.append("accept", http::HeaderValue::from_static("application/json"));

        let headers = headers_from(&header_map);
        assert_eq!(headers.get("x-request-id"), Some("1"));
        assert_eq!(headers.len(), 2);
    }
}
