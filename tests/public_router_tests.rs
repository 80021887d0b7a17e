//! Gateway routing tests
//!
//! Drives the public router with real HTTP requests: path-shape validation,
//! the body cap, and pass-through of the processor's response.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use policy_gateway::domain::{
    Headers, HttpMethod, ProcessRequest, ProviderProcessResponse,
};
use policy_gateway::processor::Processor;
use policy_gateway::server::public_router;

#[derive(Default)]
struct RecordingProcessor {
    seen: Mutex<Vec<ProcessRequest>>,
}

#[async_trait]
impl Processor for RecordingProcessor {
    async fn process(&self, request: ProcessRequest) -> ProviderProcessResponse {
        self.seen.lock().unwrap().push(request);

        let mut headers = Headers::new();
        headers.set("content-type", "application/json");
        ProviderProcessResponse {
            status_code: 200,
            body: b"{\"msg\":\"hi\"}".to_vec(),
            headers,
        }
    }
}

fn request(method: &str, uri: &str, body: Body) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 52000))));
    request
}

fn harness() -> (Arc<RecordingProcessor>, axum::Router) {
    let processor = Arc::new(RecordingProcessor::default());
    let router = public_router(Arc::clone(&processor) as Arc<dyn Processor>);
    (processor, router)
}

#[tokio::test]
async fn path_without_third_segment_is_rejected() {
    let (processor, router) = harness();

    let response = router
        .oneshot(request("GET", "/greet/hello", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(processor.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn single_segment_path_is_rejected() {
    let (processor, router) = harness();

    let response = router
        .oneshot(request("GET", "/greet", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(processor.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn trailing_slash_reaches_the_processor_with_empty_path() {
    let (processor, router) = harness();

    let response = router
        .oneshot(request("GET", "/greet/hello/?name=ada", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"{\"msg\":\"hi\"}");

    let seen = processor.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].service, "greet");
    assert_eq!(seen[0].api_method, "hello");
    assert_eq!(seen[0].path, "");
    assert_eq!(seen[0].query, "name=ada");
    assert_eq!(seen[0].http_method, HttpMethod::Get);
    assert_eq!(seen[0].remote_addr, "10.0.0.1:52000");
}

#[tokio::test]
async fn path_remainder_and_body_are_forwarded() {
    let (processor, router) = harness();

    let response = router
        .oneshot(request(
            "POST",
            "/greet/hello/rest/more",
            Body::from("{\"name\":\"ada\"}"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let seen = processor.seen.lock().unwrap();
    assert_eq!(seen[0].path, "rest/more");
    assert_eq!(seen[0].http_method, HttpMethod::Post);
    assert_eq!(seen[0].body, b"{\"name\":\"ada\"}");
}

#[tokio::test]
async fn oversized_body_is_rejected_before_the_processor() {
    let (processor, router) = harness();

    let response = router
        .oneshot(request(
            "POST",
            "/greet/hello/",
            Body::from(vec![0u8; (1 << 20) + 1]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(processor.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unroutable_http_method_reaches_the_processor_as_unspecified() {
    let (processor, router) = harness();

    router
        .oneshot(request("OPTIONS", "/greet/hello/", Body::empty()))
        .await
        .unwrap();

    let seen = processor.seen.lock().unwrap();
    assert_eq!(seen[0].http_method, HttpMethod::Unspecified);
}
