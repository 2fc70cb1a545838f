//! API integration tests.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use evpix_api::{create_router, ApiConfig, AppState};
use evpix_media::{
    FaceCropper, FetchConfig, HttpImageSource, LocalCropper, MediaError, RemoteCropper,
    RemoteCropperConfig,
};
use evpix_models::{BoundingBox, CropParams};
use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png_bytes() -> Vec<u8> {
    let image = RgbImage::from_pixel(120, 90, Rgb([200, 40, 40]));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

async fn image_host() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/faces/group.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/faces/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

fn test_router_with(config: ApiConfig) -> Router {
    let source = HttpImageSource::new(FetchConfig::default()).unwrap();
    let cropper = Arc::new(LocalCropper::new(Arc::new(source)));
    create_router(AppState::new(config, cropper), None)
}

fn test_router() -> Router {
    test_router_with(ApiConfig::default())
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Body as the decoded data URI image.
async fn decode_crop(response: axum::response::Response) -> image::DynamicImage {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let data_uri: String = serde_json::from_slice(&body).unwrap();
    let encoded = data_uri.strip_prefix("data:image/png;base64,").unwrap();
    image::load_from_memory(&STANDARD.decode(encoded).unwrap()).unwrap()
}

fn is_placeholder(response: &axum::response::Response) -> bool {
    response
        .headers()
        .get("x-evpix-placeholder")
        .is_some_and(|v| v == "true")
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = get(test_router(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_ready_endpoint() {
    let response = get(test_router(), "/ready").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["cropper"], "local");
}

#[tokio::test]
async fn test_crop_returns_sized_image() {
    let host = image_host().await;
    let uri = format!(
        "/crop?url={}/faces/group.png&x=20&y=10&width=40&height=40&size=64",
        host.uri()
    );

    let response = get(test_router(), &uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!is_placeholder(&response));
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );

    let image = decode_crop(response).await;
    assert_eq!(image.dimensions(), (64, 64));
}

#[tokio::test]
async fn test_api_alias_uses_default_size() {
    let host = image_host().await;
    let uri = format!(
        "/api/crop?url={}/faces/group.png&x=20&y=10&width=40&height=40",
        host.uri()
    );

    let response = get(test_router(), &uri).await;
    assert!(!is_placeholder(&response));
    assert_eq!(decode_crop(response).await.dimensions(), (150, 150));
}

#[tokio::test]
async fn test_crop_failures_serve_placeholders() {
    let host = image_host().await;
    let cases = [
        // Missing url
        "/crop?x=1&y=1&width=10&height=10&size=48".to_string(),
        // Unparsable number
        format!("/crop?url={}/faces/group.png&x=one&y=1&width=10&height=10&size=48", host.uri()),
        // Image missing upstream
        format!("/crop?url={}/faces/gone.png&x=1&y=1&width=10&height=10&size=48", host.uri()),
        // Box outside the image
        format!("/crop?url={}/faces/group.png&x=500&y=500&width=10&height=10&size=48", host.uri()),
        // Degenerate box
        format!("/crop?url={}/faces/group.png&x=1&y=1&width=0&height=10&size=48", host.uri()),
    ];

    for uri in cases {
        let response = get(test_router(), &uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert!(is_placeholder(&response), "{}", uri);
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
        assert_eq!(decode_crop(response).await.dimensions(), (48, 48), "{}", uri);
    }
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let response = get(test_router(), "/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-request-id").unwrap(), "req-123");
}

#[tokio::test]
async fn test_cors_preflight() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/crop")
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_rate_limiting_per_client() {
    let app = test_router_with(ApiConfig {
        rate_limit_rps: 1,
        rate_limit_burst: 1,
        ..Default::default()
    });

    let request = |ip: &str| {
        Request::builder()
            .uri("/crop")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(request("192.0.2.10")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let second = app.clone().oneshot(request("192.0.2.10")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let other = app.oneshot(request("192.0.2.11")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

/// The remote cropper talking to a live server built from this router.
#[tokio::test]
async fn test_remote_cropper_against_server() {
    let host = image_host().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, test_router()).await.unwrap();
    });

    let remote = RemoteCropper::new(RemoteCropperConfig {
        base_url: format!("http://{}", addr),
        ..Default::default()
    })
    .unwrap();

    let crop = remote
        .crop(
            &format!("{}/faces/group.png", host.uri()),
            BoundingBox::new(20, 10, 40, 40),
            CropParams::square(80),
        )
        .await
        .unwrap();
    assert!(!crop.placeholder);
    assert_eq!((crop.width, crop.height), (80, 80));

    let err = remote
        .crop(
            &format!("{}/faces/gone.png", host.uri()),
            BoundingBox::new(20, 10, 40, 40),
            CropParams::square(80),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::Remote(_)));
}
