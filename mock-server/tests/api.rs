use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(body.to_string())
        .unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_and_path() {
    let resp = app().oneshot(request("GET", "/anything", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.path, "/anything");
    assert!(echo.query.is_none());
    assert!(echo.body.is_empty());
}

#[tokio::test]
async fn echo_reports_query_string() {
    let resp = app()
        .oneshot(request("DELETE", "/anything/items/7?force=1&tag%5B%5D=a", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "DELETE");
    assert_eq!(echo.path, "/anything/items/7");
    assert_eq!(echo.query.as_deref(), Some("force=1&tag%5B%5D=a"));
}

#[tokio::test]
async fn echo_reports_headers_and_body() {
    let req = Request::builder()
        .method("POST")
        .uri("/anything")
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("x-trace", "abc")
        .body(r#"{"name":"ok"}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.headers["content-type"], "application/json");
    assert_eq!(echo.headers["x-trace"], "abc");
    assert_eq!(echo.body, r#"{"name":"ok"}"#);
}

#[tokio::test]
async fn echo_accepts_any_method() {
    for method in ["PUT", "PATCH", "OPTIONS"] {
        let resp = app().oneshot(request(method, "/anything", "x")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{method}");
        let echo: Echo = body_json(resp).await;
        assert_eq!(echo.method, method);
    }
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    for code in [200u16, 302, 404, 503] {
        let resp = app()
            .oneshot(request("GET", &format!("/status/{code}"), ""))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), code);
    }
}

#[tokio::test]
async fn status_body_names_the_code() {
    let resp = app().oneshot(request("POST", "/status/201", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_bytes(resp).await;
    assert_eq!(&body[..], b"status 201");
}

#[tokio::test]
async fn status_with_non_numeric_code_returns_400() {
    let resp = app().oneshot(request("GET", "/status/teapot", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let resp = app().oneshot(request("GET", "/items", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
