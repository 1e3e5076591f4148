/// HTTP transport tests driven through the router without a socket
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use music_toolkit_mcp::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use super::test_config;

fn router(temp: &TempDir) -> (MusicToolkitServer, Router) {
    let server = MusicToolkitServer::new(test_config(temp)).expect("Failed to create server");
    let router = build_router(AppState {
        dispatcher: server.dispatcher(),
    });
    (server, router)
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[cfg(test)]
mod http_transport_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_returns_descriptor() {
        let temp = TempDir::new().unwrap();
        let (_server, router) = router(&temp);

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let descriptor = body_json(response).await;
        assert_eq!(descriptor["name"], "MusicToolkit MCP Server");
        assert_eq!(descriptor["status"], "healthy");
        assert_eq!(
            descriptor["tools"],
            json!(["wav_to_music_score", "generate_music_from_humming"])
        );
    }

    #[tokio::test]
    async fn test_preflight_answers_with_cors_headers() {
        let temp = TempDir::new().unwrap();
        let (_server, router) = router(&temp);

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/mcp")
                    .header(header::ORIGIN, "https://client.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET,POST,OPTIONS");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type,authorization");
    }

    #[tokio::test]
    async fn test_post_response_carries_allow_origin() {
        let temp = TempDir::new().unwrap();
        let (_server, router) = router(&temp);

        let mut request = post("/mcp", json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string());
        request
            .headers_mut()
            .insert(header::ORIGIN, "https://client.example".parse().unwrap());
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_post_tools_list_on_both_paths() {
        let temp = TempDir::new().unwrap();
        let (_server, router) = router(&temp);
        let request = json!({"jsonrpc": "2.0", "id": "abc", "method": "tools/list"}).to_string();

        for uri in ["/", "/mcp"] {
            let response = router.clone().oneshot(post(uri, request.clone())).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let body = body_json(response).await;
            assert_eq!(body["id"], "abc");
            assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_notification_is_accepted_without_body() {
        let temp = TempDir::new().unwrap();
        let (_server, router) = router(&temp);

        let request = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
        let response = router.oneshot(post("/mcp", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_body_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let (_server, router) = router(&temp);

        let response = router.oneshot(post("/mcp", "{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["id"], 0);
        assert_eq!(body["error"]["code"], error_codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_tool_soft_failure_over_http() {
        let temp = TempDir::new().unwrap();
        let (_server, router) = router(&temp);

        let request = json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {
                "name": "wav_to_music_score",
                "arguments": {"wav_file_path": "/nonexistent/file.wav"}
            }
        })
        .to_string();
        let response = router.oneshot(post("/mcp", request)).await.unwrap();

        let body = body_json(response).await;
        assert_eq!(body["id"], 7);
        assert_eq!(body["result"]["isError"], true);
        assert!(body["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("❌ WAV file not found"));
    }
}
