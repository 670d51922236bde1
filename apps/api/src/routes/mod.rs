pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::analysis::handlers as analysis;
use crate::config::Config;
use crate::documents::{handlers as documents, MAX_UPLOAD_BYTES};
use crate::state::AppState;
use crate::status::handlers as status;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/analyze-resume", post(analysis::handle_analyze))
        .route("/api/improve-resume", post(analysis::handle_improve))
        .route("/api/resume-chat", post(analysis::handle_chat))
        // Documents API
        .route(
            "/api/extract-text",
            post(documents::handle_extract_text).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Status API
        .route(
            "/api/status",
            post(status::handle_create_status).get(status::handle_list_status),
        )
        .with_state(state)
}

/// CORS from `CORS_ORIGINS`. Any method and header; no credentials.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::stages::Stage;
    use crate::analysis::test_support::{happy_gateway, ScriptedGateway, RESUME_ONLY_REPORT};
    use crate::llm_client::GatewayError;
    use crate::status::MemoryStatusStore;

    fn app(gateway: Arc<ScriptedGateway>) -> Router {
        build_router(AppState {
            config: Config::for_tests(Some("shared-key")),
            gateway,
            status_store: Arc::new(MemoryStatusStore::new()),
        })
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Arc::new(ScriptedGateway::new()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "resume-analyzer");
    }

    #[tokio::test]
    async fn test_analyze_resume_only_over_http() {
        let gateway = Arc::new(happy_gateway().reply(Stage::FinalSynthesis, RESUME_ONLY_REPORT));
        let response = app(gateway.clone())
            .oneshot(json_request(
                Method::POST,
                "/api/analyze-resume",
                json!({"resumeText": "John Doe\nSoftware Engineer\nPython"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["atsScore"], 72);
        assert_eq!(body["hasJobDescription"], false);
        assert!(body.get("jdMatchScore").is_none());
        assert_eq!(
            gateway.stages_called(),
            vec![Stage::ResumeExtraction, Stage::FinalSynthesis]
        );
    }

    #[tokio::test]
    async fn test_empty_resume_is_rejected_before_any_model_call() {
        let gateway = Arc::new(ScriptedGateway::new());
        let response = app(gateway.clone())
            .oneshot(json_request(
                Method::POST,
                "/api/analyze-resume",
                json!({"resumeText": "   "}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_429() {
        let gateway = Arc::new(ScriptedGateway::new().fail(Stage::ResumeExtraction, || {
            GatewayError::Api {
                status: 429,
                reason: Some("RESOURCE_EXHAUSTED".into()),
                message: "Quota exceeded".into(),
            }
        }));
        let response = app(gateway)
            .oneshot(json_request(
                Method::POST,
                "/api/analyze-resume",
                json!({"resumeText": "John Doe"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "RATE_LIMITED");
    }

    #[tokio::test]
    async fn test_status_create_then_list() {
        let router = app(Arc::new(ScriptedGateway::new()));

        let created = router
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/status",
                json!({"clientName": "web"}),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::OK);
        let created = body_json(created).await;
        assert_eq!(created["clientName"], "web");

        let listed = router
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed = body_json(listed).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_status_blank_client_name_is_400() {
        let response = app(Arc::new(ScriptedGateway::new()))
            .oneshot(json_request(
                Method::POST,
                "/api/status",
                json!({"clientName": "  "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_resume_chat_over_http() {
        let gateway = Arc::new(ScriptedGateway::new().reply(Stage::Chat, "Add metrics first."));
        let response = app(gateway.clone())
            .oneshot(json_request(
                Method::POST,
                "/api/resume-chat",
                json!({
                    "message": "What next?",
                    "resumeText": "John Doe",
                    "analysisResults": {"atsScore": 70, "structureScore": 60},
                    "conversationHistory": [{"role": "user", "content": "Hi"}]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["reply"], "Add metrics first.");
        assert_eq!(gateway.calls()[0].turns.len(), 2);
    }

    #[tokio::test]
    async fn test_extract_text_from_plain_upload() {
        let boundary = "resume-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"resume.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             Jane Roe\nBackend Engineer\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/extract-text")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app(Arc::new(ScriptedGateway::new()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["text"], "Jane Roe\nBackend Engineer");
        assert_eq!(body["characters"], 25);
    }
}
