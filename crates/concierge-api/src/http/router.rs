//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`, plus an unversioned `/health`.
//! Middleware: CORS, request tracing.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/conversations",
            post(handlers::conversation::start_conversation)
                .get(handlers::conversation::list_conversations),
        )
        .route(
            "/conversations/{id}",
            get(handlers::conversation::get_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            post(handlers::conversation::continue_conversation),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness plus the configured model.
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config.model,
    }))
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use concierge_core::chat::service::{ChatService, TurnSettings};
    use concierge_core::llm::box_provider::BoxLlmProvider;
    use concierge_core::llm::provider::LlmProvider;
    use concierge_core::title::TitleCache;
    use concierge_core::tools::{DateTool, SystemClock, ToolRegistry};
    use concierge_infra::crypto::hash::Sha256ContentHasher;
    use concierge_infra::sqlite::conversation::SqliteConversationRepository;
    use concierge_infra::sqlite::pool::DatabasePool;
    use concierge_types::config::GlobalConfig;
    use concierge_types::llm::{
        Choice, CompletionRequest, CompletionResponse, LlmError, StopReason, Usage,
    };

    use super::*;

    /// Answers title requests (no tools) with a fixed title, replies with a fixed text.
    struct CannedProvider;

    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        fn complete(
            &self,
            request: &CompletionRequest,
        ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
            let content = if request.tools.is_empty() {
                "Weekend plans"
            } else {
                "Sounds like a good idea."
            };
            let response = CompletionResponse {
                id: "resp-1".to_string(),
                model: request.model.clone(),
                choices: vec![Choice {
                    content: content.to_string(),
                    tool_calls: vec![],
                    stop_reason: StopReason::EndTurn,
                }],
                usage: Usage::default(),
            };
            async move { Ok(response) }
        }
    }

    async fn test_router() -> (Router, TempDir) {
        let tmp = TempDir::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", tmp.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();

        let config = GlobalConfig::default();
        let service = ChatService::new(
            SqliteConversationRepository::new(pool),
            Arc::new(BoxLlmProvider::new(CannedProvider)),
            Arc::new(ToolRegistry::new().with(DateTool::new(SystemClock))),
            TitleCache::new(16),
            Arc::new(Sha256ContentHasher::new()),
            TurnSettings::from(&config),
        );
        let state = AppState::from_parts(service, config, tmp.path().to_path_buf());
        (build_router(state), tmp)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_model() {
        let (router, _tmp) = test_router().await;
        let (status, body) = send(&router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model"], "o1");
    }

    #[tokio::test]
    async fn conversation_lifecycle() {
        let (router, _tmp) = test_router().await;

        let (status, body) = send(
            &router,
            post_json("/api/v1/conversations", r#"{"message":"Plan my weekend"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["title"], "Weekend plans");
        assert_eq!(body["data"]["reply"], "Sounds like a good idea.");
        assert!(body["errors"].as_array().unwrap().is_empty());
        assert!(body["meta"]["request_id"].is_string());
        let id = body["data"]["conversation_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &router,
            post_json(
                &format!("/api/v1/conversations/{id}/messages"),
                r#"{"message":"And on Sunday?"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["reply"], "Sounds like a good idea.");

        let (status, body) = send(&router, get(&format!("/api/v1/conversations/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        let roles: Vec<&str> = body["data"]["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);

        let (status, body) = send(&router, get("/api/v1/conversations")).await;
        assert_eq!(status, StatusCode::OK);
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["title"], "Weekend plans");
        assert!(list[0]["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let (router, _tmp) = test_router().await;
        let (status, body) = send(
            &router,
            post_json("/api/v1/conversations", r#"{"message":"   "}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let (router, _tmp) = test_router().await;
        let (status, _) = send(&router, post_json("/api/v1/conversations", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let (router, _tmp) = test_router().await;
        let id = uuid::Uuid::now_v7();

        let (status, body) = send(&router, get(&format!("/api/v1/conversations/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "CONVERSATION_NOT_FOUND");

        let (status, _) = send(
            &router,
            post_json(
                &format!("/api/v1/conversations/{id}/messages"),
                r#"{"message":"hello"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_id_is_bad_request() {
        let (router, _tmp) = test_router().await;
        let (status, _) = send(&router, get("/api/v1/conversations/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
