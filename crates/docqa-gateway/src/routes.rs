//! API route handlers for the gateway.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::Html,
};
use docqa_core::error::DocQaError;
use serde::Deserialize;

use super::page;
use super::server::AppState;

type JsonResponse = (StatusCode, Json<serde_json::Value>);

/// HTTP status for a failed question.
pub fn status_for(err: &DocQaError) -> StatusCode {
    match err {
        DocQaError::EmptyQuery | DocQaError::InvalidTopK => StatusCode::BAD_REQUEST,
        DocQaError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_json(err: &DocQaError) -> JsonResponse {
    let status = status_for(err);
    if status.is_server_error() {
        tracing::warn!("❌ Request failed: {err}");
    }
    (
        status,
        Json(serde_json::json!({"ok": false, "error": err.to_string()})),
    )
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "docqa-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Index information endpoint.
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let info = state.knowledge.info();
    Json(serde_json::json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "chunks": state.knowledge.len(),
        "dimensions": info.dimensions,
        "embedding_model": info.embedding_model,
        "document_fingerprint": info.document_fingerprint,
        "built_at": info.built_at.to_rfc3339(),
        "answer_service": state.answerer.as_ref().map(|a| a.name().to_string()),
        "top_k": state.retrieval.top_k,
        "api_top_k": state.retrieval.api_top_k,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub query: String,
    /// Defaults to `retrieval.api_top_k`.
    #[serde(default)]
    pub k: Option<usize>,
    /// Set to false to skip the answer service.
    #[serde(default = "default_true")]
    pub answer: bool,
}

fn default_true() -> bool {
    true
}

/// Retrieve context and answer a question.
pub async fn api_ask(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AskRequest>,
) -> JsonResponse {
    let k = body.k.unwrap_or(state.retrieval.api_top_k);
    let answerer = if body.answer {
        state.answerer.as_deref()
    } else {
        None
    };

    match state.knowledge.ask(&body.query, k, answerer).await {
        Ok(answer) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "ok": true,
                "answer": answer.answer,
                "context": answer.context,
                "chunks": answer.chunks,
            })),
        ),
        Err(e) => error_json(&e),
    }
}

/// Retrieval only: scored chunks, best first.
pub async fn api_search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AskRequest>,
) -> JsonResponse {
    let k = body.k.unwrap_or(state.retrieval.top_k);
    match state.knowledge.retrieve(&body.query, k).await {
        Ok(chunks) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "ok": true,
                "total": chunks.len(),
                "chunks": chunks,
            })),
        ),
        Err(e) => error_json(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    pub query: String,
}

/// The question form.
pub async fn index_page() -> Html<String> {
    Html(page::render("", None, None))
}

/// Form submission: retrieve `retrieval.top_k` chunks and answer.
pub async fn index_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QueryForm>,
) -> (StatusCode, Html<String>) {
    let result = state
        .knowledge
        .ask(&form.query, state.retrieval.top_k, state.answerer.as_deref())
        .await;
    match result {
        Ok(answer) => (
            StatusCode::OK,
            Html(page::render(&form.query, Some(&answer), None)),
        ),
        Err(e) => (
            status_for(&e),
            Html(page::render(&form.query, None, Some(&e.to_string()))),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use docqa_core::config::{GatewayConfig, RetrievalConfig};
    use docqa_core::error::Result;
    use docqa_core::traits::AnswerService;
    use docqa_knowledge::{IndexInfo, KnowledgeBase, Paragraph, RetrievalPipeline};
    use docqa_providers::hashing::HashingEmbedder;
    use tower::ServiceExt;

    struct CannedAnswerer {
        fail: bool,
    }

    #[async_trait]
    impl AnswerService for CannedAnswerer {
        fn name(&self) -> &str {
            "canned"
        }

        async fn answer(&self, context: &str, _question: &str) -> Result<String> {
            if self.fail {
                return Err(DocQaError::Upstream {
                    service: "canned".into(),
                    status: Some(429),
                    message: "quota".into(),
                });
            }
            Ok(format!("answered from {} chars", context.len()))
        }
    }

    async fn test_state(answerer: Option<Arc<dyn AnswerService>>) -> State<Arc<AppState>> {
        let pipeline = RetrievalPipeline::new(Arc::new(HashingEmbedder::new(128).unwrap()));
        let knowledge = pipeline
            .build(&[
                Paragraph::heading(1, "Handbook"),
                Paragraph::heading(2, "Refund policy"),
                Paragraph::body("Refunds are issued within 30 days of purchase."),
                Paragraph::heading(2, "Office hours"),
                Paragraph::body("The office is open from 9 to 5 on weekdays."),
            ])
            .await
            .unwrap();
        let info = IndexInfo::new(&knowledge, "hash-128", None);
        let base = KnowledgeBase::new(pipeline, knowledge, info);
        State(Arc::new(AppState::new(
            GatewayConfig::default(),
            RetrievalConfig::default(),
            Arc::new(base),
            answerer,
        )))
    }

    fn ask(query: &str, k: Option<usize>, answer: bool) -> Json<AskRequest> {
        Json(AskRequest {
            query: query.into(),
            k,
            answer,
        })
    }

    #[tokio::test]
    async fn test_health_check() {
        let json = health_check().await.0;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_system_info() {
        let json = system_info(test_state(None).await).await.0;
        assert_eq!(json["chunks"], 2);
        assert_eq!(json["dimensions"], 128);
        assert_eq!(json["embedding_model"], "hash-128");
        assert!(json["answer_service"].is_null());
    }

    #[tokio::test]
    async fn test_api_ask_defaults_to_one_chunk() {
        let state = test_state(Some(Arc::new(CannedAnswerer { fail: false }))).await;
        let (status, Json(json)) = api_ask(state, ask("refund policy", None, true)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["ok"].as_bool().unwrap());
        assert_eq!(json["chunks"].as_array().unwrap().len(), 1);
        assert_eq!(json["chunks"][0]["heading"], "Handbook | Refund policy");
        assert_eq!(
            json["context"],
            "Handbook | Refund policy\n\nRefunds are issued within 30 days of purchase."
        );
        assert!(json["answer"].as_str().unwrap().starts_with("answered from"));
    }

    #[tokio::test]
    async fn test_api_ask_without_answer() {
        let state = test_state(Some(Arc::new(CannedAnswerer { fail: false }))).await;
        let (_, Json(json)) = api_ask(state, ask("office hours", Some(2), false)).await;
        assert!(json["answer"].is_null());
        assert_eq!(json["chunks"].as_array().unwrap().len(), 2);
        assert_eq!(json["chunks"][0]["heading"], "Handbook | Office hours");
    }

    #[tokio::test]
    async fn test_api_ask_upstream_failure_is_in_answer() {
        let state = test_state(Some(Arc::new(CannedAnswerer { fail: true }))).await;
        let (status, Json(json)) = api_ask(state, ask("refund", None, true)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["answer"].as_str().unwrap().contains("429"));
    }

    #[tokio::test]
    async fn test_api_ask_empty_query() {
        let (status, Json(json)) = api_ask(test_state(None).await, ask("  ", None, true)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["ok"], false);
    }

    #[tokio::test]
    async fn test_api_search_zero_k() {
        let (status, _) = api_search(test_state(None).await, ask("refund", Some(0), false)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_search_scores_descend() {
        let (_, Json(json)) = api_search(test_state(None).await, ask("refund", None, false)).await;
        let chunks = json["chunks"].as_array().unwrap();
        assert_eq!(json["total"], 2);
        assert!(chunks[0]["score"].as_f64().unwrap() >= chunks[1]["score"].as_f64().unwrap());
    }

    #[tokio::test]
    async fn test_form_submit_renders_answer() {
        let state = test_state(Some(Arc::new(CannedAnswerer { fail: false }))).await;
        let form = Form(QueryForm {
            query: "refund".into(),
        });
        let (status, Html(html)) = index_submit(state, form).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Answer:"));
        assert!(html.contains("Refunds are issued"));
    }

    #[tokio::test]
    async fn test_router_serves_form_and_api() {
        let State(shared) = test_state(None).await;
        let app = crate::server::build_router_from_arc(shared);

        let resp = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(
                Request::post("/api/ask")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"query": ""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Query is empty");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&DocQaError::EmptyQuery), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&DocQaError::upstream("gemini", "down")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&DocQaError::CorruptIndex("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
