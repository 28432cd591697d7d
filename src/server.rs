//! HTTP protocol server
//!
//! Exposes the agent card for discovery, a health endpoint, and the
//! JSON-RPC dispatch endpoint backed by the task manager. Dispatch never
//! blocks on handler completion: `tasks/create` returns the task snapshot
//! as soon as execution has been started.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::protocol::types::{
    codes, methods, AgentInfoResult, HealthResponse, RpcError, RpcRequest, RpcResponse,
    TaskCancelParams, TaskGetParams, TaskListParams, TaskListResult, TaskMessageParams,
    TaskResult,
};
use crate::skill::convert;
use crate::skill::registry::SkillRegistry;
use crate::skill::types::AgentCard;
use crate::task::manager::TaskManager;
use crate::task::types::TaskCreateRequest;

/// The agent-facing HTTP server.
///
/// The card is assembled once from the registry at construction and stays
/// immutable for the server's lifetime; the registry and manager are
/// injected rather than global.
#[derive(Clone)]
pub struct AgentServer {
    card: Arc<AgentCard>,
    manager: TaskManager,
}

impl AgentServer {
    /// Create a server over the given registry
    pub fn new(config: &Config, registry: Arc<SkillRegistry>) -> Self {
        let card = convert::agent_card(
            config.agent.name.clone(),
            config.agent.version.clone(),
            config.agent.description.clone(),
            config.server.base_url(),
            registry.skills(),
        );
        let manager = TaskManager::new(registry);

        AgentServer {
            card: Arc::new(card),
            manager,
        }
    }

    /// The agent card served for discovery
    pub fn agent_card(&self) -> &AgentCard {
        &self.card
    }

    /// The task manager backing the dispatch endpoint
    pub fn manager(&self) -> &TaskManager {
        &self.manager
    }

    /// Build the axum router for this server
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(serve_agent_card).post(dispatch))
            .route("/.well-known/agent.json", get(serve_agent_card))
            .route("/agent.json", get(serve_agent_card))
            .route("/health", get(serve_health))
            .with_state(self.clone())
            .layer(CorsLayer::permissive())
            .layer(CompressionLayer::new())
    }

    /// Bind and serve until ctrl-c
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let skills = self.card.skills.len();
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            addr = %addr,
            skills,
            "agent server listening, card at /.well-known/agent.json"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            })
            .await?;

        Ok(())
    }

    // ---- JSON-RPC method handlers ----

    async fn agent_info(&self) -> std::result::Result<Value, RpcError> {
        to_result(AgentInfoResult {
            agent: (*self.card).clone(),
        })
    }

    async fn task_create(&self, params: Option<Value>) -> std::result::Result<Value, RpcError> {
        let req: TaskCreateRequest = decode_params(params)?;

        // Defense in depth: reject against the advertised catalog before
        // the manager is involved at all.
        if !self.card.has_skill(&req.skill) {
            return Err(RpcError::new(
                codes::SKILL_NOT_FOUND,
                format!("Skill not found: {}", req.skill),
            ));
        }

        let task = self.manager.create_and_execute(req).await?;
        to_result(TaskResult { task })
    }

    async fn task_get(&self, params: Option<Value>) -> std::result::Result<Value, RpcError> {
        let params: TaskGetParams = decode_params(params)?;
        let task = self.manager.get_task(&params.task_id).await?;
        to_result(TaskResult { task })
    }

    async fn task_cancel(&self, params: Option<Value>) -> std::result::Result<Value, RpcError> {
        let params: TaskCancelParams = decode_params(params)?;
        let task = self.manager.cancel_task(&params.task_id).await?;
        to_result(TaskResult { task })
    }

    async fn task_message(&self, params: Option<Value>) -> std::result::Result<Value, RpcError> {
        let params: TaskMessageParams = decode_params(params)?;
        let task = self
            .manager
            .add_message(&params.task_id, params.message)
            .await?;
        to_result(TaskResult { task })
    }

    async fn task_list(&self, params: Option<Value>) -> std::result::Result<Value, RpcError> {
        let params: TaskListParams = decode_params(params)?;
        let tasks = self.manager.list_tasks(params.status).await;
        to_result(TaskListResult { tasks })
    }
}

/// Decode method params, treating absent params as an empty object
fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, RpcError> {
    let value = params.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    serde_json::from_value(value)
        .map_err(|e| RpcError::new(codes::INVALID_PARAMS, format!("Invalid params: {}", e)))
}

/// Serialize a method result into the response envelope
fn to_result<T: serde::Serialize>(result: T) -> std::result::Result<Value, RpcError> {
    serde_json::to_value(result)
        .map_err(|e| RpcError::new(codes::INTERNAL_ERROR, e.to_string()))
}

// ---- Endpoint handlers ----

async fn serve_agent_card(State(server): State<AgentServer>) -> Json<AgentCard> {
    Json((*server.card).clone())
}

async fn serve_health(State(server): State<AgentServer>) -> Json<HealthResponse> {
    let stats = server.manager.stats().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: server.card.version.clone(),
        stats,
    })
}

/// Dispatch a JSON-RPC request.
///
/// The raw body is decoded here, not by an extractor, so a malformed
/// envelope still produces a well-formed `ParseError` response.
async fn dispatch(State(server): State<AgentServer>, body: Bytes) -> Json<RpcResponse> {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return Json(RpcResponse::error(
                None,
                RpcError::new(codes::PARSE_ERROR, format!("Parse error: {}", e)),
            ));
        }
    };

    debug!(method = %request.method, id = ?request.id, "rpc request");

    let id = request.id.clone();
    let outcome = match request.method.as_str() {
        methods::AGENT_INFO => server.agent_info().await,
        methods::TASK_CREATE => server.task_create(request.params).await,
        methods::TASK_GET => server.task_get(request.params).await,
        methods::TASK_CANCEL => server.task_cancel(request.params).await,
        methods::TASK_MESSAGE => server.task_message(request.params).await,
        methods::TASK_LIST => server.task_list(request.params).await,
        other => Err(RpcError::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        )),
    };

    match outcome {
        Ok(result) => Json(RpcResponse::success(id, result)),
        Err(error) => Json(RpcResponse::error(id, error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::registry::handler_fn;
    use crate::skill::types::{InputSchema, Skill};
    use crate::task::types::{SkillOutput, TaskStatus};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::util::ServiceExt;

    fn test_server() -> AgentServer {
        let mut registry = SkillRegistry::new();
        registry.register_with(
            Skill {
                id: "echo".to_string(),
                name: "Echo".to_string(),
                description: "Echo the input back".to_string(),
                input_schema: InputSchema::object(),
                output_schema: None,
                tags: vec![],
                examples: vec![],
            },
            handler_fn(|_cancel, input| async move {
                let text = input
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                Ok(SkillOutput::text(text))
            }),
        );

        AgentServer::new(&Config::default(), Arc::new(registry))
    }

    async fn rpc(server: &AgentServer, body: &str) -> RpcResponse {
        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_agent_card_endpoint() {
        let server = test_server();
        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/.well-known/agent.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let card: AgentCard = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(card.skills.len(), 1);
        assert!(card.has_skill("echo"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = test_server();
        let response = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.stats.registered_skills, 1);
    }

    #[tokio::test]
    async fn test_malformed_body_yields_parse_error() {
        let server = test_server();
        let response = rpc(&server, "{not json").await;

        let error = response.error.expect("error response");
        assert_eq!(error.code, codes::PARSE_ERROR);
        assert!(response.id.is_none());
        assert!(response.result.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = test_server();
        let response = rpc(
            &server,
            r#"{"jsonrpc":"2.0","id":3,"method":"tasks/destroy"}"#,
        )
        .await;

        assert_eq!(response.id, Some(Value::from(3)));
        assert_eq!(response.error.unwrap().code, codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let server = test_server();
        let response = rpc(
            &server,
            r#"{"jsonrpc":"2.0","id":4,"method":"tasks/get","params":{"taskId":42}}"#,
        )
        .await;

        assert_eq!(response.error.unwrap().code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_create_unknown_skill_rejected_before_manager() {
        let server = test_server();
        let response = rpc(
            &server,
            r#"{"jsonrpc":"2.0","id":5,"method":"tasks/create","params":{"skill":"missing"}}"#,
        )
        .await;

        assert_eq!(response.error.unwrap().code, codes::SKILL_NOT_FOUND);
        assert!(server.manager().list_tasks(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let server = test_server();

        let created = rpc(
            &server,
            r#"{"jsonrpc":"2.0","id":6,"method":"tasks/create","params":{"skill":"echo","input":{"text":"hi"}}}"#,
        )
        .await;
        assert_eq!(created.id, Some(Value::from(6)));
        let result: TaskResult =
            serde_json::from_value(created.result.expect("create result")).unwrap();
        assert!(!result.task.status.is_terminal() || result.task.status == TaskStatus::Completed);

        // Poll over RPC until the handler finishes.
        let task = loop {
            let response = rpc(
                &server,
                &format!(
                    r#"{{"jsonrpc":"2.0","id":7,"method":"tasks/get","params":{{"taskId":"{}"}}}}"#,
                    result.task.id
                ),
            )
            .await;
            let got: TaskResult = serde_json::from_value(response.result.unwrap()).unwrap();
            if got.task.status.is_terminal() {
                break got.task;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        };

        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.text(), "hi");
    }

    #[tokio::test]
    async fn test_unknown_task_yields_task_not_found() {
        let server = test_server();
        let response = rpc(
            &server,
            r#"{"jsonrpc":"2.0","id":8,"method":"tasks/get","params":{"taskId":"nope"}}"#,
        )
        .await;

        assert_eq!(response.error.unwrap().code, codes::TASK_NOT_FOUND);
    }
}
