//! The thin admin HTTP surface: JSON CRUD over the coordinator plus a
//! websocket upgrade onto the push channel. Business logic lives entirely in
//! `fabric-coordinator`; this module only does request/response plumbing and
//! status-code mapping.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fabric_core::{Clock, Task, TaskId, WorkerId, WorkerRecord};
use fabric_coordinator::{Coordinator, CoordinatorError};
use fabric_push::PushChannel;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

struct AppState<C: Clock> {
    coordinator: Arc<Coordinator<C>>,
    push: Arc<dyn PushChannel>,
}

impl<C: Clock> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self { coordinator: self.coordinator.clone(), push: self.push.clone() }
    }
}

pub fn build_router<C: Clock>(coordinator: Arc<Coordinator<C>>, push: Arc<dyn PushChannel>) -> Router {
    let state = AppState { coordinator, push };
    Router::new()
        .route("/api/tasks", get(list_tasks::<C>).post(create_task::<C>))
        .route("/api/tasks/:id", get(get_task::<C>))
        .route("/api/tasks/:id/migrate", post(migrate_task::<C>))
        .route("/api/workers", get(list_workers::<C>))
        .route("/api/workers/:id/fail", post(fail_worker::<C>))
        .route("/ws", get(ws_handler::<C>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Maps `CoordinatorError` to a status code; everything the admin surface
/// can observe is either a not-found or a collaborator failure.
struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        match &err {
            CoordinatorError::TaskNotFound(_) | CoordinatorError::WorkerNotFound(_) => {
                ApiError(StatusCode::NOT_FOUND, err.to_string())
            }
            _ => ApiError(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        }
    }
}

async fn list_tasks<C: Clock>(State(state): State<AppState<C>>) -> Json<Vec<Task>> {
    Json(state.coordinator.list_tasks())
}

async fn get_task<C: Clock>(State(state): State<AppState<C>>, Path(id): Path<TaskId>) -> Result<Json<Task>, ApiError> {
    state
        .coordinator
        .get_task(id)
        .map(Json)
        .ok_or_else(|| ApiError::from(CoordinatorError::TaskNotFound(id)))
}

#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    #[serde(rename = "type")]
    task_type: String,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    data: serde_json::Map<String, serde_json::Value>,
}

async fn create_task<C: Clock>(
    State(state): State<AppState<C>>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.coordinator.create_task(request.task_type, request.priority, request.data).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Debug, Deserialize)]
struct MigrateRequest {
    #[serde(rename = "workerId")]
    target_worker_id: String,
}

async fn migrate_task<C: Clock>(
    State(state): State<AppState<C>>,
    Path(id): Path<TaskId>,
    Json(request): Json<MigrateRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = state.coordinator.migrate_task(id, WorkerId::new(request.target_worker_id)).await?;
    Ok(Json(task))
}

async fn list_workers<C: Clock>(State(state): State<AppState<C>>) -> Json<Vec<WorkerRecord>> {
    Json(state.coordinator.list_workers())
}

async fn fail_worker<C: Clock>(State(state): State<AppState<C>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    state.coordinator.fail_worker(&WorkerId::new(id)).await?;
    Ok(StatusCode::OK)
}

async fn ws_handler<C: Clock>(State(state): State<AppState<C>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| forward_push_events(socket, state.push))
}

async fn forward_push_events(mut socket: WebSocket, push: Arc<dyn PushChannel>) {
    let mut events = push.subscribe();
    loop {
        match events.recv().await {
            Ok(event) => {
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(text)).await.is_err() {
                    return;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
        }
    }
}
