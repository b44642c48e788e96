//! HTTP transport boundary.
//!
//! Wires the validator and generation service to `POST
//! /api/flashcards/generate`, and the persistence gateway to the
//! collection endpoints. Runs on a plain TCP listener with graceful
//! shutdown, the same lifecycle as any of our embedded servers.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::generation::{
    validate, FlashcardProposal, GenerateRequest, GenerationService, ValidationIssue, BACK_MAX,
    FRONT_MAX,
};
use crate::review::SavePayload;
use crate::storage::{PersistenceGateway, StorageError};

/// User attributed to saved collections while the service runs without
/// authentication.
const LOCAL_USER: &str = "local";

/// Server state shared across requests.
pub struct AppState {
    pub service: GenerationService,
    pub gateway: Mutex<Box<dyn PersistenceGateway>>,
}

impl AppState {
    pub fn new(service: GenerationService, gateway: Box<dyn PersistenceGateway>) -> Self {
        Self {
            service,
            gateway: Mutex::new(gateway),
        }
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/flashcards/generate", post(generate_flashcards))
        .route("/api/collections", post(save_collection).get(list_collections))
        .route(
            "/api/collections/{id}/flashcards",
            get(list_collection_flashcards),
        )
        .route("/api/collections/{id}", axum::routing::delete(delete_collection))
        .route("/api/logs", get(list_logs))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn bad_request(details: Vec<ValidationIssue>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Invalid request body",
            "details": details,
        })),
    )
        .into_response()
}

fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error",
            "message": message,
        })),
    )
        .into_response()
}

fn storage_error(err: StorageError) -> Response {
    match err {
        StorageError::CollectionNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Collection not found: {}", id) })),
        )
            .into_response(),
        other => {
            log::error!("Storage error: {}", other);
            internal_error("Storage operation failed".to_string())
        }
    }
}

/// `POST /api/flashcards/generate`
async fn generate_flashcards(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    // Decode by hand so shape errors get the same 400 envelope as
    // validation errors.
    let request: GenerateRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => {
            return bad_request(vec![ValidationIssue {
                path: "body".to_string(),
                message: err.to_string(),
            }]);
        }
    };

    let valid = match validate(request) {
        Ok(valid) => valid,
        Err(errors) => return bad_request(errors.issues),
    };

    match state.service.generate_flashcards(&valid).await {
        Ok(batch) => (StatusCode::OK, Json(batch)).into_response(),
        Err(err) => {
            log::error!("Error generating flashcards: {}", err);
            internal_error(err.to_string())
        }
    }
}

/// Body of `POST /api/collections`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveCollectionRequest {
    name: String,
    flashcards: Vec<FlashcardProposal>,
    /// Session total for the generation log; defaults to the number of
    /// cards being saved.
    total_generated: Option<usize>,
}

/// `POST /api/collections`: persist the accepted subset of a session.
async fn save_collection(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveCollectionRequest>,
) -> Response {
    let mut issues = Vec::new();
    if request.name.trim().is_empty() {
        issues.push(ValidationIssue {
            path: "name".to_string(),
            message: "Collection name must not be empty".to_string(),
        });
    }
    for (i, card) in request.flashcards.iter().enumerate() {
        if card.front.chars().count() > FRONT_MAX {
            issues.push(ValidationIssue {
                path: format!("flashcards[{}].front", i),
                message: format!("Front must not exceed {} characters", FRONT_MAX),
            });
        }
        if card.back.chars().count() > BACK_MAX {
            issues.push(ValidationIssue {
                path: format!("flashcards[{}].back", i),
                message: format!("Back must not exceed {} characters", BACK_MAX),
            });
        }
    }
    if !issues.is_empty() {
        return bad_request(issues);
    }

    let total_accepted = request.flashcards.len();
    let payload = SavePayload {
        flashcards: request.flashcards,
        total_generated: request.total_generated.unwrap_or(total_accepted),
        total_accepted,
    };

    let gateway = state.gateway.lock().unwrap();
    match gateway.save_batch(&request.name, LOCAL_USER, &payload) {
        Ok(collection) => (StatusCode::CREATED, Json(collection)).into_response(),
        Err(err) => storage_error(err),
    }
}

/// `GET /api/collections`
async fn list_collections(State(state): State<Arc<AppState>>) -> Response {
    let gateway = state.gateway.lock().unwrap();
    match gateway.list_collections() {
        Ok(collections) => (StatusCode::OK, Json(collections)).into_response(),
        Err(err) => storage_error(err),
    }
}

/// `GET /api/collections/{id}/flashcards`
async fn list_collection_flashcards(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let gateway = state.gateway.lock().unwrap();
    match gateway.list_flashcards(id) {
        Ok(cards) => (StatusCode::OK, Json(cards)).into_response(),
        Err(err) => storage_error(err),
    }
}

/// `DELETE /api/collections/{id}`
async fn delete_collection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let gateway = state.gateway.lock().unwrap();
    match gateway.delete_collection(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => storage_error(err),
    }
}

/// `GET /api/logs`
async fn list_logs(State(state): State<Arc<AppState>>) -> Response {
    let gateway = state.gateway.lock().unwrap();
    match gateway.list_logs() {
        Ok(logs) => (StatusCode::OK, Json(logs)).into_response(),
        Err(err) => storage_error(err),
    }
}

/// Handle for managing the server lifecycle.
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Signal the server to stop. Shutdown completes in the background;
    /// use [`ServerHandle::shutdown`] to wait for it.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Stop the server and wait until in-flight connections have drained
    /// and the serve task has exited.
    pub async fn shutdown(mut self) {
        self.stop();
        let _ = self.task.await;
    }
}

/// Bind and start serving. Returns a handle holding the bound address
/// and the shutdown sender.
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<ServerHandle, std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    log::info!("Flashcard service listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = router(state);

    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                log::info!("Flashcard service shutting down");
            })
            .await
            .ok();
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
