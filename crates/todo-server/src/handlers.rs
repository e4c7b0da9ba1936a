//! HTTP request handlers for the to-do service.
//!
//! Every service call touches SQLite, so handlers run it on the blocking
//! pool and translate `LifecycleError` into an `ErrorMessage` response.

use crate::dto::{AddItemRequest, ErrorMessage, ItemDto};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use todo_domain::{ItemId, ItemStore, Status};
use todo_lifecycle::{LifecycleError, LifecycleService};
use todo_store::SqliteStore;
use todo_sweeper::{SweepMetrics, SweepWorker};

/// Lifecycle service over the SQLite store
pub type TodoService = LifecycleService<SqliteStore>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Item operations
    pub service: Arc<TodoService>,
    /// Background sweeper, absent when disabled
    pub sweeper: Option<Arc<SweepWorker<SqliteStore>>>,
}

/// Query of `PATCH /items/:id/status`
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Requested status text
    pub status: String,
}

/// Query of `GET /items`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Include `DONE` and `PAST_DUE` items
    #[serde(rename = "retrieveAll", default)]
    pub retrieve_all: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// `healthy` or `unavailable`
    pub status: String,
    /// Stored items, when the store answered
    pub item_count: Option<u64>,
    /// Sweeper counters, when the sweeper runs
    pub sweep: Option<SweepMetrics>,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Error raised by the lifecycle service
    Lifecycle(LifecycleError),
    /// Path id that cannot name any item
    UnknownId(String),
    /// Malformed request (body, query or status text)
    BadRequest(String),
    /// Internal server error
    Internal(String),
}

impl From<LifecycleError> for AppError {
    fn from(e: LifecycleError) -> Self {
        AppError::Lifecycle(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

const NOT_FOUND: &str = "Resource Not Found";
const INVALID_INPUT: &str = "Invalid input data";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, description, message) = match self {
            AppError::Lifecycle(e) => {
                let (status, description) = match &e {
                    LifecycleError::Validation(_) => (StatusCode::BAD_REQUEST, INVALID_INPUT),
                    LifecycleError::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND),
                    LifecycleError::Concurrency { .. } => (StatusCode::LOCKED, "Resource locked"),
                    LifecycleError::Store(_) | LifecycleError::SweepIncomplete { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
                    }
                };
                (status, description, e.to_string())
            }
            AppError::UnknownId(raw) => (
                StatusCode::NOT_FOUND,
                NOT_FOUND,
                format!("Item not found with ID: {}", raw),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, INVALID_INPUT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error", msg),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", message);
        } else {
            tracing::debug!(status = status.as_u16(), "Request rejected: {}", message);
        }

        let body = Json(ErrorMessage {
            status_code: status.as_u16(),
            timestamp: Utc::now(),
            message,
            description: description.to_string(),
        });
        (status, body).into_response()
    }
}

/// Run a service call on the blocking pool
async fn with_service<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&TodoService) -> Result<T, LifecycleError> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(&state.service);
    let result = tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(result?)
}

fn parse_id(raw: &str) -> Result<ItemId, AppError> {
    ItemId::from_str(raw).map_err(|_| AppError::UnknownId(raw.to_string()))
}

/// POST /item - Add a new item
async fn add_item(
    State(state): State<AppState>,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ItemDto>), AppError> {
    let Json(request) = payload?;
    let item = with_service(&state, move |service| {
        service.add_item(request.description, request.due_date)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}

/// PATCH /items/:id/description - Replace the description (raw text body)
async fn update_description(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    description: String,
) -> Result<Json<ItemDto>, AppError> {
    let id = parse_id(&raw_id)?;
    let item = with_service(&state, move |service| {
        service.update_description(id, description)
    })
    .await?;

    Ok(Json(item.into()))
}

/// PATCH /items/:id/status?status= - Change the status
async fn update_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<ItemDto>, AppError> {
    let id = parse_id(&raw_id)?;
    let Query(query) = query?;
    let status = Status::from_str(&query.status).map_err(|_| {
        AppError::BadRequest(format!(
            "Invalid status value is used to update Item with id : {}",
            id
        ))
    })?;

    let item = with_service(&state, move |service| service.update_status(id, status)).await?;

    Ok(Json(item.into()))
}

/// GET /items/:id - Fetch one item
async fn get_item(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<ItemDto>, AppError> {
    let id = parse_id(&raw_id)?;
    let item = with_service(&state, move |service| {
        service.get_item(id)?.ok_or(LifecycleError::NotFound(id))
    })
    .await?;

    Ok(Json(item.into()))
}

/// GET /items?retrieveAll= - List items
async fn list_items(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<ItemDto>>, AppError> {
    let Query(query) = query?;
    let items = with_service(&state, move |service| {
        service.list_items(query.retrieve_all)
    })
    .await?;

    Ok(Json(items.into_iter().map(ItemDto::from).collect()))
}

/// GET /health - Store reachability and sweeper counters
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthCheckResponse>) {
    let service = Arc::clone(&state.service);
    let count = tokio::task::spawn_blocking(move || service.store().count()).await;
    let sweep = state.sweeper.as_ref().map(|worker| worker.metrics());

    match count {
        Ok(Ok(count)) => (
            StatusCode::OK,
            Json(HealthCheckResponse {
                status: "healthy".to_string(),
                item_count: Some(count),
                sweep,
            }),
        ),
        Ok(Err(e)) => {
            tracing::error!("Health check could not reach the store: {}", e);
            unavailable(sweep)
        }
        Err(e) => {
            tracing::error!("Health check task failed: {}", e);
            unavailable(sweep)
        }
    }
}

fn unavailable(sweep: Option<SweepMetrics>) -> (StatusCode, Json<HealthCheckResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(HealthCheckResponse {
            status: "unavailable".to_string(),
            item_count: None,
            sweep,
        }),
    )
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/item", post(add_item))
        .route("/items", get(list_items))
        .route("/items/:id", get(get_item))
        .route("/items/:id/description", patch(update_description))
        .route("/items/:id/status", patch(update_status))
        .route("/health", get(health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: AppError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn test_lifecycle_error_mapping() {
        let id = ItemId::new();

        assert_eq!(
            status_of(LifecycleError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(LifecycleError::NotFound(id).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(LifecycleError::Concurrency { id }.into()),
            StatusCode::LOCKED
        );
        assert_eq!(
            status_of(LifecycleError::Store("disk".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_request_error_mapping() {
        assert_eq!(
            status_of(AppError::UnknownId("abc".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::BadRequest("nope".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Internal("panic".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let id = ItemId::new();
        let response = AppError::from(LifecycleError::Concurrency { id }).into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ErrorMessage = serde_json::from_slice(&body).unwrap();

        assert_eq!(error.status_code, 423);
        assert_eq!(error.description, "Resource locked");
        assert_eq!(
            error.message,
            format!("Item with: {} is already locked by another transaction", id)
        );
    }
}
