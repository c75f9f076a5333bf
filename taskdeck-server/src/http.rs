//! JSON REST surface under `/api/tasks`.
//!
//! Every route requires `Authorization: Bearer <token>`. Responses share
//! one envelope: `{"success": bool, "message"?: string, "data"?: ...}`.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Deserializer, Serialize};
use taskdeck_proto::error::ValidationError;
use taskdeck_proto::query::{FilterSpec, ListParams, TaskPage};
use taskdeck_proto::stats::StatsSnapshot;
use taskdeck_proto::task::{
    DueDateChange, NewTask, OwnerId, Priority, Task, TaskId, TaskPatch, parse_due_date,
};

use crate::auth::{self, AuthError, Authenticator};
use crate::server::AppState;
use crate::service::ServiceError;

/// The task routes, ready to be merged into the application router.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/stats", get(task_stats))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
}

/// Response envelope shared by every route.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    fn with_message(message: &str, data: Option<T>) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskData {
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub stats: StatsSnapshot,
}

/// A failed request: status code plus a caller-facing message.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            success: false,
            message: Some(self.message),
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for HttpError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            ServiceError::NotFound => Self::new(StatusCode::NOT_FOUND, "Task not found"),
            ServiceError::StoreUnavailable(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
            }
        }
    }
}

impl From<ValidationError> for HttpError {
    fn from(err: ValidationError) -> Self {
        ServiceError::from(err).into()
    }
}

impl From<AuthError> for HttpError {
    fn from(err: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, err.to_string())
    }
}

impl From<QueryRejection> for HttpError {
    fn from(err: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.body_text())
    }
}

impl From<JsonRejection> for HttpError {
    fn from(err: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.body_text())
    }
}

/// The authenticated caller, resolved from the bearer token.
pub struct Owner(pub OwnerId);

impl FromRequestParts<Arc<AppState>> for Owner {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(auth::bearer_token)
            .ok_or(AuthError::MissingToken)?;
        let owner = state.auth.authenticate(token).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected bearer token");
        })?;
        Ok(Self(owner))
    }
}

/// `POST /api/tasks` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    due_date: Option<String>,
}

impl CreateBody {
    fn into_new_task(self) -> Result<NewTask, ValidationError> {
        let due_date = match self.due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_due_date(raw)?),
        };
        Ok(NewTask {
            title: self.title,
            description: self.description,
            priority: self.priority,
            due_date,
        })
    }
}

/// `PUT /api/tasks/{id}` body. An absent `dueDate` keeps the current value;
/// `null` or `""` clears it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody {
    title: Option<String>,
    description: Option<String>,
    completed: Option<bool>,
    priority: Option<Priority>,
    #[serde(default, deserialize_with = "present")]
    due_date: Option<Option<String>>,
}

/// Marks a field as present, even when its value is `null`.
fn present<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Option<String>>, D::Error> {
    Option::<String>::deserialize(de).map(Some)
}

impl UpdateBody {
    fn into_patch(self) -> Result<TaskPatch, ValidationError> {
        let due_date = match self.due_date {
            None => DueDateChange::Keep,
            Some(None) => DueDateChange::Clear,
            Some(Some(raw)) if raw.trim().is_empty() => DueDateChange::Clear,
            Some(Some(raw)) => DueDateChange::Set(parse_due_date(&raw)?),
        };
        Ok(TaskPatch {
            title: self.title,
            description: self.description,
            completed: self.completed,
            priority: self.priority,
            due_date,
        })
    }
}

/// An id that does not parse cannot name an existing task.
fn parse_id(raw: &str) -> Result<TaskId, HttpError> {
    raw.parse().map_err(|_| ServiceError::NotFound.into())
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Envelope<TaskPage>>, HttpError> {
    let Query(mut params) = query?;
    if params.limit.is_none() {
        params.limit = Some(i64::from(state.default_page_size));
    }
    let spec = FilterSpec::try_from(params)?;
    let page = state.service.list(&owner, &spec).await?;
    Ok(Json(Envelope::data(page)))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Envelope<TaskData>>, HttpError> {
    let task = state.service.get(&owner, &parse_id(&id)?).await?;
    Ok(Json(Envelope::data(TaskData { task })))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<TaskData>>), HttpError> {
    let Json(body) = body?;
    let task = state.service.create(&owner, body.into_new_task()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Task created successfully",
            Some(TaskData { task }),
        )),
    ))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    body: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<Json<Envelope<TaskData>>, HttpError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let task = state
        .service
        .update(&owner, &id, body.into_patch()?)
        .await?;
    Ok(Json(Envelope::with_message(
        "Task updated successfully",
        Some(TaskData { task }),
    )))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>, HttpError> {
    state.service.delete(&owner, &parse_id(&id)?).await?;
    Ok(Json(Envelope::with_message("Task deleted successfully", None)))
}

async fn task_stats(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> Result<Json<Envelope<StatsData>>, HttpError> {
    let stats = state.service.stats(&owner).await?;
    Ok(Json(Envelope::data(StatsData { stats })))
}
