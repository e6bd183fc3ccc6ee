//! Task API endpoints
//!
//! RESTful API for task CRUD operations.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use task_core::task::{PageRequest, Task, TaskInput};
use task_core::Error;

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Raw paging parameters; anything that is not a number counts as absent
#[derive(Debug, Default)]
pub struct ListTasksQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListTasksQuery {
    /// Keep the first value of each known key; repeats and unknown keys are ignored
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut query.page,
                "limit" => &mut query.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }

    fn page_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.as_deref().and_then(query_number),
            self.limit.as_deref().and_then(query_number),
        )
    }
}

/// Parse an integer parameter, saturating digit strings that overflow `i64`
fn query_number(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn from_core(err: Error) -> ApiError {
    let status = match &err {
        Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::InvalidId(_) => StatusCode::BAD_REQUEST,
        Error::TaskNotFound(_) => StatusCode::NOT_FOUND,
        Error::Storage(_) | Error::Cache(_) | Error::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, err.to_string())
}

fn bad_payload(rejection: JsonRejection) -> ApiError {
    tracing::debug!("Rejected task payload: {}", rejection);
    api_error(StatusCode::BAD_REQUEST, "Invalid request payload")
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /tasks?page=&limit= - List one page of tasks
async fn list_tasks(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let query = ListTasksQuery::from_pairs(pairs);
    let tasks = state
        .task_service()
        .list(query.page_request())
        .await
        .map_err(from_core)?;
    Ok(Json(tasks))
}

/// POST /tasks - Create a new task
async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(mut input) = payload.map_err(bad_payload)?;
    // Identity is always server-assigned over HTTP.
    input.id = None;

    let created = state
        .task_service()
        .create(input)
        .await
        .map_err(from_core)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /tasks/{id} - Get a single task
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task = state.task_service().get(&id).await.map_err(from_core)?;
    Ok(Json(task))
}

/// PUT /tasks/{id} - Replace the editable fields of a task
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(input) = payload.map_err(bad_payload)?;
    let updated = state
        .task_service()
        .update(&id, input)
        .await
        .map_err(from_core)?;
    Ok(Json(updated))
}

/// DELETE /tasks/{id} - Delete a task
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.task_service().delete(&id).await.map_err(from_core)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::Request,
        response::Response,
    };
    use serde_json::{json, Value};
    use task_core::task::{InMemoryTaskCache, InMemoryTaskStore, TaskService};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn build_state() -> AppState {
        let service = TaskService::new(
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(InMemoryTaskCache::new()),
        );
        AppState::new(service)
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        router()
            .with_state(state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn create(state: &AppState, title: &str) -> Value {
        let response = send(
            state,
            "POST",
            "/tasks",
            Some(json!({ "title": title, "description": "", "status": "todo" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    #[tokio::test]
    async fn create_task_returns_created_task() {
        let state = build_state();
        let supplied_id = Uuid::new_v4();

        let response = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({
                "id": supplied_id,
                "title": "Ship release",
                "description": "tag and publish",
                "status": "in_progress",
                "created_at": "2001-01-01T00:00:00Z"
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let payload = json_body(response).await;
        assert_ne!(payload["id"], supplied_id.to_string());
        assert_eq!(payload["title"], "Ship release");
        assert_eq!(payload["description"], "tag and publish");
        assert_eq!(payload["status"], "in_progress");
        assert_eq!(payload["created_at"], payload["updated_at"]);
    }

    #[tokio::test]
    async fn create_task_maps_validation_and_payload_errors() {
        let state = build_state();

        let empty_title = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({ "title": "", "status": "todo" })),
        )
        .await;
        assert_eq!(empty_title.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(empty_title).await["error"].is_string());

        let bad_status = send(
            &state,
            "POST",
            "/tasks",
            Some(json!({ "title": "Task", "status": "archived" })),
        )
        .await;
        assert_eq!(bad_status.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let malformed = router()
            .with_state(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tasks")
                    .header("Content-Type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(malformed).await["error"], "Invalid request payload");
    }

    #[tokio::test]
    async fn get_task_round_trips_and_maps_errors() {
        let state = build_state();
        let created = create(&state, "Fetch me").await;
        let id = created["id"].as_str().unwrap();

        let response = send(&state, "GET", &format!("/tasks/{}", id), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, created);

        let missing = send(&state, "GET", &format!("/tasks/{}", Uuid::new_v4()), None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let malformed = send(&state, "GET", "/tasks/not-a-uuid", None).await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_tasks_paginates_and_clamps_parameters() {
        let state = build_state();
        for i in 0..25 {
            create(&state, &format!("Task {}", i)).await;
        }

        let first = json_body(send(&state, "GET", "/tasks", None).await).await;
        assert_eq!(first.as_array().unwrap().len(), 20);
        assert_eq!(first[0]["title"], "Task 0");

        let second = json_body(send(&state, "GET", "/tasks?page=2&limit=20", None).await).await;
        let second = second.as_array().unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second[0]["title"], "Task 20");

        let past_end = json_body(send(&state, "GET", "/tasks?page=9", None).await).await;
        assert!(past_end.as_array().unwrap().is_empty());

        let clamped = send(&state, "GET", "/tasks?page=-4&limit=500", None).await;
        assert_eq!(clamped.status(), StatusCode::OK);
        assert_eq!(json_body(clamped).await.as_array().unwrap().len(), 20);

        let garbage = send(&state, "GET", "/tasks?page=abc&limit=xyz", None).await;
        assert_eq!(garbage.status(), StatusCode::OK);
        assert_eq!(json_body(garbage).await.as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn list_tasks_uses_first_value_of_repeated_parameters() {
        let state = build_state();
        for i in 0..12 {
            create(&state, &format!("Task {}", i)).await;
        }

        let repeated_page = send(&state, "GET", "/tasks?limit=5&page=1&page=2", None).await;
        assert_eq!(repeated_page.status(), StatusCode::OK);
        let repeated_page = json_body(repeated_page).await;
        assert_eq!(repeated_page.as_array().unwrap().len(), 5);
        assert_eq!(repeated_page[0]["title"], "Task 0");

        let repeated_limit = send(&state, "GET", "/tasks?limit=5&limit=7", None).await;
        assert_eq!(repeated_limit.status(), StatusCode::OK);
        assert_eq!(json_body(repeated_limit).await.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn list_tasks_with_overflowing_page_is_empty() {
        let state = build_state();
        create(&state, "Only task").await;

        let response = send(&state, "GET", "/tasks?page=99999999999999999999999", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await.as_array().unwrap().is_empty());

        let huge_limit = send(&state, "GET", "/tasks?limit=99999999999999999999999", None).await;
        assert_eq!(huge_limit.status(), StatusCode::OK);
        assert_eq!(json_body(huge_limit).await.as_array().unwrap().len(), 1);
    }

    #[test]
    fn query_number_saturates_only_digit_strings() {
        assert_eq!(query_number(" 42 "), Some(42));
        assert_eq!(query_number("-3"), Some(-3));
        assert_eq!(query_number("99999999999999999999999"), Some(i64::MAX));
        assert_eq!(query_number("-99999999999999999999999"), Some(i64::MIN));
        assert_eq!(query_number("12abc"), None);
        assert_eq!(query_number("-"), None);
        assert_eq!(query_number(""), None);
    }

    #[tokio::test]
    async fn update_task_changes_fields_and_keeps_identity() {
        let state = build_state();
        let created = create(&state, "Draft").await;
        let id = created["id"].as_str().unwrap();

        // Prime the list cache so the update must invalidate it.
        send(&state, "GET", "/tasks", None).await;

        let response = send(
            &state,
            "PUT",
            &format!("/tasks/{}", id),
            Some(json!({ "title": "Final", "description": "done now", "status": "done" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = json_body(response).await;
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["created_at"], created["created_at"]);
        assert_eq!(updated["status"], "done");

        let listed = json_body(send(&state, "GET", "/tasks", None).await).await;
        assert_eq!(listed[0]["title"], "Final");
    }

    #[tokio::test]
    async fn update_task_maps_errors() {
        let state = build_state();
        let body = json!({ "title": "Task", "status": "todo" });

        let missing = send(
            &state,
            "PUT",
            &format!("/tasks/{}", Uuid::new_v4()),
            Some(body.clone()),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let malformed_id = send(&state, "PUT", "/tasks/42", Some(body)).await;
        assert_eq!(malformed_id.status(), StatusCode::BAD_REQUEST);

        let created = create(&state, "Task").await;
        let invalid = send(
            &state,
            "PUT",
            &format!("/tasks/{}", created["id"].as_str().unwrap()),
            Some(json!({ "title": "Task", "status": "blocked" })),
        )
        .await;
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn delete_task_returns_no_content_then_not_found() {
        let state = build_state();
        let created = create(&state, "Remove me").await;
        let uri = format!("/tasks/{}", created["id"].as_str().unwrap());

        let response = send(&state, "DELETE", &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let gone = send(&state, "GET", &uri, None).await;
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);

        let again = send(&state, "DELETE", &uri, None).await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);

        let malformed = send(&state, "DELETE", "/tasks/nope", None).await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }
}
