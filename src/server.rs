// HTTP surface: axum router over BeneficiarioController

use crate::controller::{ActionResult, BeneficiarioController};
use crate::entities::Beneficiario;
use crate::error::DbError;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<BeneficiarioController>,
}

impl AppState {
    pub fn new(controller: BeneficiarioController) -> Self {
        Self {
            controller: Arc::new(controller),
        }
    }
}

/// Envelope for health and error bodies
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

impl<T: Serialize> IntoResponse for ActionResult<T> {
    fn into_response(self) -> Response {
        match self {
            ActionResult::Ok(value) => (StatusCode::OK, Json(value)).into_response(),
            ActionResult::CreatedAtAction { id, value, .. } => (
                StatusCode::CREATED,
                [(header::LOCATION, crate::controller::beneficiario_location(id))],
                Json(value),
            )
                .into_response(),
            ActionResult::NoContent => StatusCode::NO_CONTENT.into_response(),
            ActionResult::NotFound => error_response(StatusCode::NOT_FOUND, "Beneficiario not found"),
            ActionResult::BadRequest(msg) => error_response(StatusCode::BAD_REQUEST, msg),
            ActionResult::Conflict(msg) => error_response(StatusCode::CONFLICT, msg),
        }
    }
}

/// Storage faults surface as 500 with the details kept in the log
pub struct ApiError(DbError);

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

type ApiResult<T> = Result<ActionResult<T>, ApiError>;

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /beneficiarios
async fn get_all(State(state): State<AppState>) -> ApiResult<Vec<Beneficiario>> {
    Ok(state.controller.get_all().await?)
}

/// GET /beneficiarios/:id
async fn get_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Beneficiario> {
    Ok(state.controller.get_by_id(id).await?)
}

/// POST /beneficiarios
async fn create(
    State(state): State<AppState>,
    Json(beneficiario): Json<Beneficiario>,
) -> ApiResult<Beneficiario> {
    Ok(state.controller.create(beneficiario).await?)
}

/// PUT /beneficiarios/:id
async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(beneficiario): Json<Beneficiario>,
) -> ApiResult<()> {
    Ok(state.controller.update(id, beneficiario).await?)
}

/// DELETE /beneficiarios/:id
async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    Ok(state.controller.delete(id).await?)
}

/// GET /beneficiarios/:id/events
async fn history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<crate::db::Event>> {
    Ok(state.controller.history(id).await?)
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/beneficiarios", get(get_all).post(create))
        .route(
            "/beneficiarios/:id",
            get(get_by_id).put(update).delete(delete),
        )
        .route("/beneficiarios/:id/events", get(history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{camila, pietra, seeded};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app_with(rows: Vec<Beneficiario>) -> Router {
        let db = seeded(rows);
        create_router(AppState::new(BeneficiarioController::new(db)))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = send(app_with(vec![]), "GET", "/health", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"], "OK");
    }

    #[tokio::test]
    async fn get_by_id_returns_record() {
        let response = send(app_with(vec![pietra(15)]), "GET", "/beneficiarios/15", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], 15);
        assert_eq!(body["cpf"], "32989238697");
    }

    #[tokio::test]
    async fn get_by_id_missing_is_404_with_error_body() {
        let response = send(app_with(vec![]), "GET", "/beneficiarios/15", None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Beneficiario not found");
    }

    #[tokio::test]
    async fn get_all_returns_list() {
        let response = send(app_with(vec![pietra(15), camila(16)]), "GET", "/beneficiarios", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Vec<Beneficiario> = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(body, vec![pietra(15), camila(16)]);
    }

    #[tokio::test]
    async fn post_returns_201_with_location() {
        let body = serde_json::to_value(pietra(0)).unwrap();
        let response = send(app_with(vec![]), "POST", "/beneficiarios", Some(body)).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/beneficiarios/1"
        );
        assert_eq!(json_body(response).await["id"], 1);
    }

    #[tokio::test]
    async fn post_invalid_is_400() {
        let mut invalid = pietra(0);
        invalid.uf = "Minas Gerais".to_string();
        let body = serde_json::to_value(invalid).unwrap();

        let response = send(app_with(vec![]), "POST", "/beneficiarios", Some(body)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn put_then_get_sees_new_values() {
        let app = app_with(vec![pietra(10)]);
        let mut updated = pietra(10);
        updated.nome = "Silvana Araujo".to_string();

        let response = send(
            app.clone(),
            "PUT",
            "/beneficiarios/10",
            Some(serde_json::to_value(updated).unwrap()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(app, "GET", "/beneficiarios/10", None).await;
        assert_eq!(json_body(response).await["nome"], "Silvana Araujo");
    }

    #[tokio::test]
    async fn put_unknown_is_404() {
        let body = serde_json::to_value(pietra(10)).unwrap();
        let response = send(app_with(vec![]), "PUT", "/beneficiarios/10", Some(body)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_then_get_is_404() {
        let app = app_with(vec![pietra(10)]);

        let response = send(app.clone(), "DELETE", "/beneficiarios/10", None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(app.clone(), "DELETE", "/beneficiarios/10", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(app, "GET", "/beneficiarios/10/events", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let events = json_body(response).await;
        assert_eq!(events[0]["event_type"], "beneficiario_deleted");
    }

    #[tokio::test]
    async fn non_numeric_id_is_rejected() {
        let response = send(app_with(vec![]), "GET", "/beneficiarios/abc", None).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
