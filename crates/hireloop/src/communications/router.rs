use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::domain::{
    DispatchRequest, EntityId, MergeContext, NewTemplate, TemplateId, TenantId,
};
use super::error::CommunicationError;
use super::merge;
use super::repository::{
    ActivityRepository, Mailer, RecipientRepository, TemplateRepository,
};
use super::service::CommunicationService;

pub const TENANT_HEADER: &str = "x-tenant-id";

type SharedService<T, R, A, M> = Arc<CommunicationService<T, R, A, M>>;

/// Router builder exposing template, dispatch, and activity endpoints.
pub fn communication_router<T, R, A, M>(service: SharedService<T, R, A, M>) -> Router
where
    T: TemplateRepository + 'static,
    R: RecipientRepository + 'static,
    A: ActivityRepository + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route(
            "/api/v1/communications/templates",
            post(create_template_handler::<T, R, A, M>).get(list_templates_handler::<T, R, A, M>),
        )
        .route(
            "/api/v1/communications/templates/:template_id",
            get(get_template_handler::<T, R, A, M>),
        )
        .route(
            "/api/v1/communications/templates/:template_id/preview",
            post(preview_template_handler::<T, R, A, M>),
        )
        .route(
            "/api/v1/communications/dispatch",
            post(dispatch_handler::<T, R, A, M>),
        )
        .route(
            "/api/v1/communications/activity/:entity_id",
            get(activity_handler::<T, R, A, M>),
        )
        .route(
            "/api/v1/communications/merge-fields",
            get(merge_fields_handler),
        )
        .with_state(service)
}

pub(crate) fn tenant_from_headers(headers: &HeaderMap) -> Option<TenantId> {
    headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| TenantId(value.to_string()))
}

fn missing_tenant() -> Response {
    let payload = json!({
        "error": format!("missing {TENANT_HEADER} header"),
    });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

pub(crate) fn error_response(error: CommunicationError) -> Response {
    let status = match &error {
        CommunicationError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CommunicationError::NotFound { .. } => StatusCode::NOT_FOUND,
        CommunicationError::Infrastructure(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

pub(crate) async fn create_template_handler<T, R, A, M>(
    State(service): State<SharedService<T, R, A, M>>,
    headers: HeaderMap,
    Json(input): Json<NewTemplate>,
) -> Response
where
    T: TemplateRepository + 'static,
    R: RecipientRepository + 'static,
    A: ActivityRepository + 'static,
    M: Mailer + 'static,
{
    let Some(tenant) = tenant_from_headers(&headers) else {
        return missing_tenant();
    };

    match service.create_template(&tenant, input) {
        Ok(template) => (StatusCode::CREATED, Json(template)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_templates_handler<T, R, A, M>(
    State(service): State<SharedService<T, R, A, M>>,
    headers: HeaderMap,
) -> Response
where
    T: TemplateRepository + 'static,
    R: RecipientRepository + 'static,
    A: ActivityRepository + 'static,
    M: Mailer + 'static,
{
    let Some(tenant) = tenant_from_headers(&headers) else {
        return missing_tenant();
    };

    match service.list_templates(&tenant) {
        Ok(templates) => (StatusCode::OK, Json(templates)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_template_handler<T, R, A, M>(
    State(service): State<SharedService<T, R, A, M>>,
    headers: HeaderMap,
    Path(template_id): Path<String>,
) -> Response
where
    T: TemplateRepository + 'static,
    R: RecipientRepository + 'static,
    A: ActivityRepository + 'static,
    M: Mailer + 'static,
{
    let Some(tenant) = tenant_from_headers(&headers) else {
        return missing_tenant();
    };

    match service.get_template(&tenant, &TemplateId(template_id)) {
        Ok(template) => (StatusCode::OK, Json(template)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn preview_template_handler<T, R, A, M>(
    State(service): State<SharedService<T, R, A, M>>,
    headers: HeaderMap,
    Path(template_id): Path<String>,
    Json(ctx): Json<MergeContext>,
) -> Response
where
    T: TemplateRepository + 'static,
    R: RecipientRepository + 'static,
    A: ActivityRepository + 'static,
    M: Mailer + 'static,
{
    let Some(tenant) = tenant_from_headers(&headers) else {
        return missing_tenant();
    };

    match service.preview_template(&tenant, &TemplateId(template_id), &ctx) {
        Ok(rendered) => (StatusCode::OK, Json(rendered)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dispatch_handler<T, R, A, M>(
    State(service): State<SharedService<T, R, A, M>>,
    headers: HeaderMap,
    Json(request): Json<DispatchRequest>,
) -> Response
where
    T: TemplateRepository + 'static,
    R: RecipientRepository + 'static,
    A: ActivityRepository + 'static,
    M: Mailer + 'static,
{
    let Some(tenant) = tenant_from_headers(&headers) else {
        return missing_tenant();
    };

    // Detached so a dropped connection cannot cut a batch short.
    let outcome = tokio::spawn(async move { service.dispatch(&tenant, request).await }).await;

    match outcome {
        Ok(Ok(result)) => (StatusCode::OK, Json(result)).into_response(),
        Ok(Err(error)) => error_response(error),
        Err(join_error) => {
            error!(error = %join_error, "dispatch task failed");
            let payload = json!({
                "error": "dispatch aborted unexpectedly",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn activity_handler<T, R, A, M>(
    State(service): State<SharedService<T, R, A, M>>,
    headers: HeaderMap,
    Path(entity_id): Path<String>,
) -> Response
where
    T: TemplateRepository + 'static,
    R: RecipientRepository + 'static,
    A: ActivityRepository + 'static,
    M: Mailer + 'static,
{
    let Some(tenant) = tenant_from_headers(&headers) else {
        return missing_tenant();
    };

    match service.activity_for(&tenant, &EntityId(entity_id)) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn merge_fields_handler() -> Response {
    (StatusCode::OK, Json(merge::vocabulary())).into_response()
}
