use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};

use super::{Accepted, Caller};
use crate::portal::errors::{ApiError, Scoped};
use crate::portal::pagination::PageRequest;
use crate::portal::resource::ResourceService;

/// `GET|POST {base}` and `GET|PUT|PATCH|DELETE {base}/:id` for one resource.
pub fn resource_routes<R: ResourceService>(base: &str, service: Arc<R>) -> Router {
    Router::new()
        .route(base, get(list::<R>).post(create::<R>))
        .route(
            &format!("{base}/:id"),
            get(retrieve::<R>)
                .put(update::<R>)
                .patch(update::<R>)
                .delete(destroy::<R>),
        )
        .with_state(service)
}

async fn list<R: ResourceService>(
    State(service): State<Arc<R>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    filter: Result<Query<R::Filter>, QueryRejection>,
    page: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(filter) = filter.accepted(R::RESOURCE, &method)?;
    let Query(page) = page.accepted(R::RESOURCE, &method)?;
    let page = service
        .list(caller.actor(), filter, page)
        .scoped(R::RESOURCE, &method)?;
    Ok(Json(page).into_response())
}

async fn retrieve<R: ResourceService>(
    State(service): State<Arc<R>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<R::Id>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id.accepted(R::RESOURCE, &method)?;
    let item = service
        .retrieve(caller.actor(), id)
        .scoped(R::RESOURCE, &method)?;
    Ok(Json(item).into_response())
}

async fn create<R: ResourceService>(
    State(service): State<Arc<R>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    body: Result<Json<R::Create>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = body.accepted(R::RESOURCE, &method)?;
    let item = service
        .create(caller.actor(), input)
        .scoped(R::RESOURCE, &method)?;
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

/// PUT and PATCH both merge the submitted fields into the stored record.
async fn update<R: ResourceService>(
    State(service): State<Arc<R>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<R::Id>, PathRejection>,
    body: Result<Json<R::Update>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id.accepted(R::RESOURCE, &method)?;
    let Json(input) = body.accepted(R::RESOURCE, &method)?;
    let item = service
        .update(caller.actor(), id, input)
        .scoped(R::RESOURCE, &method)?;
    Ok(Json(item).into_response())
}

async fn destroy<R: ResourceService>(
    State(service): State<Arc<R>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<R::Id>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id.accepted(R::RESOURCE, &method)?;
    service
        .destroy(caller.actor(), id)
        .scoped(R::RESOURCE, &method)?;
    tracing::debug!(resource = ?R::RESOURCE, %id, "resource destroyed");
    Ok(StatusCode::NO_CONTENT.into_response())
}
