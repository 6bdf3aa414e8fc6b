//! HTTP surface of the portal: one generic CRUD route set per resource, the
//! custom actions, caller resolution and the JSON error envelope for
//! everything that fails before a service is reached.

mod actions;
mod resource;

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;

use super::domain::{Actor, UserId};
use super::errors::{ApiError, Missing, PortalError, Resource};
use super::repository::PortalStore;
use super::Portal;

pub use resource::resource_routes;

/// Header carrying the id of the signed-in user.
pub const USER_HEADER: &str = "x-user-id";

/// Caller of the current request, resolved once by [`authenticate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caller(pub Option<Actor>);

impl Caller {
    pub fn actor(&self) -> Option<&Actor> {
        self.0.as_ref()
    }
}

/// Build the `/api/v1` router over every portal service.
pub fn portal_router<S>(portal: Portal<S>) -> Router
where
    S: PortalStore + 'static,
{
    Router::new()
        .merge(resource_routes("/api/v1/users", Arc::clone(&portal.users)))
        .merge(resource_routes(
            "/api/v1/departments",
            Arc::clone(&portal.departments),
        ))
        .merge(resource_routes("/api/v1/jobs", Arc::clone(&portal.jobs)))
        .merge(resource_routes(
            "/api/v1/applications",
            Arc::clone(&portal.applications),
        ))
        .merge(resource_routes("/api/v1/skills", Arc::clone(&portal.skills)))
        .merge(resource_routes(
            "/api/v1/user-skills",
            Arc::clone(&portal.user_skills),
        ))
        .merge(resource_routes(
            "/api/v1/messages",
            Arc::clone(&portal.messages),
        ))
        .merge(resource_routes("/api/v1/reviews", Arc::clone(&portal.reviews)))
        .merge(resource_routes(
            "/api/v1/notifications",
            Arc::clone(&portal.notifications),
        ))
        .merge(actions::action_routes(portal.clone()))
        .fallback(unknown_route)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&portal.store),
            authenticate::<S>,
        ))
}

/// Resolve `X-User-Id` into a [`Caller`]. A missing header is an anonymous
/// caller; a malformed, unknown or deactivated id is rejected outright.
pub async fn authenticate<S>(
    State(store): State<Arc<S>>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: PortalStore + 'static,
{
    match resolve_caller(store.as_ref(), request.headers()) {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(error) => {
            tracing::warn!(%error, path = request.uri().path(), "caller rejected");
            let resource = Resource::from_path(request.uri().path());
            ApiError::new(error, resource, request.method()).into_response()
        }
    }
}

fn resolve_caller<S: PortalStore>(store: &S, headers: &HeaderMap) -> Result<Caller, PortalError> {
    let Some(raw) = headers.get(USER_HEADER) else {
        return Ok(Caller(None));
    };
    let id = raw
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(UserId)
        .ok_or_else(|| {
            PortalError::Authentication("X-User-Id must be a numeric user id".to_string())
        })?;
    match store.fetch_user(id)? {
        Some(user) if user.is_active => Ok(Caller(Some(Actor::from(&user)))),
        Some(_) => Err(PortalError::Authentication(format!(
            "account {id} is deactivated"
        ))),
        None => Err(PortalError::Authentication(format!("unknown user {id}"))),
    }
}

async fn unknown_route(method: Method, uri: Uri) -> ApiError {
    ApiError::new(
        PortalError::NotFound(Missing::Route),
        Resource::from_path(uri.path()),
        &method,
    )
}

/// Turn an extractor rejection into a validation error envelope.
pub(crate) trait Accepted<T> {
    fn accepted(self, resource: Resource, method: &Method) -> Result<T, ApiError>;
}

impl<T, E: Display> Accepted<T> for Result<T, E> {
    fn accepted(self, resource: Resource, method: &Method) -> Result<T, ApiError> {
        self.map_err(|rejection| {
            ApiError::new(PortalError::invalid(rejection.to_string()), resource, method)
        })
    }
}

/// The signed-in actor of a request, or a 401 envelope.
pub(crate) fn signed_in(caller: &Caller, resource: Resource, method: &Method) -> Result<Actor, ApiError> {
    caller
        .0
        .ok_or_else(|| ApiError::new(PortalError::unauthenticated(), resource, method))
}
