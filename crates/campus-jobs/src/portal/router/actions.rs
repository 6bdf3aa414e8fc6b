use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};

use super::{signed_in, Accepted, Caller};
use crate::portal::catalog::JobSkillDraft;
use crate::portal::domain::{ApplicationId, JobId, MessageId, NotificationId, SkillId};
use crate::portal::errors::{ApiError, Resource, Scoped};
use crate::portal::lifecycle::StatusChange;
use crate::portal::pagination::{Page, PageRequest};
use crate::portal::repository::PortalStore;
use crate::portal::Portal;

/// Routes that do not fit the CRUD shape.
pub(super) fn action_routes<S>(portal: Portal<S>) -> Router
where
    S: PortalStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications/:id/update_status",
            post(update_status::<S>),
        )
        .route("/api/v1/applications/:id/withdraw", post(withdraw::<S>))
        .route(
            "/api/v1/notifications/:id/mark_as_read",
            post(mark_notification_read::<S>),
        )
        .route(
            "/api/v1/notifications/mark_all_as_read",
            post(mark_all_notifications_read::<S>),
        )
        .route("/api/v1/jobs/:id/applications", get(job_applications::<S>))
        .route(
            "/api/v1/jobs/:id/skills",
            get(job_skills::<S>).post(attach_job_skill::<S>),
        )
        .route(
            "/api/v1/jobs/:id/skills/:skill_id",
            delete(detach_job_skill::<S>),
        )
        .route("/api/v1/jobs/:id/reviews", get(job_reviews::<S>))
        .route("/api/v1/jobs/:id/favorite", post(toggle_favorite::<S>))
        .route("/api/v1/favorites", get(favorite_jobs::<S>))
        .route("/api/v1/messages/threads", get(message_threads::<S>))
        .route(
            "/api/v1/messages/:id/mark_as_read",
            post(mark_message_read::<S>),
        )
        .with_state(portal)
}

async fn update_status<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<ApplicationId>, PathRejection>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Applications;
    let actor = signed_in(&caller, resource, &method)?;
    let Path(id) = id.accepted(resource, &method)?;
    let Json(change) = body.accepted(resource, &method)?;
    let application = portal
        .applications
        .update_status(&actor, id, &change.status)
        .scoped(resource, &method)?;
    Ok(Json(application).into_response())
}

async fn withdraw<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<ApplicationId>, PathRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Applications;
    let actor = signed_in(&caller, resource, &method)?;
    let Path(id) = id.accepted(resource, &method)?;
    let application = portal
        .applications
        .withdraw(&actor, id)
        .scoped(resource, &method)?;
    Ok(Json(application).into_response())
}

async fn mark_notification_read<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<NotificationId>, PathRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Notifications;
    let actor = signed_in(&caller, resource, &method)?;
    let Path(id) = id.accepted(resource, &method)?;
    let notification = portal
        .notifications
        .mark_as_read(&actor, id)
        .scoped(resource, &method)?;
    Ok(Json(notification).into_response())
}

async fn mark_all_notifications_read<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
) -> Result<Response, ApiError> {
    let resource = Resource::Notifications;
    let actor = signed_in(&caller, resource, &method)?;
    let marked = portal
        .notifications
        .mark_all_as_read(&actor)
        .scoped(resource, &method)?;
    Ok(Json(marked).into_response())
}

async fn job_applications<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<JobId>, PathRejection>,
    page: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Jobs;
    let actor = signed_in(&caller, resource, &method)?;
    let Path(id) = id.accepted(resource, &method)?;
    let Query(page) = page.accepted(resource, &method)?;
    let applications = portal
        .applications
        .for_job(&actor, id)
        .scoped(resource, &method)?;
    let page_size = portal.settings.page_size;
    Ok(Json(Page::paginate(applications, page, page_size)).into_response())
}

async fn job_skills<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    method: Method,
    id: Result<Path<JobId>, PathRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Jobs;
    let Path(id) = id.accepted(resource, &method)?;
    let skills = portal.jobs.skills(id).scoped(resource, &method)?;
    Ok(Json(skills).into_response())
}

async fn attach_job_skill<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<JobId>, PathRejection>,
    body: Result<Json<JobSkillDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Jobs;
    let actor = signed_in(&caller, resource, &method)?;
    let Path(id) = id.accepted(resource, &method)?;
    let Json(draft) = body.accepted(resource, &method)?;
    let link = portal
        .jobs
        .attach_skill(&actor, id, draft)
        .scoped(resource, &method)?;
    Ok((StatusCode::CREATED, Json(link)).into_response())
}

async fn detach_job_skill<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    ids: Result<Path<(JobId, SkillId)>, PathRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Jobs;
    let actor = signed_in(&caller, resource, &method)?;
    let Path((job, skill)) = ids.accepted(resource, &method)?;
    portal
        .jobs
        .detach_skill(&actor, job, skill)
        .scoped(resource, &method)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn job_reviews<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<JobId>, PathRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Reviews;
    let Path(id) = id.accepted(resource, &method)?;
    let summary = portal
        .reviews
        .for_job(caller.actor(), id)
        .scoped(resource, &method)?;
    Ok(Json(summary).into_response())
}

async fn toggle_favorite<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<JobId>, PathRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Favorites;
    let actor = signed_in(&caller, resource, &method)?;
    let Path(id) = id.accepted(resource, &method)?;
    let state = portal
        .favorites
        .toggle(&actor, id)
        .scoped(resource, &method)?;
    Ok(Json(state).into_response())
}

async fn favorite_jobs<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    page: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Favorites;
    let actor = signed_in(&caller, resource, &method)?;
    let Query(page) = page.accepted(resource, &method)?;
    let jobs = portal.favorites.jobs(&actor).scoped(resource, &method)?;
    let page_size = portal.settings.page_size;
    Ok(Json(Page::paginate(jobs, page, page_size)).into_response())
}

async fn message_threads<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
) -> Result<Response, ApiError> {
    let resource = Resource::Messages;
    let actor = signed_in(&caller, resource, &method)?;
    let threads = portal.messages.threads(&actor).scoped(resource, &method)?;
    Ok(Json(threads).into_response())
}

async fn mark_message_read<S: PortalStore + 'static>(
    State(portal): State<Portal<S>>,
    Extension(caller): Extension<Caller>,
    method: Method,
    id: Result<Path<MessageId>, PathRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::Messages;
    let actor = signed_in(&caller, resource, &method)?;
    let Path(id) = id.accepted(resource, &method)?;
    let message = portal
        .messages
        .mark_read(&actor, id)
        .scoped(resource, &method)?;
    Ok(Json(message).into_response())
}
