//! Error kinds raised by portal operations and their JSON envelope.
//!
//! Every precondition violation maps to exactly one [`ErrorKind`]. At the HTTP
//! boundary the error is paired with the resource and method of the request so
//! the envelope can carry targeted suggestions.

use std::collections::BTreeMap;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::domain::{
    ApplicationId, ApplicationStatus, DepartmentId, JobId, MessageId, NotificationId, ReviewId,
    SkillId, UserId, UserSkillId,
};
use super::repository::RepositoryError;

/// Coarse classification of a failure; fixes the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Permission,
    NotFound,
    Conflict,
    Server,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Permission => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    User(UserId),
    Department(DepartmentId),
    Job(JobId),
    Skill(SkillId),
    UserSkill(UserSkillId),
    Application(ApplicationId),
    Message(MessageId),
    Notification(NotificationId),
    Review(ReviewId),
    Route,
}

impl Missing {
    pub const fn code(self) -> &'static str {
        match self {
            Missing::User(_) => "user_not_found",
            Missing::Department(_) => "department_not_found",
            Missing::Job(_) => "job_not_found",
            Missing::Application(_) => "application_not_found",
            Missing::Skill(_)
            | Missing::UserSkill(_)
            | Missing::Message(_)
            | Missing::Notification(_)
            | Missing::Review(_)
            | Missing::Route => "not_found",
        }
    }

    fn describe(self) -> String {
        match self {
            Missing::User(id) => format!("user {id} not found"),
            Missing::Department(id) => format!("department {id} not found"),
            Missing::Job(id) => format!("job {id} not found"),
            Missing::Skill(id) => format!("skill {id} not found"),
            Missing::UserSkill(id) => format!("user skill {id} not found"),
            Missing::Application(id) => format!("application {id} not found"),
            Missing::Message(id) => format!("message {id} not found"),
            Missing::Notification(id) => format!("notification {id} not found"),
            Missing::Review(id) => format!("review {id} not found"),
            Missing::Route => "no route matches the requested path".to_string(),
        }
    }
}

/// Per-field validation problems, rendered as the envelope `details` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldErrors(BTreeMap<String, FieldError>);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub current_value: Value,
    pub suggestions: Vec<String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        field: &str,
        message: impl Into<String>,
        current_value: impl Into<Value>,
        suggestions: &[&str],
    ) {
        self.0.insert(
            field.to_string(),
            FieldError {
                message: message.into(),
                current_value: current_value.into(),
                suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn finish(self) -> Result<(), PortalError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PortalError::Validation {
                code: "validation_error",
                message: "request data failed validation".to_string(),
                fields: Some(self),
            })
        }
    }
}

/// Failure of a portal operation.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
        fields: Option<FieldErrors>,
    },
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Permission(String),
    #[error("{}", .0.describe())]
    NotFound(Missing),
    #[error("{message}")]
    Conflict { code: &'static str, message: String },
    #[error("{0}")]
    Server(String),
}

impl PortalError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            fields: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::validation("validation_error", message)
    }

    /// Validation failure on a single field.
    pub fn field(
        field: &str,
        message: impl Into<String>,
        current_value: impl Into<Value>,
        suggestions: &[&str],
    ) -> Self {
        let mut fields = FieldErrors::new();
        fields.add(field, message, current_value, suggestions);
        Self::Validation {
            code: "validation_error",
            message: "request data failed validation".to_string(),
            fields: Some(fields),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission(message.into())
    }

    pub fn unauthenticated() -> Self {
        Self::Authentication("authentication required".to_string())
    }

    pub fn deadline_expired(job: JobId) -> Self {
        Self::validation(
            "job_deadline_expired",
            format!("the application deadline for job {job} has passed"),
        )
    }

    pub fn job_closed(job: JobId) -> Self {
        Self::validation(
            "job_closed",
            format!("job {job} is no longer accepting applications"),
        )
    }

    pub fn invalid_status(raw: &str) -> Self {
        Self::validation(
            "invalid_application_status",
            format!("'{raw}' is not a valid application status"),
        )
    }

    pub fn invalid_transition(from: ApplicationStatus, to: ApplicationStatus) -> Self {
        Self::validation(
            "invalid_status_transition",
            format!("cannot move an application from {from} to {to}"),
        )
    }

    pub fn not_pending(status: ApplicationStatus) -> Self {
        Self::validation(
            "application_not_pending",
            format!("only pending applications can be changed by the applicant (status is {status})"),
        )
    }

    pub fn messaging_locked(status: ApplicationStatus) -> Self {
        Self::validation(
            "messaging_locked",
            format!("messaging opens once the application is accepted (status is {status})"),
        )
    }

    pub fn application_exists() -> Self {
        Self::Conflict {
            code: "application_already_exists",
            message: "an application for this job already exists".to_string(),
        }
    }

    pub fn review_exists() -> Self {
        Self::Conflict {
            code: "review_already_exists",
            message: "you have already reviewed this job".to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            code: "conflict",
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::Validation { .. } => ErrorKind::Validation,
            PortalError::Authentication(_) => ErrorKind::Authentication,
            PortalError::Permission(_) => ErrorKind::Permission,
            PortalError::NotFound(_) => ErrorKind::NotFound,
            PortalError::Conflict { .. } => ErrorKind::Conflict,
            PortalError::Server(_) => ErrorKind::Server,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PortalError::Validation { code, .. } | PortalError::Conflict { code, .. } => *code,
            PortalError::Authentication(_) => "authentication_error",
            PortalError::Permission(_) => "permission_error",
            PortalError::NotFound(missing) => missing.code(),
            PortalError::Server(_) => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    fn details(&self) -> Value {
        match self {
            PortalError::Validation {
                fields: Some(fields),
                ..
            } => serde_json::to_value(fields).unwrap_or_else(|_| Value::String(self.to_string())),
            _ => Value::String(self.to_string()),
        }
    }
}

impl From<RepositoryError> for PortalError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(what) => {
                PortalError::conflict(format!("{what} already exists"))
            }
            RepositoryError::Missing(what) => {
                PortalError::Server(format!("{what} disappeared during the update"))
            }
            RepositoryError::Unavailable(reason) => PortalError::Server(reason),
        }
    }
}

/// REST resource a request addressed; selects resource-specific suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Departments,
    Jobs,
    Applications,
    Skills,
    UserSkills,
    Messages,
    Reviews,
    Notifications,
    Favorites,
    Unknown,
}

impl Resource {
    /// Resolve the resource from a request path such as `/api/v1/jobs/4/skills`.
    pub fn from_path(path: &str) -> Self {
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let first = match (segments.next(), segments.next(), segments.next()) {
            (Some("api"), Some("v1"), Some(resource)) => resource,
            _ => return Resource::Unknown,
        };
        match first {
            "users" => Resource::Users,
            "departments" => Resource::Departments,
            "jobs" => Resource::Jobs,
            "applications" => Resource::Applications,
            "skills" => Resource::Skills,
            "user-skills" => Resource::UserSkills,
            "messages" => Resource::Messages,
            "reviews" => Resource::Reviews,
            "notifications" => Resource::Notifications,
            "favorites" => Resource::Favorites,
            _ => Resource::Unknown,
        }
    }
}

fn base_suggestions(kind: ErrorKind) -> &'static [&'static str] {
    match kind {
        ErrorKind::Validation => &[
            "Check that the submitted values are correct",
            "Make sure all required fields are filled in",
            "Check the data format",
        ],
        ErrorKind::Authentication => &[
            "Check your login credentials",
            "Make sure you are signed in",
            "Try signing in again",
        ],
        ErrorKind::Permission => &[
            "Make sure you have the required permissions",
            "Contact an administrator to request access",
            "Check the role assigned to your account",
        ],
        ErrorKind::NotFound => &[
            "Check that the URL is correct",
            "Make sure the requested resource exists",
        ],
        ErrorKind::Conflict => &[
            "Check that the data is unique",
            "Make sure the resource does not already exist",
            "Try using a different identifier",
        ],
        ErrorKind::Server => &[
            "Retry the request later",
            "Contact support if the problem persists",
            "Check that the request is well formed",
        ],
    }
}

fn resource_suggestions(kind: ErrorKind, resource: Resource) -> &'static [&'static str] {
    match (kind, resource) {
        (ErrorKind::NotFound, Resource::Jobs) => &["Pick a job from the list of open positions"],
        (ErrorKind::NotFound, Resource::Applications) => &["Check the list of your applications"],
        (ErrorKind::Conflict, Resource::Applications) => &[
            "Open your existing application for this job instead of applying again",
        ],
        (ErrorKind::Conflict, Resource::Reviews) => &["Edit your existing review instead"],
        (ErrorKind::Validation, Resource::Applications) => &[
            "Confirm the job is still open before applying",
            "Attach the resume as a PDF or Word document",
        ],
        (ErrorKind::Validation, Resource::Messages) => &[
            "Messaging becomes available after the employer accepts the application",
        ],
        (ErrorKind::Validation, Resource::Jobs) => &["Use a deadline in the future"],
        (ErrorKind::Permission, Resource::Applications) => &[
            "Only students can apply and only the job's employer can change a status",
        ],
        (ErrorKind::Permission, Resource::Jobs) => &[
            "Only employers can post jobs and only the owner can change them",
        ],
        (ErrorKind::Permission, Resource::Notifications) => &[
            "Notifications are created by the system and visible only to their owner",
        ],
        _ => &[],
    }
}

fn method_suggestions(kind: ErrorKind, method: &Method) -> &'static [&'static str] {
    match kind {
        ErrorKind::NotFound if *method == Method::GET => &["Try refreshing the page"],
        ErrorKind::NotFound => &["Reload the resource before modifying it"],
        ErrorKind::Validation if *method == Method::PATCH => {
            &["Send only the fields you want to change"]
        }
        ErrorKind::Authentication if *method != Method::GET => {
            &["Write operations always require authentication"]
        }
        _ => &[],
    }
}

/// Suggestion lookup keyed on error kind, resource and HTTP method.
pub fn suggestions(kind: ErrorKind, resource: Resource, method: &Method) -> Vec<String> {
    base_suggestions(kind)
        .iter()
        .chain(resource_suggestions(kind, resource))
        .chain(method_suggestions(kind, method))
        .map(|suggestion| suggestion.to_string())
        .collect()
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
    pub suggestions: Vec<String>,
}

/// A [`PortalError`] bound to the request that produced it.
#[derive(Debug)]
pub struct ApiError {
    pub error: PortalError,
    pub resource: Resource,
    pub method: Method,
}

impl ApiError {
    pub fn new(error: PortalError, resource: Resource, method: &Method) -> Self {
        Self {
            error,
            resource,
            method: method.clone(),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let kind = self.error.kind();
        ErrorEnvelope {
            error: ErrorBody {
                code: self.error.code(),
                message: self.error.to_string(),
                details: self.error.details(),
                suggestions: suggestions(kind, self.resource, &self.method),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.error.kind() == ErrorKind::Server {
            tracing::error!(error = %self.error, resource = ?self.resource, "request failed");
        }
        (self.error.status(), Json(self.envelope())).into_response()
    }
}

/// Attach request context to a service result.
pub trait Scoped<T> {
    fn scoped(self, resource: Resource, method: &Method) -> Result<T, ApiError>;
}

impl<T> Scoped<T> for Result<T, PortalError> {
    fn scoped(self, resource: Resource, method: &Method) -> Result<T, ApiError> {
        self.map_err(|error| ApiError::new(error, resource, method))
    }
}
