use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::PortalSettings;

use super::clock::Clock;
use super::domain::{Actor, Job, JobId, User, UserId};
use super::errors::{Missing, PortalError};
use super::repository::PortalStore;

/// Shared handles every portal service is built from.
pub struct PortalContext<S> {
    pub store: Arc<S>,
    pub clock: Arc<dyn Clock>,
    pub settings: PortalSettings,
}

impl<S> Clone for PortalContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            settings: self.settings.clone(),
        }
    }
}

impl<S: PortalStore> PortalContext<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, settings: PortalSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn job(&self, id: JobId) -> Result<Job, PortalError> {
        self.store
            .fetch_job(id)?
            .ok_or(PortalError::NotFound(Missing::Job(id)))
    }

    pub(crate) fn user(&self, id: UserId) -> Result<User, PortalError> {
        self.store
            .fetch_user(id)?
            .ok_or(PortalError::NotFound(Missing::User(id)))
    }
}

/// The caller of an operation that requires a signed-in account.
pub(crate) fn signed_in(actor: Option<&Actor>) -> Result<&Actor, PortalError> {
    actor.ok_or_else(PortalError::unauthenticated)
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
