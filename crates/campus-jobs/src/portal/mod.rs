//! University job portal: catalog, application lifecycle, status-gated
//! messaging, notifications and engagement features behind a JSON REST API.

pub mod accounts;
pub mod catalog;
pub mod clock;
pub mod context;
pub mod domain;
pub mod engagement;
pub mod errors;
pub mod lifecycle;
pub mod memory;
pub mod messaging;
pub mod notifications;
pub mod pagination;
pub mod repository;
pub mod resource;
pub mod router;
mod validation;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::PortalSettings;

pub use accounts::{UserService, UserSkillService};
pub use catalog::{DepartmentService, JobService, SkillService};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::PortalContext;
pub use domain::{Actor, ApplicationStatus, NotificationKind, Role};
pub use engagement::{FavoriteService, ReviewService};
pub use errors::{ApiError, ErrorKind, PortalError};
pub use lifecycle::ApplicationService;
pub use memory::InMemoryPortalStore;
pub use messaging::MessageService;
pub use notifications::{NotificationService, Notifier};
pub use pagination::{Page, PageRequest};
pub use repository::{PortalStore, RepositoryError};
pub use resource::ResourceService;
pub use router::portal_router;

/// Every portal service, wired against one store.
pub struct Portal<S> {
    pub store: Arc<S>,
    pub settings: PortalSettings,
    pub users: Arc<UserService<S>>,
    pub user_skills: Arc<UserSkillService<S>>,
    pub departments: Arc<DepartmentService<S>>,
    pub jobs: Arc<JobService<S>>,
    pub skills: Arc<SkillService<S>>,
    pub applications: Arc<ApplicationService<S>>,
    pub messages: Arc<MessageService<S>>,
    pub notifications: Arc<NotificationService<S>>,
    pub reviews: Arc<ReviewService<S>>,
    pub favorites: Arc<FavoriteService<S>>,
}

impl<S> Clone for Portal<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
            users: Arc::clone(&self.users),
            user_skills: Arc::clone(&self.user_skills),
            departments: Arc::clone(&self.departments),
            jobs: Arc::clone(&self.jobs),
            skills: Arc::clone(&self.skills),
            applications: Arc::clone(&self.applications),
            messages: Arc::clone(&self.messages),
            notifications: Arc::clone(&self.notifications),
            reviews: Arc::clone(&self.reviews),
            favorites: Arc::clone(&self.favorites),
        }
    }
}

impl<S: PortalStore + 'static> Portal<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, settings: PortalSettings) -> Self {
        let ctx = PortalContext::new(Arc::clone(&store), clock, settings.clone());
        let notifier = Notifier::new(ctx.clone());
        Self {
            store,
            settings,
            users: Arc::new(UserService::new(ctx.clone(), notifier.clone())),
            user_skills: Arc::new(UserSkillService::new(ctx.clone())),
            departments: Arc::new(DepartmentService::new(ctx.clone())),
            jobs: Arc::new(JobService::new(ctx.clone())),
            skills: Arc::new(SkillService::new(ctx.clone())),
            applications: Arc::new(ApplicationService::new(ctx.clone(), notifier.clone())),
            messages: Arc::new(MessageService::new(ctx.clone(), notifier)),
            notifications: Arc::new(NotificationService::new(ctx.clone())),
            reviews: Arc::new(ReviewService::new(ctx.clone())),
            favorites: Arc::new(FavoriteService::new(ctx)),
        }
    }
}

impl Portal<InMemoryPortalStore> {
    /// Portal over an empty in-memory store and the system clock.
    pub fn in_memory(settings: PortalSettings) -> Self {
        Self::new(
            Arc::new(InMemoryPortalStore::new()),
            Arc::new(SystemClock),
            settings,
        )
    }
}
