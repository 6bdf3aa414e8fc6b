//! Notification fan-out and the owner-facing notification inbox.
//!
//! Notifications are written only through [`Notifier`]; the REST surface can
//! read, acknowledge and delete them but never create or edit one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::{is_blank, signed_in, PortalContext};
use super::domain::{Actor, Notification, NotificationId, NotificationKind, UserId};
use super::errors::{Missing, PortalError, Resource};
use super::pagination::{Page, PageRequest};
use super::repository::{NewNotification, PortalStore};
use super::resource::ResourceService;

/// Internal sink used by the lifecycle, messaging and account services.
pub struct Notifier<S> {
    ctx: PortalContext<S>,
}

impl<S> Clone for Notifier<S> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
        }
    }
}

impl<S: PortalStore> Notifier<S> {
    pub fn new(ctx: PortalContext<S>) -> Self {
        Self { ctx }
    }

    pub fn notify(
        &self,
        user: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Notification, PortalError> {
        let title = title.into();
        if is_blank(&title) {
            return Err(PortalError::invalid("notification title must not be empty"));
        }
        self.ctx.user(user)?;

        let notification = self.ctx.store.insert_notification(NewNotification {
            user_id: user,
            title,
            content: content.into(),
            kind,
            created_at: self.ctx.now(),
        })?;
        tracing::debug!(
            user = %user,
            notification = %notification.id,
            kind = ?kind,
            "notification created"
        );
        Ok(notification)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default, rename = "type")]
    pub kind: Option<NotificationKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkedRead {
    pub updated: usize,
}

pub struct NotificationService<S> {
    ctx: PortalContext<S>,
}

impl<S: PortalStore> NotificationService<S> {
    pub fn new(ctx: PortalContext<S>) -> Self {
        Self { ctx }
    }

    fn owned(&self, actor: &Actor, id: NotificationId) -> Result<Notification, PortalError> {
        let notification = self
            .ctx
            .store
            .fetch_notification(id)?
            .ok_or(PortalError::NotFound(Missing::Notification(id)))?;
        if notification.user_id != actor.id {
            return Err(PortalError::permission(
                "notifications are visible only to their owner",
            ));
        }
        Ok(notification)
    }

    /// The actor's notifications, newest first.
    pub fn inbox(
        &self,
        actor: &Actor,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, PortalError> {
        let mut notifications: Vec<Notification> = self
            .ctx
            .store
            .notifications_for_user(actor.id)?
            .into_iter()
            .filter(|n| filter.is_read.map_or(true, |read| n.is_read == read))
            .filter(|n| filter.kind.map_or(true, |kind| n.kind == kind))
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notifications)
    }

    /// Idempotent: marking an already read notification changes nothing.
    pub fn mark_as_read(
        &self,
        actor: &Actor,
        id: NotificationId,
    ) -> Result<Notification, PortalError> {
        let mut notification = self.owned(actor, id)?;
        if !notification.is_read {
            notification.is_read = true;
            self.ctx.store.update_notification(notification.clone())?;
        }
        Ok(notification)
    }

    pub fn mark_all_as_read(&self, actor: &Actor) -> Result<MarkedRead, PortalError> {
        let mut updated = 0;
        for mut notification in self.ctx.store.notifications_for_user(actor.id)? {
            if notification.is_read {
                continue;
            }
            notification.is_read = true;
            self.ctx.store.update_notification(notification)?;
            updated += 1;
        }
        tracing::info!(user = %actor.id, updated, "notifications marked as read");
        Ok(MarkedRead { updated })
    }
}

impl<S: PortalStore + 'static> ResourceService for NotificationService<S> {
    type Id = NotificationId;
    type Item = Notification;
    type Create = Value;
    type Update = Value;
    type Filter = NotificationFilter;

    const RESOURCE: Resource = Resource::Notifications;

    fn list(
        &self,
        actor: Option<&Actor>,
        filter: NotificationFilter,
        page: PageRequest,
    ) -> Result<Page<Notification>, PortalError> {
        let actor = signed_in(actor)?;
        let items = self.inbox(actor, &filter)?;
        Ok(Page::paginate(items, page, self.ctx.settings.page_size))
    }

    fn retrieve(
        &self,
        actor: Option<&Actor>,
        id: NotificationId,
    ) -> Result<Notification, PortalError> {
        self.owned(signed_in(actor)?, id)
    }

    fn create(&self, actor: Option<&Actor>, _input: Value) -> Result<Notification, PortalError> {
        signed_in(actor)?;
        Err(PortalError::permission(
            "notifications are created by the system only",
        ))
    }

    fn update(
        &self,
        actor: Option<&Actor>,
        _id: NotificationId,
        _input: Value,
    ) -> Result<Notification, PortalError> {
        signed_in(actor)?;
        Err(PortalError::permission(
            "notifications cannot be edited; use mark_as_read instead",
        ))
    }

    fn destroy(&self, actor: Option<&Actor>, id: NotificationId) -> Result<(), PortalError> {
        let notification = self.owned(signed_in(actor)?, id)?;
        self.ctx.store.delete_notification(notification.id)?;
        Ok(())
    }
}
