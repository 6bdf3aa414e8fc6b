//! Messaging between an applicant and the employer of the job they applied
//! to. A conversation is only open while the application is accepted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::{is_blank, signed_in, PortalContext};
use super::domain::{
    Actor, Application, ApplicationId, ApplicationStatus, Message, MessageId, NotificationKind,
    UserId,
};
use super::errors::{Missing, PortalError, Resource};
use super::notifications::Notifier;
use super::pagination::{Page, PageRequest};
use super::repository::{NewMessage, PortalStore};
use super::resource::ResourceService;

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDraft {
    pub application: ApplicationId,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePatch {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageFilter {
    #[serde(default)]
    pub application: Option<ApplicationId>,
    #[serde(default)]
    pub is_read: Option<bool>,
}

/// Messages exchanged with one counterpart about one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thread {
    pub application_id: Option<ApplicationId>,
    pub counterpart_id: UserId,
    pub unread: usize,
    pub last_activity: DateTime<Utc>,
    pub messages: Vec<Message>,
}

pub struct MessageService<S> {
    ctx: PortalContext<S>,
    notifier: Notifier<S>,
}

impl<S: PortalStore> MessageService<S> {
    pub fn new(ctx: PortalContext<S>, notifier: Notifier<S>) -> Self {
        Self { ctx, notifier }
    }

    fn message(&self, id: MessageId) -> Result<Message, PortalError> {
        self.ctx
            .store
            .fetch_message(id)?
            .ok_or(PortalError::NotFound(Missing::Message(id)))
    }

    /// The other participant of `application`, or `None` when the actor is
    /// not part of the conversation.
    fn counterpart(
        &self,
        actor: &Actor,
        application: &Application,
    ) -> Result<Option<UserId>, PortalError> {
        let employer = self.ctx.job(application.job_id)?.employer_id;
        Ok(if actor.id == application.applicant_id {
            Some(employer)
        } else if actor.id == employer {
            Some(application.applicant_id)
        } else {
            None
        })
    }

    pub fn send(&self, actor: &Actor, draft: MessageDraft) -> Result<Message, PortalError> {
        let application = self
            .ctx
            .store
            .fetch_application(draft.application)?
            .ok_or(PortalError::NotFound(Missing::Application(draft.application)))?;
        let receiver = self.counterpart(actor, &application)?.ok_or_else(|| {
            PortalError::permission("only the applicant and the employer can message each other")
        })?;
        if application.status != ApplicationStatus::Accepted {
            return Err(PortalError::messaging_locked(application.status));
        }
        if is_blank(&draft.content) {
            return Err(PortalError::invalid("message content must not be empty"));
        }

        let message = self.ctx.store.insert_message(NewMessage {
            sender_id: actor.id,
            receiver_id: receiver,
            application_id: Some(application.id),
            content: draft.content,
            created_at: self.ctx.now(),
        })?;
        let sender = self.ctx.user(actor.id)?;
        self.notifier.notify(
            receiver,
            NotificationKind::NewMessage,
            "New message",
            format!("{} sent you a message.", sender.username),
        )?;

        tracing::info!(
            message = %message.id,
            application = %application.id,
            sender = %actor.id,
            receiver = %receiver,
            "message sent"
        );
        Ok(message)
    }

    /// Messages the actor sent or received, most recent first.
    pub fn mailbox(&self, actor: &Actor, filter: &MessageFilter) -> Result<Vec<Message>, PortalError> {
        let mut messages: Vec<Message> = self
            .ctx
            .store
            .messages_for_user(actor.id)?
            .into_iter()
            .filter(|m| filter.application.map_or(true, |id| m.application_id == Some(id)))
            .filter(|m| filter.is_read.map_or(true, |read| m.is_read == read))
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(messages)
    }

    /// The mailbox grouped per (application, counterpart), busiest first.
    pub fn threads(&self, actor: &Actor) -> Result<Vec<Thread>, PortalError> {
        let mut grouped: BTreeMap<(Option<ApplicationId>, UserId), Vec<Message>> = BTreeMap::new();
        for message in self.mailbox(actor, &MessageFilter::default())? {
            let counterpart = if message.sender_id == actor.id {
                message.receiver_id
            } else {
                message.sender_id
            };
            grouped
                .entry((message.application_id, counterpart))
                .or_default()
                .push(message);
        }

        let mut threads: Vec<Thread> = grouped
            .into_iter()
            .filter_map(|((application_id, counterpart_id), messages)| {
                let last_activity = messages.first()?.created_at;
                let unread = messages
                    .iter()
                    .filter(|m| m.receiver_id == actor.id && !m.is_read)
                    .count();
                Some(Thread {
                    application_id,
                    counterpart_id,
                    unread,
                    last_activity,
                    messages,
                })
            })
            .collect();
        threads.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(threads)
    }

    /// Receiver acknowledges a message; repeated calls are no-ops.
    pub fn mark_read(&self, actor: &Actor, id: MessageId) -> Result<Message, PortalError> {
        let mut message = self.message(id)?;
        if message.receiver_id != actor.id {
            return Err(PortalError::permission(
                "only the receiver can mark a message as read",
            ));
        }
        if !message.is_read {
            message.is_read = true;
            self.ctx.store.update_message(message.clone())?;
        }
        Ok(message)
    }

    fn sent_by(&self, actor: &Actor, id: MessageId) -> Result<Message, PortalError> {
        let message = self.message(id)?;
        if message.sender_id != actor.id {
            return Err(PortalError::permission(
                "only the sender can change or delete a message",
            ));
        }
        Ok(message)
    }
}

impl<S: PortalStore + 'static> ResourceService for MessageService<S> {
    type Id = MessageId;
    type Item = Message;
    type Create = MessageDraft;
    type Update = MessagePatch;
    type Filter = MessageFilter;

    const RESOURCE: Resource = Resource::Messages;

    fn list(
        &self,
        actor: Option<&Actor>,
        filter: MessageFilter,
        page: PageRequest,
    ) -> Result<Page<Message>, PortalError> {
        let items = self.mailbox(signed_in(actor)?, &filter)?;
        Ok(Page::paginate(items, page, self.ctx.settings.page_size))
    }

    fn retrieve(&self, actor: Option<&Actor>, id: MessageId) -> Result<Message, PortalError> {
        let actor = signed_in(actor)?;
        let message = self.message(id)?;
        if message.sender_id != actor.id && message.receiver_id != actor.id {
            return Err(PortalError::permission(
                "messages are visible only to their participants",
            ));
        }
        Ok(message)
    }

    fn create(&self, actor: Option<&Actor>, input: MessageDraft) -> Result<Message, PortalError> {
        self.send(signed_in(actor)?, input)
    }

    fn update(
        &self,
        actor: Option<&Actor>,
        id: MessageId,
        input: MessagePatch,
    ) -> Result<Message, PortalError> {
        let mut message = self.sent_by(signed_in(actor)?, id)?;
        if let Some(content) = input.content {
            if is_blank(&content) {
                return Err(PortalError::invalid("message content must not be empty"));
            }
            message.content = content;
            self.ctx.store.update_message(message.clone())?;
        }
        Ok(message)
    }

    fn destroy(&self, actor: Option<&Actor>, id: MessageId) -> Result<(), PortalError> {
        let message = self.sent_by(signed_in(actor)?, id)?;
        self.ctx.store.delete_message(message.id)?;
        Ok(())
    }
}
