//! Application lifecycle: submission, employer decisions, applicant
//! cancellation and withdrawal.
//!
//! ```text
//!            employer              employer
//! accepted <---------- pending ----------> rejected
//!                         |
//!                         | applicant
//!                         v
//!                     withdrawn
//! ```
//!
//! Every state other than `pending` is terminal. Cancelling a pending
//! application removes it instead of transitioning it.

use serde::{Deserialize, Serialize};

use super::context::{is_blank, signed_in, PortalContext};
use super::domain::{
    Actor, Application, ApplicationId, ApplicationStatus, Job, JobId, NotificationKind, Role,
    UserId,
};
use super::errors::{FieldErrors, Missing, PortalError, Resource};
use super::notifications::Notifier;
use super::pagination::{Page, PageRequest};
use super::repository::{GuardedWrite, NewApplication, NewMessage, PortalStore, RepositoryError};
use super::resource::ResourceService;

/// Descriptor of an uploaded resume; the bytes live in external storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeUpload {
    pub file_name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationDraft {
    pub job: JobId,
    #[serde(default)]
    pub cover_letter: String,
    #[serde(default)]
    pub resume: Option<ResumeUpload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationPatch {
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume: Option<ResumeUpload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationFilter {
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub job: Option<JobId>,
}

/// Body of `POST /applications/{id}/update_status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

/// Resolve a guarded write; `stale` builds the error for a lost race.
fn settle(
    id: ApplicationId,
    outcome: GuardedWrite,
    stale: impl FnOnce(ApplicationStatus) -> PortalError,
) -> Result<Application, PortalError> {
    match outcome {
        GuardedWrite::Applied(application) => Ok(application),
        GuardedWrite::Stale(current) => Err(stale(current)),
        GuardedWrite::Missing => Err(PortalError::NotFound(Missing::Application(id))),
    }
}

pub struct ApplicationService<S> {
    ctx: PortalContext<S>,
    notifier: Notifier<S>,
}

impl<S: PortalStore> ApplicationService<S> {
    pub fn new(ctx: PortalContext<S>, notifier: Notifier<S>) -> Self {
        Self { ctx, notifier }
    }

    fn application(&self, id: ApplicationId) -> Result<Application, PortalError> {
        self.ctx
            .store
            .fetch_application(id)?
            .ok_or(PortalError::NotFound(Missing::Application(id)))
    }

    /// Validate the cover letter and resume, returning the resume storage key.
    fn check_content(
        &self,
        applicant: UserId,
        job: JobId,
        cover_letter: Option<&str>,
        resume: Option<&ResumeUpload>,
    ) -> Result<Option<String>, PortalError> {
        if let Some(letter) = cover_letter.filter(|letter| is_blank(letter)) {
            let mut fields = FieldErrors::new();
            fields.add(
                "cover_letter",
                "cover letter must not be empty",
                letter,
                &["Explain briefly why you are a good fit"],
            );
            fields.finish()?;
        }
        let Some(upload) = resume else {
            return Ok(None);
        };

        let settings = &self.ctx.settings;
        let extension = upload
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !settings.resume_extensions.contains(&extension) {
            let allowed: Vec<&str> = settings.resume_extensions.iter().map(String::as_str).collect();
            return Err(resume_rejected(
                "invalid_file_type",
                format!("resume type '.{extension}' is not accepted"),
                upload.file_name.clone().into(),
                &allowed,
            ));
        }
        if upload.size_bytes > settings.max_resume_bytes {
            return Err(resume_rejected(
                "file_too_large",
                format!(
                    "resume is {} bytes, the limit is {} bytes",
                    upload.size_bytes, settings.max_resume_bytes
                ),
                upload.size_bytes.into(),
                &["Compress the document or export it as PDF"],
            ));
        }
        Ok(Some(format!("resumes/{applicant}/{job}/{}", upload.file_name)))
    }

    /// Create a pending application for `draft.job` on behalf of a student.
    pub fn submit(&self, actor: &Actor, draft: ApplicationDraft) -> Result<Application, PortalError> {
        if actor.role != Role::Student {
            return Err(PortalError::permission("only students can apply for jobs"));
        }
        let job = self.ctx.job(draft.job)?;
        if job.employer_id == actor.id {
            return Err(PortalError::permission("you cannot apply to your own job"));
        }
        let now = self.ctx.now();
        if !job.accepts_applications_at(now) {
            return Err(PortalError::deadline_expired(job.id));
        }
        if !job.is_active {
            return Err(PortalError::job_closed(job.id));
        }
        let resume = self.check_content(
            actor.id,
            job.id,
            Some(&draft.cover_letter),
            draft.resume.as_ref(),
        )?;

        let application = self
            .ctx
            .store
            .insert_application(NewApplication {
                job_id: job.id,
                applicant_id: actor.id,
                status: ApplicationStatus::Pending,
                cover_letter: draft.cover_letter,
                resume,
                created_at: now,
            })
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => PortalError::application_exists(),
                other => other.into(),
            })?;

        tracing::info!(
            application = %application.id,
            job = %job.id,
            applicant = %actor.id,
            "application submitted"
        );
        Ok(application)
    }

    /// Employer decision on a pending application.
    pub fn update_status(
        &self,
        actor: &Actor,
        id: ApplicationId,
        requested: &str,
    ) -> Result<Application, PortalError> {
        let application = self.application(id)?;
        let job = self.ctx.job(application.job_id)?;
        if actor.role != Role::Employer || job.employer_id != actor.id {
            return Err(PortalError::permission(
                "only the employer who posted the job can change the application status",
            ));
        }
        let next = ApplicationStatus::parse(requested)
            .ok_or_else(|| PortalError::invalid_status(requested))?;
        let previous = application.status;
        let rejected = |current: ApplicationStatus| {
            tracing::warn!(
                application = %id,
                from = %current,
                to = %next,
                "rejected status transition"
            );
            PortalError::invalid_transition(current, next)
        };
        if !previous.employer_can_move_to(next) {
            return Err(rejected(previous));
        }

        let outcome = self
            .ctx
            .store
            .transition_application(id, previous, next, self.ctx.now())?;
        let application = settle(id, outcome, rejected)?;

        self.notifier.notify(
            application.applicant_id,
            NotificationKind::ApplicationUpdate,
            "Application status updated",
            format!(
                "Your application for \"{}\" is now {}.",
                job.title, application.status
            ),
        )?;
        if next == ApplicationStatus::Accepted {
            self.open_conversation(&job, &application)?;
        }

        tracing::info!(
            application = %id,
            from = %previous,
            to = %next,
            employer = %actor.id,
            "application status changed"
        );
        Ok(application)
    }

    /// First message of the thread; sent on acceptance without a
    /// `new_message` notification of its own.
    fn open_conversation(&self, job: &Job, application: &Application) -> Result<(), PortalError> {
        self.ctx.store.insert_message(NewMessage {
            sender_id: job.employer_id,
            receiver_id: application.applicant_id,
            application_id: Some(application.id),
            content: format!(
                "Your application for \"{}\" has been accepted. You can now message the employer here.",
                job.title
            ),
            created_at: self.ctx.now(),
        })?;
        Ok(())
    }

    fn pending_of(&self, actor: &Actor, id: ApplicationId) -> Result<Application, PortalError> {
        let application = self.application(id)?;
        if application.applicant_id != actor.id {
            return Err(PortalError::permission(
                "only the applicant can change this application",
            ));
        }
        if application.status.is_terminal() {
            return Err(PortalError::not_pending(application.status));
        }
        Ok(application)
    }

    /// Delete a pending application.
    pub fn cancel(&self, actor: &Actor, id: ApplicationId) -> Result<(), PortalError> {
        let application = self.pending_of(actor, id)?;
        let outcome = self
            .ctx
            .store
            .delete_application_if(application.id, ApplicationStatus::Pending)?;
        settle(id, outcome, PortalError::not_pending)?;
        tracing::info!(application = %id, applicant = %actor.id, "application cancelled");
        Ok(())
    }

    /// Move a pending application to `withdrawn` and tell the employer.
    pub fn withdraw(&self, actor: &Actor, id: ApplicationId) -> Result<Application, PortalError> {
        let application = self.pending_of(actor, id)?;
        let job = self.ctx.job(application.job_id)?;
        let outcome = self.ctx.store.transition_application(
            id,
            ApplicationStatus::Pending,
            ApplicationStatus::Withdrawn,
            self.ctx.now(),
        )?;
        let application = settle(id, outcome, PortalError::not_pending)?;

        self.notifier.notify(
            job.employer_id,
            NotificationKind::ApplicationUpdate,
            "Application withdrawn",
            format!("An applicant withdrew their application for \"{}\".", job.title),
        )?;
        tracing::info!(application = %id, applicant = %actor.id, "application withdrawn");
        Ok(application)
    }

    pub fn edit(
        &self,
        actor: &Actor,
        id: ApplicationId,
        patch: ApplicationPatch,
    ) -> Result<Application, PortalError> {
        let mut application = self.pending_of(actor, id)?;
        let resume = self.check_content(
            actor.id,
            application.job_id,
            patch.cover_letter.as_deref(),
            patch.resume.as_ref(),
        )?;
        if let Some(letter) = patch.cover_letter {
            application.cover_letter = letter;
        }
        if resume.is_some() {
            application.resume = resume;
        }
        application.updated_at = self.ctx.now();
        let outcome = self
            .ctx
            .store
            .update_application_if(ApplicationStatus::Pending, application)?;
        settle(id, outcome, PortalError::not_pending)
    }

    fn can_view(&self, actor: &Actor, application: &Application) -> Result<bool, PortalError> {
        if actor.is_admin() || application.applicant_id == actor.id {
            return Ok(true);
        }
        Ok(self.ctx.job(application.job_id)?.employer_id == actor.id)
    }

    /// Applications visible to the actor, newest first.
    pub fn visible(
        &self,
        actor: &Actor,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, PortalError> {
        let store = &self.ctx.store;
        let candidates = match actor.role {
            Role::Admin => store.list_applications()?,
            Role::Student => store.applications_for_applicant(actor.id)?,
            Role::Employer => {
                let mut owned = Vec::new();
                for job in store.list_jobs()? {
                    if job.employer_id == actor.id {
                        owned.extend(store.applications_for_job(job.id)?);
                    }
                }
                owned
            }
        };
        let mut applications: Vec<Application> = candidates
            .into_iter()
            .filter(|a| filter.status.map_or(true, |status| a.status == status))
            .filter(|a| filter.job.map_or(true, |job| a.job_id == job))
            .collect();
        newest_first(&mut applications);
        Ok(applications)
    }

    /// Applications received for one job; only its employer may look.
    pub fn for_job(&self, actor: &Actor, job: JobId) -> Result<Vec<Application>, PortalError> {
        let job = self.ctx.job(job)?;
        if job.employer_id != actor.id {
            return Err(PortalError::permission(
                "only the employer who posted the job can list its applications",
            ));
        }
        let mut applications = self.ctx.store.applications_for_job(job.id)?;
        newest_first(&mut applications);
        Ok(applications)
    }
}

fn resume_rejected(
    code: &'static str,
    message: String,
    current: serde_json::Value,
    suggestions: &[&str],
) -> PortalError {
    let mut fields = FieldErrors::new();
    fields.add("resume", message.clone(), current, suggestions);
    PortalError::Validation {
        code,
        message,
        fields: Some(fields),
    }
}

fn newest_first(applications: &mut [Application]) {
    applications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

impl<S: PortalStore + 'static> ResourceService for ApplicationService<S> {
    type Id = ApplicationId;
    type Item = Application;
    type Create = ApplicationDraft;
    type Update = ApplicationPatch;
    type Filter = ApplicationFilter;

    const RESOURCE: Resource = Resource::Applications;

    fn list(
        &self,
        actor: Option<&Actor>,
        filter: ApplicationFilter,
        page: PageRequest,
    ) -> Result<Page<Application>, PortalError> {
        let items = self.visible(signed_in(actor)?, &filter)?;
        Ok(Page::paginate(items, page, self.ctx.settings.page_size))
    }

    fn retrieve(
        &self,
        actor: Option<&Actor>,
        id: ApplicationId,
    ) -> Result<Application, PortalError> {
        let actor = signed_in(actor)?;
        let application = self.application(id)?;
        if !self.can_view(actor, &application)? {
            return Err(PortalError::permission(
                "only the applicant and the job's employer can view this application",
            ));
        }
        Ok(application)
    }

    fn create(
        &self,
        actor: Option<&Actor>,
        input: ApplicationDraft,
    ) -> Result<Application, PortalError> {
        self.submit(signed_in(actor)?, input)
    }

    fn update(
        &self,
        actor: Option<&Actor>,
        id: ApplicationId,
        input: ApplicationPatch,
    ) -> Result<Application, PortalError> {
        self.edit(signed_in(actor)?, id, input)
    }

    fn destroy(&self, actor: Option<&Actor>, id: ApplicationId) -> Result<(), PortalError> {
        self.cancel(signed_in(actor)?, id)
    }
}
