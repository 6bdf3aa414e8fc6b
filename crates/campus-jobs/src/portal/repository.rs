use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Department, DepartmentId, Favorite, Job, JobId,
    JobSkill, JobType, Message, MessageId, Notification, NotificationId,
    NotificationKind, Profile, Review, ReviewId, Role, Schedule, Skill, SkillCategory, SkillId,
    SkillLevel, User, UserId, UserSkill, UserSkillId,
};

/// Error enumeration for storage failures.
///
/// `Conflict` is raised by the store itself when an insert would break a
/// uniqueness constraint; callers never pre-check existence.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} already exists")]
    Conflict(&'static str),
    #[error("{0} no longer exists")]
    Missing(&'static str),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub name: String,
    pub description: String,
    pub location: String,
    pub contact_email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub department_id: DepartmentId,
    pub employer_id: UserId,
    pub job_type: JobType,
    pub schedule: Option<Schedule>,
    pub salary: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSkill {
    pub name: String,
    pub category: SkillCategory,
}

#[derive(Debug, Clone)]
pub struct NewJobSkill {
    pub job_id: JobId,
    pub skill_id: SkillId,
    pub is_required: bool,
    pub level: SkillLevel,
}

#[derive(Debug, Clone)]
pub struct NewUserSkill {
    pub user_id: UserId,
    pub skill_id: SkillId,
    pub level: SkillLevel,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: JobId,
    pub applicant_id: UserId,
    pub status: ApplicationStatus,
    pub cover_letter: String,
    pub resume: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub application_id: Option<ApplicationId>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub job_id: JobId,
    pub reviewer_id: UserId,
    pub rating: u8,
    pub comment: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken.
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn list_users(&self) -> Result<Vec<User>, RepositoryError>;
    fn update_user(&self, user: User) -> Result<(), RepositoryError>;
}

pub trait DepartmentRepository: Send + Sync {
    fn insert_department(&self, department: NewDepartment) -> Result<Department, RepositoryError>;
    fn fetch_department(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError>;
    fn list_departments(&self) -> Result<Vec<Department>, RepositoryError>;
    fn update_department(&self, department: Department) -> Result<(), RepositoryError>;
    /// Removes the department together with its jobs.
    fn delete_department(&self, id: DepartmentId) -> Result<bool, RepositoryError>;
}

pub trait JobRepository: Send + Sync {
    fn insert_job(&self, job: NewJob) -> Result<Job, RepositoryError>;
    fn fetch_job(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;
    fn list_jobs(&self) -> Result<Vec<Job>, RepositoryError>;
    fn update_job(&self, job: Job) -> Result<(), RepositoryError>;
    /// Removes the job and everything hanging off it.
    fn delete_job(&self, id: JobId) -> Result<bool, RepositoryError>;
}

pub trait SkillRepository: Send + Sync {
    /// Fails with `Conflict` when the name is taken.
    fn insert_skill(&self, skill: NewSkill) -> Result<Skill, RepositoryError>;
    fn fetch_skill(&self, id: SkillId) -> Result<Option<Skill>, RepositoryError>;
    fn list_skills(&self) -> Result<Vec<Skill>, RepositoryError>;
    fn update_skill(&self, skill: Skill) -> Result<(), RepositoryError>;
    fn delete_skill(&self, id: SkillId) -> Result<bool, RepositoryError>;

    /// Fails with `Conflict` when the skill is already attached to the job.
    fn insert_job_skill(&self, link: NewJobSkill) -> Result<JobSkill, RepositoryError>;
    fn job_skills(&self, job: JobId) -> Result<Vec<JobSkill>, RepositoryError>;
    fn all_job_skills(&self) -> Result<Vec<JobSkill>, RepositoryError>;
    fn delete_job_skill(&self, job: JobId, skill: SkillId) -> Result<bool, RepositoryError>;

    /// Fails with `Conflict` when the user already lists the skill.
    fn insert_user_skill(&self, link: NewUserSkill) -> Result<UserSkill, RepositoryError>;
    fn fetch_user_skill(&self, id: UserSkillId) -> Result<Option<UserSkill>, RepositoryError>;
    fn user_skills(&self, user: UserId) -> Result<Vec<UserSkill>, RepositoryError>;
    fn update_user_skill(&self, link: UserSkill) -> Result<(), RepositoryError>;
    fn delete_user_skill(&self, id: UserSkillId) -> Result<bool, RepositoryError>;
}

pub trait ApplicationRepository: Send + Sync {
    /// Atomic insert-or-fail: `Conflict` when (job, applicant) already exists.
    fn insert_application(&self, application: NewApplication)
        -> Result<Application, RepositoryError>;
    fn fetch_application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn list_applications(&self) -> Result<Vec<Application>, RepositoryError>;
    fn applications_for_job(&self, job: JobId) -> Result<Vec<Application>, RepositoryError>;
    fn applications_for_applicant(&self, user: UserId)
        -> Result<Vec<Application>, RepositoryError>;
    /// Compare-and-swap on the status: moves the row from `expected` to `next`
    /// only while the stored status is still `expected`.
    fn transition_application(
        &self,
        id: ApplicationId,
        expected: ApplicationStatus,
        next: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<GuardedWrite, RepositoryError>;
    /// Replaces the row only while its stored status is still `expected`.
    fn update_application_if(
        &self,
        expected: ApplicationStatus,
        application: Application,
    ) -> Result<GuardedWrite, RepositoryError>;
    /// Removes the application and its messages while its status is `expected`.
    fn delete_application_if(
        &self,
        id: ApplicationId,
        expected: ApplicationStatus,
    ) -> Result<GuardedWrite, RepositoryError>;
}

/// Outcome of a status-guarded application write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedWrite {
    /// The write happened; carries the row as stored (or as removed).
    Applied(Application),
    /// Another writer got there first; carries the status now stored.
    Stale(ApplicationStatus),
    Missing,
}

pub trait MessageRepository: Send + Sync {
    fn insert_message(&self, message: NewMessage) -> Result<Message, RepositoryError>;
    fn fetch_message(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;
    /// Messages the user sent or received.
    fn messages_for_user(&self, user: UserId) -> Result<Vec<Message>, RepositoryError>;
    fn messages_for_application(
        &self,
        application: ApplicationId,
    ) -> Result<Vec<Message>, RepositoryError>;
    fn update_message(&self, message: Message) -> Result<(), RepositoryError>;
    fn delete_message(&self, id: MessageId) -> Result<bool, RepositoryError>;
}

pub trait NotificationRepository: Send + Sync {
    fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError>;
    fn fetch_notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError>;
    fn notifications_for_user(&self, user: UserId) -> Result<Vec<Notification>, RepositoryError>;
    fn update_notification(&self, notification: Notification) -> Result<(), RepositoryError>;
    fn delete_notification(&self, id: NotificationId) -> Result<bool, RepositoryError>;
}

pub trait ReviewRepository: Send + Sync {
    /// Atomic insert-or-fail: `Conflict` when (job, reviewer) already exists.
    fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError>;
    fn fetch_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError>;
    fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError>;
    fn reviews_for_job(&self, job: JobId) -> Result<Vec<Review>, RepositoryError>;
    fn update_review(&self, review: Review) -> Result<(), RepositoryError>;
    fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError>;
}

pub trait FavoriteRepository: Send + Sync {
    /// Atomic insert-or-fail: `Conflict` when (user, job) already exists.
    fn insert_favorite(
        &self,
        user: UserId,
        job: JobId,
        at: DateTime<Utc>,
    ) -> Result<Favorite, RepositoryError>;
    fn delete_favorite(&self, user: UserId, job: JobId) -> Result<bool, RepositoryError>;
    fn favorites_for_user(&self, user: UserId) -> Result<Vec<Favorite>, RepositoryError>;
}

/// Everything the portal services need from persistence.
pub trait PortalStore:
    UserRepository
    + DepartmentRepository
    + JobRepository
    + SkillRepository
    + ApplicationRepository
    + MessageRepository
    + NotificationRepository
    + ReviewRepository
    + FavoriteRepository
{
}

impl<T> PortalStore for T where
    T: UserRepository
        + DepartmentRepository
        + JobRepository
        + SkillRepository
        + ApplicationRepository
        + MessageRepository
        + NotificationRepository
        + ReviewRepository
        + FavoriteRepository
{
}
