//! Mutex-guarded in-memory implementation of every portal repository.
//!
//! All tables share a single lock so each trait call is atomic, including the
//! uniqueness checks performed inside the insert methods and the cascades run
//! by the delete methods.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Department, DepartmentId, Favorite, FavoriteId, Job, JobId,
    JobSkill, JobSkillId, Message, MessageId, Notification, NotificationId, Review, ReviewId,
    Skill, SkillId, User, UserId, UserSkill, UserSkillId,
};
use super::repository::{
    ApplicationRepository, DepartmentRepository, FavoriteRepository, GuardedWrite, JobRepository,
    MessageRepository, NewApplication, NewDepartment, NewJob, NewJobSkill, NewMessage,
    NewNotification, NewReview, NewSkill, NewUser, NewUserSkill, NotificationRepository,
    RepositoryError, ReviewRepository, SkillRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    sequence: u64,
    users: BTreeMap<UserId, User>,
    departments: BTreeMap<DepartmentId, Department>,
    jobs: BTreeMap<JobId, Job>,
    skills: BTreeMap<SkillId, Skill>,
    job_skills: BTreeMap<JobSkillId, JobSkill>,
    user_skills: BTreeMap<UserSkillId, UserSkill>,
    applications: BTreeMap<ApplicationId, Application>,
    messages: BTreeMap<MessageId, Message>,
    notifications: BTreeMap<NotificationId, Notification>,
    reviews: BTreeMap<ReviewId, Review>,
    favorites: BTreeMap<FavoriteId, Favorite>,
}

impl Tables {
    /// Identifiers are unique across tables, which keeps logs unambiguous.
    fn next_id(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// The application row, provided its status is still `expected`.
    fn application_in(
        &mut self,
        id: ApplicationId,
        expected: ApplicationStatus,
    ) -> Result<&mut Application, GuardedWrite> {
        match self.applications.get_mut(&id) {
            None => Err(GuardedWrite::Missing),
            Some(stored) if stored.status != expected => Err(GuardedWrite::Stale(stored.status)),
            Some(stored) => Ok(stored),
        }
    }

    fn drop_application(&mut self, id: ApplicationId) {
        self.applications.remove(&id);
        self.messages
            .retain(|_, message| message.application_id != Some(id));
    }

    fn drop_job(&mut self, id: JobId) -> bool {
        if self.jobs.remove(&id).is_none() {
            return false;
        }
        self.job_skills.retain(|_, link| link.job_id != id);
        self.favorites.retain(|_, favorite| favorite.job_id != id);
        self.reviews.retain(|_, review| review.job_id != id);
        let applications: Vec<ApplicationId> = self
            .applications
            .values()
            .filter(|application| application.job_id == id)
            .map(|application| application.id)
            .collect();
        for application in applications {
            self.drop_application(application);
        }
        true
    }
}

/// In-memory [`PortalStore`](super::repository::PortalStore).
#[derive(Default)]
pub struct InMemoryPortalStore {
    tables: Mutex<Tables>,
}

impl InMemoryPortalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("portal store lock poisoned".to_string()))
    }
}

fn replace<K: Ord, V>(
    table: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    what: &'static str,
) -> Result<(), RepositoryError> {
    match table.get_mut(&key) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(RepositoryError::Missing(what)),
    }
}

impl UserRepository for InMemoryPortalStore {
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .users
            .values()
            .any(|existing| existing.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(RepositoryError::Conflict("username"));
        }
        if tables
            .users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(RepositoryError::Conflict("email"));
        }
        let id = UserId(tables.next_id());
        let stored = User {
            id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_active: true,
            created_at: user.created_at,
            profile: user.profile,
        };
        tables.users.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }

    fn update_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let taken = tables.users.values().any(|existing| {
            existing.id != user.id
                && (existing.username.eq_ignore_ascii_case(&user.username)
                    || existing.email.eq_ignore_ascii_case(&user.email))
        });
        if taken {
            return Err(RepositoryError::Conflict("username or email"));
        }
        replace(&mut tables.users, user.id, user, "user")
    }
}

impl DepartmentRepository for InMemoryPortalStore {
    fn insert_department(&self, department: NewDepartment) -> Result<Department, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .departments
            .values()
            .any(|existing| existing.name.eq_ignore_ascii_case(&department.name))
        {
            return Err(RepositoryError::Conflict("department name"));
        }
        if tables.departments.values().any(|existing| {
            existing
                .contact_email
                .eq_ignore_ascii_case(&department.contact_email)
        }) {
            return Err(RepositoryError::Conflict("department contact email"));
        }
        let id = DepartmentId(tables.next_id());
        let stored = Department {
            id,
            name: department.name,
            description: department.description,
            location: department.location,
            contact_email: department.contact_email,
            created_at: department.created_at,
        };
        tables.departments.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_department(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError> {
        Ok(self.lock()?.departments.get(&id).cloned())
    }

    fn list_departments(&self) -> Result<Vec<Department>, RepositoryError> {
        Ok(self.lock()?.departments.values().cloned().collect())
    }

    fn update_department(&self, department: Department) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let taken = tables.departments.values().any(|existing| {
            existing.id != department.id
                && (existing.name.eq_ignore_ascii_case(&department.name)
                    || existing
                        .contact_email
                        .eq_ignore_ascii_case(&department.contact_email))
        });
        if taken {
            return Err(RepositoryError::Conflict("department name or contact email"));
        }
        replace(
            &mut tables.departments,
            department.id,
            department,
            "department",
        )
    }

    fn delete_department(&self, id: DepartmentId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.departments.remove(&id).is_none() {
            return Ok(false);
        }
        let jobs: Vec<JobId> = tables
            .jobs
            .values()
            .filter(|job| job.department_id == id)
            .map(|job| job.id)
            .collect();
        for job in jobs {
            tables.drop_job(job);
        }
        Ok(true)
    }
}

impl JobRepository for InMemoryPortalStore {
    fn insert_job(&self, job: NewJob) -> Result<Job, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.departments.contains_key(&job.department_id) {
            return Err(RepositoryError::Missing("department"));
        }
        let id = JobId(tables.next_id());
        let stored = Job {
            id,
            title: job.title,
            description: job.description,
            requirements: job.requirements,
            department_id: job.department_id,
            employer_id: job.employer_id,
            job_type: job.job_type,
            schedule: job.schedule,
            salary: job.salary,
            created_at: job.created_at,
            deadline: job.deadline,
            is_active: true,
        };
        tables.jobs.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_job(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.lock()?.jobs.get(&id).cloned())
    }

    fn list_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        Ok(self.lock()?.jobs.values().cloned().collect())
    }

    fn update_job(&self, job: Job) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        replace(&mut tables.jobs, job.id, job, "job")
    }

    fn delete_job(&self, id: JobId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.drop_job(id))
    }
}

impl SkillRepository for InMemoryPortalStore {
    fn insert_skill(&self, skill: NewSkill) -> Result<Skill, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .skills
            .values()
            .any(|existing| existing.name.eq_ignore_ascii_case(&skill.name))
        {
            return Err(RepositoryError::Conflict("skill"));
        }
        let id = SkillId(tables.next_id());
        let stored = Skill {
            id,
            name: skill.name,
            category: skill.category,
        };
        tables.skills.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_skill(&self, id: SkillId) -> Result<Option<Skill>, RepositoryError> {
        Ok(self.lock()?.skills.get(&id).cloned())
    }

    fn list_skills(&self) -> Result<Vec<Skill>, RepositoryError> {
        Ok(self.lock()?.skills.values().cloned().collect())
    }

    fn update_skill(&self, skill: Skill) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .skills
            .values()
            .any(|existing| existing.id != skill.id && existing.name.eq_ignore_ascii_case(&skill.name))
        {
            return Err(RepositoryError::Conflict("skill"));
        }
        replace(&mut tables.skills, skill.id, skill, "skill")
    }

    fn delete_skill(&self, id: SkillId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.skills.remove(&id).is_none() {
            return Ok(false);
        }
        tables.job_skills.retain(|_, link| link.skill_id != id);
        tables.user_skills.retain(|_, link| link.skill_id != id);
        Ok(true)
    }

    fn insert_job_skill(&self, link: NewJobSkill) -> Result<JobSkill, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.jobs.contains_key(&link.job_id) {
            return Err(RepositoryError::Missing("job"));
        }
        if !tables.skills.contains_key(&link.skill_id) {
            return Err(RepositoryError::Missing("skill"));
        }
        if tables
            .job_skills
            .values()
            .any(|existing| existing.job_id == link.job_id && existing.skill_id == link.skill_id)
        {
            return Err(RepositoryError::Conflict("job skill"));
        }
        let id = JobSkillId(tables.next_id());
        let stored = JobSkill {
            id,
            job_id: link.job_id,
            skill_id: link.skill_id,
            is_required: link.is_required,
            level: link.level,
        };
        tables.job_skills.insert(id, stored.clone());
        Ok(stored)
    }

    fn job_skills(&self, job: JobId) -> Result<Vec<JobSkill>, RepositoryError> {
        Ok(self
            .lock()?
            .job_skills
            .values()
            .filter(|link| link.job_id == job)
            .cloned()
            .collect())
    }

    fn all_job_skills(&self) -> Result<Vec<JobSkill>, RepositoryError> {
        Ok(self.lock()?.job_skills.values().cloned().collect())
    }

    fn delete_job_skill(&self, job: JobId, skill: SkillId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        let before = tables.job_skills.len();
        tables
            .job_skills
            .retain(|_, link| !(link.job_id == job && link.skill_id == skill));
        Ok(tables.job_skills.len() != before)
    }

    fn insert_user_skill(&self, link: NewUserSkill) -> Result<UserSkill, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.skills.contains_key(&link.skill_id) {
            return Err(RepositoryError::Missing("skill"));
        }
        if tables
            .user_skills
            .values()
            .any(|existing| existing.user_id == link.user_id && existing.skill_id == link.skill_id)
        {
            return Err(RepositoryError::Conflict("user skill"));
        }
        let id = UserSkillId(tables.next_id());
        let stored = UserSkill {
            id,
            user_id: link.user_id,
            skill_id: link.skill_id,
            level: link.level,
            verified: false,
        };
        tables.user_skills.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_user_skill(&self, id: UserSkillId) -> Result<Option<UserSkill>, RepositoryError> {
        Ok(self.lock()?.user_skills.get(&id).cloned())
    }

    fn user_skills(&self, user: UserId) -> Result<Vec<UserSkill>, RepositoryError> {
        Ok(self
            .lock()?
            .user_skills
            .values()
            .filter(|link| link.user_id == user)
            .cloned()
            .collect())
    }

    fn update_user_skill(&self, link: UserSkill) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        replace(&mut tables.user_skills, link.id, link, "user skill")
    }

    fn delete_user_skill(&self, id: UserSkillId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.user_skills.remove(&id).is_some())
    }
}

impl ApplicationRepository for InMemoryPortalStore {
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.applications.values().any(|existing| {
            existing.job_id == application.job_id
                && existing.applicant_id == application.applicant_id
        }) {
            return Err(RepositoryError::Conflict("application"));
        }
        let id = ApplicationId(tables.next_id());
        let stored = Application {
            id,
            job_id: application.job_id,
            applicant_id: application.applicant_id,
            status: application.status,
            cover_letter: application.cover_letter,
            resume: application.resume,
            created_at: application.created_at,
            updated_at: application.created_at,
        };
        tables.applications.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.applications.get(&id).cloned())
    }

    fn list_applications(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(self.lock()?.applications.values().cloned().collect())
    }

    fn applications_for_job(&self, job: JobId) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .filter(|application| application.job_id == job)
            .cloned()
            .collect())
    }

    fn applications_for_applicant(
        &self,
        user: UserId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .filter(|application| application.applicant_id == user)
            .cloned()
            .collect())
    }

    fn transition_application(
        &self,
        id: ApplicationId,
        expected: ApplicationStatus,
        next: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<GuardedWrite, RepositoryError> {
        let mut tables = self.lock()?;
        Ok(match tables.application_in(id, expected) {
            Ok(stored) => {
                stored.status = next;
                stored.updated_at = at;
                GuardedWrite::Applied(stored.clone())
            }
            Err(outcome) => outcome,
        })
    }

    fn update_application_if(
        &self,
        expected: ApplicationStatus,
        application: Application,
    ) -> Result<GuardedWrite, RepositoryError> {
        let mut tables = self.lock()?;
        Ok(match tables.application_in(application.id, expected) {
            Ok(stored) => {
                *stored = application.clone();
                GuardedWrite::Applied(application)
            }
            Err(outcome) => outcome,
        })
    }

    fn delete_application_if(
        &self,
        id: ApplicationId,
        expected: ApplicationStatus,
    ) -> Result<GuardedWrite, RepositoryError> {
        let mut tables = self.lock()?;
        let outcome = match tables.application_in(id, expected) {
            Ok(stored) => GuardedWrite::Applied(stored.clone()),
            Err(outcome) => outcome,
        };
        if matches!(outcome, GuardedWrite::Applied(_)) {
            tables.drop_application(id);
        }
        Ok(outcome)
    }
}

impl MessageRepository for InMemoryPortalStore {
    fn insert_message(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let mut tables = self.lock()?;
        if let Some(application) = message.application_id {
            if !tables.applications.contains_key(&application) {
                return Err(RepositoryError::Missing("application"));
            }
        }
        let id = MessageId(tables.next_id());
        let stored = Message {
            id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            application_id: message.application_id,
            content: message.content,
            created_at: message.created_at,
            is_read: false,
        };
        tables.messages.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_message(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self.lock()?.messages.get(&id).cloned())
    }

    fn messages_for_user(&self, user: UserId) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .lock()?
            .messages
            .values()
            .filter(|message| message.sender_id == user || message.receiver_id == user)
            .cloned()
            .collect())
    }

    fn messages_for_application(
        &self,
        application: ApplicationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .lock()?
            .messages
            .values()
            .filter(|message| message.application_id == Some(application))
            .cloned()
            .collect())
    }

    fn update_message(&self, message: Message) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        replace(&mut tables.messages, message.id, message, "message")
    }

    fn delete_message(&self, id: MessageId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.messages.remove(&id).is_some())
    }
}

impl NotificationRepository for InMemoryPortalStore {
    fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        let mut tables = self.lock()?;
        let id = NotificationId(tables.next_id());
        let stored = Notification {
            id,
            user_id: notification.user_id,
            title: notification.title,
            content: notification.content,
            kind: notification.kind,
            created_at: notification.created_at,
            is_read: false,
        };
        tables.notifications.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        Ok(self.lock()?.notifications.get(&id).cloned())
    }

    fn notifications_for_user(&self, user: UserId) -> Result<Vec<Notification>, RepositoryError> {
        Ok(self
            .lock()?
            .notifications
            .values()
            .filter(|notification| notification.user_id == user)
            .cloned()
            .collect())
    }

    fn update_notification(&self, notification: Notification) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        replace(
            &mut tables.notifications,
            notification.id,
            notification,
            "notification",
        )
    }

    fn delete_notification(&self, id: NotificationId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.notifications.remove(&id).is_some())
    }
}

impl ReviewRepository for InMemoryPortalStore {
    fn insert_review(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .reviews
            .values()
            .any(|existing| existing.job_id == review.job_id && existing.reviewer_id == review.reviewer_id)
        {
            return Err(RepositoryError::Conflict("review"));
        }
        let id = ReviewId(tables.next_id());
        let stored = Review {
            id,
            job_id: review.job_id,
            reviewer_id: review.reviewer_id,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
            is_anonymous: review.is_anonymous,
        };
        tables.reviews.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        Ok(self.lock()?.reviews.get(&id).cloned())
    }

    fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        Ok(self.lock()?.reviews.values().cloned().collect())
    }

    fn reviews_for_job(&self, job: JobId) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .lock()?
            .reviews
            .values()
            .filter(|review| review.job_id == job)
            .cloned()
            .collect())
    }

    fn update_review(&self, review: Review) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        replace(&mut tables.reviews, review.id, review, "review")
    }

    fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.reviews.remove(&id).is_some())
    }
}

impl FavoriteRepository for InMemoryPortalStore {
    fn insert_favorite(
        &self,
        user: UserId,
        job: JobId,
        at: DateTime<Utc>,
    ) -> Result<Favorite, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .favorites
            .values()
            .any(|existing| existing.user_id == user && existing.job_id == job)
        {
            return Err(RepositoryError::Conflict("favorite"));
        }
        let id = FavoriteId(tables.next_id());
        let stored = Favorite {
            id,
            user_id: user,
            job_id: job,
            created_at: at,
        };
        tables.favorites.insert(id, stored.clone());
        Ok(stored)
    }

    fn delete_favorite(&self, user: UserId, job: JobId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        let before = tables.favorites.len();
        tables
            .favorites
            .retain(|_, favorite| !(favorite.user_id == user && favorite.job_id == job));
        Ok(tables.favorites.len() != before)
    }

    fn favorites_for_user(&self, user: UserId) -> Result<Vec<Favorite>, RepositoryError> {
        Ok(self
            .lock()?
            .favorites
            .values()
            .filter(|favorite| favorite.user_id == user)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::domain::{JobType, Role};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid")
    }

    fn seeded() -> (InMemoryPortalStore, Job, User) {
        let store = InMemoryPortalStore::new();
        let department = store
            .insert_department(NewDepartment {
                name: "Physics".to_string(),
                description: String::new(),
                location: "Hall B".to_string(),
                contact_email: "physics@campus.edu".to_string(),
                created_at: at(),
            })
            .expect("department");
        let student = store
            .insert_user(NewUser {
                username: "alice".to_string(),
                email: "alice@campus.edu".to_string(),
                role: Role::Student,
                profile: Default::default(),
                created_at: at(),
            })
            .expect("student");
        let job = store
            .insert_job(NewJob {
                title: "Lab assistant".to_string(),
                description: String::new(),
                requirements: String::new(),
                department_id: department.id,
                employer_id: UserId(999),
                job_type: JobType::Research,
                schedule: None,
                salary: None,
                created_at: at(),
                deadline: at(),
            })
            .expect("job");
        (store, job, student)
    }

    fn draft(job: JobId, applicant: UserId) -> NewApplication {
        NewApplication {
            job_id: job,
            applicant_id: applicant,
            status: ApplicationStatus::Pending,
            cover_letter: "hello".to_string(),
            resume: None,
            created_at: at(),
        }
    }

    #[test]
    fn duplicate_application_insert_conflicts() {
        let (store, job, student) = seeded();
        store
            .insert_application(draft(job.id, student.id))
            .expect("first insert");
        let err = store
            .insert_application(draft(job.id, student.id))
            .expect_err("second insert");
        assert!(matches!(err, RepositoryError::Conflict("application")));
    }

    #[test]
    fn usernames_are_unique_ignoring_case() {
        let (store, _, _) = seeded();
        let err = store
            .insert_user(NewUser {
                username: "ALICE".to_string(),
                email: "other@campus.edu".to_string(),
                role: Role::Student,
                profile: Default::default(),
                created_at: at(),
            })
            .expect_err("duplicate username");
        assert!(matches!(err, RepositoryError::Conflict("username")));
    }

    #[test]
    fn deleting_a_job_cascades_to_applications_and_messages() {
        let (store, job, student) = seeded();
        let application = store
            .insert_application(draft(job.id, student.id))
            .expect("insert");
        store
            .insert_message(NewMessage {
                sender_id: UserId(999),
                receiver_id: student.id,
                application_id: Some(application.id),
                content: "welcome".to_string(),
                created_at: at(),
            })
            .expect("message");

        assert!(store.delete_job(job.id).expect("delete"));
        assert!(store
            .fetch_application(application.id)
            .expect("fetch")
            .is_none());
        assert!(store.messages_for_user(student.id).expect("messages").is_empty());
    }

    #[test]
    fn deleting_a_department_removes_its_jobs() {
        let (store, job, _) = seeded();
        assert!(store.delete_department(job.department_id).expect("delete"));
        assert!(store.fetch_job(job.id).expect("fetch").is_none());
    }

    #[test]
    fn status_writes_only_apply_to_the_expected_status() {
        let (store, job, student) = seeded();
        let application = store
            .insert_application(draft(job.id, student.id))
            .expect("insert");

        let first = store
            .transition_application(
                application.id,
                ApplicationStatus::Pending,
                ApplicationStatus::Accepted,
                at(),
            )
            .expect("transition");
        assert!(matches!(
            first,
            GuardedWrite::Applied(ref stored) if stored.status == ApplicationStatus::Accepted
        ));

        let second = store
            .transition_application(
                application.id,
                ApplicationStatus::Pending,
                ApplicationStatus::Withdrawn,
                at(),
            )
            .expect("transition");
        assert_eq!(second, GuardedWrite::Stale(ApplicationStatus::Accepted));

        let edit = store
            .update_application_if(ApplicationStatus::Pending, application.clone())
            .expect("edit");
        assert_eq!(edit, GuardedWrite::Stale(ApplicationStatus::Accepted));

        let removed = store
            .delete_application_if(application.id, ApplicationStatus::Pending)
            .expect("delete");
        assert_eq!(removed, GuardedWrite::Stale(ApplicationStatus::Accepted));
        let stored = store
            .fetch_application(application.id)
            .expect("fetch")
            .expect("still stored");
        assert_eq!(stored.status, ApplicationStatus::Accepted);

        let gone = store
            .delete_application_if(ApplicationId(4242), ApplicationStatus::Pending)
            .expect("delete");
        assert_eq!(gone, GuardedWrite::Missing);
    }

    #[test]
    fn update_of_missing_row_reports_missing() {
        let (store, job, _) = seeded();
        store.delete_job(job.id).expect("delete");
        let err = store.update_job(job).expect_err("gone");
        assert!(matches!(err, RepositoryError::Missing("job")));
    }
}
