//! Departments, jobs and skills, plus the job search used by the listing
//! endpoint.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::context::{is_blank, signed_in, PortalContext};
use super::domain::{
    Actor, Department, DepartmentId, Job, JobId, JobSkill, JobType, Role, Schedule, Skill,
    SkillCategory, SkillId, SkillLevel,
};
use super::errors::{FieldErrors, Missing, PortalError, Resource};
use super::pagination::{Page, PageRequest};
use super::repository::{NewDepartment, NewJob, NewJobSkill, NewSkill, PortalStore};
use super::resource::ResourceService;
use super::validation::{is_email, shorter_than};

const MIN_DEPARTMENT_NAME: usize = 3;
const MIN_JOB_TITLE: usize = 5;

fn can_curate(actor: &Actor) -> bool {
    matches!(actor.role, Role::Employer | Role::Admin)
}

fn curator(actor: Option<&Actor>) -> Result<&Actor, PortalError> {
    let actor = signed_in(actor)?;
    if !can_curate(actor) {
        return Err(PortalError::permission(
            "only employers and administrators can manage the catalog",
        ));
    }
    Ok(actor)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

// Departments

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentFilter {
    #[serde(default)]
    pub search: Option<String>,
}

fn check_department(name: &str, contact_email: &str) -> Result<(), PortalError> {
    let mut fields = FieldErrors::new();
    if shorter_than(name, MIN_DEPARTMENT_NAME) {
        fields.add(
            "name",
            format!("department name must have at least {MIN_DEPARTMENT_NAME} characters"),
            name,
            &["Use the full department name"],
        );
    }
    if !is_email(contact_email) {
        fields.add(
            "contact_email",
            "enter a valid email address",
            contact_email,
            &["Use an address such as department@university.edu"],
        );
    }
    fields.finish()
}

pub struct DepartmentService<S> {
    ctx: PortalContext<S>,
}

impl<S: PortalStore> DepartmentService<S> {
    pub fn new(ctx: PortalContext<S>) -> Self {
        Self { ctx }
    }

    fn department(&self, id: DepartmentId) -> Result<Department, PortalError> {
        self.ctx
            .store
            .fetch_department(id)?
            .ok_or(PortalError::NotFound(Missing::Department(id)))
    }
}

impl<S: PortalStore + 'static> ResourceService for DepartmentService<S> {
    type Id = DepartmentId;
    type Item = Department;
    type Create = DepartmentDraft;
    type Update = DepartmentPatch;
    type Filter = DepartmentFilter;

    const RESOURCE: Resource = Resource::Departments;

    fn list(
        &self,
        _actor: Option<&Actor>,
        filter: DepartmentFilter,
        page: PageRequest,
    ) -> Result<Page<Department>, PortalError> {
        let needle = filter.search.map(|s| s.trim().to_lowercase());
        let mut departments: Vec<Department> = self
            .ctx
            .store
            .list_departments()?
            .into_iter()
            .filter(|d| {
                needle.as_deref().map_or(true, |needle| {
                    contains_ignore_case(&d.name, needle) || contains_ignore_case(&d.location, needle)
                })
            })
            .collect();
        departments.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(Page::paginate(departments, page, self.ctx.settings.page_size))
    }

    fn retrieve(&self, _actor: Option<&Actor>, id: DepartmentId) -> Result<Department, PortalError> {
        self.department(id)
    }

    fn create(
        &self,
        actor: Option<&Actor>,
        input: DepartmentDraft,
    ) -> Result<Department, PortalError> {
        let actor = curator(actor)?;
        check_department(&input.name, &input.contact_email)?;
        let department = self.ctx.store.insert_department(NewDepartment {
            name: input.name.trim().to_string(),
            description: input.description,
            location: input.location,
            contact_email: input.contact_email,
            created_at: self.ctx.now(),
        })?;
        tracing::info!(department = %department.id, by = %actor.id, "department created");
        Ok(department)
    }

    fn update(
        &self,
        actor: Option<&Actor>,
        id: DepartmentId,
        input: DepartmentPatch,
    ) -> Result<Department, PortalError> {
        curator(actor)?;
        let mut department = self.department(id)?;
        if let Some(name) = input.name {
            department.name = name.trim().to_string();
        }
        if let Some(description) = input.description {
            department.description = description;
        }
        if let Some(location) = input.location {
            department.location = location;
        }
        if let Some(email) = input.contact_email {
            department.contact_email = email;
        }
        check_department(&department.name, &department.contact_email)?;
        self.ctx.store.update_department(department.clone())?;
        Ok(department)
    }

    fn destroy(&self, actor: Option<&Actor>, id: DepartmentId) -> Result<(), PortalError> {
        let actor = curator(actor)?;
        if !self.ctx.store.delete_department(id)? {
            return Err(PortalError::NotFound(Missing::Department(id)));
        }
        tracing::info!(department = %id, by = %actor.id, "department deleted with its jobs");
        Ok(())
    }
}

// Jobs

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSortKey {
    CreatedAt,
    Deadline,
    Salary,
    Title,
}

/// Single sort key, optionally descending (`-salary`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOrdering {
    pub key: JobSortKey,
    pub descending: bool,
}

impl Default for JobOrdering {
    fn default() -> Self {
        Self {
            key: JobSortKey::CreatedAt,
            descending: true,
        }
    }
}

impl JobOrdering {
    pub const ACCEPTED: [&'static str; 8] = [
        "created_at",
        "-created_at",
        "deadline",
        "-deadline",
        "salary",
        "-salary",
        "title",
        "-title",
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let key = match name {
            "created_at" => JobSortKey::CreatedAt,
            "deadline" => JobSortKey::Deadline,
            "salary" => JobSortKey::Salary,
            "title" => JobSortKey::Title,
            _ => return None,
        };
        Some(Self { key, descending })
    }

    /// Jobs without a salary sort after every salaried job in both directions.
    pub fn compare(&self, a: &Job, b: &Job) -> Ordering {
        if self.key == JobSortKey::Salary {
            match (a.salary.is_some(), b.salary.is_some()) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
        }
        let ordering = match self.key {
            JobSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            JobSortKey::Deadline => a.deadline.cmp(&b.deadline),
            JobSortKey::Salary => a
                .salary
                .unwrap_or_default()
                .total_cmp(&b.salary.unwrap_or_default()),
            JobSortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        }
        .then(a.id.cmp(&b.id));
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Query of the job listing; every present filter must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
    #[serde(default)]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub department: Option<DepartmentId>,
    /// Comma separated skill ids, e.g. `skills=3,7`.
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub ordering: Option<String>,
}

impl JobFilter {
    fn skill_ids(&self) -> Result<Vec<SkillId>, PortalError> {
        let Some(raw) = self.skills.as_deref() else {
            return Ok(Vec::new());
        };
        let mut ids = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            match part.parse::<u64>() {
                Ok(id) => ids.push(SkillId(id)),
                Err(_) => {
                    return Err(PortalError::field(
                        "skills",
                        format!("'{part}' is not a skill id"),
                        raw,
                        &["Pass skill ids separated by commas, e.g. skills=3,7"],
                    ))
                }
            }
        }
        Ok(ids)
    }

    fn job_ordering(&self) -> Result<JobOrdering, PortalError> {
        match self.ordering.as_deref() {
            None => Ok(JobOrdering::default()),
            Some(raw) => JobOrdering::parse(raw).ok_or_else(|| {
                PortalError::field(
                    "ordering",
                    format!("cannot sort jobs by '{raw}'"),
                    raw,
                    &JobOrdering::ACCEPTED,
                )
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    pub department: DepartmentId,
    pub job_type: JobType,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub salary: Option<f64>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub department: Option<DepartmentId>,
    #[serde(default)]
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub salary: Option<f64>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobSkillDraft {
    pub skill: SkillId,
    #[serde(default = "required_by_default")]
    pub is_required: bool,
    #[serde(default = "intermediate")]
    pub level: SkillLevel,
}

fn required_by_default() -> bool {
    true
}

fn intermediate() -> SkillLevel {
    SkillLevel::Intermediate
}

pub struct JobService<S> {
    ctx: PortalContext<S>,
}

impl<S: PortalStore> JobService<S> {
    pub fn new(ctx: PortalContext<S>) -> Self {
        Self { ctx }
    }

    fn check_fields(
        &self,
        title: Option<&str>,
        salary: Option<f64>,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<(), PortalError> {
        let mut fields = FieldErrors::new();
        if let Some(title) = title.filter(|title| shorter_than(title, MIN_JOB_TITLE)) {
            fields.add(
                "title",
                format!("job title must have at least {MIN_JOB_TITLE} characters"),
                title,
                &["Describe the position in a few words"],
            );
        }
        if let Some(salary) = salary.filter(|salary| !salary.is_finite() || *salary < 0.0) {
            fields.add(
                "salary",
                "salary cannot be negative",
                salary,
                &["Leave the salary empty if it is not fixed"],
            );
        }
        if let Some(deadline) = deadline {
            if deadline.date_naive() < self.ctx.now().date_naive() {
                fields.add(
                    "deadline",
                    "deadline cannot be in the past",
                    deadline.to_rfc3339(),
                    &["Pick today or a later date"],
                );
            }
        }
        fields.finish()
    }

    fn department_exists(&self, id: DepartmentId) -> Result<(), PortalError> {
        self.ctx
            .store
            .fetch_department(id)?
            .map(|_| ())
            .ok_or(PortalError::NotFound(Missing::Department(id)))
    }

    /// The job, provided the actor owns it or is an administrator.
    fn managed(&self, actor: &Actor, id: JobId) -> Result<Job, PortalError> {
        let job = self.ctx.job(id)?;
        if job.employer_id != actor.id && !actor.is_admin() {
            return Err(PortalError::permission(
                "only the employer who posted the job can change it",
            ));
        }
        Ok(job)
    }

    /// Conjunctive filter plus one sort key.
    pub fn search(&self, filter: &JobFilter) -> Result<Vec<Job>, PortalError> {
        let wanted = filter.skill_ids()?;
        let ordering = filter.job_ordering()?;
        let needle = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let links = if wanted.is_empty() {
            Vec::new()
        } else {
            self.ctx.store.all_job_skills()?
        };

        let mut jobs: Vec<Job> = self
            .ctx
            .store
            .list_jobs()?
            .into_iter()
            .filter(|job| filter.job_type.map_or(true, |t| job.job_type == t))
            .filter(|job| filter.department.map_or(true, |d| job.department_id == d))
            .filter(|job| filter.schedule.map_or(true, |s| job.schedule == Some(s)))
            .filter(|job| filter.is_active.map_or(true, |active| job.is_active == active))
            .filter(|job| {
                wanted.iter().all(|skill| {
                    links
                        .iter()
                        .any(|link| link.job_id == job.id && link.skill_id == *skill)
                })
            })
            .filter(|job| {
                needle.as_deref().map_or(true, |needle| {
                    contains_ignore_case(&job.title, needle)
                        || contains_ignore_case(&job.description, needle)
                        || contains_ignore_case(&job.requirements, needle)
                })
            })
            .collect();
        jobs.sort_by(|a, b| ordering.compare(a, b));
        Ok(jobs)
    }

    pub fn skills(&self, job: JobId) -> Result<Vec<JobSkill>, PortalError> {
        let job = self.ctx.job(job)?;
        Ok(self.ctx.store.job_skills(job.id)?)
    }

    pub fn attach_skill(
        &self,
        actor: &Actor,
        job: JobId,
        draft: JobSkillDraft,
    ) -> Result<JobSkill, PortalError> {
        let job = self.managed(actor, job)?;
        self.ctx
            .store
            .fetch_skill(draft.skill)?
            .ok_or(PortalError::NotFound(Missing::Skill(draft.skill)))?;
        let link = self.ctx.store.insert_job_skill(NewJobSkill {
            job_id: job.id,
            skill_id: draft.skill,
            is_required: draft.is_required,
            level: draft.level,
        })?;
        Ok(link)
    }

    pub fn detach_skill(&self, actor: &Actor, job: JobId, skill: SkillId) -> Result<(), PortalError> {
        let job = self.managed(actor, job)?;
        if !self.ctx.store.delete_job_skill(job.id, skill)? {
            return Err(PortalError::NotFound(Missing::Skill(skill)));
        }
        Ok(())
    }
}

impl<S: PortalStore + 'static> ResourceService for JobService<S> {
    type Id = JobId;
    type Item = Job;
    type Create = JobDraft;
    type Update = JobPatch;
    type Filter = JobFilter;

    const RESOURCE: Resource = Resource::Jobs;

    fn list(
        &self,
        _actor: Option<&Actor>,
        filter: JobFilter,
        page: PageRequest,
    ) -> Result<Page<Job>, PortalError> {
        let jobs = self.search(&filter)?;
        Ok(Page::paginate(jobs, page, self.ctx.settings.page_size))
    }

    fn retrieve(&self, _actor: Option<&Actor>, id: JobId) -> Result<Job, PortalError> {
        self.ctx.job(id)
    }

    fn create(&self, actor: Option<&Actor>, input: JobDraft) -> Result<Job, PortalError> {
        let actor = signed_in(actor)?;
        if actor.role != Role::Employer {
            return Err(PortalError::permission("only employers can post jobs"));
        }
        self.check_fields(Some(&input.title), input.salary, Some(input.deadline))?;
        self.department_exists(input.department)?;

        let job = self.ctx.store.insert_job(NewJob {
            title: input.title.trim().to_string(),
            description: input.description,
            requirements: input.requirements,
            department_id: input.department,
            employer_id: actor.id,
            job_type: input.job_type,
            schedule: input.schedule,
            salary: input.salary,
            created_at: self.ctx.now(),
            deadline: input.deadline,
        })?;
        tracing::info!(job = %job.id, employer = %actor.id, "job posted");
        Ok(job)
    }

    fn update(&self, actor: Option<&Actor>, id: JobId, input: JobPatch) -> Result<Job, PortalError> {
        let mut job = self.managed(signed_in(actor)?, id)?;
        self.check_fields(input.title.as_deref(), input.salary, input.deadline)?;
        if let Some(department) = input.department {
            self.department_exists(department)?;
            job.department_id = department;
        }
        if let Some(title) = input.title {
            job.title = title.trim().to_string();
        }
        if let Some(description) = input.description {
            job.description = description;
        }
        if let Some(requirements) = input.requirements {
            job.requirements = requirements;
        }
        if let Some(job_type) = input.job_type {
            job.job_type = job_type;
        }
        if input.schedule.is_some() {
            job.schedule = input.schedule;
        }
        if input.salary.is_some() {
            job.salary = input.salary;
        }
        if let Some(deadline) = input.deadline {
            job.deadline = deadline;
        }
        if let Some(active) = input.is_active {
            job.is_active = active;
        }
        self.ctx.store.update_job(job.clone())?;
        Ok(job)
    }

    fn destroy(&self, actor: Option<&Actor>, id: JobId) -> Result<(), PortalError> {
        let actor = signed_in(actor)?;
        let job = self.managed(actor, id)?;
        self.ctx.store.delete_job(job.id)?;
        tracing::info!(job = %id, by = %actor.id, "job deleted");
        Ok(())
    }
}

// Skills

#[derive(Debug, Clone, Deserialize)]
pub struct SkillDraft {
    pub name: String,
    #[serde(default = "other_category")]
    pub category: SkillCategory,
}

fn other_category() -> SkillCategory {
    SkillCategory::Other
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<SkillCategory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillFilter {
    #[serde(default)]
    pub category: Option<SkillCategory>,
    #[serde(default)]
    pub search: Option<String>,
}

fn check_skill_name(name: &str) -> Result<(), PortalError> {
    if is_blank(name) {
        return Err(PortalError::invalid("skill name must not be empty"));
    }
    Ok(())
}

pub struct SkillService<S> {
    ctx: PortalContext<S>,
}

impl<S: PortalStore> SkillService<S> {
    pub fn new(ctx: PortalContext<S>) -> Self {
        Self { ctx }
    }

    fn skill(&self, id: SkillId) -> Result<Skill, PortalError> {
        self.ctx
            .store
            .fetch_skill(id)?
            .ok_or(PortalError::NotFound(Missing::Skill(id)))
    }
}

impl<S: PortalStore + 'static> ResourceService for SkillService<S> {
    type Id = SkillId;
    type Item = Skill;
    type Create = SkillDraft;
    type Update = SkillPatch;
    type Filter = SkillFilter;

    const RESOURCE: Resource = Resource::Skills;

    fn list(
        &self,
        _actor: Option<&Actor>,
        filter: SkillFilter,
        page: PageRequest,
    ) -> Result<Page<Skill>, PortalError> {
        let needle = filter.search.map(|s| s.trim().to_lowercase());
        let mut skills: Vec<Skill> = self
            .ctx
            .store
            .list_skills()?
            .into_iter()
            .filter(|s| filter.category.map_or(true, |c| s.category == c))
            .filter(|s| {
                needle
                    .as_deref()
                    .map_or(true, |needle| contains_ignore_case(&s.name, needle))
            })
            .collect();
        skills.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(Page::paginate(skills, page, self.ctx.settings.page_size))
    }

    fn retrieve(&self, _actor: Option<&Actor>, id: SkillId) -> Result<Skill, PortalError> {
        self.skill(id)
    }

    fn create(&self, actor: Option<&Actor>, input: SkillDraft) -> Result<Skill, PortalError> {
        curator(actor)?;
        check_skill_name(&input.name)?;
        Ok(self.ctx.store.insert_skill(NewSkill {
            name: input.name.trim().to_string(),
            category: input.category,
        })?)
    }

    fn update(
        &self,
        actor: Option<&Actor>,
        id: SkillId,
        input: SkillPatch,
    ) -> Result<Skill, PortalError> {
        curator(actor)?;
        let mut skill = self.skill(id)?;
        if let Some(name) = input.name {
            check_skill_name(&name)?;
            skill.name = name.trim().to_string();
        }
        if let Some(category) = input.category {
            skill.category = category;
        }
        self.ctx.store.update_skill(skill.clone())?;
        Ok(skill)
    }

    fn destroy(&self, actor: Option<&Actor>, id: SkillId) -> Result<(), PortalError> {
        curator(actor)?;
        if !self.ctx.store.delete_skill(id)? {
            return Err(PortalError::NotFound(Missing::Skill(id)));
        }
        Ok(())
    }
}
