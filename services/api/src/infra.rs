use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use campus_jobs::portal::accounts::{Registration, UserSkillDraft};
use campus_jobs::portal::catalog::{DepartmentDraft, JobDraft, JobSkillDraft, SkillDraft};
use campus_jobs::portal::domain::{
    Actor, Department, JobType, Profile, Role, Skill, SkillCategory, SkillLevel,
};
use campus_jobs::portal::engagement::ReviewDraft;
use campus_jobs::portal::repository::{NewUser, PortalStore};
use campus_jobs::portal::{Portal, PortalError, ResourceService};
use chrono::{Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// What [`seed_portal`] loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeedSummary {
    pub(crate) admin: Actor,
    pub(crate) employer: Actor,
    pub(crate) student: Actor,
    pub(crate) departments: usize,
    pub(crate) skills: usize,
    pub(crate) jobs: usize,
}

fn find_skill<'a>(skills: &'a [Skill], name: &str) -> Result<&'a Skill, PortalError> {
    skills
        .iter()
        .find(|skill| skill.name == name)
        .ok_or_else(|| PortalError::Server(format!("seed skill '{name}' missing")))
}

fn find_department<'a>(
    departments: &'a [Department],
    name: &str,
) -> Result<&'a Department, PortalError> {
    departments
        .iter()
        .find(|department| department.name == name)
        .ok_or_else(|| PortalError::Server(format!("seed department '{name}' missing")))
}

/// Load a small demo dataset: an administrator, one employer, one student,
/// two departments, six skills, two jobs with required skills, the student's
/// own skills and one review. The student receives the usual welcome
/// notification on registration.
pub(crate) fn seed_portal<S>(portal: &Portal<S>) -> Result<SeedSummary, PortalError>
where
    S: PortalStore + 'static,
{
    let admin = portal.store.insert_user(NewUser {
        username: "admin".to_string(),
        email: "admin@example.com".to_string(),
        role: Role::Admin,
        profile: Profile::default(),
        created_at: Utc::now(),
    })?;
    let admin = Actor::from(&admin);

    let register = |username: &str, role: Role| {
        portal.users.register(
            Some(&admin),
            Registration {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                role,
                profile: Profile::default(),
            },
        )
    };
    let employer = Actor::from(&register("employer", Role::Employer)?);
    let student = Actor::from(&register("student", Role::Student)?);

    let departments = [
        (
            "Department of Computer Science",
            "Teaching and research in information technology",
            "Building 1, floor 3",
            "cs@university.edu",
        ),
        (
            "Department of Mathematics",
            "Pure and applied mathematics",
            "Building 2, floor 4",
            "math@university.edu",
        ),
    ]
    .into_iter()
    .map(|(name, description, location, contact_email)| {
        portal.departments.create(
            Some(&admin),
            DepartmentDraft {
                name: name.to_string(),
                description: description.to_string(),
                location: location.to_string(),
                contact_email: contact_email.to_string(),
            },
        )
    })
    .collect::<Result<Vec<_>, _>>()?;

    let skills = [
        ("Python", SkillCategory::Technical),
        ("JavaScript", SkillCategory::Technical),
        ("SQL", SkillCategory::Technical),
        ("Communication", SkillCategory::Soft),
        ("English", SkillCategory::Language),
        ("Project management", SkillCategory::Soft),
    ]
    .into_iter()
    .map(|(name, category)| {
        portal.skills.create(
            Some(&admin),
            SkillDraft {
                name: name.to_string(),
                category,
            },
        )
    })
    .collect::<Result<Vec<_>, _>>()?;

    let now = Utc::now();
    let postings = [
        (
            "Python programming intern",
            "Build web applications with Python and Django",
            "Department of Computer Science",
            JobType::Internship,
            "Basic Python, SQL, HTML/CSS",
            30000.0,
            now + Duration::days(30),
            [
                ("Python", SkillLevel::Advanced),
                ("SQL", SkillLevel::Intermediate),
                ("English", SkillLevel::Intermediate),
            ],
        ),
        (
            "Mathematics teaching assistant",
            "Run practical sessions for first-year mathematics",
            "Department of Mathematics",
            JobType::Teaching,
            "Degree in mathematics, some teaching experience",
            45000.0,
            now + Duration::days(45),
            [
                ("Project management", SkillLevel::Intermediate),
                ("Communication", SkillLevel::Advanced),
                ("English", SkillLevel::Intermediate),
            ],
        ),
    ];

    let mut jobs = Vec::with_capacity(postings.len());
    for (title, description, department, job_type, requirements, salary, deadline, wanted) in
        postings
    {
        let job = portal.jobs.create(
            Some(&employer),
            JobDraft {
                title: title.to_string(),
                description: description.to_string(),
                requirements: requirements.to_string(),
                department: find_department(&departments, department)?.id,
                job_type,
                schedule: None,
                salary: Some(salary),
                deadline,
            },
        )?;
        for (skill, level) in wanted {
            portal.jobs.attach_skill(
                &employer,
                job.id,
                JobSkillDraft {
                    skill: find_skill(&skills, skill)?.id,
                    is_required: true,
                    level,
                },
            )?;
        }
        jobs.push(job);
    }

    for (skill, level) in [
        ("Python", SkillLevel::Intermediate),
        ("JavaScript", SkillLevel::Beginner),
        ("SQL", SkillLevel::Intermediate),
        ("Communication", SkillLevel::Advanced),
        ("English", SkillLevel::Intermediate),
    ] {
        portal.user_skills.create(
            Some(&student),
            UserSkillDraft {
                skill: find_skill(&skills, skill)?.id,
                level,
            },
        )?;
    }

    if let Some(internship) = jobs.first() {
        portal.reviews.create(
            Some(&student),
            ReviewDraft {
                job: internship.id,
                rating: 5,
                comment: "A great opportunity for new developers!".to_string(),
                is_anonymous: false,
            },
        )?;
    }

    let summary = SeedSummary {
        admin,
        employer,
        student,
        departments: departments.len(),
        skills: skills.len(),
        jobs: jobs.len(),
    };
    info!(
        departments = summary.departments,
        skills = summary.skills,
        jobs = summary.jobs,
        "seed data loaded"
    );
    Ok(summary)
}
