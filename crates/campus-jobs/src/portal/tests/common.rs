use std::sync::Arc;

use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::body::Body;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::config::PortalSettings;
use crate::portal::catalog::JobDraft;
use crate::portal::clock::FixedClock;
use crate::portal::domain::{Actor, Application, DepartmentId, Job, JobType, Role, User};
use crate::portal::lifecycle::ApplicationDraft;
use crate::portal::memory::InMemoryPortalStore;
use crate::portal::repository::{NewDepartment, NewUser, UserRepository, DepartmentRepository};
use crate::portal::resource::ResourceService;
use crate::portal::Portal;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) struct Fixture {
    pub(super) store: Arc<InMemoryPortalStore>,
    pub(super) portal: Portal<InMemoryPortalStore>,
    pub(super) employer: Actor,
    pub(super) rival_employer: Actor,
    pub(super) alice: Actor,
    pub(super) bob: Actor,
    pub(super) admin: Actor,
    pub(super) department: DepartmentId,
    pub(super) job: Job,
}

impl Fixture {
    /// A second portal over the same store whose clock reads `at`.
    pub(super) fn at(&self, at: DateTime<Utc>) -> Portal<InMemoryPortalStore> {
        Portal::new(
            Arc::clone(&self.store),
            Arc::new(FixedClock(at)),
            self.portal.settings.clone(),
        )
    }

    pub(super) fn apply(&self, student: &Actor) -> Application {
        self.portal
            .applications
            .submit(student, draft(&self.job))
            .expect("application accepted")
    }

    pub(super) fn accepted(&self, student: &Actor) -> Application {
        let application = self.apply(student);
        self.portal
            .applications
            .update_status(&self.employer, application.id, "accepted")
            .expect("employer accepts")
    }

    pub(super) fn post_job(&self, title: &str, job_type: JobType, salary: Option<f64>) -> Job {
        let mut draft = job_draft(self.department);
        draft.title = title.to_string();
        draft.job_type = job_type;
        draft.salary = salary;
        self.portal
            .jobs
            .create(Some(&self.employer), draft)
            .expect("job posted")
    }
}

pub(super) fn settings() -> PortalSettings {
    PortalSettings::default()
}

pub(super) fn fixture() -> Fixture {
    fixture_with(settings())
}

pub(super) fn fixture_with(settings: PortalSettings) -> Fixture {
    let store = Arc::new(InMemoryPortalStore::new());
    let portal = Portal::new(Arc::clone(&store), Arc::new(FixedClock(now())), settings);

    let employer = account(&store, "prof_kim", Role::Employer);
    let rival_employer = account(&store, "dr_rival", Role::Employer);
    let alice = account(&store, "alice", Role::Student);
    let bob = account(&store, "bob", Role::Student);
    let admin = account(&store, "registrar", Role::Admin);

    let department = store
        .insert_department(NewDepartment {
            name: "Computer Science".to_string(),
            description: "Programming and systems".to_string(),
            location: "Building 1, floor 3".to_string(),
            contact_email: "cs@university.edu".to_string(),
            created_at: now(),
        })
        .expect("department")
        .id;

    let job = portal
        .jobs
        .create(Some(&employer), job_draft(department))
        .expect("job posted");

    Fixture {
        store,
        portal,
        employer,
        rival_employer,
        alice,
        bob,
        admin,
        department,
        job,
    }
}

fn account(store: &InMemoryPortalStore, username: &str, role: Role) -> Actor {
    let user: User = store
        .insert_user(NewUser {
            username: username.to_string(),
            email: format!("{username}@university.edu"),
            role,
            profile: Default::default(),
            created_at: now(),
        })
        .expect("user");
    Actor::from(&user)
}

pub(super) fn job_draft(department: DepartmentId) -> JobDraft {
    JobDraft {
        title: "Python programming intern".to_string(),
        description: "Build web applications with Python".to_string(),
        requirements: "Python, SQL, HTML/CSS".to_string(),
        department,
        job_type: JobType::Internship,
        schedule: None,
        salary: Some(30000.0),
        deadline: now() + Duration::days(30),
    }
}

pub(super) fn draft(job: &Job) -> ApplicationDraft {
    ApplicationDraft {
        job: job.id,
        cover_letter: "I have built two Django projects and would love to help.".to_string(),
        resume: None,
    }
}

pub(super) fn request(method: Method, uri: &str, user: Option<&Actor>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = user {
        builder = builder.header("x-user-id", actor.id.to_string());
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
