use chrono::Duration;

use super::common::*;
use crate::config::PortalSettings;
use crate::portal::accounts::{UserSkillDraft, UserSkillFilter, UserSkillPatch};
use crate::portal::catalog::{DepartmentDraft, JobFilter, JobPatch, JobSkillDraft, SkillDraft};
use crate::portal::domain::{Job, JobType, Schedule, SkillCategory, SkillLevel};
use crate::portal::engagement::{ReviewDraft, ReviewFilter};
use crate::portal::errors::{ErrorKind, PortalError};
use crate::portal::pagination::PageRequest;
use crate::portal::repository::{ApplicationRepository, JobRepository};
use crate::portal::resource::ResourceService;

fn titles(jobs: &[Job]) -> Vec<&str> {
    jobs.iter().map(|job| job.title.as_str()).collect()
}

fn search(fx: &Fixture, filter: JobFilter) -> Vec<Job> {
    fx.portal.jobs.search(&filter).expect("search")
}

#[test]
fn filters_are_conjunctive() {
    let fx = fixture();
    let mut lab = job_draft(fx.department);
    lab.title = "Lab assistant".to_string();
    lab.job_type = JobType::PartTime;
    lab.schedule = Some(Schedule::Flexible);
    fx.portal
        .jobs
        .create(Some(&fx.employer), lab)
        .expect("lab job");
    fx.post_job("Library helper", JobType::PartTime, None);

    let part_time = search(
        &fx,
        JobFilter {
            job_type: Some(JobType::PartTime),
            ..Default::default()
        },
    );
    assert_eq!(part_time.len(), 2);

    let flexible = search(
        &fx,
        JobFilter {
            job_type: Some(JobType::PartTime),
            schedule: Some(Schedule::Flexible),
            ..Default::default()
        },
    );
    assert_eq!(titles(&flexible), ["Lab assistant"]);

    let by_title = search(
        &fx,
        JobFilter {
            search: Some(" LAB ".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(titles(&by_title), ["Lab assistant"]);

    let by_description = search(
        &fx,
        JobFilter {
            search: Some("web applications".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(by_description.len(), 3);
}

#[test]
fn skill_filter_requires_every_listed_skill() {
    let fx = fixture();
    let python = fx
        .portal
        .skills
        .create(
            Some(&fx.employer),
            SkillDraft {
                name: "Python".to_string(),
                category: SkillCategory::Technical,
            },
        )
        .expect("skill");
    let sql = fx
        .portal
        .skills
        .create(
            Some(&fx.employer),
            SkillDraft {
                name: "SQL".to_string(),
                category: SkillCategory::Technical,
            },
        )
        .expect("skill");
    let other = fx.post_job("Data entry clerk", JobType::Teaching, Some(12000.0));

    let link = |skill| JobSkillDraft {
        skill,
        is_required: true,
        level: SkillLevel::Intermediate,
    };
    fx.portal
        .jobs
        .attach_skill(&fx.employer, fx.job.id, link(python.id))
        .expect("attach");
    fx.portal
        .jobs
        .attach_skill(&fx.employer, fx.job.id, link(sql.id))
        .expect("attach");
    fx.portal
        .jobs
        .attach_skill(&fx.employer, other.id, link(sql.id))
        .expect("attach");

    let both = search(
        &fx,
        JobFilter {
            skills: Some(format!("{},{}", python.id, sql.id)),
            ..Default::default()
        },
    );
    assert_eq!(titles(&both), [fx.job.title.as_str()]);

    let sql_only = search(
        &fx,
        JobFilter {
            skills: Some(sql.id.to_string()),
            ..Default::default()
        },
    );
    assert_eq!(sql_only.len(), 2);

    let err = fx
        .portal
        .jobs
        .attach_skill(&fx.employer, fx.job.id, link(sql.id))
        .expect_err("attached twice");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = fx
        .portal
        .jobs
        .search(&JobFilter {
            skills: Some("3,x".to_string()),
            ..Default::default()
        })
        .expect_err("bad id");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn salary_ordering_puts_unpaid_jobs_last() {
    let fx = fixture();
    fx.post_job("Volunteer tutor", JobType::PartTime, None);
    fx.post_job("Research assistant", JobType::PartTime, Some(45000.0));
    fx.post_job("Campus guide", JobType::Teaching, Some(15000.0));

    let ascending = search(
        &fx,
        JobFilter {
            ordering: Some("salary".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(
        titles(&ascending),
        [
            "Campus guide",
            "Python programming intern",
            "Research assistant",
            "Volunteer tutor"
        ]
    );

    let descending = search(
        &fx,
        JobFilter {
            ordering: Some("-salary".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(
        titles(&descending),
        [
            "Research assistant",
            "Python programming intern",
            "Campus guide",
            "Volunteer tutor"
        ]
    );
}

#[test]
fn default_ordering_is_newest_first() {
    let fx = fixture();
    let later = fx
        .at(now() + Duration::hours(1))
        .jobs
        .create(Some(&fx.employer), job_draft(fx.department))
        .expect("later job");
    let jobs = search(&fx, JobFilter::default());
    assert_eq!(jobs[0].id, later.id);
    assert_eq!(jobs[1].id, fx.job.id);
}

#[test]
fn unknown_ordering_lists_accepted_values() {
    let fx = fixture();
    let err = fx
        .portal
        .jobs
        .search(&JobFilter {
            ordering: Some("popularity".to_string()),
            ..Default::default()
        })
        .expect_err("unknown key");
    match err {
        PortalError::Validation {
            fields: Some(fields),
            ..
        } => assert!(fields.contains("ordering")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn listing_is_paginated() {
    let fx = fixture_with(PortalSettings {
        page_size: 2,
        ..PortalSettings::default()
    });
    for n in 0..3 {
        fx.post_job(&format!("Teaching assistant {n}"), JobType::PartTime, None);
    }

    let first = fx
        .portal
        .jobs
        .list(None, JobFilter::default(), PageRequest::default())
        .expect("page 1");
    assert_eq!(first.count, 4);
    assert_eq!(first.results.len(), 2);
    assert_eq!(first.next, Some(2));
    assert_eq!(first.previous, None);

    let beyond = fx
        .portal
        .jobs
        .list(None, JobFilter::default(), PageRequest::number(9))
        .expect("clamped");
    assert_eq!(beyond.page, 2);
    assert_eq!(beyond.next, None);
}

#[test]
fn job_fields_are_validated() {
    let fx = fixture();
    let mut draft = job_draft(fx.department);
    draft.title = "Dev".to_string();
    draft.salary = Some(-5.0);
    draft.deadline = now() - Duration::days(1);

    let err = fx
        .portal
        .jobs
        .create(Some(&fx.employer), draft)
        .expect_err("invalid");
    match err {
        PortalError::Validation {
            fields: Some(fields),
            ..
        } => {
            assert!(fields.contains("title"));
            assert!(fields.contains("salary"));
            assert!(fields.contains("deadline"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // earlier today is still today
    let mut today = job_draft(fx.department);
    today.deadline = now() - Duration::hours(2);
    fx.portal
        .jobs
        .create(Some(&fx.employer), today)
        .expect("same-day deadline");
}

#[test]
fn only_employers_post_and_only_owners_edit() {
    let fx = fixture();
    let err = fx
        .portal
        .jobs
        .create(Some(&fx.alice), job_draft(fx.department))
        .expect_err("student");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let err = fx
        .portal
        .jobs
        .create(None, job_draft(fx.department))
        .expect_err("anonymous");
    assert_eq!(err.kind(), ErrorKind::Authentication);

    let close = JobPatch {
        is_active: Some(false),
        ..Default::default()
    };
    let err = fx
        .portal
        .jobs
        .update(Some(&fx.rival_employer), fx.job.id, close.clone())
        .expect_err("not the owner");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let closed = fx
        .portal
        .jobs
        .update(Some(&fx.admin), fx.job.id, close)
        .expect("admin");
    assert!(!closed.is_active);
}

#[test]
fn deleting_a_department_removes_its_jobs() {
    let fx = fixture();
    let application = fx.apply(&fx.alice);
    let other = fx
        .portal
        .departments
        .create(
            Some(&fx.admin),
            DepartmentDraft {
                name: "Library".to_string(),
                description: String::new(),
                location: "Main campus".to_string(),
                contact_email: "library@university.edu".to_string(),
            },
        )
        .expect("department");
    let mut elsewhere = job_draft(other.id);
    elsewhere.title = "Archive assistant".to_string();
    let kept = fx
        .portal
        .jobs
        .create(Some(&fx.employer), elsewhere)
        .expect("job");

    fx.portal
        .departments
        .destroy(Some(&fx.admin), fx.department)
        .expect("delete");

    assert!(fx.store.fetch_job(fx.job.id).expect("fetch").is_none());
    assert!(fx
        .store
        .fetch_application(application.id)
        .expect("fetch")
        .is_none());
    assert!(fx.store.fetch_job(kept.id).expect("fetch").is_some());

    let err = fx
        .portal
        .departments
        .destroy(Some(&fx.alice), other.id)
        .expect_err("student");
    assert_eq!(err.kind(), ErrorKind::Permission);
}

#[test]
fn reviews_are_unique_and_hide_anonymous_authors() {
    let fx = fixture();
    let review = |rating, is_anonymous| ReviewDraft {
        job: fx.job.id,
        rating,
        comment: "Good mentoring".to_string(),
        is_anonymous,
    };

    let err = fx
        .portal
        .reviews
        .create(Some(&fx.employer), review(5, false))
        .expect_err("own job");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let err = fx
        .portal
        .reviews
        .create(Some(&fx.alice), review(6, false))
        .expect_err("out of range");
    assert_eq!(err.kind(), ErrorKind::Validation);

    fx.portal
        .reviews
        .create(Some(&fx.alice), review(4, true))
        .expect("alice reviews");
    fx.portal
        .reviews
        .create(Some(&fx.bob), review(5, false))
        .expect("bob reviews");
    let err = fx
        .portal
        .reviews
        .create(Some(&fx.alice), review(3, false))
        .expect_err("second review");
    assert_eq!(err.code(), "review_already_exists");

    let public = fx.portal.reviews.for_job(None, fx.job.id).expect("summary");
    assert_eq!(public.count, 2);
    assert_eq!(public.average_rating, Some(4.5));
    let anonymous = public
        .reviews
        .iter()
        .find(|r| r.is_anonymous)
        .expect("anonymous review");
    assert_eq!(anonymous.reviewer_id, None);

    let own = fx
        .portal
        .reviews
        .for_job(Some(&fx.alice), fx.job.id)
        .expect("summary");
    assert!(own.reviews.iter().all(|r| r.reviewer_id.is_some()));

    let received = fx
        .portal
        .reviews
        .list(Some(&fx.employer), ReviewFilter::default(), PageRequest::default())
        .expect("list");
    assert_eq!(received.count, 2);
}

#[test]
fn favorites_toggle() {
    let fx = fixture();
    let second = fx.post_job("Lab technician", JobType::PartTime, Some(20000.0));

    let on = fx
        .portal
        .favorites
        .toggle(&fx.alice, fx.job.id)
        .expect("toggle");
    assert!(on.favorited);
    fx.portal
        .favorites
        .toggle(&fx.alice, second.id)
        .expect("toggle");

    let jobs = fx.portal.favorites.jobs(&fx.alice).expect("favorites");
    assert_eq!(titles(&jobs), ["Lab technician", "Python programming intern"]);

    let off = fx
        .portal
        .favorites
        .toggle(&fx.alice, fx.job.id)
        .expect("toggle");
    assert!(!off.favorited);
    assert_eq!(fx.portal.favorites.jobs(&fx.alice).expect("favorites").len(), 1);
    assert!(fx.portal.favorites.jobs(&fx.bob).expect("favorites").is_empty());
}

#[test]
fn user_skills_belong_to_their_owner() {
    let fx = fixture();
    let python = fx
        .portal
        .skills
        .create(
            Some(&fx.admin),
            SkillDraft {
                name: "Python".to_string(),
                category: SkillCategory::Technical,
            },
        )
        .expect("skill");

    let link = fx
        .portal
        .user_skills
        .create(
            Some(&fx.alice),
            UserSkillDraft {
                skill: python.id,
                level: SkillLevel::Advanced,
            },
        )
        .expect("own skill");
    assert_eq!(link.user_id, fx.alice.id);
    assert!(!link.verified);

    let err = fx
        .portal
        .user_skills
        .update(
            Some(&fx.alice),
            link.id,
            UserSkillPatch {
                verified: Some(true),
                ..Default::default()
            },
        )
        .expect_err("self verification");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let verified = fx
        .portal
        .user_skills
        .update(
            Some(&fx.admin),
            link.id,
            UserSkillPatch {
                verified: Some(true),
                ..Default::default()
            },
        )
        .expect("admin verifies");
    assert!(verified.verified);

    let err = fx
        .portal
        .user_skills
        .retrieve(Some(&fx.bob), link.id)
        .expect_err("someone else's skill");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let peek = UserSkillFilter {
        user: Some(fx.alice.id),
    };
    let own = fx
        .portal
        .user_skills
        .list(Some(&fx.bob), peek.clone(), PageRequest::default())
        .expect("list");
    assert_eq!(own.count, 0);
    let as_admin = fx
        .portal
        .user_skills
        .list(Some(&fx.admin), peek, PageRequest::default())
        .expect("list");
    assert_eq!(as_admin.count, 1);

    let err = fx
        .portal
        .user_skills
        .create(
            Some(&fx.alice),
            UserSkillDraft {
                skill: python.id,
                level: SkillLevel::Beginner,
            },
        )
        .expect_err("listed twice");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
