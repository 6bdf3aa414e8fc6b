use std::sync::Arc;

use serde_json::json;

use super::common::*;
use crate::portal::accounts::{Registration, UserPatch};
use crate::portal::clock::FixedClock;
use crate::portal::context::PortalContext;
use crate::portal::domain::{NotificationKind, Role, UserId};
use crate::portal::errors::ErrorKind;
use crate::portal::memory::InMemoryPortalStore;
use crate::portal::notifications::{NotificationFilter, Notifier};
use crate::portal::pagination::PageRequest;
use crate::portal::repository::NotificationRepository;
use crate::portal::resource::ResourceService;

fn notifier(fx: &Fixture) -> Notifier<InMemoryPortalStore> {
    Notifier::new(PortalContext::new(
        Arc::clone(&fx.store),
        Arc::new(FixedClock(now())),
        settings(),
    ))
}

#[test]
fn notify_validates_title_and_recipient() {
    let fx = fixture();
    let notifier = notifier(&fx);

    let err = notifier
        .notify(fx.alice.id, NotificationKind::System, "  ", "body")
        .expect_err("blank title");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = notifier
        .notify(UserId(4_242), NotificationKind::System, "Hi", "body")
        .expect_err("unknown user");
    assert_eq!(err.code(), "user_not_found");

    let created = notifier
        .notify(fx.alice.id, NotificationKind::Deadline, "Deadline soon", "")
        .expect("created");
    assert!(!created.is_read);
    assert_eq!(created.created_at, now());
}

#[test]
fn mark_as_read_is_idempotent_and_owner_only() {
    let fx = fixture();
    let application = fx.apply(&fx.alice);
    fx.portal
        .applications
        .update_status(&fx.employer, application.id, "rejected")
        .expect("reject");
    let notification = fx
        .store
        .notifications_for_user(fx.alice.id)
        .expect("notifications")
        .remove(0);

    let err = fx
        .portal
        .notifications
        .mark_as_read(&fx.bob, notification.id)
        .expect_err("not the owner");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let first = fx
        .portal
        .notifications
        .mark_as_read(&fx.alice, notification.id)
        .expect("mark");
    let second = fx
        .portal
        .notifications
        .mark_as_read(&fx.alice, notification.id)
        .expect("mark again");
    assert!(first.is_read);
    assert_eq!(first, second);
}

#[test]
fn mark_all_reports_how_many_changed() {
    let fx = fixture();
    let notifier = notifier(&fx);
    for title in ["One", "Two", "Three"] {
        notifier
            .notify(fx.bob.id, NotificationKind::System, title, "")
            .expect("notify");
    }
    let first = fx
        .store
        .notifications_for_user(fx.bob.id)
        .expect("notifications")
        .remove(0);
    fx.portal
        .notifications
        .mark_as_read(&fx.bob, first.id)
        .expect("mark one");

    let marked = fx
        .portal
        .notifications
        .mark_all_as_read(&fx.bob)
        .expect("mark all");
    assert_eq!(marked.updated, 2);
    let again = fx
        .portal
        .notifications
        .mark_all_as_read(&fx.bob)
        .expect("mark all again");
    assert_eq!(again.updated, 0);

    let unread = fx
        .portal
        .notifications
        .inbox(
            &fx.bob,
            &NotificationFilter {
                is_read: Some(false),
                kind: None,
            },
        )
        .expect("inbox");
    assert!(unread.is_empty());
}

#[test]
fn rest_surface_cannot_create_or_edit_notifications() {
    let fx = fixture();
    let err = fx
        .portal
        .notifications
        .create(Some(&fx.admin), json!({"title": "x"}))
        .expect_err("system only");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let err = fx
        .portal
        .notifications
        .create(None, json!({}))
        .expect_err("anonymous");
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[test]
fn inbox_lists_only_own_notifications() {
    let fx = fixture();
    fx.accepted(&fx.alice);
    let page = fx
        .portal
        .notifications
        .list(Some(&fx.bob), NotificationFilter::default(), PageRequest::default())
        .expect("list");
    assert_eq!(page.count, 0);

    let page = fx
        .portal
        .notifications
        .list(
            Some(&fx.alice),
            NotificationFilter {
                is_read: None,
                kind: Some(NotificationKind::ApplicationUpdate),
            },
            PageRequest::default(),
        )
        .expect("list");
    assert_eq!(page.count, 1);
}

#[test]
fn registration_sends_a_welcome_notification() {
    let fx = fixture();
    let user = fx
        .portal
        .users
        .register(
            None,
            Registration {
                username: "carol".to_string(),
                email: "carol@university.edu".to_string(),
                role: Role::Student,
                profile: Default::default(),
            },
        )
        .expect("register");

    let inbox = fx
        .store
        .notifications_for_user(user.id)
        .expect("notifications");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::System);
    assert_eq!(inbox[0].title, "Welcome!");
}

#[test]
fn admin_accounts_need_an_admin() {
    let fx = fixture();
    let registration = Registration {
        username: "dean".to_string(),
        email: "dean@university.edu".to_string(),
        role: Role::Admin,
        profile: Default::default(),
    };

    let err = fx
        .portal
        .users
        .register(Some(&fx.employer), registration.clone())
        .expect_err("employer");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let dean = fx
        .portal
        .users
        .register(Some(&fx.admin), registration)
        .expect("admin");
    assert_eq!(dean.role, Role::Admin);
}

#[test]
fn registration_rejects_bad_identity() {
    let fx = fixture();
    let err = fx
        .portal
        .users
        .register(
            None,
            Registration {
                username: "al".to_string(),
                email: "not-an-email".to_string(),
                role: Role::Student,
                profile: Default::default(),
            },
        )
        .expect_err("invalid");
    assert_eq!(err.code(), "validation_error");

    let err = fx
        .portal
        .users
        .register(
            None,
            Registration {
                username: "ALICE".to_string(),
                email: "alice2@university.edu".to_string(),
                role: Role::Student,
                profile: Default::default(),
            },
        )
        .expect_err("taken");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn only_admins_change_roles() {
    let fx = fixture();
    let promote = UserPatch {
        role: Some(Role::Admin),
        ..Default::default()
    };
    let err = fx
        .portal
        .users
        .update(Some(&fx.alice), fx.alice.id, promote.clone())
        .expect_err("self promotion");
    assert_eq!(err.kind(), ErrorKind::Permission);

    let promoted = fx
        .portal
        .users
        .update(Some(&fx.admin), fx.alice.id, promote)
        .expect("admin");
    assert_eq!(promoted.role, Role::Admin);
}
