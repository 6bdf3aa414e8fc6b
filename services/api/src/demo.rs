use crate::infra::seed_portal;
use campus_jobs::config::PortalSettings;
use campus_jobs::error::AppError;
use campus_jobs::portal::catalog::JobFilter;
use campus_jobs::portal::lifecycle::{ApplicationDraft, ResumeUpload};
use campus_jobs::portal::messaging::MessageDraft;
use campus_jobs::portal::notifications::NotificationFilter;
use campus_jobs::portal::{Actor, Portal, PortalStore};
use clap::Args;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stop after the employer's decision instead of exchanging messages.
    #[arg(long)]
    pub(crate) skip_conversation: bool,
    /// Have the employer reject the application instead of accepting it.
    #[arg(long)]
    pub(crate) reject: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let portal = Portal::in_memory(PortalSettings::default());
    let seed = seed_portal(&portal)?;
    println!("Campus jobs workflow demo");
    println!(
        "- Seeded {} departments, {} skills and {} jobs",
        seed.departments, seed.skills, seed.jobs
    );

    let jobs = portal.jobs.search(&JobFilter {
        ordering: Some("-salary".to_string()),
        ..JobFilter::default()
    })?;
    println!("\nOpen positions (highest salary first)");
    for job in &jobs {
        let salary = job
            .salary
            .map(|amount| format!("{amount:.0}"))
            .unwrap_or_else(|| "unpaid".to_string());
        println!(
            "  - #{} {} | salary {} | deadline {}",
            job.id,
            job.title,
            salary,
            job.deadline.format("%Y-%m-%d")
        );
    }
    let Some(job) = jobs.iter().find(|job| job.employer_id == seed.employer.id) else {
        println!("No job posted by the demo employer");
        return Ok(());
    };

    println!("\nStudent {} applies to \"{}\"", seed.student.id, job.title);
    let application = portal.applications.submit(
        &seed.student,
        ApplicationDraft {
            job: job.id,
            cover_letter: "I have built two Django projects and enjoy teaching others.".to_string(),
            resume: Some(ResumeUpload {
                file_name: "student-cv.pdf".to_string(),
                size_bytes: 180_000,
            }),
        },
    )?;
    println!(
        "- Application #{} is {} (resume stored at {})",
        application.id,
        application.status,
        application.resume.as_deref().unwrap_or("-")
    );

    let locked = portal.messages.send(
        &seed.student,
        MessageDraft {
            application: application.id,
            content: "Hello! Any news?".to_string(),
        },
    );
    if let Err(err) = locked {
        println!("- Early message refused: {} ({})", err, err.code());
    }

    let decision = if args.reject { "rejected" } else { "accepted" };
    let decided = portal
        .applications
        .update_status(&seed.employer, application.id, decision)?;
    println!("\nEmployer marks the application {}", decided.status);
    print_inbox(&portal, &seed.student, "student")?;

    if args.skip_conversation || args.reject {
        return Ok(());
    }

    let reply = portal.messages.send(
        &seed.student,
        MessageDraft {
            application: application.id,
            content: "Thank you! When can I start?".to_string(),
        },
    )?;
    println!("\nStudent replies with message #{}", reply.id);
    for thread in portal.messages.threads(&seed.employer)? {
        println!(
            "- Employer thread with user {}: {} messages, {} unread",
            thread.counterpart_id,
            thread.messages.len(),
            thread.unread
        );
    }
    print_inbox(&portal, &seed.employer, "employer")?;

    let marked = portal.notifications.mark_all_as_read(&seed.employer)?;
    println!("- Employer marked {} notifications as read", marked.updated);
    Ok(())
}

fn print_inbox<S: PortalStore + 'static>(
    portal: &Portal<S>,
    actor: &Actor,
    label: &str,
) -> Result<(), AppError> {
    let inbox = portal
        .notifications
        .inbox(actor, &NotificationFilter::default())?;
    println!("  {label} notifications:");
    for notification in inbox {
        let marker = if notification.is_read { " " } else { "*" };
        println!(
            "   {marker} [{:?}] {}: {}",
            notification.kind, notification.title, notification.content
        );
    }
    Ok(())
}
