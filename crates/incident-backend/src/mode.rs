//! Command line modes.

use std::sync::Arc;

use config::{
    Config,
    args::{AppMode, StatusArgs, SubmitArgs},
};
use database::sqlite::DieselReportStore;
use error_stack::{Result, ResultExt};
use model::{Location, MediaAttachments, NewReport, ReportVersion, UnixTime};
use serde::Serialize;
use tracing::info;
use utils::ContextExt;
use verification::{
    notification::Notifier, pipeline::pipeline_from_config, service::ReportService,
    status::StatusActor,
};

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("Database opening failed")]
    Database,
    #[error("Pipeline creation failed")]
    Pipeline,
    #[error("Invalid command line argument")]
    InvalidArgument,
    #[error("Command failed")]
    Command,
    #[error("Writing output failed")]
    Output,
    #[error("Command line mode is missing")]
    MissingMode,
}

fn print_json(value: &impl Serialize) -> Result<(), CommandError> {
    let text = serde_json::to_string_pretty(value).change_context(CommandError::Output)?;
    println!("{}", text);
    Ok(())
}

fn new_report(args: SubmitArgs) -> Result<NewReport, CommandError> {
    let location = Location::parse(&args.location, args.address)
        .change_context(CommandError::InvalidArgument)?;
    Ok(NewReport {
        submitter: args.submitter,
        description: args.description,
        category: args.category,
        urgency: args.urgency,
        location,
        affected_people: args.affected_people,
        media: MediaAttachments {
            has_image: args.image,
            has_audio: args.audio,
        },
    })
}

fn status_actor(args: &StatusArgs) -> StatusActor {
    match args.submitter {
        Some(user) => StatusActor::Submitter(user),
        None => StatusActor::Admin,
    }
}

pub async fn run(config: Config) -> Result<(), CommandError> {
    let mode = config
        .current_mode()
        .cloned()
        .ok_or_else(|| CommandError::MissingMode.report())?;

    let (store, close_handle) = DieselReportStore::new(config.database())
        .await
        .change_context(CommandError::Database)?;
    let store = Arc::new(store);
    let pipeline = pipeline_from_config(&config, reqwest::Client::new())
        .change_context(CommandError::Pipeline)?;
    info!("Pipeline mode: {:?}", pipeline.mode());
    let notifier = Notifier::from_config(config.notifications(), store.clone());
    let service = ReportService::new(store, pipeline, notifier, config.queries());

    let result = handle_mode(&service, mode).await;

    service.notifier().wait_pending().await;
    drop(service);
    close_handle.close().await;

    result
}

async fn handle_mode(service: &ReportService, mode: AppMode) -> Result<(), CommandError> {
    match mode {
        AppMode::Submit(args) => {
            let report = service
                .submit_report(new_report(args)?)
                .await
                .change_context(CommandError::Command)?;
            print_json(&report)
        }
        AppMode::Show { id } => {
            let report = service
                .get_report(id)
                .await
                .change_context(CommandError::Command)?;
            print_json(&report)
        }
        AppMode::Queue { queue } => {
            let reports = service
                .list_queue(queue)
                .await
                .change_context(CommandError::Command)?;
            print_json(&reports)
        }
        AppMode::ListStatus { status } => {
            let reports = service
                .list_by_status(status)
                .await
                .change_context(CommandError::Command)?;
            print_json(&reports)
        }
        AppMode::ListSubmitter { user } => {
            let reports = service
                .list_submitter_reports(user)
                .await
                .change_context(CommandError::Command)?;
            print_json(&reports)
        }
        AppMode::Decide(args) => {
            let report = service
                .apply_admin_decision(
                    args.id,
                    args.admin_action(),
                    args.reason,
                    args.expected_version.map(ReportVersion::new),
                )
                .await
                .change_context(CommandError::Command)?;
            print_json(&report)
        }
        AppMode::Status(args) => {
            let report = service
                .update_operational_status(
                    args.id,
                    status_actor(&args),
                    args.status,
                    args.expected_version.map(ReportVersion::new),
                )
                .await
                .change_context(CommandError::Command)?;
            print_json(&report)
        }
        AppMode::Stats { since_hours } => {
            let statistics = service
                .statistics(since_hours.map(UnixTime::hours_ago))
                .await
                .change_context(CommandError::Command)?;
            print_json(&statistics)
        }
        AppMode::Urgent => {
            let reports = service
                .urgent_reports()
                .await
                .change_context(CommandError::Command)?;
            print_json(&reports)
        }
        AppMode::Notifications { user } => {
            let notifications = service
                .notifications(user)
                .await
                .change_context(CommandError::Command)?;
            print_json(&notifications)
        }
        AppMode::MarkRead { user, id } => {
            service
                .mark_notification_read(user, id)
                .await
                .change_context(CommandError::Command)?;
            println!("Notification {} marked as read", id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use model::{Category, UrgencyLevel, UserId};

    use super::*;

    fn submit_args(location: &str) -> SubmitArgs {
        SubmitArgs {
            submitter: UserId::new(uuid::Uuid::new_v4()),
            category: Category::Fire,
            urgency: UrgencyLevel::High,
            location: location.to_string(),
            address: None,
            affected_people: 2,
            image: false,
            audio: true,
            description: "Forest fire near the road".to_string(),
        }
    }

    #[test]
    fn submit_args_become_new_report() {
        let report = new_report(submit_args("61.5,23.7")).unwrap();
        assert_eq!(report.location.latitude(), 61.5);
        assert!(report.media.has_audio);
        assert!(report.media.any());
    }

    #[test]
    fn invalid_location_is_invalid_argument() {
        let error = new_report(submit_args("north")).unwrap_err();
        assert!(matches!(
            error.current_context(),
            CommandError::InvalidArgument
        ));
    }
}
