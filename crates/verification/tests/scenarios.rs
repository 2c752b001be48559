use std::{sync::Arc, time::Duration};

use config::file::{ExecutionMode, QueriesConfig};
use database::{
    NotificationStore, ReportStore, memory::InMemoryReportStore, sqlite::DieselReportStore,
};
use model::{
    AdminAction, AdminQueue, Category, Location, MediaAttachments, NewReport, NotificationEvent,
    OperationalStatus, ReportId, SpamOrigin, UrgencyLevel, UserId, VerdictOutcome, VerdictSource,
    VerificationState, VerifiedBy,
};
use validator::{
    TextValidator,
    fake::{CallCounter, FixedValidator},
};
use verification::{
    VerificationError,
    notification::{Notifier, RecordingNotificationSink},
    pipeline::{FastPipeline, FullPipeline, PipelineLimits},
    service::ReportService,
};

const FLOOD_TEXT: &str = "Severe flooding in downtown, need evacuation";

fn limits() -> PipelineLimits {
    PipelineLimits {
        validator_timeout: Duration::from_secs(1),
        total_deadline: Duration::from_secs(2),
        execution: ExecutionMode::Concurrent,
    }
}

fn flood_report(media: MediaAttachments) -> NewReport {
    NewReport {
        submitter: UserId::new(uuid::Uuid::new_v4()),
        description: FLOOD_TEXT.to_string(),
        category: Category::Flood,
        urgency: UrgencyLevel::Critical,
        location: Location::new(60.17, 24.94, Some("Downtown".to_string())).unwrap(),
        affected_people: 12,
        media,
    }
}

fn image() -> MediaAttachments {
    MediaAttachments {
        has_image: true,
        has_audio: false,
    }
}

struct Harness {
    service: ReportService,
    sink: Arc<RecordingNotificationSink>,
    ai_calls: CallCounter,
}

fn fast_service<S: ReportStore + NotificationStore + 'static>(
    store: Arc<S>,
    ai: FixedValidator,
) -> Harness {
    let ai_calls = ai.calls();
    let sink = Arc::new(RecordingNotificationSink::default());
    let service = ReportService::new(
        store,
        Arc::new(FastPipeline::new(Arc::new(ai), limits())),
        Notifier::new(sink.clone()),
        &QueriesConfig::default(),
    );
    Harness {
        service,
        sink,
        ai_calls,
    }
}

async fn sqlite_store(name: &str) -> Arc<DieselReportStore> {
    let (store, _close) = DieselReportStore::new_in_ram(&format!(
        "{}_{}",
        name,
        uuid::Uuid::new_v4().simple()
    ))
    .await
    .unwrap();
    Arc::new(store)
}

async fn assert_only_in_queue(
    service: &ReportService,
    report: ReportId,
    queue: Option<AdminQueue>,
) {
    for q in AdminQueue::ALL {
        let listed = service
            .list_queue(q)
            .await
            .unwrap()
            .iter()
            .any(|r| r.id == report);
        assert_eq!(listed, Some(q) == queue, "queue {}", q.as_str());
    }
}

async fn scenario_a(h: Harness) {
    let report = h
        .service
        .submit_report(flood_report(MediaAttachments::default()))
        .await
        .unwrap();

    assert_eq!(
        report.verification,
        VerificationState::Verified {
            by: VerifiedBy::Classifier
        }
    );
    assert_eq!(report.validation_reason, "verified by AI");
    assert_eq!(report.verdicts.len(), 1);
    assert_eq!(report.verdicts[0].source, VerdictSource::AiTextValidator);
    assert_eq!(report.verdicts[0].outcome, VerdictOutcome::Yes);
    assert_eq!(h.ai_calls.count(), 1);
    assert_only_in_queue(&h.service, report.id, None).await;

    h.service.notifier().wait_pending().await;
    assert_eq!(h.sink.events(), vec![NotificationEvent::Verified]);
}

#[tokio::test]
async fn scenario_a_ai_yes_is_verified() {
    let ai = FixedValidator::yes(VerdictSource::AiTextValidator);
    scenario_a(fast_service(Arc::new(InMemoryReportStore::new()), ai)).await;
}

#[tokio::test]
async fn scenario_a_ai_yes_is_verified_sqlite() {
    let ai = FixedValidator::yes(VerdictSource::AiTextValidator);
    scenario_a(fast_service(sqlite_store("scenario_a").await, ai)).await;
}

async fn scenario_b(h: Harness) {
    let report = h.service.submit_report(flood_report(image())).await.unwrap();

    assert_eq!(report.verification, VerificationState::ManualPending);
    assert_eq!(report.validation_reason, "media requires manual verification");
    assert!(report.verdicts.is_empty());
    assert_eq!(h.ai_calls.count(), 0);
    assert_only_in_queue(&h.service, report.id, Some(AdminQueue::ManualPending)).await;

    h.service.notifier().wait_pending().await;
    assert_eq!(h.sink.events(), vec![NotificationEvent::ManualReview]);
}

#[tokio::test]
async fn scenario_b_media_requires_manual_review() {
    for ai in [
        FixedValidator::yes(VerdictSource::AiTextValidator),
        FixedValidator::no(VerdictSource::AiTextValidator),
    ] {
        scenario_b(fast_service(Arc::new(InMemoryReportStore::new()), ai)).await;
    }
}

#[tokio::test]
async fn scenario_b_media_requires_manual_review_sqlite() {
    let ai = FixedValidator::yes(VerdictSource::AiTextValidator);
    scenario_b(fast_service(sqlite_store("scenario_b").await, ai)).await;
}

async fn scenario_c(h: Harness) {
    let report = h
        .service
        .submit_report(flood_report(MediaAttachments::default()))
        .await
        .unwrap();
    assert_eq!(report.verification, VerificationState::AiRejected);
    assert_only_in_queue(&h.service, report.id, Some(AdminQueue::AiRejected)).await;

    let (manual, override_ai) = tokio::join!(
        h.service.apply_admin_decision(
            report.id,
            AdminAction::ManualVerify { verified: true },
            "looks real".to_string(),
            Some(report.version),
        ),
        h.service.apply_admin_decision(
            report.id,
            AdminAction::OverrideAi { verified: false },
            "duplicate of an older report".to_string(),
            Some(report.version),
        ),
    );

    assert_eq!(
        [manual.is_ok(), override_ai.is_ok()]
            .into_iter()
            .filter(|ok| *ok)
            .count(),
        1
    );
    for result in [&manual, &override_ai] {
        if let Err(error) = result {
            assert!(matches!(
                error.current_context(),
                VerificationError::Conflict | VerificationError::InvalidTransition
            ));
        }
    }

    let winner = manual.as_ref().ok().or(override_ai.as_ref().ok()).unwrap();
    let stored = h.service.get_report(report.id).await.unwrap();
    assert_eq!(&stored, winner);
    assert_eq!(stored.version, report.version.next());
}

#[tokio::test]
async fn scenario_c_racing_admin_decisions() {
    let ai = FixedValidator::no(VerdictSource::AiTextValidator);
    scenario_c(fast_service(Arc::new(InMemoryReportStore::new()), ai)).await;
}

#[tokio::test]
async fn scenario_c_racing_admin_decisions_sqlite() {
    let ai = FixedValidator::no(VerdictSource::AiTextValidator);
    scenario_c(fast_service(sqlite_store("scenario_c").await, ai)).await;
}

#[tokio::test]
async fn racing_override_decisions_write_once() {
    let ai = FixedValidator::no(VerdictSource::AiTextValidator);
    let h = fast_service(sqlite_store("race").await, ai);
    let report = h
        .service
        .submit_report(flood_report(MediaAttachments::default()))
        .await
        .unwrap();

    let service = Arc::new(h.service);
    let tasks: Vec<_> = [true, false]
        .into_iter()
        .map(|verified| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .apply_admin_decision(
                        report.id,
                        AdminAction::OverrideAi { verified },
                        "checked".to_string(),
                        None,
                    )
                    .await
            })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

    let stored = service.get_report(report.id).await.unwrap();
    assert_eq!(stored.version, report.version.next());
    assert_eq!(stored.notes.len(), 2);
}

#[tokio::test]
async fn override_spam_clears_and_sets_spam() {
    let store = Arc::new(InMemoryReportStore::new());
    let sink = Arc::new(RecordingNotificationSink::default());
    let disaster: Arc<dyn TextValidator> =
        Arc::new(FixedValidator::no(VerdictSource::MlDisasterClassifier));
    let service = ReportService::new(
        store,
        Arc::new(FullPipeline::new(
            Arc::new(FixedValidator::no(VerdictSource::AiTextValidator)),
            disaster,
            Some(Arc::new(FixedValidator::yes(VerdictSource::MlSpamClassifier))),
            limits(),
        )),
        Notifier::new(sink.clone()),
        &QueriesConfig::default(),
    );

    let report = service
        .submit_report(flood_report(MediaAttachments::default()))
        .await
        .unwrap();
    assert_eq!(
        report.verification,
        VerificationState::Spam {
            origin: SpamOrigin::Classifier {
                auto_verified: true
            }
        }
    );
    assert_only_in_queue(&service, report.id, Some(AdminQueue::Spam)).await;

    let not_spam = service
        .apply_admin_decision(
            report.id,
            AdminAction::OverrideSpam { is_spam: false },
            "real flood".to_string(),
            Some(report.version),
        )
        .await
        .unwrap();
    assert_eq!(
        not_spam.verification,
        VerificationState::Verified {
            by: VerifiedBy::Admin
        }
    );
    assert_eq!(not_spam.manual_verification_reason.as_deref(), Some("real flood"));
    assert_only_in_queue(&service, report.id, None).await;

    let spam = service
        .apply_admin_decision(
            report.id,
            AdminAction::OverrideSpam { is_spam: true },
            "advertisement".to_string(),
            Some(not_spam.version),
        )
        .await
        .unwrap();
    assert_eq!(
        spam.verification,
        VerificationState::Spam {
            origin: SpamOrigin::Admin
        }
    );
    assert_eq!(spam.status, OperationalStatus::Rejected);

    service.notifier().wait_pending().await;
    assert_eq!(
        sink.events(),
        vec![
            NotificationEvent::ManualReview,
            NotificationEvent::Verified,
            NotificationEvent::Rejected,
        ]
    );
}

#[tokio::test]
async fn invalid_transition_does_not_modify_report() {
    let ai = FixedValidator::yes(VerdictSource::AiTextValidator);
    let h = fast_service(sqlite_store("invalid").await, ai);
    let report = h
        .service
        .submit_report(flood_report(MediaAttachments::default()))
        .await
        .unwrap();

    let error = h
        .service
        .apply_admin_decision(
            report.id,
            AdminAction::ReVerify { verified: false },
            "not allowed".to_string(),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(*error.current_context(), VerificationError::InvalidTransition);
    assert_eq!(h.service.get_report(report.id).await.unwrap(), report);
}

#[tokio::test]
async fn rejected_report_can_be_re_verified() {
    let ai = FixedValidator::no(VerdictSource::AiTextValidator);
    let h = fast_service(sqlite_store("reverify").await, ai);
    let report = h
        .service
        .submit_report(flood_report(MediaAttachments::default()))
        .await
        .unwrap();

    let rejected = h
        .service
        .apply_admin_decision(
            report.id,
            AdminAction::OverrideAi { verified: false },
            "no such street".to_string(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, OperationalStatus::Rejected);
    assert_only_in_queue(&h.service, report.id, Some(AdminQueue::PreviouslyRejected)).await;

    let verified = h
        .service
        .apply_admin_decision(
            report.id,
            AdminAction::ReVerify { verified: true },
            "street was renamed".to_string(),
            Some(rejected.version),
        )
        .await
        .unwrap();
    assert_eq!(verified.status, OperationalStatus::Pending);
    assert_eq!(
        verified.manual_verification_reason.as_deref(),
        Some("Re-verified: street was renamed")
    );

    let in_progress = h
        .service
        .update_operational_status(
            report.id,
            verification::status::StatusActor::Admin,
            OperationalStatus::InProgress,
            Some(verified.version),
        )
        .await
        .unwrap();
    assert_eq!(in_progress.status, OperationalStatus::InProgress);

    let stats = h.service.statistics(None).await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.manually_verified, 1);
}
