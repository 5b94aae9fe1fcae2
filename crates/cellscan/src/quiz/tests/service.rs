use std::sync::Arc;

use serde_json::json;

use super::common::*;
use crate::quiz::catalog::QuestionRecord;
use crate::quiz::domain::{AnswerValue, QuestionId, SessionId, UserId};
use crate::quiz::service::{QuizService, QuizServiceError};
use crate::quiz::session::{RiskResolution, SessionError, SessionView, SessionWarning};

fn user() -> UserId {
    UserId("user-42".to_string())
}

fn smoker_run<Q, B, S>(service: &QuizService<Q, B, S>) -> SessionView
where
    Q: crate::quiz::repository::QuestionStore + 'static,
    B: crate::quiz::repository::RiskBandStore + 'static,
    S: crate::quiz::repository::ResponseSink + 'static,
{
    let started = service.start(user()).expect("session starts");
    let id = started.session_id;
    service
        .answer(&id, QuestionId(1), AnswerValue::text("Yes"))
        .expect("question 1");
    service
        .answer(&id, QuestionId(2), AnswerValue::Number(11.0))
        .expect("question 2");
    service
        .answer(&id, QuestionId(3), AnswerValue::text("Weekly"))
        .expect("question 3")
}

#[test]
fn start_opens_session_at_first_question() {
    let (service, _) = build_service();

    let view = service.start(user()).expect("session starts");

    assert_eq!(view.status, "in_progress");
    assert!(view.session_id.0.starts_with("quiz-"));
    assert_eq!(view.current_question.map(|q| q.id), Some(QuestionId(1)));
    assert_eq!(view.progress.total, 3);
    assert!(view.outcome.is_none());
}

#[test]
fn each_start_gets_a_distinct_session() {
    let (service, _) = build_service();
    let first = service.start(user()).expect("first");
    let second = service.start(user()).expect("second");
    assert_ne!(first.session_id, second.session_id);
}

#[test]
fn question_store_failure_blocks_the_session() {
    let service = QuizService::new(
        Arc::new(OfflineQuestionStore),
        Arc::new(MemoryBandStore::new(standard_bands())),
        Arc::new(MemorySink::default()),
    );

    let err = service.start(user()).expect_err("store is offline");

    assert!(matches!(err, QuizServiceError::QuestionLoad(_)));
}

#[test]
fn cyclic_question_sets_are_rejected_at_start() {
    let mut records: Vec<QuestionRecord> = question_records();
    records[1].next_question_logic = Some(json!({ "default": 1 }));
    let (service, _) = build_service_with(records, standard_bands());

    let err = service.start(user()).expect_err("cycle rejected");

    assert!(matches!(err, QuizServiceError::Catalog(_)));
}

#[test]
fn completed_session_reports_score_band_and_persists_answers() {
    let (service, sink) = build_service();

    let view = smoker_run(&service);

    assert_eq!(view.status, "completed");
    let outcome = view.outcome.expect("outcome present");
    assert_eq!(outcome.score, 50);
    assert_eq!(
        outcome.risk.assessment().map(|band| band.risk_level.as_str()),
        Some("Moderate")
    );
    assert!(outcome.warnings.is_empty());

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].session_id, view.session_id);
    let stored: Vec<(u32, &str)> = batches[0]
        .responses
        .iter()
        .map(|entry| (entry.question_id.0, entry.response.as_str()))
        .collect();
    assert_eq!(stored, vec![(1, "Yes"), (2, "11"), (3, "Weekly")]);
}

#[test]
fn branching_skip_leaves_question_unanswered() {
    let (service, sink) = build_service();
    let id = service.start(user()).expect("start").session_id;

    let after_first = service
        .answer(&id, QuestionId(1), AnswerValue::text("No"))
        .expect("question 1");
    assert_eq!(after_first.current_question.map(|q| q.id), Some(QuestionId(3)));

    let done = service
        .answer(&id, QuestionId(3), AnswerValue::text("Daily"))
        .expect("question 3");

    assert_eq!(done.outcome.expect("outcome").score, 30);
    assert_eq!(sink.batches()[0].responses.len(), 2);
}

#[test]
fn persistence_failure_still_completes_with_warning() {
    let service = QuizService::new(
        Arc::new(MemoryQuestionStore::new(question_records())),
        Arc::new(MemoryBandStore::new(standard_bands())),
        Arc::new(OfflineSink),
    );

    let view = smoker_run(&service);

    let outcome = view.outcome.expect("outcome present");
    assert_eq!(outcome.score, 50);
    assert!(matches!(outcome.risk, RiskResolution::Assessed { .. }));
    assert!(matches!(
        outcome.warnings.as_slice(),
        [SessionWarning::Persistence { .. }]
    ));
}

#[test]
fn band_lookup_failure_keeps_the_score() {
    let (gapped, _) = build_service_with(
        question_records(),
        vec![band("Low", 0, 20), band("High", 60, 100)],
    );
    let view = smoker_run(&gapped);
    let outcome = view.outcome.expect("outcome present");
    assert_eq!(outcome.score, 50);
    assert!(matches!(outcome.risk, RiskResolution::Unavailable { .. }));

    let offline = QuizService::new(
        Arc::new(MemoryQuestionStore::new(question_records())),
        Arc::new(OfflineBandStore),
        Arc::new(MemorySink::default()),
    );
    let outcome = smoker_run(&offline).outcome.expect("outcome present");
    assert_eq!(outcome.score, 50);
    match outcome.risk {
        RiskResolution::Unavailable { reason } => assert!(reason.contains("offline")),
        other => panic!("expected unavailable assessment, got {other:?}"),
    }
}

#[test]
fn lenient_policy_resolves_against_gapped_tables() {
    let (service, _) = build_service_with(
        question_records(),
        vec![band("Low", 0, 20), band("Moderate", 40, 55), band("High", 60, 100)],
    );
    let service = service.with_band_policy(crate::quiz::risk::BandPolicy::Lenient);

    let outcome = smoker_run(&service).outcome.expect("outcome present");

    assert_eq!(
        outcome.risk.assessment().map(|band| band.risk_level.as_str()),
        Some("Moderate")
    );
}

#[test]
fn answers_after_completion_are_refused() {
    let (service, _) = build_service();
    let id = smoker_run(&service).session_id;

    let err = service
        .answer(&id, QuestionId(3), AnswerValue::text("Never"))
        .expect_err("completed");

    assert!(matches!(
        err,
        QuizServiceError::Session(SessionError::AlreadyCompleted)
    ));
}

#[test]
fn reset_starts_over_and_allows_a_second_completion() {
    let (service, sink) = build_service();
    let id = smoker_run(&service).session_id;

    let reset = service.reset(&id).expect("reset");
    assert_eq!(reset.status, "in_progress");
    assert_eq!(reset.progress.answered, 0);

    service
        .answer(&id, QuestionId(1), AnswerValue::text("No"))
        .expect("question 1");
    let done = service
        .answer(&id, QuestionId(3), AnswerValue::text("Never"))
        .expect("question 3");

    let outcome = done.outcome.expect("outcome");
    assert_eq!(outcome.score, 0);
    assert_eq!(
        outcome.risk.assessment().map(|band| band.risk_level.as_str()),
        Some("Low")
    );
    assert_eq!(sink.batches().len(), 2);
}

#[test]
fn abandoned_sessions_are_forgotten() {
    let (service, _) = build_service();
    let id = service.start(user()).expect("start").session_id;

    service.abandon(&id).expect("abandon");

    assert!(matches!(
        service.get(&id),
        Err(QuizServiceError::SessionNotFound(_))
    ));
    assert!(matches!(
        service.abandon(&id),
        Err(QuizServiceError::SessionNotFound(_))
    ));
}

#[test]
fn unknown_sessions_are_reported() {
    let (service, _) = build_service();
    let missing = SessionId("quiz-missing".to_string());

    let err = service
        .answer(&missing, QuestionId(1), AnswerValue::text("Yes"))
        .expect_err("no such session");

    assert!(matches!(err, QuizServiceError::SessionNotFound(id) if id == missing));
}

#[test]
fn strict_policy_requires_bands_to_cover_every_attainable_score() {
    // Attainable scores run to 70, the table stops at 50.
    let short_table = vec![band("Low", 0, 29), band("Moderate", 30, 50)];
    let (strict, _) = build_service_with(question_records(), short_table.clone());

    let outcome = smoker_run(&strict).outcome.expect("outcome present");

    assert_eq!(outcome.score, 50);
    match outcome.risk {
        RiskResolution::Unavailable { reason } => assert!(reason.contains("51..=70")),
        other => panic!("expected unavailable assessment, got {other:?}"),
    }

    let (lenient, _) = build_service_with(question_records(), short_table);
    let lenient = lenient.with_band_policy(crate::quiz::risk::BandPolicy::Lenient);
    let outcome = smoker_run(&lenient).outcome.expect("outcome present");
    assert_eq!(
        outcome.risk.assessment().map(|band| band.risk_level.as_str()),
        Some("Moderate")
    );
}

#[test]
fn completed_sessions_are_evicted_after_their_ttl() {
    let (service, _) = build_service();
    let service = service.with_completed_ttl(chrono::Duration::zero());
    let open = service.start(user()).expect("start").session_id;
    let finished = smoker_run(&service).session_id;

    assert_eq!(service.evict_expired(), 1);

    assert!(matches!(
        service.get(&finished),
        Err(QuizServiceError::SessionNotFound(_))
    ));
    assert_eq!(service.get(&open).expect("still open").status, "in_progress");
}

#[test]
fn sessions_are_kept_without_a_ttl() {
    let (service, _) = build_service();
    let finished = smoker_run(&service).session_id;

    assert_eq!(service.evict_expired(), 0);
    assert_eq!(service.get(&finished).expect("kept").status, "completed");
}
