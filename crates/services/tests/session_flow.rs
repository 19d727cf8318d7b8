use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;

use exam_core::model::{
    AnswerOptionDraft, Difficulty, EngineSettings, EngineSettingsDraft, ExamProfileDraft,
    ExamProfileId, MasteredPolicy, OptionId, QuestionDraft, QuestionId, QuestionKind,
    QuestionOrder, SubmissionKind, WrongStatus,
};
use exam_core::time::fixed_now;
use exam_core::{BankDraft, QuestionFilter};
use services::{
    AppServices, BeginOutcome, Clock, OperationIssue, SelectionIssue, SessionError, SessionScope,
    SessionState, SettingsServiceError, TickHandle, TickScheduler, TickSubscription, TimeDisplay,
    TimerError, TokioTickScheduler,
};
use storage::repository::{InMemoryStore, KeyValueStore, Storage, StorageError};

//
// ─── FIXTURES ──────────────────────────────────────────────────────────────────
//

const TIMED_EXAM: u64 = 1;
const SHORT_EXAM: u64 = 2;

fn opt(id: &str, correct: bool) -> AnswerOptionDraft {
    AnswerOptionDraft {
        id: OptionId::new(id).unwrap(),
        text: format!("option {id}"),
        is_correct: correct,
    }
}

fn question(id: u64, subject: &str, difficulty: Difficulty) -> QuestionDraft {
    QuestionDraft {
        id: QuestionId::new(id),
        kind: QuestionKind::Single,
        content: format!("{subject} question {id}"),
        image: None,
        explanation: Some(format!("explanation {id}")),
        options: vec![opt("A", true), opt("B", false), opt("C", false)],
        subject: subject.into(),
        difficulty,
        score_weight: 1,
    }
}

fn bank_draft() -> BankDraft {
    let mut questions: Vec<QuestionDraft> = (1..=6)
        .map(|id| {
            let subject = if id % 2 == 0 { "meteorology" } else { "regulations" };
            let difficulty = if id <= 3 { Difficulty::Easy } else { Difficulty::Hard };
            question(id, subject, difficulty)
        })
        .collect();
    questions.push(QuestionDraft {
        kind: QuestionKind::Multiple,
        options: vec![opt("A", true), opt("B", true), opt("C", false)],
        ..question(7, "navigation", Difficulty::Medium)
    });
    BankDraft {
        questions,
        profiles: vec![
            ExamProfileDraft {
                id: ExamProfileId::new(TIMED_EXAM),
                name: Some("Theory exam".into()),
                duration_seconds: 3600,
                total_questions: 3,
                passing_score: 70,
                subjects: vec!["meteorology".into()],
            },
            ExamProfileDraft {
                id: ExamProfileId::new(SHORT_EXAM),
                name: None,
                duration_seconds: 3,
                total_questions: 10,
                passing_score: 50,
                subjects: Vec::new(),
            },
        ],
    }
}

/// Scheduler whose ticks are delivered by hand through `SessionController::tick`.
struct ManualScheduler;

impl TickScheduler for ManualScheduler {
    fn schedule(&self, _period: Duration) -> Result<TickSubscription, TimerError> {
        let (_tx, ticks) = mpsc::unbounded_channel();
        Ok(TickSubscription {
            handle: TickHandle::detached(),
            ticks,
        })
    }
}

struct BrokenScheduler;

impl TickScheduler for BrokenScheduler {
    fn schedule(&self, _period: Duration) -> Result<TickSubscription, TimerError> {
        Err(TimerError::Unavailable("no runtime".into()))
    }
}

/// Reads succeed with nothing stored; every write fails.
struct ReadOnlyStore;

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk full".into()))
    }
}

/// Backend that cannot be reached at all.
struct UnreachableStore;

#[async_trait]
impl KeyValueStore for UnreachableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Connection("unavailable".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("unavailable".into()))
    }
}

/// Remembers the period it was asked for.
#[derive(Default)]
struct RecordingScheduler {
    periods: Mutex<Vec<Duration>>,
}

impl TickScheduler for RecordingScheduler {
    fn schedule(&self, period: Duration) -> Result<TickSubscription, TimerError> {
        self.periods.lock().unwrap().push(period);
        ManualScheduler.schedule(period)
    }
}

async fn services_with(storage: Storage, scheduler: Arc<dyn TickScheduler>) -> AppServices {
    let mut services =
        AppServices::with_scheduler(storage, bank_draft(), Clock::fixed(fixed_now()), scheduler)
            .await
            .unwrap();
    services
        .controller_mut()
        .set_rng(StdRng::seed_from_u64(7));
    services
}

async fn manual_services() -> AppServices {
    services_with(Storage::in_memory(), Arc::new(ManualScheduler)).await
}

fn a(id: &str) -> OptionId {
    OptionId::new(id).unwrap()
}

fn ids(questions: &[exam_core::model::Question]) -> Vec<u64> {
    questions.iter().map(|q| q.id().value()).collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn hour_long_exam_finalizes_exactly_once() {
    let mut services = manual_services().await;
    let controller = services.controller_mut();
    let mut session = controller.new_session();
    controller
        .choose(&mut session, SessionScope::Exam(ExamProfileId::new(TIMED_EXAM)))
        .unwrap();
    assert_eq!(session.state(), SessionState::RulesDisplay);
    assert!(matches!(
        controller.begin(&mut session).await.unwrap(),
        BeginOutcome::Started { .. }
    ));
    // only three meteorology questions exist
    assert_eq!(session.questions().len(), 3);

    let mut results = Vec::new();
    for _ in 0..3600 {
        if let Some(result) = controller.tick(&mut session).await.unwrap() {
            results.push(result);
        }
    }
    for _ in 0..10 {
        assert!(controller.tick(&mut session).await.unwrap().is_none());
    }

    assert_eq!(results.len(), 1);
    assert_eq!(session.state(), SessionState::Submitted);
    assert_eq!(session.time_display(), TimeDisplay::Remaining(0));
    let result = &results[0];
    assert_eq!(result.submission, SubmissionKind::TimeExpired);
    assert_eq!(result.time_used_seconds, 3600);
    assert_eq!(result.overall_percentage, 0);
    assert!(!result.passed);
    assert_eq!(controller.tracker().stats().new, 3);
}

#[tokio::test]
async fn submit_cancel_keeps_answers_and_confirm_submits_once() {
    let mut services = manual_services().await;
    let controller = services.controller_mut();
    let mut session = controller.new_session();
    controller
        .choose(&mut session, SessionScope::Exam(ExamProfileId::new(TIMED_EXAM)))
        .unwrap();
    controller.begin(&mut session).await.unwrap();

    let first = session.current_question().unwrap().id();
    session.select_answer(first, a("A")).unwrap();
    let request = session.request_submit().unwrap();
    assert_eq!((request.answered, request.unanswered, request.total), (1, 2, 3));

    session.cancel_submit();
    assert_eq!(session.state(), SessionState::Active);
    assert!(!session.is_submit_pending());
    assert!(session.selection(first).is_some());
    assert!(matches!(
        controller.confirm_submit(&mut session).await.unwrap_err(),
        SessionError::InvalidOperation(OperationIssue::NoPendingSubmit)
    ));

    session.request_submit().unwrap();
    let result = controller.confirm_submit(&mut session).await.unwrap();
    assert_eq!(result.submission, SubmissionKind::Manual);
    assert_eq!(result.answered_count, 1);
    assert_eq!(result.wrong_questions.len(), 2);
    assert_eq!(result.overall_percentage, 33);

    assert!(controller.confirm_submit(&mut session).await.is_err());
    let err = session.select_answer(first, a("B")).unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidSelection(SelectionIssue::Submitted)
    ));
    assert!(controller.tick(&mut session).await.unwrap().is_none());
    assert_eq!(controller.tracker().stats().total(), 2);
}

#[tokio::test]
async fn unknown_profile_is_missing_config() {
    let services = manual_services().await;
    let controller = services.controller();
    let mut session = controller.new_session();
    let err = controller
        .choose(&mut session, SessionScope::Exam(ExamProfileId::new(99)))
        .unwrap_err();
    assert!(matches!(err, SessionError::ExamConfigMissing(id) if id.value() == 99));
    assert_eq!(session.state(), SessionState::Selecting);
}

#[tokio::test]
async fn empty_draw_stays_on_rules() {
    let mut services = manual_services().await;
    let controller = services.controller_mut();
    let mut session = controller.new_session();
    let filter = QuestionFilter::all().with_subject("payload");
    controller
        .choose(&mut session, SessionScope::Practice(filter))
        .unwrap();
    assert!(matches!(
        controller.begin(&mut session).await.unwrap_err(),
        SessionError::Empty
    ));
    assert_eq!(session.state(), SessionState::RulesDisplay);
    controller.abandon(&mut session).unwrap();
    assert_eq!(session.state(), SessionState::Selecting);
}

#[tokio::test]
async fn practice_is_sequential_and_exam_is_shuffled() {
    let mut services = manual_services().await;
    let controller = services.controller_mut();

    let mut practice = controller.new_session();
    controller
        .choose(&mut practice, SessionScope::Practice(QuestionFilter::all()))
        .unwrap();
    controller.begin(&mut practice).await.unwrap();
    assert_eq!(ids(practice.questions()), vec![1, 2, 3, 4, 5, 6, 7]);
    let rules = practice.rules().unwrap();
    assert_eq!(rules.passing_score, 60);
    assert_eq!(rules.duration_seconds, 0);

    let mut exam = controller.new_session();
    controller
        .choose(&mut exam, SessionScope::Exam(ExamProfileId::new(SHORT_EXAM)))
        .unwrap();
    controller.begin(&mut exam).await.unwrap();
    let drawn = ids(exam.questions());
    let mut sorted = drawn.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_ne!(drawn, sorted);
}

#[tokio::test]
async fn practice_limit_and_order_follow_settings() {
    let storage = Storage::in_memory();
    let saved = services_with(storage.clone(), Arc::new(ManualScheduler))
        .await
        .settings()
        .save(EngineSettingsDraft {
            practice_order: Some(QuestionOrder::Sequential),
            practice_question_limit: Some(2),
            practice_passing_score: Some(100),
            ..EngineSettingsDraft::default()
        })
        .await
        .unwrap();

    // settings are read back when the engine starts
    let mut services = services_with(storage, Arc::new(ManualScheduler)).await;
    let controller = services.controller_mut();
    assert_eq!(controller.settings(), &saved);
    let mut session = controller.new_session();
    controller
        .choose(
            &mut session,
            SessionScope::Practice(QuestionFilter::all().with_difficulty(Difficulty::Hard)),
        )
        .unwrap();
    controller.begin(&mut session).await.unwrap();
    assert_eq!(ids(session.questions()), vec![4, 5]);
    assert_eq!(session.rules().unwrap().passing_score, 100);
}

#[tokio::test]
async fn broken_scheduler_force_submits() {
    let mut services = services_with(Storage::in_memory(), Arc::new(BrokenScheduler)).await;
    let controller = services.controller_mut();
    let mut session = controller.new_session();
    controller
        .choose(&mut session, SessionScope::Exam(ExamProfileId::new(TIMED_EXAM)))
        .unwrap();
    let outcome = controller.begin(&mut session).await.unwrap();
    let BeginOutcome::ForceSubmitted(result) = outcome else {
        panic!("expected forced submit");
    };
    assert_eq!(result.submission, SubmissionKind::ForcedTimerFailure);
    assert_eq!(result.time_used_seconds, 0);
    assert_eq!(session.state(), SessionState::Submitted);
    assert_eq!(session.result(), Some(&result));
    assert!(!session.has_ticker());
}

#[tokio::test]
async fn failing_store_degrades_to_memory() {
    let storage = Storage::new(Arc::new(ReadOnlyStore));
    let mut services = services_with(storage, Arc::new(ManualScheduler)).await;
    let controller = services.controller_mut();
    assert!(!controller.tracker().is_degraded());

    let mut session = controller.new_session();
    controller
        .choose(&mut session, SessionScope::Practice(QuestionFilter::all()))
        .unwrap();
    controller.begin(&mut session).await.unwrap();
    session.request_submit().unwrap();
    let result = controller.confirm_submit(&mut session).await.unwrap();
    assert_eq!(result.wrong_questions.len(), 7);

    assert!(controller.tracker().is_degraded());
    assert_eq!(controller.tracker().stats().new, 7);
    let record = controller.mark_mastered(QuestionId::new(1)).await.unwrap();
    assert_eq!(record.status(), WrongStatus::Mastered);
}

#[tokio::test]
async fn countdown_expiry_wins_over_pending_confirmation() {
    let mut services = manual_services().await;
    let controller = services.controller_mut();
    let mut session = controller.new_session();
    controller
        .choose(&mut session, SessionScope::Exam(ExamProfileId::new(SHORT_EXAM)))
        .unwrap();
    controller.begin(&mut session).await.unwrap();
    session.request_submit().unwrap();

    let mut results = Vec::new();
    for _ in 0..5 {
        if let Some(result) = controller.tick(&mut session).await.unwrap() {
            results.push(result);
        }
    }
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].submission, SubmissionKind::TimeExpired);
    assert_eq!(results[0].time_used_seconds, 3);

    let err = controller.confirm_submit(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));
    assert_eq!(controller.tracker().stats().new, 7);
    assert!(controller.tracker().records().iter().all(|r| r.wrong_count() == 1));
}

#[tokio::test]
async fn unreachable_store_still_starts_the_engine() {
    let storage = Storage::new(Arc::new(UnreachableStore));
    let mut services = services_with(storage, Arc::new(ManualScheduler)).await;
    let controller = services.controller_mut();
    assert_eq!(controller.settings(), &EngineSettings::default());
    assert!(controller.tracker().is_degraded());

    let mut session = controller.new_session();
    controller
        .choose(&mut session, SessionScope::Practice(QuestionFilter::all()))
        .unwrap();
    controller.begin(&mut session).await.unwrap();
    session.select_answer(QuestionId::new(1), a("B")).unwrap();
    session.request_submit().unwrap();
    let result = controller.confirm_submit(&mut session).await.unwrap();
    assert_eq!(result.wrong_questions.len(), 7);
    assert_eq!(controller.tracker().stats().new, 7);
}

#[tokio::test]
async fn corrupt_settings_document_falls_back_to_defaults() {
    let kv = Arc::new(InMemoryStore::new());
    kv.set(storage::keys::ENGINE_SETTINGS, "{garbage").await.unwrap();
    let services = services_with(Storage::new(kv), Arc::new(ManualScheduler)).await;
    assert_eq!(services.controller().settings(), &EngineSettings::default());
    assert!(!services.controller().tracker().is_degraded());
}

#[tokio::test]
async fn unopenable_database_falls_back_to_memory() {
    let storage = AppServices::open_storage("sqlite:///definitely/missing/dir/exam.sqlite3").await;
    storage.kv.set("ping", "1").await.unwrap();
    assert_eq!(storage.kv.get("ping").await.unwrap().as_deref(), Some("1"));
}

#[tokio::test]
async fn saved_settings_apply_to_the_next_run() {
    let storage = Storage::in_memory();
    let mut services = services_with(storage.clone(), Arc::new(ManualScheduler)).await;
    let saved = services
        .save_settings(EngineSettingsDraft {
            practice_question_limit: Some(2),
            mastered_policy: Some(MasteredPolicy::Sticky),
            ..EngineSettingsDraft::default()
        })
        .await
        .unwrap();
    assert_eq!(services.controller().settings(), &saved);
    assert_eq!(services.controller().tracker().policy(), MasteredPolicy::Sticky);

    let err = services
        .save_settings(EngineSettingsDraft {
            practice_passing_score: Some(150),
            ..EngineSettingsDraft::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SettingsServiceError::Settings(_)));
    assert_eq!(services.controller().settings(), &saved);

    let controller = services.controller_mut();
    let mut session = controller.new_session();
    controller
        .choose(&mut session, SessionScope::Practice(QuestionFilter::all()))
        .unwrap();
    controller.begin(&mut session).await.unwrap();
    assert_eq!(session.questions().len(), 2);

    let reloaded = services_with(storage, Arc::new(ManualScheduler)).await;
    assert_eq!(reloaded.controller().settings(), &saved);
}

#[tokio::test]
async fn ticker_is_scheduled_at_one_second() {
    let scheduler = Arc::new(RecordingScheduler::default());
    let mut services = services_with(Storage::in_memory(), scheduler.clone()).await;
    let controller = services.controller_mut();
    for scope in [
        SessionScope::Exam(ExamProfileId::new(TIMED_EXAM)),
        SessionScope::Practice(QuestionFilter::all()),
    ] {
        let mut session = controller.new_session();
        controller.choose(&mut session, scope).unwrap();
        controller.begin(&mut session).await.unwrap();
    }
    assert_eq!(
        *scheduler.periods.lock().unwrap(),
        vec![Duration::from_secs(1), Duration::from_secs(1)]
    );
}

#[tokio::test]
async fn review_session_draws_tracked_questions_and_counts_reviews() {
    let mut services = manual_services().await;
    let controller = services.controller_mut();

    let mut exam = controller.new_session();
    controller
        .choose(&mut exam, SessionScope::Exam(ExamProfileId::new(TIMED_EXAM)))
        .unwrap();
    controller.begin(&mut exam).await.unwrap();
    exam.request_submit().unwrap();
    controller.confirm_submit(&mut exam).await.unwrap();
    assert_eq!(controller.tracker().stats().new, 3);

    let mut review = controller.new_session();
    controller
        .choose(&mut review, SessionScope::Review(QuestionFilter::all()))
        .unwrap();
    controller.begin(&mut review).await.unwrap();
    assert_eq!(ids(review.questions()), vec![2, 4, 6]);

    let first = review.current_question().unwrap().id();
    review.select_answer(first, a("A")).unwrap();
    review.next().unwrap();
    let second = review.current_question().unwrap().id();
    review.select_answer(second, a("C")).unwrap();
    review.request_submit().unwrap();
    controller.confirm_submit(&mut review).await.unwrap();

    let tracker = controller.tracker();
    let r2 = tracker.get(QuestionId::new(2)).unwrap();
    assert_eq!(r2.status(), WrongStatus::Reviewed);
    assert_eq!(r2.wrong_count(), 1);
    let r4 = tracker.get(QuestionId::new(4)).unwrap();
    assert_eq!(r4.status(), WrongStatus::Reviewed);
    assert_eq!(r4.wrong_count(), 2);
    let r6 = tracker.get(QuestionId::new(6)).unwrap();
    assert_eq!(r6.status(), WrongStatus::New);
    assert_eq!(r6.wrong_count(), 2);

    let mut filtered = controller.new_session();
    controller
        .choose(
            &mut filtered,
            SessionScope::Practice(
                QuestionFilter::all()
                    .with_difficulty(Difficulty::Hard)
                    .with_status(WrongStatus::New),
            ),
        )
        .unwrap();
    controller.begin(&mut filtered).await.unwrap();
    assert_eq!(ids(filtered.questions()), vec![6]);
}

#[tokio::test]
async fn explanation_reviews_and_mastery_is_explicit() {
    let storage = Storage::in_memory();
    let mut services = services_with(storage.clone(), Arc::new(ManualScheduler)).await;
    let controller = services.controller_mut();

    let untracked = controller.open_explanation(QuestionId::new(1)).await.unwrap();
    assert_eq!(untracked.explanation.as_deref(), Some("explanation 1"));
    assert!(untracked.record.is_none());

    assert!(matches!(
        controller.mark_mastered(QuestionId::new(1)).await.unwrap_err(),
        SessionError::InvalidOperation(OperationIssue::NotTracked(_))
    ));
    assert!(matches!(
        controller.open_explanation(QuestionId::new(42)).await.unwrap_err(),
        SessionError::InvalidOperation(OperationIssue::UnknownQuestion(_))
    ));

    let mut session = controller.new_session();
    controller
        .choose(&mut session, SessionScope::Practice(QuestionFilter::all()))
        .unwrap();
    controller.begin(&mut session).await.unwrap();
    session.select_answer(QuestionId::new(1), a("B")).unwrap();
    session.request_submit().unwrap();
    controller.confirm_submit(&mut session).await.unwrap();

    let opened = controller.open_explanation(QuestionId::new(1)).await.unwrap();
    let record = opened.record.unwrap();
    assert_eq!(record.status(), WrongStatus::Reviewed);
    assert_eq!(record.review_count(), 1);

    let mastered = controller.mark_mastered(QuestionId::new(1)).await.unwrap();
    assert_eq!(mastered.status(), WrongStatus::Mastered);
    assert!(mastered.is_reviewed());
    assert_eq!(mastered.mastered_date(), Some(fixed_now()));

    // a fresh engine on the same storage sees the persisted records
    let reloaded = AppServices::with_scheduler(
        storage,
        bank_draft(),
        Clock::fixed(fixed_now()),
        Arc::new(ManualScheduler),
    )
    .await
    .unwrap();
    let tracker = reloaded.controller().tracker();
    assert_eq!(tracker.stats().total(), 7);
    assert_eq!(
        tracker.status_of(QuestionId::new(1)),
        Some(WrongStatus::Mastered)
    );
}

#[tokio::test(start_paused = true)]
async fn tokio_ticker_drives_a_short_exam_to_completion() {
    let mut services = AppServices::with_scheduler(
        Storage::new(Arc::new(InMemoryStore::new())),
        bank_draft(),
        Clock::fixed(fixed_now()),
        Arc::new(TokioTickScheduler),
    )
    .await
    .unwrap();
    let controller = services.controller_mut();
    let mut session = controller.new_session();
    controller
        .choose(&mut session, SessionScope::Exam(ExamProfileId::new(SHORT_EXAM)))
        .unwrap();
    let BeginOutcome::Started { mut ticks } = controller.begin(&mut session).await.unwrap() else {
        panic!("expected a running session");
    };
    assert!(session.has_ticker());

    let mut result = None;
    while let Some(()) = ticks.recv().await {
        if let Some(done) = controller.tick(&mut session).await.unwrap() {
            result = Some(done);
        }
    }

    let result = result.expect("countdown should finalize the exam");
    assert_eq!(result.submission, SubmissionKind::TimeExpired);
    assert_eq!(result.time_used_seconds, 3);
    assert!(!session.has_ticker());
}
