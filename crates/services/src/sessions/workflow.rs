use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use exam_core::QuestionBank;
use exam_core::model::{EngineSettings, ExamResult, Question, QuestionId, WrongQuestionRecord};

use super::plan::{SessionPlan, SessionPlanner};
use super::service::{PracticeSession, SessionKind, SessionScope, TickEffect};
use crate::Clock;
use crate::error::{OperationIssue, SessionError};
use crate::timer::{TickReceiver, TickScheduler, TickSubscription};
use crate::wrong_questions::WrongQuestionTracker;

/// One scheduler tick is one second of session time.
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// How `begin` left the session.
#[derive(Debug)]
pub enum BeginOutcome {
    /// The run is active; ticks arrive on `ticks` until it is finalised.
    Started { ticks: TickReceiver },
    /// No ticker could be started, so the run was closed at once.
    ForceSubmitted(ExamResult),
}

/// Explanation text for a question, plus the tracker record it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationView {
    pub question_id: QuestionId,
    pub explanation: Option<String>,
    pub record: Option<WrongQuestionRecord>,
}

/// Orchestrates runs against the bank, the tracker and the tick scheduler.
pub struct SessionController {
    clock: Clock,
    bank: Arc<QuestionBank>,
    tracker: WrongQuestionTracker,
    settings: EngineSettings,
    scheduler: Arc<dyn TickScheduler>,
    rng: StdRng,
}

impl SessionController {
    #[must_use]
    pub fn new(
        clock: Clock,
        bank: Arc<QuestionBank>,
        tracker: WrongQuestionTracker,
        settings: EngineSettings,
        scheduler: Arc<dyn TickScheduler>,
    ) -> Self {
        Self {
            clock,
            bank,
            tracker,
            settings,
            scheduler,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replace the shuffle source, e.g. with a seeded generator in tests.
    pub fn set_rng(&mut self, rng: StdRng) {
        self.rng = rng;
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn tracker(&self) -> &WrongQuestionTracker {
        &self.tracker
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Swap in new settings. Affects runs started afterwards.
    pub fn apply_settings(&mut self, settings: EngineSettings) {
        self.tracker.set_policy(settings.mastered_policy());
        self.settings = settings;
    }

    #[must_use]
    pub fn new_session(&self) -> PracticeSession {
        PracticeSession::new()
    }

    /// `Selecting -> RulesDisplay` for `scope`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ExamConfigMissing` for an unknown exam profile,
    /// or `SessionError::InvalidTransition` outside `Selecting`.
    pub fn choose(
        &self,
        session: &mut PracticeSession,
        scope: SessionScope,
    ) -> Result<(), SessionError> {
        let (profile, passing_score, limit) = match &scope {
            SessionScope::Exam(id) => {
                let profile = self
                    .bank
                    .profile(*id)
                    .ok_or(SessionError::ExamConfigMissing(*id))?
                    .clone();
                let passing = profile.passing_score();
                let limit = profile.total_questions();
                (Some(profile), passing, Some(limit))
            }
            SessionScope::Practice(_) | SessionScope::Review(_) => (
                None,
                self.settings.practice_passing_score(),
                self.settings.practice_question_limit(),
            ),
        };
        session.choose(scope, profile, passing_score, limit)?;
        tracing::debug!(session = %session.id(), kind = ?session.kind(), "scope chosen");
        Ok(())
    }

    fn draw(&mut self, session: &PracticeSession) -> SessionPlan {
        let tracker = &self.tracker;
        let status_of = |id: QuestionId| tracker.status_of(id);
        let (candidates, order): (Vec<&Question>, _) = match session.scope() {
            Some(SessionScope::Exam(_)) => {
                let candidates = session
                    .profile()
                    .map(|p| self.bank.questions_for_profile(p))
                    .unwrap_or_default();
                (candidates, self.settings.exam_order())
            }
            Some(SessionScope::Practice(filter)) => (
                self.bank.filter(filter, status_of),
                self.settings.practice_order(),
            ),
            Some(SessionScope::Review(filter)) => (
                self.bank
                    .filter(filter, status_of)
                    .into_iter()
                    .filter(|q| tracker.is_tracked(q.id()))
                    .collect(),
                self.settings.practice_order(),
            ),
            None => (Vec::new(), self.settings.practice_order()),
        };
        SessionPlanner::new(order)
            .with_limit(session.question_limit())
            .build(candidates, &mut self.rng)
    }

    /// `RulesDisplay -> Active`: draw, order and truncate questions, then
    /// start the ticker.
    ///
    /// If the ticker cannot be started the run is finalised immediately
    /// with `SubmissionKind::ForcedTimerFailure`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when nothing matches the scope; the
    /// session then stays in `RulesDisplay`.
    pub async fn begin(
        &mut self,
        session: &mut PracticeSession,
    ) -> Result<BeginOutcome, SessionError> {
        session.ensure_can_begin()?;
        let plan = self.draw(session);
        if let Some(profile) = session.profile() {
            let wanted = usize::try_from(profile.total_questions()).unwrap_or(usize::MAX);
            if plan.total() < wanted {
                tracing::warn!(
                    profile = %profile.id(),
                    wanted,
                    available = plan.available,
                    "exam profile has fewer questions than requested"
                );
            }
        }
        session.activate(plan.questions, self.clock.now())?;
        tracing::debug!(session = %session.id(), questions = session.questions().len(), "session started");

        match self.scheduler.schedule(TICK_PERIOD) {
            Ok(TickSubscription { handle, ticks }) => {
                session.attach_ticks(handle);
                Ok(BeginOutcome::Started { ticks })
            }
            Err(err) => {
                tracing::warn!(error = %err, session = %session.id(), "tick scheduler failed; submitting session");
                let result = session.force_submit(self.clock.now())?.clone();
                self.record_result(session, &result).await?;
                Ok(BeginOutcome::ForceSubmitted(result))
            }
        }
    }

    async fn record_result(
        &mut self,
        session: &PracticeSession,
        result: &ExamResult,
    ) -> Result<(), SessionError> {
        let as_review = session.kind() == Some(SessionKind::Review);
        self.tracker
            .apply_result(result, as_review, self.clock.now())
            .await?;
        Ok(())
    }

    /// Second phase of a manual submit; updates the tracker.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` if no submit was requested.
    pub async fn confirm_submit(
        &mut self,
        session: &mut PracticeSession,
    ) -> Result<ExamResult, SessionError> {
        let result = session.confirm_submit(self.clock.now())?.clone();
        tracing::debug!(session = %session.id(), score = result.overall_percentage, "session submitted");
        self.record_result(session, &result).await?;
        Ok(result)
    }

    /// Deliver one tick. Returns the result when this tick ended the run.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Tracker` if the result cannot be applied.
    pub async fn tick(
        &mut self,
        session: &mut PracticeSession,
    ) -> Result<Option<ExamResult>, SessionError> {
        match session.tick(self.clock.now()) {
            TickEffect::Finalized => {
                let Some(result) = session.result().cloned() else {
                    return Ok(None);
                };
                tracing::debug!(session = %session.id(), "time expired; session submitted");
                self.record_result(session, &result).await?;
                Ok(Some(result))
            }
            TickEffect::Running | TickEffect::Ignored => Ok(None),
        }
    }

    /// Discard the run in progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` once the run is submitted.
    pub fn abandon(&self, session: &mut PracticeSession) -> Result<(), SessionError> {
        session.back_to_selection()?;
        tracing::debug!(session = %session.id(), "session abandoned");
        Ok(())
    }

    /// Show a question's explanation. Opening it counts as a review of a
    /// tracked question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` for a question not in the bank.
    pub async fn open_explanation(
        &mut self,
        question_id: QuestionId,
    ) -> Result<ExplanationView, SessionError> {
        let explanation = self
            .bank
            .question(question_id)
            .ok_or(OperationIssue::UnknownQuestion(question_id))?
            .explanation()
            .map(str::to_string);
        let record = if self.tracker.is_tracked(question_id) {
            Some(
                self.tracker
                    .record_review(question_id, self.clock.now())
                    .await?,
            )
        } else {
            None
        };
        Ok(ExplanationView {
            question_id,
            explanation,
            record,
        })
    }

    /// Mark a tracked question as mastered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` for an untracked question.
    pub async fn mark_mastered(
        &mut self,
        question_id: QuestionId,
    ) -> Result<WrongQuestionRecord, SessionError> {
        Ok(self
            .tracker
            .mark_mastered(question_id, self.clock.now())
            .await?)
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("clock", &self.clock)
            .field("bank_len", &self.bank.len())
            .field("settings", &self.settings)
            .field("tracker_degraded", &self.tracker.is_degraded())
            .finish_non_exhaustive()
    }
}
