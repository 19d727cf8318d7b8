use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

use exam_core::model::{
    ExamProfile, ExamResult, OptionId, Question, QuestionId, SessionId, Selection, SubmissionKind,
};
use exam_core::{QuestionFilter, ScoreAggregator, SessionTimer, TickOutcome};

use super::progress::SessionProgress;
use super::view::{
    AnswerSheetItem, OptionView, QuestionView, SessionRules, SubmitRequest, TimeDisplay,
};
use crate::error::{OperationIssue, SelectionIssue, SessionError};
use crate::timer::TickHandle;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Selecting,
    RulesDisplay,
    Active,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Exam,
    Practice,
    Review,
}

/// What a run draws its questions from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionScope {
    /// All questions covered by an exam profile.
    Exam(exam_core::model::ExamProfileId),
    /// Bank questions matching a filter.
    Practice(QuestionFilter),
    /// Tracked wrong questions matching a filter.
    Review(QuestionFilter),
}

impl SessionScope {
    #[must_use]
    pub fn kind(&self) -> SessionKind {
        match self {
            SessionScope::Exam(_) => SessionKind::Exam,
            SessionScope::Practice(_) => SessionKind::Practice,
            SessionScope::Review(_) => SessionKind::Review,
        }
    }
}

/// What a delivered tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEffect {
    Running,
    /// The countdown ran out and the session was finalised by this tick.
    Finalized,
    /// The session was not running; nothing changed.
    Ignored,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One practice or exam run, from scope selection to result.
///
/// Pure state machine: drawing questions and persisting tracker updates is
/// done by `SessionController`.
pub struct PracticeSession {
    id: SessionId,
    state: SessionState,
    scope: Option<SessionScope>,
    profile: Option<ExamProfile>,
    passing_score: u32,
    question_limit: Option<u32>,
    questions: Vec<Question>,
    answers: HashMap<QuestionId, Selection>,
    cursor: usize,
    timer: SessionTimer,
    submit_pending: bool,
    started_at: Option<DateTime<Utc>>,
    result: Option<ExamResult>,
    ticks: Option<TickHandle>,
}

impl Default for PracticeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SessionId::random(),
            state: SessionState::Selecting,
            scope: None,
            profile: None,
            passing_score: 0,
            question_limit: None,
            questions: Vec::new(),
            answers: HashMap::new(),
            cursor: 0,
            timer: SessionTimer::stopwatch(),
            submit_pending: false,
            started_at: None,
            result: None,
            ticks: None,
        }
    }

    fn transition_error(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            from: self.state,
            action,
        }
    }

    // ─── transitions ───────────────────────────────────────────────────────

    /// `Selecting -> RulesDisplay`.
    pub(crate) fn choose(
        &mut self,
        scope: SessionScope,
        profile: Option<ExamProfile>,
        passing_score: u32,
        question_limit: Option<u32>,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Selecting {
            return Err(self.transition_error("choose a scope"));
        }
        self.scope = Some(scope);
        self.profile = profile;
        self.passing_score = passing_score;
        self.question_limit = question_limit;
        self.state = SessionState::RulesDisplay;
        Ok(())
    }

    /// Check that `begin` may run. Nothing changes.
    pub(crate) fn ensure_can_begin(&self) -> Result<(), SessionError> {
        if self.state == SessionState::RulesDisplay {
            Ok(())
        } else {
            Err(self.transition_error("begin"))
        }
    }

    /// `RulesDisplay -> Active`. An empty draw leaves the session untouched.
    pub(crate) fn activate(
        &mut self,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.ensure_can_begin()?;
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        let duration = self.profile.as_ref().map_or(0, ExamProfile::duration_seconds);
        self.timer = SessionTimer::for_duration(duration);
        self.questions = questions;
        self.answers.clear();
        self.cursor = 0;
        self.submit_pending = false;
        self.started_at = Some(started_at);
        self.state = SessionState::Active;
        Ok(())
    }

    pub(crate) fn attach_ticks(&mut self, handle: TickHandle) {
        if let Some(mut old) = self.ticks.replace(handle) {
            old.cancel();
        }
    }

    fn cancel_ticks(&mut self) {
        if let Some(handle) = self.ticks.as_mut() {
            handle.cancel();
        }
        self.ticks = None;
    }

    /// Discard the run in progress and return to `Selecting`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` once the session is submitted.
    pub fn back_to_selection(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Selecting => Ok(()),
            SessionState::RulesDisplay | SessionState::Active => {
                self.cancel_ticks();
                self.scope = None;
                self.profile = None;
                self.passing_score = 0;
                self.question_limit = None;
                self.questions.clear();
                self.answers.clear();
                self.cursor = 0;
                self.timer = SessionTimer::stopwatch();
                self.submit_pending = false;
                self.started_at = None;
                self.state = SessionState::Selecting;
                Ok(())
            }
            SessionState::Submitted => Err(self.transition_error("go back to selection")),
        }
    }

    // ─── answers ───────────────────────────────────────────────────────────

    /// Click `option` on the question on screen.
    ///
    /// Single-choice questions replace the prior choice; multiple-choice
    /// questions toggle the option.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidSelection` unless the session is active,
    /// `question_id` is on screen and `option` belongs to it.
    pub fn select_answer(
        &mut self,
        question_id: QuestionId,
        option: OptionId,
    ) -> Result<&Selection, SessionError> {
        match self.state {
            SessionState::Active => {}
            SessionState::Submitted => return Err(SelectionIssue::Submitted.into()),
            SessionState::Selecting | SessionState::RulesDisplay => {
                return Err(SelectionIssue::NotActive.into());
            }
        }
        let question = self
            .current_question()
            .filter(|q| q.id() == question_id)
            .ok_or(SelectionIssue::NotCurrent(question_id))?;
        if !question.has_option(&option) {
            return Err(SelectionIssue::UnknownOption {
                question: question_id,
                option,
            }
            .into());
        }
        let kind = question.kind();
        let selection = self.answers.entry(question_id).or_default();
        selection.apply(kind, option);
        Ok(selection)
    }

    #[must_use]
    pub fn selection(&self, question_id: QuestionId) -> Option<&Selection> {
        self.answers.get(&question_id).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn answers(&self) -> &HashMap<QuestionId, Selection> {
        &self.answers
    }

    fn is_answered(&self, question_id: QuestionId) -> bool {
        self.selection(question_id).is_some()
    }

    // ─── navigation ────────────────────────────────────────────────────────

    fn ensure_navigable(&self, action: &'static str) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active | SessionState::Submitted => Ok(()),
            _ => Err(self.transition_error(action)),
        }
    }

    /// Move to the next question. Stays on the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` before the run has started.
    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.ensure_navigable("move to the next question")?;
        if self.cursor + 1 < self.questions.len() {
            self.cursor += 1;
        }
        Ok(self.cursor)
    }

    /// Move to the previous question. Stays on the first one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` before the run has started.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.ensure_navigable("move to the previous question")?;
        self.cursor = self.cursor.saturating_sub(1);
        Ok(self.cursor)
    }

    /// Jump to a zero-based question index.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOperation` for an index past the end.
    pub fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.ensure_navigable("jump to a question")?;
        if index >= self.questions.len() {
            return Err(OperationIssue::IndexOutOfRange {
                index,
                len: self.questions.len(),
            }
            .into());
        }
        self.cursor = index;
        Ok(self.cursor)
    }

    // ─── submit ────────────────────────────────────────────────────────────

    /// First phase of a manual submit: flag the request and report counts.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is active.
    pub fn request_submit(&mut self) -> Result<SubmitRequest, SessionError> {
        if self.state != SessionState::Active {
            return Err(self.transition_error("request submit"));
        }
        self.submit_pending = true;
        let answered = self.answered_count();
        Ok(SubmitRequest {
            answered,
            unanswered: self.questions.len() - answered,
            total: self.questions.len(),
        })
    }

    /// Withdraw a pending submit request. No-op when none is pending.
    pub fn cancel_submit(&mut self) {
        self.submit_pending = false;
    }

    /// Second phase of a manual submit.
    pub(crate) fn confirm_submit(&mut self, now: DateTime<Utc>) -> Result<&ExamResult, SessionError> {
        if self.state != SessionState::Active {
            return Err(self.transition_error("confirm submit"));
        }
        if !self.submit_pending {
            return Err(OperationIssue::NoPendingSubmit.into());
        }
        Ok(self.finalize(SubmissionKind::Manual, now))
    }

    /// Close the run immediately because no ticker could be started.
    pub(crate) fn force_submit(&mut self, now: DateTime<Utc>) -> Result<&ExamResult, SessionError> {
        if self.state != SessionState::Active {
            return Err(self.transition_error("force submit"));
        }
        Ok(self.finalize(SubmissionKind::ForcedTimerFailure, now))
    }

    /// Deliver one one-second tick.
    pub(crate) fn tick(&mut self, now: DateTime<Utc>) -> TickEffect {
        if self.state != SessionState::Active {
            return TickEffect::Ignored;
        }
        match self.timer.tick() {
            TickOutcome::Running => TickEffect::Running,
            TickOutcome::Expired => {
                self.finalize(SubmissionKind::TimeExpired, now);
                TickEffect::Finalized
            }
            TickOutcome::Ignored => TickEffect::Ignored,
        }
    }

    fn finalize(&mut self, submission: SubmissionKind, now: DateTime<Utc>) -> &ExamResult {
        self.cancel_ticks();
        let subject_order = self
            .profile
            .as_ref()
            .map(|p| p.subjects().to_vec())
            .unwrap_or_default();
        let result = ScoreAggregator::new(self.passing_score)
            .with_subject_order(&subject_order)
            .aggregate(
                &self.questions,
                &self.answers,
                self.timer.elapsed_seconds(),
                now,
                submission,
            );
        self.submit_pending = false;
        self.state = SessionState::Submitted;
        self.result.insert(result)
    }

    // ─── accessors ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn kind(&self) -> Option<SessionKind> {
        self.scope.as_ref().map(SessionScope::kind)
    }

    #[must_use]
    pub fn scope(&self) -> Option<&SessionScope> {
        self.scope.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&ExamProfile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn question_limit(&self) -> Option<u32> {
        self.question_limit
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    #[must_use]
    pub fn is_submit_pending(&self) -> bool {
        self.submit_pending
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn result(&self) -> Option<&ExamResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Submitted
    }

    #[must_use]
    pub fn has_ticker(&self) -> bool {
        self.ticks.as_ref().is_some_and(TickHandle::is_active)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| self.is_answered(q.id()))
            .count()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    // ─── views ─────────────────────────────────────────────────────────────

    /// Rules for the chosen scope, available from `RulesDisplay` on.
    #[must_use]
    pub fn rules(&self) -> Option<SessionRules> {
        let scope = self.scope.as_ref()?;
        let (title, duration_seconds, profile_id) = match (&self.profile, scope) {
            (Some(p), _) => (p.name().to_string(), p.duration_seconds(), Some(p.id())),
            (None, SessionScope::Review(_)) => ("Wrong question review".to_string(), 0, None),
            (None, _) => ("Practice".to_string(), 0, None),
        };
        Some(SessionRules {
            kind: scope.kind(),
            profile_id,
            title,
            duration_seconds,
            question_limit: self.question_limit,
            passing_score: self.passing_score,
        })
    }

    #[must_use]
    pub fn current_view(&self) -> Option<QuestionView> {
        let question = self.current_question()?;
        let selection = self.answers.get(&question.id());
        let revealed = self.is_complete();
        let options = question
            .options()
            .iter()
            .map(|o| OptionView {
                id: o.id().clone(),
                text: o.text().to_string(),
                selected: selection.is_some_and(|s| s.contains(o.id())),
                is_correct: revealed.then(|| o.is_correct()),
            })
            .collect();
        Some(QuestionView {
            question_id: question.id(),
            index: self.cursor,
            total: self.questions.len(),
            kind: question.kind(),
            content: question.content().to_string(),
            image: question.image().cloned(),
            options,
            answered: self.is_answered(question.id()),
            has_explanation: question.explanation().is_some(),
        })
    }

    #[must_use]
    pub fn time_display(&self) -> TimeDisplay {
        match self.timer.remaining_seconds() {
            Some(remaining) => TimeDisplay::Remaining(remaining),
            None => TimeDisplay::Elapsed(self.timer.elapsed_seconds()),
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.answered_count();
        SessionProgress {
            total: self.questions.len(),
            answered,
            unanswered: self.questions.len() - answered,
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn answer_sheet(&self) -> Vec<AnswerSheetItem> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, q)| AnswerSheetItem {
                index,
                question_id: q.id(),
                answered: self.is_answered(q.id()),
                is_current: index == self.cursor,
                is_correct: self
                    .result
                    .as_ref()
                    .and_then(|r| r.evaluation(q.id()))
                    .map(|e| e.is_correct),
            })
            .collect()
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("kind", &self.kind())
            .field("questions_len", &self.questions.len())
            .field("answers_len", &self.answers.len())
            .field("cursor", &self.cursor)
            .field("timer", &self.timer)
            .field("submit_pending", &self.submit_pending)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
