use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::evaluator::evaluate;
use crate::model::{ExamResult, Question, QuestionId, Selection, SubjectScore, SubmissionKind};

/// `round(100 * part / whole)` with halves rounded up; `0` when `whole` is zero.
#[must_use]
pub fn rounded_percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    let scaled = (200 * part + whole) / (2 * whole);
    u32::try_from(scaled.min(100)).unwrap_or(100)
}

#[derive(Default)]
struct SubjectTally {
    correct_weight: u64,
    total_weight: u64,
    questions: u32,
    correct: u32,
}

/// Computes per-subject and overall weighted scores for a finished run.
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    passing_score: u32,
    subject_order: Vec<String>,
}

impl ScoreAggregator {
    #[must_use]
    pub fn new(passing_score: u32) -> Self {
        Self {
            passing_score,
            subject_order: Vec::new(),
        }
    }

    /// Subjects listed here are reported first, in this order. Remaining
    /// subjects follow in order of first appearance.
    #[must_use]
    pub fn with_subject_order(mut self, subjects: &[String]) -> Self {
        self.subject_order = subjects.to_vec();
        self
    }

    /// Evaluate every question once and fold the evaluations into a result.
    ///
    /// Questions with no entry in `answers` are scored as incorrect.
    #[must_use]
    pub fn aggregate(
        &self,
        questions: &[Question],
        answers: &HashMap<QuestionId, Selection>,
        time_used_seconds: u32,
        submitted_at: DateTime<Utc>,
        submission: SubmissionKind,
    ) -> ExamResult {
        let empty = Selection::new();
        let mut tallies: HashMap<&str, SubjectTally> = HashMap::new();
        let mut appearance: Vec<&str> = Vec::new();
        let mut evaluations = Vec::with_capacity(questions.len());
        let mut wrong_questions = Vec::new();
        let mut answered = 0_u32;

        for question in questions {
            let selected = answers.get(&question.id()).unwrap_or(&empty);
            let evaluation = evaluate(question, selected);
            if !evaluation.is_unanswered() {
                answered = answered.saturating_add(1);
            }

            let subject = question.subject();
            let tally = tallies.entry(subject).or_insert_with(|| {
                appearance.push(subject);
                SubjectTally::default()
            });
            let weight = u64::from(question.score_weight());
            tally.total_weight += weight;
            tally.questions = tally.questions.saturating_add(1);
            if evaluation.is_correct {
                tally.correct_weight += weight;
                tally.correct = tally.correct.saturating_add(1);
            } else {
                wrong_questions.push(question.id());
            }
            evaluations.push(evaluation);
        }

        let mut ordered: Vec<&str> = self
            .subject_order
            .iter()
            .map(String::as_str)
            .filter(|s| tallies.contains_key(s))
            .collect();
        for subject in appearance {
            if !ordered.contains(&subject) {
                ordered.push(subject);
            }
        }

        let mut correct_total = 0_u64;
        let mut weight_total = 0_u64;
        let subject_scores = ordered
            .into_iter()
            .filter_map(|subject| {
                let tally = tallies.get(subject)?;
                correct_total += tally.correct_weight;
                weight_total += tally.total_weight;
                Some(SubjectScore {
                    subject: subject.to_string(),
                    correct_weight_sum: tally.correct_weight,
                    total_weight_sum: tally.total_weight,
                    question_count: tally.questions,
                    correct_count: tally.correct,
                    percentage: rounded_percentage(tally.correct_weight, tally.total_weight),
                })
            })
            .collect();

        let overall_percentage = rounded_percentage(correct_total, weight_total);

        ExamResult {
            overall_percentage,
            passed: overall_percentage >= self.passing_score,
            passing_score: self.passing_score,
            subject_scores,
            wrong_questions,
            evaluations,
            answered_count: answered,
            time_used_seconds,
            submitted_at,
            submission,
        }
    }
}
