//! Key layout inside the key-value store.

use exam_core::model::QuestionId;

pub const WRONG_QUESTION_INDEX: &str = "wrong_question:index";
pub const ENGINE_SETTINGS: &str = "settings:engine";

#[must_use]
pub fn wrong_question(id: QuestionId) -> String {
    format!("wrong_question:{id}")
}

#[must_use]
pub fn reviewed_set(set_key: &str) -> String {
    format!("reviewed_set:{}", set_key.trim())
}
