//! Question bank documents on disk.

use std::path::Path;

use exam_core::BankDraft;

use crate::repository::StorageError;

/// Parse a bank document (`{"questions": [...], "profiles": [...]}`).
///
/// Only the JSON shape is checked here; record validation happens in
/// `QuestionBank::load`.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON.
pub fn parse_bank_json(raw: &str) -> Result<BankDraft, StorageError> {
    serde_json::from_str(raw).map_err(|err| StorageError::Serialization(err.to_string()))
}

/// Read and parse a bank document from `path`.
///
/// # Errors
///
/// Returns `StorageError::Io` if the file cannot be read, or
/// `StorageError::Serialization` if it is not a bank document.
pub fn read_bank_file(path: impl AsRef<Path>) -> Result<BankDraft, StorageError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|err| StorageError::Io(format!("{}: {err}", path.display())))?;
    parse_bank_json(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::QuestionBank;

    const DOC: &str = r#"{
        "questions": [
            {
                "id": 1,
                "kind": "single",
                "content": "Maximum altitude in the open category?",
                "options": [
                    {"id": "A", "text": "120 m", "isCorrect": true},
                    {"id": "B", "text": "150 m"}
                ],
                "subject": "regulations",
                "difficulty": "easy"
            }
        ],
        "profiles": [
            {"id": 7, "durationSeconds": 1800, "totalQuestions": 1, "passingScore": 70}
        ]
    }"#;

    #[test]
    fn parses_camel_case_document() {
        let draft = parse_bank_json(DOC).unwrap();
        assert_eq!(draft.questions.len(), 1);
        assert_eq!(draft.questions[0].score_weight, 1);
        let bank = QuestionBank::load(draft).unwrap();
        assert_eq!(bank.profiles().len(), 1);
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            parse_bank_json("[1, 2").unwrap_err(),
            StorageError::Serialization(_)
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            read_bank_file("/definitely/not/here.json").unwrap_err(),
            StorageError::Io(_)
        ));
    }
}
