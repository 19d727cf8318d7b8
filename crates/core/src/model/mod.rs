mod exam;
mod ids;
mod media;
mod question;
mod score;
mod selection;
mod settings;
mod wrong_question;

pub use ids::{ExamProfileId, OptionId, ParseIdError, QuestionId, SessionId};
pub use media::{ImageRef, MediaValidationError};

pub use exam::{ExamProfile, ExamProfileDraft, ExamProfileError};
pub use question::{
    AnswerOption, AnswerOptionDraft, Difficulty, ParseDifficultyError, Question, QuestionDraft,
    QuestionError, QuestionKind,
};
pub use score::{ExamResult, SubjectScore, SubmissionKind};
pub use selection::Selection;
pub use settings::{EngineSettings, EngineSettingsDraft, EngineSettingsError, QuestionOrder};
pub use wrong_question::{MasteredPolicy, WrongQuestionError, WrongQuestionRecord, WrongStatus};
