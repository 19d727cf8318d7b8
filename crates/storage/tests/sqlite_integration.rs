use chrono::Duration;
use exam_core::evaluator::Evaluation;
use exam_core::model::{
    EngineSettingsDraft, MasteredPolicy, OptionId, QuestionId, Selection, WrongQuestionRecord,
    WrongStatus,
};
use exam_core::time::fixed_now;
use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;

fn miss(id: u64, picked: &str) -> Evaluation {
    Evaluation {
        question_id: QuestionId::new(id),
        is_correct: false,
        selected: [OptionId::new(picked).unwrap()].into_iter().collect(),
        correct_ids: [OptionId::new("A").unwrap()].into_iter().collect(),
    }
}

#[tokio::test]
async fn sqlite_kv_upserts_and_reads_back() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // second run is a no-op
    repo.migrate().await.expect("migrate again");

    assert_eq!(repo.get("missing").await.unwrap(), None);
    repo.set("k", "one").await.unwrap();
    repo.set("k", "two").await.unwrap();
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("two"));
}

#[tokio::test]
async fn sqlite_persists_wrong_question_lifecycle() {
    let storage = Storage::sqlite("sqlite:file:memdb_wrong?mode=memory&cache=shared")
        .await
        .expect("storage");
    let store = storage.wrong_questions();

    let now = fixed_now();
    let mut record = WrongQuestionRecord::first_miss(&miss(4, "B"), now).unwrap();
    store.save(&record).await.unwrap();

    record.record_review(now + Duration::hours(1));
    record
        .record_miss(&miss(4, "C"), now + Duration::days(1), MasteredPolicy::Demote)
        .unwrap();
    store.save(&record).await.unwrap();

    let loaded = store.load_all().await.unwrap().records;
    assert_eq!(loaded.len(), 1);
    let back = &loaded[0];
    assert_eq!(back.status(), WrongStatus::Reviewed);
    assert_eq!(back.wrong_count(), 2);
    assert_eq!(back.review_count(), 1);
    assert_eq!(back.wrong_date(), now + Duration::days(1));
    let expected: Selection = [OptionId::new("C").unwrap()].into_iter().collect();
    assert_eq!(back.user_answer(), &expected);
}

#[tokio::test]
async fn sqlite_keeps_flags_and_settings() {
    let storage = Storage::sqlite("sqlite:file:memdb_flags?mode=memory&cache=shared")
        .await
        .expect("storage");

    let flags = storage.review_flags();
    assert!(!flags.is_reviewed("exam-3").await.unwrap());
    flags.mark_reviewed("exam-3").await.unwrap();
    assert!(flags.is_reviewed("exam-3").await.unwrap());

    let settings = EngineSettingsDraft {
        practice_passing_score: Some(75),
        ..EngineSettingsDraft::default()
    }
    .validate()
    .unwrap();
    storage.settings().save(&settings).await.unwrap();
    assert_eq!(storage.settings().load().await.unwrap(), Some(settings));
}
