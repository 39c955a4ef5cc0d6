//! On-disk behaviour of the store.

use stackexchange::epoch;
use store::{ChatLink, QuestionRecord, Store, UpsertOutcome};

fn question(id: i64, created: i64) -> QuestionRecord {
    QuestionRecord {
        id,
        title: format!("question {id}"),
        creation_date: epoch(created),
        last_activity_date: epoch(created),
        link: format!("https://stackoverflow.com/q/{id}"),
        site: "stackoverflow".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slackoverflow.db3");

    {
        let store = Store::open(&path).unwrap();
        store.upsert_question(&question(1, 100)).unwrap();
        store
            .create_chat_link(&ChatLink {
                question_id: 1,
                channel: "C1".to_string(),
                ts: "1.0001".to_string(),
            })
            .unwrap();
    }

    let store = Store::open(&path).unwrap();
    assert_eq!(store.question_count().unwrap(), 1);
    assert_eq!(store.find_chat_link(1).unwrap().unwrap().channel, "C1");
    assert_eq!(
        store.upsert_question(&question(1, 100)).unwrap(),
        UpsertOutcome::Unchanged
    );
}

#[test]
fn test_open_fails_on_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Store::open(dir.path()).is_err());
}
