//! Session behavior driven through the public API with a scripted agent

mod common;

use common::{temp_csv, ScriptedAgent, PEOPLE_CSV};
use tabletalk::agent::{AgentFault, AgentFaultKind};
use tabletalk::session::NO_STORE_MESSAGE;
use tabletalk::store::StoreSource;
use tabletalk::{Config, ConfigurationUpdate, Role, Session, TurnOutcome};

#[tokio::test]
async fn test_question_before_data_source_is_guarded() {
    let mut session = Session::new(&Config::default());
    let agent = ScriptedAgent::new(vec![]);

    let outcome = session.submit(&agent, "What is the average age?").await;

    assert_eq!(
        outcome,
        TurnOutcome::NoActiveStore(NO_STORE_MESSAGE.to_string())
    );
    assert_eq!(agent.calls(), 0);
    assert!(session
        .conversation()
        .all()
        .iter()
        .all(|turn| turn.role() == Role::Assistant));
}

#[tokio::test]
async fn test_log_is_append_only_in_submission_order() {
    let (_dir, csv) = temp_csv("people.csv", PEOPLE_CSV);
    let mut session = Session::new(&Config::default());
    session.ingest_file(&csv).unwrap();
    let agent = ScriptedAgent::new(vec![Ok("a1".to_string()), Ok("a2".to_string())]);

    session.submit(&agent, "q1").await;
    session.submit(&agent, "q2").await;

    let contents: Vec<&str> = session
        .conversation()
        .all()
        .iter()
        .skip(1)
        .map(|turn| turn.content())
        .collect();
    assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
}

#[tokio::test]
async fn test_agent_sees_bounded_window_while_log_keeps_everything() {
    let mut session = Session::new(&Config::default());
    session.connect("sqlite://").await.unwrap();
    let agent = ScriptedAgent::new(vec![]);

    for i in 0..12 {
        session.submit(&agent, &format!("question {}", i)).await;
    }

    assert_eq!(session.conversation().len(), 25);
    let last = agent.last();
    assert_eq!(last.question, "question 11");
    assert_eq!(last.history.len(), 10);
    assert_eq!(last.history.first().unwrap(), "question 6");
    assert_eq!(last.history.last().unwrap(), "ok");
}

#[tokio::test]
async fn test_configured_window_size_is_respected() {
    let mut config = Config::default();
    config.agent.history_window = 2;
    let mut session = Session::new(&config);
    session.connect("sqlite://").await.unwrap();
    let agent = ScriptedAgent::new(vec![]);

    for i in 0..3 {
        session.submit(&agent, &format!("q{}", i)).await;
    }

    assert_eq!(agent.last().history, vec!["q1", "ok"]);
}

#[tokio::test]
async fn test_agent_answers_from_latest_store() {
    let (_dir_a, first) = temp_csv("first.csv", "x\n1\n");
    let mut session = Session::new(&Config::default());
    let agent = ScriptedAgent::new(vec![]);

    session.ingest_file(&first).unwrap();
    session.connect("sqlite://").await.unwrap();
    session.submit(&agent, "what tables?").await;

    assert!(agent.last().tables.is_empty());
    assert!(matches!(
        session.store_source(),
        Some(StoreSource::Connected { .. })
    ));
}

#[tokio::test]
async fn test_fault_is_recoverable() {
    let mut session = Session::new(&Config::default());
    session.connect("sqlite://").await.unwrap();
    let agent = ScriptedAgent::new(vec![
        Err(AgentFault::new(AgentFaultKind::RateLimited, "429")),
        Ok("second try worked".to_string()),
    ]);

    let first = session.submit(&agent, "hello?").await;
    assert!(matches!(first, TurnOutcome::Faulted(ref f) if f.kind == AgentFaultKind::RateLimited));

    let second = session.submit(&agent, "hello?").await;
    assert_eq!(second, TurnOutcome::Answered("second try worked".to_string()));

    let roles: Vec<Role> = session
        .conversation()
        .all()
        .iter()
        .map(|turn| turn.role())
        .collect();
    assert_eq!(
        roles,
        vec![Role::Assistant, Role::User, Role::User, Role::Assistant]
    );
}

#[tokio::test]
async fn test_upload_wins_over_descriptor_in_one_update() {
    let (_dir, csv) = temp_csv("people.csv", PEOPLE_CSV);
    let mut session = Session::new(&Config::default());

    session
        .apply_configuration(&ConfigurationUpdate {
            csv: Some(csv),
            connection: Some("sqlite://".to_string()),
        })
        .await
        .unwrap();

    match session.store_source() {
        Some(StoreSource::Ephemeral { file_name, table, .. }) => {
            assert_eq!(file_name, "people.csv");
            assert_eq!(table, "uploaded_data");
        }
        other => panic!("expected uploaded store, got {:?}", other),
    }
}

#[tokio::test]
async fn test_descriptor_used_when_no_file() {
    let mut session = Session::new(&Config::default());
    session
        .apply_configuration(&ConfigurationUpdate {
            csv: None,
            connection: Some("sqlite:///:memory:".to_string()),
        })
        .await
        .unwrap();
    assert!(matches!(
        session.store_source(),
        Some(StoreSource::Connected { .. })
    ));
}

#[tokio::test]
async fn test_failed_upload_in_update_keeps_previous_store() {
    let (_dir, bad) = temp_csv("bad.csv", "a,b\n1,2,3\n");
    let mut session = Session::new(&Config::default());
    session.connect("sqlite://").await.unwrap();

    let result = session
        .apply_configuration(&ConfigurationUpdate {
            csv: Some(bad),
            connection: None,
        })
        .await;

    assert!(result.is_err());
    assert!(matches!(
        session.store_source(),
        Some(StoreSource::Connected { .. })
    ));
}

#[test]
fn test_sessions_are_isolated() {
    let (_dir, csv) = temp_csv("people.csv", PEOPLE_CSV);
    let mut first = Session::new(&Config::default());
    let second = Session::new(&Config::default());

    first.ingest_file(&csv).unwrap();

    assert!(first.store().is_some());
    assert!(second.store().is_none());
    assert_ne!(first.id(), second.id());
}
