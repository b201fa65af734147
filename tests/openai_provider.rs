//! OpenAI-compatible provider and SQL agent against a mock completions API

mod common;

use common::{text_completion, tool_call_completion, PEOPLE_CSV};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tabletalk::agent::{AgentRequest, AnsweringAgent, SqlAgent};
use tabletalk::config::{IngestConfig, OpenAiConfig};
use tabletalk::credential::Credential;
use tabletalk::providers::{Message, OpenAiProvider, Provider};
use tabletalk::store::TabularIngestor;
use tabletalk::{AgentFaultKind, ChatTurn, Config, DataStoreHandle};

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.provider.openai.api_base = Some(server.uri());
    config
}

fn people() -> DataStoreHandle {
    TabularIngestor::new(&IngestConfig::default())
        .ingest_reader(PEOPLE_CSV.as_bytes(), "people.csv")
        .unwrap()
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_provider_sends_bearer_and_parses_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(
        OpenAiConfig {
            api_base: Some(server.uri()),
            ..Default::default()
        },
        Credential::new("sk-test").unwrap(),
    )
    .unwrap();

    let response = provider
        .complete(&[Message::user("hello")], &[])
        .await
        .unwrap();

    assert_eq!(response.message.content.as_deref(), Some("hi there"));
    let usage = response.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 160);
    assert_eq!(usage.completion_tokens, 12);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["model"], "gpt-4o-mini");
    assert!(bodies[0].get("tools").is_none());
}

#[tokio::test]
async fn test_agent_runs_query_tool_then_answers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_completion(
            "call_1",
            "run_query",
            json!({"query": "SELECT AVG(age) FROM uploaded_data"}),
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_completion("The average age is about 54.")),
        )
        .mount(&server)
        .await;

    let store = people();
    let credential = Credential::new("sk-test").unwrap();
    let history = vec![
        ChatTurn::user("Which columns are there?"),
        ChatTurn::assistant("name and age"),
    ];
    let answer = SqlAgent::new(config_for(&server))
        .answer(AgentRequest {
            question: "What is the average age?",
            history: &history,
            store: &store,
            credential: Some(&credential),
        })
        .await
        .unwrap();

    assert_eq!(answer, "The average age is about 54.");

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 2);

    let first = bodies[0]["messages"].as_array().unwrap();
    assert_eq!(first[0]["role"], "system");
    assert!(first[0]["content"]
        .as_str()
        .unwrap()
        .contains("kind and friendly"));
    assert_eq!(first[1]["content"], "Which columns are there?");
    assert_eq!(first[2]["content"], "name and age");
    assert_eq!(first.last().unwrap()["content"], "What is the average age?");

    let tool_names: Vec<&str> = bodies[0]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["function"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(tool_names, vec!["describe_tables", "list_tables", "run_query"]);

    let second = bodies[1]["messages"].as_array().unwrap();
    let tool_message = second.last().unwrap();
    assert_eq!(tool_message["role"], "tool");
    assert_eq!(tool_message["tool_call_id"], "call_1");
    assert!(tool_message["content"].as_str().unwrap().contains("54"));
    assert_eq!(second[second.len() - 2]["role"], "assistant");
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_fault() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let store = people();
    let credential = Credential::new("sk-bad").unwrap();
    let fault = SqlAgent::new(config_for(&server))
        .answer(AgentRequest {
            question: "How many people?",
            history: &[],
            store: &store,
            credential: Some(&credential),
        })
        .await
        .unwrap_err();

    assert_eq!(fault.kind, AgentFaultKind::Authentication);
}

#[tokio::test]
async fn test_throttled_maps_to_rate_limited_fault() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(1)
        .mount(&server)
        .await;

    let store = people();
    let credential = Credential::new("sk-test").unwrap();
    let fault = SqlAgent::new(config_for(&server))
        .answer(AgentRequest {
            question: "How many people?",
            history: &[],
            store: &store,
            credential: Some(&credential),
        })
        .await
        .unwrap_err();

    assert_eq!(fault.kind, AgentFaultKind::RateLimited);
}

#[tokio::test]
async fn test_endless_tool_calls_hit_iteration_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tool_call_completion(
            "call_loop",
            "list_tables",
            json!({}),
        )))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.agent.max_turns = 3;
    let store = people();
    let credential = Credential::new("sk-test").unwrap();
    let fault = SqlAgent::new(config)
        .answer(AgentRequest {
            question: "Loop forever",
            history: &[],
            store: &store,
            credential: Some(&credential),
        })
        .await
        .unwrap_err();

    assert_eq!(fault.kind, AgentFaultKind::IterationLimit);
    assert_eq!(request_bodies(&server).await.len(), 3);
}
