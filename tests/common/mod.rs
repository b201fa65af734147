use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;
use tabletalk::agent::{AgentFault, AgentRequest, AnsweringAgent};

#[allow(dead_code)]
pub const PEOPLE_CSV: &str = "name,age\nada,36\nalan,41\ngrace,85\n";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn temp_csv(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let csv_path = temp_dir.path().join(name);
    fs::write(&csv_path, contents).expect("failed to write csv file");
    (temp_dir, csv_path)
}

/// What a scripted agent saw on one call
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub question: String,
    pub history: Vec<String>,
    pub tables: Vec<String>,
}

/// Agent that replies from a script and records its requests
#[allow(dead_code)]
pub struct ScriptedAgent {
    replies: Mutex<Vec<Result<String, AgentFault>>>,
    pub seen: Mutex<Vec<SeenRequest>>,
}

#[allow(dead_code)]
impl ScriptedAgent {
    pub fn new(replies: Vec<Result<String, AgentFault>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last(&self) -> SeenRequest {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl AnsweringAgent for ScriptedAgent {
    async fn answer(&self, request: AgentRequest<'_>) -> Result<String, AgentFault> {
        let tables = request
            .store
            .database()
            .table_names()
            .await
            .unwrap_or_default();
        self.seen.lock().unwrap().push(SeenRequest {
            question: request.question.to_string(),
            history: request
                .history
                .iter()
                .map(|turn| turn.content().to_string())
                .collect(),
            tables,
        });
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }
}

/// Chat completion body carrying a single tool call
#[allow(dead_code)]
pub fn tool_call_completion(id: &str, name: &str, arguments: Value) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments.to_string()}
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 120, "completion_tokens": 20, "total_tokens": 140}
    })
}

/// Chat completion body carrying a final answer
#[allow(dead_code)]
pub fn text_completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-2",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 160, "completion_tokens": 12, "total_tokens": 172}
    })
}
