use super::session::SearchSession;
use super::tools::{ToolCall, ToolDefinition};
use super::transcript::ChatMessage;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const SYSTEM_PROMPT: &str = "\
You're a world-class material engineer, machine learning researcher, and physicist.
You are searching for an adsorbent material which works well for the user's goal.
Design materials by writing a generator module whose `create_adsorbent()` function builds the structure.
Test the usefulness of these materials against molecules of your choosing.
Use the results of your experiments to generate ever better materials.
Stop when you think you've produced the best possible material or after 10 materials.
For your final output, return the name of the best material and a summary of your discoveries.
The materials should be as inexpensive and easy to synthesize as possible.
Do not ask the user if they want to search for a material; of course they do.
";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to read agent script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid agent script: {0}")]
    Script(#[from] serde_json::Error),
    #[error("Agent script ran out of turns without a final output")]
    ScriptExhausted,
    #[error("Agent runtime failed: {0}")]
    Runtime(String),
}

/// What the agent decided to do on one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentTurn {
    /// Call tools, optionally with some accompanying text.
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    /// Finish the search with this answer.
    Final(String),
}

/// The model side of a search: given the conversation so far, decide the next turn.
pub trait AgentRuntime {
    fn next_turn(
        &mut self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<AgentTurn, AgentError>;
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptedCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptedTurn {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ScriptedCall>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Script {
    #[serde(default)]
    turns: Vec<ScriptedTurn>,
    #[serde(default)]
    final_output: Option<String>,
}

/// Replays a fixed JSON script of turns, ignoring tool results.
///
/// ```json
/// {
///   "turns": [
///     { "content": "Trying copper.",
///       "tool_calls": [{ "name": "add_adsorbent",
///                        "arguments": { "name": "Cu", "code": "...", "method_of_synthesis": "..." } }] }
///   ],
///   "final_output": "Cu is the best material."
/// }
/// ```
///
/// A turn without tool calls ends the search with its content.
#[derive(Debug, Clone)]
pub struct ScriptedAgent {
    turns: std::vec::IntoIter<ScriptedTurn>,
    final_output: Option<String>,
    issued: usize,
}

impl ScriptedAgent {
    pub fn from_json(json: &str) -> Result<Self, AgentError> {
        let script: Script = serde_json::from_str(json)?;
        Ok(Self {
            turns: script.turns.into_iter(),
            final_output: script.final_output,
            issued: 0,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, AgentError> {
        let json = fs::read_to_string(path).map_err(|source| AgentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

impl AgentRuntime for ScriptedAgent {
    fn next_turn(
        &mut self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<AgentTurn, AgentError> {
        let Some(turn) = self.turns.next() else {
            return self
                .final_output
                .take()
                .map(AgentTurn::Final)
                .ok_or(AgentError::ScriptExhausted);
        };
        if turn.tool_calls.is_empty() {
            return Ok(AgentTurn::Final(turn.content.unwrap_or_default()));
        }
        let calls = turn
            .tool_calls
            .into_iter()
            .map(|call| {
                let id = format!("call_{}", self.issued);
                self.issued += 1;
                ToolCall::new(id, call.name, call.arguments.to_string())
            })
            .collect();
        Ok(AgentTurn::ToolCalls {
            content: turn.content,
            calls,
        })
    }
}

/// Transcript and answer of a finished search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub messages: Vec<ChatMessage>,
    /// `None` when the turn limit was reached before the agent answered.
    pub output: Option<String>,
    pub turns: usize,
}

/// Drives the conversation between `runtime` and the tools of `session` until the
/// agent gives a final answer or `max_turns` turns have passed.
#[instrument(skip_all, fields(max_turns = max_turns))]
pub fn run_search(
    goal: &str,
    session: &mut SearchSession,
    runtime: &mut dyn AgentRuntime,
    max_turns: usize,
) -> Result<SearchOutcome, AgentError> {
    let tools = session.tool_definitions();
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(goal)];

    for turn in 0..max_turns {
        match runtime.next_turn(&messages, &tools)? {
            AgentTurn::Final(output) => {
                info!(turns = turn + 1, "Search finished");
                messages.push(ChatMessage::assistant(output.clone()));
                return Ok(SearchOutcome {
                    messages,
                    output: Some(output),
                    turns: turn + 1,
                });
            }
            AgentTurn::ToolCalls { content, calls } => {
                messages.push(ChatMessage::assistant_tool_calls(content, calls.clone()));
                for call in &calls {
                    debug!(tool = %call.name, id = %call.id, "Dispatching tool call");
                    let output = session.dispatch(call);
                    messages.push(ChatMessage::tool_result(call.id.clone(), output.to_content()));
                }
            }
        }
    }

    warn!(max_turns, "Turn limit reached before the agent produced a final output");
    Ok(SearchOutcome {
        messages,
        output: None,
        turns: max_turns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::RelaxationConfig;
    use crate::workflows::search::transcript::Role;
    use tempfile::tempdir;

    const SCRIPT: &str = r#"{
        "turns": [
            {
                "content": "Trying a single copper atom.",
                "tool_calls": [
                    {
                        "name": "add_adsorbent",
                        "arguments": {
                            "name": "Cu1",
                            "code": "fn create_adsorbent() { atom Cu [0, 0, 0] }",
                            "method_of_synthesis": "atomic layer deposition"
                        }
                    },
                    {
                        "name": "test_molecule_on_adsorbent",
                        "arguments": { "adsorbate": "CO2", "adsorbent_name": "Cu1" }
                    },
                    {
                        "name": "test_molecule_on_adsorbent",
                        "arguments": { "adsorbate": "CO2", "adsorbent_name": "Missing" }
                    }
                ]
            }
        ],
        "final_output": "Cu1 is the only material tested."
    }"#;

    fn session() -> (tempfile::TempDir, SearchSession) {
        let dir = tempdir().unwrap();
        let config = RelaxationConfig::builder()
            .cache_dir(dir.path().to_path_buf())
            .max_steps(20)
            .build()
            .unwrap();
        (dir, SearchSession::new(config))
    }

    #[test]
    fn scripted_search_produces_full_transcript() {
        let (_dir, mut session) = session();
        let mut agent = ScriptedAgent::from_json(SCRIPT).unwrap();
        let outcome = run_search("Capture CO2 cheaply", &mut session, &mut agent, 10).unwrap();

        assert_eq!(outcome.output.as_deref(), Some("Cu1 is the only material tested."));
        assert_eq!(outcome.turns, 2);
        let roles: Vec<_> = outcome.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Tool,
                Role::Tool,
                Role::Assistant,
            ]
        );
        assert_eq!(outcome.messages[3].content.as_deref(), Some("Success"));
        assert!(outcome.messages[4].content.as_deref().unwrap().contains("relaxed_energy"));
        assert_eq!(
            outcome.messages[5].content.as_deref(),
            Some(r#"{"error":"Adsorbent not found: Missing"}"#)
        );
        assert_eq!(outcome.messages[5].tool_call_id.as_deref(), Some("call_2"));
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn turn_limit_ends_without_output() {
        let (_dir, mut session) = session();
        let mut agent = ScriptedAgent::from_json(SCRIPT).unwrap();
        let outcome = run_search("goal", &mut session, &mut agent, 1).unwrap();
        assert_eq!(outcome.output, None);
        assert_eq!(outcome.turns, 1);
    }

    #[test]
    fn exhausted_script_is_an_error() {
        let (_dir, mut session) = session();
        let mut agent = ScriptedAgent::from_json(r#"{"turns": []}"#).unwrap();
        assert!(matches!(
            run_search("goal", &mut session, &mut agent, 5),
            Err(AgentError::ScriptExhausted)
        ));
    }

    #[test]
    fn turn_without_tool_calls_is_final() {
        let (_dir, mut session) = session();
        let mut agent =
            ScriptedAgent::from_json(r#"{"turns": [{"content": "Nothing to do."}]}"#).unwrap();
        let outcome = run_search("goal", &mut session, &mut agent, 5).unwrap();
        assert_eq!(outcome.output.as_deref(), Some("Nothing to do."));
    }

    #[test]
    fn unknown_script_fields_are_rejected() {
        assert!(matches!(
            ScriptedAgent::from_json(r#"{"steps": []}"#),
            Err(AgentError::Script(_))
        ));
    }
}
