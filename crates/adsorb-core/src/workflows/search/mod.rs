//! The agent-facing side of the adsorbent search.
//!
//! A [`SearchSession`] exposes the material registry and the relaxation evaluator as
//! two tools, `add_adsorbent` and `test_molecule_on_adsorbent`. An [`AgentRuntime`]
//! decides which tools to call, and [`run_search`] shuttles calls and results between
//! the two until the agent answers.

pub mod agent;
pub mod history;
pub mod session;
pub mod tools;
pub mod transcript;

pub use agent::{AgentError, AgentRuntime, AgentTurn, ScriptedAgent, SearchOutcome, run_search};
pub use history::{EvaluationRecord, write_history_csv};
pub use session::SearchSession;
pub use tools::{ToolCall, ToolDefinition, ToolOutput};
pub use transcript::{ChatMessage, Role};
