use crate::engine::evaluator::EvaluationResult;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const ADD_ADSORBENT: &str = "add_adsorbent";
pub const TEST_MOLECULE_ON_ADSORBENT: &str = "test_molecule_on_adsorbent";

/// A tool the agent runtime may call, with a JSON schema for its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A tool call requested by the agent. `arguments` is a JSON object encoded as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// Arguments of [`TEST_MOLECULE_ON_ADSORBENT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMoleculeArgs {
    /// Chemical formula of the adsorbate, e.g. `CO2`.
    #[serde(alias = "molecule")]
    pub adsorbate: String,
    pub adsorbent_name: String,
}

/// What a tool hands back to the agent: a status line, the evaluation metrics, or an
/// error mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Message(String),
    Metrics(EvaluationResult),
    Error { error: String },
}

impl ToolOutput {
    pub fn error(message: impl Into<String>) -> Self {
        ToolOutput::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        match self {
            ToolOutput::Message(text) => text.starts_with("Error:"),
            ToolOutput::Metrics(_) => false,
            ToolOutput::Error { .. } => true,
        }
    }

    /// Text placed in the transcript: messages verbatim, mappings as JSON.
    pub fn to_content(&self) -> String {
        match self {
            ToolOutput::Message(text) => text.clone(),
            other => serde_json::to_string(other)
                .unwrap_or_else(|e| format!("{{\"error\": \"unserializable output: {}\"}}", e)),
        }
    }
}

const ADD_ADSORBENT_DESCRIPTION: &str = "\
Adds a new adsorbent definition to the material database under `name`.
The adsorbent is defined by a generator module whose function `create_adsorbent()` builds the structure:

    let a = 3.61
    fn create_adsorbent() {
        surface fcc111 Cu size=[3, 3, 3] a=a vacuum=10
    }

Commands: `atom <El> [x, y, z] [tag=surface]`, `cell [x, y, z]`, `pbc true true false`, \
`surface <fcc100|fcc111|bcc100|hcp0001> <El> size=[nx, ny, layers] a=<lattice constant> [c=<c>] [vacuum=<v>]`, \
`molecule \"<formula>\" at=[x, y, z]`, `repeat nx ny nz`, `translate [dx, dy, dz]`, `vacuum <v>`, \
`tag <subsurface|surface|adsorbate> [above=z] [below=z]`, and `let name = expr`.
Expressions support + - * /, parentheses, pi, sqrt, sin and cos (degrees).
Returns 'Success' or a message starting with 'Error:'.";

const TEST_MOLECULE_DESCRIPTION: &str = "\
Simulates the interaction of a given adsorbate molecule on the adsorbent.
The adsorbent is relaxed, the molecule is placed above its highest atom and the combined system is relaxed.
Returns a mapping with adsorbate_dissociated, adsorbate_desorbed, surface_changed, adsorbate_intercalated \
and relaxed_energy (eV), or a mapping with a single `error` key.";

/// Descriptions of the two search tools.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(ADD_ADSORBENT, ADD_ADSORBENT_DESCRIPTION).with_parameters(json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Name used to refer to this material"
                },
                "code": {
                    "type": "string",
                    "description": "Generator module defining `fn create_adsorbent()`"
                },
                "method_of_synthesis": {
                    "type": "string",
                    "description": "How the material could be synthesized"
                }
            },
            "required": ["name", "code", "method_of_synthesis"]
        })),
        ToolDefinition::new(TEST_MOLECULE_ON_ADSORBENT, TEST_MOLECULE_DESCRIPTION).with_parameters(
            json!({
                "type": "object",
                "properties": {
                    "adsorbate": {
                        "type": "string",
                        "description": "Chemical formula of the adsorbate, e.g. 'CO2'"
                    },
                    "adsorbent_name": {
                        "type": "string",
                        "description": "Name of a material in the database"
                    }
                },
                "required": ["adsorbate", "adsorbent_name"]
            }),
        ),
    ]
}
