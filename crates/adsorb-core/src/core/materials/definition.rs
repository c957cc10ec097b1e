use serde::{Deserialize, Serialize};

/// A named, source-defined candidate material as proposed by the search agent.
///
/// Field aliases accept the argument names used by the agent tool schema
/// (`code`, `method_of_synthesis`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDefinition {
    /// Unique key of the material within a registry.
    pub name: String,
    /// Generator-language source that must define `create_adsorbent`.
    #[serde(alias = "code")]
    pub source_code: String,
    /// Free-text note on how the material could be synthesized. Never interpreted.
    #[serde(alias = "method_of_synthesis", default)]
    pub synthesis_note: String,
}

impl MaterialDefinition {
    pub fn new(
        name: impl Into<String>,
        source_code: impl Into<String>,
        synthesis_note: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_code: source_code.into(),
            synthesis_note: synthesis_note.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tool_argument_names() {
        let definition: MaterialDefinition = serde_json::from_str(
            r#"{"name": "Cu", "code": "fn create_adsorbent() { atom Cu }", "method_of_synthesis": "sputtering"}"#,
        )
        .unwrap();
        assert_eq!(definition.name, "Cu");
        assert!(definition.source_code.starts_with("fn create_adsorbent"));
        assert_eq!(definition.synthesis_note, "sputtering");
    }

    #[test]
    fn synthesis_note_is_optional() {
        let definition: MaterialDefinition =
            serde_json::from_str(r#"{"name": "Cu", "source_code": "x"}"#).unwrap();
        assert_eq!(definition.synthesis_note, "");
    }
}
