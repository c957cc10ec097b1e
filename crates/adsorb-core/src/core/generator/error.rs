use std::fmt;
use thiserror::Error;

/// The kind of module-level symbol a lookup asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Constant,
    Generator,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Constant => write!(f, "constant"),
            SymbolKind::Generator => write!(f, "generator"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeneratorError {
    #[error("Compilation error at line {line}, column {column}: {message}")]
    Compilation {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("No {kind} named '{name}' is defined in the module")]
    DefinitionNotFound { kind: SymbolKind, name: String },

    #[error("Module defines no structure generators")]
    NoGenerators,

    #[error("Runtime error at line {line}: {message}")]
    Runtime { line: usize, message: String },
}

impl GeneratorError {
    pub(crate) fn compilation(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Compilation {
            line,
            column,
            message: message.into(),
        }
    }

    pub(crate) fn runtime(line: usize, message: impl Into<String>) -> Self {
        Self::Runtime {
            line,
            message: message.into(),
        }
    }
}
