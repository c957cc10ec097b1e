use super::definition::MaterialDefinition;
use crate::core::generator::{self, GeneratorError};
use crate::core::models::structure::AtomicStructure;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Name of the generator every material definition must provide.
pub const ENTRY_POINT: &str = "create_adsorbent";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Failed to compile definition '{name}': {source}")]
    Compilation {
        name: String,
        source: GeneratorError,
    },

    #[error("Definition '{name}' does not define '{entry_point}'")]
    DefinitionNotFound {
        name: String,
        entry_point: &'static str,
    },

    #[error("Definition '{name}' did not produce a valid structure: {reason}")]
    InvalidStructure { name: String, reason: String },

    #[error("Adsorbent not found: {0}")]
    NotFound(String),
}

/// A definition together with the structure its entry point produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredMaterial {
    pub definition: MaterialDefinition,
    pub structure: AtomicStructure,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReceipt {
    pub name: String,
    /// `true` when an existing entry with the same name was overwritten.
    pub replaced: bool,
    pub atom_count: usize,
    pub formula: String,
}

/// Session-scoped map from material name to validated material.
///
/// Registration is all-or-nothing: a definition that fails to compile, lacks the
/// entry point, fails while running, or yields an unusable structure leaves the
/// registry exactly as it was. Re-registering a name replaces the previous entry.
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: HashMap<String, RegisteredMaterial>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        definition: MaterialDefinition,
    ) -> Result<RegistrationReceipt, RegistryError> {
        let structure = build_structure(&definition)?;

        let receipt = RegistrationReceipt {
            name: definition.name.clone(),
            replaced: self.materials.contains_key(&definition.name),
            atom_count: structure.len(),
            formula: structure.chemical_formula(),
        };
        if receipt.replaced {
            info!(name = %receipt.name, "Replacing previously registered material");
        } else {
            debug!(name = %receipt.name, formula = %receipt.formula, "Registered material");
        }

        self.materials.insert(
            definition.name.clone(),
            RegisteredMaterial {
                definition,
                structure,
            },
        );
        Ok(receipt)
    }

    /// Returns an independent copy of the registered structure.
    pub fn lookup(&self, name: &str) -> Result<AtomicStructure, RegistryError> {
        self.materials
            .get(name)
            .map(|material| material.structure.clone())
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn definition(&self, name: &str) -> Option<&MaterialDefinition> {
        self.materials.get(name).map(|material| &material.definition)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }

    /// Registered names in lexicographic order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.materials.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Compiles a definition, runs its entry point and validates the result without
/// touching any registry.
pub fn build_structure(definition: &MaterialDefinition) -> Result<AtomicStructure, RegistryError> {
    let name = definition.name.clone();
    let module = generator::compile(&definition.source_code).map_err(|source| {
        RegistryError::Compilation {
            name: name.clone(),
            source,
        }
    })?;

    let entry = module.generator(ENTRY_POINT).map_err(|_| RegistryError::DefinitionNotFound {
        name: name.clone(),
        entry_point: ENTRY_POINT,
    })?;

    let structure = entry.invoke().map_err(|e| RegistryError::InvalidStructure {
        name: name.clone(),
        reason: e.to_string(),
    })?;

    structure
        .validate()
        .map_err(|e| RegistryError::InvalidStructure {
            name,
            reason: e.to_string(),
        })?;
    Ok(structure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::generator::compile;

    fn definition(name: &str, source: &str) -> MaterialDefinition {
        MaterialDefinition::new(name, source, "")
    }

    const SINGLE_COPPER: &str = "fn create_adsorbent() { atom Cu [0, 0, 0] }";
    const COPPER_SLAB: &str =
        "fn create_adsorbent() { surface fcc100 Cu size=[2, 2, 2] a=3.61 vacuum=10 }";

    #[test]
    fn register_then_lookup_matches_direct_invocation() {
        let mut registry = MaterialRegistry::new();
        let receipt = registry.register(definition("slab", COPPER_SLAB)).unwrap();
        assert_eq!(receipt.atom_count, 8);
        assert_eq!(receipt.formula, "Cu8");
        assert!(!receipt.replaced);

        let direct = compile(COPPER_SLAB)
            .unwrap()
            .generator(ENTRY_POINT)
            .unwrap()
            .invoke()
            .unwrap();
        assert_eq!(registry.lookup("slab").unwrap(), direct);
    }

    #[test]
    fn lookup_returns_independent_copies() {
        let mut registry = MaterialRegistry::new();
        registry.register(definition("cu", SINGLE_COPPER)).unwrap();
        let mut first = registry.lookup("cu").unwrap();
        first.translate(&nalgebra::Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(
            registry.lookup("cu").unwrap().atoms()[0].position,
            nalgebra::Point3::origin()
        );
    }

    #[test]
    fn last_write_wins() {
        let mut registry = MaterialRegistry::new();
        registry.register(definition("m", SINGLE_COPPER)).unwrap();
        let receipt = registry.register(definition("m", COPPER_SLAB)).unwrap();
        assert!(receipt.replaced);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("m").unwrap().len(), 8);
        assert_eq!(registry.definition("m").unwrap().source_code, COPPER_SLAB);
    }

    #[test]
    fn failures_leave_the_registry_unchanged() {
        let mut registry = MaterialRegistry::new();
        registry.register(definition("m", SINGLE_COPPER)).unwrap();

        let cases = [
            ("fn create_adsorbent( {", "compile"),
            ("fn other() { atom Cu }", "entry point"),
            ("fn create_adsorbent() { atom Zz }", "runtime"),
            ("fn create_adsorbent() { let a = 1 }", "empty"),
        ];
        for (source, _) in cases {
            assert!(registry.register(definition("m", source)).is_err());
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("m").unwrap().len(), 1);
    }

    #[test]
    fn errors_are_classified() {
        let mut registry = MaterialRegistry::new();
        assert!(matches!(
            registry.register(definition("x", "fn create_adsorbent( {")),
            Err(RegistryError::Compilation { .. })
        ));
        assert!(matches!(
            registry.register(definition("x", "let a = 1")),
            Err(RegistryError::DefinitionNotFound { .. })
        ));
        assert!(matches!(
            registry.register(definition("x", "fn create_adsorbent() { atom Zz }")),
            Err(RegistryError::InvalidStructure { .. })
        ));
        assert!(matches!(
            registry.register(definition("x", "fn create_adsorbent() { }")),
            Err(RegistryError::InvalidStructure { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn needle_thin_periodic_cell_is_rejected() {
        let mut registry = MaterialRegistry::new();
        let source = "fn create_adsorbent() { cell 0.000001 0.000001 10; pbc true; atom Cu [0, 0, 0] }";
        let error = registry.register(definition("needle", source)).unwrap_err();
        assert!(
            matches!(error, RegistryError::InvalidStructure { ref reason, .. } if reason.contains("thick along axis 0")),
            "{}",
            error
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn lookup_of_unknown_name_fails() {
        let registry = MaterialRegistry::new();
        let error = registry.lookup("missing").unwrap_err();
        assert_eq!(error, RegistryError::NotFound("missing".into()));
        assert_eq!(error.to_string(), "Adsorbent not found: missing");
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = MaterialRegistry::new();
        registry.register(definition("b", SINGLE_COPPER)).unwrap();
        registry.register(definition("a", SINGLE_COPPER)).unwrap();
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(registry.contains("a"));
    }
}
