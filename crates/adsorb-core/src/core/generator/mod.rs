//! # Structure Generator Language
//!
//! Material definitions are written in a small declarative language whose only
//! capability is building atomic structures. A module consists of constants and
//! generators:
//!
//! ```text
//! # lattice constant of copper
//! let a = 3.61
//!
//! fn create_adsorbent() {
//!     surface fcc111 Cu size=[3, 3, 4] a=a vacuum=10
//!     tag adsorbate above=20
//! }
//! ```
//!
//! ## Commands
//!
//! | command | effect |
//! |---|---|
//! | `atom <El> [pos] [at=pos] [tag=t]` | append one atom |
//! | `cell <x> <y> <z>` / `cell [x,y,z]` / `cell <a> <b> <c>` | set the cell |
//! | `pbc <flag>` / `pbc <fx> <fy> <fz>` | set periodic boundary flags |
//! | `surface <kind> <El> size=[nx,ny,layers] a=<a> [c=] [vacuum=]` | append a slab and adopt its cell |
//! | `molecule "<formula>" [at=pos] [tag=t]` | append a gas-phase molecule |
//! | `repeat <nx> <ny> <nz>` | tile the structure |
//! | `translate <d>` | shift all atoms |
//! | `vacuum <amount> [axis=2]` | center with vacuum padding |
//! | `tag <t> [above=z] [below=z]` | retag atoms in a height window |
//!
//! Generators cannot touch the filesystem, the network or the process; the worst a
//! definition can do is fail to compile or produce an invalid structure.

pub mod ast;
pub mod error;
mod interpreter;
pub mod lexer;
pub mod parser;
pub mod surfaces;
pub mod value;

pub use error::{GeneratorError, SymbolKind};
pub use value::Value;

use crate::core::models::structure::AtomicStructure;
use ast::{FunctionDef, Item};
use std::collections::HashMap;
use tracing::debug;
use value::Scope;

/// Upper bound on the size of a generated structure.
pub const MAX_GENERATED_ATOMS: usize = 50_000;

/// A compiled generator module: evaluated constants plus the generators it defines.
#[derive(Debug, Clone, Default)]
pub struct GeneratorModule {
    constants: HashMap<String, Value>,
    generators: Vec<FunctionDef>,
}

/// A callable structure generator borrowed from its module.
#[derive(Debug, Clone, Copy)]
pub struct Generator<'m> {
    definition: &'m FunctionDef,
    constants: &'m HashMap<String, Value>,
}

/// Compiles generator source into a module.
///
/// Constants are evaluated here, in order, in a namespace private to the module.
/// A later definition of a name replaces any earlier constant or generator with the
/// same name.
pub fn compile(source: &str) -> Result<GeneratorModule, GeneratorError> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse(tokens)?;

    let mut module = GeneratorModule::default();
    for item in program.items {
        match item {
            Item::Constant {
                name,
                value,
                line,
                column,
            } => {
                let evaluated = Scope {
                    constants: &module.constants,
                    locals: None,
                }
                .evaluate(&value)
                .map_err(|message| GeneratorError::compilation(line, column, message))?;
                module.generators.retain(|g| g.name != name);
                module.constants.insert(name, evaluated);
            }
            Item::Function(function) => {
                module.constants.remove(&function.name);
                module.generators.retain(|g| g.name != function.name);
                module.generators.push(function);
            }
        }
    }

    debug!(
        constants = module.constants.len(),
        generators = module.generators.len(),
        "Compiled generator module"
    );
    Ok(module)
}

impl GeneratorModule {
    pub fn generator(&self, name: &str) -> Result<Generator<'_>, GeneratorError> {
        self.generators
            .iter()
            .find(|g| g.name == name)
            .map(|definition| Generator {
                definition,
                constants: &self.constants,
            })
            .ok_or_else(|| GeneratorError::DefinitionNotFound {
                kind: SymbolKind::Generator,
                name: name.to_string(),
            })
    }

    /// The most recently defined generator.
    pub fn last_generator(&self) -> Result<Generator<'_>, GeneratorError> {
        self.generators
            .last()
            .map(|definition| Generator {
                definition,
                constants: &self.constants,
            })
            .ok_or(GeneratorError::NoGenerators)
    }

    pub fn constant(&self, name: &str) -> Result<&Value, GeneratorError> {
        self.constants
            .get(name)
            .ok_or_else(|| GeneratorError::DefinitionNotFound {
                kind: SymbolKind::Constant,
                name: name.to_string(),
            })
    }

    pub fn generator_names(&self) -> impl Iterator<Item = &str> {
        self.generators.iter().map(|g| g.name.as_str())
    }
}

impl Generator<'_> {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Builds a fresh structure by running the generator body.
    pub fn invoke(&self) -> Result<AtomicStructure, GeneratorError> {
        interpreter::run(self.definition, self.constants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::AtomTag;
    use nalgebra::Point3;

    const COPPER_SLAB: &str = r#"
# copper (111) slab
let a = 3.61
let gap = 10

fn create_adsorbent() {
    surface fcc111 Cu size=[2, 2, 3] a=a vacuum=gap
}
"#;

    #[test]
    fn compiles_and_invokes_a_surface_generator() {
        let module = compile(COPPER_SLAB).unwrap();
        let structure = module.generator("create_adsorbent").unwrap().invoke().unwrap();
        assert_eq!(structure.len(), 12);
        assert_eq!(structure.pbc(), [true, true, false]);
        assert_eq!(module.constant("a"), Ok(&Value::Number(3.61)));
    }

    #[test]
    fn invoking_twice_yields_equal_structures() {
        let module = compile(COPPER_SLAB).unwrap();
        let generator = module.last_generator().unwrap();
        assert_eq!(generator.invoke().unwrap(), generator.invoke().unwrap());
    }

    #[test]
    fn single_atom_generator() {
        let module = compile("fn create_adsorbent() { atom Cu [0, 0, 0] }").unwrap();
        let structure = module.last_generator().unwrap().invoke().unwrap();
        assert_eq!(structure.len(), 1);
        assert_eq!(structure.atoms()[0].position, Point3::origin());
    }

    #[test]
    fn missing_symbols_report_their_kind() {
        let module = compile(COPPER_SLAB).unwrap();
        assert_eq!(
            module.generator("make_slab").unwrap_err(),
            GeneratorError::DefinitionNotFound {
                kind: SymbolKind::Generator,
                name: "make_slab".into()
            }
        );
        assert!(matches!(
            module.constant("create_adsorbent"),
            Err(GeneratorError::DefinitionNotFound {
                kind: SymbolKind::Constant,
                ..
            })
        ));
    }

    #[test]
    fn module_without_generators_has_no_last_generator() {
        let module = compile("let a = 1").unwrap();
        assert_eq!(module.last_generator().unwrap_err(), GeneratorError::NoGenerators);
    }

    #[test]
    fn failing_constant_is_a_compilation_error() {
        assert_eq!(
            compile("let a = 1\nlet b = a / 0").unwrap_err(),
            GeneratorError::Compilation {
                line: 2,
                column: 1,
                message: "Division by zero".into()
            }
        );
    }

    #[test]
    fn later_definitions_replace_earlier_ones() {
        let module = compile("fn g() { atom Cu }\nlet g = 2\nfn h() { atom O }\nfn g() { atom H; atom H [0, 0, 0.74] }")
            .unwrap();
        assert_eq!(module.generator_names().collect::<Vec<_>>(), vec!["h", "g"]);
        assert_eq!(module.generator("g").unwrap().invoke().unwrap().len(), 2);
        assert!(module.constant("g").is_err());
    }

    #[test]
    fn runtime_failures_carry_the_statement_line() {
        let module = compile("fn g() {\n  atom Cu\n  atom Xq [0, 0, 1]\n}").unwrap();
        assert!(matches!(
            module.last_generator().unwrap().invoke(),
            Err(GeneratorError::Runtime { line: 3, .. })
        ));

        let module = compile("fn g() {\n  explode\n}").unwrap();
        assert_eq!(
            module.last_generator().unwrap().invoke().unwrap_err(),
            GeneratorError::Runtime {
                line: 2,
                message: "Unknown command 'explode'".into()
            }
        );
    }

    #[test]
    fn runaway_nesting_fails_compilation() {
        let n = 200_000;
        let source = format!("fn g() {{ atom Cu [0, 0, {}1{}] }}", "(".repeat(n), ")".repeat(n));
        assert!(matches!(compile(&source), Err(GeneratorError::Compilation { .. })));
    }

    #[test]
    fn oversized_surface_fails_at_runtime() {
        let module =
            compile("fn g() { surface fcc100 Cu size=[100000, 100000, 100000] a=3.61 }").unwrap();
        assert!(matches!(
            module.last_generator().unwrap().invoke(),
            Err(GeneratorError::Runtime { line: 1, ref message }) if message.contains("would exceed")
        ));
    }

    #[test]
    fn repeat_rejects_zero_counts_at_runtime() {
        let module = compile("fn g() { atom Cu; cell 2 2 2; repeat 2 0 1 }").unwrap();
        assert!(matches!(
            module.last_generator().unwrap().invoke(),
            Err(GeneratorError::Runtime { .. })
        ));
    }

    #[test]
    fn commands_build_a_tagged_structure() {
        let source = r#"
fn create_adsorbent() {
    let h = 1.8
    cell 5 5 5
    pbc true true false
    atom Pt [0, 0, 0]
    atom Pt [2.5, 0, 0]
    molecule "CO" at=[0, 0, h] tag=adsorbate
    translate 0 0 1
    repeat [1, 2, 1]
    tag surface below=1.5 above=0.5
    vacuum 8
}
"#;
        let structure = compile(source).unwrap().last_generator().unwrap().invoke().unwrap();
        assert_eq!(structure.len(), 8);
        assert_eq!(structure.pbc(), [true, true, false]);
        assert_eq!(structure.cell().lengths()[1], 10.0);

        let tags = structure.tags();
        assert_eq!(tags.iter().filter(|t| **t == AtomTag::Adsorbate).count(), 4);
        assert_eq!(tags.iter().filter(|t| **t == AtomTag::Surface).count(), 4);

        let bottom = structure
            .atoms()
            .iter()
            .map(|a| a.position.z)
            .fold(f64::MAX, f64::min);
        assert!((bottom - 8.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_keyword_arguments_are_rejected() {
        let module = compile("fn g() { atom Cu height=2 }").unwrap();
        let error = module.last_generator().unwrap().invoke().unwrap_err();
        assert!(error.to_string().contains("Unknown argument 'height'"));
    }
}
