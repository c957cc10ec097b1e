use super::ast::{Argument, Expr, FunctionDef, Statement};
use super::error::GeneratorError;
use super::surfaces::{SurfaceKind, SurfaceSpec, build_surface};
use super::value::{Scope, Value};
use super::MAX_GENERATED_ATOMS;
use crate::core::elements::Element;
use crate::core::models::atom::{Atom, AtomTag};
use crate::core::models::cell::Cell;
use crate::core::models::formula::molecule_from_formula;
use crate::core::models::structure::AtomicStructure;
use nalgebra::{Point3, Vector3};
use std::collections::{HashMap, VecDeque};
use tracing::trace;

/// Runs the body of a generator against a fresh, empty structure.
pub fn run(
    function: &FunctionDef,
    constants: &HashMap<String, Value>,
) -> Result<AtomicStructure, GeneratorError> {
    let mut interpreter = Interpreter {
        constants,
        locals: HashMap::new(),
        structure: AtomicStructure::default(),
    };
    for statement in &function.body {
        interpreter
            .execute(statement)
            .map_err(|message| GeneratorError::runtime(statement.line(), message))?;
        if interpreter.structure.len() > MAX_GENERATED_ATOMS {
            return Err(GeneratorError::runtime(
                statement.line(),
                format!(
                    "Generated structure exceeds {} atoms",
                    MAX_GENERATED_ATOMS
                ),
            ));
        }
    }
    Ok(interpreter.structure)
}

struct Interpreter<'a> {
    constants: &'a HashMap<String, Value>,
    locals: HashMap<String, Value>,
    structure: AtomicStructure,
}

/// Positional and keyword arguments of one command, consumed as the command reads
/// them. Anything left over is reported as an error.
struct Arguments<'s> {
    command: &'s str,
    positional: VecDeque<&'s Expr>,
    keywords: Vec<(&'s str, &'s Expr)>,
}

impl<'s> Arguments<'s> {
    fn new(command: &'s str, arguments: &'s [Argument]) -> Self {
        let mut positional = VecDeque::new();
        let mut keywords = Vec::new();
        for argument in arguments {
            match &argument.keyword {
                Some(keyword) => keywords.push((keyword.as_str(), &argument.value)),
                None => positional.push_back(&argument.value),
            }
        }
        Self {
            command,
            positional,
            keywords,
        }
    }

    fn next(&mut self) -> Option<&'s Expr> {
        self.positional.pop_front()
    }

    fn require(&mut self, what: &str) -> Result<&'s Expr, String> {
        self.next()
            .ok_or_else(|| format!("Command '{}' requires {}", self.command, what))
    }

    fn remaining(&self) -> usize {
        self.positional.len()
    }

    fn keyword(&mut self, name: &str) -> Option<&'s Expr> {
        let index = self.keywords.iter().position(|(key, _)| *key == name)?;
        Some(self.keywords.remove(index).1)
    }

    fn finish(self) -> Result<(), String> {
        if let Some((key, _)) = self.keywords.first() {
            return Err(format!(
                "Unknown argument '{}' for command '{}'",
                key, self.command
            ));
        }
        if !self.positional.is_empty() {
            return Err(format!(
                "Too many arguments for command '{}'",
                self.command
            ));
        }
        Ok(())
    }
}

impl Interpreter<'_> {
    fn scope(&self) -> Scope<'_> {
        Scope {
            constants: self.constants,
            locals: Some(&self.locals),
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Value, String> {
        self.scope().evaluate(expr)
    }

    /// Reads a bare word such as an element symbol or surface name. A name bound
    /// to a string resolves to that string.
    fn word(&self, expr: &Expr) -> Result<String, String> {
        match expr {
            Expr::Ident(name) => match self.scope().lookup(name) {
                Some(Value::Text(text)) => Ok(text),
                _ => Ok(name.clone()),
            },
            Expr::Str(text) => Ok(text.clone()),
            other => match self.eval(other)? {
                Value::Text(text) => Ok(text),
                Value::Number(n) => Ok(n.to_string()),
                value => Err(format!("Expected a name, found {}", value)),
            },
        }
    }

    fn element(&self, expr: &Expr) -> Result<Element, String> {
        let symbol = self.word(expr)?;
        Element::from_symbol(&symbol).map_err(|e| e.to_string())
    }

    fn tag(&self, expr: &Expr) -> Result<AtomTag, String> {
        let word = self.word(expr)?;
        word.parse::<AtomTag>()
            .map_err(|_| format!("Unknown atom tag '{}'", word))
    }

    /// Three counts given either as one vector or as three separate numbers.
    fn counts(&self, arguments: &mut Arguments<'_>, what: &str) -> Result<[usize; 3], String> {
        let first = self.eval(arguments.require(what)?)?;
        let values = match first {
            Value::Vector(items) => items.into_iter().map(Value::Number).collect(),
            number => {
                let mut values = vec![number];
                for _ in 0..2 {
                    values.push(self.eval(arguments.require(what)?)?);
                }
                values
            }
        };
        match values.as_slice() {
            [a, b, c] => Ok([a.as_count()?, b.as_count()?, c.as_count()?]),
            _ => Err(format!("Expected 3 values for {}", what)),
        }
    }

    fn execute(&mut self, statement: &Statement) -> Result<(), String> {
        match statement {
            Statement::Let { name, value, .. } => {
                let value = self.eval(value)?;
                self.locals.insert(name.clone(), value);
                Ok(())
            }
            Statement::Command {
                name, arguments, ..
            } => {
                trace!(command = %name, "Executing generator command");
                let mut arguments = Arguments::new(name, arguments);
                match name.as_str() {
                    "atom" => self.atom(&mut arguments)?,
                    "cell" => self.cell(&mut arguments)?,
                    "pbc" => self.pbc(&mut arguments)?,
                    "surface" => self.surface(&mut arguments)?,
                    "molecule" => self.molecule(&mut arguments)?,
                    "repeat" => self.repeat(&mut arguments)?,
                    "translate" => self.translate(&mut arguments)?,
                    "vacuum" => self.vacuum(&mut arguments)?,
                    "tag" => self.tag_atoms(&mut arguments)?,
                    other => return Err(format!("Unknown command '{}'", other)),
                }
                arguments.finish()
            }
        }
    }

    fn atom(&mut self, arguments: &mut Arguments<'_>) -> Result<(), String> {
        let element = self.element(arguments.require("an element symbol")?)?;
        let position = match (arguments.next(), arguments.keyword("at")) {
            (Some(_), Some(_)) => {
                return Err("Position given both positionally and with 'at='".to_string());
            }
            (Some(expr), None) | (None, Some(expr)) => self.eval(expr)?.as_point3()?,
            (None, None) => Point3::origin(),
        };
        let tag = match arguments.keyword("tag") {
            Some(expr) => self.tag(expr)?,
            None => AtomTag::default(),
        };
        self.structure
            .push(Atom::new(element, position).with_tag(tag));
        Ok(())
    }

    fn cell(&mut self, arguments: &mut Arguments<'_>) -> Result<(), String> {
        let mut values = Vec::new();
        while let Some(expr) = arguments.next() {
            values.push(self.eval(expr)?);
        }
        let cell = match values.as_slice() {
            [Value::Vector(lengths)] if lengths.len() == 3 => {
                Cell::orthorhombic(lengths[0], lengths[1], lengths[2])
            }
            [Value::Number(x), Value::Number(y), Value::Number(z)] => {
                Cell::orthorhombic(*x, *y, *z)
            }
            [a, b, c] => Cell::new(a.as_vector3()?, b.as_vector3()?, c.as_vector3()?),
            _ => {
                return Err(
                    "Command 'cell' expects three lengths, one vector of lengths, or three lattice vectors"
                        .to_string(),
                );
            }
        };
        self.structure.set_cell(cell);
        Ok(())
    }

    fn pbc(&mut self, arguments: &mut Arguments<'_>) -> Result<(), String> {
        let mut values = Vec::new();
        while let Some(expr) = arguments.next() {
            values.push(self.eval(expr)?);
        }
        let flags = match values.as_slice() {
            [Value::Vector(items)] if items.len() == 3 => {
                let mut flags = [false; 3];
                for (flag, item) in flags.iter_mut().zip(items) {
                    *flag = Value::Number(*item).as_bool()?;
                }
                flags
            }
            [single] => [single.as_bool()?; 3],
            [a, b, c] => [a.as_bool()?, b.as_bool()?, c.as_bool()?],
            _ => return Err("Command 'pbc' expects one or three flags".to_string()),
        };
        self.structure.set_pbc(flags);
        Ok(())
    }

    fn surface(&mut self, arguments: &mut Arguments<'_>) -> Result<(), String> {
        let kind: SurfaceKind = self.word(arguments.require("a surface type")?)?.parse()?;
        let element = self.element(arguments.require("an element symbol")?)?;
        let size = match arguments.keyword("size") {
            Some(expr) => {
                let mut sized = Arguments {
                    command: "surface",
                    positional: VecDeque::from([expr]),
                    keywords: Vec::new(),
                };
                self.counts(&mut sized, "size")?
            }
            None => return Err("Command 'surface' requires size=[nx, ny, layers]".to_string()),
        };
        let lattice_constant = match arguments.keyword("a") {
            Some(expr) => self.eval(expr)?.as_number()?,
            None => return Err("Command 'surface' requires the lattice constant a=".to_string()),
        };
        let c = arguments
            .keyword("c")
            .map(|expr| self.eval(expr)?.as_number())
            .transpose()?;
        let vacuum = arguments
            .keyword("vacuum")
            .map(|expr| self.eval(expr)?.as_number())
            .transpose()?;

        let slab = build_surface(&SurfaceSpec {
            kind,
            element,
            size,
            lattice_constant,
            c,
            vacuum,
        })?;
        self.structure.set_cell(*slab.cell());
        self.structure.set_pbc(slab.pbc());
        self.structure.extend(&slab);
        Ok(())
    }

    fn molecule(&mut self, arguments: &mut Arguments<'_>) -> Result<(), String> {
        let formula = self.word(arguments.require("a chemical formula")?)?;
        let mut molecule = molecule_from_formula(&formula).map_err(|e| e.to_string())?;
        if let Some(expr) = arguments.keyword("at") {
            let anchor = self.eval(expr)?.as_point3()?;
            let first = molecule.atoms()[0].position;
            molecule.translate(&(anchor - first));
        }
        if let Some(expr) = arguments.keyword("tag") {
            let tag = self.tag(expr)?;
            molecule.set_all_tags(tag);
        }
        self.structure.extend(&molecule);
        Ok(())
    }

    fn repeat(&mut self, arguments: &mut Arguments<'_>) -> Result<(), String> {
        let counts = self.counts(arguments, "repeat counts")?;
        let total = counts
            .iter()
            .try_fold(self.structure.len(), |acc, &n| acc.checked_mul(n))
            .unwrap_or(usize::MAX);
        if total > MAX_GENERATED_ATOMS {
            return Err(format!(
                "Repeating by {:?} would exceed {} atoms",
                counts, MAX_GENERATED_ATOMS
            ));
        }
        self.structure = self.structure.repeat(counts).map_err(|e| e.to_string())?;
        Ok(())
    }

    fn translate(&mut self, arguments: &mut Arguments<'_>) -> Result<(), String> {
        let first = self.eval(arguments.require("a displacement")?)?;
        let displacement = match first {
            Value::Vector(_) => first.as_vector3()?,
            number => {
                let y = self.eval(arguments.require("a displacement")?)?;
                let z = self.eval(arguments.require("a displacement")?)?;
                Vector3::new(number.as_number()?, y.as_number()?, z.as_number()?)
            }
        };
        self.structure.translate(&displacement);
        Ok(())
    }

    fn vacuum(&mut self, arguments: &mut Arguments<'_>) -> Result<(), String> {
        let amount = self.eval(arguments.require("a vacuum thickness")?)?.as_number()?;
        if amount < 0.0 {
            return Err(format!("Vacuum must be non-negative (got {})", amount));
        }
        let axis = match arguments.keyword("axis") {
            Some(expr) => {
                let axis = self.eval(expr)?.as_number()?;
                if axis == 0.0 || axis == 1.0 || axis == 2.0 {
                    axis as usize
                } else {
                    return Err(format!("Axis must be 0, 1 or 2 (got {})", axis));
                }
            }
            None => 2,
        };
        self.structure
            .center(Some(amount), axis)
            .map_err(|e| e.to_string())
    }

    fn tag_atoms(&mut self, arguments: &mut Arguments<'_>) -> Result<(), String> {
        let tag = self.tag(arguments.require("a tag")?)?;
        let above = arguments
            .keyword("above")
            .map(|expr| self.eval(expr)?.as_number())
            .transpose()?;
        let below = arguments
            .keyword("below")
            .map(|expr| self.eval(expr)?.as_number())
            .transpose()?;
        if arguments.remaining() > 0 {
            return Err("Command 'tag' takes a single tag plus above= and below=".to_string());
        }
        for atom in self.structure.atoms_mut() {
            let z = atom.position.z;
            if above.is_none_or(|limit| z >= limit) && below.is_none_or(|limit| z <= limit) {
                atom.tag = tag;
            }
        }
        Ok(())
    }
}
