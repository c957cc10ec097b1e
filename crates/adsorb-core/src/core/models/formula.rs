use super::atom::Atom;
use super::structure::AtomicStructure;
use crate::core::elements::{Element, ElementError};
use nalgebra::Point3;
use thiserror::Error;

/// Upper bound on the number of atoms a formula may expand to.
pub const MAX_FORMULA_ATOMS: usize = 256;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum FormulaError {
    #[error("Chemical formula is empty")]
    Empty,
    #[error("Unexpected character '{character}' at position {position} in formula '{formula}'")]
    UnexpectedCharacter {
        formula: String,
        character: char,
        position: usize,
    },
    #[error("Unbalanced parentheses in formula '{0}'")]
    UnbalancedParentheses(String),
    #[error("Formula '{formula}' expands to more than {limit} atoms")]
    TooManyAtoms { formula: String, limit: usize },
    #[error(transparent)]
    UnknownElement(#[from] ElementError),
}

/// Expands a chemical formula into the sequence of element symbols it denotes, in
/// the order they are written.
///
/// Supports multi-letter symbols, counts and nested parentheses, so `"CO2"` becomes
/// `[C, O, O]` and `"Ca(OH)2"` becomes `[Ca, O, H, O, H]`.
pub fn parse_formula(formula: &str) -> Result<Vec<Element>, FormulaError> {
    let trimmed = formula.trim();
    if trimmed.is_empty() {
        return Err(FormulaError::Empty);
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let mut stack: Vec<Vec<Element>> = vec![Vec::new()];
    let mut index = 0;

    let unexpected = |position: usize| FormulaError::UnexpectedCharacter {
        formula: trimmed.to_string(),
        character: chars[position],
        position,
    };

    while index < chars.len() {
        let c = chars[index];
        if c.is_ascii_uppercase() {
            let start = index;
            index += 1;
            while index < chars.len() && chars[index].is_ascii_lowercase() {
                index += 1;
            }
            let symbol: String = chars[start..index].iter().collect();
            let element = Element::from_symbol(&symbol)?;
            let count = read_count(&chars, &mut index);
            let group = stack.last_mut().ok_or_else(|| unexpected(start))?;
            push_repeated(group, &[element], count, trimmed)?;
        } else if c == '(' {
            stack.push(Vec::new());
            index += 1;
        } else if c == ')' {
            if stack.len() < 2 {
                return Err(FormulaError::UnbalancedParentheses(trimmed.to_string()));
            }
            index += 1;
            let count = read_count(&chars, &mut index);
            let inner = stack.pop().unwrap_or_default();
            let outer = stack
                .last_mut()
                .ok_or_else(|| FormulaError::UnbalancedParentheses(trimmed.to_string()))?;
            push_repeated(outer, &inner, count, trimmed)?;
        } else {
            return Err(unexpected(index));
        }
    }

    if stack.len() != 1 {
        return Err(FormulaError::UnbalancedParentheses(trimmed.to_string()));
    }
    let elements = stack.pop().unwrap_or_default();
    if elements.is_empty() {
        return Err(FormulaError::Empty);
    }
    Ok(elements)
}

fn read_count(chars: &[char], index: &mut usize) -> usize {
    let start = *index;
    while *index < chars.len() && chars[*index].is_ascii_digit() {
        *index += 1;
    }
    if start == *index {
        return 1;
    }
    chars[start..*index]
        .iter()
        .collect::<String>()
        .parse()
        .unwrap_or(usize::MAX)
}

fn push_repeated(
    target: &mut Vec<Element>,
    group: &[Element],
    count: usize,
    formula: &str,
) -> Result<(), FormulaError> {
    if group.is_empty() {
        return Ok(());
    }
    let added = group.len().saturating_mul(count);
    if target.len().saturating_add(added) > MAX_FORMULA_ATOMS {
        return Err(FormulaError::TooManyAtoms {
            formula: formula.to_string(),
            limit: MAX_FORMULA_ATOMS,
        });
    }
    for _ in 0..count {
        target.extend_from_slice(group);
    }
    Ok(())
}

type TemplateAtom = (&'static str, [f64; 3]);

// Gas-phase reference geometries in Angstroms.
const MOLECULE_TEMPLATES: &[&[TemplateAtom]] = &[
    &[("H", [0.0, 0.0, 0.0]), ("H", [0.0, 0.0, 0.7414])],
    &[("N", [0.0, 0.0, 0.0]), ("N", [0.0, 0.0, 1.0977])],
    &[("O", [0.0, 0.0, 0.0]), ("O", [0.0, 0.0, 1.2075])],
    &[("C", [0.0, 0.0, 0.0]), ("O", [0.0, 0.0, 1.1282])],
    &[("N", [0.0, 0.0, 0.0]), ("O", [0.0, 0.0, 1.1508])],
    &[("O", [0.0, 0.0, 0.0]), ("H", [0.0, 0.0, 0.9697])],
    &[
        ("C", [0.0, 0.0, 0.0]),
        ("O", [-1.16, 0.0, 0.0]),
        ("O", [1.16, 0.0, 0.0]),
    ],
    &[
        ("O", [0.0, 0.0, 0.119262]),
        ("H", [0.0, 0.763239, -0.477047]),
        ("H", [0.0, -0.763239, -0.477047]),
    ],
    &[
        ("N", [0.0, 0.0, 0.116489]),
        ("H", [0.0, 0.939731, -0.271808]),
        ("H", [0.813831, -0.469865, -0.271808]),
        ("H", [-0.813831, -0.469865, -0.271808]),
    ],
    &[
        ("C", [0.0, 0.0, 0.0]),
        ("H", [0.629118, 0.629118, 0.629118]),
        ("H", [-0.629118, -0.629118, 0.629118]),
        ("H", [0.629118, -0.629118, -0.629118]),
        ("H", [-0.629118, 0.629118, -0.629118]),
    ],
];

/// Assigns template positions to `elements` in formula order, or `None` when the
/// template has a different composition.
fn match_template(elements: &[Element], template: &[TemplateAtom]) -> Option<Vec<Point3<f64>>> {
    if elements.len() != template.len() {
        return None;
    }
    let mut used = vec![false; template.len()];
    elements
        .iter()
        .map(|element| {
            let slot = template
                .iter()
                .enumerate()
                .position(|(i, (symbol, _))| !used[i] && *symbol == element.symbol())?;
            used[slot] = true;
            let [x, y, z] = template[slot].1;
            Some(Point3::new(x, y, z))
        })
        .collect()
}

/// Linear chain along z with neighbours spaced by the sum of their covalent radii.
fn chain_positions(elements: &[Element]) -> Vec<Point3<f64>> {
    let mut z = 0.0;
    elements
        .iter()
        .enumerate()
        .map(|(i, element)| {
            if i > 0 {
                z += elements[i - 1].covalent_radius() + element.covalent_radius();
            }
            Point3::new(0.0, 0.0, z)
        })
        .collect()
}

/// Builds an isolated molecule (zero cell, no periodicity) from a chemical formula.
///
/// Atoms keep the order of the formula, so the first written atom is the one that
/// gets anchored to the adsorption site. Common small molecules use tabulated
/// gas-phase geometries; any other composition is laid out as a linear chain.
pub fn molecule_from_formula(formula: &str) -> Result<AtomicStructure, FormulaError> {
    let elements = parse_formula(formula)?;
    let positions = MOLECULE_TEMPLATES
        .iter()
        .find_map(|template| match_template(&elements, template))
        .unwrap_or_else(|| chain_positions(&elements));

    let atoms = elements
        .into_iter()
        .zip(positions)
        .map(|(element, position)| Atom::new(element, position))
        .collect();
    Ok(AtomicStructure::from_atoms(atoms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(elements: &[Element]) -> Vec<&'static str> {
        elements.iter().map(|e| e.symbol()).collect()
    }

    #[test]
    fn parse_formula_expands_counts_in_written_order() {
        assert_eq!(symbols(&parse_formula("CO2").unwrap()), vec!["C", "O", "O"]);
        assert_eq!(symbols(&parse_formula("H2O").unwrap()), vec!["H", "H", "O"]);
        assert_eq!(symbols(&parse_formula("NaCl").unwrap()), vec!["Na", "Cl"]);
    }

    #[test]
    fn parse_formula_handles_nested_groups() {
        assert_eq!(
            symbols(&parse_formula("Ca(OH)2").unwrap()),
            vec!["Ca", "O", "H", "O", "H"]
        );
        assert_eq!(parse_formula("(CH3)2((O))").unwrap().len(), 9);
    }

    #[test]
    fn parse_formula_rejects_malformed_input() {
        assert_eq!(parse_formula("  "), Err(FormulaError::Empty));
        assert!(matches!(
            parse_formula("co2"),
            Err(FormulaError::UnexpectedCharacter { position: 0, .. })
        ));
        assert!(matches!(
            parse_formula("Ca(OH"),
            Err(FormulaError::UnbalancedParentheses(_))
        ));
        assert!(matches!(
            parse_formula("OH)2"),
            Err(FormulaError::UnbalancedParentheses(_))
        ));
        assert!(matches!(
            parse_formula("Xx2"),
            Err(FormulaError::UnknownElement(_))
        ));
        assert!(matches!(
            parse_formula("C100000"),
            Err(FormulaError::TooManyAtoms { .. })
        ));
    }

    #[test]
    fn empty_group_with_huge_count_returns_immediately() {
        assert_eq!(
            parse_formula("()99999999999999999999"),
            Err(FormulaError::Empty)
        );
        let water = parse_formula("H2()18446744073709551615O").unwrap();
        assert_eq!(water.len(), 3);
    }

    #[test]
    fn carbon_dioxide_is_linear_with_carbon_first() {
        let co2 = molecule_from_formula("CO2").unwrap();
        let atoms = co2.atoms();
        assert_eq!(atoms[0].element.symbol(), "C");
        assert_eq!(atoms[0].position, Point3::origin());
        assert!((atoms[1].position.x + 1.16).abs() < 1e-12);
        assert!((atoms[2].position.x - 1.16).abs() < 1e-12);
        assert!(co2.cell().is_zero());
        assert_eq!(co2.pbc(), [false; 3]);
    }

    #[test]
    fn water_positions_follow_formula_order() {
        let water = molecule_from_formula("H2O").unwrap();
        let symbols: Vec<_> = water.atoms().iter().map(|a| a.element.symbol()).collect();
        assert_eq!(symbols, vec!["H", "H", "O"]);
        let oh = (water.atoms()[0].position - water.atoms()[2].position).norm();
        assert!((oh - 0.9686).abs() < 1e-3);
    }

    #[test]
    fn unknown_compositions_fall_back_to_a_chain() {
        let molecule = molecule_from_formula("CS2").unwrap();
        let positions: Vec<f64> = molecule.atoms().iter().map(|a| a.position.z).collect();
        assert_eq!(positions[0], 0.0);
        assert!((positions[1] - (0.76 + 1.05)).abs() < 1e-12);
        assert!((positions[2] - (0.76 + 1.05 + 2.10)).abs() < 1e-12);
    }
}
