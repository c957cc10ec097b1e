use phf::{Map, phf_map};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Static per-element data. Covalent radii follow Cordero et al. (2008).
#[derive(Debug, PartialEq)]
pub struct ElementData {
    pub symbol: &'static str,
    pub number: u8,
    /// Standard atomic weight in atomic mass units.
    pub mass: f64,
    /// Covalent radius in Angstroms.
    pub covalent_radius: f64,
}

static ELEMENTS: Map<&'static str, ElementData> = phf_map! {
    "H" => ElementData { symbol: "H", number: 1, mass: 1.008, covalent_radius: 0.31 },
    "He" => ElementData { symbol: "He", number: 2, mass: 4.0026, covalent_radius: 0.28 },
    "Li" => ElementData { symbol: "Li", number: 3, mass: 6.94, covalent_radius: 1.28 },
    "Be" => ElementData { symbol: "Be", number: 4, mass: 9.0122, covalent_radius: 0.96 },
    "B" => ElementData { symbol: "B", number: 5, mass: 10.81, covalent_radius: 0.84 },
    "C" => ElementData { symbol: "C", number: 6, mass: 12.011, covalent_radius: 0.76 },
    "N" => ElementData { symbol: "N", number: 7, mass: 14.007, covalent_radius: 0.71 },
    "O" => ElementData { symbol: "O", number: 8, mass: 15.999, covalent_radius: 0.66 },
    "F" => ElementData { symbol: "F", number: 9, mass: 18.998, covalent_radius: 0.57 },
    "Ne" => ElementData { symbol: "Ne", number: 10, mass: 20.180, covalent_radius: 0.58 },
    "Na" => ElementData { symbol: "Na", number: 11, mass: 22.990, covalent_radius: 1.66 },
    "Mg" => ElementData { symbol: "Mg", number: 12, mass: 24.305, covalent_radius: 1.41 },
    "Al" => ElementData { symbol: "Al", number: 13, mass: 26.982, covalent_radius: 1.21 },
    "Si" => ElementData { symbol: "Si", number: 14, mass: 28.085, covalent_radius: 1.11 },
    "P" => ElementData { symbol: "P", number: 15, mass: 30.974, covalent_radius: 1.07 },
    "S" => ElementData { symbol: "S", number: 16, mass: 32.06, covalent_radius: 1.05 },
    "Cl" => ElementData { symbol: "Cl", number: 17, mass: 35.45, covalent_radius: 1.02 },
    "Ar" => ElementData { symbol: "Ar", number: 18, mass: 39.948, covalent_radius: 1.06 },
    "K" => ElementData { symbol: "K", number: 19, mass: 39.098, covalent_radius: 2.03 },
    "Ca" => ElementData { symbol: "Ca", number: 20, mass: 40.078, covalent_radius: 1.76 },
    "Sc" => ElementData { symbol: "Sc", number: 21, mass: 44.956, covalent_radius: 1.70 },
    "Ti" => ElementData { symbol: "Ti", number: 22, mass: 47.867, covalent_radius: 1.60 },
    "V" => ElementData { symbol: "V", number: 23, mass: 50.942, covalent_radius: 1.53 },
    "Cr" => ElementData { symbol: "Cr", number: 24, mass: 51.996, covalent_radius: 1.39 },
    "Mn" => ElementData { symbol: "Mn", number: 25, mass: 54.938, covalent_radius: 1.39 },
    "Fe" => ElementData { symbol: "Fe", number: 26, mass: 55.845, covalent_radius: 1.32 },
    "Co" => ElementData { symbol: "Co", number: 27, mass: 58.933, covalent_radius: 1.26 },
    "Ni" => ElementData { symbol: "Ni", number: 28, mass: 58.693, covalent_radius: 1.24 },
    "Cu" => ElementData { symbol: "Cu", number: 29, mass: 63.546, covalent_radius: 1.32 },
    "Zn" => ElementData { symbol: "Zn", number: 30, mass: 65.38, covalent_radius: 1.22 },
    "Ga" => ElementData { symbol: "Ga", number: 31, mass: 69.723, covalent_radius: 1.22 },
    "Ge" => ElementData { symbol: "Ge", number: 32, mass: 72.630, covalent_radius: 1.20 },
    "As" => ElementData { symbol: "As", number: 33, mass: 74.922, covalent_radius: 1.19 },
    "Se" => ElementData { symbol: "Se", number: 34, mass: 78.971, covalent_radius: 1.20 },
    "Br" => ElementData { symbol: "Br", number: 35, mass: 79.904, covalent_radius: 1.20 },
    "Kr" => ElementData { symbol: "Kr", number: 36, mass: 83.798, covalent_radius: 1.16 },
    "Rb" => ElementData { symbol: "Rb", number: 37, mass: 85.468, covalent_radius: 2.20 },
    "Sr" => ElementData { symbol: "Sr", number: 38, mass: 87.62, covalent_radius: 1.95 },
    "Y" => ElementData { symbol: "Y", number: 39, mass: 88.906, covalent_radius: 1.90 },
    "Zr" => ElementData { symbol: "Zr", number: 40, mass: 91.224, covalent_radius: 1.75 },
    "Nb" => ElementData { symbol: "Nb", number: 41, mass: 92.906, covalent_radius: 1.64 },
    "Mo" => ElementData { symbol: "Mo", number: 42, mass: 95.95, covalent_radius: 1.54 },
    "Tc" => ElementData { symbol: "Tc", number: 43, mass: 98.0, covalent_radius: 1.47 },
    "Ru" => ElementData { symbol: "Ru", number: 44, mass: 101.07, covalent_radius: 1.46 },
    "Rh" => ElementData { symbol: "Rh", number: 45, mass: 102.91, covalent_radius: 1.42 },
    "Pd" => ElementData { symbol: "Pd", number: 46, mass: 106.42, covalent_radius: 1.39 },
    "Ag" => ElementData { symbol: "Ag", number: 47, mass: 107.87, covalent_radius: 1.45 },
    "Cd" => ElementData { symbol: "Cd", number: 48, mass: 112.41, covalent_radius: 1.44 },
    "In" => ElementData { symbol: "In", number: 49, mass: 114.82, covalent_radius: 1.42 },
    "Sn" => ElementData { symbol: "Sn", number: 50, mass: 118.71, covalent_radius: 1.39 },
    "Sb" => ElementData { symbol: "Sb", number: 51, mass: 121.76, covalent_radius: 1.39 },
    "Te" => ElementData { symbol: "Te", number: 52, mass: 127.60, covalent_radius: 1.38 },
    "I" => ElementData { symbol: "I", number: 53, mass: 126.90, covalent_radius: 1.39 },
    "Xe" => ElementData { symbol: "Xe", number: 54, mass: 131.29, covalent_radius: 1.40 },
    "Cs" => ElementData { symbol: "Cs", number: 55, mass: 132.91, covalent_radius: 2.44 },
    "Ba" => ElementData { symbol: "Ba", number: 56, mass: 137.33, covalent_radius: 2.15 },
    "La" => ElementData { symbol: "La", number: 57, mass: 138.91, covalent_radius: 2.07 },
    "Ce" => ElementData { symbol: "Ce", number: 58, mass: 140.12, covalent_radius: 2.04 },
    "Hf" => ElementData { symbol: "Hf", number: 72, mass: 178.49, covalent_radius: 1.75 },
    "Ta" => ElementData { symbol: "Ta", number: 73, mass: 180.95, covalent_radius: 1.70 },
    "W" => ElementData { symbol: "W", number: 74, mass: 183.84, covalent_radius: 1.62 },
    "Re" => ElementData { symbol: "Re", number: 75, mass: 186.21, covalent_radius: 1.51 },
    "Os" => ElementData { symbol: "Os", number: 76, mass: 190.23, covalent_radius: 1.44 },
    "Ir" => ElementData { symbol: "Ir", number: 77, mass: 192.22, covalent_radius: 1.41 },
    "Pt" => ElementData { symbol: "Pt", number: 78, mass: 195.08, covalent_radius: 1.36 },
    "Au" => ElementData { symbol: "Au", number: 79, mass: 196.97, covalent_radius: 1.36 },
    "Hg" => ElementData { symbol: "Hg", number: 80, mass: 200.59, covalent_radius: 1.32 },
    "Tl" => ElementData { symbol: "Tl", number: 81, mass: 204.38, covalent_radius: 1.45 },
    "Pb" => ElementData { symbol: "Pb", number: 82, mass: 207.2, covalent_radius: 1.46 },
    "Bi" => ElementData { symbol: "Bi", number: 83, mass: 208.98, covalent_radius: 1.48 },
};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown chemical element: '{0}'")]
pub struct ElementError(pub String);

/// A chemical element backed by the static periodic table.
///
/// `Element` is a cheap `Copy` handle; equality and hashing go through the atomic
/// number so two handles for the same element always compare equal.
#[derive(Clone, Copy)]
pub struct Element(&'static ElementData);

impl Element {
    pub fn from_symbol(symbol: &str) -> Result<Self, ElementError> {
        ELEMENTS
            .get(symbol)
            .map(Element)
            .ok_or_else(|| ElementError(symbol.to_string()))
    }

    pub fn symbol(&self) -> &'static str {
        self.0.symbol
    }

    pub fn number(&self) -> u8 {
        self.0.number
    }

    pub fn mass(&self) -> f64 {
        self.0.mass
    }

    pub fn covalent_radius(&self) -> f64 {
        self.0.covalent_radius
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.0.number == other.0.number
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.number.hash(state);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({})", self.0.symbol)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.symbol)
    }
}

impl FromStr for Element {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Element::from_symbol(s.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_symbol_resolves_known_elements() {
        let cu = Element::from_symbol("Cu").unwrap();
        assert_eq!(cu.symbol(), "Cu");
        assert_eq!(cu.number(), 29);
        assert_eq!(cu.covalent_radius(), 1.32);
    }

    #[test]
    fn from_symbol_is_case_sensitive() {
        assert!(Element::from_symbol("cu").is_err());
        assert!(Element::from_symbol("CU").is_err());
    }

    #[test]
    fn from_symbol_returns_err_for_unknown_symbol() {
        assert_eq!(
            Element::from_symbol("Xx"),
            Err(ElementError("Xx".to_string()))
        );
    }

    #[test]
    fn elements_compare_by_atomic_number() {
        let a: Element = "O".parse().unwrap();
        let b = Element::from_symbol("O").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Element::from_symbol("C").unwrap());
    }

    #[test]
    fn display_prints_the_symbol() {
        let pt = Element::from_symbol("Pt").unwrap();
        assert_eq!(pt.to_string(), "Pt");
        assert_eq!(format!("{:?}", pt), "Element(Pt)");
    }

    #[test]
    fn table_entries_are_keyed_by_their_own_symbol() {
        for (key, data) in ELEMENTS.entries() {
            assert_eq!(*key, data.symbol);
            assert!(data.covalent_radius > 0.0);
            assert!(data.mass > 0.0);
        }
    }
}
