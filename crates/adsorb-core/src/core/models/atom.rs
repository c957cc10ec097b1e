use crate::core::elements::Element;
use nalgebra::Point3;
use std::str::FromStr;

/// Classifies an atom for trajectory anomaly detection.
///
/// The numeric values follow the convention used by catalysis datasets: `0` marks
/// subsurface (bulk-like) atoms, `1` marks the exposed surface layer and `2` marks
/// adsorbate atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AtomTag {
    /// Atom below the exposed surface layer.
    #[default]
    Subsurface,
    /// Atom in the exposed surface layer of the adsorbent.
    Surface,
    /// Atom belonging to the adsorbed molecule.
    Adsorbate,
}

impl AtomTag {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(AtomTag::Subsurface),
            1 => Some(AtomTag::Surface),
            2 => Some(AtomTag::Adsorbate),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            AtomTag::Subsurface => 0,
            AtomTag::Surface => 1,
            AtomTag::Adsorbate => 2,
        }
    }
}

impl FromStr for AtomTag {
    type Err = ();

    /// Parses either the numeric code (`"0"`, `"1"`, `"2"`) or a case-insensitive
    /// name such as `"surface"` or `"sub-surface"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(value) = s.parse::<u8>() {
            return AtomTag::from_u8(value).ok_or(());
        }
        match s.to_ascii_lowercase().as_str() {
            "subsurface" | "sub-surface" | "sub_surface" | "bulk" => Ok(AtomTag::Subsurface),
            "surface" => Ok(AtomTag::Surface),
            "adsorbate" => Ok(AtomTag::Adsorbate),
            _ => Err(()),
        }
    }
}

/// A single atom of an atomic structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    /// The chemical element of the atom.
    pub element: Element,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    /// Role of the atom for anomaly detection.
    pub tag: AtomTag,
}

impl Atom {
    /// Creates a new `Atom` with the default (subsurface) tag.
    pub fn new(element: Element, position: Point3<f64>) -> Self {
        Self {
            element,
            position,
            tag: AtomTag::default(),
        }
    }

    pub fn with_tag(mut self, tag: AtomTag) -> Self {
        self.tag = tag;
        self
    }
}
