use crate::core::elements::Element;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PotentialKind {
    Morse,
    LennardJones,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelInfo {
    pub name: String,
    pub potential: PotentialKind,
    /// Interaction cutoff in Angstroms.
    pub cutoff: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ElementParam {
    /// Well depth in eV.
    pub well_depth: f64,
    /// Morse stiffness in 1/Angstrom. Ignored by Lennard-Jones models.
    #[serde(default)]
    pub stiffness: Option<f64>,
    /// Overrides the covalent radius used for the equilibrium distance.
    #[serde(default)]
    pub radius: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PairParam {
    pub well_depth: f64,
    pub equilibrium_distance: f64,
    #[serde(default)]
    pub stiffness: Option<f64>,
}

/// Resolved coefficients for one pair of species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairCoefficients {
    pub well_depth: f64,
    pub equilibrium_distance: f64,
    pub stiffness: f64,
}

/// Contents of a checkpoint file: the parameters of a pair-potential model.
///
/// Unlisted elements use `defaults` with their covalent radius. Coefficients of a
/// pair are mixed from the two elements (geometric mean of well depths, arithmetic
/// mean of stiffnesses, sum of radii) unless `pairs` lists the pair explicitly under
/// a key such as `"C-O"`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelParams {
    pub model: ModelInfo,
    pub defaults: ElementParam,
    #[serde(default)]
    pub elements: HashMap<String, ElementParam>,
    #[serde(default)]
    pub pairs: HashMap<String, PairParam>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid parameters in '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

const DEFAULT_STIFFNESS: f64 = 1.5;

impl ModelParams {
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.to_string_lossy())
    }

    /// Parses and validates parameters. `origin` only labels error messages.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ParamLoadError> {
        let params: ModelParams = toml::from_str(content).map_err(|e| ParamLoadError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        params.validate().map_err(|reason| ParamLoadError::Invalid {
            path: origin.to_string(),
            reason,
        })?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), String> {
        if !(self.model.cutoff.is_finite() && self.model.cutoff > 0.0) {
            return Err(format!("cutoff must be positive (got {})", self.model.cutoff));
        }
        let check_element = |label: &str, param: &ElementParam| -> Result<(), String> {
            if !(param.well_depth.is_finite() && param.well_depth >= 0.0) {
                return Err(format!("{}: well_depth must be non-negative", label));
            }
            if param.stiffness.is_some_and(|s| !(s.is_finite() && s > 0.0)) {
                return Err(format!("{}: stiffness must be positive", label));
            }
            if param.radius.is_some_and(|r| !(r.is_finite() && r > 0.0)) {
                return Err(format!("{}: radius must be positive", label));
            }
            Ok(())
        };
        check_element("defaults", &self.defaults)?;
        for (symbol, param) in &self.elements {
            Element::from_symbol(symbol).map_err(|e| e.to_string())?;
            check_element(symbol, param)?;
        }
        let mut seen = std::collections::HashSet::new();
        for (key, pair) in &self.pairs {
            let (a, b) = parse_pair_key(key)?;
            let ordered = if a.number() <= b.number() { (a, b) } else { (b, a) };
            if !seen.insert(ordered) {
                return Err(format!("pair {} is listed more than once", key));
            }
            if !(pair.well_depth.is_finite() && pair.well_depth >= 0.0) {
                return Err(format!("pair {}: well_depth must be non-negative", key));
            }
            if !(pair.equilibrium_distance.is_finite() && pair.equilibrium_distance > 0.0) {
                return Err(format!("pair {}: equilibrium_distance must be positive", key));
            }
            if pair.stiffness.is_some_and(|s| !(s.is_finite() && s > 0.0)) {
                return Err(format!("pair {}: stiffness must be positive", key));
            }
        }
        Ok(())
    }

    fn element_param(&self, element: Element) -> &ElementParam {
        self.elements.get(element.symbol()).unwrap_or(&self.defaults)
    }

    fn pair_override(&self, a: Element, b: Element) -> Option<&PairParam> {
        self.pairs.iter().find_map(|(key, pair)| match parse_pair_key(key) {
            Ok((x, y)) if (x == a && y == b) || (x == b && y == a) => Some(pair),
            _ => None,
        })
    }

    pub fn coefficients(&self, a: Element, b: Element) -> PairCoefficients {
        let default_stiffness = self.defaults.stiffness.unwrap_or(DEFAULT_STIFFNESS);
        let stiffness_of = |p: &ElementParam| p.stiffness.unwrap_or(default_stiffness);
        let pa = self.element_param(a);
        let pb = self.element_param(b);

        if let Some(pair) = self.pair_override(a, b) {
            return PairCoefficients {
                well_depth: pair.well_depth,
                equilibrium_distance: pair.equilibrium_distance,
                stiffness: pair
                    .stiffness
                    .unwrap_or(0.5 * (stiffness_of(pa) + stiffness_of(pb))),
            };
        }

        let radius_a = pa.radius.unwrap_or_else(|| a.covalent_radius());
        let radius_b = pb.radius.unwrap_or_else(|| b.covalent_radius());
        PairCoefficients {
            well_depth: (pa.well_depth * pb.well_depth).sqrt(),
            equilibrium_distance: radius_a + radius_b,
            stiffness: 0.5 * (stiffness_of(pa) + stiffness_of(pb)),
        }
    }
}

fn parse_pair_key(key: &str) -> Result<(Element, Element), String> {
    let (a, b) = key
        .split_once('-')
        .ok_or_else(|| format!("pair key '{}' must look like 'C-O'", key))?;
    let a = Element::from_symbol(a.trim()).map_err(|e| e.to_string())?;
    let b = Element::from_symbol(b.trim()).map_err(|e| e.to_string())?;
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
        [model]
        name = "test"
        potential = "morse"
        cutoff = 6.0

        [defaults]
        well_depth = 0.4
        stiffness = 1.2

        [elements.Cu]
        well_depth = 0.1
        radius = 1.3

        [pairs."C-O"]
        well_depth = 5.0
        equilibrium_distance = 1.16
        stiffness = 2.3
    "#;

    fn element(symbol: &str) -> Element {
        Element::from_symbol(symbol).unwrap()
    }

    #[test]
    fn load_succeeds_with_valid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.toml");
        fs::write(&path, SAMPLE).unwrap();

        let params = ModelParams::load(&path).unwrap();
        assert_eq!(params.model.potential, PotentialKind::Morse);
        assert_eq!(params.model.cutoff, 6.0);
        assert_eq!(params.elements["Cu"].radius, Some(1.3));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = ModelParams::load(&dir.path().join("non_existent.toml"));
        assert!(matches!(result, Err(ParamLoadError::Io { .. })));
    }

    #[test]
    fn load_fails_for_malformed_toml() {
        let result = ModelParams::from_toml_str("this is not toml", "inline");
        assert!(matches!(result, Err(ParamLoadError::Toml { .. })));
    }

    #[test]
    fn load_fails_for_invalid_values() {
        let bad = SAMPLE.replace("cutoff = 6.0", "cutoff = -1.0");
        assert!(matches!(
            ModelParams::from_toml_str(&bad, "inline"),
            Err(ParamLoadError::Invalid { .. })
        ));
        let bad_pair = SAMPLE.replace("\"C-O\"", "\"C-Xx\"");
        assert!(matches!(
            ModelParams::from_toml_str(&bad_pair, "inline"),
            Err(ParamLoadError::Invalid { .. })
        ));
    }

    #[test]
    fn explicit_pairs_override_mixing_in_either_order() {
        let params = ModelParams::from_toml_str(SAMPLE, "inline").unwrap();
        let forward = params.coefficients(element("C"), element("O"));
        let backward = params.coefficients(element("O"), element("C"));
        assert_eq!(forward, backward);
        assert_eq!(forward.well_depth, 5.0);
        assert_eq!(forward.equilibrium_distance, 1.16);
    }

    #[test]
    fn unlisted_pairs_are_mixed_from_elements() {
        let params = ModelParams::from_toml_str(SAMPLE, "inline").unwrap();
        let mixed = params.coefficients(element("Cu"), element("O"));
        assert!((mixed.well_depth - (0.1f64 * 0.4).sqrt()).abs() < 1e-12);
        assert!((mixed.equilibrium_distance - (1.3 + 0.66)).abs() < 1e-12);
        assert!((mixed.stiffness - 1.2).abs() < 1e-12);
    }
}
