//! Parameter sets shipped with the library. They are written into the checkpoint
//! cache on first use, exactly like a downloaded checkpoint would be.

const MORSE_COVALENT: &str = r#"# Morse pair potential with covalent-radius equilibrium distances.
[model]
name = "morse-covalent"
potential = "morse"
cutoff = 6.0

[defaults]
well_depth = 0.5
stiffness = 1.6

[elements.Cu]
well_depth = 0.34
stiffness = 1.36

[elements.Ag]
well_depth = 0.33
stiffness = 1.37

[elements.Au]
well_depth = 0.47
stiffness = 1.58

[elements.Ni]
well_depth = 0.42
stiffness = 1.42

[elements.Pd]
well_depth = 0.45
stiffness = 1.45

[elements.Pt]
well_depth = 0.65
stiffness = 1.60

[pairs."C-O"]
well_depth = 5.5
equilibrium_distance = 1.16
stiffness = 2.3

[pairs."O-O"]
well_depth = 5.1
equilibrium_distance = 1.21
stiffness = 2.7

[pairs."N-N"]
well_depth = 9.8
equilibrium_distance = 1.10
stiffness = 2.7

[pairs."H-H"]
well_depth = 4.5
equilibrium_distance = 0.74
stiffness = 1.9

[pairs."O-H"]
well_depth = 4.6
equilibrium_distance = 0.97
stiffness = 2.2

[pairs."C-H"]
well_depth = 4.3
equilibrium_distance = 1.09
stiffness = 1.8

[pairs."N-H"]
well_depth = 4.0
equilibrium_distance = 1.01
stiffness = 2.0
"#;

const LJ_GENERIC: &str = r#"# Lennard-Jones 12-6 with weak generic wells. Useful as a smoke-test model.
[model]
name = "lj-generic"
potential = "lennard-jones"
cutoff = 8.0

[defaults]
well_depth = 0.05
"#;

const BUILTIN_MODELS: &[(&str, &str)] = &[("morse-covalent", MORSE_COVALENT), ("lj-generic", LJ_GENERIC)];

/// Name of the model used when none is configured.
pub const DEFAULT_MODEL: &str = "morse-covalent";

/// Parameter file contents of a built-in model.
pub fn builtin_model(name: &str) -> Option<&'static str> {
    BUILTIN_MODELS
        .iter()
        .find(|(model, _)| *model == name)
        .map(|(_, content)| *content)
}

pub fn builtin_model_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_MODELS.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::ModelParams;

    #[test]
    fn every_builtin_model_parses_and_matches_its_name() {
        for name in builtin_model_names() {
            let content = builtin_model(name).unwrap();
            let params = ModelParams::from_toml_str(content, name).unwrap();
            assert_eq!(params.model.name, name);
        }
    }

    #[test]
    fn default_model_is_builtin() {
        assert!(builtin_model(DEFAULT_MODEL).is_some());
        assert!(builtin_model("equiformer_v2").is_none());
    }
}
