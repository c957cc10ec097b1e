use adsorbent_search::core::forcefield::builtin::DEFAULT_MODEL;
use adsorbent_search::engine::config::{DEFAULT_FMAX, DEFAULT_MAX_STEPS};

pub struct DefaultsConfig {
    pub model_name: String,
    pub run_on_cpu: bool,
    pub fmax: f64,
    pub steps: usize,
    pub max_turns: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            run_on_cpu: false,
            fmax: DEFAULT_FMAX,
            steps: DEFAULT_MAX_STEPS,
            max_turns: 50,
        }
    }
}
