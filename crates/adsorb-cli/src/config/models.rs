use adsorbent_search::engine::config::RelaxationConfig;
use std::path::PathBuf;

pub struct AppConfig {
    pub relaxation: RelaxationConfig,
    pub max_turns: usize,
    pub history: Option<PathBuf>,
}
