use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Adam Wentz",
    version,
    about = "adsorb - search for adsorbent materials by letting an agent propose structures and relaxing test molecules on them.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an agent-driven adsorbent search towards a goal.
    Search(SearchArgs),
    /// Compile a material definition and build its structure.
    Check(CheckArgs),
    /// Relax one molecule on one material definition and report the metrics.
    Evaluate(EvaluateArgs),
    /// Manage the local model checkpoint cache.
    Models(ModelsArgs),
}

/// Relaxation options shared by `search` and `evaluate`.
#[derive(Args, Debug, Clone, Default)]
pub struct RelaxationArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Name of the model checkpoint to load from the cache.
    #[arg(long, value_name = "NAME")]
    pub model_name: Option<String>,

    /// Directory holding cached model checkpoints.
    #[arg(long, value_name = "PATH")]
    pub model_local_cache: Option<PathBuf>,

    /// Explicit checkpoint file. Takes precedence over --model-name.
    #[arg(long, value_name = "PATH")]
    pub checkpoint_path: Option<PathBuf>,

    /// Force the model to run on the CPU.
    #[arg(long)]
    pub cpu: bool,

    /// Force convergence threshold in eV/Angstrom.
    #[arg(long, value_name = "FLOAT")]
    pub fmax: Option<f64>,

    /// Maximum number of optimizer steps per relaxation stage.
    #[arg(long, value_name = "INT")]
    pub steps: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S placement.height=1.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `search` subcommand.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// The goal the adsorbent should meet, in plain language.
    #[arg(required = true)]
    pub goal: String,

    /// JSON script replayed as the agent's turns.
    #[arg(long, required = true, value_name = "PATH")]
    pub script: PathBuf,

    /// Maximum number of agent turns before giving up.
    #[arg(long, value_name = "INT")]
    pub max_turns: Option<usize>,

    /// Write every evaluation of the search to this CSV file.
    #[arg(long, value_name = "PATH")]
    pub history: Option<PathBuf>,

    #[command(flatten)]
    pub relaxation: RelaxationArgs,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Material definition source file.
    #[arg(required = true, value_name = "PATH")]
    pub definition: PathBuf,

    /// Generator to invoke. Defaults to `create_adsorbent`.
    #[arg(short, long, value_name = "NAME")]
    pub function: Option<String>,

    /// Write the generated structure as extended XYZ.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `evaluate` subcommand.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Chemical formula of the adsorbate (e.g., CO2).
    #[arg(required = true)]
    pub formula: String,

    /// Material definition source file.
    #[arg(required = true, value_name = "PATH")]
    pub definition: PathBuf,

    /// Write the adsorbate relaxation trajectory as extended XYZ.
    #[arg(short, long, value_name = "PATH")]
    pub trajectory: Option<PathBuf>,

    /// Print the metrics as JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub relaxation: RelaxationArgs,
}

/// Arguments for the `models` subcommand.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Directory holding cached model checkpoints.
    #[arg(long, global = true, value_name = "PATH")]
    pub model_local_cache: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ModelsCommands,
}

/// Available commands for checkpoint management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommands {
    /// List cached and built-in models.
    List,
    /// Show the checkpoint path of a model, or the cache directory.
    Path {
        /// Model name.
        name: Option<String>,
    },
    /// Download a checkpoint into the cache.
    Fetch {
        /// Name to store the checkpoint under.
        #[arg(required = true)]
        name: String,
        /// URL of the checkpoint file.
        #[arg(long, required = true)]
        url: String,
        /// Overwrite an existing checkpoint.
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_search_with_relaxation_overrides() {
        let cli = Cli::try_parse_from([
            "adsorb", "-vv", "search", "capture CO2", "--script", "agent.json", "--fmax", "0.05",
            "--steps", "20", "--cpu", "-S", "placement.height=1.5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.goal, "capture CO2");
        assert_eq!(args.relaxation.fmax, Some(0.05));
        assert_eq!(args.relaxation.steps, Some(20));
        assert!(args.relaxation.cpu);
        assert_eq!(args.relaxation.set_values, vec!["placement.height=1.5"]);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["adsorb", "-q", "-v", "models", "list"]).is_err());
    }

    #[test]
    fn fetch_requires_url() {
        assert!(Cli::try_parse_from(["adsorb", "models", "fetch", "m"]).is_err());
        assert!(
            Cli::try_parse_from(["adsorb", "models", "fetch", "m", "--url", "http://x/m.toml"])
                .is_ok()
        );
    }
}
