use crate::cli::SearchArgs;
use crate::config::build_config;
use crate::error::{CliError, Result};
use adsorbent_search::workflows::search::{
    ScriptedAgent, SearchOutcome, SearchSession, run_search, write_history_csv,
};
use tracing::{info, warn};

pub async fn run(args: SearchArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = build_config(&args.relaxation, args.max_turns, args.history.clone())?;

    info!("Loading agent script from {:?}", &args.script);
    let mut agent = ScriptedAgent::from_path(&args.script)?;
    let mut session = SearchSession::new(config.relaxation);

    println!("Starting adsorbent search: {}", args.goal);
    let outcome = tokio::task::block_in_place(|| {
        run_search(&args.goal, &mut session, &mut agent, config.max_turns)
    })?;

    print_transcript(&outcome);

    info!(
        evaluations = session.history().len(),
        materials = session.registry().len(),
        "Search finished after {} turn(s)",
        outcome.turns
    );

    if let Some(path) = &config.history {
        write_history_csv(session.history(), path).map_err(|e| CliError::FileParsing {
            path: path.clone(),
            source: e.into(),
        })?;
        println!(
            "✓ {} evaluation(s) written to: {}",
            session.history().len(),
            path.display()
        );
    }

    match outcome.output {
        Some(output) => {
            println!("\n{}", output);
            Ok(())
        }
        None => {
            warn!("The agent did not produce a final answer.");
            Err(CliError::Other(anyhow::anyhow!(
                "No final output after {} turns",
                config.max_turns
            )))
        }
    }
}

fn print_transcript(outcome: &SearchOutcome) {
    // The system prompt and the goal are the first two messages.
    for message in outcome.messages.iter().skip(2) {
        println!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RelaxationArgs;
    use std::fs;
    use tempfile::tempdir;

    const SCRIPT: &str = r#"{
        "turns": [
            {
                "content": "Start with copper.",
                "tool_calls": [
                    {
                        "name": "add_adsorbent",
                        "arguments": {
                            "name": "Cu1",
                            "code": "fn create_adsorbent() { atom Cu [0, 0, 0] }",
                            "method_of_synthesis": "sputtering"
                        }
                    },
                    {
                        "name": "test_molecule_on_adsorbent",
                        "arguments": { "adsorbate": "CO", "adsorbent_name": "Cu1" }
                    }
                ]
            }
        ],
        "final_output": "Cu1 binds CO."
    }"#;

    fn args(dir: &std::path::Path, max_turns: usize) -> SearchArgs {
        let script = dir.join("script.json");
        fs::write(&script, SCRIPT).unwrap();
        SearchArgs {
            goal: "Bind CO".to_string(),
            script,
            max_turns: Some(max_turns),
            history: Some(dir.join("history.csv")),
            relaxation: RelaxationArgs {
                model_local_cache: Some(dir.join("cache")),
                steps: Some(5),
                ..RelaxationArgs::default()
            },
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn search_writes_history() {
        let dir = tempdir().unwrap();
        run(args(dir.path(), 5)).await.unwrap();

        let history = fs::read_to_string(dir.path().join("history.csv")).unwrap();
        let lines: Vec<_> = history.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("Cu1,CO,"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn turn_limit_is_an_error() {
        let dir = tempdir().unwrap();
        let result = run(args(dir.path(), 1)).await;
        assert!(matches!(result, Err(CliError::Other(_))));
        assert!(dir.path().join("history.csv").exists());
    }
}
