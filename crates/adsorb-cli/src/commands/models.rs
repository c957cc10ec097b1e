use crate::cli::{ModelsArgs, ModelsCommands};
use crate::config::default_cache_dir;
use crate::data::{DownloadProgress, ModelManager};
use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

pub async fn run(args: ModelsArgs) -> Result<()> {
    let cache_dir = match args.model_local_cache {
        Some(dir) => dir,
        None => default_cache_dir()?,
    };
    let manager = ModelManager::new(cache_dir);

    match args.command {
        ModelsCommands::List => handle_list(&manager)?,
        ModelsCommands::Path { name } => handle_path(&manager, name)?,
        ModelsCommands::Fetch { name, url, force } => {
            handle_fetch(&manager, &name, &url, force).await?;
        }
    }
    Ok(())
}

fn handle_list(manager: &ModelManager) -> Result<()> {
    println!("Model cache: {}", manager.cache_dir().display());
    let entries = manager.list()?;
    if entries.is_empty() {
        println!("No models available.");
    }
    for entry in entries {
        let source = match (entry.cached, entry.builtin) {
            (true, true) => "cached, built-in",
            (true, false) => "cached",
            (false, _) => "built-in",
        };
        println!("  {:<24} ({})", entry.name, source);
    }
    Ok(())
}

fn handle_path(manager: &ModelManager, name: Option<String>) -> Result<()> {
    let path: PathBuf = match name {
        Some(name) => manager.checkpoint_path(&name)?,
        None => manager.cache_dir().to_path_buf(),
    };
    println!("{}", path.display());
    Ok(())
}

async fn handle_fetch(manager: &ModelManager, name: &str, url: &str, force: bool) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .expect("Failed to create progress bar template")
        .progress_chars("#>-"),
    );
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr_with_hz(2));

    println!("Downloading '{}' into: {}", name, manager.cache_dir().display());

    let progress_callback = |progress: DownloadProgress| match progress {
        DownloadProgress::Started { total_size } => {
            if let Some(size) = total_size {
                pb.set_length(size);
            }
            pb.set_message("Downloading...");
        }
        DownloadProgress::Downloading { downloaded } => {
            pb.set_position(downloaded);
        }
        DownloadProgress::Installing => {
            pb.set_message("Validating checkpoint...");
        }
    };

    match manager
        .download_checkpoint(name, url, force, progress_callback)
        .await
    {
        Ok(path) => {
            pb.finish_with_message("✓ Download complete.");
            println!("✓ Checkpoint installed at: {}", path.display());
            Ok(())
        }
        Err(e) => {
            pb.finish_with_message("✗ Download failed.");
            Err(e)
        }
    }
}
