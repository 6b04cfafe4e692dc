//! Watch command - process every image created in a directory.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tracing::{error, info, warn};

use dlscan_core::store::RecordStore;
use dlscan_core::watch::{watch_directory, Dispatcher, PipelineRunner};

use super::load_config;

/// Arguments for the watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Directory to watch (default: `watch.directory` from the config)
    directory: Option<PathBuf>,
}

/// Runs `dlscan process <image>` as a child process per file, so a failing
/// or hanging run never blocks the watcher.
struct ChildProcessRunner {
    exe: PathBuf,
    config: Option<PathBuf>,
}

impl PipelineRunner for ChildProcessRunner {
    fn dispatch(&self, path: &Path) {
        let mut command = tokio::process::Command::new(&self.exe);
        if let Some(config) = &self.config {
            command.arg("--config").arg(config);
        }
        command.arg("process").arg(path);

        let path = path.to_path_buf();
        tokio::spawn(async move {
            match command.status().await {
                Ok(status) if status.success() => info!("Finished {}", path.display()),
                Ok(status) => warn!("Processing {} failed ({})", path.display(), status),
                Err(e) => error!("Could not start processing of {}: {}", path.display(), e),
            }
        });
    }
}

pub async fn run(args: WatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let directory = args.directory.unwrap_or_else(|| config.watch.directory.clone());

    let store = RecordStore::from_config(&config.store);
    tokio::task::spawn_blocking(move || store.ensure_schema()).await??;

    let runner = ChildProcessRunner {
        exe: std::env::current_exe()?,
        config: config_path.map(Path::to_path_buf),
    };
    let mut dispatcher = Dispatcher::new(runner, &config.watch);

    let (_watcher, mut events) = watch_directory(&directory)?;
    println!("{} Watching: {}", style("ℹ").blue(), directory.display());

    dispatcher
        .run(&mut events, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Could not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    println!("Observer Stopped");
    Ok(())
}
