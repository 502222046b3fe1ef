mod cli;
mod standalone;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use cli::{Cli, Commands};
use standalone::SnapshotServer;
use watch_node_modules::config::WatchConfig;
use watch_node_modules::correlate::canonicalize;
use watch_node_modules::logging;
use watch_node_modules::resolver::resolve_package_roots;
use watch_node_modules::{PluginOptions, WatchNodeModules};

/// Resolve the working directory, load its config file and start logging.
fn prepare(cwd: Option<PathBuf>) -> Result<(PathBuf, WatchConfig)> {
    let cwd = match cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let config = WatchConfig::load(&cwd);
    logging::init(config.log_level.as_deref().unwrap_or(logging::DEFAULT_LEVEL));
    Ok((cwd, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            packages,
            cwd,
            json,
        } => {
            let (cwd, _) = prepare(cwd)?;
            let resolved = resolve_package_roots(&packages, &cwd);

            if json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                for package in &resolved {
                    println!("{}", package.target);
                    if package.roots.is_empty() {
                        println!("  (not found)");
                    }
                    for root in &package.roots {
                        println!("  {}", root.display());
                    }
                }
            }
        }

        Commands::Inspect { path, cwd, json } => {
            let (cwd, _) = prepare(cwd)?;
            let set = canonicalize(&path, &cwd);

            if json {
                println!("{}", serde_json::to_string_pretty(&set)?);
            } else {
                println!("absolute:         {}", set.absolute);
                println!("absolute (/):     {}", set.absolute_forward);
                println!("resolved:         {}", set.resolved);
                println!("resolved (/):     {}", set.resolved_forward);
                println!(
                    "package fragment: {}",
                    set.package_fragment.as_deref().unwrap_or("-")
                );
                println!("file fragment:    {}", set.file_fragment);
            }
        }

        Commands::Watch {
            packages,
            cwd,
            modules,
            debounce_ms,
            ext,
        } => {
            let (cwd, config) = prepare(cwd)?;

            let packages = if packages.is_empty() {
                config.packages.unwrap_or_default()
            } else {
                packages
            };
            if packages.is_empty() {
                bail!("no packages to watch: pass package names or set `packages` in the config file");
            }

            let mut options = PluginOptions {
                cwd: Some(cwd),
                ..Default::default()
            };
            if let Some(ms) = debounce_ms.or(config.debounce_ms) {
                options.debounce = Duration::from_millis(ms);
            }
            if !ext.is_empty() {
                options.extensions = ext;
            } else if let Some(extensions) = config.extensions {
                options.extensions = extensions;
            }

            let plugin = WatchNodeModules::new(packages, options);
            let server = Arc::new(SnapshotServer::new(modules));
            let session = plugin.configure_server(Arc::clone(&server)).await?;
            if !session.is_watching() {
                bail!("nothing to watch");
            }

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            server.shutdown();
            session.stopped().await;
        }
    }

    Ok(())
}
