#![allow(clippy::multiple_crate_versions)] // reqwest still pulls hyper 0.14 alongside axum's hyper 1

use annotix_connector::config::Config;
use annotix_connector::dataset::NativeDialogPicker;
use annotix_connector::modules::ModuleManager;
use annotix_connector::server::{self, AppState};
use annotix_connector::training::RunCoordinator;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "annotix-connector")]
#[command(version)]
#[command(about = "Local companion server for Annotix model training", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the companion server (default)
    Serve,
    /// Manage training modules
    Modules {
        #[command(subcommand)]
        command: ModuleCommands,
    },
}

#[derive(Subcommand)]
enum ModuleCommands {
    /// List installed and available modules
    List,
    /// Download and install a module
    Install { module_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        None | Some(Commands::Serve) => run_server(config).await,
        Some(Commands::Modules { command }) => match command {
            ModuleCommands::List => list_modules(&config).await,
            ModuleCommands::Install { module_id } => install_module(&config, &module_id).await,
        },
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let modules = ModuleManager::new(&config)?;
    let coordinator = RunCoordinator::new(
        config.training.default_epochs,
        config.training.clear_active_on_failure,
    );

    tracing::info!("Annotix connector v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Modules directory: {}", config.storage.modules_dir()?.display());
    tracing::info!("Installed modules: {:?}", modules.installed_ids().await);

    let state = Arc::new(AppState {
        modules,
        coordinator,
        picker: Arc::new(NativeDialogPicker),
    });

    server::serve(&config, state).await?;
    Ok(())
}

async fn list_modules(config: &Config) -> anyhow::Result<()> {
    let manager = ModuleManager::new(config)?;

    let installed = manager.installed().await;
    println!("Installed:");
    for id in manager.installed_ids().await {
        println!("  {id} ({})", installed[&id].version);
    }

    let manifest = manager.remote_manifest().await;
    println!("Available:");
    for descriptor in &manifest.modules {
        if !installed.contains_key(&descriptor.id) {
            println!("  {} ({})", descriptor.id, descriptor.version);
        }
    }

    Ok(())
}

async fn install_module(config: &Config, module_id: &str) -> anyhow::Result<()> {
    let manager = ModuleManager::new(config)?;

    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template(
        "{msg} [{bar:40.cyan/blue}] {pos}%",
    )?);
    bar.set_message(format!("Downloading {module_id}"));

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let on_progress = |percent: f64| bar.set_position(percent.clamp(0.0, 100.0) as u64);
    manager.install(module_id, Some(&on_progress)).await?;

    bar.finish_and_clear();
    println!("✓ Installed module '{module_id}'");

    Ok(())
}
