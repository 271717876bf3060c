//! prerun CLI - collect local changes for a CI remote run
//!
//! Usage:
//!   prerun init             Write a default `.prerun/config.toml`
//!   prerun status           Show pending changes per workspace root
//!   prerun files            Print the file names to send to the CI server
//!   prerun select           Choose files interactively, then print their names
//!   prerun branch           Show the Git branch shared by all roots
//!   prerun mapping          Print the VCS root mapping entries
//!   prerun commit           Choose files, ask for a message and commit them

mod terminal;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prerun_core::Settings;
use prerun_vcs::{CheckInInfo, ProviderProxy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use terminal::{TerminalContext, TerminalPrompt};

#[derive(Parser)]
#[command(name = "prerun")]
#[command(author, version, about = "Collect local changes for a CI remote run")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to .prerun/config.toml in the first root)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable experimental Git support
    #[arg(long, global = true)]
    git: bool,

    /// Workspace root to inspect (repeatable, defaults to the current directory)
    #[arg(long = "root", global = true, value_name = "DIR")]
    roots: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write default settings
    Init {
        /// Workspace root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show pending changes per workspace root
    Status,

    /// Print the file names to send to the CI server
    Files,

    /// Choose files interactively, then print their names
    Select,

    /// Show the Git branch shared by all roots
    Branch,

    /// Print the VCS root mapping entries
    Mapping,

    /// Choose files, ask for a commit message and commit them
    Commit,
}

impl Cli {
    fn workspace_roots(&self) -> Vec<PathBuf> {
        if self.roots.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.roots.clone()
        }
    }

    fn load_settings(&self, roots: &[PathBuf]) -> Result<Settings> {
        let settings = match (&self.config, roots.first()) {
            (Some(path), _) => Settings::load_from(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            (None, Some(root)) => Settings::load_or_default(root)
                .with_context(|| format!("Failed to load settings for {}", root.display()))?,
            (None, None) => Settings::default(),
        };

        if self.git {
            Ok(settings.with_git_supported(true))
        } else {
            Ok(settings)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Commands::Init { path } = &cli.command {
        return cmd_init(path);
    }

    let proxy = discover(&cli).await?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Status => cmd_status(&proxy).await,
        Commands::Files => cmd_files(&proxy).await,
        Commands::Select => cmd_select(&proxy).await,
        Commands::Branch => cmd_branch(&proxy).await,
        Commands::Mapping => cmd_mapping(&proxy).await,
        Commands::Commit => cmd_commit(&proxy).await,
    }
}

/// Composition root: settings, activators and the terminal collaborators
async fn discover(cli: &Cli) -> Result<ProviderProxy> {
    let roots = cli.workspace_roots();
    let settings = cli.load_settings(&roots)?;
    debug!("Settings: {:?}", settings);

    let proxy = ProviderProxy::with_defaults(
        settings,
        Arc::new(TerminalPrompt),
        Arc::new(TerminalContext),
    );
    let count = proxy
        .discover_providers(&roots)
        .await
        .context("Failed to discover version control providers")?;
    info!("{} provider(s) active", count);

    Ok(proxy)
}

async fn pending(proxy: &ProviderProxy) -> Result<Vec<CheckInInfo>> {
    proxy
        .get_required_check_in_info()
        .await
        .context("Failed to collect local changes")
}

fn cmd_init(path: &Path) -> Result<()> {
    let written = Settings::write_default(path)
        .with_context(|| format!("Failed to write settings in {}", path.display()))?;
    println!("Wrote {}", written.display());
    Ok(())
}

async fn cmd_status(proxy: &ProviderProxy) -> Result<()> {
    let infos = pending(proxy).await?;
    if infos.is_empty() {
        println!("No pending changes");
        return Ok(());
    }

    for info in &infos {
        println!(
            "{} ({}, {} change(s))",
            info.root_path().display(),
            info.provider().kind(),
            info.resources().len()
        );
        for line in proxy.describe(std::slice::from_ref(info)) {
            println!("  {}", line);
        }
    }
    Ok(())
}

async fn cmd_files(proxy: &ProviderProxy) -> Result<()> {
    let infos = pending(proxy).await?;
    for name in proxy.get_formatted_file_names(&infos) {
        println!("{}", name);
    }
    Ok(())
}

async fn cmd_select(proxy: &ProviderProxy) -> Result<()> {
    let infos = proxy.select_resources(pending(proxy).await?).await;
    for name in proxy.get_formatted_file_names(&infos) {
        println!("{}", name);
    }
    Ok(())
}

async fn cmd_branch(proxy: &ProviderProxy) -> Result<()> {
    let branch = proxy
        .get_git_branch()
        .await
        .context("Failed to determine the Git branch")?;
    println!("{}", branch);
    Ok(())
}

async fn cmd_mapping(proxy: &ProviderProxy) -> Result<()> {
    let contents = proxy
        .get_mapping_file_contents()
        .await
        .context("Failed to build mapping entries")?;
    for content in contents {
        println!("{}", content.full_content);
    }
    Ok(())
}

async fn cmd_commit(proxy: &ProviderProxy) -> Result<()> {
    let mut infos = proxy.select_resources(pending(proxy).await?).await;
    if infos.is_empty() {
        println!("Nothing to commit");
        return Ok(());
    }

    proxy
        .request_for_post_commit(&mut infos)
        .await
        .context("Post-commit did not complete")?;
    println!("Committed {} root(s)", infos.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["prerun", "status", "--git", "--root", "/a", "--root", "/b"])
            .unwrap();
        assert!(cli.git);
        assert_eq!(cli.workspace_roots(), vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_roots_default_to_current_directory() {
        let cli = Cli::try_parse_from(["prerun", "files"]).unwrap();
        assert_eq!(cli.workspace_roots(), vec![PathBuf::from(".")]);
    }

    #[test]
    fn test_git_flag_overrides_settings() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let cli = Cli::try_parse_from(["prerun", "--git", "branch"]).unwrap();

        let settings = cli.load_settings(&[root]).unwrap();
        assert!(settings.git_supported);
    }

    #[test]
    fn test_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("prerun.toml");
        std::fs::write(&path, "git_supported = true\ntf_path = \"/opt/tee/tf\"\n").unwrap();
        let cli = Cli::try_parse_from(["prerun", "--config", path.to_str().unwrap(), "mapping"])
            .unwrap();

        let settings = cli.load_settings(&cli.workspace_roots()).unwrap();
        assert!(settings.git_supported);
        assert_eq!(settings.tf_executable(), PathBuf::from("/opt/tee/tf"));
    }
}
