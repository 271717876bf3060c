//! Git activation: decides whether a workspace root is a git work tree.

use async_trait::async_trait;
use prerun_core::{ProviderKind, Result, Settings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::GitProvider;
use crate::command::{process_runner_factory, RunnerFactory};
use crate::provider::{Provider, ProviderActivator};

pub struct GitProviderActivator {
    git_path: PathBuf,
    runner_factory: RunnerFactory,
}

impl GitProviderActivator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            git_path: settings.git_executable(),
            runner_factory: process_runner_factory(),
        }
    }

    pub fn with_runner_factory(mut self, runner_factory: RunnerFactory) -> Self {
        self.runner_factory = runner_factory;
        self
    }
}

#[async_trait]
impl ProviderActivator for GitProviderActivator {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Git
    }

    #[instrument(skip(self), fields(root = %root.display()))]
    async fn try_activate_in_path(&self, root: &Path) -> Result<Option<Provider>> {
        let runner = (self.runner_factory)(root);

        match runner.run(&self.git_path, &["--version"]).await {
            Ok(output) if output.success => {
                debug!("Found {}", output.stdout.trim());
            }
            Ok(output) => {
                warn!("{} --version failed: {}", self.git_path.display(), output.stderr.trim());
                return Ok(None);
            }
            Err(e) => {
                warn!("Git executable not found: {}", e);
                return Ok(None);
            }
        }

        let output = runner
            .run(&self.git_path, &["rev-parse", "--is-inside-work-tree"])
            .await?;
        if !output.success || output.stdout.trim() != "true" {
            debug!("{} is not inside a git work tree", root.display());
            return Ok(None);
        }

        let provider = GitProvider::new(root, self.git_path.clone(), Arc::clone(&runner));
        Ok(Some(provider.into()))
    }
}
