//! TFVC activation: a root is a TFVC workspace when it carries a local
//! metadata directory and the `tf` client knows its mapping.

use async_trait::async_trait;
use prerun_core::{ProviderKind, Result, Settings};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use super::TfvcProvider;
use crate::command::{process_runner_factory, RunnerFactory};
use crate::provider::{Provider, ProviderActivator};

pub struct TfvcProviderActivator {
    tf_path: PathBuf,
    metadata_dirs: Vec<String>,
    runner_factory: RunnerFactory,
}

impl TfvcProviderActivator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            tf_path: settings.tf_executable(),
            metadata_dirs: settings.tfvc_metadata_dirs.clone(),
            runner_factory: process_runner_factory(),
        }
    }

    pub fn with_runner_factory(mut self, runner_factory: RunnerFactory) -> Self {
        self.runner_factory = runner_factory;
        self
    }

    fn has_metadata_dir(&self, root: &Path) -> bool {
        self.metadata_dirs.iter().any(|dir| root.join(dir).is_dir())
    }
}

#[async_trait]
impl ProviderActivator for TfvcProviderActivator {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tfvc
    }

    #[instrument(skip(self), fields(root = %root.display()))]
    async fn try_activate_in_path(&self, root: &Path) -> Result<Option<Provider>> {
        if !self.has_metadata_dir(root) {
            debug!("No TFVC metadata directory in {}", root.display());
            return Ok(None);
        }

        let runner = (self.runner_factory)(root);
        let root_arg = root.to_string_lossy().to_string();
        match runner.run(&self.tf_path, &["workfold", root_arg.as_str()]).await {
            Ok(output) if output.success => {}
            Ok(output) => {
                debug!("{} is not mapped: {}", root.display(), output.stderr.trim());
                return Ok(None);
            }
            Err(e) => {
                warn!("TFVC client not available: {}", e);
                return Ok(None);
            }
        }

        let provider = TfvcProvider::new(root, self.tf_path.clone(), runner);
        Ok(Some(provider.into()))
    }
}
