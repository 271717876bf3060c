//! Git provider driving the git command line.

use async_trait::async_trait;
use prerun_core::{CvsResource, MappingFileContent, PrerunError, ProviderKind, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::parser::{first_line, first_month_since, format_server_path, parse_porcelain_status};
use crate::checkin::CheckInInfo;
use crate::command::{CommandOutput, CommandRunner};
use crate::paths::root_relative;
use crate::provider::{CvsProvider, PendingChanges};

/// Git provider bound to one workspace root
pub struct GitProvider {
    root_path: PathBuf,
    git_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for GitProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitProvider")
            .field("root_path", &self.root_path)
            .field("git_path", &self.git_path)
            .field("runner", &"<CommandRunner>")
            .finish()
    }
}

impl GitProvider {
    pub fn new(
        root_path: impl Into<PathBuf>,
        git_path: PathBuf,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            git_path,
            runner,
        }
    }

    async fn git(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner
            .run(&self.git_path, args)
            .await?
            .into_checked(&self.git_path, args)
    }

    /// Staged changes under the root, from `git status --porcelain`
    #[instrument(skip(self), fields(root = %self.root_path.display()))]
    pub async fn get_local_resources(&self) -> Result<Vec<CvsResource>> {
        let output = self.git(&["status", "--porcelain"]).await?;
        if output.stdout.trim().is_empty() {
            debug!("git status didn't find staged files");
            return Ok(Vec::new());
        }
        Ok(parse_porcelain_status(&self.root_path, &output.stdout))
    }

    /// Upstream of the current branch, e.g. `origin/main`
    pub async fn get_remote_branch(&self) -> Result<String> {
        let output = self
            .git(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{upstream}"])
            .await?;
        let remote_branch = output.stdout.replace('\'', "").trim().to_string();
        if remote_branch.is_empty() {
            return Err(PrerunError::Parse("Remote branch wasn't determined".to_string()));
        }
        debug!("Remote branch is {}", remote_branch);
        Ok(remote_branch)
    }

    /// Last revision shared with the upstream branch.
    ///
    /// This is the merge base, not the latest local commit.
    pub async fn get_last_revision(&self, remote_branch: &str) -> Result<String> {
        let output = self.git(&["merge-base", "HEAD", remote_branch]).await?;
        let last_rev = first_line(&output.stdout).to_string();
        if last_rev.is_empty() {
            return Err(PrerunError::Parse(
                "Revision of last commit wasn't determined".to_string(),
            ));
        }
        debug!("Last merge-based revision is {}", last_rev);
        Ok(last_rev)
    }

    /// Oldest commit of the current month on HEAD, or empty if none
    pub async fn get_first_month_revision(&self, today: chrono::NaiveDate) -> Result<String> {
        let since = format!("--since={}", first_month_since(today));
        let output = self.git(&["rev-list", "--reverse", since.as_str(), "HEAD"]).await?;
        let first_rev = first_line(&output.stdout).to_string();
        if first_rev.is_empty() {
            debug!("First month revision wasn't determined, continuing without it");
        }
        Ok(first_rev)
    }

    /// Current branch name
    #[instrument(skip(self), fields(root = %self.root_path.display()))]
    pub async fn get_repo_branch_name(&self) -> Result<String> {
        let output = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let branch = output.stdout.trim().to_string();
        if branch.is_empty() {
            return Err(PrerunError::Parse("Branch name wasn't determined".to_string()));
        }
        Ok(branch)
    }

    /// Content of the staged (index) version of a resource
    pub async fn get_staged_file_content(&self, resource: &CvsResource) -> Result<String> {
        let spec = format!(":{}", resource.label());
        let output = self.git(&["show", spec.as_str()]).await?;
        Ok(output.stdout)
    }

    /// URL of the default remote
    pub async fn get_remote_url(&self) -> Result<String> {
        let output = self.git(&["ls-remote", "--get-url"]).await?;
        let remote_url = output.stdout.trim().to_string();
        if remote_url.is_empty() {
            return Err(PrerunError::Parse("Remote url wasn't determined".to_string()));
        }
        Ok(remote_url)
    }

    /// Entry of `.teamcity-mappings.properties` mapping this root to the
    /// CI server's VCS root
    pub async fn mapping_file_content(&self) -> Result<MappingFileContent> {
        let remote_url = self.get_remote_url().await?;
        let mapping = MappingFileContent::git(&self.root_path, &remote_url);
        debug!("Mapping file content: {}", mapping.full_content);
        Ok(mapping)
    }

    async fn format_for_remote_run(&self, resources: Vec<CvsResource>) -> Result<Vec<CvsResource>> {
        let remote_branch = self.get_remote_branch().await?;
        let first_month_rev = self
            .get_first_month_revision(chrono::Local::now().date_naive())
            .await?;
        let last_rev = self.get_last_revision(&remote_branch).await?;

        Ok(resources
            .into_iter()
            .map(|resource| {
                let relative = root_relative(&self.root_path, resource.path());
                let server_path = format_server_path(&first_month_rev, &last_rev, &relative);
                debug!("Formatted file path: {}", server_path);
                resource.with_server_file_path(server_path)
            })
            .collect())
    }
}

#[async_trait]
impl CvsProvider for GitProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Git
    }

    fn root_path(&self) -> &Path {
        &self.root_path
    }

    async fn pending_changes(&self) -> Result<PendingChanges> {
        let resources = self.get_local_resources().await?;
        if resources.is_empty() {
            return Ok(PendingChanges::default());
        }

        Ok(PendingChanges {
            resources: self.format_for_remote_run(resources).await?,
            server_items: Vec::new(),
        })
    }

    async fn commit(&self, _check_in_info: &CheckInInfo) -> Result<()> {
        warn!(
            "Commit is not supported for git, leaving {} untouched",
            self.root_path.display()
        );
        Ok(())
    }
}
