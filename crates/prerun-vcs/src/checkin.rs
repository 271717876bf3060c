//! Check-in info: one backend root's pending change set.

use prerun_core::CvsResource;
use std::path::Path;

use crate::provider::Provider;

/// Changes pending submission for one provider
///
/// Created fresh for every remote-run operation and dropped afterwards.
/// For centralized backends `server_items` holds one entry per resource, in
/// the same order.
#[derive(Debug, Clone)]
pub struct CheckInInfo {
    resources: Vec<CvsResource>,
    provider: Provider,
    /// Commit message, set by the user before a post-commit
    pub message: String,
    server_items: Vec<String>,
    work_item_ids: Vec<u32>,
}

impl CheckInInfo {
    pub fn new(resources: Vec<CvsResource>, provider: Provider) -> Self {
        Self {
            resources,
            provider,
            message: String::new(),
            server_items: Vec::new(),
            work_item_ids: Vec::new(),
        }
    }

    pub fn with_server_items(mut self, server_items: Vec<String>) -> Self {
        self.server_items = server_items;
        self
    }

    pub fn with_work_item_ids(mut self, work_item_ids: Vec<u32>) -> Self {
        self.work_item_ids = work_item_ids;
        self
    }

    pub fn resources(&self) -> &[CvsResource] {
        &self.resources
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Root of the owning provider
    pub fn root_path(&self) -> &Path {
        self.provider.root_path()
    }

    pub fn server_items(&self) -> &[String] {
        &self.server_items
    }

    pub fn work_item_ids(&self) -> &[u32] {
        &self.work_item_ids
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Names of the changed files in the format the CI server expects for
    /// a remote run. Each backend formats its own paths:
    ///
    /// * Git: `jetbrains.git://<revisions>||/<relative path>`
    /// * TFVC: `http[s]://<server>:<port>/<collection>/$/<server item>`
    pub fn formatted_file_names(&self) -> Vec<String> {
        self.resources
            .iter()
            .map(|resource| resource.server_file_path().to_string())
            .collect()
    }

    /// Keep only the resources matching `keep`
    pub fn retain_resources<F>(&mut self, mut keep: F)
    where
        F: FnMut(&CvsResource) -> bool,
    {
        let decisions: Vec<bool> = self.resources.iter().map(&mut keep).collect();

        if self.server_items.len() == self.resources.len() {
            let mut flags = decisions.iter();
            self.server_items
                .retain(|_| flags.next().copied().unwrap_or(false));
        }

        let mut flags = decisions.iter();
        self.resources
            .retain(|_| flags.next().copied().unwrap_or(false));
    }
}
