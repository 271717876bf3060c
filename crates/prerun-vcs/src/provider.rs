//! VCS provider contract and the tagged provider handle.

use async_trait::async_trait;
use prerun_core::{CvsResource, ProviderKind, Result};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::checkin::CheckInInfo;
use crate::git::GitProvider;
use crate::tfvc::TfvcProvider;

/// Pending changes reported by one provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    pub resources: Vec<CvsResource>,
    /// Server item per resource (centralized backends only)
    pub server_items: Vec<String>,
}

/// Trait defining the interface that every VCS provider implements.
///
/// A provider is bound to one workspace root for its whole life.
#[async_trait]
pub trait CvsProvider: Send + Sync + fmt::Debug {
    fn kind(&self) -> ProviderKind;

    /// The workspace root this provider is bound to
    fn root_path(&self) -> &Path;

    /// Collect the local changes under the root. Never cached.
    async fn pending_changes(&self) -> Result<PendingChanges>;

    /// Submit the changes of a check-in info owned by this provider
    async fn commit(&self, check_in_info: &CheckInInfo) -> Result<()>;
}

/// Handle to an active provider
///
/// Cloning is cheap; every clone refers to the same provider instance.
#[derive(Debug, Clone)]
pub enum Provider {
    Git(Arc<GitProvider>),
    Tfvc(Arc<TfvcProvider>),
}

impl Provider {
    fn as_cvs(&self) -> &dyn CvsProvider {
        match self {
            Self::Git(git) => git.as_ref(),
            Self::Tfvc(tfvc) => tfvc.as_ref(),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.as_cvs().kind()
    }

    pub fn root_path(&self) -> &Path {
        self.as_cvs().root_path()
    }

    /// Git-only operations (branch name, staged content, remote url)
    pub fn as_git(&self) -> Option<&GitProvider> {
        match self {
            Self::Git(git) => Some(git),
            Self::Tfvc(_) => None,
        }
    }

    /// Collect the pending changes and wrap them in a check-in info owned by
    /// this provider
    pub async fn get_required_check_in_info(&self) -> Result<CheckInInfo> {
        let changes = self.as_cvs().pending_changes().await?;
        debug!(
            "{} provider at {} reported {} changed resource(s)",
            self.kind(),
            self.root_path().display(),
            changes.resources.len()
        );

        Ok(CheckInInfo::new(changes.resources, self.clone())
            .with_server_items(changes.server_items))
    }

    pub async fn commit(&self, check_in_info: &CheckInInfo) -> Result<()> {
        self.as_cvs().commit(check_in_info).await
    }

    /// True when both handles point at the same provider instance
    pub fn same_instance(&self, other: &Provider) -> bool {
        match (self, other) {
            (Self::Git(a), Self::Git(b)) => Arc::ptr_eq(a, b),
            (Self::Tfvc(a), Self::Tfvc(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<GitProvider> for Provider {
    fn from(provider: GitProvider) -> Self {
        Self::Git(Arc::new(provider))
    }
}

impl From<TfvcProvider> for Provider {
    fn from(provider: TfvcProvider) -> Self {
        Self::Tfvc(Arc::new(provider))
    }
}

/// Probes a workspace root for one backend
#[async_trait]
pub trait ProviderActivator: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// `Ok(None)` when the backend does not apply to this root
    async fn try_activate_in_path(&self, root: &Path) -> Result<Option<Provider>>;
}
