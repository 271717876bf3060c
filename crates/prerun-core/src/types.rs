//! Core type definitions for prerun

use std::path::{Path, PathBuf};

use crate::{PrerunError, Result};

/// Kind of local change a resource carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "ADDED"),
            Self::Modified => write!(f, "MODIFIED"),
            Self::Deleted => write!(f, "DELETED"),
            Self::Renamed => write!(f, "RENAMED"),
        }
    }
}

/// Version control backend a provider speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Git,
    Tfvc,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::Tfvc => write!(f, "tfvc"),
        }
    }
}

/// One locally changed file under version control
///
/// A renamed resource always carries the previous absolute path and no other
/// kind does. The constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvsResource {
    change_kind: ChangeKind,
    path: PathBuf,
    label: String,
    server_file_path: String,
    prev_path: Option<PathBuf>,
}

impl CvsResource {
    /// Create a non-rename resource.
    ///
    /// The server file path starts out as the label; providers replace it
    /// with their own format through [`CvsResource::with_server_file_path`].
    pub fn new(
        change_kind: ChangeKind,
        path: impl Into<PathBuf>,
        label: impl Into<String>,
    ) -> Result<Self> {
        if change_kind == ChangeKind::Renamed {
            return Err(PrerunError::InvalidResource(
                "renamed resource requires a previous path".to_string(),
            ));
        }
        let label = label.into();
        Ok(Self {
            change_kind,
            path: path.into(),
            server_file_path: label.clone(),
            label,
            prev_path: None,
        })
    }

    /// Create a renamed resource
    pub fn renamed(
        path: impl Into<PathBuf>,
        prev_path: impl Into<PathBuf>,
        label: impl Into<String>,
    ) -> Self {
        let label = label.into();
        Self {
            change_kind: ChangeKind::Renamed,
            path: path.into(),
            server_file_path: label.clone(),
            label,
            prev_path: Some(prev_path.into()),
        }
    }

    pub fn with_server_file_path(mut self, server_file_path: impl Into<String>) -> Self {
        self.server_file_path = server_file_path.into();
        self
    }

    pub fn change_kind(&self) -> ChangeKind {
        self.change_kind
    }

    /// Absolute local path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Repository-relative path, as shown to the user
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Path in the format the CI server expects for this backend
    pub fn server_file_path(&self) -> &str {
        &self.server_file_path
    }

    /// Absolute path before the rename (renames only)
    pub fn prev_path(&self) -> Option<&Path> {
        self.prev_path.as_deref()
    }
}

/// Content of a `.teamcity-mappings.properties` entry for one root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingFileContent {
    pub local_root_path: String,
    pub tc_project_root_path: String,
    pub full_content: String,
}

impl MappingFileContent {
    /// Build the Git mapping for a root with the given remote URL
    pub fn git(local_root: &Path, remote_url: &str) -> Self {
        let local_root_path = local_root.display().to_string();
        let tc_project_root_path = format!("jetbrains.git://|{}|", remote_url.trim());
        let full_content = format!("{}={}", local_root_path, tc_project_root_path);
        Self {
            local_root_path,
            tc_project_root_path,
            full_content,
        }
    }
}
