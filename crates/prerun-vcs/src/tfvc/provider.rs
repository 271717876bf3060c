//! TFVC provider driving the `tf` command-line client.

use async_trait::async_trait;
use prerun_core::{ChangeKind, CvsResource, PrerunError, ProviderKind, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::parser::{parse_detailed_status, parse_workfold, StatusEntry, Workfold};
use crate::checkin::CheckInInfo;
use crate::command::{CommandOutput, CommandRunner};
use crate::paths::root_relative;
use crate::provider::{CvsProvider, PendingChanges};

/// TFVC provider bound to one local workspace folder
pub struct TfvcProvider {
    root_path: PathBuf,
    tf_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for TfvcProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TfvcProvider")
            .field("root_path", &self.root_path)
            .field("tf_path", &self.tf_path)
            .field("runner", &"<CommandRunner>")
            .finish()
    }
}

impl TfvcProvider {
    pub fn new(
        root_path: impl Into<PathBuf>,
        tf_path: PathBuf,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            tf_path,
            runner,
        }
    }

    async fn tf(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner
            .run(&self.tf_path, args)
            .await?
            .into_checked(&self.tf_path, args)
    }

    fn root_arg(&self) -> String {
        self.root_path.to_string_lossy().to_string()
    }

    /// Collection URL and folder mappings of the workspace owning the root
    pub async fn get_workfold(&self) -> Result<Workfold> {
        let root = self.root_arg();
        let output = self.tf(&["workfold", root.as_str()]).await?;
        Ok(parse_workfold(&output.stdout))
    }

    #[instrument(skip(self), fields(root = %self.root_path.display()))]
    async fn get_status_entries(&self) -> Result<Vec<StatusEntry>> {
        let root = self.root_arg();
        let output = self
            .tf(&["status", root.as_str(), "-recursive", "-format:detailed"])
            .await?;
        let entries = parse_detailed_status(&output.stdout);
        debug!("{} pending change(s) detected", entries.len());
        Ok(entries)
    }

    fn to_resource(&self, entry: &StatusEntry, workfold: &Workfold) -> Option<CvsResource> {
        let Some(local_item) = entry.local_item.as_ref() else {
            debug!("Skipping {}: no local item", entry.server_item);
            return None;
        };
        let label = root_relative(&self.root_path, local_item)
            .trim_start_matches('/')
            .to_string();

        if entry.change.contains("rename") {
            let prev_path = entry
                .source_item
                .as_deref()
                .and_then(|source| workfold.local_path_for(source));
            match prev_path {
                Some(prev_path) => {
                    return Some(CvsResource::renamed(local_item, prev_path, label));
                }
                None => warn!(
                    "Source of rename {} could not be resolved, reporting it as modified",
                    entry.server_item
                ),
            }
        }

        CvsResource::new(change_kind(&entry.change), local_item, label).ok()
    }
}

/// Map a detailed-status change description to a change kind (renames are
/// handled by the caller)
fn change_kind(change: &str) -> ChangeKind {
    if ["add", "branch", "undelete"].iter().any(|c| change.contains(c)) {
        ChangeKind::Added
    } else if change.contains("delete") {
        ChangeKind::Deleted
    } else {
        ChangeKind::Modified
    }
}

#[async_trait]
impl CvsProvider for TfvcProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tfvc
    }

    fn root_path(&self) -> &Path {
        &self.root_path
    }

    async fn pending_changes(&self) -> Result<PendingChanges> {
        let workfold = self.get_workfold().await?;
        let entries = self.get_status_entries().await?;
        if entries.is_empty() {
            return Ok(PendingChanges::default());
        }

        let collection = workfold.collection.clone().ok_or_else(|| {
            PrerunError::Parse("Collection url wasn't determined".to_string())
        })?;

        let mut changes = PendingChanges::default();
        for entry in &entries {
            if let Some(resource) = self.to_resource(entry, &workfold) {
                let server_path = format!("{}/{}", collection, entry.server_item);
                changes.resources.push(resource.with_server_file_path(server_path));
                changes.server_items.push(entry.server_item.clone());
            }
        }
        Ok(changes)
    }

    #[instrument(skip(self, check_in_info), fields(root = %self.root_path.display()))]
    async fn commit(&self, check_in_info: &CheckInInfo) -> Result<()> {
        if check_in_info.server_items().is_empty() {
            debug!("Nothing to check in");
            return Ok(());
        }

        let comment = format!("-comment:{}", check_in_info.message);
        let mut args: Vec<&str> = vec!["checkin", comment.as_str(), "-noprompt"];

        let associate = if check_in_info.work_item_ids().is_empty() {
            None
        } else {
            let ids: Vec<String> = check_in_info
                .work_item_ids()
                .iter()
                .map(u32::to_string)
                .collect();
            Some(format!("-associate:{}", ids.join(",")))
        };
        if let Some(associate) = associate.as_deref() {
            args.push(associate);
        }
        args.extend(check_in_info.server_items().iter().map(String::as_str));

        let output = self.tf(&args).await?;
        info!(
            "Checked in {} item(s): {}",
            check_in_info.server_items().len(),
            output.stdout.trim()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockCommandRunner;
    use crate::provider::Provider;

    const WORKFOLD: &str = "\
Workspace : dev-box (john)
Collection: http://tfs:8080/tfs/Coll
 $/Proj: /ws
";

    const STATUS: &str = "\
$/Proj/src/a.cs
  Change     : edit
  Local item : [DEV-BOX] /ws/src/a.cs

$/Proj/src/new.cs
  Change     : add
  Local item : [DEV-BOX] /ws/src/new.cs

$/Proj/src/c.cs
  Change     : rename
  Local item : [DEV-BOX] /ws/src/c.cs
  Source item: $/Proj/src/b.cs

$/Proj/src/gone.cs
  Change     : delete
  Local item : [DEV-BOX] /ws/src/gone.cs

4 change(s)
";

    fn runner(status: &str) -> MockCommandRunner {
        MockCommandRunner::new()
            .with_stdout("workfold /ws", WORKFOLD)
            .with_stdout("status /ws -recursive -format:detailed", status)
    }

    fn provider(runner: MockCommandRunner) -> TfvcProvider {
        TfvcProvider::new("/ws", PathBuf::from("tf"), Arc::new(runner))
    }

    #[tokio::test]
    async fn test_pending_changes() {
        let changes = provider(runner(STATUS)).pending_changes().await.unwrap();

        let summary: Vec<(ChangeKind, &str)> = changes
            .resources
            .iter()
            .map(|r| (r.change_kind(), r.label()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ChangeKind::Modified, "src/a.cs"),
                (ChangeKind::Added, "src/new.cs"),
                (ChangeKind::Renamed, "src/c.cs"),
                (ChangeKind::Deleted, "src/gone.cs"),
            ]
        );
        assert_eq!(
            changes.resources[0].server_file_path(),
            "http://tfs:8080/tfs/Coll/$/Proj/src/a.cs"
        );
        assert_eq!(changes.resources[2].prev_path(), Some(Path::new("/ws/src/b.cs")));
        assert_eq!(changes.server_items.len(), 4);
        assert_eq!(changes.server_items[3], "$/Proj/src/gone.cs");
    }

    #[tokio::test]
    async fn test_unresolvable_rename_becomes_modified() {
        let status = "$/Proj/x.cs\n  Change : rename\n  Local item : /ws/x.cs\
                      \n  Source item : $/Elsewhere/x.cs\n";
        let changes = provider(runner(status)).pending_changes().await.unwrap();
        assert_eq!(changes.resources[0].change_kind(), ChangeKind::Modified);
        assert!(changes.resources[0].prev_path().is_none());
    }

    #[tokio::test]
    async fn test_missing_collection_is_an_error() {
        let runner = MockCommandRunner::new()
            .with_stdout("workfold /ws", " $/Proj: /ws\n")
            .with_stdout("status /ws -recursive -format:detailed", STATUS);
        let result = provider(runner).pending_changes().await;
        assert!(matches!(result, Err(PrerunError::Parse(_))));
    }

    #[tokio::test]
    async fn test_no_pending_changes() {
        let changes = provider(runner("There are no pending changes.\n"))
            .pending_changes()
            .await
            .unwrap();
        assert!(changes.resources.is_empty());
    }

    #[tokio::test]
    async fn test_commit_checks_in_server_items_with_message() {
        let runner = MockCommandRunner::new().with_stdout(
            "checkin -comment:Fix build -noprompt -associate:12,34 $/Proj/a.cs $/Proj/b.cs",
            "Changeset #101 checked in.\n",
        );
        let handle: Provider = provider(runner.clone()).into();
        let resources = vec![
            CvsResource::new(ChangeKind::Modified, "/ws/a.cs", "a.cs").unwrap(),
            CvsResource::new(ChangeKind::Modified, "/ws/b.cs", "b.cs").unwrap(),
        ];
        let mut info = CheckInInfo::new(resources, handle.clone())
            .with_server_items(vec!["$/Proj/a.cs".to_string(), "$/Proj/b.cs".to_string()])
            .with_work_item_ids(vec![12, 34]);
        info.message = "Fix build".to_string();

        handle.commit(&info).await.unwrap();
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_propagates() {
        let runner = MockCommandRunner::new().with_response(
            "checkin -comment: -noprompt $/Proj/a.cs",
            CommandOutput::failed(100, "TF10139: conflicts"),
        );
        let handle: Provider = provider(runner).into();
        let info = CheckInInfo::new(
            vec![CvsResource::new(ChangeKind::Modified, "/ws/a.cs", "a.cs").unwrap()],
            handle.clone(),
        )
        .with_server_items(vec!["$/Proj/a.cs".to_string()]);

        let result = handle.commit(&info).await;
        assert!(matches!(result, Err(PrerunError::CommandFailed { .. })));
    }
}
