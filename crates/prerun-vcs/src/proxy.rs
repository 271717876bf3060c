//! Provider proxy: the single entry point of a remote run.
//!
//! The proxy is built undiscovered, then `discover_providers` probes every
//! workspace root once. Aggregate operations visit the discovered providers in
//! discovery order and isolate per-provider failures with `fail_open`.

use prerun_core::fail_open::fail_open;
use prerun_core::{MappingFileContent, PrerunError, ProviderKind, Result, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

use crate::checkin::CheckInInfo;
use crate::git::GitProviderActivator;
use crate::paths::{normalize_root, root_relative};
use crate::prompt::{RemoteRunContext, UserPrompt};
use crate::provider::{Provider, ProviderActivator};
use crate::tfvc::TfvcProviderActivator;

const COMMIT_MESSAGE_PROMPT: &str = "Commit message";
const SELECT_FILES_TITLE: &str = "Select files for remote run";

pub struct ProviderProxy {
    tfvc_activator: Arc<dyn ProviderActivator>,
    git_activator: Arc<dyn ProviderActivator>,
    settings: Settings,
    prompt: Arc<dyn UserPrompt>,
    context: Arc<dyn RemoteRunContext>,
    providers: OnceCell<Vec<Provider>>,
}

impl ProviderProxy {
    pub fn new(
        tfvc_activator: Arc<dyn ProviderActivator>,
        git_activator: Arc<dyn ProviderActivator>,
        settings: Settings,
        prompt: Arc<dyn UserPrompt>,
        context: Arc<dyn RemoteRunContext>,
    ) -> Self {
        if settings.git_supported {
            info!("Experimental Git support is enabled");
        } else {
            info!("Experimental Git support is disabled");
        }

        Self {
            tfvc_activator,
            git_activator,
            settings,
            prompt,
            context,
            providers: OnceCell::new(),
        }
    }

    /// Proxy wired to the real command-line activators
    pub fn with_defaults(
        settings: Settings,
        prompt: Arc<dyn UserPrompt>,
        context: Arc<dyn RemoteRunContext>,
    ) -> Self {
        let tfvc = Arc::new(TfvcProviderActivator::new(&settings));
        let git = Arc::new(GitProviderActivator::new(&settings));
        Self::new(tfvc, git, settings, prompt, context)
    }

    /// Discovered providers, in discovery order
    pub fn providers(&self) -> Result<&[Provider]> {
        self.providers
            .get()
            .map(Vec::as_slice)
            .ok_or(PrerunError::NotReady)
    }

    fn activators(&self) -> Vec<&Arc<dyn ProviderActivator>> {
        let mut activators = vec![&self.tfvc_activator];
        if self.settings.git_supported {
            activators.push(&self.git_activator);
        }
        activators
    }

    /// Probe every root and store the active providers. Returns how many were
    /// activated.
    ///
    /// Roots are canonicalized, then probed in order, TFVC before Git. Roots
    /// naming the same directory are probed once.
    #[instrument(skip(self, roots))]
    pub async fn discover_providers(&self, roots: &[PathBuf]) -> Result<usize> {
        if self.providers.initialized() {
            return Err(PrerunError::AlreadyDiscovered);
        }

        let mut seen: Vec<PathBuf> = Vec::new();
        let mut discovered = Vec::new();

        for root in roots {
            let root = normalize_root(root);
            if seen.contains(&root) {
                debug!("Skipping duplicate root {}", root.display());
                continue;
            }
            seen.push(root.clone());

            for activator in self.activators() {
                match activator.try_activate_in_path(&root).await {
                    Ok(Some(provider)) => {
                        info!(
                            "{} provider activated for {}",
                            provider.kind(),
                            root.display()
                        );
                        discovered.push(provider);
                    }
                    Ok(None) => {
                        warn!(
                            "{} provider isn't applicable for {}",
                            activator.kind(),
                            root.display()
                        );
                    }
                    Err(e) => {
                        warn!(
                            "{} provider activation failed for {}: {}",
                            activator.kind(),
                            root.display(),
                            e
                        );
                    }
                }
            }
        }

        let count = discovered.len();
        self.providers
            .set(discovered)
            .map_err(|_| PrerunError::AlreadyDiscovered)?;
        self.context.set_show_remote_run_button(count > 0);

        info!("{} provider(s) discovered across {} root(s)", count, seen.len());
        Ok(count)
    }

    /// Pending change sets of every provider that has changes.
    ///
    /// A provider that fails is logged and left out; the others still report.
    pub async fn get_required_check_in_info(&self) -> Result<Vec<CheckInInfo>> {
        let providers = self.providers()?;
        if providers.is_empty() {
            return Err(PrerunError::NoProviders);
        }

        let mut infos = Vec::new();
        for provider in providers {
            let name = format!(
                "{} provider at {}",
                provider.kind(),
                provider.root_path().display()
            );
            let info = fail_open(&name, || provider.get_required_check_in_info()).await;
            match info {
                Some(info) if !info.is_empty() => infos.push(info),
                Some(_) => debug!("{} has no pending changes", name),
                None => {}
            }
        }

        debug!("{} check-in info(s) with changes", infos.len());
        Ok(infos)
    }

    pub fn get_formatted_file_names(&self, infos: &[CheckInInfo]) -> Vec<String> {
        infos.iter().flat_map(CheckInInfo::formatted_file_names).collect()
    }

    /// Let the user narrow the change sets down to the files to send.
    ///
    /// Infos left without resources are dropped. A cancelled dialog selects
    /// nothing.
    pub async fn select_resources(&self, mut infos: Vec<CheckInInfo>) -> Vec<CheckInInfo> {
        let items: Vec<String> = infos
            .iter()
            .flat_map(|info| {
                let kind = info.provider().kind();
                info.resources()
                    .iter()
                    .map(move |r| format!("[{}] {} {}", kind, r.change_kind(), r.label()))
            })
            .collect();
        if items.is_empty() {
            return infos;
        }

        let Some(selected) = self.prompt.pick_many(SELECT_FILES_TITLE, &items).await else {
            info!("File selection cancelled");
            return Vec::new();
        };

        let mut index = 0;
        for info in &mut infos {
            info.retain_resources(|_| {
                let keep = selected.contains(&index);
                index += 1;
                keep
            });
        }
        infos.retain(|info| !info.is_empty());

        debug!("{} of {} file(s) selected", selected.len(), items.len());
        infos
    }

    /// Ask once for a commit message and commit every info with it.
    ///
    /// Every provider gets its turn even if an earlier one fails; the roots
    /// that failed are reported together afterwards.
    pub async fn request_for_post_commit(&self, infos: &mut [CheckInInfo]) -> Result<()> {
        let Some(first) = infos.first() else {
            return Ok(());
        };

        let message = self
            .prompt
            .input_box(COMMIT_MESSAGE_PROMPT, &first.message)
            .await
            .unwrap_or_default();

        let mut failed = Vec::new();
        for info in infos.iter_mut() {
            info.message = message.clone();
            let provider = info.provider().clone();
            if let Err(e) = provider.commit(info).await {
                error!("Commit failed for {}: {}", info.root_path().display(), e);
                failed.push(info.root_path().display().to_string());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(PrerunError::CommitFailed(failed))
        }
    }

    /// Whether any discovered provider is Git
    pub fn has_git_provider(&self) -> bool {
        self.providers
            .get()
            .is_some_and(|providers| providers.iter().any(|p| p.kind() == ProviderKind::Git))
    }

    /// The branch every Git root is on.
    ///
    /// Roots on different branches are not supported.
    pub async fn get_git_branch(&self) -> Result<String> {
        let mut names: Vec<String> = Vec::new();
        for git in self.providers()?.iter().filter_map(Provider::as_git) {
            let name = git.get_repo_branch_name().await?;
            if !names.contains(&name) {
                names.push(name);
            }
        }

        match names.len() {
            0 => Err(PrerunError::NoBranch),
            1 => Ok(names.remove(0)),
            _ => Err(PrerunError::AmbiguousBranch(names)),
        }
    }

    /// Mapping entries for every Git root
    pub async fn get_mapping_file_contents(&self) -> Result<Vec<MappingFileContent>> {
        let mut contents = Vec::new();
        for git in self.providers()?.iter().filter_map(Provider::as_git) {
            contents.push(git.mapping_file_content().await?);
        }
        Ok(contents)
    }

    /// Human readable list of the pending files, relative to their roots
    pub fn describe(&self, infos: &[CheckInInfo]) -> Vec<String> {
        infos
            .iter()
            .flat_map(|info| {
                info.resources().iter().map(move |r| {
                    let relative = root_relative(info.root_path(), r.path());
                    match r.prev_path() {
                        Some(prev) => format!(
                            "{} {} -> {}",
                            r.change_kind(),
                            root_relative(info.root_path(), prev),
                            relative
                        ),
                        None => format!("{} {}", r.change_kind(), relative),
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandRunner, MockCommandRunner};
    use crate::git::GitProvider;
    use crate::prompt::{MockContext, MockPrompt};
    use crate::tfvc::TfvcProvider;
    use async_trait::async_trait;
    use prerun_core::{ChangeKind, CvsResource};
    use std::path::Path;
    use std::sync::Mutex;

    /// Activates a provider of its kind for the listed roots only
    struct StubActivator {
        kind: ProviderKind,
        roots: Vec<PathBuf>,
        probed: Mutex<Vec<PathBuf>>,
    }

    impl StubActivator {
        fn new(kind: ProviderKind, roots: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                kind,
                roots: roots.iter().map(PathBuf::from).collect(),
                probed: Mutex::new(Vec::new()),
            })
        }

        fn probed(&self) -> Vec<PathBuf> {
            self.probed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProviderActivator for StubActivator {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn try_activate_in_path(&self, root: &Path) -> Result<Option<Provider>> {
            self.probed.lock().unwrap().push(root.to_path_buf());
            if root == Path::new("/broken") {
                return Err(PrerunError::Other("probe exploded".to_string()));
            }
            if !self.roots.iter().any(|r| r == root) {
                return Ok(None);
            }
            let runner: Arc<dyn CommandRunner> = Arc::new(MockCommandRunner::new());
            Ok(Some(match self.kind {
                ProviderKind::Git => GitProvider::new(root, PathBuf::from("git"), runner).into(),
                ProviderKind::Tfvc => TfvcProvider::new(root, PathBuf::from("tf"), runner).into(),
            }))
        }
    }

    fn proxy(
        tfvc: Arc<StubActivator>,
        git: Arc<StubActivator>,
        git_supported: bool,
        context: MockContext,
    ) -> ProviderProxy {
        ProviderProxy::new(
            tfvc,
            git,
            Settings::default().with_git_supported(git_supported),
            Arc::new(MockPrompt::new()),
            Arc::new(context),
        )
    }

    fn roots(roots: &[&str]) -> Vec<PathBuf> {
        roots.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_operations_before_discovery_are_not_ready() {
        let proxy = proxy(
            StubActivator::new(ProviderKind::Tfvc, &[]),
            StubActivator::new(ProviderKind::Git, &[]),
            true,
            MockContext::new(),
        );

        assert!(matches!(proxy.providers(), Err(PrerunError::NotReady)));
        assert!(matches!(
            proxy.get_required_check_in_info().await,
            Err(PrerunError::NotReady)
        ));
        assert!(matches!(proxy.get_git_branch().await, Err(PrerunError::NotReady)));
        assert!(!proxy.has_git_provider());
    }

    #[tokio::test]
    async fn test_discovery_order_and_kinds() {
        let context = MockContext::new();
        let proxy = proxy(
            StubActivator::new(ProviderKind::Tfvc, &["/b"]),
            StubActivator::new(ProviderKind::Git, &["/a", "/b"]),
            true,
            context.clone(),
        );

        let count = proxy.discover_providers(&roots(&["/a", "/b"])).await.unwrap();
        assert_eq!(count, 3);

        let found: Vec<(ProviderKind, &Path)> = proxy
            .providers()
            .unwrap()
            .iter()
            .map(|p| (p.kind(), p.root_path()))
            .collect();
        assert_eq!(
            found,
            vec![
                (ProviderKind::Git, Path::new("/a")),
                (ProviderKind::Tfvc, Path::new("/b")),
                (ProviderKind::Git, Path::new("/b")),
            ]
        );
        assert_eq!(context.shown(), Some(true));
    }

    #[tokio::test]
    async fn test_git_is_not_probed_when_unsupported() {
        let git = StubActivator::new(ProviderKind::Git, &["/a"]);
        let proxy = proxy(
            StubActivator::new(ProviderKind::Tfvc, &[]),
            git.clone(),
            false,
            MockContext::new(),
        );

        assert_eq!(proxy.discover_providers(&roots(&["/a"])).await.unwrap(), 0);
        assert!(git.probed().is_empty());
        assert!(!proxy.has_git_provider());
    }

    #[tokio::test]
    async fn test_duplicate_roots_are_probed_once() {
        let tfvc = StubActivator::new(ProviderKind::Tfvc, &["/a"]);
        let proxy = proxy(
            tfvc.clone(),
            StubActivator::new(ProviderKind::Git, &[]),
            false,
            MockContext::new(),
        );

        let count = proxy.discover_providers(&roots(&["/a", "/a"])).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(tfvc.probed(), roots(&["/a"]));
    }

    #[tokio::test]
    async fn test_aliased_roots_are_probed_once() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = std::fs::canonicalize(temp.path()).unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();
        let tfvc = StubActivator::new(ProviderKind::Tfvc, &[root.to_str().unwrap()]);
        let proxy = proxy(
            tfvc.clone(),
            StubActivator::new(ProviderKind::Git, &[]),
            false,
            MockContext::new(),
        );

        let aliases = vec![root.join("sub").join(".."), root.clone()];
        let count = proxy.discover_providers(&aliases).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(tfvc.probed(), vec![root.clone()]);
        assert_eq!(proxy.providers().unwrap()[0].root_path(), root.as_path());
    }

    #[tokio::test]
    async fn test_activator_error_is_a_miss() {
        let context = MockContext::new();
        let proxy = proxy(
            StubActivator::new(ProviderKind::Tfvc, &[]),
            StubActivator::new(ProviderKind::Git, &["/a"]),
            true,
            context.clone(),
        );

        let count = proxy.discover_providers(&roots(&["/broken", "/a"])).await.unwrap();
        assert_eq!(count, 1);
        assert!(proxy.has_git_provider());
    }

    #[tokio::test]
    async fn test_second_discovery_is_rejected() {
        let proxy = proxy(
            StubActivator::new(ProviderKind::Tfvc, &["/a"]),
            StubActivator::new(ProviderKind::Git, &[]),
            false,
            MockContext::new(),
        );

        proxy.discover_providers(&roots(&["/a"])).await.unwrap();
        let again = proxy.discover_providers(&roots(&["/a"])).await;
        assert!(matches!(again, Err(PrerunError::AlreadyDiscovered)));
        assert_eq!(proxy.providers().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_discovery_hides_button() {
        let context = MockContext::new();
        let proxy = proxy(
            StubActivator::new(ProviderKind::Tfvc, &[]),
            StubActivator::new(ProviderKind::Git, &[]),
            true,
            context.clone(),
        );

        assert_eq!(proxy.discover_providers(&roots(&["/a"])).await.unwrap(), 0);
        assert_eq!(context.shown(), Some(false));
        assert!(matches!(
            proxy.get_required_check_in_info().await,
            Err(PrerunError::NoProviders)
        ));
        assert!(matches!(proxy.get_git_branch().await, Err(PrerunError::NoBranch)));
    }

    #[tokio::test]
    async fn test_describe_shows_renames() {
        let proxy = proxy(
            StubActivator::new(ProviderKind::Tfvc, &[]),
            StubActivator::new(ProviderKind::Git, &[]),
            false,
            MockContext::new(),
        );
        let runner: Arc<dyn CommandRunner> = Arc::new(MockCommandRunner::new());
        let provider: Provider = GitProvider::new("/ws", PathBuf::from("git"), runner).into();
        let info = CheckInInfo::new(
            vec![
                CvsResource::new(ChangeKind::Added, "/ws/a.txt", "a.txt").unwrap(),
                CvsResource::renamed("/ws/src/new.rs", "/ws/src/old.rs", "src/new.rs"),
            ],
            provider,
        );

        assert_eq!(
            proxy.describe(&[info]),
            vec![
                "ADDED /a.txt".to_string(),
                "RENAMED /src/old.rs -> /src/new.rs".to_string(),
            ]
        );
    }
}
