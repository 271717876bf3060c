//! Collaborators the proxy talks to outside the VCS layer: the user and the
//! remote-run UI state.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Interactive questions asked during a remote run
#[async_trait]
pub trait UserPrompt: Send + Sync {
    /// Ask for a line of text. `None` when the user cancels.
    async fn input_box(&self, prompt: &str, default: &str) -> Option<String>;

    /// Let the user pick any number of items. Returns the chosen indices, or
    /// `None` when the user cancels.
    async fn pick_many(&self, title: &str, items: &[String]) -> Option<Vec<usize>>;
}

/// Remote-run state shared with the host UI
pub trait RemoteRunContext: Send + Sync {
    fn set_show_remote_run_button(&self, show: bool);
}

/// Prompt replaying canned answers
///
/// Unset answers behave like a cancelled dialog. Every question is recorded as
/// `input_box <prompt> [<default>]` or `pick_many <title> (<n> items)`.
#[derive(Clone, Default)]
pub struct MockPrompt {
    message: Option<String>,
    selection: Option<Vec<usize>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn with_selection(mut self, selection: Vec<usize>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl UserPrompt for MockPrompt {
    async fn input_box(&self, prompt: &str, default: &str) -> Option<String> {
        self.record(format!("input_box {} [{}]", prompt, default));
        self.message.clone()
    }

    async fn pick_many(&self, title: &str, items: &[String]) -> Option<Vec<usize>> {
        self.record(format!("pick_many {} ({} items)", title, items.len()));
        self.selection.clone()
    }
}

/// Context remembering the last button state it was given
#[derive(Clone, Default)]
pub struct MockContext {
    shown: Arc<Mutex<Option<bool>>>,
}

impl MockContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value signalled, `None` if never signalled
    pub fn shown(&self) -> Option<bool> {
        self.shown.lock().ok().and_then(|shown| *shown)
    }
}

impl RemoteRunContext for MockContext {
    fn set_show_remote_run_button(&self, show: bool) {
        if let Ok(mut shown) = self.shown.lock() {
            *shown = Some(show);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_prompt_cancels_by_default() {
        let prompt = MockPrompt::new();
        assert_eq!(prompt.input_box("Commit message", "wip").await, None);
        assert_eq!(prompt.pick_many("Files", &["a".to_string()]).await, None);
        assert_eq!(
            prompt.calls(),
            vec![
                "input_box Commit message [wip]".to_string(),
                "pick_many Files (1 items)".to_string(),
            ]
        );
    }

    #[test]
    fn test_mock_context_remembers_last_state() {
        let context = MockContext::new();
        assert_eq!(context.shown(), None);
        context.set_show_remote_run_button(true);
        context.set_show_remote_run_button(false);
        assert_eq!(context.shown(), Some(false));
    }
}
