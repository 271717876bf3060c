//! # prerun-vcs
//!
//! Version control layer for prerun remote runs.
//!
//! This crate provides:
//! - Command execution abstraction with a mock for tests
//! - Git and TFVC providers with their activators
//! - Check-in info aggregation through [`ProviderProxy`]

mod checkin;
mod command;
pub mod git;
mod paths;
mod prompt;
mod provider;
mod proxy;
pub mod tfvc;

pub use checkin::CheckInInfo;
pub use command::{
    process_runner_factory, CommandOutput, CommandRunner, MockCommandRunner, ProcessRunner,
    RunnerFactory,
};
pub use git::{GitProvider, GitProviderActivator};
pub use prompt::{MockContext, MockPrompt, RemoteRunContext, UserPrompt};
pub use provider::{CvsProvider, PendingChanges, Provider, ProviderActivator};
pub use proxy::ProviderProxy;
pub use tfvc::{TfvcProvider, TfvcProviderActivator};
