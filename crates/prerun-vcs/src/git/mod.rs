//! Git backend: `git status --porcelain` change detection, branch queries
//! and remote-run path formatting.

mod activator;
pub mod parser;
mod provider;

pub use activator::GitProviderActivator;
pub use provider::GitProvider;
