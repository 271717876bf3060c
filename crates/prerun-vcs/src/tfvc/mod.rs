//! TFVC backend: pending changes from the `tf` client, addressed by server
//! item path.

mod activator;
pub mod parser;
mod provider;

pub use activator::TfvcProviderActivator;
pub use provider::TfvcProvider;
