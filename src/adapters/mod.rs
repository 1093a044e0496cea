// Adapters: concrete implementations of the domain ports.

pub mod catalog;
pub mod proposer;
pub mod storage;

pub use catalog::InMemoryCatalog;
pub use proposer::{HttpPlanProposer, ProposerSettings};
pub use storage::LocalStorage;
