//! Contract deployment and interaction on top of `chain-eth`.
//!
//! [`ContractWorkflow`] drives deploy, read, write and transfer operations
//! through a caller-supplied [`chain_eth::ledger::LedgerClient`], reporting
//! which step failed when something goes wrong.

pub mod config;
pub mod contract;
pub mod error;
pub mod workflow;

pub use config::{ConfirmationPolicy, GasLimits, WorkflowConfig};
pub use contract::{ContractArtifact, ContractHandle, Function};
pub use error::WorkflowError;
pub use workflow::{ContractWorkflow, Deployment, Intent, Outcome, WorkflowState};
