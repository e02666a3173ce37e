use chain_eth::error::EthError;
use thiserror::Error;

use crate::workflow::WorkflowState;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A chain-level failure, tagged with the step that was running.
    #[error("{stage} failed: {source}")]
    Step {
        stage: WorkflowState,
        #[source]
        source: EthError,
    },

    #[error("Unknown contract function: {0}")]
    UnknownFunction(String),

    #[error("Receipt for {0} carries no contract address")]
    MissingContractAddress(String),

    #[error("Transaction {hash} not confirmed after {polls} polls")]
    Unconfirmed { hash: String, polls: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorkflowError {
    pub(crate) fn at(stage: WorkflowState) -> impl FnOnce(EthError) -> Self {
        move |source| WorkflowError::Step { stage, source }
    }

    /// Stage at which a chain-level failure happened, if any.
    pub fn stage(&self) -> Option<WorkflowState> {
        match self {
            WorkflowError::Step { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying chain error, if any.
    pub fn eth_error(&self) -> Option<&EthError> {
        match self {
            WorkflowError::Step { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether retrying the whole operation later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkflowError::Step { source, .. } => source.is_transient(),
            WorkflowError::Unconfirmed { .. } => true,
            _ => false,
        }
    }
}
