use std::time::Duration;

use chain_eth::chains::{
    CONTRACT_GAS_LIMIT, LOCAL_DEV_CHAIN_ID, MAX_CHAIN_ID, TRANSFER_GAS_LIMIT,
};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// Settings for [`ContractWorkflow`](crate::workflow::ContractWorkflow).
///
/// Passed in as a plain value; loading it from a file or flags is the
/// embedding application's business. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub chain_id: u64,
    pub gas: GasLimits,
    pub confirmation: ConfirmationPolicy,
}

/// Fixed gas limits per transaction kind. Nothing is estimated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasLimits {
    pub transfer: u64,
    pub contract_call: u64,
    pub deployment: u64,
}

/// How long to wait for a receipt before giving up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationPolicy {
    pub max_polls: u32,
    pub poll_interval_ms: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            chain_id: LOCAL_DEV_CHAIN_ID,
            gas: GasLimits::default(),
            confirmation: ConfirmationPolicy::default(),
        }
    }
}

impl Default for GasLimits {
    fn default() -> Self {
        Self {
            transfer: TRANSFER_GAS_LIMIT,
            contract_call: CONTRACT_GAS_LIMIT,
            deployment: CONTRACT_GAS_LIMIT,
        }
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            max_polls: 60,
            poll_interval_ms: 1_000,
        }
    }
}

impl ConfirmationPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl WorkflowConfig {
    pub fn for_chain(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.chain_id == 0 {
            return Err(WorkflowError::InvalidConfig(
                "chain id must be non-zero".into(),
            ));
        }
        if self.chain_id > MAX_CHAIN_ID {
            return Err(WorkflowError::InvalidConfig(format!(
                "chain id {} exceeds {MAX_CHAIN_ID}",
                self.chain_id
            )));
        }

        let limits = [
            ("transfer", self.gas.transfer),
            ("contract_call", self.gas.contract_call),
            ("deployment", self.gas.deployment),
        ];
        for (name, limit) in limits {
            if limit < TRANSFER_GAS_LIMIT {
                return Err(WorkflowError::InvalidConfig(format!(
                    "{name} gas limit {limit} is below the intrinsic {TRANSFER_GAS_LIMIT}"
                )));
            }
        }

        if self.confirmation.max_polls == 0 {
            return Err(WorkflowError::InvalidConfig(
                "confirmation.max_polls must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
