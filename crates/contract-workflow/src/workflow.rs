//! Deploy / read / write orchestration against a [`LedgerClient`].
//!
//! Every state-changing operation walks the same pipeline:
//!
//! ```text
//! Idle -> NonceFetched -> GasPriced -> Built -> Signed -> Submitted -> Confirmed
//! ```
//!
//! Any failure moves the workflow to [`WorkflowState::Failed`] and the error
//! names the step that was running. Nothing is retried; the caller decides.

use std::fmt;
use std::thread;

use alloy_primitives::{Address, B256, U256};
use chain_eth::abi::AbiValue;
use chain_eth::address::contract_address;
use chain_eth::builder::{TransactionBuilder, TxKind};
use chain_eth::error::EthError;
use chain_eth::keys::KeyPair;
use chain_eth::ledger::{LedgerClient, Receipt};
use chain_eth::signer;
use chain_eth::transaction::SignedTransaction;

use crate::config::WorkflowConfig;
use crate::contract::{ContractArtifact, ContractHandle, Function};
use crate::error::WorkflowError;

/// Progress of the current operation.
///
/// Reads reuse the tail of the pipeline: `Built` once the call is encoded,
/// `Submitted` once the ledger answered the simulated call, and `Confirmed`
/// once the answer decoded. A read whose answer does not decode fails at
/// `Decoded`; no state-changing operation passes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    Idle,
    NonceFetched,
    GasPriced,
    Built,
    Signed,
    Submitted,
    Decoded,
    Confirmed,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::NonceFetched => "nonce fetch",
            WorkflowState::GasPriced => "gas price fetch",
            WorkflowState::Built => "build",
            WorkflowState::Signed => "sign",
            WorkflowState::Submitted => "submit",
            WorkflowState::Decoded => "decode",
            WorkflowState::Confirmed => "confirmation",
            WorkflowState::Failed => "failed",
        };
        f.write_str(step)
    }
}

/// Result of a confirmed deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub contract: ContractHandle,
    pub transaction: SignedTransaction,
    pub receipt: Receipt,
}

/// What the caller wants done.
#[derive(Debug, Clone)]
pub enum Intent<'a> {
    Deploy {
        key: &'a KeyPair,
        artifact: &'a ContractArtifact,
        constructor_args: Vec<AbiValue>,
    },
    Read {
        contract: &'a ContractHandle,
        function: String,
        args: Vec<AbiValue>,
    },
    Write {
        key: &'a KeyPair,
        contract: &'a ContractHandle,
        function: String,
        args: Vec<AbiValue>,
    },
    Transfer {
        key: &'a KeyPair,
        to: Address,
        value: U256,
    },
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Deployed(Deployment),
    Values(Vec<AbiValue>),
    Submitted(SignedTransaction),
}

#[derive(Debug)]
pub struct ContractWorkflow {
    config: WorkflowConfig,
    state: WorkflowState,
}

impl ContractWorkflow {
    pub fn new(config: WorkflowConfig) -> Result<Self, WorkflowError> {
        config.validate()?;
        Ok(Self {
            config,
            state: WorkflowState::Idle,
        })
    }

    /// The state the last operation reached.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Runs one intent to completion.
    pub fn execute<L: LedgerClient + ?Sized>(
        &mut self,
        intent: Intent<'_>,
        ledger: &L,
    ) -> Result<Outcome, WorkflowError> {
        match intent {
            Intent::Deploy {
                key,
                artifact,
                constructor_args,
            } => self
                .deploy(key, artifact, &constructor_args, ledger)
                .map(Outcome::Deployed),
            Intent::Read {
                contract,
                function,
                args,
            } => self
                .read(contract, &function, &args, ledger)
                .map(Outcome::Values),
            Intent::Write {
                key,
                contract,
                function,
                args,
            } => self
                .write(key, contract, &function, &args, ledger)
                .map(Outcome::Submitted),
            Intent::Transfer { key, to, value } => self
                .transfer(key, to, value, ledger)
                .map(Outcome::Submitted),
        }
    }

    /// Deploys `artifact` and waits for the creation receipt.
    pub fn deploy<L: LedgerClient + ?Sized>(
        &mut self,
        key: &KeyPair,
        artifact: &ContractArtifact,
        constructor_args: &[AbiValue],
        ledger: &L,
    ) -> Result<Deployment, WorkflowError> {
        self.begin("deploy");
        let result = self.run_deploy(key, artifact, constructor_args, ledger);
        self.settle(result)
    }

    fn run_deploy<L: LedgerClient + ?Sized>(
        &mut self,
        key: &KeyPair,
        artifact: &ContractArtifact,
        constructor_args: &[AbiValue],
        ledger: &L,
    ) -> Result<Deployment, WorkflowError> {
        let bytecode = artifact
            .creation_payload(constructor_args)
            .map_err(WorkflowError::at(WorkflowState::Built))?;

        let gas_limit = self.config.gas.deployment;
        let transaction = self.submit(key, TxKind::Create { bytecode }, gas_limit, ledger)?;
        let receipt = self.poll_receipt(transaction.hash(), ledger)?;

        let address = receipt
            .contract_address
            .ok_or_else(|| WorkflowError::MissingContractAddress(transaction.hash().to_string()))?;

        let expected = contract_address(key.address(), transaction.transaction().nonce);
        if address != expected {
            tracing::warn!(
                receipt = %address,
                computed = %expected,
                "ledger reported a different contract address than the CREATE rule predicts"
            );
        }

        tracing::info!(contract = %address, tx = %transaction.hash(), "contract deployed");
        Ok(Deployment {
            contract: artifact.handle_at(address),
            transaction,
            receipt,
        })
    }

    /// Calls a view function without submitting anything.
    pub fn read<L: LedgerClient + ?Sized>(
        &mut self,
        contract: &ContractHandle,
        function: &str,
        args: &[AbiValue],
        ledger: &L,
    ) -> Result<Vec<AbiValue>, WorkflowError> {
        self.begin("read");
        let result = self.run_read(contract, function, args, ledger);
        self.settle(result)
    }

    fn run_read<L: LedgerClient + ?Sized>(
        &mut self,
        contract: &ContractHandle,
        function: &str,
        args: &[AbiValue],
        ledger: &L,
    ) -> Result<Vec<AbiValue>, WorkflowError> {
        let function = lookup(contract, function)?;
        let data = function
            .encode_call(args)
            .map_err(WorkflowError::at(WorkflowState::Built))?;
        self.advance(WorkflowState::Built);

        let output = ledger
            .simulate_call(contract.address(), &data)
            .map_err(EthError::from)
            .map_err(WorkflowError::at(WorkflowState::Submitted))?;
        self.advance(WorkflowState::Submitted);

        let values = function
            .decode_output(&output)
            .map_err(WorkflowError::at(WorkflowState::Decoded))?;
        self.advance(WorkflowState::Confirmed);
        Ok(values)
    }

    /// Submits a state-changing call. Returns once the ledger accepted the
    /// transaction; use [`await_receipt`](Self::await_receipt) to confirm it.
    pub fn write<L: LedgerClient + ?Sized>(
        &mut self,
        key: &KeyPair,
        contract: &ContractHandle,
        function: &str,
        args: &[AbiValue],
        ledger: &L,
    ) -> Result<SignedTransaction, WorkflowError> {
        self.begin("write");
        let result = self.run_write(key, contract, function, args, ledger);
        self.settle(result)
    }

    fn run_write<L: LedgerClient + ?Sized>(
        &mut self,
        key: &KeyPair,
        contract: &ContractHandle,
        function: &str,
        args: &[AbiValue],
        ledger: &L,
    ) -> Result<SignedTransaction, WorkflowError> {
        let data = lookup(contract, function)?
            .encode_call(args)
            .map_err(WorkflowError::at(WorkflowState::Built))?;
        let kind = TxKind::Call {
            contract: contract.address(),
            data,
            value: U256::ZERO,
        };
        let gas_limit = self.config.gas.contract_call;
        self.submit(key, kind, gas_limit, ledger)
    }

    /// Submits a plain value transfer.
    pub fn transfer<L: LedgerClient + ?Sized>(
        &mut self,
        key: &KeyPair,
        to: Address,
        value: U256,
        ledger: &L,
    ) -> Result<SignedTransaction, WorkflowError> {
        self.begin("transfer");
        let gas_limit = self.config.gas.transfer;
        let result = self.submit(key, TxKind::Transfer { to, value }, gas_limit, ledger);
        self.settle(result)
    }

    /// Polls for the receipt of an already-submitted transaction.
    ///
    /// A receipt with failed status is reported as [`EthError::Rejected`].
    pub fn await_receipt<L: LedgerClient + ?Sized>(
        &mut self,
        hash: B256,
        ledger: &L,
    ) -> Result<Receipt, WorkflowError> {
        self.state = WorkflowState::Submitted;
        let result = self.poll_receipt(hash, ledger);
        self.settle(result)
    }

    /// nonce -> gas price -> assemble -> sign -> submit.
    fn submit<L: LedgerClient + ?Sized>(
        &mut self,
        key: &KeyPair,
        kind: TxKind,
        gas_limit: u64,
        ledger: &L,
    ) -> Result<SignedTransaction, WorkflowError> {
        let builder = TransactionBuilder::new(self.config.chain_id).with_gas_limit(gas_limit);

        let nonce = builder
            .fetch_nonce(key.address(), ledger)
            .map_err(WorkflowError::at(WorkflowState::NonceFetched))?;
        self.advance(WorkflowState::NonceFetched);

        let gas_price = builder
            .fetch_gas_price(ledger)
            .map_err(WorkflowError::at(WorkflowState::GasPriced))?;
        self.advance(WorkflowState::GasPriced);

        let tx = builder
            .assemble(nonce, gas_price, kind)
            .map_err(WorkflowError::at(WorkflowState::Built))?;
        self.advance(WorkflowState::Built);

        let signed = signer::sign(&tx, key).map_err(WorkflowError::at(WorkflowState::Signed))?;
        self.advance(WorkflowState::Signed);

        let acknowledged = ledger
            .submit_raw_transaction(signed.raw())
            .map_err(EthError::from)
            .map_err(WorkflowError::at(WorkflowState::Submitted))?;
        if acknowledged != signed.hash() {
            tracing::warn!(
                local = %signed.hash(),
                ledger = %acknowledged,
                "ledger acknowledged a different transaction hash"
            );
        }
        self.advance(WorkflowState::Submitted);

        tracing::info!(
            from = %key.address(),
            nonce,
            tx = %signed.hash(),
            "transaction submitted"
        );
        Ok(signed)
    }

    fn poll_receipt<L: LedgerClient + ?Sized>(
        &mut self,
        hash: B256,
        ledger: &L,
    ) -> Result<Receipt, WorkflowError> {
        let policy = &self.config.confirmation;
        let max_polls = policy.max_polls;
        let interval = policy.poll_interval();

        for poll in 1..=max_polls {
            let receipt = ledger
                .receipt_for(hash)
                .map_err(EthError::from)
                .map_err(WorkflowError::at(WorkflowState::Confirmed))?;

            match receipt {
                Some(receipt) if receipt.status => {
                    self.advance(WorkflowState::Confirmed);
                    return Ok(receipt);
                }
                Some(receipt) => {
                    return Err(WorkflowError::Step {
                        stage: WorkflowState::Confirmed,
                        source: EthError::Rejected(format!(
                            "transaction {hash} reverted in block {}",
                            receipt.block_number
                        )),
                    });
                }
                None => {
                    tracing::debug!(tx = %hash, poll, max_polls, "receipt not yet available");
                    if poll < max_polls && !interval.is_zero() {
                        thread::sleep(interval);
                    }
                }
            }
        }

        Err(WorkflowError::Unconfirmed {
            hash: hash.to_string(),
            polls: max_polls,
        })
    }

    fn begin(&mut self, operation: &'static str) {
        tracing::debug!(operation, chain_id = self.config.chain_id, "starting");
        self.state = WorkflowState::Idle;
    }

    fn advance(&mut self, next: WorkflowState) {
        tracing::debug!(from = %self.state, to = %next, "workflow step");
        self.state = next;
    }

    fn settle<T>(&mut self, result: Result<T, WorkflowError>) -> Result<T, WorkflowError> {
        if let Err(err) = &result {
            tracing::warn!(reached = %self.state, error = %err, "workflow failed");
            self.state = WorkflowState::Failed;
        }
        result
    }
}

fn lookup<'c>(contract: &'c ContractHandle, name: &str) -> Result<&'c Function, WorkflowError> {
    contract
        .function(name)
        .ok_or_else(|| WorkflowError::UnknownFunction(name.to_string()))
}
