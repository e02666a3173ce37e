//! Contract descriptions: compiled artifacts and handles to deployed code.

use alloy_primitives::Address;
use chain_eth::abi::{self, AbiType, AbiValue};
use chain_eth::error::EthError;

/// One callable contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<AbiType>,
    pub outputs: Vec<AbiType>,
}

impl Function {
    pub fn new(name: impl Into<String>, inputs: Vec<AbiType>, outputs: Vec<AbiType>) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
        }
    }

    /// Canonical signature, e.g. `setItem(bytes32,bytes32)`.
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.inputs.iter().map(AbiType::canonical_name).collect();
        format!("{}({})", self.name, params.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        abi::function_selector(&self.signature())
    }

    /// Selector followed by the encoded arguments.
    pub fn encode_call(&self, args: &[AbiValue]) -> Result<Vec<u8>, EthError> {
        check_arguments(&self.signature(), &self.inputs, args)?;
        Ok(abi::encode_function_call(self.selector(), args))
    }

    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<AbiValue>, EthError> {
        abi::decode(&self.outputs, data)
    }
}

fn check_arguments(context: &str, expected: &[AbiType], args: &[AbiValue]) -> Result<(), EthError> {
    if expected.len() != args.len() {
        return Err(EthError::Encoding(format!(
            "{context} takes {} arguments, got {}",
            expected.len(),
            args.len()
        )));
    }
    for (index, (ty, value)) in expected.iter().zip(args).enumerate() {
        if value.abi_type() != *ty {
            return Err(EthError::Encoding(format!(
                "{context} argument {index}: expected {}, got {}",
                ty.canonical_name(),
                value.abi_type().canonical_name()
            )));
        }
    }
    Ok(())
}

/// Compiled contract ready to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub bytecode: Vec<u8>,
    pub constructor_inputs: Vec<AbiType>,
    /// Functions exposed by the handle a deployment returns.
    pub functions: Vec<Function>,
}

impl ContractArtifact {
    pub fn new(bytecode: Vec<u8>, constructor_inputs: Vec<AbiType>, functions: Vec<Function>) -> Self {
        Self {
            bytecode,
            constructor_inputs,
            functions,
        }
    }

    /// Creation payload: bytecode with encoded constructor arguments appended.
    pub fn creation_payload(&self, constructor_args: &[AbiValue]) -> Result<Vec<u8>, EthError> {
        if self.bytecode.is_empty() {
            return Err(EthError::Encoding("artifact has no bytecode".into()));
        }
        check_arguments("constructor", &self.constructor_inputs, constructor_args)?;

        let mut payload = self.bytecode.clone();
        payload.extend_from_slice(&abi::encode_params(constructor_args));
        Ok(payload)
    }

    pub(crate) fn handle_at(&self, address: Address) -> ContractHandle {
        ContractHandle::at(address, self.functions.clone())
    }
}

/// A deployed contract: its address plus the functions callers may invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractHandle {
    address: Address,
    functions: Vec<Function>,
}

impl ContractHandle {
    /// Binds to an already-deployed contract.
    pub fn at(address: Address, functions: Vec<Function>) -> Self {
        Self { address, functions }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// First function with this name. Overloads are not distinguished.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}
