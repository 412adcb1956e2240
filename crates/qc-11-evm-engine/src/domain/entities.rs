//! # Core Domain Entities
//!
//! The data the engine consumes and produces: the per-execution
//! [`Environment`], the immutable [`Message`] describing one call or
//! creation, and the [`ExecutionResult`] handed back to the caller.

use crate::domain::services::decode_revert_reason;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, U256};
use crate::errors::FailureKind;
use serde::{Deserialize, Serialize};

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Immutable context for one top-level execution.
///
/// Owned by the caller and read-only to every frame. The active revision's
/// flags and cost tables travel separately in the engine's
/// [`ProtocolConfig`](crate::config::ProtocolConfig).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Environment {
    /// Transaction sender (EOA that initiated the transaction).
    pub origin: Address,
    /// Gas price paid by the origin.
    pub gas_price: U256,
    /// Current block header fields.
    pub block: BlockContext,
    /// Accounts and slots to pre-warm (EIP-2930 access list).
    #[serde(default)]
    pub access_list: Vec<AccessListItem>,
}

impl Environment {
    /// Creates an environment for `origin` in `block`.
    #[must_use]
    pub fn new(origin: Address, block: BlockContext) -> Self {
        Self {
            origin,
            gas_price: U256::zero(),
            block,
            access_list: Vec::new(),
        }
    }

    /// Sets the gas price.
    #[must_use]
    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Sets the access list.
    #[must_use]
    pub fn with_access_list(mut self, access_list: Vec<AccessListItem>) -> Self {
        self.access_list = access_list;
        self
    }
}

/// One entry of an EIP-2930 access list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListItem {
    /// Account to pre-warm.
    pub address: Address,
    /// Storage slots of that account to pre-warm.
    pub storage_keys: Vec<StorageKey>,
}

// =============================================================================
// BLOCK CONTEXT
// =============================================================================

/// Block header fields visible to executing code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockContext {
    /// Block number.
    pub number: u64,
    /// Block timestamp (unix seconds).
    pub timestamp: u64,
    /// Coinbase address (block proposer).
    pub coinbase: Address,
    /// Block difficulty (pre-merge value of opcode 0x44).
    pub difficulty: U256,
    /// Beacon randomness (post-merge value of opcode 0x44).
    pub prev_randao: Hash,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Base fee (EIP-1559).
    pub base_fee: U256,
    /// Chain ID (EIP-155).
    pub chain_id: u64,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            coinbase: Address::ZERO,
            difficulty: U256::zero(),
            prev_randao: Hash::ZERO,
            gas_limit: 30_000_000,
            base_fee: U256::zero(),
            chain_id: 1,
        }
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// How a message was issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    /// Plain message call.
    Call,
    /// Runs the target's code against the caller's own account.
    CallCode,
    /// Like `CallCode`, also keeping the parent's caller and value.
    DelegateCall,
    /// Read-only call; the callee and its descendants are static.
    StaticCall,
    /// Contract creation, address derived from the sender nonce.
    Create,
    /// Contract creation, address derived from a salt and the init code hash.
    Create2 {
        /// Salt supplied by the creator.
        salt: Hash,
    },
}

impl CallKind {
    /// True for CREATE and CREATE2.
    #[must_use]
    pub const fn is_create(&self) -> bool {
        matches!(self, Self::Create | Self::Create2 { .. })
    }

    /// True when the message moves `value` from caller to recipient.
    #[must_use]
    pub const fn transfers_value(&self) -> bool {
        matches!(
            self,
            Self::Call | Self::CallCode | Self::Create | Self::Create2 { .. }
        )
    }

    /// Short label used in tracing spans.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::CallCode => "callcode",
            Self::DelegateCall => "delegatecall",
            Self::StaticCall => "staticcall",
            Self::Create => "create",
            Self::Create2 { .. } => "create2",
        }
    }
}

/// One call or creation, immutable once built.
///
/// For creations `target` is `None` and `input` holds the init code. For
/// CALLCODE and DELEGATECALL, `target` is the account whose storage and
/// balance the code runs against while `code_address` names the account the
/// code is loaded from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Call kind.
    pub kind: CallKind,
    /// Immediate sender.
    pub caller: Address,
    /// Recipient account, `None` for creation.
    pub target: Option<Address>,
    /// Account providing the code when it differs from `target`.
    pub code_address: Option<Address>,
    /// Value transferred, or the apparent value for DELEGATECALL.
    pub value: U256,
    /// Calldata, or init code for creation.
    pub input: Bytes,
    /// Gas granted to the callee.
    pub gas_limit: u64,
    /// Static context flag.
    pub is_static: bool,
    /// Call depth, zero at top level.
    pub depth: usize,
}

impl Message {
    /// Builds a top-level CALL.
    #[must_use]
    pub fn call(caller: Address, target: Address, value: U256, input: Bytes, gas_limit: u64) -> Self {
        Self {
            kind: CallKind::Call,
            caller,
            target: Some(target),
            code_address: None,
            value,
            input,
            gas_limit,
            is_static: false,
            depth: 0,
        }
    }

    /// Builds a top-level CREATE.
    #[must_use]
    pub fn create(caller: Address, value: U256, init_code: Bytes, gas_limit: u64) -> Self {
        Self {
            kind: CallKind::Create,
            caller,
            target: None,
            code_address: None,
            value,
            input: init_code,
            gas_limit,
            is_static: false,
            depth: 0,
        }
    }

    /// Builds a top-level CREATE2.
    #[must_use]
    pub fn create2(
        caller: Address,
        value: U256,
        init_code: Bytes,
        salt: Hash,
        gas_limit: u64,
    ) -> Self {
        Self {
            kind: CallKind::Create2 { salt },
            ..Self::create(caller, value, init_code, gas_limit)
        }
    }

    /// Marks the message static (STATICCALL semantics).
    #[must_use]
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Sets the call depth.
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Account the code executes against.
    #[must_use]
    pub fn recipient(&self) -> Option<Address> {
        self.target
    }

    /// Account the code is loaded from.
    #[must_use]
    pub fn code_source(&self) -> Option<Address> {
        self.code_address.or(self.target)
    }
}

// =============================================================================
// EXECUTION RESULT
// =============================================================================

/// Outcome of a top-level execution.
///
/// Exactly one of `success == true` or `failure == Some(_)` holds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether execution succeeded.
    pub success: bool,
    /// Return data (deployed code for a successful creation).
    pub output: Bytes,
    /// Gas used before refunds.
    pub gas_used: u64,
    /// Refund granted after the cap, zero unless successful.
    pub gas_refund: u64,
    /// Logs emitted by committed frames.
    pub logs: Vec<Log>,
    /// Address of the created contract (creation only).
    pub created_address: Option<Address>,
    /// Failure kind when `success` is false.
    pub failure: Option<FailureKind>,
    /// Final operand stack, bottom first. Filled by `run_code` only.
    pub stack: Vec<U256>,
}

impl ExecutionResult {
    /// Creates a successful execution result.
    #[must_use]
    pub fn success(output: Bytes, gas_used: u64) -> Self {
        Self {
            success: true,
            output,
            gas_used,
            ..Self::default()
        }
    }

    /// Creates a failed execution result.
    #[must_use]
    pub fn failure(kind: FailureKind, output: Bytes, gas_used: u64) -> Self {
        Self {
            success: false,
            output,
            gas_used,
            failure: Some(kind),
            ..Self::default()
        }
    }

    /// Gas charged after the refund is applied.
    #[must_use]
    pub fn net_gas_used(&self) -> u64 {
        self.gas_used.saturating_sub(self.gas_refund)
    }

    /// True when the frame ended with REVERT.
    #[must_use]
    pub fn is_revert(&self) -> bool {
        self.failure == Some(FailureKind::RevertedByContract)
    }

    /// Decodes an `Error(string)` revert payload, if present.
    #[must_use]
    pub fn revert_reason(&self) -> Option<String> {
        if self.is_revert() {
            decode_revert_reason(self.output.as_slice())
        } else {
            None
        }
    }
}

// =============================================================================
// LOG (EVENT)
// =============================================================================

/// Log entry emitted by LOG0..LOG4.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Indexed topics (up to 4).
    pub topics: Vec<Hash>,
    /// Non-indexed data.
    pub data: Bytes,
}

impl Log {
    /// Creates a new log.
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}

// =============================================================================
// ACCOUNT STATE (for StateAccess port)
// =============================================================================

/// Account fields held by the state collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Account balance.
    pub balance: U256,
    /// Account nonce.
    pub nonce: u64,
    /// Code hash (keccak256 of code, or empty hash for EOA).
    pub code_hash: Hash,
}

impl Default for AccountState {
    fn default() -> Self {
        Self::new_eoa(U256::zero(), 0)
    }
}

impl AccountState {
    /// Empty code hash (keccak256 of empty bytes).
    pub const EMPTY_CODE_HASH: Hash = Hash([
        0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c,
        0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
        0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b,
        0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
    ]);

    /// Creates a new account without code.
    #[must_use]
    pub fn new_eoa(balance: U256, nonce: u64) -> Self {
        Self {
            balance,
            nonce,
            code_hash: Self::EMPTY_CODE_HASH,
        }
    }

    /// Returns true if the account carries code.
    #[must_use]
    pub fn has_code(&self) -> bool {
        self.code_hash != Self::EMPTY_CODE_HASH && !self.code_hash.is_zero()
    }

    /// Returns true if this account is empty (EIP-161).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && !self.has_code()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_create2_keeps_salt() {
        let salt = Hash::new([7u8; 32]);
        let msg = Message::create2(Address::new([1u8; 20]), U256::zero(), Bytes::new(), salt, 100);
        assert_eq!(msg.kind, CallKind::Create2 { salt });
        assert!(msg.kind.is_create());
        assert!(msg.target.is_none());
    }

    #[test]
    fn test_message_code_source_falls_back_to_target() {
        let target = Address::new([2u8; 20]);
        let mut msg = Message::call(Address::ZERO, target, U256::zero(), Bytes::new(), 10);
        assert_eq!(msg.code_source(), Some(target));

        let code = Address::new([3u8; 20]);
        msg.code_address = Some(code);
        assert_eq!(msg.code_source(), Some(code));
        assert_eq!(msg.recipient(), Some(target));
    }

    #[test]
    fn test_call_kind_value_transfer() {
        assert!(CallKind::Call.transfers_value());
        assert!(CallKind::CallCode.transfers_value());
        assert!(!CallKind::DelegateCall.transfers_value());
        assert!(!CallKind::StaticCall.transfers_value());
    }

    #[test]
    fn test_execution_result_revert_reason() {
        let mut payload = vec![0x08, 0xc3, 0x79, 0xa0];
        let mut word = [0u8; 32];
        word[31] = 0x20;
        payload.extend_from_slice(&word);
        word[31] = 4;
        payload.extend_from_slice(&word);
        let mut text = [0u8; 32];
        text[..4].copy_from_slice(b"nope");
        payload.extend_from_slice(&text);

        let result =
            ExecutionResult::failure(FailureKind::RevertedByContract, Bytes::from_vec(payload), 10);
        assert_eq!(result.revert_reason().as_deref(), Some("nope"));
    }

    #[test]
    fn test_execution_result_non_revert_has_no_reason() {
        let result = ExecutionResult::failure(FailureKind::OutOfGas, Bytes::new(), 10);
        assert!(result.revert_reason().is_none());
        assert!(!result.success);
    }

    #[test]
    fn test_account_state_empty() {
        assert!(AccountState::default().is_empty());
        assert!(!AccountState::new_eoa(U256::from(1), 0).is_empty());
        assert!(!AccountState::new_eoa(U256::zero(), 1).is_empty());
    }
}
