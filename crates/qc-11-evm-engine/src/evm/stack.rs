//! # Operand Stack
//!
//! Bounded LIFO of 256-bit words. The interpreter validates each
//! instruction's arity with [`Stack::require`] before executing it, so the
//! pops and pushes that follow cannot fail half-way through an instruction.

use crate::domain::value_objects::{Address, U256};
use crate::errors::VmError;

/// Default stack limit.
pub const MAX_STACK_SIZE: usize = 1024;

/// Operand stack of one frame.
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<U256>,
    limit: usize,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    /// Creates an empty stack with the default limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(MAX_STACK_SIZE)
    }

    /// Creates an empty stack holding at most `limit` words.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            data: Vec::with_capacity(limit.min(64)),
            limit,
        }
    }

    /// Words currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no words are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks that an instruction popping `inputs` and pushing `outputs`
    /// fits the current stack.
    ///
    /// # Errors
    ///
    /// `StackUnderflow` when fewer than `inputs` words are present,
    /// `StackOverflow` when the net growth would pass the limit.
    pub fn require(&self, inputs: usize, outputs: usize) -> Result<(), VmError> {
        let len = self.data.len();
        if len < inputs {
            return Err(VmError::StackUnderflow);
        }
        if len - inputs + outputs > self.limit {
            return Err(VmError::StackOverflow);
        }
        Ok(())
    }

    /// Places `value` on top.
    ///
    /// # Errors
    ///
    /// `StackOverflow` once `limit` words are held.
    pub fn push(&mut self, value: U256) -> Result<(), VmError> {
        if self.data.len() == self.limit {
            return Err(VmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pushes 1 for `true`, 0 for `false`.
    ///
    /// # Errors
    ///
    /// Returns `StackOverflow` if the stack is full.
    pub fn push_bool(&mut self, value: bool) -> Result<(), VmError> {
        self.push(if value { U256::one() } else { U256::zero() })
    }

    /// Removes and returns the top word.
    ///
    /// # Errors
    ///
    /// `StackUnderflow` on an empty stack.
    pub fn pop(&mut self) -> Result<U256, VmError> {
        self.data.pop().ok_or(VmError::StackUnderflow)
    }

    /// Pops a word and truncates it to an address.
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if the stack is empty.
    pub fn pop_address(&mut self) -> Result<Address, VmError> {
        self.pop().map(Address::from_word)
    }

    /// Pops `N` words, top of stack first.
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if fewer than `N` words are present.
    pub fn pop_n<const N: usize>(&mut self) -> Result<[U256; N], VmError> {
        if self.data.len() < N {
            return Err(VmError::StackUnderflow);
        }
        let mut out = [U256::zero(); N];
        for slot in &mut out {
            *slot = self.pop()?;
        }
        Ok(out)
    }

    /// The word `depth` positions below the top, which is depth 0.
    ///
    /// # Errors
    ///
    /// `StackUnderflow` when fewer than `depth + 1` words are held.
    pub fn peek_at(&self, depth: usize) -> Result<U256, VmError> {
        self.data
            .iter()
            .rev()
            .nth(depth)
            .copied()
            .ok_or(VmError::StackUnderflow)
    }

    /// SWAPn: exchanges the top with the word `n` below it.
    ///
    /// # Errors
    ///
    /// `StackUnderflow` when `n` is zero or reaches past the bottom.
    pub fn swap(&mut self, n: usize) -> Result<(), VmError> {
        if n == 0 || n >= self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        let len = self.data.len();
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// DUPn with `n` counted from zero at the top.
    ///
    /// # Errors
    ///
    /// `StackUnderflow` when the source word is missing, `StackOverflow`
    /// when the copy does not fit.
    pub fn dup(&mut self, n: usize) -> Result<(), VmError> {
        let value = self.peek_at(n)?;
        self.push(value)
    }

    /// Stack contents, bottom first.
    #[must_use]
    pub fn as_slice(&self) -> &[U256] {
        &self.data
    }

    /// Consumes the stack, returning its words bottom first.
    #[must_use]
    pub fn into_vec(self) -> Vec<U256> {
        self.data
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let mut stack = Stack::new();
        stack.push(U256::from(42)).unwrap();
        stack.push(U256::from(100)).unwrap();

        let [top, below] = stack.pop_n::<2>().unwrap();
        assert_eq!(top, U256::from(100));
        assert_eq!(below, U256::from(42));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_require_reports_underflow_before_overflow() {
        let stack = Stack::with_limit(2);
        assert!(matches!(stack.require(1, 0), Err(VmError::StackUnderflow)));

        let mut stack = Stack::with_limit(2);
        stack.push(U256::one()).unwrap();
        stack.push(U256::one()).unwrap();
        assert!(stack.require(2, 1).is_ok());
        assert!(matches!(stack.require(1, 2), Err(VmError::StackOverflow)));
        assert!(matches!(stack.require(0, 1), Err(VmError::StackOverflow)));
    }

    #[test]
    fn test_swap_and_dup() {
        let mut stack = Stack::new();
        for v in 1..=3u64 {
            stack.push(U256::from(v)).unwrap();
        }

        stack.swap(2).unwrap();
        assert_eq!(stack.as_slice(), &[U256::from(3), U256::from(2), U256::from(1)]);

        stack.dup(1).unwrap();
        assert_eq!(stack.peek_at(0).unwrap(), U256::from(2));
        assert!(stack.swap(0).is_err());
        assert!(stack.dup(4).is_err());
    }

    #[test]
    fn test_pop_address_truncates() {
        let mut stack = Stack::new();
        stack.push(U256::MAX).unwrap();
        assert_eq!(stack.pop_address().unwrap(), Address::new([0xff; 20]));
    }

    #[test]
    fn test_limit_enforced() {
        let mut stack = Stack::new();
        for i in 0..MAX_STACK_SIZE {
            stack.push(U256::from(i)).unwrap();
        }
        assert!(matches!(stack.push(U256::zero()), Err(VmError::StackOverflow)));
        assert!(matches!(stack.dup(0), Err(VmError::StackOverflow)));
    }
}
