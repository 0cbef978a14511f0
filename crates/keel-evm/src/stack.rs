//! Operand stack

use crate::error::{HaltReason, OpResult};
use keel_primitives::U256;

/// Maximum number of items on the stack
pub const STACK_LIMIT: usize = 1024;

/// Operand stack of 256-bit words, top at the end.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    data: Vec<U256>,
}

impl Stack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(32),
        }
    }

    /// Push a word
    pub fn push(&mut self, value: U256) -> OpResult<()> {
        if self.data.len() >= STACK_LIMIT {
            return Err(HaltReason::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop the top word
    pub fn pop(&mut self) -> OpResult<U256> {
        self.data.pop().ok_or(HaltReason::StackUnderflow)
    }

    /// Pop `N` words, top first.
    pub fn pop_n<const N: usize>(&mut self) -> OpResult<[U256; N]> {
        if self.data.len() < N {
            return Err(HaltReason::StackUnderflow);
        }
        let mut out = [U256::zero(); N];
        for slot in out.iter_mut() {
            *slot = self.pop()?;
        }
        Ok(out)
    }

    /// Word at `depth` below the top (0 = top)
    pub fn peek(&self, depth: usize) -> OpResult<U256> {
        if depth >= self.data.len() {
            return Err(HaltReason::StackUnderflow);
        }
        Ok(self.data[self.data.len() - 1 - depth])
    }

    /// Swap the top with the item `depth` below it (SWAPn uses depth n)
    pub fn swap(&mut self, depth: usize) -> OpResult<()> {
        let len = self.data.len();
        if depth == 0 || depth >= len {
            return Err(HaltReason::StackUnderflow);
        }
        self.data.swap(len - 1, len - 1 - depth);
        Ok(())
    }

    /// Duplicate the item `depth` from the top (DUPn uses depth n, 1 = top)
    pub fn dup(&mut self, depth: usize) -> OpResult<()> {
        if depth == 0 || depth > self.data.len() {
            return Err(HaltReason::StackUnderflow);
        }
        let value = self.data[self.data.len() - depth];
        self.push(value)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Items bottom to top
    pub fn as_slice(&self) -> &[U256] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let mut stack = Stack::new();
        stack.push(U256::from(5)).unwrap();
        stack.push(U256::from(3)).unwrap();
        let [top, second] = stack.pop_n::<2>().unwrap();
        assert_eq!(top, U256::from(3));
        assert_eq!(second, U256::from(5));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_underflow() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Err(HaltReason::StackUnderflow));
        stack.push(U256::one()).unwrap();
        assert_eq!(stack.pop_n::<2>(), Err(HaltReason::StackUnderflow));
        // a failed pop_n leaves the stack untouched
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_overflow_at_limit() {
        let mut stack = Stack::new();
        for i in 0..STACK_LIMIT {
            stack.push(U256::from(i)).unwrap();
        }
        assert_eq!(stack.push(U256::zero()), Err(HaltReason::StackOverflow));
        assert_eq!(stack.len(), STACK_LIMIT);
    }

    #[test]
    fn test_dup_and_swap() {
        let mut stack = Stack::new();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();
        stack.dup(2).unwrap();
        assert_eq!(stack.peek(0).unwrap(), U256::from(1));
        stack.swap(2).unwrap();
        assert_eq!(stack.as_slice(), &[U256::from(1), U256::from(2), U256::from(1)]);
        stack.swap(1).unwrap();
        assert_eq!(stack.peek(0).unwrap(), U256::from(2));
        assert_eq!(stack.swap(3), Err(HaltReason::StackUnderflow));
        assert_eq!(stack.dup(4), Err(HaltReason::StackUnderflow));
    }
}
