//! Logging, calls, creation and frame termination

use super::{expansion_cost, Control};
use crate::config::Fork;
use crate::error::{HaltReason, OpResult};
use crate::frame::{Frame, FrameKind};
use crate::host::Host;
use crate::memory::resolve;
use crate::message::{CallScheme, Message};
use crate::opcode;
use crate::processor::{create2_address, create_address};
use crate::substate::Log;
use bytes::Bytes;
use keel_primitives::{word_to_bytes, Address, H256, U256};

pub(crate) fn log_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    if frame.is_static {
        return Err(HaltReason::StaticStateChange);
    }
    let topics = (frame.current_opcode() - opcode::LOG0) as usize;
    let range = resolve(frame.stack.peek(0)?, frame.stack.peek(1)?)?;
    Ok(host
        .gas()
        .log_cost(topics, range.map_or(0, |r| r.len))
        .saturating_add(expansion_cost(frame, host, &[range])))
}

pub(crate) fn log(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let count = (frame.current_opcode() - opcode::LOG0) as usize;
    let [offset, len] = frame.stack.pop_n()?;
    let mut topics = Vec::with_capacity(count);
    for _ in 0..count {
        topics.push(H256::from(word_to_bytes(frame.stack.pop()?)));
    }
    let data = Bytes::from(frame.memory.read(resolve(offset, len)?));
    host.substate.add_log(Log {
        address: frame.address,
        topics,
        data,
    });
    Ok(Control::Continue)
}

/// Reject a call or create without building a child frame.
fn reject(frame: &mut Frame, reserved_gas: u64, reason: HaltReason) -> OpResult<Control> {
    frame.return_gas(reserved_gas);
    frame.stack.push(U256::zero())?;
    Ok(Control::Rejected(reason))
}

fn exceeds_depth(frame: &Frame, host: &Host<'_>) -> bool {
    frame.depth + 1 > host.config.max_call_depth()
}

pub(crate) fn create_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    if frame.is_static {
        return Err(HaltReason::StaticStateChange);
    }
    let range = resolve(frame.stack.peek(1)?, frame.stack.peek(2)?)?;
    let len = range.map_or(0, |r| r.len);
    if let Some(limit) = host.config.max_initcode_size() {
        if len > limit {
            return Err(HaltReason::InitCodeTooLarge);
        }
    }
    let mut cost = host
        .gas()
        .create_cost()
        .saturating_add(host.gas().init_code_cost(len))
        .saturating_add(expansion_cost(frame, host, &[range]));
    if frame.current_opcode() == opcode::CREATE2 {
        cost = cost.saturating_add(host.gas().create2_hash_cost(len));
    }
    Ok(cost)
}

fn create_with(frame: &mut Frame, host: &mut Host<'_>, scheme: CallScheme) -> OpResult<Control> {
    let [value, offset, len] = frame.stack.pop_n()?;
    let salt = match scheme {
        CallScheme::Create2 => Some(frame.stack.pop()?),
        _ => None,
    };
    let init_code = Bytes::from(frame.memory.read(resolve(offset, len)?));
    frame.return_data = Bytes::new();

    if host.state.balance(&frame.address) < value {
        return reject(frame, 0, HaltReason::InsufficientBalance);
    }
    if exceeds_depth(frame, host) {
        return reject(frame, 0, HaltReason::CallDepthExceeded);
    }
    let nonce = host.state.nonce(&frame.address);
    if nonce == u64::MAX {
        return reject(frame, 0, HaltReason::IllegalStateChange);
    }
    host.state.set_nonce(&frame.address, nonce + 1);

    let address = match salt {
        Some(salt) => create2_address(&frame.address, salt, &init_code),
        None => create_address(&frame.address, nonce),
    };
    host.substate.warm_address(address);

    let child_gas = host
        .gas()
        .gas_available_for_child_call(frame.gas_remaining, U256::MAX);
    frame.use_gas(child_gas)?;

    let mut message = Message::create(frame.address, address, init_code, value, child_gas)
        .with_depth(frame.depth + 1);
    message.scheme = scheme;
    Ok(Control::Spawn(Box::new(message)))
}

pub(crate) fn create(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    create_with(frame, host, CallScheme::Create)
}

pub(crate) fn create2(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    create_with(frame, host, CallScheme::Create2)
}

fn scheme_of(opcode: u8) -> CallScheme {
    match opcode {
        opcode::CALLCODE => CallScheme::CallCode,
        opcode::DELEGATECALL => CallScheme::DelegateCall,
        opcode::STATICCALL => CallScheme::StaticCall,
        _ => CallScheme::Call,
    }
}

fn carries_value(scheme: CallScheme) -> bool {
    matches!(scheme, CallScheme::Call | CallScheme::CallCode)
}

/// CALL family gas, excluding the gas forwarded to the callee.
pub(crate) fn call_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let scheme = scheme_of(frame.current_opcode());
    let target = Address::from_word(frame.stack.peek(1)?);
    let (value, args) = if carries_value(scheme) {
        (frame.stack.peek(2)?, 3)
    } else {
        (U256::zero(), 2)
    };
    if frame.is_static && scheme == CallScheme::Call && !value.is_zero() {
        return Err(HaltReason::StaticStateChange);
    }
    let input = resolve(frame.stack.peek(args)?, frame.stack.peek(args + 1)?)?;
    let output = resolve(frame.stack.peek(args + 2)?, frame.stack.peek(args + 3)?)?;

    let transfers_value = !value.is_zero();
    let creates_account = scheme == CallScheme::Call && host.state.is_dead(&target);
    Ok(host
        .gas()
        .call_cost(host.substate.is_warm(&target), transfers_value, creates_account)
        .saturating_add(expansion_cost(frame, host, &[input, output])))
}

fn call_with(frame: &mut Frame, host: &mut Host<'_>, scheme: CallScheme) -> OpResult<Control> {
    let requested_gas = frame.stack.pop()?;
    let target = Address::from_word(frame.stack.pop()?);
    let value = if carries_value(scheme) {
        frame.stack.pop()?
    } else {
        U256::zero()
    };
    let [in_offset, in_len, out_offset, out_len] = frame.stack.pop_n()?;
    let input_range = resolve(in_offset, in_len)?;
    let output_range = resolve(out_offset, out_len)?;
    frame.memory.expand_range(input_range);
    frame.memory.expand_range(output_range);
    host.substate.warm_address(target);

    let child_gas = host
        .gas()
        .gas_available_for_child_call(frame.gas_remaining, requested_gas);
    frame.use_gas(child_gas)?;
    frame.return_data = Bytes::new();

    let transfers_value = !value.is_zero();
    if transfers_value && host.state.balance(&frame.address) < value {
        return reject(frame, child_gas, HaltReason::InsufficientBalance);
    }
    if exceeds_depth(frame, host) {
        return reject(frame, child_gas, HaltReason::CallDepthExceeded);
    }

    let stipend = if transfers_value {
        host.gas().call_stipend()
    } else {
        0
    };
    let (caller, recipient, call_value, moves_value, is_static) = match scheme {
        CallScheme::CallCode => (frame.address, frame.address, value, true, frame.is_static),
        CallScheme::DelegateCall => (frame.caller, frame.address, frame.value, false, frame.is_static),
        CallScheme::StaticCall => (frame.address, target, U256::zero(), true, true),
        _ => (frame.address, target, value, true, frame.is_static),
    };
    let input = Bytes::from(frame.memory.read(input_range));

    let message = Message {
        kind: FrameKind::MessageCall,
        scheme,
        caller,
        recipient,
        code_address: target,
        code: host.state.code(&target),
        input,
        value: call_value,
        transfers_value: moves_value,
        gas_limit: child_gas.saturating_add(stipend),
        depth: frame.depth + 1,
        is_static,
        return_memory: output_range,
    };
    Ok(Control::Spawn(Box::new(message)))
}

pub(crate) fn call(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    call_with(frame, host, CallScheme::Call)
}

pub(crate) fn callcode(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    call_with(frame, host, CallScheme::CallCode)
}

pub(crate) fn delegatecall(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    call_with(frame, host, CallScheme::DelegateCall)
}

pub(crate) fn staticcall(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    call_with(frame, host, CallScheme::StaticCall)
}

pub(crate) fn halt_with_data_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let range = resolve(frame.stack.peek(0)?, frame.stack.peek(1)?)?;
    Ok(expansion_cost(frame, host, &[range]))
}

pub(crate) fn return_(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let [offset, len] = frame.stack.pop_n()?;
    frame.output = Bytes::from(frame.memory.read(resolve(offset, len)?));
    Ok(Control::Success)
}

pub(crate) fn revert(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let [offset, len] = frame.stack.pop_n()?;
    frame.output = Bytes::from(frame.memory.read(resolve(offset, len)?));
    Ok(Control::Revert)
}

pub(crate) fn selfdestruct_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    if frame.is_static {
        return Err(HaltReason::StaticStateChange);
    }
    let beneficiary = Address::from_word(frame.stack.peek(0)?);
    let creates_account =
        !host.state.balance(&frame.address).is_zero() && host.state.is_dead(&beneficiary);
    Ok(host
        .gas()
        .selfdestruct_cost(host.substate.is_warm(&beneficiary), creates_account))
}

/// From Cancun only accounts created in the same transaction are deleted;
/// older accounts just hand over their balance.
pub(crate) fn selfdestruct(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let beneficiary = Address::from_word(frame.stack.pop()?);
    host.substate.warm_address(beneficiary);

    let balance = host.state.balance(&frame.address);
    let deletes = host.config.fork() < Fork::Cancun || host.substate.was_created(&frame.address);
    if beneficiary != frame.address {
        let credited = host.state.balance(&beneficiary).saturating_add(balance);
        host.state.set_balance(&beneficiary, credited);
        host.state.set_balance(&frame.address, U256::zero());
    } else if deletes {
        host.state.set_balance(&frame.address, U256::zero());
    }

    if deletes && host.substate.add_selfdestruct(frame.address) {
        let refund = host.gas().selfdestruct_refund();
        host.substate.add_refund(refund as i64);
    }
    frame.output = Bytes::new();
    Ok(Control::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_of_opcode() {
        assert_eq!(scheme_of(opcode::CALL), CallScheme::Call);
        assert_eq!(scheme_of(opcode::CALLCODE), CallScheme::CallCode);
        assert_eq!(scheme_of(opcode::DELEGATECALL), CallScheme::DelegateCall);
        assert_eq!(scheme_of(opcode::STATICCALL), CallScheme::StaticCall);
        assert!(carries_value(CallScheme::CallCode));
        assert!(!carries_value(CallScheme::DelegateCall));
    }
}
