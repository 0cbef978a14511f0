//! Stack, memory, storage and control flow

use super::{expansion_cost, Control};
use crate::error::{HaltReason, OpResult};
use crate::frame::Frame;
use crate::gas::{SlotChange, Tier};
use crate::host::Host;
use crate::memory::{resolve, resolve_fixed};
use crate::opcode;
use crate::word::saturating_usize;
use keel_primitives::U256;

pub(crate) fn stop(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    frame.output = Default::default();
    Ok(Control::Success)
}

pub(crate) fn invalid(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    Err(HaltReason::InvalidOperation(frame.current_opcode()))
}

pub(crate) fn pop(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    frame.stack.pop()?;
    Ok(Control::Continue)
}

pub(crate) fn word_access_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let range = resolve_fixed(frame.stack.peek(0)?, 32)?;
    Ok(host.gas().tier_cost(Tier::VeryLow) + expansion_cost(frame, host, &[Some(range)]))
}

pub(crate) fn byte_access_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let range = resolve_fixed(frame.stack.peek(0)?, 1)?;
    Ok(host.gas().tier_cost(Tier::VeryLow) + expansion_cost(frame, host, &[Some(range)]))
}

pub(crate) fn mload(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let range = resolve_fixed(frame.stack.pop()?, 32)?;
    let value = frame.memory.load_word(range.offset);
    frame.stack.push(value)?;
    Ok(Control::Continue)
}

pub(crate) fn mstore(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let [offset, value] = frame.stack.pop_n()?;
    let range = resolve_fixed(offset, 32)?;
    frame.memory.store_word(range.offset, value);
    Ok(Control::Continue)
}

pub(crate) fn mstore8(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let [offset, value] = frame.stack.pop_n()?;
    let range = resolve_fixed(offset, 1)?;
    frame.memory.store_byte(range.offset, value.byte(0));
    Ok(Control::Continue)
}

pub(crate) fn sload_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let key = frame.stack.peek(0)?;
    Ok(host
        .gas()
        .sload_cost(host.substate.is_slot_warm(&frame.address, key)))
}

pub(crate) fn sload(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let key = frame.stack.pop()?;
    host.substate.warm_slot(frame.address, key);
    let value = host.state.storage(&frame.address, key);
    frame.stack.push(value)?;
    Ok(Control::Continue)
}

fn slot_change(frame: &Frame, host: &Host<'_>, key: U256, new: U256) -> SlotChange {
    SlotChange {
        original: host.state.original_storage(&frame.address, key),
        current: host.state.storage(&frame.address, key),
        new,
    }
}

pub(crate) fn sstore_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    if frame.is_static {
        return Err(HaltReason::StaticStateChange);
    }
    let sentry = host.gas().sstore_sentry();
    if sentry > 0 && frame.gas_remaining <= sentry {
        return Err(HaltReason::InsufficientGas);
    }
    let key = frame.stack.peek(0)?;
    let value = frame.stack.peek(1)?;
    let change = slot_change(frame, host, key, value);
    let warm = host.substate.is_slot_warm(&frame.address, key);
    Ok(host.gas().sstore_cost(change, warm))
}

pub(crate) fn sstore(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let [key, value] = frame.stack.pop_n()?;
    let change = slot_change(frame, host, key, value);
    let refund = host.gas().sstore_refund(change);
    host.substate.add_refund(refund);
    host.substate.warm_slot(frame.address, key);
    host.state.set_storage(&frame.address, key, value);
    Ok(Control::Continue)
}

fn checked_destination(frame: &Frame, dest: U256) -> OpResult<usize> {
    let dest = saturating_usize(dest);
    if frame.code.is_jump_dest(dest) {
        Ok(dest)
    } else {
        Err(HaltReason::InvalidJumpDestination(dest))
    }
}

pub(crate) fn jump(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let dest = frame.stack.pop()?;
    Ok(Control::Jump(checked_destination(frame, dest)?))
}

pub(crate) fn jumpi(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let [dest, condition] = frame.stack.pop_n()?;
    if condition.is_zero() {
        return Ok(Control::Continue);
    }
    Ok(Control::Jump(checked_destination(frame, dest)?))
}

pub(crate) fn pc(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let pc = frame.pc;
    frame.stack.push(U256::from(pc))?;
    Ok(Control::Continue)
}

pub(crate) fn msize(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let len = frame.memory.len();
    frame.stack.push(U256::from(len))?;
    Ok(Control::Continue)
}

pub(crate) fn gas(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let remaining = frame.gas_remaining;
    frame.stack.push(U256::from(remaining))?;
    Ok(Control::Continue)
}

pub(crate) fn jumpdest(_frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    Ok(Control::Continue)
}

pub(crate) fn transient_gas(_frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    Ok(host.gas().transient_storage_cost())
}

pub(crate) fn tstore_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    if frame.is_static {
        return Err(HaltReason::StaticStateChange);
    }
    transient_gas(frame, host)
}

pub(crate) fn tload(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let key = frame.stack.pop()?;
    let value = host.substate.transient(&frame.address, key);
    frame.stack.push(value)?;
    Ok(Control::Continue)
}

pub(crate) fn tstore(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let [key, value] = frame.stack.pop_n()?;
    host.substate.set_transient(frame.address, key, value);
    Ok(Control::Continue)
}

pub(crate) fn mcopy_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let len = frame.stack.peek(2)?;
    let dest = resolve(frame.stack.peek(0)?, len)?;
    let src = resolve(frame.stack.peek(1)?, len)?;
    let copied = dest.map_or(0, |r| r.len);
    Ok(host
        .gas()
        .tier_cost(Tier::VeryLow)
        .saturating_add(host.gas().copy_cost(copied))
        .saturating_add(expansion_cost(frame, host, &[dest, src])))
}

pub(crate) fn mcopy(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let [dest, src, len] = frame.stack.pop_n()?;
    if let (Some(dest), Some(src)) = (resolve(dest, len)?, resolve(src, len)?) {
        frame.memory.copy_within(dest.offset, src.offset, dest.len);
    }
    Ok(Control::Continue)
}

pub(crate) fn push0(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    frame.stack.push(U256::zero())?;
    Ok(Control::Continue)
}

/// PUSH1..PUSH32. Immediates running past the end of code read as zero.
pub(crate) fn push(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let size = opcode::immediate_size(frame.current_opcode());
    let code = frame.code.bytes();
    let start = (frame.pc + 1).min(code.len());
    let end = (frame.pc + 1 + size).min(code.len());
    let mut buf = [0u8; 32];
    buf[32 - size..32 - size + (end - start)].copy_from_slice(&code[start..end]);
    frame.stack.push(U256::from_big_endian(&buf))?;
    Ok(Control::Skip(size))
}

pub(crate) fn dup(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let depth = (frame.current_opcode() - opcode::DUP1) as usize + 1;
    frame.stack.dup(depth)?;
    Ok(Control::Continue)
}

pub(crate) fn swap(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let depth = (frame.current_opcode() - opcode::SWAP1) as usize + 1;
    frame.stack.swap(depth)?;
    Ok(Control::Continue)
}
