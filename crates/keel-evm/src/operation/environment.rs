//! KECCAK256, environment and block information

use super::{expansion_cost, Control};
use crate::error::{HaltReason, OpResult};
use crate::frame::Frame;
use crate::gas::Tier;
use crate::host::Host;
use crate::memory::{resolve, MemoryRange};
use crate::word::{saturating_u64, saturating_usize};
use keel_primitives::{keccak256, Address, U256};

fn push_word(frame: &mut Frame, value: U256) -> OpResult<Control> {
    frame.stack.push(value)?;
    Ok(Control::Continue)
}

fn push_address(frame: &mut Frame, address: Address) -> OpResult<Control> {
    push_word(frame, address.to_word())
}

fn range_len(range: Option<MemoryRange>) -> usize {
    range.map_or(0, |r| r.len)
}

pub(crate) fn keccak256_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let range = resolve(frame.stack.peek(0)?, frame.stack.peek(1)?)?;
    Ok(host
        .gas()
        .keccak256_cost(range_len(range))
        .saturating_add(expansion_cost(frame, host, &[range])))
}

pub(crate) fn keccak(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let [offset, len] = frame.stack.pop_n()?;
    let data = frame.memory.read(resolve(offset, len)?);
    let hash = keccak256(&data);
    push_word(frame, U256::from_big_endian(hash.as_bytes()))
}

pub(crate) fn account_access_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let address = Address::from_word(frame.stack.peek(0)?);
    Ok(host.gas().account_access_cost(host.substate.is_warm(&address)))
}

fn pop_accessed_address(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Address> {
    let address = Address::from_word(frame.stack.pop()?);
    host.substate.warm_address(address);
    Ok(address)
}

pub(crate) fn address(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let address = frame.address;
    push_address(frame, address)
}

pub(crate) fn balance(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let address = pop_accessed_address(frame, host)?;
    push_word(frame, host.state.balance(&address))
}

pub(crate) fn origin(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    push_address(frame, host.env.tx.origin)
}

pub(crate) fn caller(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let caller = frame.caller;
    push_address(frame, caller)
}

pub(crate) fn callvalue(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let value = frame.value;
    push_word(frame, value)
}

pub(crate) fn calldataload(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let offset = saturating_usize(frame.stack.pop()?);
    let mut buf = [0u8; 32];
    if offset < frame.input.len() {
        let available = (frame.input.len() - offset).min(32);
        buf[..available].copy_from_slice(&frame.input[offset..offset + available]);
    }
    push_word(frame, U256::from_big_endian(&buf))
}

pub(crate) fn calldatasize(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let len = frame.input.len();
    push_word(frame, U256::from(len))
}

/// CALLDATACOPY, CODECOPY and RETURNDATACOPY: dest, offset, len on top
pub(crate) fn copy_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let range = resolve(frame.stack.peek(0)?, frame.stack.peek(2)?)?;
    Ok(host
        .gas()
        .tier_cost(Tier::VeryLow)
        .saturating_add(host.gas().copy_cost(range_len(range)))
        .saturating_add(expansion_cost(frame, host, &[range])))
}

pub(crate) fn calldatacopy(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let [dest, offset, len] = frame.stack.pop_n()?;
    let range = resolve(dest, len)?;
    let input = frame.input.clone();
    frame.memory.write_padded(range, &input, saturating_u64(offset));
    Ok(Control::Continue)
}

pub(crate) fn codesize(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let len = frame.code.len();
    push_word(frame, U256::from(len))
}

pub(crate) fn codecopy(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let [dest, offset, len] = frame.stack.pop_n()?;
    let range = resolve(dest, len)?;
    let code = frame.code.bytes().clone();
    frame.memory.write_padded(range, &code, saturating_u64(offset));
    Ok(Control::Continue)
}

pub(crate) fn gasprice(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    push_word(frame, host.env.tx.gas_price)
}

pub(crate) fn extcodesize(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let address = pop_accessed_address(frame, host)?;
    push_word(frame, U256::from(host.state.code(&address).len()))
}

pub(crate) fn extcodecopy_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let address = Address::from_word(frame.stack.peek(0)?);
    let range = resolve(frame.stack.peek(1)?, frame.stack.peek(3)?)?;
    Ok(host
        .gas()
        .account_access_cost(host.substate.is_warm(&address))
        .saturating_add(host.gas().copy_cost(range_len(range)))
        .saturating_add(expansion_cost(frame, host, &[range])))
}

pub(crate) fn extcodecopy(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let address = pop_accessed_address(frame, host)?;
    let [dest, offset, len] = frame.stack.pop_n()?;
    let range = resolve(dest, len)?;
    let code = host.state.code(&address);
    frame.memory.write_padded(range, &code, saturating_u64(offset));
    Ok(Control::Continue)
}

pub(crate) fn returndatasize(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let len = frame.return_data.len();
    push_word(frame, U256::from(len))
}

/// Bounds are checked before any gas is computed: a read past the return
/// buffer halts rather than copying truncated data.
pub(crate) fn returndatacopy_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let offset = saturating_u64(frame.stack.peek(1)?);
    let len = saturating_u64(frame.stack.peek(2)?);
    let end = offset.checked_add(len).ok_or(HaltReason::OutOfBounds)?;
    if end > frame.return_data.len() as u64 {
        return Err(HaltReason::InvalidReturnDataBufferAccess);
    }
    copy_gas(frame, host)
}

pub(crate) fn returndatacopy(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
    let [dest, offset, len] = frame.stack.pop_n()?;
    let range = resolve(dest, len)?;
    let data = frame.return_data.clone();
    frame.memory.write_padded(range, &data, saturating_u64(offset));
    Ok(Control::Continue)
}

pub(crate) fn extcodehash(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let address = pop_accessed_address(frame, host)?;
    let hash = match host.state.account(&address) {
        Some(account) if !account.is_empty() => U256::from_big_endian(account.code_hash().as_bytes()),
        _ => U256::zero(),
    };
    push_word(frame, hash)
}

pub(crate) fn blockhash(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let number = frame.stack.pop()?;
    let hash = host.env.block.block_hash(number);
    push_word(frame, U256::from_big_endian(hash.as_bytes()))
}

pub(crate) fn coinbase(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    push_address(frame, host.env.block.coinbase)
}

pub(crate) fn timestamp(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    push_word(frame, U256::from(host.env.block.timestamp))
}

pub(crate) fn number(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    push_word(frame, U256::from(host.env.block.number))
}

pub(crate) fn prevrandao(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    push_word(frame, U256::from_big_endian(host.env.block.prevrandao.as_bytes()))
}

pub(crate) fn gaslimit(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    push_word(frame, U256::from(host.env.block.gas_limit))
}

pub(crate) fn chainid(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    push_word(frame, U256::from(host.env.block.chain_id))
}

pub(crate) fn selfbalance(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    let balance = host.state.balance(&frame.address);
    push_word(frame, balance)
}

pub(crate) fn basefee(frame: &mut Frame, host: &mut Host<'_>) -> OpResult<Control> {
    push_word(frame, host.env.block.base_fee)
}
