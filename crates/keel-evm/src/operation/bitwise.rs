//! Comparison and bitwise operations

use super::Control;
use crate::error::OpResult;
use crate::frame::Frame;
use crate::host::Host;
use crate::word;
use keel_primitives::U256;

macro_rules! binary {
    ($($name:ident => |$a:ident, $b:ident| $body:expr),* $(,)?) => {
        $(
            pub(crate) fn $name(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
                let [$a, $b] = frame.stack.pop_n()?;
                frame.stack.push($body)?;
                Ok(Control::Continue)
            }
        )*
    };
}

macro_rules! unary {
    ($($name:ident => |$a:ident| $body:expr),* $(,)?) => {
        $(
            pub(crate) fn $name(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
                let $a = frame.stack.pop()?;
                frame.stack.push($body)?;
                Ok(Control::Continue)
            }
        )*
    };
}

binary! {
    lt => |a, b| word::from_bool(a < b),
    gt => |a, b| word::from_bool(a > b),
    slt => |a, b| word::from_bool(word::slt(a, b)),
    sgt => |a, b| word::from_bool(word::sgt(a, b)),
    eq => |a, b| word::from_bool(a == b),
    and => |a, b| a & b,
    or => |a, b| a | b,
    xor => |a, b| a ^ b,
    byte => |index, value| word::byte(index, value),
    shl => |shift, value| word::shl(shift, value),
    shr => |shift, value| word::shr(shift, value),
    sar => |shift, value| word::sar(shift, value),
}

unary! {
    iszero => |a| word::from_bool(a.is_zero()),
    not => |a| !a,
    clz => |a| U256::from(word::leading_zeros_scan(a)),
}
