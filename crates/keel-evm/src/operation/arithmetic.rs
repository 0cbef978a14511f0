//! ADD through SIGNEXTEND

use super::Control;
use crate::error::OpResult;
use crate::frame::Frame;
use crate::host::Host;
use crate::word;

macro_rules! binary {
    ($($name:ident => $f:path),* $(,)?) => {
        $(
            pub(crate) fn $name(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
                let [a, b] = frame.stack.pop_n()?;
                frame.stack.push($f(a, b))?;
                Ok(Control::Continue)
            }
        )*
    };
}

macro_rules! ternary {
    ($($name:ident => $f:path),* $(,)?) => {
        $(
            pub(crate) fn $name(frame: &mut Frame, _host: &mut Host<'_>) -> OpResult<Control> {
                let [a, b, n] = frame.stack.pop_n()?;
                frame.stack.push($f(a, b, n))?;
                Ok(Control::Continue)
            }
        )*
    };
}

binary! {
    add => word::add,
    mul => word::mul,
    sub => word::sub,
    div => word::div,
    sdiv => word::sdiv,
    modulo => word::modulo,
    smod => word::smod,
    exp => word::exp,
    sign_extend => word::sign_extend,
}

ternary! {
    addmod => word::addmod,
    mulmod => word::mulmod,
}

pub(crate) fn exp_gas(frame: &Frame, host: &Host<'_>) -> OpResult<u64> {
    let exponent = frame.stack.peek(1)?;
    Ok(host.gas().exp_cost(exponent))
}
