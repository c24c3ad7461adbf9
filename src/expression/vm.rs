use std::time::{Duration, Instant};

use crate::expression::bytecode::{BuiltinId, BytecodeProgram, ConstVal, Op};
use crate::expression::error::EvalError;

/// How often (in executed ops) the wall clock is consulted.
const CLOCK_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ValueSlot {
    F64(f64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Output {
    Number(f64),
    Vec2(f64, f64),
}

/// Per-call execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalBudget {
    pub max_instructions: u64,
    pub max_duration: Duration,
}

impl Default for EvalBudget {
    fn default() -> Self {
        Self {
            max_instructions: 100_000,
            max_duration: Duration::from_millis(2),
        }
    }
}

pub(crate) fn eval_program(
    p: &BytecodeProgram,
    args: &[f64],
    budget: EvalBudget,
) -> Result<Output, EvalError> {
    let mut locals = vec![ValueSlot::F64(0.0); usize::from(p.locals)];
    for (slot, arg) in locals
        .iter_mut()
        .zip(args.iter().take(usize::from(p.params)))
    {
        *slot = ValueSlot::F64(*arg);
    }
    let mut stack: Vec<ValueSlot> = Vec::with_capacity(16);

    let started = Instant::now();
    let mut executed = 0u64;
    let mut pc = 0usize;

    while let Some(&op) = p.ops.get(pc) {
        executed += 1;
        if executed > budget.max_instructions
            || (executed % CLOCK_CHECK_INTERVAL == 0 && started.elapsed() > budget.max_duration)
        {
            return Err(EvalError::Timeout {
                instructions: executed,
                elapsed: started.elapsed(),
            });
        }
        pc += 1;

        match op {
            Op::PushConst(idx) => {
                let c = p
                    .consts
                    .get(idx.0 as usize)
                    .ok_or_else(|| EvalError::runtime("const idx out of range"))?;
                stack.push(match *c {
                    ConstVal::F64(v) => ValueSlot::F64(v),
                    ConstVal::Bool(v) => ValueSlot::Bool(v),
                });
            }
            Op::LoadLocal(slot) => {
                let v = *locals
                    .get(usize::from(slot.0))
                    .ok_or_else(|| EvalError::runtime("local slot out of range"))?;
                stack.push(v);
            }
            Op::StoreLocal(slot) => {
                let v = pop(&mut stack)?;
                let dst = locals
                    .get_mut(usize::from(slot.0))
                    .ok_or_else(|| EvalError::runtime("local slot out of range"))?;
                *dst = v;
            }

            Op::Neg => {
                let v = pop_f64(&mut stack)?;
                stack.push(ValueSlot::F64(-v));
            }
            Op::Not => {
                let v = pop_bool(&mut stack)?;
                stack.push(ValueSlot::Bool(!v));
            }
            Op::Add => bin_f64(&mut stack, |a, b| a + b)?,
            Op::Sub => bin_f64(&mut stack, |a, b| a - b)?,
            Op::Mul => bin_f64(&mut stack, |a, b| a * b)?,
            Op::Div => bin_f64(&mut stack, |a, b| a / b)?,
            Op::Mod => bin_f64(&mut stack, |a, b| a % b)?,

            Op::Eq => bin_eq(&mut stack, true)?,
            Op::Ne => bin_eq(&mut stack, false)?,
            Op::Lt => bin_cmp(&mut stack, |a, b| a < b)?,
            Op::Le => bin_cmp(&mut stack, |a, b| a <= b)?,
            Op::Gt => bin_cmp(&mut stack, |a, b| a > b)?,
            Op::Ge => bin_cmp(&mut stack, |a, b| a >= b)?,

            Op::And => {
                let b = pop_bool(&mut stack)?;
                let a = pop_bool(&mut stack)?;
                stack.push(ValueSlot::Bool(a && b));
            }
            Op::Or => {
                let b = pop_bool(&mut stack)?;
                let a = pop_bool(&mut stack)?;
                stack.push(ValueSlot::Bool(a || b));
            }

            Op::Jump(target) => pc = target as usize,
            Op::JumpIfFalse(target) => {
                if !pop_bool(&mut stack)? {
                    pc = target as usize;
                }
            }

            Op::CallBuiltin { id, argc } => call_builtin(&mut stack, id, argc)?,

            Op::Return => {
                let v = pop_f64(&mut stack)?;
                return finite(v).map(Output::Number);
            }
            Op::ReturnVec => {
                let y = pop_f64(&mut stack)?;
                let x = pop_f64(&mut stack)?;
                return Ok(Output::Vec2(finite(x)?, finite(y)?));
            }
        }
    }

    Err(EvalError::runtime(
        "function finished without returning a value",
    ))
}

fn finite(v: f64) -> Result<f64, EvalError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(EvalError::runtime(format!("non-finite result {v}")))
    }
}

fn pop(stack: &mut Vec<ValueSlot>) -> Result<ValueSlot, EvalError> {
    stack
        .pop()
        .ok_or_else(|| EvalError::runtime("stack underflow"))
}

fn pop_f64(stack: &mut Vec<ValueSlot>) -> Result<f64, EvalError> {
    match pop(stack)? {
        ValueSlot::F64(v) => Ok(v),
        ValueSlot::Bool(v) => Err(EvalError::runtime(format!(
            "expected a number, got bool {v}"
        ))),
    }
}

fn pop_bool(stack: &mut Vec<ValueSlot>) -> Result<bool, EvalError> {
    match pop(stack)? {
        ValueSlot::Bool(v) => Ok(v),
        ValueSlot::F64(v) => Err(EvalError::runtime(format!(
            "expected a bool, got number {v}"
        ))),
    }
}

fn bin_f64(stack: &mut Vec<ValueSlot>, f: impl FnOnce(f64, f64) -> f64) -> Result<(), EvalError> {
    let b = pop_f64(stack)?;
    let a = pop_f64(stack)?;
    stack.push(ValueSlot::F64(f(a, b)));
    Ok(())
}

fn bin_cmp(stack: &mut Vec<ValueSlot>, f: impl FnOnce(f64, f64) -> bool) -> Result<(), EvalError> {
    let b = pop_f64(stack)?;
    let a = pop_f64(stack)?;
    stack.push(ValueSlot::Bool(f(a, b)));
    Ok(())
}

fn bin_eq(stack: &mut Vec<ValueSlot>, is_eq: bool) -> Result<(), EvalError> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    let res = match (a, b) {
        (ValueSlot::Bool(a), ValueSlot::Bool(b)) => a == b,
        (ValueSlot::F64(a), ValueSlot::F64(b)) => a == b,
        _ => return Err(EvalError::runtime("cannot compare a number with a bool")),
    };
    stack.push(ValueSlot::Bool(if is_eq { res } else { !res }));
    Ok(())
}

fn call_builtin(stack: &mut Vec<ValueSlot>, id: BuiltinId, argc: u8) -> Result<(), EvalError> {
    if argc != id.arity() {
        return Err(EvalError::runtime(format!(
            "{id:?} expects {} args, got {argc}",
            id.arity()
        )));
    }
    let v = match id {
        BuiltinId::Sin => pop_f64(stack)?.sin(),
        BuiltinId::Cos => pop_f64(stack)?.cos(),
        BuiltinId::Tan => pop_f64(stack)?.tan(),
        BuiltinId::Asin => pop_f64(stack)?.asin(),
        BuiltinId::Acos => pop_f64(stack)?.acos(),
        BuiltinId::Atan => pop_f64(stack)?.atan(),
        BuiltinId::Abs => pop_f64(stack)?.abs(),
        BuiltinId::Floor => pop_f64(stack)?.floor(),
        BuiltinId::Ceil => pop_f64(stack)?.ceil(),
        BuiltinId::Round => pop_f64(stack)?.round(),
        BuiltinId::Fract => {
            let x = pop_f64(stack)?;
            x - x.floor()
        }
        BuiltinId::Sqrt => pop_f64(stack)?.sqrt(),
        BuiltinId::Exp => pop_f64(stack)?.exp(),
        BuiltinId::Ln => pop_f64(stack)?.ln(),
        BuiltinId::Sign => {
            let x = pop_f64(stack)?;
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                0.0
            }
        }
        BuiltinId::Atan2 => {
            let x = pop_f64(stack)?;
            let y = pop_f64(stack)?;
            y.atan2(x)
        }
        BuiltinId::Pow => {
            let e = pop_f64(stack)?;
            let b = pop_f64(stack)?;
            b.powf(e)
        }
        BuiltinId::Min => {
            let b = pop_f64(stack)?;
            let a = pop_f64(stack)?;
            a.min(b)
        }
        BuiltinId::Max => {
            let b = pop_f64(stack)?;
            let a = pop_f64(stack)?;
            a.max(b)
        }
        BuiltinId::Mod => {
            let b = pop_f64(stack)?;
            let a = pop_f64(stack)?;
            a.rem_euclid(b)
        }
        BuiltinId::Clamp => {
            let hi = pop_f64(stack)?;
            let lo = pop_f64(stack)?;
            let x = pop_f64(stack)?;
            if lo > hi || lo.is_nan() || hi.is_nan() {
                return Err(EvalError::runtime("clamp bounds are inverted"));
            }
            x.clamp(lo, hi)
        }
        BuiltinId::Lerp => {
            let t = pop_f64(stack)?;
            let b = pop_f64(stack)?;
            let a = pop_f64(stack)?;
            a + (b - a) * t
        }
        BuiltinId::Smoothstep => {
            let x = pop_f64(stack)?;
            let e1 = pop_f64(stack)?;
            let e0 = pop_f64(stack)?;
            let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
            t * t * (3.0 - 2.0 * t)
        }
    };
    stack.push(ValueSlot::F64(v));
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/expression/vm.rs"]
mod tests;
