//! Main execution loop and opcode dispatch for the TAC VM.

use std::io::{BufRead, Write};

use crate::error::RuntimeError;
use crate::io;
use crate::machine::{Cell, RunState, VM};
use tac_common::executable::{Arg, ArithOp, BitOp, Callee, Cond, Op, Place};
use tac_common::{Intrinsic, ScalarType, TypeError, Value};
use tracing::debug;

impl<'a, R: BufRead, W: Write> VM<'a, R, W> {
    /// Run `main` to completion.
    ///
    /// On error the state becomes [`RunState::Failed`]; output written so
    /// far stays in the sink.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        if self.state != RunState::Ready {
            return Err(RuntimeError::AlreadyRun);
        }
        self.state = RunState::Running;
        debug!(entry = %self.exe.routines[self.exe.entry].name, "run started");

        let result = self
            .push_frame(self.exe.entry, Vec::new(), None)
            .and_then(|()| self.dispatch());
        let flushed = self.flush();

        let result = match (result, flushed) {
            (Ok(()), Err(error)) => Err(RuntimeError::Io {
                function: self.exe.routines[self.exe.entry].name.clone(),
                line: 0,
                error,
            }),
            (result, _) => result,
        };

        match &result {
            Ok(()) => {
                self.state = RunState::Halted;
                debug!(steps = self.steps, "run halted");
            }
            Err(error) => {
                self.state = RunState::Failed;
                debug!(steps = self.steps, %error, "run failed");
            }
        }
        result
    }

    /// Execute until the frame stack is empty.
    fn dispatch(&mut self) -> Result<(), RuntimeError> {
        let exe = self.exe;
        while let Some(frame) = self.frames.last() {
            let routine = &exe.routines[frame.routine];
            let step = match routine.code.get(frame.pc) {
                Some(step) => step,
                // Falling off the end is an implicit void return.
                None => {
                    self.pop_frame(None)?;
                    continue;
                }
            };

            if let Some(budget) = self.config.instruction_budget {
                if self.steps >= budget {
                    return Err(RuntimeError::BudgetExhausted {
                        function: routine.name.clone(),
                        line: step.line,
                        budget,
                    });
                }
            }
            self.steps += 1;
            self.exec(&step.op)?;
        }
        Ok(())
    }

    /// Execute one operation. Advances the pc unless the op transfers control.
    fn exec(&mut self, op: &Op) -> Result<(), RuntimeError> {
        match op {
            Op::Assign { dest, src } => {
                let value = self.read(*src)?;
                self.write(*dest, value)?;
            }
            Op::Arith { op, dest, lhs, rhs } => {
                let a = self.read(*lhs)?;
                let b = self.read(*rhs)?;
                let value = self.arith(*op, a, b)?;
                self.write(*dest, value)?;
            }
            Op::Bitwise { op, dest, lhs, rhs } => {
                let a = self.read(*lhs)?;
                let b = self.read(*rhs)?;
                let value = match (a, b) {
                    (Value::Int(a), Value::Int(b)) => match op {
                        BitOp::And => Value::Int(a & b),
                        BitOp::Or => Value::Int(a | b),
                    },
                    _ => {
                        return Err(self.type_error(TypeError::BitwiseOnFloat {
                            op: op.mnemonic(),
                        }))
                    }
                };
                self.write(*dest, value)?;
            }
            Op::Goto { target } => {
                self.frame_mut().pc = *target;
                return Ok(());
            }
            Op::Branch {
                cond,
                target,
                lhs,
                rhs,
            } => {
                let a = self.read(*lhs)?;
                let b = self.read(*rhs)?;
                if compare(*cond, a, b) {
                    self.frame_mut().pc = *target;
                    return Ok(());
                }
            }
            Op::Return { value } => {
                let value = match value {
                    Some(src) => Some(self.read(*src)?),
                    None => None,
                };
                return self.pop_frame(value);
            }
            Op::Call { callee, args } => return self.call(*callee, args, None),
            Op::Callr { dest, callee, args } => return self.call(*callee, args, Some(*dest)),
            Op::ArrayLoad { dest, array, index } => {
                let index = self.read(*index)?;
                let addr = self.element(*array, index)?;
                let value = self.memory[addr];
                self.write(*dest, value)?;
            }
            Op::ArrayStore {
                value,
                array,
                index,
            } => {
                let value = self.read(*value)?;
                let index = self.read(*index)?;
                let addr = self.element(*array, index)?;
                self.store(*array, addr, value)?;
            }
        }

        self.frame_mut().pc += 1;
        Ok(())
    }

    fn arith(&self, op: ArithOp, a: Value, b: Value) -> Result<Value, RuntimeError> {
        match (a, b) {
            (Value::Int(a), Value::Int(b)) => {
                let n = match op {
                    ArithOp::Add => a.wrapping_add(b),
                    ArithOp::Sub => a.wrapping_sub(b),
                    ArithOp::Mult => a.wrapping_mul(b),
                    ArithOp::Div => {
                        if b == 0 {
                            return Err(self.division_by_zero());
                        }
                        a.wrapping_div(b)
                    }
                };
                Ok(Value::Int(n))
            }
            _ => {
                let (a, b) = (a.as_f32(), b.as_f32());
                let x = match op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mult => a * b,
                    ArithOp::Div => {
                        if b == 0.0 {
                            return Err(self.division_by_zero());
                        }
                        a / b
                    }
                };
                Ok(Value::Float(x))
            }
        }
    }

    /// `call` / `callr`. For user routines the caller's pc moves past the
    /// call when the callee returns; built-ins complete immediately.
    fn call(
        &mut self,
        callee: Callee,
        args: &[Arg],
        dest: Option<Place>,
    ) -> Result<(), RuntimeError> {
        let mut cells = Vec::with_capacity(args.len());
        for arg in args {
            let cell = match *arg {
                Arg::Value(src) => Cell::Scalar(self.read(src)?),
                Arg::Array(slot) => {
                    let (base, len) = self.array(slot)?;
                    Cell::Array { base, len }
                }
            };
            cells.push(cell);
        }

        match callee {
            Callee::Routine(index) => self.push_frame(index, cells, dest)?,
            Callee::Intrinsic(intrinsic) => {
                let result = self.intrinsic(intrinsic, &cells)?;
                if let (Some(place), Some(value)) = (dest, result) {
                    self.write(place, value)?;
                }
                self.frame_mut().pc += 1;
            }
        }
        Ok(())
    }

    fn intrinsic(
        &mut self,
        intrinsic: Intrinsic,
        args: &[Cell],
    ) -> Result<Option<Value>, RuntimeError> {
        let arg = match args.first() {
            Some(Cell::Scalar(value)) => Some(*value),
            _ => None,
        };

        let result = match intrinsic {
            Intrinsic::Geti => self.input.read_int().map(|n| Some(Value::Int(n))),
            Intrinsic::Getf => self.input.read_float().map(|x| Some(Value::Float(x))),
            Intrinsic::Getc => self.input.read_char().map(|c| Some(Value::Int(c))),
            Intrinsic::Puti => match arg {
                Some(Value::Int(n)) => io::write_int(&mut self.output, n).map(|()| None),
                other => return Err(self.bad_argument(intrinsic, other)),
            },
            Intrinsic::Putf => match arg {
                Some(value) => io::write_float(&mut self.output, value.as_f32()).map(|()| None),
                None => return Err(self.bad_argument(intrinsic, None)),
            },
            Intrinsic::Putc => match arg {
                Some(Value::Int(code)) => {
                    let c = u32::try_from(code).ok().and_then(char::from_u32).ok_or_else(|| {
                        RuntimeError::InvalidCharCode {
                            function: self.routine().name.clone(),
                            line: self.line(),
                            code,
                        }
                    })?;
                    io::write_char(&mut self.output, c).map(|()| None)
                }
                other => return Err(self.bad_argument(intrinsic, other)),
            },
        };
        result.map_err(|e| self.io_error(e))
    }

    fn bad_argument(&self, intrinsic: Intrinsic, found: Option<Value>) -> RuntimeError {
        self.type_error(TypeError::NarrowingStore {
            target: format!("argument 1 of '{}'", intrinsic.name()),
            expected: intrinsic.params().first().copied().unwrap_or(ScalarType::Int),
            found: found.map_or(ScalarType::Float, |v| v.scalar_type()),
        })
    }
}

/// Branch comparison: as int when both operands are int, otherwise as float.
fn compare(cond: Cond, a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => cond.holds(a, b),
        _ => cond.holds(a.as_f32(), b.as_f32()),
    }
}
