//! VM state management: frames, array memory, configuration, run state.

use std::io::{BufRead, Write};

use crate::error::RuntimeError;
use crate::io::{IoError, TokenReader};
use tac_common::executable::{IndexSrc, Place, SlotId, Src};
use tac_common::{Executable, Routine, ScalarType, TypeError, Value, VarType};
use tracing::trace;

/// Default maximum call depth.
pub const MAX_CALL_DEPTH: usize = 4096;

/// Default cap on live array cells across all frames (128 MiB of values).
pub const MAX_MEMORY_CELLS: usize = 1 << 24;

/// Per-run limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Frames allowed on the call stack, `main` included.
    pub max_call_depth: usize,
    /// Instructions a run may execute before it is aborted.
    pub instruction_budget: Option<u64>,
    /// Array cells that may be live at once.
    pub max_memory_cells: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: MAX_CALL_DEPTH,
            instruction_budget: None,
            max_memory_cells: MAX_MEMORY_CELLS,
        }
    }
}

/// Program state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Verified, not started.
    Ready,
    /// Frames on the stack.
    Running,
    /// `main` returned.
    Halted,
    /// Aborted by an error.
    Failed,
}

/// One local: a scalar value, or a view into array memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Cell {
    Scalar(Value),
    Array { base: usize, len: u32 },
}

/// An active function invocation.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    /// Index into `Executable::routines`.
    pub routine: usize,
    pub pc: usize,
    pub cells: Vec<Cell>,
    /// `callr` destination in the caller's frame.
    pub return_to: Option<Place>,
    /// Array memory length when this frame was pushed.
    pub memory_mark: usize,
}

/// The TAC virtual machine. One instance performs one run.
pub struct VM<'a, R, W> {
    pub(crate) exe: &'a Executable,
    pub(crate) config: VmConfig,
    pub(crate) input: TokenReader<R>,
    pub(crate) output: W,
    pub(crate) frames: Vec<Frame>,
    /// Backing store for every live array; frames own suffixes of it.
    pub(crate) memory: Vec<Value>,
    pub(crate) state: RunState,
    pub(crate) steps: u64,
}

impl<'a, R: BufRead, W: Write> VM<'a, R, W> {
    /// Create a VM over a verified executable.
    pub fn new(exe: &'a Executable, input: R, output: W, config: VmConfig) -> Self {
        Self {
            exe,
            config,
            input: TokenReader::new(input),
            output,
            frames: Vec::new(),
            memory: Vec::new(),
            state: RunState::Ready,
            steps: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Current call depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Consume the VM, returning the output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    pub(crate) fn frame(&self) -> &Frame {
        // The dispatch loop only runs while a frame exists.
        &self.frames[self.frames.len() - 1]
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    pub(crate) fn routine(&self) -> &'a Routine {
        &self.exe.routines[self.frame().routine]
    }

    /// Line of the instruction at the current pc (or the last one, past the end).
    pub(crate) fn line(&self) -> usize {
        let routine = self.routine();
        let pc = self.frame().pc;
        routine
            .code
            .get(pc)
            .or_else(|| routine.code.last())
            .map_or(0, |step| step.line)
    }

    // --- Error constructors with location ---

    pub(crate) fn division_by_zero(&self) -> RuntimeError {
        RuntimeError::DivisionByZero {
            function: self.routine().name.clone(),
            line: self.line(),
        }
    }

    pub(crate) fn io_error(&self, error: IoError) -> RuntimeError {
        RuntimeError::Io {
            function: self.routine().name.clone(),
            line: self.line(),
            error,
        }
    }

    pub(crate) fn type_error(&self, error: TypeError) -> RuntimeError {
        RuntimeError::Type {
            function: self.routine().name.clone(),
            line: self.line(),
            error,
        }
    }

    fn invalid_slot(&self, slot: SlotId) -> RuntimeError {
        RuntimeError::InvalidSlot {
            function: self.routine().name.clone(),
            line: self.line(),
            slot,
        }
    }

    // --- Frames ---

    /// Push a frame for `routine`, binding `args` to its parameters in order.
    ///
    /// Scalars start at zero; declared arrays are allocated zeroed at the top
    /// of array memory. Array arguments alias the caller's storage.
    pub(crate) fn push_frame(
        &mut self,
        routine: usize,
        args: Vec<Cell>,
        return_to: Option<Place>,
    ) -> Result<(), RuntimeError> {
        let target = match self.exe.routines.get(routine) {
            Some(target) => target,
            None => {
                return Err(RuntimeError::UnknownFunction {
                    function: self.caller_name(),
                    line: self.caller_line(),
                    index: routine,
                })
            }
        };
        if self.frames.len() >= self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                function: self.caller_name(),
                line: self.caller_line(),
                limit: self.config.max_call_depth,
            });
        }

        let requested: usize = target
            .slots
            .iter()
            .filter(|slot| !slot.param)
            .map(|slot| match slot.ty {
                VarType::Array { len, .. } => len as usize,
                VarType::Scalar(_) => 0,
            })
            .sum();
        let memory_mark = self.memory.len();
        if memory_mark.saturating_add(requested) > self.config.max_memory_cells {
            return Err(RuntimeError::MemoryExhausted {
                // `main`'s own arrays are charged to `main`.
                function: match self.frames.last() {
                    Some(_) => self.caller_name(),
                    None => target.name.clone(),
                },
                line: self.caller_line(),
                requested,
                limit: self.config.max_memory_cells,
            });
        }

        let mut args = args.into_iter();
        let mut cells = Vec::with_capacity(target.slots.len());
        for slot in &target.slots {
            let cell = if slot.param {
                args.next().unwrap_or(Cell::Scalar(Value::zero(slot.ty.scalar())))
            } else {
                match slot.ty {
                    VarType::Scalar(ty) => Cell::Scalar(Value::zero(ty)),
                    VarType::Array { elem, len } => {
                        let base = self.memory.len();
                        self.memory
                            .resize(base + len as usize, Value::zero(elem));
                        Cell::Array { base, len }
                    }
                }
            };
            cells.push(cell);
        }

        trace!(routine = %target.name, depth = self.frames.len() + 1, "call");
        self.frames.push(Frame {
            routine,
            pc: 0,
            cells,
            return_to,
            memory_mark,
        });
        Ok(())
    }

    /// Pop the current frame, reclaim its arrays, and deliver `value` to the
    /// caller's `callr` destination if there is one.
    ///
    /// The caller's pc still points at its call until the result is stored,
    /// so a failing store reports the call line.
    pub(crate) fn pop_frame(&mut self, value: Option<Value>) -> Result<(), RuntimeError> {
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return Ok(()),
        };
        self.memory.truncate(frame.memory_mark);
        trace!(
            routine = %self.exe.routines[frame.routine].name,
            depth = self.frames.len(),
            "return"
        );

        if self.frames.is_empty() {
            return Ok(());
        }
        if let (Some(place), Some(value)) = (frame.return_to, value) {
            self.write(place, value)?;
        }
        self.frame_mut().pc += 1;
        Ok(())
    }

    fn caller_name(&self) -> String {
        self.frames
            .last()
            .map(|f| self.exe.routines[f.routine].name.clone())
            .unwrap_or_default()
    }

    fn caller_line(&self) -> usize {
        if self.frames.is_empty() {
            0
        } else {
            self.line()
        }
    }

    // --- Operand access ---

    fn cell(&self, slot: SlotId) -> Result<Cell, RuntimeError> {
        self.frame()
            .cells
            .get(slot)
            .copied()
            .ok_or_else(|| self.invalid_slot(slot))
    }

    fn scalar_slot(&self, slot: SlotId) -> Result<Value, RuntimeError> {
        match self.cell(slot)? {
            Cell::Scalar(value) => Ok(value),
            Cell::Array { .. } => Err(self.invalid_slot(slot)),
        }
    }

    /// Array view for `slot`.
    pub(crate) fn array(&self, slot: SlotId) -> Result<(usize, u32), RuntimeError> {
        match self.cell(slot)? {
            Cell::Array { base, len } => Ok((base, len)),
            Cell::Scalar(_) => Err(self.invalid_slot(slot)),
        }
    }

    /// Bounds-checked address of `array[index]`.
    pub(crate) fn element(&self, array: SlotId, index: Value) -> Result<usize, RuntimeError> {
        let index = match index {
            Value::Int(n) => n,
            Value::Float(_) => {
                return Err(self.type_error(TypeError::NonIntIndex {
                    array: self.routine().slot(array).name.clone(),
                    found: ScalarType::Float,
                }))
            }
        };
        let (base, len) = self.array(array)?;
        if index < 0 || index as u32 >= len {
            return Err(RuntimeError::IndexOutOfBounds {
                function: self.routine().name.clone(),
                line: self.line(),
                array: self.routine().slot(array).name.clone(),
                index,
                len,
            });
        }
        Ok(base + index as usize)
    }

    fn index_value(&self, index: IndexSrc) -> Result<Value, RuntimeError> {
        match index {
            IndexSrc::Const(n) => Ok(Value::Int(n)),
            IndexSrc::Slot(slot) => self.scalar_slot(slot),
        }
    }

    /// Read a scalar operand.
    pub(crate) fn read(&self, src: Src) -> Result<Value, RuntimeError> {
        match src {
            Src::Int(n) => Ok(Value::Int(n)),
            Src::Float(x) => Ok(Value::Float(x)),
            Src::Slot(slot) => self.scalar_slot(slot),
            Src::Element { array, index } => {
                let addr = self.element(array, self.index_value(index)?)?;
                Ok(self.memory[addr])
            }
        }
    }

    /// Store `value` into `place`, converting int to float where the
    /// location is a float.
    pub(crate) fn write(&mut self, place: Place, value: Value) -> Result<(), RuntimeError> {
        match place {
            Place::Slot(slot) => {
                let ty = self.routine().slot(slot).ty.scalar();
                let value = self.coerce(&self.routine().slot(slot).name, ty, value)?;
                match self.frame_mut().cells.get_mut(slot) {
                    Some(Cell::Scalar(cell)) => {
                        *cell = value;
                        Ok(())
                    }
                    _ => Err(self.invalid_slot(slot)),
                }
            }
            Place::Element { array, index } => {
                let addr = self.element(array, self.index_value(index)?)?;
                self.store(array, addr, value)
            }
        }
    }

    /// Store into array memory at a checked address.
    pub(crate) fn store(&mut self, array: SlotId, addr: usize, value: Value) -> Result<(), RuntimeError> {
        let slot = self.routine().slot(array);
        let value = self.coerce(&slot.name, slot.ty.scalar(), value)?;
        self.memory[addr] = value;
        Ok(())
    }

    fn coerce(&self, target: &str, ty: ScalarType, value: Value) -> Result<Value, RuntimeError> {
        value.coerce(ty).ok_or_else(|| {
            self.type_error(TypeError::NarrowingStore {
                target: target.to_string(),
                expected: ty,
                found: value.scalar_type(),
            })
        })
    }

    /// Flush the output sink.
    pub(crate) fn flush(&mut self) -> Result<(), IoError> {
        self.output
            .flush()
            .map_err(|e| IoError::Write(e.to_string()))
    }
}
