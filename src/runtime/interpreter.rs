// The interpreter executes validated function bodies directly from their flat instruction
// sequence. Structured control flow is resolved ahead of time: ControlMap records, for every
// block, loop, if and else, the index of the matching end (and for an if, its else), so a
// branch is a single lookup. Values live on one shared stack of untyped 64-bit cells; the
// validator has already proven every operand has the right type, so the cells carry no tags.
// Each label remembers the stack height at entry and its branch arity, and a branch keeps the
// top `arity` cells while discarding everything above the label's height. Calls recurse on the
// host stack up to a fixed depth, beyond which the call traps instead of overflowing.

//! Interpreter for validated function bodies.

use super::memory::LinearMemory;
use super::module::Module;
use super::numeric;
use super::Trap;
use crate::ir::{BlockType, Instr, MemArg};
use hashbrown::HashMap;

/// Nested calls allowed before [`Trap::CallStackExhausted`].
pub const MAX_CALL_DEPTH: usize = 512;

/// Jump targets of the structured instructions in one body.
#[derive(Debug, Clone, Default)]
pub(crate) struct ControlMap {
    /// `block`/`loop`/`if`/`else` index to the index of its `end`.
    end: HashMap<usize, usize>,
    /// `if` index to the index of its `else`, when present.
    else_: HashMap<usize, usize>,
}

impl ControlMap {
    pub(crate) fn build(body: &[Instr]) -> Self {
        let mut map = ControlMap::default();
        let mut open: Vec<(usize, Option<usize>)> = Vec::new();
        for (idx, instr) in body.iter().enumerate() {
            match instr {
                Instr::Block(_) | Instr::Loop(_) | Instr::If(_) => open.push((idx, None)),
                Instr::Else => {
                    if let Some((start, else_at)) = open.last_mut() {
                        map.else_.insert(*start, idx);
                        *else_at = Some(idx);
                    }
                }
                Instr::End => {
                    if let Some((start, else_at)) = open.pop() {
                        map.end.insert(start, idx);
                        if let Some(else_idx) = else_at {
                            map.end.insert(else_idx, idx);
                        }
                    }
                }
                _ => {}
            }
        }
        map
    }

    fn end_of(&self, idx: usize) -> usize {
        // Validated bodies always close their blocks.
        self.end.get(&idx).copied().unwrap_or(idx)
    }

    fn else_of(&self, idx: usize) -> Option<usize> {
        self.else_.get(&idx).copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct Label {
    /// Cells carried by a branch to this label.
    arity: usize,
    /// Stack height when the label was entered.
    height: usize,
    /// Where a branch resumes.
    target: usize,
}

enum Flow {
    Continue(usize),
    Return,
}

/// Keep the top `arity` cells and drop everything between them and `height`.
fn unwind(stack: &mut Vec<u64>, height: usize, arity: usize) {
    let keep_from = stack.len() - arity;
    stack.drain(height..keep_from);
}

fn pop(stack: &mut Vec<u64>) -> u64 {
    // Validation guarantees the operand exists.
    stack.pop().unwrap_or_default()
}

fn effective_address(base: u64, arg: MemArg) -> u64 {
    u64::from(base as u32) + u64::from(arg.offset)
}

/// Executes calls against one module and the memory of one instance.
pub(crate) struct Executor<'a> {
    module: &'a Module,
    memory: Option<&'a mut LinearMemory>,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(module: &'a Module, memory: Option<&'a mut LinearMemory>) -> Self {
        Self { module, memory }
    }

    fn memory(&self) -> Result<&LinearMemory, Trap> {
        self.memory.as_deref().ok_or(Trap::MemoryOutOfBounds)
    }

    fn memory_mut(&mut self) -> Result<&mut LinearMemory, Trap> {
        self.memory.as_deref_mut().ok_or(Trap::MemoryOutOfBounds)
    }

    /// Call `func_idx` with its arguments on top of `stack`; leaves the
    /// results in their place.
    pub(crate) fn call(&mut self, func_idx: u32, stack: &mut Vec<u64>, depth: usize) -> Result<(), Trap> {
        if depth >= MAX_CALL_DEPTH {
            return Err(Trap::CallStackExhausted);
        }
        let module = self.module;
        let ir = module.ir();
        let func = &ir.funcs[func_idx as usize];
        let ty = &ir.types[func.type_idx as usize];
        let control = &module.control[func_idx as usize];

        let mut locals = stack.split_off(stack.len() - ty.params.len());
        locals.resize(ty.params.len() + func.locals.len(), 0);
        let base = stack.len();
        let arity = ty.results.len();

        let mut labels: Vec<Label> = Vec::new();
        let mut pc = 0;
        while pc < func.body.len() {
            let instr = &func.body[pc];
            let flow = self
                .step(instr, pc, control, &mut labels, &mut locals, stack, depth)
                .map_err(|trap| {
                    log::debug!("{trap} in function {func_idx} at {} ({pc})", instr.name());
                    trap
                })?;
            match flow {
                Flow::Continue(next) => pc = next,
                Flow::Return => break,
            }
        }
        unwind(stack, base, arity);
        Ok(())
    }

    fn branch(labels: &mut Vec<Label>, stack: &mut Vec<u64>, depth: u32) -> Flow {
        let depth = depth as usize;
        if depth >= labels.len() {
            return Flow::Return;
        }
        let idx = labels.len() - 1 - depth;
        let label = labels[idx];
        labels.truncate(idx);
        unwind(stack, label.height, label.arity);
        Flow::Continue(label.target)
    }

    #[allow(clippy::too_many_arguments)]
    fn step(
        &mut self,
        instr: &Instr,
        pc: usize,
        control: &ControlMap,
        labels: &mut Vec<Label>,
        locals: &mut [u64],
        stack: &mut Vec<u64>,
        depth: usize,
    ) -> Result<Flow, Trap> {
        let next = pc + 1;
        match *instr {
            Instr::Unreachable => return Err(Trap::Unreachable),
            Instr::Nop => {}
            Instr::Block(BlockType(ty)) => labels.push(Label {
                arity: usize::from(ty.is_some()),
                height: stack.len(),
                target: control.end_of(pc) + 1,
            }),
            Instr::Loop(_) => labels.push(Label {
                arity: 0,
                height: stack.len(),
                target: pc,
            }),
            Instr::If(BlockType(ty)) => {
                let cond = pop(stack) as u32;
                let end = control.end_of(pc);
                labels.push(Label {
                    arity: usize::from(ty.is_some()),
                    height: stack.len(),
                    target: end + 1,
                });
                if cond == 0 {
                    // Skip to the else arm, or to the end which pops the label.
                    return Ok(Flow::Continue(control.else_of(pc).map_or(end, |e| e + 1)));
                }
            }
            // The then-arm finished: continue at the shared end.
            Instr::Else => return Ok(Flow::Continue(control.end_of(pc))),
            Instr::End => {
                labels.pop();
            }
            Instr::Br(label_depth) => return Ok(Self::branch(labels, stack, label_depth)),
            Instr::BrIf(label_depth) => {
                if pop(stack) as u32 != 0 {
                    return Ok(Self::branch(labels, stack, label_depth));
                }
            }
            Instr::Return => return Ok(Flow::Return),
            Instr::Call(callee) => self.call(callee, stack, depth + 1)?,
            Instr::Drop => {
                pop(stack);
            }
            Instr::Select => {
                let cond = pop(stack) as u32;
                let b = pop(stack);
                let a = pop(stack);
                stack.push(if cond != 0 { a } else { b });
            }
            Instr::LocalGet(idx) => stack.push(locals[idx as usize]),
            Instr::LocalSet(idx) => locals[idx as usize] = pop(stack),
            Instr::LocalTee(idx) => {
                let value = stack.last().copied().unwrap_or_default();
                locals[idx as usize] = value;
            }
            Instr::I32Load(arg) => {
                let addr = effective_address(pop(stack), arg);
                let value = self.memory()?.load_i32(addr)?;
                stack.push(u64::from(value as u32));
            }
            Instr::I64Load(arg) => {
                let addr = effective_address(pop(stack), arg);
                stack.push(self.memory()?.load_i64(addr)? as u64);
            }
            Instr::F64Load(arg) => {
                let addr = effective_address(pop(stack), arg);
                stack.push(self.memory()?.load_f64(addr)?.to_bits());
            }
            Instr::I32Store(arg) => {
                let value = pop(stack) as u32 as i32;
                let addr = effective_address(pop(stack), arg);
                self.memory_mut()?.store_i32(addr, value)?;
            }
            Instr::I64Store(arg) => {
                let value = pop(stack) as i64;
                let addr = effective_address(pop(stack), arg);
                self.memory_mut()?.store_i64(addr, value)?;
            }
            Instr::F64Store(arg) => {
                let value = f64::from_bits(pop(stack));
                let addr = effective_address(pop(stack), arg);
                self.memory_mut()?.store_f64(addr, value)?;
            }
            Instr::MemorySize => stack.push(u64::from(self.memory()?.pages())),
            Instr::MemoryGrow => {
                let delta = pop(stack) as u32;
                let old = self.memory_mut()?.grow(delta).unwrap_or(u32::MAX);
                stack.push(u64::from(old));
            }
            Instr::I32Const(v) => stack.push(u64::from(v as u32)),
            Instr::I64Const(v) => stack.push(v as u64),
            Instr::F64Const(bits) => stack.push(bits),
            Instr::Numeric(op) => {
                let (a, b) = if op.info().params.len() == 2 {
                    let b = pop(stack);
                    (pop(stack), b)
                } else {
                    (pop(stack), 0)
                };
                stack.push(numeric::apply(op, a, b)?);
            }
        }
        Ok(Flow::Continue(next))
    }
}
