use std::{collections::HashMap, fmt, rc::Rc};

use crate::{
    ir::{BinaryOp, BlockId, CmpOp, Function, Inst, Module, SlotId, Terminator, ValueId},
    value::Value,
};

/// Nested calls allowed before evaluation gives up.
pub const MAX_CALL_DEPTH: usize = 512;

/// Errors that can occur while executing IR.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Call to a name that is neither installed nor a builtin
    UnknownFunction(String),

    /// Call with the wrong number of arguments
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Recursion deeper than [`MAX_CALL_DEPTH`]
    CallDepthExceeded(usize),

    /// Malformed IR: undefined value, missing block or open block
    InvalidIr(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnknownFunction(name) => write!(f, "unknown function '{}'", name),
            EvalError::ArgumentCount {
                name,
                expected,
                found,
            } => write!(
                f,
                "'{}' expects {} arguments, got {}",
                name, expected, found
            ),
            EvalError::CallDepthExceeded(limit) => {
                write!(f, "call depth exceeded {} nested calls", limit)
            }
            EvalError::InvalidIr(msg) => write!(f, "invalid IR: {}", msg),
        }
    }
}

impl std::error::Error for EvalError {}

/// Functions every program can call without defining them.
const BUILTINS: [&str; 5] = ["putchard", "printd", "sin", "cos", "sqrt"];

/// Reference interpreter for lowered modules.
///
/// Functions handed over with [`add_module`](Evaluator::add_module) stay
/// installed until replaced or removed, so later modules can call them by
/// name. Text written by `putchard` and `printd` accumulates until drained
/// with [`take_output`](Evaluator::take_output).
///
/// Calls between user functions push onto an explicit frame stack rather than
/// the native one, so recursion depth is bounded by [`MAX_CALL_DEPTH`] alone.
#[derive(Debug, Default)]
pub struct Evaluator {
    functions: HashMap<String, Rc<Function>>,
    output: String,
}

/// One active call: its function, values, slot contents and program counter.
struct Frame {
    function: Rc<Function>,
    values: Vec<Option<Value>>,
    slots: Vec<f64>,
    block: BlockId,
    previous: Option<BlockId>,
    next_inst: usize,
    /// Where the caller wants the result
    ret_dst: Option<ValueId>,
}

/// What a frame asks of the evaluator after one step.
enum Step {
    Continue,
    Call {
        callee: String,
        args: Vec<f64>,
        dst: ValueId,
    },
    Return(f64),
}

impl Frame {
    fn new(function: Rc<Function>, args: &[f64], ret_dst: Option<ValueId>) -> Self {
        let mut values = vec![None; function.value_types.len()];
        for (i, arg) in args.iter().enumerate() {
            values[i] = Some(Value::Number(*arg));
        }
        Frame {
            slots: vec![0.0; function.slots.len()],
            block: function.entry,
            function,
            values,
            previous: None,
            next_inst: 0,
            ret_dst,
        }
    }

    fn get(&self, id: ValueId) -> Result<Value, EvalError> {
        self.values
            .get(id.0 as usize)
            .copied()
            .flatten()
            .ok_or_else(|| EvalError::InvalidIr(format!("{} used before definition", id)))
    }

    fn number(&self, id: ValueId) -> Result<f64, EvalError> {
        match self.get(id)? {
            Value::Number(n) => Ok(n),
            Value::Bool(_) => Err(EvalError::InvalidIr(format!(
                "{} is a boolean where a number is required",
                id
            ))),
        }
    }

    fn set(&mut self, id: ValueId, value: Value) -> Result<(), EvalError> {
        let entry = self
            .values
            .get_mut(id.0 as usize)
            .ok_or_else(|| EvalError::InvalidIr(format!("{} has no type", id)))?;
        *entry = Some(value);
        Ok(())
    }

    fn slot(&mut self, slot: SlotId) -> Result<&mut f64, EvalError> {
        self.slots
            .get_mut(slot.0 as usize)
            .ok_or_else(|| EvalError::InvalidIr(format!("unknown slot {}", slot)))
    }

    fn jump(&mut self, target: BlockId) {
        self.previous = Some(self.block);
        self.block = target;
        self.next_inst = 0;
    }

    /// Runs the next instruction, or the block terminator once the
    /// instructions are exhausted.
    fn step(&mut self) -> Result<Step, EvalError> {
        let function = Rc::clone(&self.function);
        let block = function
            .blocks
            .get(self.block.0 as usize)
            .ok_or_else(|| EvalError::InvalidIr(format!("no block {}", self.block)))?;

        if let Some(inst) = block.insts.get(self.next_inst) {
            self.next_inst += 1;
            return self.exec(inst);
        }

        match &block.term {
            Terminator::Br { target } => {
                self.jump(*target);
                Ok(Step::Continue)
            }
            Terminator::CondBr {
                cond,
                then_block,
                else_block,
            } => {
                let taken = self.get(*cond)?.as_bool().ok_or_else(|| {
                    EvalError::InvalidIr(format!("branch on non-boolean {}", cond))
                })?;
                self.jump(if taken { *then_block } else { *else_block });
                Ok(Step::Continue)
            }
            Terminator::Ret { value } => Ok(Step::Return(self.number(*value)?)),
            Terminator::Unreachable => Err(EvalError::InvalidIr(format!(
                "block {} in '{}' has no terminator",
                self.block,
                function.name()
            ))),
        }
    }

    fn exec(&mut self, inst: &Inst) -> Result<Step, EvalError> {
        match inst {
            Inst::Const { dst, value } => self.set(*dst, Value::Number(*value))?,
            Inst::Load { dst, slot } => {
                let value = *self.slot(*slot)?;
                self.set(*dst, Value::Number(value))?;
            }
            Inst::Store { slot, value } => {
                let value = self.number(*value)?;
                *self.slot(*slot)? = value;
            }
            Inst::Binary { dst, op, lhs, rhs } => {
                let (l, r) = (self.number(*lhs)?, self.number(*rhs)?);
                let result = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                };
                self.set(*dst, Value::Number(result))?;
            }
            Inst::Compare { dst, op, lhs, rhs } => {
                let (l, r) = (self.number(*lhs)?, self.number(*rhs)?);
                let result = match op {
                    CmpOp::Lt => !(l >= r),
                    CmpOp::Ne => !l.is_nan() && !r.is_nan() && l != r,
                };
                self.set(*dst, Value::Bool(result))?;
            }
            Inst::Widen { dst, src } => {
                let widened = self.get(*src)?.as_number().unwrap_or_default();
                self.set(*dst, Value::Number(widened))?;
            }
            Inst::Call { dst, callee, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.number(*arg)?);
                }
                return Ok(Step::Call {
                    callee: callee.clone(),
                    args: values,
                    dst: *dst,
                });
            }
            Inst::Phi { dst, incomings } => {
                let from = self
                    .previous
                    .ok_or_else(|| EvalError::InvalidIr("phi in entry block".to_string()))?;
                let (_, value) = incomings
                    .iter()
                    .find(|(block, _)| *block == from)
                    .ok_or_else(|| EvalError::InvalidIr(format!("phi has no arm for {}", from)))?;
                let value = self.get(*value)?;
                self.set(*dst, value)?;
            }
        }
        Ok(Step::Continue)
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs every function defined in `module`, replacing earlier
    /// functions of the same name. Declarations need no action.
    pub fn add_module(&mut self, module: Module) {
        for function in module.functions {
            self.functions
                .insert(function.name().to_string(), Rc::new(function));
        }
    }

    pub fn remove_function(&mut self, name: &str) -> bool {
        self.functions.remove(name).is_some()
    }

    /// Drains text written by `putchard` and `printd`.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Calls an installed function or builtin.
    pub fn call(&mut self, name: &str, args: &[f64]) -> Result<f64, EvalError> {
        let Some(function) = self.functions.get(name).cloned() else {
            return self.call_builtin(name, args);
        };
        check_arity(name, function.arity(), args.len())?;

        let mut stack = vec![Frame::new(function, args, None)];
        while let Some(frame) = stack.last_mut() {
            match frame.step()? {
                Step::Continue => {}
                Step::Call { callee, args, dst } => {
                    let Some(function) = self.functions.get(&callee).cloned() else {
                        let result = self.call_builtin(&callee, &args)?;
                        frame.set(dst, Value::Number(result))?;
                        continue;
                    };
                    check_arity(&callee, function.arity(), args.len())?;
                    if stack.len() >= MAX_CALL_DEPTH {
                        return Err(EvalError::CallDepthExceeded(MAX_CALL_DEPTH));
                    }
                    stack.push(Frame::new(function, &args, Some(dst)));
                }
                Step::Return(value) => {
                    let ret_dst = frame.ret_dst;
                    stack.pop();
                    match (stack.last_mut(), ret_dst) {
                        (Some(caller), Some(dst)) => caller.set(dst, Value::Number(value))?,
                        _ => return Ok(value),
                    }
                }
            }
        }
        Err(EvalError::InvalidIr("call stack emptied without a return".to_string()))
    }

    fn call_builtin(&mut self, name: &str, args: &[f64]) -> Result<f64, EvalError> {
        if !BUILTINS.contains(&name) {
            return Err(EvalError::UnknownFunction(name.to_string()));
        }
        check_arity(name, 1, args.len())?;

        let x = args[0];
        let result = match name {
            "putchard" => {
                self.output.push(x as u8 as char);
                0.0
            }
            "printd" => {
                self.output.push_str(&format!("{}\n", Value::Number(x)));
                0.0
            }
            "sin" => x.sin(),
            "cos" => x.cos(),
            _ => x.sqrt(),
        };
        Ok(result)
    }
}

fn check_arity(name: &str, expected: usize, found: usize) -> Result<(), EvalError> {
    if expected != found {
        return Err(EvalError::ArgumentCount {
            name: name.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrBuilder, Signature};

    /// def down(n) if n < 1 then 0 else down(n - 1)
    fn countdown() -> Module {
        let mut b = IrBuilder::new(Signature::new("down", vec!["n".into()]));
        let one = b.const_f64(1.0);
        let cond = b.compare(CmpOp::Lt, b.param(0), one);
        let base = b.new_block("base");
        let recurse = b.new_block("recurse");
        b.cond_br(cond, base, recurse);

        b.set_block(base);
        let zero = b.const_f64(0.0);
        b.ret(zero);

        b.set_block(recurse);
        let one = b.const_f64(1.0);
        let next = b.binary(BinaryOp::Sub, b.param(0), one);
        let r = b.call("down", vec![next]);
        b.ret(r);

        let mut module = Module::new("test");
        module.define(b.finish());
        module
    }

    #[test]
    fn builtins_write_to_output() {
        let mut evaluator = Evaluator::new();
        assert_eq!(evaluator.call("putchard", &[72.0]), Ok(0.0));
        assert_eq!(evaluator.call("printd", &[1.5]), Ok(0.0));
        assert_eq!(evaluator.take_output(), "H1.500000\n");
        assert_eq!(evaluator.take_output(), "");
    }

    #[test]
    fn unknown_function_is_an_error() {
        let mut evaluator = Evaluator::new();
        assert_eq!(
            evaluator.call("nope", &[]),
            Err(EvalError::UnknownFunction("nope".to_string()))
        );
    }

    #[test]
    fn open_block_is_invalid_ir() {
        let b = IrBuilder::new(Signature::new("f", vec![]));
        let mut module = Module::new("test");
        module.define(b.finish());

        let mut evaluator = Evaluator::new();
        evaluator.add_module(module);
        assert!(matches!(evaluator.call("f", &[]), Err(EvalError::InvalidIr(_))));
    }

    #[test]
    fn deepest_allowed_recursion_returns() {
        let mut evaluator = Evaluator::new();
        evaluator.add_module(countdown());

        // down(n) occupies n + 1 frames
        let deepest = (MAX_CALL_DEPTH - 1) as f64;
        assert_eq!(evaluator.call("down", &[deepest]), Ok(0.0));
        assert_eq!(
            evaluator.call("down", &[deepest + 1.0]),
            Err(EvalError::CallDepthExceeded(MAX_CALL_DEPTH))
        );
    }

    #[test]
    fn runaway_recursion_is_stopped() {
        // def f(x) f(x)
        let mut b = IrBuilder::new(Signature::new("f", vec!["x".into()]));
        let r = b.call("f", vec![b.param(0)]);
        b.ret(r);
        let mut module = Module::new("test");
        module.define(b.finish());

        let mut evaluator = Evaluator::new();
        evaluator.add_module(module);
        assert_eq!(
            evaluator.call("f", &[1.0]),
            Err(EvalError::CallDepthExceeded(MAX_CALL_DEPTH))
        );
        // A failed call leaves nothing behind for the next one
        evaluator.add_module(countdown());
        assert_eq!(evaluator.call("down", &[3.0]), Ok(0.0));
    }
}
