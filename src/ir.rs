//! Register-based control-flow-graph IR produced by lowering.
//!
//! A [`Function`] is a list of basic blocks. Each block holds straight-line
//! instructions and ends in exactly one [`Terminator`]. Values are SSA: every
//! [`ValueId`] is assigned once, and values flowing in from several
//! predecessors are joined with [`Inst::Phi`]. Mutable variables live in
//! storage slots accessed with [`Inst::Load`] and [`Inst::Store`].

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    F64,
    Bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    /// Unordered less-than: true if either side is NaN
    Lt,
    /// Ordered not-equal: false if either side is NaN
    Ne,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
    // Constants / storage
    Const { dst: ValueId, value: f64 },
    Load { dst: ValueId, slot: SlotId },
    Store { slot: SlotId, value: ValueId },

    // Arithmetic / compare
    Binary { dst: ValueId, op: BinaryOp, lhs: ValueId, rhs: ValueId },
    Compare { dst: ValueId, op: CmpOp, lhs: ValueId, rhs: ValueId }, // dst: Bool
    Widen { dst: ValueId, src: ValueId },                            // Bool -> 0.0 / 1.0

    // Calls
    Call { dst: ValueId, callee: String, args: Vec<ValueId> },

    // SSA join
    Phi { dst: ValueId, incomings: Vec<(BlockId, ValueId)> },
}

impl Inst {
    /// The value this instruction defines, if any.
    pub fn dst(&self) -> Option<ValueId> {
        match self {
            Inst::Store { .. } => None,
            Inst::Const { dst, .. }
            | Inst::Load { dst, .. }
            | Inst::Binary { dst, .. }
            | Inst::Compare { dst, .. }
            | Inst::Widen { dst, .. }
            | Inst::Call { dst, .. }
            | Inst::Phi { dst, .. } => Some(*dst),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Terminator {
    Br { target: BlockId },
    CondBr { cond: ValueId, then_block: BlockId, else_block: BlockId },
    Ret { value: ValueId },
    /// Placeholder while the block is still being filled
    Unreachable,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub label: String,
    pub insts: Vec<Inst>,
    pub term: Terminator,
}

/// Name and parameter names of a function. Every parameter and every return
/// value is an `f64`, so arity is the whole type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<String>,
}

impl Signature {
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        Signature {
            name: name.into(),
            params,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub signature: Signature,
    /// Storage slot names, indexed by [`SlotId`]
    pub slots: Vec<String>,
    pub entry: BlockId,
    pub blocks: Vec<Block>,
    /// Type of every value, indexed by [`ValueId`]; parameters come first
    pub value_types: Vec<Type>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn arity(&self) -> usize {
        self.signature.arity()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    /// Value holding parameter `index` on entry.
    pub fn param(&self, index: usize) -> ValueId {
        ValueId(index as u32)
    }
}

/// Unit handed to a backend: signatures declared without a body, followed by
/// defined functions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    pub name: String,
    pub declarations: Vec<Signature>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            declarations: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.functions.is_empty()
    }

    /// Declares `signature` unless the name is already declared or defined.
    /// Returns whether anything was added.
    pub fn declare(&mut self, signature: Signature) -> bool {
        if self.get_signature(&signature.name).is_some() {
            return false;
        }
        self.declarations.push(signature);
        true
    }

    /// Replaces an existing declaration of the same name, if any.
    pub fn redeclare(&mut self, signature: Signature) {
        self.undeclare(&signature.name);
        if self.get_function(&signature.name).is_none() {
            self.declarations.push(signature);
        }
    }

    pub fn undeclare(&mut self, name: &str) -> Option<Signature> {
        let index = self.declarations.iter().position(|s| s.name == name)?;
        Some(self.declarations.remove(index))
    }

    /// Adds `function`, replacing any declaration or definition of the same name.
    pub fn define(&mut self, function: Function) {
        self.undeclare(function.name());
        match self.functions.iter_mut().find(|f| f.name() == function.name()) {
            Some(existing) => *existing = function,
            None => self.functions.push(function),
        }
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name() == name)
    }

    /// Signature of a defined function, or else of a declaration.
    pub fn get_signature(&self, name: &str) -> Option<&Signature> {
        self.get_function(name)
            .map(|f| &f.signature)
            .or_else(|| self.declarations.iter().find(|s| s.name == name))
    }

    pub fn remove_function(&mut self, name: &str) -> Option<Function> {
        let index = self.functions.iter().position(|f| f.name() == name)?;
        Some(self.functions.remove(index))
    }
}

/// Emits instructions into a function under construction.
///
/// The builder is positioned at a current block; instructions are appended
/// to it until it is terminated and another block is selected.
#[derive(Debug)]
pub struct IrBuilder {
    func: Function,
    cur: BlockId,
}

impl IrBuilder {
    pub fn new(signature: Signature) -> Self {
        let entry = BlockId(0);
        let value_types = vec![Type::F64; signature.arity()];
        Self {
            func: Function {
                signature,
                slots: Vec::new(),
                entry,
                blocks: vec![Block {
                    label: "entry".to_string(),
                    insts: Vec::new(),
                    term: Terminator::Unreachable,
                }],
                value_types,
            },
            cur: entry,
        }
    }

    pub fn param(&self, index: usize) -> ValueId {
        self.func.param(index)
    }

    pub fn new_block(&mut self, label: &str) -> BlockId {
        let id = BlockId(self.func.blocks.len() as u32);
        self.func.blocks.push(Block {
            label: label.to_string(),
            insts: Vec::new(),
            term: Terminator::Unreachable,
        });
        id
    }

    pub fn set_block(&mut self, b: BlockId) {
        self.cur = b;
    }

    pub fn cur_block(&self) -> BlockId {
        self.cur
    }

    pub fn is_open(&self) -> bool {
        matches!(self.func.block(self.cur).term, Terminator::Unreachable)
    }

    pub fn new_value(&mut self, ty: Type) -> ValueId {
        let id = ValueId(self.func.value_types.len() as u32);
        self.func.value_types.push(ty);
        id
    }

    pub fn new_slot(&mut self, name: &str) -> SlotId {
        let id = SlotId(self.func.slots.len() as u32);
        self.func.slots.push(name.to_string());
        id
    }

    pub fn emit(&mut self, inst: Inst) {
        let b = &mut self.func.blocks[self.cur.0 as usize];
        b.insts.push(inst);
    }

    pub fn term(&mut self, term: Terminator) {
        let b = &mut self.func.blocks[self.cur.0 as usize];
        b.term = term;
    }

    pub fn const_f64(&mut self, value: f64) -> ValueId {
        let dst = self.new_value(Type::F64);
        self.emit(Inst::Const { dst, value });
        dst
    }

    pub fn load(&mut self, slot: SlotId) -> ValueId {
        let dst = self.new_value(Type::F64);
        self.emit(Inst::Load { dst, slot });
        dst
    }

    pub fn store(&mut self, slot: SlotId, value: ValueId) {
        self.emit(Inst::Store { slot, value });
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dst = self.new_value(Type::F64);
        self.emit(Inst::Binary { dst, op, lhs, rhs });
        dst
    }

    pub fn compare(&mut self, op: CmpOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dst = self.new_value(Type::Bool);
        self.emit(Inst::Compare { dst, op, lhs, rhs });
        dst
    }

    pub fn widen(&mut self, src: ValueId) -> ValueId {
        let dst = self.new_value(Type::F64);
        self.emit(Inst::Widen { dst, src });
        dst
    }

    pub fn call(&mut self, callee: &str, args: Vec<ValueId>) -> ValueId {
        let dst = self.new_value(Type::F64);
        self.emit(Inst::Call {
            dst,
            callee: callee.to_string(),
            args,
        });
        dst
    }

    pub fn phi(&mut self, incomings: Vec<(BlockId, ValueId)>) -> ValueId {
        let dst = self.new_value(Type::F64);
        self.emit(Inst::Phi { dst, incomings });
        dst
    }

    pub fn br(&mut self, target: BlockId) {
        self.term(Terminator::Br { target });
    }

    pub fn cond_br(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId) {
        self.term(Terminator::CondBr {
            cond,
            then_block,
            else_block,
        });
    }

    pub fn ret(&mut self, value: ValueId) {
        self.term(Terminator::Ret { value });
    }

    pub fn finish(self) -> Function {
        self.func
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|p| format!("%{}", p)).collect();
        write!(f, "@{}({})", self.name, params.join(", "))
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Const { dst, value } => write!(f, "{} = const {:?}", dst, value),
            Inst::Load { dst, slot } => write!(f, "{} = load {}", dst, slot),
            Inst::Store { slot, value } => write!(f, "store {}, {}", slot, value),
            Inst::Binary { dst, op, lhs, rhs } => {
                let name = match op {
                    BinaryOp::Add => "fadd",
                    BinaryOp::Sub => "fsub",
                    BinaryOp::Mul => "fmul",
                };
                write!(f, "{} = {} {}, {}", dst, name, lhs, rhs)
            }
            Inst::Compare { dst, op, lhs, rhs } => {
                let name = match op {
                    CmpOp::Lt => "ult",
                    CmpOp::Ne => "one",
                };
                write!(f, "{} = fcmp {} {}, {}", dst, name, lhs, rhs)
            }
            Inst::Widen { dst, src } => write!(f, "{} = widen {}", dst, src),
            Inst::Call { dst, callee, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{} = call @{}({})", dst, callee, args.join(", "))
            }
            Inst::Phi { dst, incomings } => {
                let arms: Vec<String> = incomings
                    .iter()
                    .map(|(b, v)| format!("[{}, {}]", v, b))
                    .collect();
                write!(f, "{} = phi {}", dst, arms.join(", "))
            }
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Br { target } => write!(f, "br {}", target),
            Terminator::CondBr {
                cond,
                then_block,
                else_block,
            } => write!(f, "condbr {}, {}, {}", cond, then_block, else_block),
            Terminator::Ret { value } => write!(f, "ret {}", value),
            Terminator::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "define {} {{", self.signature)?;
        for (i, slot) in self.slots.iter().enumerate() {
            writeln!(f, "  {} = slot {}", SlotId(i as u32), slot)?;
        }
        for (i, block) in self.blocks.iter().enumerate() {
            writeln!(f, "{} {}:", BlockId(i as u32), block.label)?;
            for inst in &block.insts {
                writeln!(f, "  {}", inst)?;
            }
            writeln!(f, "  {}", block.term)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name)?;
        for sig in &self.declarations {
            writeln!(f, "declare {}", sig)?;
        }
        for func in &self.functions {
            writeln!(f)?;
            writeln!(f, "{}", func)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_numbers_params_before_new_values() {
        let mut b = IrBuilder::new(Signature::new("add", vec!["a".into(), "b".into()]));
        let sum = b.binary(BinaryOp::Add, b.param(0), b.param(1));
        assert_eq!(sum, ValueId(2));
        b.ret(sum);
        assert!(!b.is_open());

        let func = b.finish();
        assert_eq!(func.value_types, vec![Type::F64; 3]);
        assert_eq!(
            func.to_string(),
            "define @add(%a, %b) {\nb0 entry:\n  %2 = fadd %0, %1\n  ret %2\n}"
        );
    }

    #[test]
    fn define_replaces_declaration() {
        let mut module = Module::new("test");
        assert!(module.declare(Signature::new("f", vec!["x".into()])));
        assert!(!module.declare(Signature::new("f", vec![])));

        let mut b = IrBuilder::new(Signature::new("f", vec!["x".into()]));
        b.ret(b.param(0));
        module.define(b.finish());

        assert!(module.declarations.is_empty());
        assert_eq!(module.get_signature("f").map(|s| s.arity()), Some(1));
        assert!(module.remove_function("f").is_some());
        assert!(module.is_empty());
    }
}
