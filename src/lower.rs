//! AST to IR lowering.
//!
//! [`Lowerer`] walks each function body once and emits a control-flow graph
//! into the module it is building. Every variable (parameters, `for` loop
//! counters, `var` bindings) gets a storage slot, so assignment is a plain
//! store and only `if` needs an explicit phi.
//!
//! Lowering a function either succeeds completely or leaves no trace: on
//! failure the half-built function is dropped, the prototype cache and the
//! operator table are put back, and declarations added on its behalf are
//! withdrawn from the module.

use std::{collections::HashMap, fmt, mem};

use crate::{
    ast::{
        Expr, Function, Item, OperatorKind, Prototype,
        operators::{binary_function_name, unary_function_name},
    },
    ir::{self, BinaryOp, CmpOp, IrBuilder, Module, Signature, ValueId},
    operators::OperatorTable,
    prototypes::PrototypeCache,
    scope::ScopeStack,
};

/// Errors that abandon the function currently being lowered.
#[derive(Debug, Clone, PartialEq)]
pub enum LowerError {
    /// Reference to a name with no binding in scope
    UnknownVariable(String),

    /// Call to a function that is neither in the module nor in the prototype cache
    UnknownFunction(String),

    /// Call with the wrong number of arguments
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Prefix operator with no `unary<op>` function
    UnknownUnaryOperator(char),

    /// Infix operator with no `binary<op>` function
    UnknownBinaryOperator(char),

    /// Left side of `=` is not a plain variable
    AssignmentTarget,

    /// Operator function whose parameter count does not fit its syntax
    UnsupportedOperator { name: String, arity: usize },

    /// Function with a body redefined with a different parameter count
    Redefinition {
        name: String,
        defined: usize,
        found: usize,
    },
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerError::UnknownVariable(name) => write!(f, "unknown variable '{}'", name),
            LowerError::UnknownFunction(name) => write!(f, "unknown function '{}'", name),
            LowerError::ArgumentCount {
                name,
                expected,
                found,
            } => write!(
                f,
                "incorrect argument count for '{}': expected {}, found {}",
                name, expected, found
            ),
            LowerError::UnknownUnaryOperator(op) => write!(f, "unknown unary operator '{}'", op),
            LowerError::UnknownBinaryOperator(op) => write!(f, "unknown operator '{}'", op),
            LowerError::AssignmentTarget => write!(f, "assignment target must be a variable"),
            LowerError::UnsupportedOperator { name, arity } => write!(
                f,
                "unsupported operator '{}': its function takes {} arguments",
                name, arity
            ),
            LowerError::Redefinition {
                name,
                defined,
                found,
            } => write!(
                f,
                "function '{}' is already defined with {} parameters and cannot be redefined with {}",
                name, defined, found
            ),
        }
    }
}

impl std::error::Error for LowerError {}

/// Suspicious but accepted input, reported alongside successful lowering.
#[derive(Debug, Clone, PartialEq)]
pub enum LowerWarning {
    /// A definition whose parameter count differs from an earlier `extern`
    SignatureMismatch {
        name: String,
        declared: usize,
        defined: usize,
    },
}

impl fmt::Display for LowerWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerWarning::SignatureMismatch {
                name,
                declared,
                defined,
            } => write!(
                f,
                "definition of '{}' takes {} parameters but an earlier declaration takes {}",
                name, defined, declared
            ),
        }
    }
}

/// Lowers prototypes and functions into an IR [`Module`].
///
/// Holds everything that outlives a single function: the module being
/// built, the prototype cache, and the arity of every function given a body.
#[derive(Debug)]
pub struct Lowerer {
    module: Module,
    prototypes: PrototypeCache,
    scopes: ScopeStack,
    /// Functions given a body, with their parameter count
    defined: HashMap<String, usize>,
    /// Declarations added to the module while lowering the current function
    added_declarations: Vec<String>,
    warnings: Vec<LowerWarning>,
}

impl Lowerer {
    pub fn new(module_name: &str) -> Self {
        Lowerer {
            module: Module::new(module_name),
            prototypes: PrototypeCache::new(),
            scopes: ScopeStack::new(),
            defined: HashMap::new(),
            added_declarations: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Hands the module built so far to the caller and starts an empty one.
    ///
    /// Functions in the returned module stay callable from later input: calls
    /// resolve through the prototype cache and are declared in the new module.
    pub fn take_module(&mut self) -> Module {
        let fresh = Module::new(self.module.name.clone());
        mem::replace(&mut self.module, fresh)
    }

    pub fn prototypes(&self) -> &PrototypeCache {
        &self.prototypes
    }

    pub fn take_warnings(&mut self) -> Vec<LowerWarning> {
        mem::take(&mut self.warnings)
    }

    /// Drops every trace of `name`, e.g. after a top-level expression ran.
    pub fn forget(&mut self, name: &str) {
        self.prototypes.remove(name);
        self.defined.remove(name);
        self.module.remove_function(name);
        self.module.undeclare(name);
    }

    pub fn lower_item(
        &mut self,
        item: &Item,
        ops: &mut OperatorTable,
    ) -> Result<Signature, LowerError> {
        match item {
            Item::Definition(function) | Item::Expression(function) => {
                self.lower_function(function, ops)
            }
            Item::Extern(prototype) => self.lower_prototype(prototype),
        }
    }

    /// Registers a signature without a body.
    pub fn lower_prototype(&mut self, prototype: &Prototype) -> Result<Signature, LowerError> {
        self.check_redefinition(prototype)?;

        let signature = signature_of(prototype);
        self.prototypes.insert(prototype.clone());
        self.module.redeclare(signature.clone());
        Ok(signature)
    }

    /// Lowers a full definition into the module.
    ///
    /// A `binary` operator is installed into `ops` before its body is
    /// lowered and rolled back if lowering fails.
    pub fn lower_function(
        &mut self,
        function: &Function,
        ops: &mut OperatorTable,
    ) -> Result<Signature, LowerError> {
        let prototype = &function.prototype;
        self.check_redefinition(prototype)?;

        if let Some(declared) = self.prototypes.get(&prototype.name) {
            if !self.defined.contains_key(&prototype.name) && declared.arity() != prototype.arity()
            {
                self.warnings.push(LowerWarning::SignatureMismatch {
                    name: prototype.name.clone(),
                    declared: declared.arity(),
                    defined: prototype.arity(),
                });
            }
        }

        let previous = self.prototypes.insert(prototype.clone());
        let installed = match prototype.operator {
            Some(OperatorKind::Binary { symbol, precedence }) => {
                Some((symbol, ops.install(symbol, precedence)))
            }
            _ => None,
        };

        self.added_declarations.clear();
        match self.lower_body(function) {
            Ok(func) => {
                self.added_declarations.clear();
                let signature = func.signature.clone();
                self.defined
                    .insert(prototype.name.clone(), prototype.arity());
                self.module.define(func);
                Ok(signature)
            }
            Err(e) => {
                self.scopes.clear();
                for name in self.added_declarations.drain(..) {
                    self.module.undeclare(&name);
                }
                self.prototypes.restore(&prototype.name, previous);
                if let Some((symbol, precedence)) = installed {
                    ops.restore(symbol, precedence);
                }
                Err(e)
            }
        }
    }

    fn check_redefinition(&self, prototype: &Prototype) -> Result<(), LowerError> {
        match self.defined.get(&prototype.name) {
            Some(&defined) if defined != prototype.arity() => Err(LowerError::Redefinition {
                name: prototype.name.clone(),
                defined,
                found: prototype.arity(),
            }),
            _ => Ok(()),
        }
    }

    fn lower_body(&mut self, function: &Function) -> Result<ir::Function, LowerError> {
        let prototype = &function.prototype;
        let mut b = IrBuilder::new(signature_of(prototype));

        self.scopes.clear();
        self.scopes.push_frame();
        for (i, param) in prototype.params.iter().enumerate() {
            let slot = b.new_slot(param);
            b.store(slot, b.param(i));
            self.scopes.bind(param, slot);
        }

        let value = self.lower_expr(&mut b, &function.body)?;
        b.ret(value);
        self.scopes.pop_frame();

        Ok(b.finish())
    }

    /// Finds a callable signature: first in the module, then in the
    /// prototype cache, declaring it in the module on first use.
    fn resolve_function(&mut self, name: &str) -> Option<Signature> {
        if let Some(signature) = self.module.get_signature(name) {
            return Some(signature.clone());
        }

        let signature = signature_of(self.prototypes.get(name)?);
        if self.module.declare(signature.clone()) {
            self.added_declarations.push(name.to_string());
        }
        Some(signature)
    }

    /// Runs `f` in a new innermost scope frame, popping it on every path.
    fn in_frame<T>(
        &mut self,
        b: &mut IrBuilder,
        f: impl FnOnce(&mut Self, &mut IrBuilder) -> Result<T, LowerError>,
    ) -> Result<T, LowerError> {
        let depth = self.scopes.depth();
        self.scopes.push_frame();
        let result = f(self, b);
        self.scopes.truncate(depth);
        result
    }

    fn lower_expr(&mut self, b: &mut IrBuilder, expr: &Expr) -> Result<ValueId, LowerError> {
        match expr {
            Expr::Number(n) => Ok(b.const_f64(*n)),
            Expr::Variable(name) => {
                let slot = self
                    .scopes
                    .lookup(name)
                    .ok_or_else(|| LowerError::UnknownVariable(name.clone()))?;
                Ok(b.load(slot))
            }
            Expr::Unary { op, operand } => {
                let value = self.lower_expr(b, operand)?;
                let name = unary_function_name(*op);
                let signature = self
                    .resolve_function(&name)
                    .ok_or(LowerError::UnknownUnaryOperator(*op))?;
                check_operator_arity(&signature, 1)?;
                Ok(b.call(&name, vec![value]))
            }
            Expr::Binary { op: '=', left, right } => self.lower_assignment(b, left, right),
            Expr::Binary { op, left, right } => {
                let lhs = self.lower_expr(b, left)?;
                let rhs = self.lower_expr(b, right)?;
                match op {
                    '+' => Ok(b.binary(BinaryOp::Add, lhs, rhs)),
                    '-' => Ok(b.binary(BinaryOp::Sub, lhs, rhs)),
                    '*' => Ok(b.binary(BinaryOp::Mul, lhs, rhs)),
                    '<' => {
                        let cmp = b.compare(CmpOp::Lt, lhs, rhs);
                        Ok(b.widen(cmp))
                    }
                    _ => {
                        let name = binary_function_name(*op);
                        let signature = self
                            .resolve_function(&name)
                            .ok_or(LowerError::UnknownBinaryOperator(*op))?;
                        check_operator_arity(&signature, 2)?;
                        Ok(b.call(&name, vec![lhs, rhs]))
                    }
                }
            }
            Expr::Call { callee, args } => {
                let signature = self
                    .resolve_function(callee)
                    .ok_or_else(|| LowerError::UnknownFunction(callee.clone()))?;
                if signature.arity() != args.len() {
                    return Err(LowerError::ArgumentCount {
                        name: callee.clone(),
                        expected: signature.arity(),
                        found: args.len(),
                    });
                }

                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.lower_expr(b, arg)?);
                }
                Ok(b.call(callee, values))
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => self.lower_if(b, cond, then, otherwise),
            Expr::For {
                var,
                start,
                end,
                step,
                body,
            } => self.lower_for(b, var, start, end, step.as_deref(), body),
            Expr::Var { bindings, body } => self.lower_var(b, bindings, body),
        }
    }

    fn lower_assignment(
        &mut self,
        b: &mut IrBuilder,
        target: &Expr,
        value: &Expr,
    ) -> Result<ValueId, LowerError> {
        let name = match target {
            Expr::Variable(name) => name,
            _ => return Err(LowerError::AssignmentTarget),
        };

        let value = self.lower_expr(b, value)?;
        let slot = self
            .scopes
            .lookup(name)
            .ok_or_else(|| LowerError::UnknownVariable(name.clone()))?;
        b.store(slot, value);
        Ok(value)
    }

    fn lower_if(
        &mut self,
        b: &mut IrBuilder,
        cond: &Expr,
        then: &Expr,
        otherwise: &Expr,
    ) -> Result<ValueId, LowerError> {
        let cond = self.lower_expr(b, cond)?;
        let zero = b.const_f64(0.0);
        let test = b.compare(CmpOp::Ne, cond, zero);

        let then_bb = b.new_block("then");
        let else_bb = b.new_block("else");
        let merge_bb = b.new_block("ifcont");
        b.cond_br(test, then_bb, else_bb);

        // Either arm may branch internally; the phi needs the block each arm ends in
        b.set_block(then_bb);
        let then_value = self.lower_expr(b, then)?;
        let then_end = b.cur_block();
        b.br(merge_bb);

        b.set_block(else_bb);
        let else_value = self.lower_expr(b, otherwise)?;
        let else_end = b.cur_block();
        b.br(merge_bb);

        b.set_block(merge_bb);
        Ok(b.phi(vec![(then_end, then_value), (else_end, else_value)]))
    }

    fn lower_for(
        &mut self,
        b: &mut IrBuilder,
        var: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &Expr,
    ) -> Result<ValueId, LowerError> {
        // The start value cannot see the loop variable
        let start = self.lower_expr(b, start)?;
        let slot = b.new_slot(var);
        b.store(slot, start);

        let loop_bb = b.new_block("loop");
        b.br(loop_bb);
        b.set_block(loop_bb);

        self.in_frame(b, |this, b| {
            this.scopes.bind(var, slot);

            this.lower_expr(b, body)?;

            let step = match step {
                Some(step) => this.lower_expr(b, step)?,
                None => b.const_f64(1.0),
            };
            let current = b.load(slot);
            let next = b.binary(BinaryOp::Add, current, step);
            b.store(slot, next);

            let end = this.lower_expr(b, end)?;
            let zero = b.const_f64(0.0);
            let test = b.compare(CmpOp::Ne, end, zero);

            let after_bb = b.new_block("afterloop");
            b.cond_br(test, loop_bb, after_bb);
            b.set_block(after_bb);
            Ok(())
        })?;

        Ok(b.const_f64(0.0))
    }

    fn lower_var(
        &mut self,
        b: &mut IrBuilder,
        bindings: &[(String, Option<Expr>)],
        body: &Expr,
    ) -> Result<ValueId, LowerError> {
        self.in_frame(b, |this, b| {
            for (name, init) in bindings {
                // Lowered before `name` is bound, so `var x = x` reads the outer x
                let value = match init {
                    Some(init) => this.lower_expr(b, init)?,
                    None => b.const_f64(0.0),
                };
                let slot = b.new_slot(name);
                b.store(slot, value);
                this.scopes.bind(name, slot);
            }

            this.lower_expr(b, body)
        })
    }
}

fn signature_of(prototype: &Prototype) -> Signature {
    Signature::new(prototype.name.clone(), prototype.params.clone())
}

fn check_operator_arity(signature: &Signature, arity: usize) -> Result<(), LowerError> {
    if signature.arity() != arity {
        return Err(LowerError::UnsupportedOperator {
            name: signature.name.clone(),
            arity: signature.arity(),
        });
    }
    Ok(())
}
