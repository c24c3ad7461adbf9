use crate::expression::ast::{BinaryOp, Expr, FunctionDecl, Lit, Stmt, UnaryOp};
use crate::expression::bytecode::{BuiltinId, BytecodeProgram, ConstVal, Op, Slot, constant};
use crate::expression::error::CompileError;
use crate::expression::parser::parse_function;

const MAX_LOCALS: usize = 256;
const MAX_OPS: usize = 16_384;

/// Which motion contract a piece of user source implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    /// `fn path(t, phase, layerIndex, baseUnit, motionScale) -> { x, y }`
    Path,
    /// `fn scale(t) -> number`
    Scale,
}

impl FunctionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Scale => "scale",
        }
    }

    pub fn max_params(self) -> usize {
        match self {
            Self::Path => 5,
            Self::Scale => 1,
        }
    }
}

pub(crate) fn compile_source(
    src: &str,
    kind: FunctionKind,
) -> Result<BytecodeProgram, CompileError> {
    let decl = parse_function(src)?;
    check_signature(&decl, kind)?;

    let mut lower = Lower {
        kind,
        program: BytecodeProgram::new(),
        scopes: vec![Vec::new()],
        next_slot: 0,
        saw_return: false,
    };
    for (name, offset) in &decl.params {
        lower.declare(name, *offset)?;
    }
    lower.program.params = decl.params.len() as u16;
    lower.block(&decl.body)?;

    if !lower.saw_return {
        return Err(CompileError::new(
            decl.name_offset,
            format!("'{}' never returns a value", decl.name),
        ));
    }
    lower.program.locals = lower.next_slot;
    Ok(lower.program)
}

fn check_signature(decl: &FunctionDecl, kind: FunctionKind) -> Result<(), CompileError> {
    if decl.name != kind.name() {
        return Err(CompileError::new(
            decl.name_offset,
            format!(
                "expected a function named '{}', found '{}'",
                kind.name(),
                decl.name
            ),
        ));
    }
    if decl.params.len() > kind.max_params() {
        let (_, offset) = &decl.params[kind.max_params()];
        return Err(CompileError::new(
            *offset,
            format!(
                "'{}' accepts at most {} parameter(s)",
                kind.name(),
                kind.max_params()
            ),
        ));
    }
    for (i, (name, offset)) in decl.params.iter().enumerate() {
        if decl.params[..i].iter().any(|(other, _)| other == name) {
            return Err(CompileError::new(
                *offset,
                format!("duplicate parameter '{name}'"),
            ));
        }
    }
    Ok(())
}

struct Lower {
    kind: FunctionKind,
    program: BytecodeProgram,
    scopes: Vec<Vec<(String, Slot)>>,
    next_slot: u16,
    saw_return: bool,
}

impl Lower {
    fn emit(&mut self, op: Op) -> Result<usize, CompileError> {
        if self.program.ops.len() >= MAX_OPS {
            return Err(CompileError::new(0, "function is too large"));
        }
        self.program.ops.push(op);
        Ok(self.program.ops.len() - 1)
    }

    fn here(&self) -> u32 {
        self.program.ops.len() as u32
    }

    fn patch(&mut self, at: usize, target: u32) {
        match &mut self.program.ops[at] {
            Op::Jump(t) | Op::JumpIfFalse(t) => *t = target,
            _ => {}
        }
    }

    fn declare(&mut self, name: &str, offset: usize) -> Result<Slot, CompileError> {
        if constant(name).is_some() || BuiltinId::from_name(name).is_some() {
            return Err(CompileError::new(
                offset,
                format!("'{name}' is reserved and cannot be declared"),
            ));
        }
        let scope = self.scopes.last_mut().ok_or_else(|| {
            CompileError::new(offset, "internal error: no active scope")
        })?;
        if scope.iter().any(|(n, _)| n == name) {
            return Err(CompileError::new(
                offset,
                format!("'{name}' is already declared in this block"),
            ));
        }
        if usize::from(self.next_slot) >= MAX_LOCALS {
            return Err(CompileError::new(offset, "too many local variables"));
        }
        let slot = Slot(self.next_slot);
        self.next_slot += 1;
        scope.push((name.to_owned(), slot));
        Ok(slot)
    }

    fn lookup(&self, name: &str) -> Option<Slot> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(n, _)| n == name)
            .map(|(_, slot)| *slot)
    }

    fn block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        self.scopes.push(Vec::new());
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Let {
                name,
                offset,
                value,
            } => {
                // The initializer cannot see the binding it introduces.
                self.expr(value)?;
                let slot = self.declare(name, *offset)?;
                self.emit(Op::StoreLocal(slot))?;
            }
            Stmt::Assign {
                name,
                offset,
                op,
                value,
            } => {
                let slot = self.lookup(name).ok_or_else(|| {
                    if constant(name).is_some() {
                        CompileError::new(*offset, format!("cannot assign to constant '{name}'"))
                    } else {
                        CompileError::new(
                            *offset,
                            format!("assignment to undeclared variable '{name}'"),
                        )
                    }
                })?;
                if let Some(op) = op {
                    self.emit(Op::LoadLocal(slot))?;
                    self.expr(value)?;
                    self.emit(binary_op(*op))?;
                } else {
                    self.expr(value)?;
                }
                self.emit(Op::StoreLocal(slot))?;
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond)?;
                let to_else = self.emit(Op::JumpIfFalse(0))?;
                self.block(then)?;
                if otherwise.is_empty() {
                    let end = self.here();
                    self.patch(to_else, end);
                } else {
                    let to_end = self.emit(Op::Jump(0))?;
                    let else_start = self.here();
                    self.patch(to_else, else_start);
                    self.block(otherwise)?;
                    let end = self.here();
                    self.patch(to_end, end);
                }
            }
            Stmt::While { cond, body } => {
                let top = self.here();
                self.expr(cond)?;
                let to_end = self.emit(Op::JumpIfFalse(0))?;
                self.block(body)?;
                self.emit(Op::Jump(top))?;
                let end = self.here();
                self.patch(to_end, end);
            }
            Stmt::Return { offset, value } => {
                if self.kind == FunctionKind::Path {
                    return Err(CompileError::new(
                        *offset,
                        "path functions must return { x: ..., y: ... }",
                    ));
                }
                self.expr(value)?;
                self.emit(Op::Return)?;
                self.saw_return = true;
            }
            Stmt::ReturnVec { offset, x, y } => {
                if self.kind == FunctionKind::Scale {
                    return Err(CompileError::new(
                        *offset,
                        "scale functions must return a number",
                    ));
                }
                self.expr(x)?;
                self.expr(y)?;
                self.emit(Op::ReturnVec)?;
                self.saw_return = true;
            }
        }
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Lit(Lit::F64(v)) => {
                let idx = self.program.push_const(ConstVal::F64(*v));
                self.emit(Op::PushConst(idx))?;
            }
            Expr::Lit(Lit::Bool(v)) => {
                let idx = self.program.push_const(ConstVal::Bool(*v));
                self.emit(Op::PushConst(idx))?;
            }
            Expr::Ident { name, offset } => {
                if let Some(slot) = self.lookup(name) {
                    self.emit(Op::LoadLocal(slot))?;
                } else if let Some(v) = constant(name) {
                    let idx = self.program.push_const(ConstVal::F64(v));
                    self.emit(Op::PushConst(idx))?;
                } else if BuiltinId::from_name(name).is_some() {
                    return Err(CompileError::new(
                        *offset,
                        format!("'{name}' is a function and must be called"),
                    ));
                } else {
                    return Err(CompileError::new(
                        *offset,
                        format!("'{name}' is not available in motion functions"),
                    ));
                }
            }
            Expr::Unary { op, expr } => {
                self.expr(expr)?;
                self.emit(match op {
                    UnaryOp::Neg => Op::Neg,
                    UnaryOp::Not => Op::Not,
                })?;
            }
            Expr::Binary { op, left, right } => {
                self.expr(left)?;
                self.expr(right)?;
                self.emit(binary_op(*op))?;
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond)?;
                let to_else = self.emit(Op::JumpIfFalse(0))?;
                self.expr(then)?;
                let to_end = self.emit(Op::Jump(0))?;
                let else_start = self.here();
                self.patch(to_else, else_start);
                self.expr(otherwise)?;
                let end = self.here();
                self.patch(to_end, end);
            }
            Expr::Call { func, offset, args } => {
                let Some(id) = BuiltinId::from_name(func) else {
                    return Err(CompileError::new(
                        *offset,
                        format!("function '{func}' is not allowed in motion functions"),
                    ));
                };
                if args.len() != usize::from(id.arity()) {
                    return Err(CompileError::new(
                        *offset,
                        format!(
                            "'{func}' expects {} argument(s), got {}",
                            id.arity(),
                            args.len()
                        ),
                    ));
                }
                for arg in args {
                    self.expr(arg)?;
                }
                self.emit(Op::CallBuiltin {
                    id,
                    argc: id.arity(),
                })?;
            }
        }
        Ok(())
    }
}

fn binary_op(op: BinaryOp) -> Op {
    match op {
        BinaryOp::Add => Op::Add,
        BinaryOp::Sub => Op::Sub,
        BinaryOp::Mul => Op::Mul,
        BinaryOp::Div => Op::Div,
        BinaryOp::Mod => Op::Mod,
        BinaryOp::Eq => Op::Eq,
        BinaryOp::Ne => Op::Ne,
        BinaryOp::Lt => Op::Lt,
        BinaryOp::Le => Op::Le,
        BinaryOp::Gt => Op::Gt,
        BinaryOp::Ge => Op::Ge,
        BinaryOp::And => Op::And,
        BinaryOp::Or => Op::Or,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/compile.rs"]
mod tests;
