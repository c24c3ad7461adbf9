#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Lit(Lit),
    Ident {
        name: String,
        offset: usize,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        func: String,
        offset: usize,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lit {
    F64(f64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    Let {
        name: String,
        offset: usize,
        value: Expr,
    },
    Assign {
        name: String,
        offset: usize,
        /// `Some(op)` for compound assignment (`+=` and friends).
        op: Option<BinaryOp>,
        value: Expr,
    },
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Return {
        offset: usize,
        value: Expr,
    },
    ReturnVec {
        offset: usize,
        x: Expr,
        y: Expr,
    },
}

/// A parsed `fn name(params) { body }` declaration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FunctionDecl {
    pub(crate) name: String,
    pub(crate) name_offset: usize,
    pub(crate) params: Vec<(String, usize)>,
    pub(crate) body: Vec<Stmt>,
}
