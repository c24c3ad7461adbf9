#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConstIdx(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot(pub(crate) u16);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConstVal {
    F64(f64),
    Bool(bool),
}

/// The complete set of callable functions available to user motion code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuiltinId {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Abs,
    Floor,
    Ceil,
    Round,
    Fract,
    Sqrt,
    Pow,
    Exp,
    Ln,
    Min,
    Max,
    Clamp,
    Lerp,
    Sign,
    Mod,
    Smoothstep,
}

impl BuiltinId {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "atan2" => Self::Atan2,
            "abs" => Self::Abs,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "fract" => Self::Fract,
            "sqrt" => Self::Sqrt,
            "pow" => Self::Pow,
            "exp" => Self::Exp,
            "ln" => Self::Ln,
            "min" => Self::Min,
            "max" => Self::Max,
            "clamp" => Self::Clamp,
            "lerp" => Self::Lerp,
            "sign" => Self::Sign,
            "mod" => Self::Mod,
            "smoothstep" => Self::Smoothstep,
            _ => return None,
        })
    }

    pub(crate) fn arity(self) -> u8 {
        match self {
            Self::Atan2 | Self::Pow | Self::Min | Self::Max | Self::Mod => 2,
            Self::Clamp | Self::Lerp | Self::Smoothstep => 3,
            _ => 1,
        }
    }
}

/// Named numeric constants readable from user code.
pub(crate) fn constant(name: &str) -> Option<f64> {
    match name {
        "PI" => Some(std::f64::consts::PI),
        "TAU" => Some(std::f64::consts::TAU),
        "E" => Some(std::f64::consts::E),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    PushConst(ConstIdx),
    LoadLocal(Slot),
    StoreLocal(Slot),

    Neg,
    Not,
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

    Jump(u32),
    /// Pops a bool; jumps when it is false.
    JumpIfFalse(u32),

    CallBuiltin { id: BuiltinId, argc: u8 },

    /// Pops one number and returns it.
    Return,
    /// Pops `y` then `x` and returns the pair.
    ReturnVec,
}

#[derive(Debug, Clone)]
pub(crate) struct BytecodeProgram {
    pub(crate) ops: Vec<Op>,
    pub(crate) consts: Vec<ConstVal>,
    /// Number of local slots; the first `params` slots hold the arguments.
    pub(crate) locals: u16,
    pub(crate) params: u16,
}

impl BytecodeProgram {
    pub(crate) fn new() -> Self {
        Self {
            ops: Vec::new(),
            consts: Vec::new(),
            locals: 0,
            params: 0,
        }
    }

    pub(crate) fn push_const(&mut self, c: ConstVal) -> ConstIdx {
        if let Some(i) = self.consts.iter().position(|existing| same_const(existing, &c)) {
            return ConstIdx(i as u32);
        }
        let idx = ConstIdx(self.consts.len() as u32);
        self.consts.push(c);
        idx
    }
}

fn same_const(a: &ConstVal, b: &ConstVal) -> bool {
    match (a, b) {
        (ConstVal::F64(a), ConstVal::F64(b)) => a.to_bits() == b.to_bits(),
        (ConstVal::Bool(a), ConstVal::Bool(b)) => a == b,
        _ => false,
    }
}
