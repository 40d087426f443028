//! AST node definitions for the Veld language.
//!
//! The parser produces these nodes; the type checker consumes them and
//! records a type for every expression, keyed by [`ExprId`].

use veldc_util::Location;

/// Uniquely identifies one expression node within a compilation.
///
/// Assigned sequentially by the parser. The type checker's
/// expression-type table is keyed by this id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// A literal value appearing in the source.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    /// An integer literal, with the width and signedness it gets before
    /// any casts: 32-bit signed for number literals, 8-bit unsigned for
    /// character literals.
    Integer {
        value: i64,
        width_bits: u32,
        signed: bool,
    },
    Str(Vec<u8>),
}

/// A type as spelled in the source: a base name and how many `*`s
/// follow it. Resolved to an interned type by the type checker.
#[derive(Clone, Debug, PartialEq)]
pub struct AstType {
    pub name: String,
    pub pointer_depth: u32,
    pub location: Location,
}

/// The arithmetic and comparison operators that share one typing rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl BinaryOp {
    /// True for the six comparison operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le
        )
    }
}

/// An expression node.
#[derive(Clone, Debug, PartialEq)]
pub struct AstExpression {
    pub id: ExprId,
    pub location: Location,
    pub kind: AstExpressionKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AstExpressionKind {
    Constant(Constant),
    GetVariable(String),
    FunctionCall {
        name: String,
        args: Vec<AstExpression>,
    },
    /// A struct literal `Foo{x = 1, y = 2}`. Fields may be omitted.
    BraceInit {
        struct_name: String,
        fields: Vec<(String, AstExpression)>,
    },
    /// `obj.field`
    GetField {
        obj: Box<AstExpression>,
        field_name: String,
    },
    /// `ptr->field`
    DerefAndGetField {
        obj: Box<AstExpression>,
        field_name: String,
    },
    /// `ptr[index]`
    Indexing {
        ptr: Box<AstExpression>,
        index: Box<AstExpression>,
    },
    /// `value as type`
    As {
        obj: Box<AstExpression>,
        target: AstType,
    },
    AddressOf(Box<AstExpression>),
    Dereference(Box<AstExpression>),
    Not(Box<AstExpression>),
    And(Box<AstExpression>, Box<AstExpression>),
    Or(Box<AstExpression>, Box<AstExpression>),
    Binary {
        op: BinaryOp,
        lhs: Box<AstExpression>,
        rhs: Box<AstExpression>,
    },
    PreIncrement(Box<AstExpression>),
    PreDecrement(Box<AstExpression>),
    PostIncrement(Box<AstExpression>),
    PostDecrement(Box<AstExpression>),
}

/// A statement node.
#[derive(Clone, Debug, PartialEq)]
pub struct AstStatement {
    pub location: Location,
    pub kind: AstStatementKind,
}

/// One `if` or `elif` branch: a condition and the statements under it.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionalBranch {
    pub condition: AstExpression,
    pub body: Vec<AstStatement>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AstStatementKind {
    ExpressionStatement(AstExpression),
    ReturnValue(AstExpression),
    ReturnWithoutValue,
    DeclareLocalVar {
        name: String,
        ty: AstType,
        initial_value: Option<AstExpression>,
    },
    Assign {
        target: AstExpression,
        value: AstExpression,
    },
    If {
        if_and_elifs: Vec<ConditionalBranch>,
        else_body: Vec<AstStatement>,
    },
    While {
        condition: AstExpression,
        body: Vec<AstStatement>,
    },
    For {
        init: Box<AstStatement>,
        condition: AstExpression,
        increment: Box<AstStatement>,
        body: Vec<AstStatement>,
    },
    Break,
    Continue,
}

/// A function's name and type, as spelled in the source.
#[derive(Clone, Debug, PartialEq)]
pub struct AstSignature {
    pub name: String,
    /// Location of the function name token.
    pub location: Location,
    pub args: Vec<(String, AstType)>,
    pub takes_varargs: bool,
    /// The declared return type; its name is `void` for functions that
    /// return nothing.
    pub return_type: AstType,
}

/// A top-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct AstToplevel {
    pub location: Location,
    pub kind: AstToplevelKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AstToplevelKind {
    /// `declare name(...) -> type` — a signature with no body, for
    /// functions provided by the runtime or a linked library.
    DeclareFunction(AstSignature),
    DefineFunction {
        signature: AstSignature,
        body: Vec<AstStatement>,
    },
    DefineStruct {
        name: String,
        fields: Vec<(String, AstType)>,
    },
}
