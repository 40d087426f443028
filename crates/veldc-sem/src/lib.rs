//! veldc-sem - Type checking for the Veld language.
//!
//! Two pieces live here:
//!
//! - [`TypeInterner`]: the closed type lattice (bool, sized integers,
//!   pointers, `void*`, structs) with interned identity and the
//!   implicit/explicit convertibility rules.
//! - [`typecheck_program`]: the checker that walks the AST, resolves
//!   names, infers the type of every expression, enforces the language
//!   rules, and records the implicit casts a backend must honor.
//!
//! The output is a [`TypedProgram`]: interned signatures and structs,
//! the expression-type table, and the ordered locals of every defined
//! function.

mod typecheck;
mod types;

pub use typecheck::{
    typecheck_program, ExpressionTypes, LocalVariable, Signature, TypedProgram,
};
pub use types::{TypeId, TypeInterner, TypeKind};
