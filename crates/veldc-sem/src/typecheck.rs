//! The type checker.
//!
//! Walks the top-level declarations in source order. Function
//! signatures and struct layouts are registered as they are seen, and
//! each function body is checked right after its signature, so a
//! function can call itself but cannot see anything defined later in
//! the file.
//!
//! Every expression the checker visits gets exactly one
//! [`ExpressionTypes`] record: the type the expression naturally has,
//! plus the type it must be converted to when an implicit cast applies.
//! A backend is expected to materialize the value as `natural_type` and
//! then convert it to `type_after_cast` whenever the latter is present.

use indexmap::IndexMap;

use veldc_par::ast::{
    AstExpression, AstExpressionKind, AstSignature, AstStatement, AstStatementKind, AstToplevel,
    AstToplevelKind, AstType, BinaryOp, ExprId,
};
use veldc_util::{fail, render_cast_template, CompileResult, Location};

use crate::types::{TypeId, TypeInterner, TypeKind};

/// An interned function signature.
#[derive(Clone, Debug)]
pub struct Signature {
    pub name: String,
    pub arg_names: Vec<String>,
    pub arg_types: Vec<TypeId>,
    pub takes_varargs: bool,
    /// `None` for functions declared `-> void`.
    pub return_type: Option<TypeId>,
    /// Location of the return type in the source, for errors reported
    /// against the signature.
    pub return_type_location: Location,
}

impl Signature {
    /// Renders the signature for error messages, e.g.
    /// `f(x: int, y: byte*)` or `printf(fmt: byte*, ...) -> int`.
    pub fn describe(&self, interner: &TypeInterner, include_return_type: bool) -> String {
        let mut parts: Vec<String> = self
            .arg_names
            .iter()
            .zip(&self.arg_types)
            .map(|(name, ty)| format!("{}: {}", name, interner.name(*ty)))
            .collect();
        if self.takes_varargs {
            parts.push("...".to_string());
        }
        let mut out = format!("{}({})", self.name, parts.join(", "));
        if include_return_type {
            out.push_str(" -> ");
            match self.return_type {
                Some(ty) => out.push_str(interner.name(ty)),
                None => out.push_str("void"),
            }
        }
        out
    }
}

/// A local variable of the function being checked, including its
/// parameters and the synthetic `return` slot.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVariable {
    pub id: usize,
    pub name: String,
    pub ty: TypeId,
    pub is_argument: bool,
}

/// The typing result for one expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpressionTypes {
    /// The type the expression has on its own.
    pub natural_type: TypeId,
    /// Set when the surrounding context needs the value as a different
    /// type and an implicit conversion applies.
    pub type_after_cast: Option<TypeId>,
}

/// Everything the front end hands to a backend.
#[derive(Debug)]
pub struct TypedProgram {
    pub interner: TypeInterner,
    /// All function signatures, in source order.
    pub signatures: Vec<Signature>,
    /// All struct types, in source order.
    pub structs: Vec<TypeId>,
    /// Typing of every expression, keyed by the parser-assigned id.
    pub expr_types: IndexMap<ExprId, ExpressionTypes>,
    /// For each *defined* function, in source order: its name and its
    /// ordered local variables (arguments first, then the `return`
    /// slot for non-void functions, then body variables).
    pub function_locals: Vec<(String, Vec<LocalVariable>)>,
}

/// Type-checks a whole program.
pub fn typecheck_program(toplevels: &[AstToplevel]) -> CompileResult<TypedProgram> {
    let mut ctx = TypeContext::new();
    for toplevel in toplevels {
        match &toplevel.kind {
            AstToplevelKind::DeclareFunction(signature) => {
                ctx.typecheck_function(signature, None)?;
            }
            AstToplevelKind::DefineFunction { signature, body } => {
                ctx.typecheck_function(signature, Some(body))?;
            }
            AstToplevelKind::DefineStruct { name, fields } => {
                ctx.typecheck_struct(name, fields, &toplevel.location)?;
            }
        }
    }
    Ok(TypedProgram {
        interner: ctx.interner,
        signatures: ctx.function_signatures,
        structs: ctx.structs,
        expr_types: ctx.expr_types,
        function_locals: ctx.function_locals,
    })
}

/// The function whose body is being checked.
#[derive(Clone)]
struct CurrentFunction {
    name: String,
    return_type: Option<TypeId>,
}

struct TypeContext {
    interner: TypeInterner,
    function_signatures: Vec<Signature>,
    structs: Vec<TypeId>,
    expr_types: IndexMap<ExprId, ExpressionTypes>,
    /// Locals of the function currently being checked.
    variables: Vec<LocalVariable>,
    function_locals: Vec<(String, Vec<LocalVariable>)>,
}

fn nth(n: usize) -> String {
    const FIRST_FEW: [&str; 6] = ["first", "second", "third", "fourth", "fifth", "sixth"];
    match n.checked_sub(1).and_then(|i| FIRST_FEW.get(i)) {
        Some(word) => (*word).to_string(),
        None => format!("{n}th"),
    }
}

/// Describes an expression for errors like `cannot assign to a
/// constant`. The wording reads naturally after a `cannot ...` prefix.
fn short_expression_description(expr: &AstExpression) -> String {
    match &expr.kind {
        AstExpressionKind::Constant(_) => "a constant".to_string(),
        AstExpressionKind::FunctionCall { .. } => "a function call".to_string(),
        AstExpressionKind::BraceInit { .. } => "a newly created instance".to_string(),
        AstExpressionKind::Indexing { .. } => "an indexed value".to_string(),
        AstExpressionKind::As { .. } => "the result of a cast".to_string(),
        AstExpressionKind::GetVariable(_) => "a variable".to_string(),
        AstExpressionKind::Dereference(_) => "the value of a pointer".to_string(),
        AstExpressionKind::And(..) => "the result of 'and'".to_string(),
        AstExpressionKind::Or(..) => "the result of 'or'".to_string(),
        AstExpressionKind::Not(..) => "the result of 'not'".to_string(),
        AstExpressionKind::Binary { op, .. } => {
            let what = if op.is_comparison() {
                "the result of a comparison"
            } else {
                "the result of a calculation"
            };
            what.to_string()
        }
        AstExpressionKind::PreIncrement(_) | AstExpressionKind::PostIncrement(_) => {
            "the result of incrementing a value".to_string()
        }
        AstExpressionKind::PreDecrement(_) | AstExpressionKind::PostDecrement(_) => {
            "the result of decrementing a value".to_string()
        }
        AstExpressionKind::AddressOf(operand) => {
            format!("address of {}", short_expression_description(operand))
        }
        AstExpressionKind::GetField { field_name, .. }
        | AstExpressionKind::DerefAndGetField { field_name, .. } => {
            format!("field '{field_name}'")
        }
    }
}

/// The `&` operator can't go in front of most expressions: `&(1 + 2)`
/// has no address. The same rule decides what can be assigned to and
/// what can be incremented, each with its own error prefix.
///
/// `&foo.bar` is fine exactly when `&foo` is: it is `&foo` plus an
/// offset. `&foo->bar` is always fine, because it reads the pointer
/// `foo` rather than taking an address.
fn ensure_can_take_address(expr: &AstExpression, error_prefix: &str) -> CompileResult<()> {
    match &expr.kind {
        AstExpressionKind::GetVariable(_)
        | AstExpressionKind::Dereference(_)
        | AstExpressionKind::Indexing { .. }
        | AstExpressionKind::DerefAndGetField { .. } => Ok(()),
        AstExpressionKind::GetField { obj, .. } => ensure_can_take_address(obj, error_prefix),
        _ => fail!(
            expr.location.clone(),
            "{} {}",
            error_prefix,
            short_expression_description(expr)
        ),
    }
}

impl TypeContext {
    fn new() -> Self {
        Self {
            interner: TypeInterner::new(),
            function_signatures: Vec::new(),
            structs: Vec::new(),
            expr_types: IndexMap::new(),
            variables: Vec::new(),
            function_locals: Vec::new(),
        }
    }

    fn find_variable(&self, name: &str) -> Option<&LocalVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    fn add_variable(
        &mut self,
        ty: TypeId,
        name: &str,
        is_argument: bool,
        location: &Location,
    ) -> CompileResult<()> {
        if self.find_variable(name).is_some() {
            fail!(location.clone(), "a variable named '{}' already exists", name);
        }
        self.variables.push(LocalVariable {
            id: self.variables.len(),
            name: name.to_string(),
            ty,
            is_argument,
        });
        Ok(())
    }

    fn find_function(&self, name: &str) -> Option<&Signature> {
        self.function_signatures.iter().find(|s| s.name == name)
    }

    /// Resolves a spelled-out type; `Ok(None)` means plain `void`.
    fn type_or_void_from_ast(&mut self, ast_type: &AstType) -> CompileResult<Option<TypeId>> {
        let mut npointers = ast_type.pointer_depth;
        let mut ty = match ast_type.name.as_str() {
            "int" => self.interner.int_type(),
            "byte" => self.interner.byte_type(),
            "bool" => self.interner.bool_type(),
            "void" => {
                if npointers == 0 {
                    return Ok(None);
                }
                npointers -= 1;
                self.interner.void_pointer_type()
            }
            name => {
                let found = self
                    .structs
                    .iter()
                    .copied()
                    .find(|&s| self.interner.name(s) == name);
                match found {
                    Some(s) => s,
                    None => fail!(
                        ast_type.location.clone(),
                        "there is no type named '{}'",
                        name
                    ),
                }
            }
        };
        for _ in 0..npointers {
            ty = self.interner.pointer_to(ty);
        }
        Ok(Some(ty))
    }

    fn type_from_ast(&mut self, ast_type: &AstType) -> CompileResult<TypeId> {
        match self.type_or_void_from_ast(ast_type)? {
            Some(ty) => Ok(ty),
            None => fail!(
                ast_type.location.clone(),
                "'void' cannot be used here because it is not a type"
            ),
        }
    }

    /// Records an implicit conversion of `expr` from `from` to `to`.
    ///
    /// With a template, the conversion must be allowed by the implicit
    /// conversion rules; `FROM` and `TO` in the template are replaced
    /// with the two type names on failure. Without a template the cast
    /// is forced: the binary-operator promotion uses this after it has
    /// already ruled out incompatible operands.
    fn do_implicit_cast(
        &mut self,
        expr: &AstExpression,
        from: TypeId,
        to: TypeId,
        template: Option<&str>,
    ) -> CompileResult<()> {
        if from == to {
            return Ok(());
        }
        if let Some(template) = template {
            if !self.interner.can_implicitly_convert(from, to) {
                let message = render_cast_template(
                    template,
                    self.interner.name(from),
                    self.interner.name(to),
                );
                fail!(expr.location.clone(), "{}", message);
            }
        }
        if let Some(entry) = self.expr_types.get_mut(&expr.id) {
            debug_assert!(entry.type_after_cast.is_none());
            entry.type_after_cast = Some(to);
        }
        Ok(())
    }

    fn typecheck_expression_not_void(&mut self, expr: &AstExpression) -> CompileResult<TypeId> {
        match self.typecheck_expression(expr)? {
            Some(ty) => Ok(ty),
            None => match &expr.kind {
                AstExpressionKind::FunctionCall { name, .. } => fail!(
                    expr.location.clone(),
                    "function '{}' does not return a value",
                    name
                ),
                _ => fail!(expr.location.clone(), "this expression does not have a value"),
            },
        }
    }

    fn typecheck_expression_with_implicit_cast(
        &mut self,
        expr: &AstExpression,
        cast_type: TypeId,
        template: &str,
    ) -> CompileResult<()> {
        let from = self.typecheck_expression_not_void(expr)?;
        self.do_implicit_cast(expr, from, cast_type, Some(template))
    }

    fn check_binop(
        &mut self,
        op: BinaryOp,
        location: &Location,
        lhs: &AstExpression,
        lhs_type: TypeId,
        rhs: &AstExpression,
        rhs_type: TypeId,
    ) -> CompileResult<TypeId> {
        let do_what = match op {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "subtract",
            BinaryOp::Mul => "multiply",
            BinaryOp::Div => "divide",
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt
            | BinaryOp::Le => "compare",
        };

        let lhs_int = self.interner.integer_parts(lhs_type);
        let rhs_int = self.interner.integer_parts(rhs_type);
        let got_integers = lhs_int.is_some() && rhs_int.is_some();

        // Comparing int* with byte* is banned, unless one side is void*.
        let got_pointers = self.interner.is_pointer_type(lhs_type)
            && self.interner.is_pointer_type(rhs_type)
            && (lhs_type == rhs_type
                || lhs_type == self.interner.void_pointer_type()
                || rhs_type == self.interner.void_pointer_type());

        if !got_integers && !(got_pointers && matches!(op, BinaryOp::Eq | BinaryOp::Ne)) {
            fail!(
                location.clone(),
                "cannot {} {} and {}",
                do_what,
                self.interner.name(lhs_type),
                self.interner.name(rhs_type)
            );
        }

        let cast_type = match (lhs_int, rhs_int) {
            // Promote to the wider width. The result is signed when
            // either operand is signed; an unsigned operand always
            // fits, because the promoted width is at least as wide.
            (Some((lhs_width, lhs_signed)), Some((rhs_width, rhs_signed))) => self
                .interner
                .integer_type(lhs_width.max(rhs_width), lhs_signed || rhs_signed),
            _ => self.interner.void_pointer_type(),
        };
        self.do_implicit_cast(lhs, lhs_type, cast_type, None)?;
        self.do_implicit_cast(rhs, rhs_type, cast_type, None)?;

        if op.is_comparison() {
            Ok(self.interner.bool_type())
        } else {
            Ok(cast_type)
        }
    }

    fn check_increment_or_decrement(
        &mut self,
        expr: &AstExpression,
        operand: &AstExpression,
        increment: bool,
    ) -> CompileResult<TypeId> {
        let verb = if increment { "increment" } else { "decrement" };
        ensure_can_take_address(operand, &format!("cannot {verb}"))?;
        let ty = self.typecheck_expression_not_void(operand)?;
        if !self.interner.is_integer_type(ty) && !self.interner.is_pointer_type(ty) {
            fail!(
                expr.location.clone(),
                "cannot {} a value of type {}",
                verb,
                self.interner.name(ty)
            );
        }
        Ok(ty)
    }

    /// `ptr[index]`
    fn typecheck_indexing(
        &mut self,
        ptr: &AstExpression,
        index: &AstExpression,
    ) -> CompileResult<TypeId> {
        let ptr_type = self.typecheck_expression_not_void(ptr)?;
        let pointee = match self.interner.kind(ptr_type) {
            TypeKind::Pointer { pointee } => *pointee,
            _ => fail!(
                ptr.location.clone(),
                "value of type {} cannot be indexed",
                self.interner.name(ptr_type)
            ),
        };

        let index_type = self.typecheck_expression_not_void(index)?;
        if !self.interner.is_integer_type(index_type) {
            fail!(
                index.location.clone(),
                "the index inside [...] must be an integer, not {}",
                self.interner.name(index_type)
            );
        }

        Ok(pointee)
    }

    fn typecheck_and_or(
        &mut self,
        lhs: &AstExpression,
        rhs: &AstExpression,
        and_or: &str,
    ) -> CompileResult<()> {
        let template = format!("'{and_or}' only works with booleans, not FROM");
        let bool_type = self.interner.bool_type();
        self.typecheck_expression_with_implicit_cast(lhs, bool_type, &template)?;
        self.typecheck_expression_with_implicit_cast(rhs, bool_type, &template)
    }

    /// Returns `None` when the called function does not return a value.
    fn typecheck_function_call(
        &mut self,
        name: &str,
        args: &[AstExpression],
        location: &Location,
    ) -> CompileResult<Option<TypeId>> {
        let sig = match self.find_function(name) {
            Some(sig) => sig.clone(),
            None => fail!(location.clone(), "function \"{}\" not found", name),
        };
        let sigstr = sig.describe(&self.interner, false);

        let nargs = sig.arg_types.len();
        if args.len() < nargs || (args.len() > nargs && !sig.takes_varargs) {
            fail!(
                location.clone(),
                "function {} takes {} argument{}, but it was called with {} argument{}",
                sigstr,
                nargs,
                if nargs == 1 { "" } else { "s" },
                args.len(),
                if args.len() == 1 { "" } else { "s" }
            );
        }

        for (i, arg) in args.iter().take(nargs).enumerate() {
            // A common mistake, so the message names the argument and
            // shows the whole signature.
            let template = format!(
                "{} argument of function {} should have type TO, not FROM",
                nth(i + 1),
                sigstr
            );
            self.typecheck_expression_with_implicit_cast(arg, sig.arg_types[i], &template)?;
        }
        for arg in &args[nargs..] {
            // Varargs, e.g. the values formatted by printf(). Any type
            // goes, but the argument must have a value.
            self.typecheck_expression_not_void(arg)?;
        }

        Ok(sig.return_type)
    }

    fn typecheck_struct_field(
        &self,
        struct_type: TypeId,
        field_name: &str,
        location: &Location,
    ) -> CompileResult<TypeId> {
        if let Some(fields) = self.interner.struct_fields(struct_type) {
            for (name, ty) in fields {
                if name == field_name {
                    return Ok(*ty);
                }
            }
        }
        fail!(
            location.clone(),
            "struct {} has no field named '{}'",
            self.interner.name(struct_type),
            field_name
        );
    }

    fn typecheck_struct_init(
        &mut self,
        struct_name: &str,
        fields: &[(String, AstExpression)],
        location: &Location,
    ) -> CompileResult<TypeId> {
        let spelled = AstType {
            name: struct_name.to_string(),
            pointer_depth: 0,
            location: location.clone(),
        };
        let ty = self.type_from_ast(&spelled)?;
        if self.interner.struct_fields(ty).is_none() {
            fail!(
                location.clone(),
                "type {} cannot be instantiated with the Foo{{...}} syntax",
                self.interner.name(ty)
            );
        }

        // Fields may be omitted; a backend zero-initializes the rest.
        for (field_name, value) in fields {
            let field_type = self.typecheck_struct_field(ty, field_name, &value.location)?;
            let template = format!(
                "value for field '{field_name}' of struct {struct_name} must be of type TO, not FROM"
            );
            self.typecheck_expression_with_implicit_cast(value, field_type, &template)?;
        }

        Ok(ty)
    }

    /// Types one expression and records its [`ExpressionTypes`] entry.
    /// Returns `None` for a call to a function that returns nothing;
    /// such a call gets no entry.
    fn typecheck_expression(&mut self, expr: &AstExpression) -> CompileResult<Option<TypeId>> {
        let result = match &expr.kind {
            AstExpressionKind::FunctionCall { name, args } => {
                match self.typecheck_function_call(name, args, &expr.location)? {
                    Some(ty) => ty,
                    None => return Ok(None),
                }
            }
            AstExpressionKind::BraceInit {
                struct_name,
                fields,
            } => self.typecheck_struct_init(struct_name, fields, &expr.location)?,
            AstExpressionKind::GetField { obj, field_name } => {
                let obj_type = self.typecheck_expression_not_void(obj)?;
                if self.interner.struct_fields(obj_type).is_none() {
                    fail!(
                        expr.location.clone(),
                        "left side of the '.' operator must be a struct, not {}",
                        self.interner.name(obj_type)
                    );
                }
                self.typecheck_struct_field(obj_type, field_name, &expr.location)?
            }
            AstExpressionKind::DerefAndGetField { obj, field_name } => {
                let obj_type = self.typecheck_expression_not_void(obj)?;
                let pointee = match self.interner.kind(obj_type) {
                    TypeKind::Pointer { pointee }
                        if self.interner.struct_fields(*pointee).is_some() =>
                    {
                        *pointee
                    }
                    _ => fail!(
                        expr.location.clone(),
                        "left side of the '->' operator must be a pointer to a struct, not {}",
                        self.interner.name(obj_type)
                    ),
                };
                self.typecheck_struct_field(pointee, field_name, &expr.location)?
            }
            AstExpressionKind::Indexing { ptr, index } => self.typecheck_indexing(ptr, index)?,
            AstExpressionKind::AddressOf(operand) => {
                ensure_can_take_address(operand, "the '&' operator cannot be used with")?;
                let ty = self.typecheck_expression_not_void(operand)?;
                self.interner.pointer_to(ty)
            }
            AstExpressionKind::GetVariable(name) => match self.find_variable(name) {
                Some(var) => var.ty,
                None => fail!(
                    expr.location.clone(),
                    "no local variable named '{}'",
                    name
                ),
            },
            AstExpressionKind::Dereference(operand) => {
                let ty = self.typecheck_expression_not_void(operand)?;
                match self.interner.kind(ty) {
                    TypeKind::Pointer { pointee } => *pointee,
                    _ => fail!(
                        expr.location.clone(),
                        "the dereference operator '*' is only for pointers, not for {}",
                        self.interner.name(ty)
                    ),
                }
            }
            AstExpressionKind::Constant(constant) => self.interner.type_of_constant(constant),
            AstExpressionKind::And(lhs, rhs) => {
                self.typecheck_and_or(lhs, rhs, "and")?;
                self.interner.bool_type()
            }
            AstExpressionKind::Or(lhs, rhs) => {
                self.typecheck_and_or(lhs, rhs, "or")?;
                self.interner.bool_type()
            }
            AstExpressionKind::Not(operand) => {
                let bool_type = self.interner.bool_type();
                self.typecheck_expression_with_implicit_cast(
                    operand,
                    bool_type,
                    "value after 'not' must be a boolean, not FROM",
                )?;
                bool_type
            }
            AstExpressionKind::Binary { op, lhs, rhs } => {
                let lhs_type = self.typecheck_expression_not_void(lhs)?;
                let rhs_type = self.typecheck_expression_not_void(rhs)?;
                self.check_binop(*op, &expr.location, lhs, lhs_type, rhs, rhs_type)?
            }
            AstExpressionKind::PreIncrement(operand)
            | AstExpressionKind::PostIncrement(operand) => {
                self.check_increment_or_decrement(expr, operand, true)?
            }
            AstExpressionKind::PreDecrement(operand)
            | AstExpressionKind::PostDecrement(operand) => {
                self.check_increment_or_decrement(expr, operand, false)?
            }
            AstExpressionKind::As { obj, target } => {
                let from = self.typecheck_expression_not_void(obj)?;
                let to = self.type_from_ast(target)?;
                if !self.interner.can_explicitly_cast(from, to) {
                    fail!(
                        expr.location.clone(),
                        "cannot cast from type {} to {}",
                        self.interner.name(from),
                        self.interner.name(to)
                    );
                }
                to
            }
        };

        self.expr_types.insert(
            expr.id,
            ExpressionTypes {
                natural_type: result,
                type_after_cast: None,
            },
        );
        Ok(Some(result))
    }

    fn typecheck_body(
        &mut self,
        body: &[AstStatement],
        current: &CurrentFunction,
    ) -> CompileResult<()> {
        for statement in body {
            self.typecheck_statement(statement, current)?;
        }
        Ok(())
    }

    fn typecheck_statement(
        &mut self,
        stmt: &AstStatement,
        current: &CurrentFunction,
    ) -> CompileResult<()> {
        match &stmt.kind {
            AstStatementKind::If {
                if_and_elifs,
                else_body,
            } => {
                for (i, branch) in if_and_elifs.iter().enumerate() {
                    let template = if i == 0 {
                        "'if' condition must be a boolean, not FROM"
                    } else {
                        "'elif' condition must be a boolean, not FROM"
                    };
                    let bool_type = self.interner.bool_type();
                    self.typecheck_expression_with_implicit_cast(
                        &branch.condition,
                        bool_type,
                        template,
                    )?;
                    self.typecheck_body(&branch.body, current)?;
                }
                self.typecheck_body(else_body, current)?;
            }

            AstStatementKind::While { condition, body } => {
                let bool_type = self.interner.bool_type();
                self.typecheck_expression_with_implicit_cast(
                    condition,
                    bool_type,
                    "'while' condition must be a boolean, not FROM",
                )?;
                self.typecheck_body(body, current)?;
            }

            AstStatementKind::For {
                init,
                condition,
                increment,
                body,
            } => {
                // The init statement may declare a variable that the
                // condition and increment use, so it goes first.
                self.typecheck_statement(init, current)?;
                let bool_type = self.interner.bool_type();
                self.typecheck_expression_with_implicit_cast(
                    condition,
                    bool_type,
                    "'for' condition must be a boolean, not FROM",
                )?;
                self.typecheck_body(body, current)?;
                self.typecheck_statement(increment, current)?;
            }

            // Loop enclosure is not verified here; see DESIGN.md.
            AstStatementKind::Break | AstStatementKind::Continue => {}

            AstStatementKind::Assign { target, value } => {
                if let AstExpressionKind::GetVariable(name) = &target.kind {
                    if self.find_variable(name).is_none() {
                        // First assignment to a new name declares a
                        // variable of the value's type.
                        let value_type = self.typecheck_expression_not_void(value)?;
                        let name = name.clone();
                        self.add_variable(value_type, &name, false, &target.location)?;
                        return Ok(());
                    }
                }

                // Assigning to an existing target works like taking its
                // address and storing through the pointer, so the
                // target must be addressable.
                ensure_can_take_address(target, "cannot assign to")?;

                let template = if matches!(target.kind, AstExpressionKind::Dereference(_)) {
                    "cannot place a value of type FROM into a pointer of type TO*".to_string()
                } else {
                    format!(
                        "cannot assign a value of type FROM to {} of type TO",
                        short_expression_description(target)
                    )
                };
                let target_type = self.typecheck_expression_not_void(target)?;
                self.typecheck_expression_with_implicit_cast(value, target_type, &template)?;
            }

            AstStatementKind::ReturnValue(value) => {
                let Some(return_type) = current.return_type else {
                    fail!(
                        stmt.location.clone(),
                        "function '{}' cannot return a value because it was defined with '-> void'",
                        current.name
                    );
                };
                let template = format!(
                    "attempting to return a value of type FROM from function '{}' defined with '-> TO'",
                    current.name
                );
                self.typecheck_expression_with_implicit_cast(value, return_type, &template)?;
            }

            AstStatementKind::ReturnWithoutValue => {
                if let Some(return_type) = current.return_type {
                    fail!(
                        stmt.location.clone(),
                        "a return value is needed, because the return type of function '{}' is {}",
                        current.name,
                        self.interner.name(return_type)
                    );
                }
            }

            AstStatementKind::DeclareLocalVar {
                name,
                ty,
                initial_value,
            } => {
                if self.find_variable(name).is_some() {
                    fail!(
                        stmt.location.clone(),
                        "a variable named '{}' already exists",
                        name
                    );
                }
                let var_type = self.type_from_ast(ty)?;
                if let Some(value) = initial_value {
                    self.typecheck_expression_with_implicit_cast(
                        value,
                        var_type,
                        "initial value for variable of type TO cannot be of type FROM",
                    )?;
                }
                self.add_variable(var_type, name, false, &stmt.location)?;
            }

            AstStatementKind::ExpressionStatement(expr) => {
                self.typecheck_expression(expr)?;
            }
        }
        Ok(())
    }

    fn typecheck_function(
        &mut self,
        astsig: &AstSignature,
        body: Option<&[AstStatement]>,
    ) -> CompileResult<()> {
        if self.find_function(&astsig.name).is_some() {
            fail!(
                astsig.location.clone(),
                "a function named '{}' already exists",
                astsig.name
            );
        }

        let mut arg_types = Vec::with_capacity(astsig.args.len());
        for (_, ast_type) in &astsig.args {
            arg_types.push(self.type_from_ast(ast_type)?);
        }
        let return_type = self.type_or_void_from_ast(&astsig.return_type)?;

        // TODO: validate main() parameters, e.g. require (argc: int, argv: byte**)
        if astsig.name == "main" && return_type != Some(self.interner.int_type()) {
            fail!(
                astsig.return_type.location.clone(),
                "the main() function must return int"
            );
        }

        let signature = Signature {
            name: astsig.name.clone(),
            arg_names: astsig.args.iter().map(|(name, _)| name.clone()).collect(),
            arg_types: arg_types.clone(),
            takes_varargs: astsig.takes_varargs,
            return_type,
            return_type_location: astsig.return_type.location.clone(),
        };

        debug_assert!(self.variables.is_empty());

        // Register the signature before checking the body, so the
        // function can call itself.
        self.function_signatures.push(signature);

        if let Some(body) = body {
            let current = CurrentFunction {
                name: astsig.name.clone(),
                return_type,
            };
            for ((arg_name, ast_type), ty) in astsig.args.iter().zip(&arg_types) {
                self.add_variable(*ty, arg_name, true, &ast_type.location)?;
            }
            if let Some(return_type) = return_type {
                // Return-value typing reuses the variable machinery
                // through this synthetic slot.
                self.add_variable(return_type, "return", false, &astsig.location)?;
            }
            self.typecheck_body(body, &current)?;

            let locals = std::mem::take(&mut self.variables);
            self.function_locals.push((astsig.name.clone(), locals));
        }

        Ok(())
    }

    fn typecheck_struct(
        &mut self,
        name: &str,
        fields: &[(String, AstType)],
        location: &Location,
    ) -> CompileResult<()> {
        for &existing in &self.structs {
            if self.interner.name(existing) == name {
                fail!(location.clone(), "a struct named '{}' already exists", name);
            }
        }

        let mut resolved: Vec<(String, TypeId)> = Vec::with_capacity(fields.len());
        for (field_name, ast_type) in fields {
            if resolved.iter().any(|(existing, _)| existing == field_name) {
                fail!(
                    ast_type.location.clone(),
                    "a field named '{}' already exists",
                    field_name
                );
            }
            let ty = self.type_from_ast(ast_type)?;
            resolved.push((field_name.clone(), ty));
        }

        let id = self.interner.create_struct(name, resolved);
        self.structs.push(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veldc_lex::tokenize;
    use veldc_par::parse;

    fn typecheck_src(src: &str) -> CompileResult<TypedProgram> {
        let tokens = tokenize("test.veld", src.as_bytes().to_vec())?;
        let ast = parse(&tokens)?;
        typecheck_program(&ast)
    }

    fn error_of(src: &str) -> veldc_util::CompileError {
        typecheck_src(src).unwrap_err()
    }

    /// Finds the value expression of the last assignment in the first
    /// function's body, for inspecting its recorded types.
    fn last_assign_value_id(src: &str) -> (TypedProgram, ExprId) {
        let tokens = tokenize("test.veld", src.as_bytes().to_vec()).unwrap();
        let ast = parse(&tokens).unwrap();
        let program = typecheck_program(&ast).unwrap();
        let AstToplevelKind::DefineFunction { body, .. } = &ast[0].kind else {
            panic!("expected a function definition");
        };
        let value_id = body
            .iter()
            .rev()
            .find_map(|stmt| match &stmt.kind {
                AstStatementKind::Assign { value, .. } => Some(value.id),
                _ => None,
            })
            .expect("no assignment in function body");
        (program, value_id)
    }

    #[test]
    fn test_implicit_widening_records_a_cast() {
        let (program, value_id) = last_assign_value_id(concat!(
            "def f() -> void:\n",
            "    x: int\n",
            "    y: byte\n",
            "    x = y\n",
        ));
        let types = program.expr_types[&value_id];
        assert_eq!(program.interner.name(types.natural_type), "byte");
        let after = types.type_after_cast.unwrap();
        assert_eq!(program.interner.name(after), "int");
    }

    #[test]
    fn test_narrowing_assignment_fails() {
        let err = error_of(concat!(
            "def f() -> void:\n",
            "    x: int\n",
            "    y: byte\n",
            "    y = x\n",
        ));
        assert_eq!(
            err.message,
            "cannot assign a value of type int to a variable of type byte"
        );
        assert_eq!(err.location.lineno, 4);
    }

    #[test]
    fn test_comparing_unrelated_pointers_fails() {
        let err = error_of(concat!(
            "def f() -> void:\n",
            "    p: int*\n",
            "    q: byte*\n",
            "    b: bool = p == q\n",
        ));
        assert_eq!(err.message, "cannot compare int* and byte*");
    }

    #[test]
    fn test_pointer_null_comparison_casts_both_sides_to_void_pointer() {
        let src = concat!(
            "def f() -> void:\n",
            "    p: int*\n",
            "    b: bool\n",
            "    b = p == NULL\n",
        );
        let (program, value_id) = last_assign_value_id(src);
        // the comparison itself is a bool
        let cmp = program.expr_types[&value_id];
        assert_eq!(program.interner.name(cmp.natural_type), "bool");
        assert_eq!(cmp.type_after_cast, None);
        // and somewhere in the table, the int* operand was force-cast
        // to void*
        let p_cast = program.expr_types.values().any(|t| {
            program.interner.name(t.natural_type) == "int*"
                && t.type_after_cast
                    .is_some_and(|after| program.interner.name(after) == "void*")
        });
        assert!(p_cast);
    }

    #[test]
    fn test_address_of_calculation_fails() {
        let err = error_of("def f() -> void:\n    x = &(1+2)\n");
        assert_eq!(
            err.message,
            "the '&' operator cannot be used with the result of a calculation"
        );
    }

    #[test]
    fn test_address_of_variable_gives_pointer() {
        let (program, value_id) = last_assign_value_id(concat!(
            "def f() -> void:\n",
            "    x: int\n",
            "    p = &x\n",
            "    p = p\n",
        ));
        let types = program.expr_types[&value_id];
        assert_eq!(program.interner.name(types.natural_type), "int*");
    }

    #[test]
    fn test_struct_literal() {
        let src = concat!(
            "struct P:\n",
            "    x: int\n",
            "    y: int\n",
            "def f() -> void:\n",
            "    p: P = P{x = 1, y = 2}\n",
        );
        typecheck_src(src).unwrap();
    }

    #[test]
    fn test_struct_literal_unknown_field() {
        let err = error_of(concat!(
            "struct P:\n",
            "    x: int\n",
            "    y: int\n",
            "def f() -> void:\n",
            "    p: P = P{x = 1, z = 2}\n",
        ));
        assert_eq!(err.message, "struct P has no field named 'z'");
    }

    #[test]
    fn test_struct_literal_may_omit_fields() {
        let src = concat!(
            "struct P:\n",
            "    x: int\n",
            "    y: int\n",
            "def f() -> void:\n",
            "    p: P = P{x = 1}\n",
        );
        typecheck_src(src).unwrap();
    }

    #[test]
    fn test_struct_literal_field_type_mismatch() {
        let err = error_of(concat!(
            "struct P:\n",
            "    x: int\n",
            "def f() -> void:\n",
            "    p: P = P{x = True}\n",
        ));
        assert_eq!(
            err.message,
            "value for field 'x' of struct P must be of type int, not bool"
        );
    }

    #[test]
    fn test_main_must_return_int() {
        let err = error_of("def main() -> void:\n    return\n");
        assert_eq!(err.message, "the main() function must return int");

        typecheck_src("def main() -> int:\n    return 0\n").unwrap();
    }

    #[test]
    fn test_recursion_works() {
        typecheck_src(concat!(
            "def fact(n: int) -> int:\n",
            "    if n == 0:\n",
            "        return 1\n",
            "    return n * fact(n - 1)\n",
        ))
        .unwrap();
    }

    #[test]
    fn test_calling_a_function_defined_later_fails() {
        let err = error_of(concat!(
            "def f() -> void:\n",
            "    g()\n",
            "def g() -> void:\n",
            "    return\n",
        ));
        assert_eq!(err.message, "function \"g\" not found");
    }

    #[test]
    fn test_wrong_argument_count() {
        let err = error_of(concat!(
            "def f(x: int) -> void:\n",
            "    return\n",
            "def g() -> void:\n",
            "    f()\n",
        ));
        assert_eq!(
            err.message,
            "function f(x: int) takes 1 argument, but it was called with 0 arguments"
        );
    }

    #[test]
    fn test_wrong_argument_type_names_the_argument() {
        let err = error_of(concat!(
            "def f(x: int, y: bool) -> void:\n",
            "    return\n",
            "def g() -> void:\n",
            "    f(1, 2)\n",
        ));
        assert_eq!(
            err.message,
            "second argument of function f(x: int, y: bool) should have type bool, not int"
        );
    }

    #[test]
    fn test_varargs_allow_extra_arguments() {
        typecheck_src(concat!(
            "declare printf(fmt: byte*, ...) -> int\n",
            "def f() -> void:\n",
            "    printf(\"hi %d %s\", 7, \"x\")\n",
        ))
        .unwrap();
    }

    #[test]
    fn test_vararg_must_have_a_value() {
        let err = error_of(concat!(
            "declare printf(fmt: byte*, ...) -> int\n",
            "def g() -> void:\n",
            "    return\n",
            "def f() -> void:\n",
            "    printf(\"hi\", g())\n",
        ));
        assert_eq!(err.message, "function 'g' does not return a value");
    }

    #[test]
    fn test_void_call_has_no_value() {
        let err = error_of(concat!(
            "def g() -> void:\n",
            "    return\n",
            "def f() -> void:\n",
            "    x = g()\n",
        ));
        assert_eq!(err.message, "function 'g' does not return a value");
    }

    #[test]
    fn test_return_value_from_void_function() {
        let err = error_of("def f() -> void:\n    return 1\n");
        assert_eq!(
            err.message,
            "function 'f' cannot return a value because it was defined with '-> void'"
        );
    }

    #[test]
    fn test_return_without_value_from_int_function() {
        let err = error_of("def f() -> int:\n    return\n");
        assert_eq!(
            err.message,
            "a return value is needed, because the return type of function 'f' is int"
        );
    }

    #[test]
    fn test_return_type_mismatch() {
        let err = error_of("def f() -> byte:\n    return 300\n");
        assert_eq!(
            err.message,
            "attempting to return a value of type int from function 'f' defined with '-> byte'"
        );
    }

    #[test]
    fn test_conditions_must_be_boolean() {
        assert_eq!(
            error_of("def f() -> void:\n    if 1:\n        return\n").message,
            "'if' condition must be a boolean, not int"
        );
        assert_eq!(
            error_of("def f() -> void:\n    while \"x\":\n        return\n").message,
            "'while' condition must be a boolean, not byte*"
        );
        assert_eq!(
            error_of(concat!(
                "def f() -> void:\n",
                "    if True:\n",
                "        return\n",
                "    elif 2:\n",
                "        return\n",
            ))
            .message,
            "'elif' condition must be a boolean, not int"
        );
        assert_eq!(
            error_of("def f() -> void:\n    for x = 0; x; x++:\n        return\n").message,
            "'for' condition must be a boolean, not int"
        );
    }

    #[test]
    fn test_logical_operators_want_booleans() {
        assert_eq!(
            error_of("def f() -> void:\n    b = not 1\n").message,
            "value after 'not' must be a boolean, not int"
        );
        assert_eq!(
            error_of("def f() -> void:\n    b = True and 1\n").message,
            "'and' only works with booleans, not int"
        );
        assert_eq!(
            error_of("def f() -> void:\n    b = 0 or False\n").message,
            "'or' only works with booleans, not int"
        );
    }

    #[test]
    fn test_dereferencing_a_non_pointer() {
        assert_eq!(
            error_of("def f() -> void:\n    x: int\n    y = *x\n").message,
            "the dereference operator '*' is only for pointers, not for int"
        );
        // void* cannot be dereferenced either: the pointee type is unknown
        assert_eq!(
            error_of("def f() -> void:\n    p: void*\n    y = *p\n").message,
            "the dereference operator '*' is only for pointers, not for void*"
        );
    }

    #[test]
    fn test_indexing_rules() {
        assert_eq!(
            error_of("def f() -> void:\n    x: int\n    y = x[0]\n").message,
            "value of type int cannot be indexed"
        );
        assert_eq!(
            error_of("def f() -> void:\n    p: int*\n    y = p[True]\n").message,
            "the index inside [...] must be an integer, not bool"
        );
        typecheck_src("def f() -> void:\n    p: int*\n    y = p[3]\n").unwrap();
    }

    #[test]
    fn test_field_access_rules() {
        assert_eq!(
            error_of("def f() -> void:\n    x: int\n    y = x.foo\n").message,
            "left side of the '.' operator must be a struct, not int"
        );
        assert_eq!(
            error_of("def f() -> void:\n    x: int*\n    y = x->foo\n").message,
            "left side of the '->' operator must be a pointer to a struct, not int*"
        );
        let src = concat!(
            "struct P:\n",
            "    x: int\n",
            "def f(p: P*) -> int:\n",
            "    p->x = 5\n",
            "    q: P = *p\n",
            "    return q.x\n",
        );
        typecheck_src(src).unwrap();
    }

    #[test]
    fn test_increment_rules() {
        assert_eq!(
            error_of("def f() -> void:\n    b: bool\n    b++\n").message,
            "cannot increment a value of type bool"
        );
        assert_eq!(
            error_of("def f() -> void:\n    (1+2)++\n").message,
            "cannot increment the result of a calculation"
        );
        assert_eq!(
            error_of("def f() -> void:\n    --True\n").message,
            "cannot decrement a constant"
        );
        // integers and pointers are fine, and keep their type
        typecheck_src(concat!(
            "def f() -> void:\n",
            "    x: int\n",
            "    p: int*\n",
            "    x++\n",
            "    --x\n",
            "    p++\n",
        ))
        .unwrap();
    }

    #[test]
    fn test_explicit_casts() {
        typecheck_src("def f() -> void:\n    x: int\n    y: byte = x as byte\n").unwrap();
        typecheck_src("def f() -> void:\n    p: void*\n    q: int* = p as int*\n").unwrap();
        assert_eq!(
            error_of("def f() -> void:\n    x: int\n    b = x as bool\n").message,
            "cannot cast from type int to bool"
        );
        assert_eq!(
            error_of("def f() -> void:\n    x: int\n    p = x as int*\n").message,
            "cannot cast from type int to int*"
        );
    }

    #[test]
    fn test_assigning_to_non_addressable_targets() {
        assert_eq!(
            error_of("def f() -> void:\n    x: int\n    x + 1 = 2\n").message,
            "cannot assign to the result of a calculation"
        );
        assert_eq!(
            error_of("def g() -> int:\n    return 1\ndef f() -> void:\n    g() = 2\n").message,
            "cannot assign to a function call"
        );
    }

    #[test]
    fn test_assign_through_pointer() {
        typecheck_src("def f(p: int*) -> void:\n    *p = 7\n").unwrap();
        assert_eq!(
            error_of("def f(p: int*) -> void:\n    *p = \"hello\"\n").message,
            "cannot place a value of type byte* into a pointer of type int*"
        );
    }

    #[test]
    fn test_field_assignment_requires_addressable_object() {
        // g().x is g() plus an offset, so assigning to it would write
        // into a temporary; the error names the non-addressable object.
        let src = concat!(
            "struct P:\n",
            "    x: int\n",
            "def g() -> P:\n",
            "    return P{x = 1}\n",
            "def f() -> void:\n",
            "    g().x = 2\n",
        );
        assert_eq!(error_of(src).message, "cannot assign to a function call");
    }

    #[test]
    fn test_implicit_variable_declaration_via_assignment() {
        typecheck_src(concat!(
            "def f() -> void:\n",
            "    x = 1\n",
            "    y: int = x\n",
        ))
        .unwrap();
    }

    #[test]
    fn test_unknown_variable() {
        assert_eq!(
            error_of("def f() -> void:\n    y = x + 1\n").message,
            "no local variable named 'x'"
        );
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            error_of("def f(x: Foo) -> void:\n    return\n").message,
            "there is no type named 'Foo'"
        );
    }

    #[test]
    fn test_void_is_not_a_value_type() {
        assert_eq!(
            error_of("def f() -> void:\n    x: void\n").message,
            "'void' cannot be used here because it is not a type"
        );
        // but void* is fine
        typecheck_src("def f() -> void:\n    x: void*\n").unwrap();
    }

    #[test]
    fn test_redefinitions() {
        assert_eq!(
            error_of("def f() -> void:\n    return\ndef f() -> void:\n    return\n").message,
            "a function named 'f' already exists"
        );
        assert_eq!(
            error_of("struct S:\n    x: int\nstruct S:\n    y: int\n").message,
            "a struct named 'S' already exists"
        );
        assert_eq!(
            error_of("def f() -> void:\n    x: int\n    x: byte\n").message,
            "a variable named 'x' already exists"
        );
        assert_eq!(
            error_of("struct S:\n    x: int\n    x: byte\n").message,
            "a field named 'x' already exists"
        );
    }

    #[test]
    fn test_binop_promotion_widens_and_keeps_signedness_of_either_side() {
        let src = concat!(
            "def f() -> void:\n",
            "    b: byte\n",
            "    x: int\n",
            "    x = b + 1\n",
        );
        let (program, value_id) = last_assign_value_id(src);
        let sum = program.expr_types[&value_id];
        // byte + int promotes to int: wider width, signed because one
        // operand is signed
        assert_eq!(program.interner.name(sum.natural_type), "int");
        assert_eq!(sum.type_after_cast, None);
        // the byte operand carries the forced cast
        let byte_cast = program.expr_types.values().any(|t| {
            program.interner.name(t.natural_type) == "byte"
                && t.type_after_cast
                    .is_some_and(|after| program.interner.name(after) == "int")
        });
        assert!(byte_cast);
    }

    #[test]
    fn test_byte_plus_byte_stays_byte() {
        let src = concat!(
            "def f() -> void:\n",
            "    a: byte\n",
            "    b: byte\n",
            "    a = a + b\n",
        );
        let (program, value_id) = last_assign_value_id(src);
        let sum = program.expr_types[&value_id];
        assert_eq!(program.interner.name(sum.natural_type), "byte");
    }

    #[test]
    fn test_comparison_result_is_bool() {
        let src = concat!(
            "def f() -> void:\n",
            "    b: bool\n",
            "    b = 1 < 2\n",
        );
        let (program, value_id) = last_assign_value_id(src);
        let cmp = program.expr_types[&value_id];
        assert_eq!(program.interner.name(cmp.natural_type), "bool");
    }

    #[test]
    fn test_pointer_arithmetic_is_not_a_thing() {
        assert_eq!(
            error_of("def f(p: int*) -> void:\n    q = p + 1\n").message,
            "cannot add int* and int"
        );
    }

    #[test]
    fn test_ordering_comparison_of_pointers_fails() {
        assert_eq!(
            error_of("def f(p: int*, q: int*) -> void:\n    b = p < q\n").message,
            "cannot compare int* and int*"
        );
    }

    #[test]
    fn test_function_locals_output() {
        let src = concat!(
            "def f(a: int, p: byte*) -> int:\n",
            "    b: bool\n",
            "    return a\n",
        );
        let program = typecheck_src(src).unwrap();
        assert_eq!(program.function_locals.len(), 1);
        let (name, locals) = &program.function_locals[0];
        assert_eq!(name, "f");
        let summary: Vec<(usize, &str, &str, bool)> = locals
            .iter()
            .map(|v| {
                (
                    v.id,
                    v.name.as_str(),
                    program.interner.name(v.ty),
                    v.is_argument,
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, "a", "int", true),
                (1, "p", "byte*", true),
                (2, "return", "int", false),
                (3, "b", "bool", false),
            ]
        );
    }

    #[test]
    fn test_declared_function_has_no_locals_entry() {
        let program = typecheck_src("declare puts(s: byte*) -> int\n").unwrap();
        assert_eq!(program.signatures.len(), 1);
        assert!(program.function_locals.is_empty());
    }

    #[test]
    fn test_typechecking_twice_gives_the_same_table() {
        let src = concat!(
            "struct P:\n",
            "    x: int\n",
            "def f(p: P*) -> int:\n",
            "    n = p->x + 1\n",
            "    return n\n",
        );
        let first = typecheck_src(src).unwrap();
        let second = typecheck_src(src).unwrap();
        assert_eq!(first.expr_types, second.expr_types);
    }

    #[test]
    fn test_every_visited_expression_gets_a_record() {
        let src = concat!(
            "def f(a: int, b: int) -> int:\n",
            "    return a * b + a / b\n",
        );
        let program = typecheck_src(src).unwrap();
        // a, b, a*b, a, b, a/b, sum: seven expressions
        assert_eq!(program.expr_types.len(), 7);
    }

    #[test]
    fn test_duplicate_parameter_names() {
        assert_eq!(
            error_of("def f(x: int, x: byte) -> void:\n    return\n").message,
            "a variable named 'x' already exists"
        );
    }

    #[test]
    fn test_initializer_type_mismatch() {
        assert_eq!(
            error_of("def f() -> void:\n    x: byte = 1000000\n").message,
            "initial value for variable of type byte cannot be of type int"
        );
    }

    #[test]
    fn test_break_and_continue_are_not_type_checked() {
        // Not verified to be inside a loop; see DESIGN.md.
        typecheck_src("def f() -> void:\n    break\n    continue\n").unwrap();
    }
}
