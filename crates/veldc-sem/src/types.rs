//! The Veld type system: an interner over a closed set of types.
//!
//! Every type lives in a session-owned [`TypeInterner`]; a [`TypeId`] is
//! its interned identity, so id equality is type equality. Primitives
//! are inserted when the interner is built. Pointer types are derived
//! lazily and cached per pointee, so asking twice for `int*` yields the
//! same id. Struct types are created once per definition.

use rustc_hash::FxHashMap;

use veldc_par::ast::Constant;

/// Interned identity of a type. Two equal ids are the same logical
/// type; the reverse holds for everything except structs, which are
/// nominal (two structs with identical fields are still distinct).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

/// The closed set of type shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Bool,
    SignedInteger { width_bits: u32 },
    UnsignedInteger { width_bits: u32 },
    Pointer { pointee: TypeId },
    VoidPointer,
    Struct { fields: Vec<(String, TypeId)> },
}

#[derive(Debug)]
struct TypeData {
    kind: TypeKind,
    /// The name shown in error messages: `bool`, `int`, `byte`,
    /// `<N-bit signed integer>`, `void*`, `T*`, or the struct's name.
    name: String,
}

const BOOL: TypeId = TypeId(0);
const VOID_POINTER: TypeId = TypeId(1);

const INTEGER_WIDTHS: [u32; 4] = [8, 16, 32, 64];

/// Owns every type of one compilation session.
#[derive(Debug)]
pub struct TypeInterner {
    types: Vec<TypeData>,
    /// pointee -> derived pointer type, so `pointer_to` is idempotent.
    pointer_types: FxHashMap<TypeId, TypeId>,
    integer_types: FxHashMap<(u32, bool), TypeId>,
}

impl TypeInterner {
    /// Builds an interner holding bool, `void*`, and the eight integer
    /// primitives.
    pub fn new() -> Self {
        let mut interner = Self {
            types: Vec::new(),
            pointer_types: FxHashMap::default(),
            integer_types: FxHashMap::default(),
        };

        let bool_id = interner.push(TypeKind::Bool, "bool".to_string());
        debug_assert_eq!(bool_id, BOOL);
        let void_ptr_id = interner.push(TypeKind::VoidPointer, "void*".to_string());
        debug_assert_eq!(void_ptr_id, VOID_POINTER);

        for width_bits in INTEGER_WIDTHS {
            for signed in [false, true] {
                let name = match (width_bits, signed) {
                    (8, false) => "byte".to_string(),
                    (32, true) => "int".to_string(),
                    (w, true) => format!("<{w}-bit signed integer>"),
                    (w, false) => format!("<{w}-bit unsigned integer>"),
                };
                let kind = if signed {
                    TypeKind::SignedInteger { width_bits }
                } else {
                    TypeKind::UnsignedInteger { width_bits }
                };
                let id = interner.push(kind, name);
                interner.integer_types.insert((width_bits, signed), id);
            }
        }

        interner
    }

    fn push(&mut self, kind: TypeKind, name: String) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeData { kind, name });
        id
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.0 as usize].kind
    }

    /// The name of the type as shown in error messages.
    pub fn name(&self, id: TypeId) -> &str {
        &self.types[id.0 as usize].name
    }

    pub fn bool_type(&self) -> TypeId {
        BOOL
    }

    pub fn void_pointer_type(&self) -> TypeId {
        VOID_POINTER
    }

    /// `int` is a 32-bit signed integer.
    pub fn int_type(&self) -> TypeId {
        self.integer_type(32, true)
    }

    /// `byte` is an 8-bit unsigned integer.
    pub fn byte_type(&self) -> TypeId {
        self.integer_type(8, false)
    }

    /// The integer primitive with the given width and signedness.
    ///
    /// # Panics
    ///
    /// Panics if `width_bits` is not 8, 16, 32, or 64.
    pub fn integer_type(&self, width_bits: u32, signed: bool) -> TypeId {
        self.integer_types[&(width_bits, signed)]
    }

    /// The unique pointer type whose pointee is `pointee`. Cached:
    /// asking again returns the same id.
    pub fn pointer_to(&mut self, pointee: TypeId) -> TypeId {
        if let Some(&existing) = self.pointer_types.get(&pointee) {
            return existing;
        }
        let name = format!("{}*", self.name(pointee));
        let id = self.push(TypeKind::Pointer { pointee }, name);
        self.pointer_types.insert(pointee, id);
        id
    }

    /// Creates a fresh struct type. Structs are nominal: every call
    /// creates a distinct type, even for an identical field list.
    pub fn create_struct(&mut self, name: &str, fields: Vec<(String, TypeId)>) -> TypeId {
        self.push(TypeKind::Struct { fields }, name.to_string())
    }

    /// The fields of a struct type, or `None` for any other type.
    pub fn struct_fields(&self, id: TypeId) -> Option<&[(String, TypeId)]> {
        match self.kind(id) {
            TypeKind::Struct { fields } => Some(fields),
            _ => None,
        }
    }

    /// The type a constant has before any casts.
    pub fn type_of_constant(&mut self, constant: &Constant) -> TypeId {
        match constant {
            Constant::Null => self.void_pointer_type(),
            Constant::Str(_) => {
                let byte = self.byte_type();
                self.pointer_to(byte)
            }
            Constant::Bool(_) => self.bool_type(),
            Constant::Integer {
                width_bits, signed, ..
            } => self.integer_type(*width_bits, *signed),
        }
    }

    pub fn is_integer_type(&self, id: TypeId) -> bool {
        matches!(
            self.kind(id),
            TypeKind::SignedInteger { .. } | TypeKind::UnsignedInteger { .. }
        )
    }

    pub fn is_pointer_type(&self, id: TypeId) -> bool {
        matches!(
            self.kind(id),
            TypeKind::Pointer { .. } | TypeKind::VoidPointer
        )
    }

    /// Width and signedness of an integer type, `None` otherwise.
    pub fn integer_parts(&self, id: TypeId) -> Option<(u32, bool)> {
        match self.kind(id) {
            TypeKind::SignedInteger { width_bits } => Some((*width_bits, true)),
            TypeKind::UnsignedInteger { width_bits } => Some((*width_bits, false)),
            _ => None,
        }
    }

    /// Whether a value of type `from` converts to `to` without being
    /// spelled out in the source.
    ///
    /// Integers convert only to strictly wider integers, and never from
    /// signed to unsigned. Unsigned converts to signed only when the
    /// target is strictly wider, because only then is every value
    /// representable: with 8 bits, 255 does not implicitly become -1.
    /// Any pointer converts to and from `void*`.
    pub fn can_implicitly_convert(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        if let (Some((from_width, from_signed)), Some((to_width, to_signed))) =
            (self.integer_parts(from), self.integer_parts(to))
        {
            return from_width < to_width && !(from_signed && !to_signed);
        }
        matches!(
            (self.kind(from), self.kind(to)),
            (TypeKind::Pointer { .. }, TypeKind::VoidPointer)
                | (TypeKind::VoidPointer, TypeKind::Pointer { .. })
        )
    }

    /// Whether `from as to` is allowed: same type, pointer to pointer,
    /// or integer to integer. Integer-pointer casts are not supported.
    pub fn can_explicitly_cast(&self, from: TypeId, to: TypeId) -> bool {
        from == to
            || (self.is_pointer_type(from) && self.is_pointer_type(to))
            || (self.is_integer_type(from) && self.is_integer_type(to))
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}
