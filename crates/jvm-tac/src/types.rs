//! JVM field/method descriptor types, coarsened to what the interpreter and
//! lifter actually need: computational type, operand width, and enough shape
//! to print something readable. Full descriptor *parsing* is the bytecode
//! reader's job (out of scope here); this module only models the
//! already-resolved shapes the reader hands us.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A resolved class/interface name, e.g. `java/lang/String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassName(pub String);

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for ClassName {
    fn from(s: S) -> Self {
        Self(s.into())
    }
}

/// The four numeric JVM computational categories plus references and return
/// addresses — the computational type a domain value carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum ComputationalType {
    Int,
    Long,
    Float,
    Double,
    Reference,
    ReturnAddress,
}

/// The JVM's two operand-width categories. Category-2 values (`long`,
/// `double`) occupy two consecutive local-variable slots and, per the
/// `dup2`-family instructions, interact with the operand stack two at a time
/// when paired with category-1 neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    One,
    Two,
}

impl ComputationalType {
    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::Long | Self::Double => Category::Two,
            Self::Int | Self::Float | Self::Reference | Self::ReturnAddress => Category::One,
        }
    }

    #[must_use]
    pub const fn operand_size(self) -> u8 {
        match self.category() {
            Category::One => 1,
            Category::Two => 2,
        }
    }
}

/// A JVM field type: either a primitive (narrower than `ComputationalType`,
/// which only distinguishes `int`-family from `long`/`float`/`double`), a
/// class/interface reference, or an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Reference(ClassName),
    Array {
        element: Box<FieldType>,
        /// Number of `[` prefixes; `element` is the innermost component type.
        dimensions: u8,
    },
}

impl FieldType {
    #[must_use]
    pub const fn computational_type(&self) -> ComputationalType {
        match self {
            Self::Long => ComputationalType::Long,
            Self::Double => ComputationalType::Double,
            Self::Float => ComputationalType::Float,
            Self::Reference(_) | Self::Array { .. } => ComputationalType::Reference,
            Self::Byte | Self::Char | Self::Short | Self::Int | Self::Boolean => ComputationalType::Int,
        }
    }

    #[must_use]
    pub fn operand_size(&self) -> u8 {
        self.computational_type().operand_size()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte => write!(f, "byte"),
            Self::Char => write!(f, "char"),
            Self::Short => write!(f, "short"),
            Self::Int => write!(f, "int"),
            Self::Long => write!(f, "long"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::Boolean => write!(f, "boolean"),
            Self::Reference(name) => write!(f, "{name}"),
            Self::Array { element, dimensions } => {
                write!(f, "{element}")?;
                for _ in 0..*dimensions {
                    write!(f, "[]")?;
                }
                Ok(())
            }
        }
    }
}

/// A resolved method descriptor: parameter types in declaration order plus an
/// optional return type (`None` means `void`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: Option<FieldType>,
}

impl MethodDescriptor {
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.return_type.is_none()
    }

    /// Number of logical parameter *values* (not words); used when allocating
    /// TAC parameter slots.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}

/// A resolved reference to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub owner: ClassName,
    pub name: String,
    pub field_type: FieldType,
}

/// A resolved reference to a method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    pub owner: ClassName,
    pub name: String,
    pub descriptor: MethodDescriptor,
    pub is_interface: bool,
}

/// A resolved `invokedynamic` call site descriptor: the `NameAndType` plus an
/// opaque bootstrap-method reference (opaque because resolving bootstrap
/// methods is a class-file-parsing concern, out of scope here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSiteRef {
    pub name: String,
    pub descriptor: MethodDescriptor,
    pub bootstrap_method_index: u16,
}

/// The element type operand of a `newarray` instruction (primitive arrays
/// only; `anewarray`/`multianewarray` carry a [`ClassName`] instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum PrimitiveArrayType {
    Boolean,
    Char,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
}

impl PrimitiveArrayType {
    #[must_use]
    pub const fn element_type(self) -> FieldType {
        match self {
            Self::Boolean => FieldType::Boolean,
            Self::Char => FieldType::Char,
            Self::Float => FieldType::Float,
            Self::Double => FieldType::Double,
            Self::Byte => FieldType::Byte,
            Self::Short => FieldType::Short,
            Self::Int => FieldType::Int,
            Self::Long => FieldType::Long,
        }
    }
}
