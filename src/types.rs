use std::fmt;

use cranelift_codegen::ir::types;

pub const INT: &str = "Int";
pub const FLOAT: &str = "Float";
pub const BOOLEAN: &str = "Boolean";
pub const VOID: &str = "Void";

/// Semantic type: a class or primitive name plus ordered generic parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    pub name: String,
    pub subtypes: Vec<Type>,
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), subtypes: Vec::new() }
    }

    pub fn generic(name: impl Into<String>, subtypes: Vec<Type>) -> Self {
        Self { name: name.into(), subtypes }
    }

    pub fn int() -> Self {
        Self::named(INT)
    }

    pub fn float() -> Self {
        Self::named(FLOAT)
    }

    pub fn boolean() -> Self {
        Self::named(BOOLEAN)
    }

    pub fn void() -> Self {
        Self::named(VOID)
    }

    pub fn is_void(&self) -> bool {
        self.name == VOID
    }

    pub fn is_numeric(&self) -> bool {
        self.name == INT || self.name == FLOAT
    }

    pub fn is_primitive(&self) -> bool {
        is_primitive(&self.name)
    }

    /// Machine representation; `None` for `Void`, a pointer-sized integer for class values.
    pub fn abi(&self) -> Option<types::Type> {
        match self.name.as_str() {
            INT => Some(types::I64),
            FLOAT => Some(types::F64),
            BOOLEAN => Some(types::I8),
            VOID => None,
            _ => Some(types::I64),
        }
    }
}

pub fn is_primitive(name: &str) -> bool {
    matches!(name, INT | FLOAT | BOOLEAN | VOID)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.subtypes.is_empty() {
            write!(f, "<")?;
            for (i, sub) in self.subtypes.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{sub}")?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_generic() {
        let ty = Type::generic("Map", vec![Type::int(), Type::named("Result")]);
        assert_eq!(ty.to_string(), "Map<Int, Result>");
    }

    #[test]
    fn structural_equality() {
        let a = Type::generic("Map", vec![Type::int(), Type::named("Result")]);
        let b = Type::generic("Map", vec![Type::int(), Type::named("Result")]);
        let c = Type::generic("Map", vec![Type::named("Result"), Type::int()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn abi_mapping() {
        assert_eq!(Type::int().abi(), Some(types::I64));
        assert_eq!(Type::float().abi(), Some(types::F64));
        assert_eq!(Type::boolean().abi(), Some(types::I8));
        assert_eq!(Type::void().abi(), None);
        assert_eq!(Type::named("Cursor").abi(), Some(types::I64));
    }
}
