use std::fmt;

use super::token::Keyword;

/// Declared type of a variable, parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarType {
    Integer,
    Number,
    String,
    Boolean,
}

impl VarType {
    pub fn from_keyword(kw: Keyword) -> Option<Self> {
        match kw {
            Keyword::Integer => Some(Self::Integer),
            Keyword::Number => Some(Self::Number),
            Keyword::String => Some(Self::String),
            Keyword::Boolean => Some(Self::Boolean),
            _ => None,
        }
    }
}

/// Type of an evaluated expression. Unlike [`VarType`] it includes `nil`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SemType {
    Integer,
    Number,
    String,
    Boolean,
    Nil,
}

impl SemType {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }

    /// Whether a value of this type can be stored into `target`, and if an
    /// integer to number promotion is needed to do so.
    pub fn assignable_to(self, target: VarType) -> Option<bool> {
        match (self, target) {
            (Self::Nil, _) => Some(false),
            (Self::Integer, VarType::Number) => Some(true),
            (ty, target) if ty == SemType::from(target) => Some(false),
            _ => None,
        }
    }
}

impl From<VarType> for SemType {
    fn from(ty: VarType) -> Self {
        match ty {
            VarType::Integer => Self::Integer,
            VarType::Number => Self::Number,
            VarType::String => Self::String,
            VarType::Boolean => Self::Boolean,
        }
    }
}

impl fmt::Display for SemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Nil => "nil",
        };
        f.write_str(name)
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        SemType::from(*self).fmt(f)
    }
}

#[cfg(test)]
mod test {
    use super::{SemType, VarType};

    #[test]
    fn assignability() {
        assert_eq!(SemType::Integer.assignable_to(VarType::Integer), Some(false));
        assert_eq!(SemType::Integer.assignable_to(VarType::Number), Some(true));
        assert_eq!(SemType::Nil.assignable_to(VarType::String), Some(false));
        assert_eq!(SemType::Number.assignable_to(VarType::Integer), None);
        assert_eq!(SemType::String.assignable_to(VarType::Boolean), None);
    }
}
