/// Exit code of the generated program when a nil operand reaches an operator.
pub(crate) const NIL_EXIT_CODE: i32 = 8;
/// Exit code of the generated program when a divisor turns out to be zero.
pub(crate) const ZERO_DIV_EXIT_CODE: i32 = 9;

#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub(crate) enum ErrorKind {
    #[error("lexical error: {0}")]
    Lexical(String),
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("{0}")]
    Undefined(String),
    #[error("type mismatch in assignment: {0}")]
    AssignType(String),
    #[error("signature mismatch: {0}")]
    Signature(String),
    #[error("incompatible types in expression: {0}")]
    ExprType(String),
    #[error("semantic error: {0}")]
    Semantic(String),
    #[error("division by zero: {0}")]
    ZeroDivision(String),
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl ErrorKind {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Lexical(_) => 1,
            Self::Syntax(_) => 2,
            Self::Undefined(_) => 3,
            Self::AssignType(_) => 4,
            Self::Signature(_) => 5,
            Self::ExprType(_) => 6,
            Self::Semantic(_) => 7,
            Self::ZeroDivision(_) => ZERO_DIV_EXIT_CODE,
            Self::Internal(_) => 99,
        }
    }
}

pub(crate) type PResult<T> = Result<T, ErrorKind>;
