use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Strlen,
    Mul,
    Div,
    IntDiv,
    Plus,
    Minus,
    Concat,

    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Strlen => "#",
            Self::Mul => "*",
            Self::Div => "/",
            Self::IntDiv => "//",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Concat => "..",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "~=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    Do,
    Else,
    End,
    Function,
    Global,
    If,
    Local,
    Nil,
    Require,
    Return,
    Then,
    While,
    True,
    False,

    Integer,
    Number,
    String,
    Boolean,
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Self> {
        let kw = match s {
            "do" => Self::Do,
            "else" => Self::Else,
            "end" => Self::End,
            "function" => Self::Function,
            "global" => Self::Global,
            "if" => Self::If,
            "local" => Self::Local,
            "nil" => Self::Nil,
            "require" => Self::Require,
            "return" => Self::Return,
            "then" => Self::Then,
            "while" => Self::While,
            "true" => Self::True,
            "false" => Self::False,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "string" => Self::String,
            "boolean" => Self::Boolean,
            _ => return None,
        };
        Some(kw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Invalid(String),
    Integer(i64),
    Number(f64),
    Str(String),
    Op(Operator),
    Kw(Keyword),
    Id(String),

    LParen,
    RParen,

    Assign,
    Colon,
    Comma,

    /// End of input. The lexer keeps producing it once the source is exhausted.
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(s) => write!(f, "invalid input `{s}`"),
            Self::Integer(v) => write!(f, "`{v}`"),
            Self::Number(v) => write!(f, "`{v}`"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Op(op) => write!(f, "`{op}`"),
            Self::Kw(kw) => write!(f, "`{}`", format!("{kw:?}").to_lowercase()),
            Self::Id(id) => write!(f, "`{id}`"),
            Self::LParen => f.write_str("`(`"),
            Self::RParen => f.write_str("`)`"),
            Self::Assign => f.write_str("`=`"),
            Self::Colon => f.write_str("`:`"),
            Self::Comma => f.write_str("`,`"),
            Self::End => f.write_str("EOF"),
        }
    }
}
