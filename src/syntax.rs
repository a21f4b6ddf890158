mod expr_parser;
pub(crate) mod expr_stack;
mod lexer;
mod parser;
pub(crate) mod precedence;
mod rules;
pub(crate) mod scope;
mod source;
pub(crate) mod token;
pub(crate) mod types;

pub(crate) use parser::Parser;

use crate::error::PResult;
use types::SemType;

pub(crate) type LocalIndex = u32;

pub(crate) trait ExprParser {
    /// Parses one expression off the token stream, emitting its code, and
    /// returns its type. The token that ended the expression is left in the
    /// stream.
    fn parse_expr(&mut self) -> PResult<SemType>;
}
