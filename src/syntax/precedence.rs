use super::token::{Keyword, Operator, Token};

/// Row/column of the precedence table.
///
/// `Operand` stands for every literal, identifier and `nil`, so no lookahead
/// token maps to it by kind. It takes the slot right before `End`, which is
/// why `End` sits one position past the last explicit header entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Class {
    Strlen = 0,
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
    LParen,
    RParen,
    Operand = OPERAND_SLOT as isize,
    End = END_SLOT as isize,
}

const OPERAND_SLOT: usize = 15;
const END_SLOT: usize = OPERAND_SLOT + 1;
pub(crate) const CLASS_COUNT: usize = END_SLOT + 1;

impl Class {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn of_operator(op: Operator) -> Self {
        match op {
            Operator::Strlen => Self::Strlen,
            Operator::Mul => Self::Mul,
            Operator::Div => Self::Div,
            Operator::IntDiv => Self::IntDiv,
            Operator::Plus => Self::Plus,
            Operator::Minus => Self::Minus,
            Operator::Concat => Self::Concat,
            Operator::Lt => Self::Lt,
            Operator::Le => Self::Le,
            Operator::Gt => Self::Gt,
            Operator::Ge => Self::Ge,
            Operator::Eq => Self::Eq,
            Operator::Ne => Self::Ne,
        }
    }

    /// Classifies a lookahead token. `None` means the token can't be part
    /// of an expression at all.
    pub fn of_token(token: &Token) -> Option<Self> {
        match token {
            Token::Integer(_)
            | Token::Number(_)
            | Token::Str(_)
            | Token::Id(_)
            | Token::Kw(Keyword::Nil | Keyword::True | Keyword::False) => Some(Self::Operand),
            Token::Op(op) => Some(Self::of_operator(*op)),
            Token::LParen => Some(Self::LParen),
            Token::RParen => Some(Self::RParen),
            Token::End => Some(Self::End),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Mark a reduction boundary below the top terminal, then push.
    Shift,
    /// Push without a boundary. Only `(` meeting `)`.
    Push,
    Reduce,
    Reject,
}

const S: Action = Action::Shift;
const P: Action = Action::Push;
const R: Action = Action::Reduce;
const X: Action = Action::Reject;

/// Rows are the topmost terminal on the stack, columns the lookahead.
#[rustfmt::skip]
const TABLE: [[Action; CLASS_COUNT]; CLASS_COUNT] = [
    //#  *  /  // +  -  .. <  <= >  >= == ~= (  )  i  $
    [X, R, R, R, R, R, R, R, R, R, R, R, R, S, R, S, R], // #
    [S, R, R, R, R, R, R, R, R, R, R, R, R, S, R, S, R], // *
    [S, R, R, R, R, R, R, R, R, R, R, R, R, S, R, S, R], // /
    [S, R, R, R, R, R, R, R, R, R, R, R, R, S, R, S, R], // //
    [S, S, S, S, R, R, R, R, R, R, R, R, R, S, R, S, R], // +
    [S, S, S, S, R, R, R, R, R, R, R, R, R, S, R, S, R], // -
    [S, S, S, S, S, S, S, R, R, R, R, R, R, S, R, S, R], // ..
    [S, S, S, S, S, S, S, X, X, X, X, X, X, S, R, S, R], // <
    [S, S, S, S, S, S, S, X, X, X, X, X, X, S, R, S, R], // <=
    [S, S, S, S, S, S, S, X, X, X, X, X, X, S, R, S, R], // >
    [S, S, S, S, S, S, S, X, X, X, X, X, X, S, R, S, R], // >=
    [S, S, S, S, S, S, S, X, X, X, X, X, X, S, R, S, R], // ==
    [S, S, S, S, S, S, S, X, X, X, X, X, X, S, R, S, R], // ~=
    [S, S, S, S, S, S, S, S, S, S, S, S, S, S, P, S, X], // (
    [X, R, R, R, R, R, R, R, R, R, R, R, R, X, R, X, R], // )
    [X, R, R, R, R, R, R, R, R, R, R, R, R, X, R, X, R], // i
    [S, S, S, S, S, S, S, S, S, S, S, S, S, S, X, S, X], // $
];

pub(crate) fn action(stack_top: Class, input: Class) -> Action {
    TABLE[stack_top.index()][input.index()]
}

/// Looks up the action for the topmost stack terminal and a lookahead token.
///
/// `None` means the lookahead doesn't belong to the expression. That covers
/// tokens with no class and an identifier right after a complete operand,
/// which can only start the next statement.
pub(crate) fn lookup(stack_top: Class, input: &Token) -> Option<Action> {
    if stack_top == Class::Operand && matches!(input, Token::Id(_)) {
        return None;
    }
    let input = Class::of_token(input)?;
    Some(action(stack_top, input))
}
