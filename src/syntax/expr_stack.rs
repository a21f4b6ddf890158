use std::{fmt, rc::Rc};

use crate::error::{ErrorKind, PResult};

use super::{
    precedence::Class,
    scope::Identifier,
    token::Operator,
    types::SemType,
};

/// Value of an operand terminal.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Integer(i64),
    Number(f64),
    Str(String),
    Boolean(bool),
    Nil,
    Var(Rc<Identifier>),
}

impl Operand {
    pub fn sem_type(&self) -> PResult<SemType> {
        match self {
            Self::Integer(_) => Ok(SemType::Integer),
            Self::Number(_) => Ok(SemType::Number),
            Self::Str(_) => Ok(SemType::String),
            Self::Boolean(_) => Ok(SemType::Boolean),
            Self::Nil => Ok(SemType::Nil),
            Self::Var(id) => match id.var_type() {
                Some(ty) => Ok(ty.into()),
                None => Err(ErrorKind::Internal(format!(
                    "`{}` was pushed as an operand but isn't a variable",
                    id.name
                ))),
            },
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "integer {v}"),
            Self::Number(v) => write!(f, "number {v}"),
            Self::Str(s) => write!(f, "string {s:?}"),
            Self::Boolean(b) => write!(f, "boolean {b}"),
            Self::Nil => f.write_str("nil"),
            Self::Var(id) => write!(f, "var {}", id.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Terminal {
    End,
    Op(Operator),
    LParen,
    RParen,
    Operand(Operand),
}

impl Terminal {
    pub fn class(&self) -> Class {
        match self {
            Self::End => Class::End,
            Self::Op(op) => Class::of_operator(*op),
            Self::LParen => Class::LParen,
            Self::RParen => Class::RParen,
            Self::Operand(_) => Class::Operand,
        }
    }
}

/// What a non-terminal was reduced from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Origin {
    /// `N -> T`, keeps the operand so constant divisors can be spotted.
    Value(Operand),
    Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NonTerm {
    pub origin: Origin,
    pub ty: SemType,
}

impl NonTerm {
    pub fn value(operand: Operand, ty: SemType) -> Self {
        Self {
            origin: Origin::Value(operand),
            ty,
        }
    }

    pub fn expr(ty: SemType) -> Self {
        Self {
            origin: Origin::Expr,
            ty,
        }
    }

    pub fn is_literal_zero(&self) -> bool {
        match &self.origin {
            Origin::Value(Operand::Integer(v)) => *v == 0,
            Origin::Value(Operand::Number(v)) => *v == 0.0,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Term(Terminal),
    NonTerm(NonTerm),
}

/// One element of a production's right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Atom {
    Term(Class),
    NonTerm,
}

/// Stack of the bottom-up expression parser.
///
/// Reduction boundaries are kept as indices into `slots`: a marker at `i`
/// sits right below `slots[i]`. The bottom slot is always the end terminal.
#[derive(Debug)]
pub(crate) struct ExprStack {
    slots: Vec<Slot>,
    markers: Vec<usize>,
    active: Option<usize>,
}

impl ExprStack {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::Term(Terminal::End)],
            markers: vec![],
            active: None,
        }
    }

    pub fn push_term(&mut self, term: Terminal) {
        self.slots.push(Slot::Term(term));
    }

    pub fn push_non_term(&mut self, non_term: NonTerm) {
        self.slots.push(Slot::NonTerm(non_term));
    }

    /// Places a marker right above the topmost terminal.
    pub fn mark_after_top_term(&mut self) -> PResult<()> {
        let pos = match self.top_term_index() {
            Some(idx) => idx + 1,
            None => return Err(ErrorKind::Internal("expression stack is empty".into())),
        };

        if let Some(&last) = self.markers.last() {
            if last >= pos {
                return Err(ErrorKind::Internal(format!(
                    "marker at {pos} would not be above the marker at {last}"
                )));
            }
        }
        self.markers.push(pos);
        Ok(())
    }

    /// Drops everything above the topmost marker, and the marker itself.
    pub fn pop_to_marker(&mut self) {
        if let Some(pos) = self.markers.pop() {
            self.slots.truncate(pos);
        }
        self.active = None;
    }

    fn top_term_index(&self) -> Option<usize> {
        self.slots
            .iter()
            .rposition(|slot| matches!(slot, Slot::Term(_)))
    }

    pub fn top_term(&self) -> Option<&Terminal> {
        match self.top_term_index().map(|idx| &self.slots[idx]) {
            Some(Slot::Term(term)) => Some(term),
            _ => None,
        }
    }

    fn non_term_below(&mut self, end: usize) -> Option<&mut NonTerm> {
        let idx = self.slots[..end]
            .iter()
            .rposition(|slot| matches!(slot, Slot::NonTerm(_)))?;
        self.active = Some(idx);
        match &mut self.slots[idx] {
            Slot::NonTerm(non_term) => Some(non_term),
            Slot::Term(_) => None,
        }
    }

    /// Topmost non-terminal. Resets the cursor used by [`Self::next_non_term`].
    pub fn top_non_term(&mut self) -> Option<&mut NonTerm> {
        self.non_term_below(self.slots.len())
    }

    /// Next non-terminal below the one returned last by [`Self::top_non_term`]
    /// or by this method.
    pub fn next_non_term(&mut self) -> Option<&mut NonTerm> {
        let end = self.active?;
        self.non_term_below(end)
    }

    /// Whether the slots above the topmost marker are exactly `pattern`,
    /// written left to right as in the production.
    pub fn check_top(&self, pattern: &[Atom]) -> bool {
        let Some(&marker) = self.markers.last() else {
            return false;
        };
        if self.slots.len() < pattern.len() || self.slots.len() - pattern.len() != marker {
            return false;
        }

        self.slots[marker..]
            .iter()
            .zip(pattern)
            .all(|(slot, atom)| match (slot, atom) {
                (Slot::NonTerm(_), Atom::NonTerm) => true,
                (Slot::Term(term), Atom::Term(class)) => term.class() == *class,
                _ => false,
            })
    }

    /// `$` or `$ N` with no marker left.
    pub fn is_correctly_empty(&self) -> bool {
        if !self.markers.is_empty() {
            return false;
        }
        match self.slots.as_slice() {
            [Slot::Term(Terminal::End)] => true,
            [Slot::Term(Terminal::End), Slot::NonTerm(_)] => true,
            _ => false,
        }
    }

    /// The single result of a finished parse.
    pub fn result(&self) -> Option<&NonTerm> {
        match self.slots.as_slice() {
            [Slot::Term(Terminal::End), Slot::NonTerm(non_term)] => Some(non_term),
            _ => None,
        }
    }
}

impl fmt::Display for ExprStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut markers = self.markers.iter().peekable();

        for (idx, slot) in self.slots.iter().enumerate() {
            if markers.next_if(|&&pos| pos == idx).is_some() {
                f.write_str("| ")?;
            }
            match slot {
                Slot::NonTerm(non_term) => write!(f, "N:{} ", non_term.ty)?,
                Slot::Term(Terminal::End) => f.write_str("$ ")?,
                Slot::Term(Terminal::Op(op)) => write!(f, "{op} ")?,
                Slot::Term(Terminal::LParen) => f.write_str("( ")?,
                Slot::Term(Terminal::RParen) => f.write_str(") ")?,
                Slot::Term(Terminal::Operand(_)) => f.write_str("i ")?,
            }
        }
        if markers.next().is_some() {
            f.write_str("|")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Atom, ExprStack, NonTerm, Operand, Terminal};
    use crate::syntax::{precedence::Class, token::Operator, types::SemType};

    fn shift(stack: &mut ExprStack, term: Terminal) {
        stack.mark_after_top_term().unwrap();
        stack.push_term(term);
    }

    #[test]
    fn starts_with_end() {
        let stack = ExprStack::new();
        assert_eq!(stack.top_term(), Some(&Terminal::End));
        assert!(stack.is_correctly_empty());
        assert_eq!(stack.result(), None);
    }

    #[test]
    fn marker_goes_below_top_term() {
        let mut stack = ExprStack::new();
        stack.push_non_term(NonTerm::expr(SemType::Integer));
        shift(&mut stack, Terminal::Op(Operator::Plus));

        assert_eq!(stack.to_string(), "$ | N:integer + ");
        assert_eq!(stack.top_term(), Some(&Terminal::Op(Operator::Plus)));
    }

    #[test]
    fn check_top_needs_marker_below() {
        let mut stack = ExprStack::new();
        shift(&mut stack, Terminal::Operand(Operand::Integer(1)));
        assert!(stack.check_top(&[Atom::Term(Class::Operand)]));
        assert!(!stack.check_top(&[Atom::NonTerm]));
        assert!(!stack.check_top(&[Atom::Term(Class::End), Atom::Term(Class::Operand)]));

        stack.pop_to_marker();
        stack.push_non_term(NonTerm::value(Operand::Integer(1), SemType::Integer));
        assert!(!stack.check_top(&[Atom::NonTerm]));
        assert!(stack.is_correctly_empty());
    }

    #[test]
    fn binary_pattern() {
        let mut stack = ExprStack::new();
        stack.push_non_term(NonTerm::expr(SemType::Integer));
        shift(&mut stack, Terminal::Op(Operator::Mul));
        stack.push_non_term(NonTerm::expr(SemType::Number));

        let pattern = [Atom::NonTerm, Atom::Term(Class::Mul), Atom::NonTerm];
        assert!(stack.check_top(&pattern));
        assert!(!stack.check_top(&[Atom::NonTerm, Atom::Term(Class::Plus), Atom::NonTerm]));
        assert!(!stack.is_correctly_empty());
    }

    #[test]
    fn cursor_walks_non_terms() {
        let mut stack = ExprStack::new();
        stack.push_non_term(NonTerm::expr(SemType::Integer));
        shift(&mut stack, Terminal::Op(Operator::Minus));
        stack.push_non_term(NonTerm::expr(SemType::Number));

        assert_eq!(stack.top_non_term().unwrap().ty, SemType::Number);
        assert_eq!(stack.next_non_term().unwrap().ty, SemType::Integer);
        assert!(stack.next_non_term().is_none());

        // starting over from the top resets the cursor
        assert_eq!(stack.top_non_term().unwrap().ty, SemType::Number);
        stack.next_non_term().unwrap().ty = SemType::Number;
        assert_eq!(stack.top_non_term().unwrap().ty, SemType::Number);
        assert_eq!(stack.next_non_term().unwrap().ty, SemType::Number);
    }

    #[test]
    fn next_without_top_is_none() {
        let mut stack = ExprStack::new();
        stack.push_non_term(NonTerm::expr(SemType::Integer));
        assert!(stack.next_non_term().is_none());
    }

    #[test]
    fn pop_to_marker_releases_span() {
        let mut stack = ExprStack::new();
        shift(&mut stack, Terminal::LParen);
        shift(&mut stack, Terminal::Operand(Operand::Str("abc".into())));
        assert_eq!(stack.to_string(), "$ | ( | i ");

        stack.pop_to_marker();
        assert_eq!(stack.to_string(), "$ | ( ");
        stack.pop_to_marker();
        assert_eq!(stack.to_string(), "$ ");

        // no marker left, nothing to do
        stack.pop_to_marker();
        assert!(stack.is_correctly_empty());
    }

    #[test]
    fn literal_zero() {
        assert!(NonTerm::value(Operand::Integer(0), SemType::Integer).is_literal_zero());
        assert!(NonTerm::value(Operand::Number(0.0), SemType::Number).is_literal_zero());
        assert!(!NonTerm::value(Operand::Number(0.5), SemType::Number).is_literal_zero());
        assert!(!NonTerm::expr(SemType::Integer).is_literal_zero());
    }
}
