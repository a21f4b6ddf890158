use crate::{
    codegen::Emitter,
    error::{ErrorKind, PResult},
};

use super::{
    expr_stack::{Atom, ExprStack, NonTerm, Terminal},
    precedence::Class,
    token::Operator,
    types::SemType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Strlen,
    Arithmetic(Operator),
    Div,
    IntDiv,
    Concat,
    Relational(Operator),
    Equality(Operator),
    Paren,
    Term,
}

/// A production: the right-hand side it matches on top of the stack and
/// what reducing it checks and emits.
pub(crate) struct Production {
    pub name: &'static str,
    pattern: &'static [Atom],
    rule: Rule,
}

const N: Atom = Atom::NonTerm;

const fn production(name: &'static str, pattern: &'static [Atom], rule: Rule) -> Production {
    Production {
        name,
        pattern,
        rule,
    }
}

/// Tried in this order on every reduce; the first matching pattern wins.
pub(crate) const PRODUCTIONS: [Production; 15] = [
    production("N -> #N", &[Atom::Term(Class::Strlen), N], Rule::Strlen),
    production(
        "N -> N*N",
        &[N, Atom::Term(Class::Mul), N],
        Rule::Arithmetic(Operator::Mul),
    ),
    production(
        "N -> N/N",
        &[N, Atom::Term(Class::Div), N],
        Rule::Div,
    ),
    production(
        "N -> N//N",
        &[N, Atom::Term(Class::IntDiv), N],
        Rule::IntDiv,
    ),
    production(
        "N -> N+N",
        &[N, Atom::Term(Class::Plus), N],
        Rule::Arithmetic(Operator::Plus),
    ),
    production(
        "N -> N-N",
        &[N, Atom::Term(Class::Minus), N],
        Rule::Arithmetic(Operator::Minus),
    ),
    production(
        "N -> N..N",
        &[N, Atom::Term(Class::Concat), N],
        Rule::Concat,
    ),
    production(
        "N -> N<N",
        &[N, Atom::Term(Class::Lt), N],
        Rule::Relational(Operator::Lt),
    ),
    production(
        "N -> N<=N",
        &[N, Atom::Term(Class::Le), N],
        Rule::Relational(Operator::Le),
    ),
    production(
        "N -> N>N",
        &[N, Atom::Term(Class::Gt), N],
        Rule::Relational(Operator::Gt),
    ),
    production(
        "N -> N>=N",
        &[N, Atom::Term(Class::Ge), N],
        Rule::Relational(Operator::Ge),
    ),
    production(
        "N -> N==N",
        &[N, Atom::Term(Class::Eq), N],
        Rule::Equality(Operator::Eq),
    ),
    production(
        "N -> N~=N",
        &[N, Atom::Term(Class::Ne), N],
        Rule::Equality(Operator::Ne),
    ),
    production(
        "N -> (N)",
        &[Atom::Term(Class::LParen), N, Atom::Term(Class::RParen)],
        Rule::Paren,
    ),
    production("N -> T", &[Atom::Term(Class::Operand)], Rule::Term),
];

impl Production {
    pub fn matches(&self, stack: &ExprStack) -> bool {
        stack.check_top(self.pattern)
    }

    /// Checks the matched span and emits its code. The stack itself is left
    /// for the caller to pop.
    pub fn apply(&self, stack: &mut ExprStack, emitter: &mut dyn Emitter) -> PResult<NonTerm> {
        match self.rule {
            Rule::Strlen => strlen(stack, emitter),
            Rule::Arithmetic(op) => arithmetic(stack, emitter, op),
            Rule::Div => div(stack, emitter),
            Rule::IntDiv => int_div(stack, emitter),
            Rule::Concat => concat(stack, emitter),
            Rule::Relational(op) => relational(stack, emitter, op),
            Rule::Equality(op) => equality(stack, emitter, op),
            Rule::Paren => paren(stack),
            Rule::Term => term(stack, emitter),
        }
    }
}

fn missing_operand() -> ErrorKind {
    ErrorKind::Internal("matched production has no operand on the stack".into())
}

fn incompatible(op: Operator, lhs: SemType, rhs: SemType) -> ErrorKind {
    ErrorKind::ExprType(format!("`{op}` cannot be applied to {lhs} and {rhs}"))
}

/// Types of the two operands of a binary production, left one first.
fn operands(stack: &mut ExprStack) -> PResult<(NonTermInfo, NonTermInfo)> {
    let rhs = stack
        .top_non_term()
        .as_deref()
        .map(NonTermInfo::of)
        .ok_or_else(missing_operand)?;
    let lhs = stack
        .next_non_term()
        .as_deref()
        .map(NonTermInfo::of)
        .ok_or_else(missing_operand)?;
    Ok((lhs, rhs))
}

#[derive(Debug, Clone, Copy)]
struct NonTermInfo {
    ty: SemType,
    literal_zero: bool,
}

impl NonTermInfo {
    fn of(non_term: &NonTerm) -> Self {
        Self {
            ty: non_term.ty,
            literal_zero: non_term.is_literal_zero(),
        }
    }
}

/// Promotes the integer operand when the other one is a number. Returns the
/// operand types after the promotion.
fn promote(
    stack: &mut ExprStack,
    emitter: &mut dyn Emitter,
    lhs: SemType,
    rhs: SemType,
) -> PResult<(SemType, SemType)> {
    match (lhs, rhs) {
        (SemType::Integer, SemType::Number) => {
            log::debug!("promoting left operand to number");
            stack.top_non_term().ok_or_else(missing_operand)?;
            stack.next_non_term().ok_or_else(missing_operand)?.ty = SemType::Number;
            emitter.promote_second_to_number();
            Ok((SemType::Number, SemType::Number))
        }
        (SemType::Number, SemType::Integer) => {
            log::debug!("promoting right operand to number");
            stack.top_non_term().ok_or_else(missing_operand)?.ty = SemType::Number;
            emitter.promote_top_to_number();
            Ok((SemType::Number, SemType::Number))
        }
        types => Ok(types),
    }
}

fn nil_checks(emitter: &mut dyn Emitter) {
    emitter.nil_check_second();
    emitter.nil_check_top();
}

fn strlen(stack: &mut ExprStack, emitter: &mut dyn Emitter) -> PResult<NonTerm> {
    let ty = stack.top_non_term().ok_or_else(missing_operand)?.ty;
    if ty != SemType::String {
        return Err(ErrorKind::ExprType(format!(
            "`#` cannot be applied to {ty}"
        )));
    }

    emitter.nil_check_top();
    emitter.operation(Operator::Strlen);
    Ok(NonTerm::expr(SemType::Integer))
}

fn arithmetic(stack: &mut ExprStack, emitter: &mut dyn Emitter, op: Operator) -> PResult<NonTerm> {
    let (lhs, rhs) = operands(stack)?;
    if !lhs.ty.is_numeric() || !rhs.ty.is_numeric() {
        return Err(incompatible(op, lhs.ty, rhs.ty));
    }

    nil_checks(emitter);
    let (lhs, _) = promote(stack, emitter, lhs.ty, rhs.ty)?;
    emitter.operation(op);

    Ok(NonTerm::expr(lhs))
}

fn div(stack: &mut ExprStack, emitter: &mut dyn Emitter) -> PResult<NonTerm> {
    let (lhs, rhs) = operands(stack)?;
    if !lhs.ty.is_numeric() || !rhs.ty.is_numeric() {
        return Err(incompatible(Operator::Div, lhs.ty, rhs.ty));
    }
    if rhs.literal_zero {
        return Err(ErrorKind::ZeroDivision("divisor is a zero literal".into()));
    }

    nil_checks(emitter);
    emitter.zero_div_check();
    if lhs.ty == SemType::Integer && rhs.ty == SemType::Integer {
        emitter.promote_second_to_number();
        emitter.promote_top_to_number();
    } else {
        promote(stack, emitter, lhs.ty, rhs.ty)?;
    }
    emitter.operation(Operator::Div);

    Ok(NonTerm::expr(SemType::Number))
}

fn int_div(stack: &mut ExprStack, emitter: &mut dyn Emitter) -> PResult<NonTerm> {
    let (lhs, rhs) = operands(stack)?;
    if lhs.ty != SemType::Integer || rhs.ty != SemType::Integer {
        return Err(incompatible(Operator::IntDiv, lhs.ty, rhs.ty));
    }
    if rhs.literal_zero {
        return Err(ErrorKind::ZeroDivision("divisor is a zero literal".into()));
    }

    nil_checks(emitter);
    emitter.zero_div_check();
    emitter.operation(Operator::IntDiv);

    Ok(NonTerm::expr(SemType::Integer))
}

fn concat(stack: &mut ExprStack, emitter: &mut dyn Emitter) -> PResult<NonTerm> {
    let (lhs, rhs) = operands(stack)?;
    if lhs.ty != SemType::String || rhs.ty != SemType::String {
        return Err(incompatible(Operator::Concat, lhs.ty, rhs.ty));
    }

    nil_checks(emitter);
    emitter.operation(Operator::Concat);

    Ok(NonTerm::expr(SemType::String))
}

fn relational(stack: &mut ExprStack, emitter: &mut dyn Emitter, op: Operator) -> PResult<NonTerm> {
    let (lhs, rhs) = operands(stack)?;
    let comparable = lhs.ty != SemType::Nil
        && rhs.ty != SemType::Nil
        && (lhs.ty == rhs.ty || (lhs.ty.is_numeric() && rhs.ty.is_numeric()));
    if !comparable {
        return Err(incompatible(op, lhs.ty, rhs.ty));
    }

    nil_checks(emitter);
    promote(stack, emitter, lhs.ty, rhs.ty)?;
    emitter.operation(op);

    Ok(NonTerm::expr(SemType::Boolean))
}

fn equality(stack: &mut ExprStack, emitter: &mut dyn Emitter, op: Operator) -> PResult<NonTerm> {
    let (lhs, rhs) = operands(stack)?;
    let with_nil = lhs.ty == SemType::Nil || rhs.ty == SemType::Nil;
    if !with_nil && lhs.ty != rhs.ty {
        if !(lhs.ty.is_numeric() && rhs.ty.is_numeric()) {
            return Err(incompatible(op, lhs.ty, rhs.ty));
        }
        promote(stack, emitter, lhs.ty, rhs.ty)?;
    }

    emitter.operation(op);
    Ok(NonTerm::expr(SemType::Boolean))
}

fn paren(stack: &mut ExprStack) -> PResult<NonTerm> {
    stack.top_non_term().cloned().ok_or_else(missing_operand)
}

fn term(stack: &mut ExprStack, emitter: &mut dyn Emitter) -> PResult<NonTerm> {
    let operand = match stack.top_term() {
        Some(Terminal::Operand(operand)) => operand.clone(),
        _ => return Err(missing_operand()),
    };
    let ty = operand.sem_type()?;
    log::trace!("operand {operand} is {ty}");

    emitter.push_operand(&operand);
    Ok(NonTerm::value(operand, ty))
}
