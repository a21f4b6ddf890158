pub(crate) mod recorder;
mod runtime;
pub(crate) mod stack_code;

use crate::syntax::{expr_stack::Operand, scope::Identifier, token::Operator};

pub(crate) type Label = u32;

/// Code requests made while reducing an expression, in stack machine order:
/// operands first, then the checks and conversions guarding them, then the
/// operator.
pub(crate) trait Emitter {
    fn push_operand(&mut self, operand: &Operand);
    fn operation(&mut self, op: Operator);
    fn nil_check_top(&mut self);
    fn nil_check_second(&mut self);
    fn zero_div_check(&mut self);
    fn promote_top_to_number(&mut self);
    fn promote_second_to_number(&mut self);
}

/// Call argument, already type checked against the parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Argument {
    pub operand: Operand,
    /// Integer passed for a number parameter.
    pub promote: bool,
}

/// Statement level code requests on top of [`Emitter`].
pub(crate) trait Generator: Emitter {
    fn function_start(&mut self, func: &Identifier, params: &[&Identifier]);
    fn function_end(&mut self, func: &Identifier);
    fn declare_var(&mut self, var: &Identifier);
    /// Pops the top of the stack into `var`.
    fn assign_top(&mut self, var: &Identifier);
    /// Calls `func`. A variadic function gets a call of its own per
    /// argument.
    fn call(&mut self, func: &Identifier, args: &[Argument]);
    /// Pushes the `index`-th value, counted from 1, returned by the last call.
    fn push_returned(&mut self, index: usize);
    /// Pops `count` return values, the last one on top, and leaves the
    /// function.
    fn return_values(&mut self, count: usize);

    /// Pops the condition off the stack and jumps to the else branch when it
    /// is `nil` or `false`.
    fn if_start(&mut self) -> Label;
    fn if_else(&mut self, label: Label);
    fn if_end(&mut self, label: Label);

    fn while_start(&mut self) -> Label;
    /// Pops the condition off the stack and leaves the loop when it is `nil`
    /// or `false`.
    fn while_cond(&mut self, label: Label);
    fn while_end(&mut self, label: Label);

    fn finish(self) -> String
    where
        Self: Sized;
}
