use std::fmt;

use crate::syntax::{expr_stack::Operand, scope::Identifier, token::Operator};

use super::{Argument, Emitter, Generator, Label};

/// One recorded code request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Emission {
    /// A literal. Variables are recorded as [`Emission::PushVar`].
    PushOperand(Operand),
    PushVar(String),
    Operation(Operator),
    NilCheckTop,
    NilCheckSecond,
    ZeroDivCheck,
    PromoteTop,
    PromoteSecond,

    FunctionStart(String),
    FunctionEnd(String),
    DeclareVar(String),
    Assign(String),
    Call(String, usize),
    PushReturned(usize),
    Return(usize),
    IfStart(Label),
    IfElse(Label),
    IfEnd(Label),
    WhileStart(Label),
    WhileCond(Label),
    WhileEnd(Label),
}

impl fmt::Display for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PushOperand(operand) => write!(f, "push {operand}"),
            Self::PushVar(name) => write!(f, "push var {name}"),
            Self::Operation(op) => write!(f, "op {op}"),
            Self::NilCheckTop => f.write_str("nil check top"),
            Self::NilCheckSecond => f.write_str("nil check second"),
            Self::ZeroDivCheck => f.write_str("zero division check"),
            Self::PromoteTop => f.write_str("promote top"),
            Self::PromoteSecond => f.write_str("promote second"),
            Self::FunctionStart(name) => write!(f, "function {name}"),
            Self::FunctionEnd(name) => write!(f, "end function {name}"),
            Self::DeclareVar(name) => write!(f, "declare {name}"),
            Self::Assign(name) => write!(f, "assign {name}"),
            Self::Call(name, argc) => write!(f, "call {name}/{argc}"),
            Self::PushReturned(k) => write!(f, "push returned {k}"),
            Self::Return(count) => write!(f, "return {count}"),
            Self::IfStart(l) => write!(f, "if #{l}"),
            Self::IfElse(l) => write!(f, "else #{l}"),
            Self::IfEnd(l) => write!(f, "end if #{l}"),
            Self::WhileStart(l) => write!(f, "while #{l}"),
            Self::WhileCond(l) => write!(f, "do #{l}"),
            Self::WhileEnd(l) => write!(f, "end while #{l}"),
        }
    }
}

/// Generator that keeps the requests it receives instead of producing code.
/// Backs the `trace` output format and the parser tests.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    emissions: Vec<Emission>,
    next_label: Label,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> &[Emission] {
        &self.emissions
    }

    fn record(&mut self, emission: Emission) {
        log::trace!("{emission}");
        self.emissions.push(emission);
    }

    fn label(&mut self) -> Label {
        let label = self.next_label;
        self.next_label += 1;
        label
    }
}

impl Emitter for Recorder {
    fn push_operand(&mut self, operand: &Operand) {
        let emission = match operand {
            Operand::Var(id) => Emission::PushVar(id.name.clone()),
            other => Emission::PushOperand(other.clone()),
        };
        self.record(emission);
    }

    fn operation(&mut self, op: Operator) {
        self.record(Emission::Operation(op));
    }

    fn nil_check_top(&mut self) {
        self.record(Emission::NilCheckTop);
    }

    fn nil_check_second(&mut self) {
        self.record(Emission::NilCheckSecond);
    }

    fn zero_div_check(&mut self) {
        self.record(Emission::ZeroDivCheck);
    }

    fn promote_top_to_number(&mut self) {
        self.record(Emission::PromoteTop);
    }

    fn promote_second_to_number(&mut self) {
        self.record(Emission::PromoteSecond);
    }
}

impl Generator for Recorder {
    fn function_start(&mut self, func: &Identifier, _params: &[&Identifier]) {
        self.record(Emission::FunctionStart(func.name.clone()));
    }

    fn function_end(&mut self, func: &Identifier) {
        self.record(Emission::FunctionEnd(func.name.clone()));
    }

    fn declare_var(&mut self, var: &Identifier) {
        self.record(Emission::DeclareVar(var.name.clone()));
    }

    fn assign_top(&mut self, var: &Identifier) {
        self.record(Emission::Assign(var.name.clone()));
    }

    fn call(&mut self, func: &Identifier, args: &[Argument]) {
        self.record(Emission::Call(func.name.clone(), args.len()));
    }

    fn push_returned(&mut self, index: usize) {
        self.record(Emission::PushReturned(index));
    }

    fn return_values(&mut self, count: usize) {
        self.record(Emission::Return(count));
    }

    fn if_start(&mut self) -> Label {
        let label = self.label();
        self.record(Emission::IfStart(label));
        label
    }

    fn if_else(&mut self, label: Label) {
        self.record(Emission::IfElse(label));
    }

    fn if_end(&mut self, label: Label) {
        self.record(Emission::IfEnd(label));
    }

    fn while_start(&mut self) -> Label {
        let label = self.label();
        self.record(Emission::WhileStart(label));
        label
    }

    fn while_cond(&mut self, label: Label) {
        self.record(Emission::WhileCond(label));
    }

    fn while_end(&mut self, label: Label) {
        self.record(Emission::WhileEnd(label));
    }

    fn finish(self) -> String {
        self.emissions
            .iter()
            .map(|e| format!("{e}\n"))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::Recorder;
    use crate::{
        codegen::{Emitter, Generator},
        syntax::{expr_stack::Operand, token::Operator},
    };

    #[test]
    fn trace_listing() {
        let mut rec = Recorder::new();
        rec.push_operand(&Operand::Integer(1));
        rec.push_operand(&Operand::Str("a".into()));
        rec.nil_check_second();
        rec.operation(Operator::Concat);
        let label = rec.while_start();
        rec.while_cond(label);
        rec.while_end(label);
        rec.push_returned(2);
        rec.return_values(1);

        assert_eq!(
            rec.finish(),
            "push integer 1\n\
             push string \"a\"\n\
             nil check second\n\
             op ..\n\
             while #0\n\
             do #0\n\
             end while #0\n\
             push returned 2\n\
             return 1\n"
        );
    }

    #[test]
    fn labels_are_unique() {
        let mut rec = Recorder::new();
        assert_eq!(rec.if_start(), 0);
        assert_eq!(rec.while_start(), 1);
        assert_eq!(rec.if_start(), 2);
    }
}
