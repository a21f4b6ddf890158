use crate::{
    codegen::{Emitter, Generator},
    error::{ErrorKind, PResult},
};

use super::{
    expr_stack::{ExprStack, Terminal},
    precedence::{self, Action, Class},
    rules::PRODUCTIONS,
    token::Token,
    types::SemType,
    ExprParser, Parser,
};

impl<'src, G: Generator> ExprParser for Parser<'src, G> {
    fn parse_expr(&mut self) -> PResult<SemType> {
        let mut stack = ExprStack::new();
        let mut draining = false;
        // `None` stands for the end marker fed once the expression is over.
        let mut lookahead = Some(self.tokens.next_token()?);

        while !(draining && stack.is_correctly_empty()) {
            let top = match stack.top_term() {
                Some(term) => term.class(),
                None => {
                    return Err(ErrorKind::Internal(
                        "expression stack lost its end marker".into(),
                    ))
                }
            };

            let action = match &lookahead {
                None => Some(precedence::action(top, Class::End)),
                Some(Token::End) => None,
                Some(token) => precedence::lookup(top, token),
            };

            let Some(action) = action else {
                if let Some(token) = lookahead.take() {
                    log::debug!("{token} ends the expression");
                    self.tokens.push_back(token)?;
                }
                draining = true;
                continue;
            };
            log::debug!("{top:?} => {action:?}");

            match action {
                Action::Push => {
                    let term = self.terminal(lookahead.take())?;
                    stack.push_term(term);
                }
                Action::Shift => {
                    let term = self.terminal(lookahead.take())?;
                    stack.mark_after_top_term()?;
                    stack.push_term(term);
                }
                Action::Reduce => {
                    reduce(&mut stack, &mut self.gen)?;
                    log::trace!("expression stack: {stack}");
                    continue;
                }
                Action::Reject => {
                    return Err(ErrorKind::Syntax(match lookahead {
                        Some(token) => format!("Unexpected {token} in expression"),
                        None => "Unexpected end of expression".into(),
                    }))
                }
            }
            log::trace!("expression stack: {stack}");

            lookahead = if draining {
                None
            } else {
                Some(self.tokens.next_token()?)
            };
        }

        match stack.result() {
            Some(result) => Ok(result.ty),
            None => Err(ErrorKind::Syntax("Expected expression".into())),
        }
    }
}

impl<'src, G: Generator> Parser<'src, G> {
    fn terminal(&self, token: Option<Token>) -> PResult<Terminal> {
        match token {
            None | Some(Token::End) => Ok(Terminal::End),
            Some(Token::Op(op)) => Ok(Terminal::Op(op)),
            Some(Token::LParen) => Ok(Terminal::LParen),
            Some(Token::RParen) => Ok(Terminal::RParen),
            Some(token) => self.resolve_operand(token).map(Terminal::Operand),
        }
    }
}

/// Replaces the span above the topmost marker with the non-terminal of the
/// first production matching it.
fn reduce(stack: &mut ExprStack, emitter: &mut dyn Emitter) -> PResult<()> {
    let production = PRODUCTIONS
        .iter()
        .find(|production| production.matches(stack))
        .ok_or_else(|| ErrorKind::Syntax(format!("No rule to reduce `{stack}`")))?;

    log::debug!("reduce: {}", production.name);
    let non_term = production.apply(stack, emitter)?;
    stack.pop_to_marker();
    stack.push_non_term(non_term);
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::{
        codegen::recorder::{Emission, Recorder},
        error::ErrorKind,
        syntax::{
            expr_stack::Operand,
            scope::Signature,
            token::{Keyword, Operator, Token},
            types::{SemType, VarType},
            ExprParser, Parser,
        },
    };

    fn setup(src: &str) -> Parser<'_, Recorder> {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut parser = Parser::new(src, Recorder::new());
        parser.scopes.declare_variable("i", VarType::Integer).unwrap();
        parser.scopes.declare_variable("n", VarType::Number).unwrap();
        parser.scopes.declare_variable("s", VarType::String).unwrap();
        parser.scopes.declare_variable("b", VarType::Boolean).unwrap();
        parser
    }

    fn int(v: i64) -> Emission {
        Emission::PushOperand(Operand::Integer(v))
    }

    fn string(s: &str) -> Emission {
        Emission::PushOperand(Operand::Str(s.into()))
    }

    #[test]
    fn precedence_of_products() {
        let mut parser = setup("2 + 3 * 4");
        assert_eq!(parser.parse_expr(), Ok(SemType::Integer));
        assert_eq!(
            parser.gen.emissions(),
            &[
                int(2),
                int(3),
                int(4),
                Emission::NilCheckSecond,
                Emission::NilCheckTop,
                Emission::Operation(Operator::Mul),
                Emission::NilCheckSecond,
                Emission::NilCheckTop,
                Emission::Operation(Operator::Plus),
            ]
        );
        assert_eq!(parser.tokens.next_token(), Ok(Token::End));
    }

    #[test]
    fn left_associative_minus() {
        let mut parser = setup("5 - 2 - 1");
        assert_eq!(parser.parse_expr(), Ok(SemType::Integer));
        assert_eq!(
            parser.gen.emissions(),
            &[
                int(5),
                int(2),
                Emission::NilCheckSecond,
                Emission::NilCheckTop,
                Emission::Operation(Operator::Minus),
                int(1),
                Emission::NilCheckSecond,
                Emission::NilCheckTop,
                Emission::Operation(Operator::Minus),
            ]
        );
    }

    #[test]
    fn right_associative_concat() {
        let mut parser = setup("\"a\" .. \"b\" .. \"c\"");
        assert_eq!(parser.parse_expr(), Ok(SemType::String));
        assert_eq!(
            parser.gen.emissions(),
            &[
                string("a"),
                string("b"),
                string("c"),
                Emission::NilCheckSecond,
                Emission::NilCheckTop,
                Emission::Operation(Operator::Concat),
                Emission::NilCheckSecond,
                Emission::NilCheckTop,
                Emission::Operation(Operator::Concat),
            ]
        );
    }

    #[test]
    fn promotes_integer_variable() {
        let mut parser = setup("i + n");
        assert_eq!(parser.parse_expr(), Ok(SemType::Number));
        assert_eq!(
            parser.gen.emissions(),
            &[
                Emission::PushVar("i".into()),
                Emission::PushVar("n".into()),
                Emission::NilCheckSecond,
                Emission::NilCheckTop,
                Emission::PromoteSecond,
                Emission::Operation(Operator::Plus),
            ]
        );
    }

    #[test]
    fn relational_promotes_left_integer() {
        let mut parser = setup("i < n");
        assert_eq!(parser.parse_expr(), Ok(SemType::Boolean));
        assert_eq!(
            parser.gen.emissions(),
            &[
                Emission::PushVar("i".into()),
                Emission::PushVar("n".into()),
                Emission::NilCheckSecond,
                Emission::NilCheckTop,
                Emission::PromoteSecond,
                Emission::Operation(Operator::Lt),
            ]
        );
    }

    #[test]
    fn equality_promotes_right_integer() {
        let mut parser = setup("n == i");
        assert_eq!(parser.parse_expr(), Ok(SemType::Boolean));
        assert_eq!(
            parser.gen.emissions(),
            &[
                Emission::PushVar("n".into()),
                Emission::PushVar("i".into()),
                Emission::PromoteTop,
                Emission::Operation(Operator::Eq),
            ]
        );
    }

    #[test]
    fn parentheses_are_transparent() {
        let mut parser = setup("(((1)))");
        assert_eq!(parser.parse_expr(), Ok(SemType::Integer));
        assert_eq!(parser.gen.emissions(), &[int(1)]);

        let mut parser = setup("(1 + 2) * 3");
        assert_eq!(parser.parse_expr(), Ok(SemType::Integer));
        assert_eq!(
            parser.gen.emissions()[..3],
            [int(1), int(2), Emission::NilCheckSecond]
        );
    }

    #[test]
    fn division() {
        let mut parser = setup("5 / 2");
        assert_eq!(parser.parse_expr(), Ok(SemType::Number));
        let checks = parser
            .gen
            .emissions()
            .iter()
            .filter(|e| **e == Emission::ZeroDivCheck)
            .count();
        assert_eq!(checks, 1);

        let mut parser = setup("7 // 2");
        assert_eq!(parser.parse_expr(), Ok(SemType::Integer));
    }

    #[test]
    fn zero_literal_divisor() {
        for src in ["5 / 0", "5 // 0", "n / 0.0", "i // (0)"] {
            let mut parser = setup(src);
            let err = parser.parse_expr().unwrap_err();
            assert!(matches!(err, ErrorKind::ZeroDivision(_)), "{src}");
            assert!(!parser.gen.emissions().contains(&Emission::ZeroDivCheck));
        }

        // only plain values count as literals
        let mut parser = setup("5 / (1 - 1)");
        assert_eq!(parser.parse_expr(), Ok(SemType::Number));
    }

    #[test]
    fn equality_with_nil() {
        for src in ["1 == nil", "nil ~= s"] {
            let mut parser = setup(src);
            assert_eq!(parser.parse_expr(), Ok(SemType::Boolean));
            assert!(!parser.gen.emissions().contains(&Emission::NilCheckTop));
        }

        let mut parser = setup("b == true");
        assert_eq!(parser.parse_expr(), Ok(SemType::Boolean));
    }

    #[test]
    fn type_errors() {
        for src in ["1 < nil", "s + 1", "\"a\" .. 1", "n // 2", "#i", "s == 1"] {
            let mut parser = setup(src);
            let err = parser.parse_expr().unwrap_err();
            assert!(matches!(err, ErrorKind::ExprType(_)), "{src}: {err:?}");
        }
    }

    #[test]
    fn strlen_is_integer() {
        let mut parser = setup("#s + 1");
        assert_eq!(parser.parse_expr(), Ok(SemType::Integer));
    }

    #[test]
    fn undefined_operands() {
        let mut parser = setup("x + 1");
        assert_eq!(
            parser.parse_expr(),
            Err(ErrorKind::Undefined("`x` is not defined".into()))
        );

        let mut parser = setup("f + 1");
        let sig = Signature::new(vec![], vec![VarType::Integer]);
        parser.scopes.define_function("f", sig).unwrap();
        assert_eq!(
            parser.parse_expr(),
            Err(ErrorKind::Semantic("`f` is a function, not a variable".into()))
        );
    }

    #[test]
    fn identifier_after_operand_is_left_in_stream() {
        let mut parser = setup("i s = 1");
        assert_eq!(parser.parse_expr(), Ok(SemType::Integer));
        assert_eq!(parser.tokens.next_token(), Ok(Token::Id("s".into())));
        assert_eq!(parser.tokens.next_token(), Ok(Token::Assign));
    }

    #[test]
    fn keyword_ends_expression() {
        let mut parser = setup("i < 10 then");
        assert_eq!(parser.parse_expr(), Ok(SemType::Boolean));
        assert_eq!(
            parser.tokens.next_token(),
            Ok(Token::Kw(Keyword::Then))
        );
    }

    #[test]
    fn syntax_errors() {
        for src in ["(1", "1 +", "", "1 < 2 < 3", "1 2", "()", "then"] {
            let mut parser = setup(src);
            let err = parser.parse_expr().unwrap_err();
            assert!(matches!(err, ErrorKind::Syntax(_)), "{src}: {err:?}");
        }
    }
}
