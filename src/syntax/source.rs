use crate::error::{ErrorKind, PResult};

use super::{lexer::Lexer, token::Token};

/// Token source shared by the statement parser and the expression parser.
///
/// Holds at most one pushed-back token.
pub(crate) struct TokenStream<'src> {
    lexer: Lexer<'src>,
    pending: Option<Token>,
}

impl<'src> TokenStream<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            lexer: Lexer::new(src),
            pending: None,
        }
    }

    pub fn next_token(&mut self) -> PResult<Token> {
        if let Some(token) = self.pending.take() {
            return Ok(token);
        }

        match self.lexer.next() {
            None => Ok(Token::End),
            Some(Token::Invalid(s)) => Err(ErrorKind::Lexical(format!(
                "unexpected `{s}` on line {}",
                self.lexer.line()
            ))),
            Some(token) => Ok(token),
        }
    }

    pub fn push_back(&mut self, token: Token) -> PResult<()> {
        if let Some(pending) = &self.pending {
            return Err(ErrorKind::Internal(format!(
                "cannot push back {token}, {pending} is already pending"
            )));
        }
        self.pending = Some(token);
        Ok(())
    }

    pub fn peek(&mut self) -> PResult<&Token> {
        if self.pending.is_none() {
            let token = self.next_token()?;
            self.pending = Some(token);
        }
        match &self.pending {
            Some(token) => Ok(token),
            None => Err(ErrorKind::Internal("token buffer is empty".into())),
        }
    }

    pub fn line(&self) -> usize {
        self.lexer.line()
    }
}

#[cfg(test)]
mod test {
    use super::TokenStream;
    use crate::{error::ErrorKind, syntax::token::Token};

    #[test]
    fn push_back_once() {
        let mut tokens = TokenStream::new("a b");
        let a = tokens.next_token().unwrap();
        tokens.push_back(a.clone()).unwrap();

        let err = tokens.push_back(Token::Comma).unwrap_err();
        assert!(matches!(err, ErrorKind::Internal(_)));

        assert_eq!(tokens.next_token().unwrap(), a);
        assert_eq!(tokens.next_token().unwrap(), Token::Id("b".into()));
        assert_eq!(tokens.next_token().unwrap(), Token::End);
        assert_eq!(tokens.next_token().unwrap(), Token::End);
    }

    #[test]
    fn invalid_is_lexical_error() {
        let mut tokens = TokenStream::new("\n @");
        let err = tokens.next_token().unwrap_err();
        assert_eq!(err, ErrorKind::Lexical("unexpected `@` on line 2".into()));
    }

    #[test]
    fn peek_keeps_token() {
        let mut tokens = TokenStream::new("x");
        assert_eq!(tokens.peek().unwrap(), &Token::Id("x".into()));
        assert_eq!(tokens.next_token().unwrap(), Token::Id("x".into()));
    }
}
