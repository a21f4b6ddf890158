use std::{iter::Peekable, str::CharIndices};

use super::token::{Keyword, Operator, Token};

pub(crate) struct Lexer<'src> {
    src: &'src str,
    chars: Peekable<CharIndices<'src>>,
    line: usize,
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let token = match self.chars.next()? {
                (_, '+') => Token::Op(Operator::Plus),
                (_, '*') => Token::Op(Operator::Mul),
                (_, '#') => Token::Op(Operator::Strlen),
                (_, '(') => Token::LParen,
                (_, ')') => Token::RParen,
                (_, ':') => Token::Colon,
                (_, ',') => Token::Comma,
                (_, '/') => self.either('/', Operator::IntDiv, Operator::Div),
                (_, '<') => self.either('=', Operator::Le, Operator::Lt),
                (_, '>') => self.either('=', Operator::Ge, Operator::Gt),
                (_, '=') => {
                    if self.eat_if('=') {
                        Token::Op(Operator::Eq)
                    } else {
                        Token::Assign
                    }
                }
                (_, '~') => {
                    if self.eat_if('=') {
                        Token::Op(Operator::Ne)
                    } else {
                        Token::Invalid("~".into())
                    }
                }
                (_, '.') => {
                    if self.eat_if('.') {
                        Token::Op(Operator::Concat)
                    } else {
                        Token::Invalid(".".into())
                    }
                }
                (_, '-') => {
                    if self.eat_if('-') {
                        self.skip_comment();
                        continue;
                    }
                    Token::Op(Operator::Minus)
                }
                (_, '"') => self.read_string(),
                (_, '\n') => {
                    self.line += 1;
                    continue;
                }
                (_, c) if c.is_whitespace() => continue,
                (off, c) if c.is_ascii_digit() => self.read_number(off),
                (off, c) if Self::is_id_start(c) => self.read_id(off),
                (_, c) => Token::Invalid(c.to_string()),
            };
            return Some(token);
        }
    }
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            line: 1,
        }
    }

    /// Line of the most recently read character, starting at 1.
    pub fn line(&self) -> usize {
        self.line
    }

    #[inline]
    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn eat_if(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.bump();
            return true;
        }
        false
    }

    fn either(&mut self, second: char, long: Operator, short: Operator) -> Token {
        if self.eat_if(second) {
            Token::Op(long)
        } else {
            Token::Op(short)
        }
    }

    fn offset(&mut self) -> usize {
        match self.chars.peek() {
            Some(&(off, _)) => off,
            None => self.src.len(),
        }
    }

    fn slice_until<P>(&mut self, from_off: usize, predicate: P) -> &'src str
    where
        P: Fn(char) -> bool,
    {
        while let Some(&(off, c)) = self.chars.peek() {
            if predicate(c) {
                return &self.src[from_off..off];
            }
            self.bump();
        }
        &self.src[from_off..self.src.len()]
    }

    fn skip_digits(&mut self) -> usize {
        let mut count = 0;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.bump();
            count += 1;
        }
        count
    }

    fn read_number(&mut self, from_off: usize) -> Token {
        let mut is_float = false;
        self.skip_digits();

        if self.eat_if('.') {
            is_float = true;
            if self.skip_digits() == 0 {
                let end = self.offset();
                return Token::Invalid(self.src[from_off..end].to_string());
            }
        }

        if matches!(self.peek_char(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.bump();
            }
            if self.skip_digits() == 0 {
                let end = self.offset();
                return Token::Invalid(self.src[from_off..end].to_string());
            }
        }

        let end = self.offset();
        let s = &self.src[from_off..end];
        if is_float {
            match s.parse::<f64>() {
                Ok(v) => Token::Number(v),
                Err(_) => Token::Invalid(s.to_string()),
            }
        } else {
            match s.parse::<i64>() {
                Ok(v) => Token::Integer(v),
                Err(_) => Token::Invalid(s.to_string()),
            }
        }
    }

    fn read_id(&mut self, from_off: usize) -> Token {
        let s = self.slice_until(from_off, |c| !Self::is_id_part(c));
        match Keyword::from_str(s) {
            Some(kw) => Token::Kw(kw),
            None => Token::Id(s.to_string()),
        }
    }

    fn read_string(&mut self) -> Token {
        let mut value = String::new();

        loop {
            match self.bump() {
                None | Some('\n') => return Token::Invalid(format!("\"{value}")),
                Some('"') => return Token::Str(value),
                Some('\\') => match self.bump() {
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(d) if d.is_ascii_digit() => {
                        let mut code = d.to_digit(10).unwrap_or(0);
                        for _ in 0..2 {
                            match self.bump().and_then(|c| c.to_digit(10)) {
                                Some(digit) => code = code * 10 + digit,
                                None => return Token::Invalid(format!("\"{value}\\")),
                            }
                        }
                        match code {
                            1..=255 => value.push(char::from(code as u8)),
                            _ => return Token::Invalid(format!("\\{code:03}")),
                        }
                    }
                    other => {
                        let c = other.map(String::from).unwrap_or_default();
                        return Token::Invalid(format!("\\{c}"));
                    }
                },
                Some(c) if (c as u32) < 32 => return Token::Invalid(format!("\"{value}")),
                Some(c) => value.push(c),
            }
        }
    }

    /// Skips the rest of a comment whose leading `--` was already consumed.
    fn skip_comment(&mut self) {
        if self.eat_if('[') && self.eat_if('[') {
            let mut prev = '\0';
            while let Some(c) = self.bump() {
                if prev == ']' && c == ']' {
                    return;
                }
                prev = c;
            }
            return;
        }

        while let Some(c) = self.peek_char() {
            if c == '\n' {
                return;
            }
            self.bump();
        }
    }

    fn is_id_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_id_part(c: char) -> bool {
        Self::is_id_start(c) || c.is_ascii_digit()
    }
}

#[cfg(test)]
mod test {
    use super::{
        super::token::{Keyword, Operator, Token},
        Lexer,
    };

    fn tokenize_str(s: &str) -> Vec<Token> {
        Lexer::new(s).collect()
    }

    #[test]
    fn read_number() {
        let tokens = tokenize_str("48$7 1024 \n9.5\n8e2 1.5E-1");
        let expected = &[
            Token::Integer(48),
            Token::Invalid("$".into()),
            Token::Integer(7),
            Token::Integer(1024),
            Token::Number(9.5),
            Token::Number(800.0),
            Token::Number(0.15),
        ];

        assert_eq!(tokens, expected);
    }

    #[test]
    fn malformed_number() {
        assert_eq!(tokenize_str("1."), &[Token::Invalid("1.".into())]);
        assert_eq!(tokenize_str("2e+"), &[Token::Invalid("2e+".into())]);
    }

    #[test]
    fn read_operators() {
        use Operator::*;

        let tokens = tokenize_str("# * / // + - .. < <= > >= == ~= = : , ( )");
        let expected = &[
            Token::Op(Strlen),
            Token::Op(Mul),
            Token::Op(Div),
            Token::Op(IntDiv),
            Token::Op(Plus),
            Token::Op(Minus),
            Token::Op(Concat),
            Token::Op(Lt),
            Token::Op(Le),
            Token::Op(Gt),
            Token::Op(Ge),
            Token::Op(Eq),
            Token::Op(Ne),
            Token::Assign,
            Token::Colon,
            Token::Comma,
            Token::LParen,
            Token::RParen,
        ];

        assert_eq!(tokens, expected);
    }

    #[test]
    fn read_keywords_and_ids() {
        let tokens = tokenize_str("local x_1 : integer = nil");
        let expected = &[
            Token::Kw(Keyword::Local),
            Token::Id("x_1".into()),
            Token::Colon,
            Token::Kw(Keyword::Integer),
            Token::Assign,
            Token::Kw(Keyword::Nil),
        ];

        assert_eq!(tokens, expected);
    }

    #[test]
    fn read_string_escapes() {
        let tokens = tokenize_str(r#""a\"b\n\065" "unterminated"#);
        assert_eq!(
            tokens,
            &[
                Token::Str("a\"b\nA".into()),
                Token::Invalid("\"unterminated".into())
            ]
        );
    }

    #[test]
    fn skip_comments() {
        let mut lexer = Lexer::new("1 -- line\n2 --[[ block\n ]] 3 - 4");
        let tokens: Vec<Token> = lexer.by_ref().collect();
        assert_eq!(
            tokens,
            &[
                Token::Integer(1),
                Token::Integer(2),
                Token::Integer(3),
                Token::Op(Operator::Minus),
                Token::Integer(4),
            ]
        );
        assert_eq!(lexer.line(), 3);
    }

    #[test]
    fn long_comment_runs() {
        let src = format!("1{}2", "-- note\n".repeat(5_000));
        let mut lexer = Lexer::new(&src);
        let tokens: Vec<Token> = lexer.by_ref().collect();
        assert_eq!(tokens, &[Token::Integer(1), Token::Integer(2)]);
        assert_eq!(lexer.line(), 5_001);

        let blank = " \n".repeat(50_000);
        assert!(tokenize_str(&blank).is_empty());
    }
}
