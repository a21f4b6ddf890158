use std::rc::Rc;

use crate::{
    codegen::{Argument, Generator},
    error::{ErrorKind, PResult},
    syntax::{
        expr_stack::Operand,
        precedence::Class,
        scope::{Identifier, ScopeStack, Signature},
        source::TokenStream,
        token::{Keyword, Token},
        types::{SemType, VarType},
        ExprParser,
    },
};

pub(crate) struct Parser<'src, G> {
    pub(super) tokens: TokenStream<'src>,
    pub(super) scopes: ScopeStack,
    pub(super) gen: G,
    function: Option<Rc<Identifier>>,
}

impl<'src, G: Generator> Parser<'src, G> {
    pub fn new(src: &'src str, gen: G) -> Self {
        Self {
            tokens: TokenStream::new(src),
            scopes: ScopeStack::new(),
            gen,
            function: None,
        }
    }

    /// Parses the whole program and hands back the generator.
    pub fn parse_program(mut self) -> PResult<G> {
        loop {
            match self.tokens.next_token()? {
                Token::End => break,
                Token::Kw(Keyword::Require) => match self.tokens.next_token()? {
                    Token::Str(_) => (),
                    other => {
                        return Err(ErrorKind::Syntax(format!(
                            "Expected module name, found {other}"
                        )))
                    }
                },
                Token::Kw(Keyword::Global) => self.parse_declaration()?,
                Token::Kw(Keyword::Function) => self.parse_function()?,
                Token::Id(id) => {
                    self.expect(Token::LParen)?;
                    self.parse_call(&id)?;
                }
                other => {
                    return Err(ErrorKind::Syntax(format!(
                        "Expected top-level statement, found {other}"
                    )))
                }
            }
        }

        if let Some(name) = self.scopes.undefined_functions().first() {
            return Err(ErrorKind::Undefined(format!(
                "`{name}` is declared but never defined"
            )));
        }

        Ok(self.gen)
    }

    /// `global id : function(types) [: types]`
    fn parse_declaration(&mut self) -> PResult<()> {
        let id = self.parse_id()?;
        self.expect(Token::Colon)?;
        self.expect(Token::Kw(Keyword::Function))?;
        self.expect(Token::LParen)?;

        let mut params = vec![];
        if let Token::RParen = self.tokens.peek()? {
            self.eat()?;
        } else {
            loop {
                params.push(self.parse_type()?);
                match self.tokens.next_token()? {
                    Token::RParen => break,
                    Token::Comma => (),
                    other => {
                        return Err(ErrorKind::Syntax(format!(
                            "Expected `,` or `)`, found {other}"
                        )))
                    }
                }
            }
        }

        let rets = self.parse_ret_types()?;
        let func = self.scopes.declare_function(&id, Signature::new(params, rets))?;
        log::debug!("declaration `{id}` => {:?}", func.kind);
        Ok(())
    }

    fn parse_function(&mut self) -> PResult<()> {
        let id = self.parse_id()?;
        self.expect(Token::LParen)?;
        let params = self.parse_fn_params()?;
        let rets = self.parse_ret_types()?;

        let sig = Signature::new(params.iter().map(|(_, ty)| *ty).collect(), rets);
        let func = self.scopes.define_function(&id, sig)?;
        log::debug!("function `{id}` => {:?}", func.kind);

        self.scopes.push_scope();
        let mut declared = vec![];
        for (name, ty) in &params {
            declared.push(self.scopes.declare_variable(name, *ty)?);
        }
        let param_refs: Vec<&Identifier> = declared.iter().map(|p| p.as_ref()).collect();
        self.gen.function_start(&func, &param_refs);

        self.function = Some(Rc::clone(&func));
        self.parse_block(&[Keyword::End])?;
        self.function = None;

        self.gen.function_end(&func);
        self.scopes.pop_scope()
    }

    fn parse_fn_params(&mut self) -> PResult<Vec<(String, VarType)>> {
        let mut params = vec![];

        if let Token::RParen = self.tokens.peek()? {
            self.eat()?;
            return Ok(params);
        }

        loop {
            let name = self.parse_id()?;
            self.expect(Token::Colon)?;
            let ty = self.parse_type()?;
            params.push((name, ty));

            match self.tokens.next_token()? {
                Token::RParen => break,
                Token::Comma => (),
                other => {
                    return Err(ErrorKind::Syntax(format!(
                        "Expected `,` or `)`, found {other}"
                    )))
                }
            }
        }
        Ok(params)
    }

    /// Optional `: type, ...` after a parameter list.
    fn parse_ret_types(&mut self) -> PResult<Vec<VarType>> {
        let mut rets = vec![];
        if let Token::Colon = self.tokens.peek()? {
            self.eat()?;
            loop {
                rets.push(self.parse_type()?);
                match self.tokens.peek()? {
                    Token::Comma => self.eat()?,
                    _ => break,
                }
            }
        }
        Ok(rets)
    }

    /// Parses statements in a fresh scope until one of `terminators` and
    /// returns the keyword that ended the block.
    fn parse_block(&mut self, terminators: &[Keyword]) -> PResult<Keyword> {
        self.scopes.push_scope();
        log::trace!("entering block at depth {}", self.scopes.depth());

        let terminator = loop {
            match self.tokens.peek()? {
                Token::Kw(kw) if terminators.contains(kw) => {
                    let kw = *kw;
                    self.eat()?;
                    break kw;
                }
                Token::End => {
                    return Err(ErrorKind::Syntax(
                        "Expected statement or `end`, found EOF".into(),
                    ))
                }
                _ => self.parse_stmt()?,
            }
        };

        self.scopes.pop_scope()?;
        Ok(terminator)
    }

    fn parse_stmt(&mut self) -> PResult<()> {
        match self.tokens.next_token()? {
            Token::Kw(Keyword::Local) => {
                let id = self.parse_id()?;
                self.expect(Token::Colon)?;
                let ty = self.parse_type()?;

                if let Token::Assign = self.tokens.peek()? {
                    self.eat()?;
                } else {
                    self.declare_local(&id, ty)?;
                    return Ok(());
                }

                if let Some(func) = self.peek_function()? {
                    let promotes = self.returned_promotions(&func, &[(id.as_str(), ty)])?;
                    self.eat()?;
                    self.expect(Token::LParen)?;
                    self.parse_call(&func.name)?;

                    let var = self.declare_local(&id, ty)?;
                    self.assign_returned(&[var.as_ref()], &promotes);
                    return Ok(());
                }

                let expr_ty = self.parse_expr()?;
                let promote = self.check_assign(expr_ty, ty, &id)?;
                let var = self.declare_local(&id, ty)?;
                if promote {
                    self.gen.promote_top_to_number();
                }
                self.gen.assign_top(&var);
                Ok(())
            }
            Token::Id(id) => match self.tokens.next_token()? {
                Token::LParen => self.parse_call(&id).map(|_| ()),
                token @ (Token::Assign | Token::Comma) => {
                    self.tokens.push_back(token)?;
                    self.parse_assignment(&id)
                }
                other => Err(ErrorKind::Syntax(format!(
                    "Expected `=`, `,` or `(`, found {other}"
                ))),
            },
            Token::Kw(Keyword::If) => {
                self.parse_expr()?;
                self.expect(Token::Kw(Keyword::Then))?;

                let label = self.gen.if_start();
                let terminator = self.parse_block(&[Keyword::Else, Keyword::End])?;
                self.gen.if_else(label);
                if terminator == Keyword::Else {
                    self.parse_block(&[Keyword::End])?;
                }
                self.gen.if_end(label);
                Ok(())
            }
            Token::Kw(Keyword::While) => {
                let label = self.gen.while_start();
                self.parse_expr()?;
                self.expect(Token::Kw(Keyword::Do))?;

                self.gen.while_cond(label);
                self.parse_block(&[Keyword::End])?;
                self.gen.while_end(label);
                Ok(())
            }
            Token::Kw(Keyword::Return) => self.parse_return(),
            other => Err(ErrorKind::Syntax(format!(
                "Expected statement, found {other}"
            ))),
        }
    }

    fn declare_local(&mut self, id: &str, ty: VarType) -> PResult<Rc<Identifier>> {
        let var = self.scopes.declare_variable(id, ty)?;
        log::debug!("{id} => {var:?}");
        self.gen.declare_var(&var);
        Ok(var)
    }

    /// `a, b = e1, e2` or `a, b = f(...)`, from the first comma or `=`.
    fn parse_assignment(&mut self, first: &str) -> PResult<()> {
        let mut targets = vec![self.assign_target(first)?];
        while let Token::Comma = self.tokens.peek()? {
            self.eat()?;
            let id = self.parse_id()?;
            targets.push(self.assign_target(&id)?);
        }
        self.expect(Token::Assign)?;

        if let Some(func) = self.peek_function()? {
            let typed: Vec<(&str, VarType)> = targets
                .iter()
                .map(|(var, ty)| (var.name.as_str(), *ty))
                .collect();
            let promotes = self.returned_promotions(&func, &typed)?;
            self.eat()?;
            self.expect(Token::LParen)?;
            self.parse_call(&func.name)?;

            let vars: Vec<&Identifier> = targets.iter().map(|(var, _)| var.as_ref()).collect();
            self.assign_returned(&vars, &promotes);
            return Ok(());
        }

        // All values are evaluated before the first one is stored.
        for (k, (var, ty)) in targets.iter().enumerate() {
            if k > 0 && self.tokens.next_token()? != Token::Comma {
                return Err(ErrorKind::AssignType(format!(
                    "{} values needed, found {k}",
                    targets.len()
                )));
            }
            let expr_ty = self.parse_expr()?;
            if self.check_assign(expr_ty, *ty, &var.name)? {
                self.gen.promote_top_to_number();
            }
        }
        if let Token::Comma = self.tokens.peek()? {
            return Err(ErrorKind::AssignType(format!(
                "more than {} values to assign",
                targets.len()
            )));
        }

        for (var, _) in targets.iter().rev() {
            self.gen.assign_top(var);
        }
        Ok(())
    }

    fn assign_target(&self, id: &str) -> PResult<(Rc<Identifier>, VarType)> {
        let var = self
            .scopes
            .find_variable(id)
            .ok_or_else(|| ErrorKind::Undefined(format!("Undefined variable `{id}`")))?;
        let ty = var.var_type().ok_or_else(|| {
            ErrorKind::Internal(format!("`{id}` resolved to a non-variable"))
        })?;
        Ok((var, ty))
    }

    /// The function named by the next token when it starts a call rather
    /// than an expression.
    fn peek_function(&mut self) -> PResult<Option<Rc<Identifier>>> {
        let func = match self.tokens.peek()? {
            Token::Id(name) => self.scopes.find(name).filter(|id| id.signature().is_some()),
            _ => None,
        };
        Ok(func)
    }

    /// Checks the leading return values of `func` against `targets` and tells
    /// which of them need a promotion.
    fn returned_promotions(
        &self,
        func: &Identifier,
        targets: &[(&str, VarType)],
    ) -> PResult<Vec<bool>> {
        let rets = func.signature().map(|sig| sig.rets.as_slice()).unwrap_or_default();
        if rets.len() < targets.len() {
            return Err(ErrorKind::Signature(format!(
                "`{}` returns {} values, {} needed",
                func.name,
                rets.len(),
                targets.len()
            )));
        }

        targets
            .iter()
            .zip(rets)
            .map(|((name, target), ret)| {
                SemType::from(*ret).assignable_to(*target).ok_or_else(|| {
                    ErrorKind::Signature(format!(
                        "`{}` returns {ret}, cannot assign it to `{name}` of type {target}",
                        func.name
                    ))
                })
            })
            .collect()
    }

    fn assign_returned(&mut self, vars: &[&Identifier], promotes: &[bool]) {
        for (k, (var, promote)) in vars.iter().zip(promotes).enumerate() {
            self.gen.push_returned(k + 1);
            if *promote {
                self.gen.promote_top_to_number();
            }
            self.gen.assign_top(var);
        }
    }

    fn parse_return(&mut self) -> PResult<()> {
        let func = match &self.function {
            Some(func) => Rc::clone(func),
            None => return Err(ErrorKind::Internal("`return` outside of a function".into())),
        };
        let rets = func.signature().map(|sig| sig.rets.clone()).unwrap_or_default();

        let starts_value = match self.tokens.peek()? {
            // without return values an identifier starts the next statement
            Token::Id(_) => !rets.is_empty(),
            token => matches!(
                Class::of_token(token),
                Some(Class::Operand | Class::LParen | Class::Strlen)
            ),
        };
        if !starts_value {
            self.gen.return_values(0);
            return Ok(());
        }
        if rets.is_empty() {
            return Err(ErrorKind::Signature(format!(
                "`{}` does not return a value",
                func.name
            )));
        }

        for (k, ret) in rets.iter().enumerate() {
            if k > 0 && self.tokens.next_token()? != Token::Comma {
                return Err(ErrorKind::Signature(format!(
                    "`{}` returns {} values, found {k}",
                    func.name,
                    rets.len()
                )));
            }
            let ty = self.parse_expr()?;
            match ty.assignable_to(*ret) {
                Some(true) => self.gen.promote_top_to_number(),
                Some(false) => (),
                None => {
                    return Err(ErrorKind::Signature(format!(
                        "`{}` returns {ret}, found {ty}",
                        func.name
                    )))
                }
            }
        }
        if let Token::Comma = self.tokens.peek()? {
            return Err(ErrorKind::Signature(format!(
                "`{}` returns {} values, found more",
                func.name,
                rets.len()
            )));
        }

        self.gen.return_values(rets.len());
        Ok(())
    }

    /// Parses call arguments after the opening parenthesis.
    fn parse_call(&mut self, id: &str) -> PResult<Rc<Identifier>> {
        let (func, sig) = self
            .scopes
            .find(id)
            .and_then(|func| {
                let sig = func.signature().cloned()?;
                Some((func, sig))
            })
            .ok_or_else(|| ErrorKind::Undefined(format!("Undefined function `{id}`")))?;

        let mut operands = vec![];
        if let Token::RParen = self.tokens.peek()? {
            self.eat()?;
        } else {
            loop {
                let token = self.tokens.next_token()?;
                operands.push(self.resolve_operand(token)?);

                match self.tokens.next_token()? {
                    Token::RParen => break,
                    Token::Comma => (),
                    other => {
                        return Err(ErrorKind::Syntax(format!(
                            "Expected `,` or `)`, found {other}"
                        )))
                    }
                }
            }
        }

        let args = if sig.variadic {
            operands
                .into_iter()
                .map(|operand| Argument {
                    operand,
                    promote: false,
                })
                .collect()
        } else {
            self.check_args(id, &sig.params, operands)?
        };

        self.gen.call(&func, &args);
        Ok(func)
    }

    fn check_args(
        &self,
        id: &str,
        params: &[VarType],
        operands: Vec<Operand>,
    ) -> PResult<Vec<Argument>> {
        if params.len() != operands.len() {
            return Err(ErrorKind::Signature(format!(
                "`{id}` takes {} arguments, found {}",
                params.len(),
                operands.len()
            )));
        }

        let mut args = vec![];
        for (operand, param) in operands.into_iter().zip(params) {
            let ty = operand.sem_type()?;
            match ty.assignable_to(*param) {
                Some(promote) => args.push(Argument { operand, promote }),
                None => {
                    return Err(ErrorKind::Signature(format!(
                        "`{id}` expects {param}, found {ty}"
                    )))
                }
            }
        }
        Ok(args)
    }

    /// Whether storing `ty` into a `target` variable needs a promotion.
    fn check_assign(&self, ty: SemType, target: VarType, id: &str) -> PResult<bool> {
        ty.assignable_to(target).ok_or_else(|| {
            ErrorKind::AssignType(format!("cannot assign {ty} to `{id}` of type {target}"))
        })
    }

    /// Turns an operand token into a value, resolving identifiers to the
    /// nearest variable declaration.
    pub(super) fn resolve_operand(&self, token: Token) -> PResult<Operand> {
        match token {
            Token::Integer(v) => Ok(Operand::Integer(v)),
            Token::Number(v) => Ok(Operand::Number(v)),
            Token::Str(s) => Ok(Operand::Str(s)),
            Token::Kw(Keyword::Nil) => Ok(Operand::Nil),
            Token::Kw(Keyword::True) => Ok(Operand::Boolean(true)),
            Token::Kw(Keyword::False) => Ok(Operand::Boolean(false)),
            Token::Id(id) => match self.scopes.find_variable(&id) {
                Some(var) => Ok(Operand::Var(var)),
                None if self.scopes.find(&id).is_some() => Err(ErrorKind::Semantic(format!(
                    "`{id}` is a function, not a variable"
                ))),
                None => Err(ErrorKind::Undefined(format!("`{id}` is not defined"))),
            },
            other => Err(ErrorKind::Syntax(format!(
                "Expected operand, found {other}"
            ))),
        }
    }

    fn parse_id(&mut self) -> PResult<String> {
        match self.tokens.next_token()? {
            Token::Id(id) => Ok(id),
            other => Err(ErrorKind::Syntax(format!("Expected id, found {other}"))),
        }
    }

    fn parse_type(&mut self) -> PResult<VarType> {
        match self.tokens.next_token()? {
            Token::Kw(kw) => VarType::from_keyword(kw).ok_or_else(|| {
                ErrorKind::Syntax(format!("Expected type, found {}", Token::Kw(kw)))
            }),
            other => Err(ErrorKind::Syntax(format!("Expected type, found {other}"))),
        }
    }

    pub(super) fn expect(&mut self, expected: Token) -> PResult<()> {
        let token = self.tokens.next_token()?;
        if token == expected {
            return Ok(());
        }
        Err(ErrorKind::Syntax(format!(
            "Expected {expected}, found {token} on line {}",
            self.tokens.line()
        )))
    }

    pub(super) fn eat(&mut self) -> PResult<()> {
        self.tokens.next_token().map(|_| ())
    }
}
