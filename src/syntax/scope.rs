use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
};

use crate::error::{ErrorKind, PResult};

use super::{types::VarType, LocalIndex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Signature {
    pub params: Vec<VarType>,
    /// Takes any number of terms of any type instead of `params`.
    pub variadic: bool,
    pub rets: Vec<VarType>,
}

impl Signature {
    pub fn new(params: Vec<VarType>, rets: Vec<VarType>) -> Self {
        Self {
            params,
            variadic: false,
            rets,
        }
    }

    pub fn variadic() -> Self {
        Self {
            params: vec![],
            variadic: true,
            rets: vec![],
        }
    }
}

/// Runtime library functions, visible in every program.
fn builtins() -> [(&'static str, Signature); 8] {
    let string = VarType::String;
    let integer = VarType::Integer;
    let number = VarType::Number;

    [
        ("reads", Signature::new(vec![], vec![string])),
        ("readi", Signature::new(vec![], vec![integer])),
        ("readn", Signature::new(vec![], vec![number])),
        ("write", Signature::variadic()),
        ("tointeger", Signature::new(vec![number], vec![integer])),
        (
            "substr",
            Signature::new(vec![string, number, number], vec![string]),
        ),
        ("ord", Signature::new(vec![string, integer], vec![integer])),
        ("chr", Signature::new(vec![integer], vec![string])),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IdentKind {
    Variable(VarType),
    Function(Signature),
}

/// A declaration owned by the scope that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identifier {
    pub name: String,
    /// Unique per compilation, so shadowed names stay distinct in the output.
    pub index: LocalIndex,
    pub kind: IdentKind,
}

impl Identifier {
    pub fn var_type(&self) -> Option<VarType> {
        match &self.kind {
            IdentKind::Variable(ty) => Some(*ty),
            IdentKind::Function(_) => None,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        match &self.kind {
            IdentKind::Function(sig) => Some(sig),
            IdentKind::Variable(_) => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub(crate) struct ScopeEnv {
    locals: HashMap<String, Rc<Identifier>>,
}

impl ScopeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: Identifier) -> PResult<Rc<Identifier>> {
        if self.locals.contains_key(&id.name) {
            return Err(ErrorKind::Undefined(format!(
                "`{}` is already defined in current scope",
                id.name
            )));
        }

        let id = Rc::new(id);
        self.locals.insert(id.name.clone(), Rc::clone(&id));
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Identifier>> {
        self.locals.get(name)
    }
}

/// Nested scopes, the global one at the bottom.
#[derive(Debug)]
pub(crate) struct ScopeStack {
    scopes: Vec<ScopeEnv>,
    /// Functions declared with `global` whose body hasn't been seen yet.
    pending: HashSet<String>,
    next_index: LocalIndex,
}

impl ScopeStack {
    /// A stack holding only the global scope with the builtin functions.
    pub fn new() -> Self {
        let mut stack = Self {
            scopes: vec![ScopeEnv::new()],
            pending: HashSet::new(),
            next_index: 0,
        };

        for (name, sig) in builtins() {
            let id = stack.make(name, IdentKind::Function(sig));
            stack.scopes[0].locals.insert(name.to_string(), Rc::new(id));
        }
        stack
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(ScopeEnv::new());
    }

    pub fn pop_scope(&mut self) -> PResult<()> {
        if self.scopes.len() == 1 {
            return Err(ErrorKind::Internal("cannot pop the global scope".into()));
        }
        self.scopes.pop();
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn declare_variable(&mut self, name: &str, ty: VarType) -> PResult<Rc<Identifier>> {
        self.declare(name, IdentKind::Variable(ty))
    }

    /// Declares a function whose definition follows later in the program.
    pub fn declare_function(&mut self, name: &str, sig: Signature) -> PResult<Rc<Identifier>> {
        let id = self.make(name, IdentKind::Function(sig));
        let id = self.scopes[0].add(id)?;
        self.pending.insert(name.to_string());
        Ok(id)
    }

    /// Defines a function, completing its declaration if there is one. The
    /// signature must repeat the declared one.
    pub fn define_function(&mut self, name: &str, sig: Signature) -> PResult<Rc<Identifier>> {
        if !self.pending.contains(name) {
            let id = self.make(name, IdentKind::Function(sig));
            return self.scopes[0].add(id);
        }

        match self.scopes[0].get(name) {
            Some(declared) if declared.signature() == Some(&sig) => {
                let declared = Rc::clone(declared);
                self.pending.remove(name);
                Ok(declared)
            }
            Some(_) => Err(ErrorKind::Undefined(format!(
                "`{name}` does not match its declaration"
            ))),
            None => Err(ErrorKind::Internal(format!(
                "declaration of `{name}` is gone"
            ))),
        }
    }

    /// Names declared with `global` and never defined, sorted.
    pub fn undefined_functions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pending.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn declare(&mut self, name: &str, kind: IdentKind) -> PResult<Rc<Identifier>> {
        let id = self.make(name, kind);
        match self.scopes.last_mut() {
            Some(scope) => scope.add(id),
            None => Err(ErrorKind::Internal("scope stack is empty".into())),
        }
    }

    fn make(&mut self, name: &str, kind: IdentKind) -> Identifier {
        let index = self.next_index;
        self.next_index += 1;
        Identifier {
            name: name.to_string(),
            index,
            kind,
        }
    }

    /// Innermost declaration of `name`, whatever its kind.
    pub fn find(&self, name: &str) -> Option<Rc<Identifier>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    /// Innermost declaration of `name` that is a variable. Functions of the
    /// same name in closer scopes are skipped.
    pub fn find_variable(&self, name: &str) -> Option<Rc<Identifier>> {
        self.scopes
            .iter()
            .rev()
            .filter_map(|scope| scope.get(name))
            .find(|id| id.var_type().is_some())
            .cloned()
    }
}
