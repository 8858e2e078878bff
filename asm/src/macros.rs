use crate::token::{Pos, SourceLine, Token, TokenKind};
use indexmap::IndexMap;
use std::collections::HashSet;

/// A recorded `.macro` definition, identified by name and arity.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<SourceLine>,
    /// Labels defined inside the body; renamed on every expansion.
    pub locals: HashSet<String>,
    pub pos: Pos,
    count: usize,
}

impl Macro {
    pub fn new(name: &str, params: Vec<String>, pos: Pos) -> Self {
        Macro {
            name: name.to_string(),
            params,
            body: Vec::new(),
            locals: HashSet::new(),
            pos,
            count: 0,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Number of expansions so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Appends a body line, remembering the labels it defines.
    pub fn push_line(&mut self, line: SourceLine) {
        let mut tokens = line.tokens.as_slice();
        while let [Token {
            kind: TokenKind::Identifier(name),
            ..
        }, Token {
            kind: TokenKind::Colon,
            ..
        }, rest @ ..] = tokens
        {
            self.locals.insert(name.clone());
            tokens = rest;
        }
        self.body.push(line);
    }

    /// First parameter used in the body but missing from the signature.
    pub fn undefined_param(&self) -> Option<(&SourceLine, &Token)> {
        self.body.iter().find_map(|line| {
            line.tokens
                .iter()
                .find(|t| matches!(&t.kind, TokenKind::MacroParameter(p) if !self.params.contains(p)))
                .map(|t| (line, t))
        })
    }

    fn prefix(&self) -> String {
        format!("{}:{}@{}_", self.name, self.arity(), self.count)
    }

    /// A fresh copy of the body with local labels renamed and parameters
    /// replaced by `args`. Every call bumps the expansion counter.
    pub fn expand(&mut self, args: &[Token]) -> Vec<SourceLine> {
        self.count += 1;
        let prefix = self.prefix();
        log::debug!("expanding macro {} as {}", self.name, prefix);
        self.body
            .iter()
            .map(|line| {
                let tokens = line
                    .tokens
                    .iter()
                    .map(|token| match &token.kind {
                        TokenKind::Identifier(name) if self.locals.contains(name) => Token::new(
                            TokenKind::Identifier(format!("{}{}", prefix, name)),
                            token.pos.clone(),
                        ),
                        TokenKind::MacroParameter(p) => {
                            match self.params.iter().position(|q| q == p).and_then(|i| args.get(i)) {
                                Some(arg) => Token::new(arg.kind.clone(), token.pos.clone()),
                                None => token.clone(),
                            }
                        }
                        _ => token.clone(),
                    })
                    .collect();
                SourceLine {
                    tokens,
                    ..line.clone()
                }
            })
            .collect()
    }
}

/// Macro table keyed by `(name, arity)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Macros {
    macros: IndexMap<(String, usize), Macro>,
}

impl Macros {
    pub fn contains(&self, name: &str, arity: usize) -> bool {
        self.macros.contains_key(&(name.to_string(), arity))
    }

    /// Returns `false` when the signature is taken.
    pub fn insert(&mut self, mac: Macro) -> bool {
        let key = (mac.name.clone(), mac.arity());
        if self.macros.contains_key(&key) {
            return false;
        }
        log::debug!("macro {} with {} parameters defined", key.0, key.1);
        self.macros.insert(key, mac);
        true
    }

    pub fn get_mut(&mut self, name: &str, arity: usize) -> Option<&mut Macro> {
        self.macros.get_mut(&(name.to_string(), arity))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Macro> {
        self.macros.values()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::error::Diagnostics;
    use crate::lexer::Lexer;
    use arch::reg::Reg;

    fn lines(src: &str) -> Vec<SourceLine> {
        let mut diags = Diagnostics::default();
        Lexer::new("m.s", src, Classifier::default())
            .parse(&mut diags)
            .unwrap()
    }

    fn looper() -> Macro {
        let mut mac = Macro::new("loop", vec!["n".into()], Pos::default());
        for line in lines("L: beq %n, %n, L") {
            mac.push_line(line);
        }
        mac
    }

    #[test]
    fn locals_are_collected() {
        let mac = looper();
        assert!(mac.locals.contains("L"));
        assert!(mac.undefined_param().is_none());
    }

    #[test]
    fn expansions_are_hygienic() {
        let mut mac = looper();
        let arg = [Token::new(TokenKind::Register(Reg::T0), Pos::default())];
        let first = mac.expand(&arg);
        let second = mac.expand(&arg);
        assert_eq!(mac.count(), 2);
        assert_eq!(first[0].leading_label(), Some("loop:1@1_L"));
        assert_eq!(second[0].leading_label(), Some("loop:1@2_L"));
        assert_eq!(first[0].tokens[3].kind, TokenKind::Register(Reg::T0));
        assert_eq!(
            second[0].tokens.last().unwrap().kind,
            TokenKind::Identifier("loop:1@2_L".into())
        );
    }

    #[test]
    fn global_references_are_kept() {
        let mut mac = Macro::new("go", vec![], Pos::default());
        for line in lines("j main") {
            mac.push_line(line);
        }
        let out = mac.expand(&[]);
        assert_eq!(out[0].tokens[1].kind, TokenKind::Identifier("main".into()));
    }

    #[test]
    fn undefined_parameter_is_reported() {
        let mut mac = Macro::new("bad", vec!["a".into()], Pos::default());
        for line in lines("add %a, %a, %b") {
            mac.push_line(line);
        }
        let (line, token) = mac.undefined_param().unwrap();
        assert_eq!(line.line, 1);
        assert_eq!(token.kind, TokenKind::MacroParameter("b".into()));
    }

    #[test]
    fn table_is_keyed_by_arity() {
        let mut macros = Macros::default();
        assert!(macros.insert(Macro::new("m", vec![], Pos::default())));
        assert!(macros.insert(Macro::new("m", vec!["x".into()], Pos::default())));
        assert!(!macros.insert(Macro::new("m", vec!["y".into()], Pos::default())));
        assert!(macros.contains("m", 1));
        assert!(!macros.contains("m", 2));
        assert_eq!(macros.len(), 2);
    }
}
