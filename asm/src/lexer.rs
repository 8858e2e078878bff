use crate::classify::{unescape, Classifier};
use crate::error::{Diagnostic, Diagnostics, ErrorKind, Result};
use crate::token::{Pos, SourceLine, Token, TokenKind};
use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::Arc;

pub struct Lexer<'a> {
    file: Arc<str>,
    code: &'a str,
    classifier: Classifier,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &str, code: &'a str, classifier: Classifier) -> Self {
        Self {
            file: Arc::from(file),
            code,
            classifier,
        }
    }

    /// One [`SourceLine`] per physical line, numbered from 1. Empty lines are kept.
    pub fn parse(self, diags: &mut Diagnostics) -> Result<Vec<SourceLine>> {
        let mut lines = Vec::new();
        for (idx, text) in self.code.lines().enumerate() {
            let lexer = LineLexer::new(text, &self.file, idx + 1, &self.classifier);
            let tokens = lexer.parse(diags)?;
            lines.push(SourceLine {
                file: Arc::clone(&self.file),
                line: idx + 1,
                text: text.to_string(),
                tokens,
                depth: 0,
            });
        }
        Ok(lines)
    }
}

pub struct LineLexer<'a> {
    iter: Peekable<CharIndices<'a>>,
    text: &'a str,
    file: &'a Arc<str>,
    line: usize,
    classifier: &'a Classifier,
}

impl<'a> LineLexer<'a> {
    pub fn new(
        text: &'a str,
        file: &'a Arc<str>,
        line: usize,
        classifier: &'a Classifier,
    ) -> Self {
        Self {
            iter: text.char_indices().peekable(),
            text,
            file,
            line,
            classifier,
        }
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

impl<'a> LineLexer<'a> {
    fn peek_nth(&self, n: usize) -> Option<(usize, char)> {
        self.iter.clone().nth(n)
    }
    fn consume(&mut self) -> Option<(usize, char)> {
        self.iter.next()
    }
    fn pos(&self, idx: usize) -> Pos {
        Pos::new(self.file, self.line, idx + 1)
    }
    fn error(&self, kind: ErrorKind, idx: usize) -> Diagnostic {
        Diagnostic::error(kind, self.pos(idx), self.text)
    }

    /// Hands a finished word to the classifier.
    fn flush(
        &self,
        word: &mut String,
        start: usize,
        tokens: &mut Vec<Token>,
        diags: &mut Diagnostics,
    ) -> Result<()> {
        if !word.is_empty() {
            let token = self
                .classifier
                .classify(word, self.pos(start), self.text, diags)?;
            tokens.push(token);
            word.clear();
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Parser
// ----------------------------------------------------------------------------

impl<'a> LineLexer<'a> {
    pub fn parse(mut self, diags: &mut Diagnostics) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut word = String::new();
        let mut start = 0;
        while let Some((idx, ch0)) = self.peek_nth(0) {
            match ch0 {
                // Comment runs to the end of the line
                '#' => break,

                ch if ch.is_whitespace() || ch == ',' => {
                    self.flush(&mut word, start, &mut tokens, diags)?;
                    self.consume();
                }

                '"' => {
                    self.flush(&mut word, start, &mut tokens, diags)?;
                    tokens.push(self.parse_text()?);
                }

                '\'' => {
                    self.flush(&mut word, start, &mut tokens, diags)?;
                    let lexeme = self.parse_char()?;
                    let token = self
                        .classifier
                        .classify(&lexeme, self.pos(idx), self.text, diags)?;
                    tokens.push(token);
                }

                ':' | '(' | ')' => {
                    self.flush(&mut word, start, &mut tokens, diags)?;
                    self.consume();
                    let kind = match ch0 {
                        ':' => TokenKind::Colon,
                        '(' => TokenKind::LeftParen,
                        _ => TokenKind::RightParen,
                    };
                    tokens.push(Token::new(kind, self.pos(idx)));
                }

                '+' | '-' => {
                    let digit_follows = self
                        .peek_nth(1)
                        .is_some_and(|(_, ch1)| ch1.is_ascii_digit());

                    // Exponent sign inside a real literal
                    if digit_follows
                        && word.starts_with(|c: char| c.is_ascii_digit())
                        && !word.starts_with("0x")
                        && word.ends_with(|c| c == 'e' || c == 'E')
                    {
                        word.push(ch0);
                        self.consume();
                        continue;
                    }

                    self.flush(&mut word, start, &mut tokens, diags)?;
                    self.consume();
                    let after_ident =
                        matches!(tokens.last(), Some(t) if matches!(t.kind, TokenKind::Identifier(_)));
                    if digit_follows && !after_ident {
                        start = idx;
                        word.push(ch0);
                    } else {
                        let kind = if ch0 == '+' {
                            TokenKind::Plus
                        } else {
                            TokenKind::Minus
                        };
                        tokens.push(Token::new(kind, self.pos(idx)));
                    }
                }

                _ => {
                    if word.is_empty() {
                        start = idx;
                    }
                    word.push(ch0);
                    self.consume();
                }
            }
        }
        self.flush(&mut word, start, &mut tokens, diags)?;
        Ok(tokens)
    }

    // Text: "hoge\nfuga"
    fn parse_text(&mut self) -> Result<Token> {
        let Some((start, _)) = self.consume() else {
            unreachable!("parse_text called at end of line")
        };
        let mut value = String::new();
        loop {
            match self.consume() {
                None => return Err(self.error(ErrorKind::UnterminatedString, start)),
                Some((_, '"')) => break,
                Some((idx, '\\')) => match self.consume() {
                    None => return Err(self.error(ErrorKind::UnterminatedString, start)),
                    Some((_, esc)) => {
                        let ch = unescape(esc)
                            .ok_or_else(|| self.error(ErrorKind::MalformedString(esc), idx))?;
                        value.push(ch);
                    }
                },
                Some((_, ch)) => value.push(ch),
            }
        }
        Ok(Token::new(TokenKind::String(value), self.pos(start)))
    }

    /// Raw lexeme of a char literal, quotes included, at most six chars long.
    fn parse_char(&mut self) -> Result<String> {
        let Some((start, quote)) = self.consume() else {
            unreachable!("parse_char called at end of line")
        };
        let mut lexeme = String::from(quote);
        if self.peek_nth(1).is_none() {
            lexeme.extend(self.iter.by_ref().map(|(_, c)| c));
            return Err(self.error(ErrorKind::MalformedChar(lexeme), start));
        }
        let mut escaped = false;
        while lexeme.chars().count() < 6 {
            let Some((_, ch)) = self.consume() else { break };
            lexeme.push(ch);
            if ch == '\'' && !escaped {
                return Ok(lexeme);
            }
            escaped = ch == '\\' && !escaped;
        }
        Err(self.error(ErrorKind::MalformedChar(lexeme), start))
    }
}
