//! Template parser
//!
//! Builds the node tree from the token stream, resolving keywords into
//! control structures and rejecting unknown helpers and undeclared variables
//! before execution starts.

use std::collections::HashMap;

use crate::templates::ast::{Branch, Command, Node, Operand, Pipeline};
use crate::templates::error::TemplateError;
use crate::templates::functions::FunctionRegistry;
use crate::templates::lexer::{Keyword, Token, TokenKind};
use crate::templates::value::Value;

/// Deepest nesting of control blocks and parenthesised pipelines accepted
pub(crate) const MAX_NESTING_DEPTH: usize = 100;

/// Result of parsing a template source
#[derive(Debug, Clone, Default)]
pub(crate) struct Tree {
    pub root: Vec<Node>,
    pub definitions: HashMap<String, Vec<Node>>,
}

/// Parse a token stream into a [`Tree`].
pub(crate) fn parse(
    name: &str,
    tokens: Vec<Token>,
    functions: &FunctionRegistry,
) -> Result<Tree, TemplateError> {
    Parser {
        name,
        tokens,
        pos: 0,
        functions,
        vars: vec!["$".to_string()],
        range_depth: 0,
        nesting: 0,
        definitions: HashMap::new(),
    }
    .parse()
}

/// What a text-or-action step produced
enum Item {
    Node(Node),
    End,
    Else { line: usize },
}

/// How an item list was terminated
enum ListEnd {
    End,
    Else { line: usize },
}

struct Parser<'a> {
    name: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    functions: &'a FunctionRegistry,
    vars: Vec<String>,
    range_depth: usize,
    nesting: usize,
    definitions: HashMap<String, Vec<Node>>,
}

impl<'a> Parser<'a> {
    fn parse(mut self) -> Result<Tree, TemplateError> {
        let mut root = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            if self.peek().kind == TokenKind::LeftDelim {
                let save = self.pos;
                self.next();
                if self.next_non_space().kind == TokenKind::Keyword(Keyword::Define) {
                    self.parse_definition()?;
                    continue;
                }
                self.pos = save;
            }
            match self.text_or_action()? {
                Item::Node(node) => root.push(node),
                Item::End => return Err(self.error_at_current("unexpected {{end}}")),
                Item::Else { line } => {
                    return Err(self.error(line, "unexpected {{else}}"));
                }
            }
        }
        Ok(Tree {
            root,
            definitions: self.definitions,
        })
    }

    // token plumbing

    fn peek(&self) -> &Token {
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn backup(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    fn skip_space(&mut self) {
        while self.peek().kind == TokenKind::Space {
            self.pos += 1;
        }
    }

    fn next_non_space(&mut self) -> Token {
        self.skip_space();
        self.next()
    }

    fn peek_non_space(&mut self) -> &Token {
        self.skip_space();
        self.peek()
    }

    fn expect(&mut self, expected: TokenKind, context: &str) -> Result<Token, TemplateError> {
        let token = self.next_non_space();
        if token.kind != expected {
            return Err(self.unexpected(&token, context));
        }
        Ok(token)
    }

    // errors

    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::syntax(self.name, line, message)
    }

    fn error_at_current(&self, message: impl Into<String>) -> TemplateError {
        self.error(self.peek().line, message)
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, TemplateError>,
    ) -> Result<T, TemplateError> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err(self.error_at_current(format!(
                "exceeded maximum nesting depth ({})",
                MAX_NESTING_DEPTH
            )));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn unexpected(&self, token: &Token, context: &str) -> TemplateError {
        if token.kind == TokenKind::Eof {
            return self.error(token.line, format!("unexpected EOF in {}", context));
        }
        self.error(
            token.line,
            format!("unexpected {} in {}", token.kind.describe(), context),
        )
    }

    // structure

    fn parse_definition(&mut self) -> Result<(), TemplateError> {
        let context = "define clause";
        let token = self.next_non_space();
        let name = self.template_name(&token, context)?;
        self.expect(TokenKind::RightDelim, context)?;
        let saved_vars = std::mem::replace(&mut self.vars, vec!["$".to_string()]);
        let saved_depth = std::mem::replace(&mut self.range_depth, 0);
        let (list, end) = self.item_list()?;
        self.vars = saved_vars;
        self.range_depth = saved_depth;
        if let ListEnd::Else { line } = end {
            return Err(self.error(line, format!("unexpected {{{{else}}}} in {}", context)));
        }
        self.definitions.insert(name, list);
        Ok(())
    }

    fn item_list(&mut self) -> Result<(Vec<Node>, ListEnd), TemplateError> {
        self.nested(Self::items)
    }

    fn items(&mut self) -> Result<(Vec<Node>, ListEnd), TemplateError> {
        let mut list = Vec::new();
        while self.peek_non_space().kind != TokenKind::Eof {
            match self.text_or_action()? {
                Item::Node(node) => list.push(node),
                Item::End => return Ok((list, ListEnd::End)),
                Item::Else { line } => return Ok((list, ListEnd::Else { line })),
            }
        }
        Err(self.error_at_current("unexpected EOF"))
    }

    fn text_or_action(&mut self) -> Result<Item, TemplateError> {
        let token = self.next_non_space();
        match token.kind {
            TokenKind::Text(text) => Ok(Item::Node(Node::Text(text))),
            TokenKind::LeftDelim => self.action(),
            _ => Err(self.unexpected(&token, "input")),
        }
    }

    fn action(&mut self) -> Result<Item, TemplateError> {
        let token = self.next_non_space();
        let line = token.line;
        if let TokenKind::Keyword(keyword) = token.kind {
            match keyword {
                Keyword::Block => return self.block_control(line).map(Item::Node),
                Keyword::Break => return self.loop_control(line, true).map(Item::Node),
                Keyword::Continue => return self.loop_control(line, false).map(Item::Node),
                Keyword::Else => return self.else_control(line),
                Keyword::End => return self.end_control(),
                Keyword::If => return self.if_control(line).map(Item::Node),
                Keyword::Range => return self.range_control(line).map(Item::Node),
                Keyword::Template => return self.template_control(line).map(Item::Node),
                Keyword::With => return self.with_control(line).map(Item::Node),
                Keyword::Define => {}
            }
        }
        self.backup();
        let pipe = self.pipeline("command", false)?;
        Ok(Item::Node(Node::Action { line, pipe }))
    }

    fn pipeline(&mut self, context: &str, paren: bool) -> Result<Pipeline, TemplateError> {
        let line = self.peek_non_space().line;
        let mut pipe = Pipeline {
            line,
            ..Pipeline::default()
        };

        // declarations: `$x :=`, `$x =`, `$i, $e :=`
        loop {
            let save = self.pos;
            let name = match &self.peek_non_space().kind {
                TokenKind::Variable(name) => name.clone(),
                _ => break,
            };
            self.next();
            let next = self.peek_non_space().kind.clone();
            match next {
                TokenKind::Assign | TokenKind::Declare => {
                    pipe.is_assign = next == TokenKind::Assign;
                    self.next();
                    pipe.decl.push(name.clone());
                    self.vars.push(name);
                    break;
                }
                TokenKind::Comma => {
                    self.next();
                    pipe.decl.push(name.clone());
                    self.vars.push(name);
                    if context == "range" && pipe.decl.len() < 2 {
                        match self.peek_non_space().kind {
                            TokenKind::Variable(_)
                            | TokenKind::RightDelim
                            | TokenKind::RightParen => continue,
                            _ => {
                                return Err(self.error(
                                    line,
                                    "range can only initialize variables",
                                ))
                            }
                        }
                    }
                    return Err(self.error(line, format!("too many declarations in {}", context)));
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }

        loop {
            let token = self.next_non_space();
            match token.kind {
                TokenKind::RightDelim if !paren => break,
                TokenKind::RightParen if paren => break,
                TokenKind::Bool(_)
                | TokenKind::Char(_)
                | TokenKind::Dot
                | TokenKind::Field(_)
                | TokenKind::Identifier(_)
                | TokenKind::Number(_)
                | TokenKind::Nil
                | TokenKind::String(_)
                | TokenKind::Variable(_)
                | TokenKind::LeftParen => {
                    self.backup();
                    let cmd = self.command()?;
                    pipe.cmds.push(cmd);
                }
                _ => return Err(self.unexpected(&token, context)),
            }
        }
        self.check_pipeline(&pipe, context)?;
        Ok(pipe)
    }

    fn check_pipeline(&self, pipe: &Pipeline, context: &str) -> Result<(), TemplateError> {
        if pipe.cmds.is_empty() {
            return Err(self.error(pipe.line, format!("missing value for {}", context)));
        }
        for (i, cmd) in pipe.cmds.iter().enumerate().skip(1) {
            if cmd.args.first().is_some_and(Operand::is_constant) {
                return Err(self.error(
                    pipe.line,
                    format!("non executable command in pipeline stage {}", i + 1),
                ));
            }
        }
        Ok(())
    }

    fn command(&mut self) -> Result<Command, TemplateError> {
        let mut args = Vec::new();
        loop {
            self.skip_space();
            if let Some(operand) = self.operand()? {
                args.push(operand);
            }
            let token = self.next();
            match token.kind {
                TokenKind::Space => continue,
                TokenKind::RightDelim | TokenKind::RightParen => self.backup(),
                TokenKind::Pipe => {}
                _ => return Err(self.unexpected(&token, "operand")),
            }
            break;
        }
        if args.is_empty() {
            return Err(self.error_at_current("empty command"));
        }
        Ok(Command { args })
    }

    fn operand(&mut self) -> Result<Option<Operand>, TemplateError> {
        let line = self.peek().line;
        let term = match self.term()? {
            Some(term) => term,
            None => return Ok(None),
        };
        let mut fields = Vec::new();
        while let TokenKind::Field(field) = &self.peek().kind {
            fields.push(field.clone());
            self.next();
        }
        if fields.is_empty() {
            return Ok(Some(term));
        }
        let operand = match term {
            Operand::Field(mut base) => {
                base.extend(fields);
                Operand::Field(base)
            }
            Operand::Variable(name, mut base) => {
                base.extend(fields);
                Operand::Variable(name, base)
            }
            Operand::Literal(_) | Operand::Nil | Operand::Dot => {
                return Err(self.error(line, format!("unexpected . after term {:?}", term.to_string())));
            }
            other => Operand::Chain(Box::new(other), fields),
        };
        Ok(Some(operand))
    }

    fn term(&mut self) -> Result<Option<Operand>, TemplateError> {
        let token = self.next_non_space();
        let operand = match token.kind {
            TokenKind::Identifier(name) => {
                if !self.functions.contains(&name) {
                    return Err(self.error(token.line, format!("function {:?} not defined", name)));
                }
                Operand::Identifier(name)
            }
            TokenKind::Dot => Operand::Dot,
            TokenKind::Nil => Operand::Nil,
            TokenKind::Variable(name) => {
                if !self.vars.iter().any(|v| *v == name) {
                    return Err(self.error(token.line, format!("undefined variable {:?}", name)));
                }
                Operand::Variable(name, Vec::new())
            }
            TokenKind::Field(name) => Operand::Field(vec![name]),
            TokenKind::Bool(b) => Operand::Literal(Value::Bool(b)),
            TokenKind::Char(c) => Operand::Literal(Value::Int(c as i64)),
            TokenKind::Number(text) => Operand::Literal(self.number(&text, token.line)?),
            TokenKind::String(s) => Operand::Literal(Value::String(s)),
            TokenKind::LeftParen => {
                let pipe = self.nested(|p| p.pipeline("parenthesized pipeline", true))?;
                Operand::Pipeline(Box::new(pipe))
            }
            _ => {
                self.backup();
                return Ok(None);
            }
        };
        Ok(Some(operand))
    }

    fn number(&self, text: &str, line: usize) -> Result<Value, TemplateError> {
        let cleaned = text.replace('_', "");
        if let Some(int) = parse_int(&cleaned) {
            return Ok(Value::Int(int));
        }
        if !cleaned.contains(['x', 'X', 'p', 'P']) {
            if let Ok(float) = cleaned.parse::<f64>() {
                return Ok(Value::Float(float));
            }
        }
        Err(self.error(line, format!("illegal number syntax: {:?}", text)))
    }

    fn template_name(&self, token: &Token, context: &str) -> Result<String, TemplateError> {
        match &token.kind {
            TokenKind::String(name) => Ok(name.clone()),
            _ => Err(self.unexpected(token, context)),
        }
    }

    // control structures

    fn parse_control(
        &mut self,
        context: &str,
        line: usize,
    ) -> Result<Branch, TemplateError> {
        let vars_mark = self.vars.len();
        let result = self.parse_control_inner(context, line);
        self.vars.truncate(vars_mark);
        result
    }

    fn parse_control_inner(&mut self, context: &str, line: usize) -> Result<Branch, TemplateError> {
        let pipe = self.pipeline(context, false)?;
        if context == "range" {
            self.range_depth += 1;
        }
        let body = self.item_list();
        if context == "range" {
            self.range_depth -= 1;
        }
        let (list, end) = body?;
        let else_list = match end {
            ListEnd::End => None,
            ListEnd::Else { line: else_line } => {
                let chained = match (context, &self.peek().kind) {
                    ("if", TokenKind::Keyword(Keyword::If)) => Some(Keyword::If),
                    ("with", TokenKind::Keyword(Keyword::With)) => Some(Keyword::With),
                    _ => None,
                };
                match chained {
                    // `else if` / `else with` nest a branch that owns the shared `end`
                    Some(keyword) => {
                        self.next();
                        let nested = if keyword == Keyword::If {
                            self.if_control(else_line)?
                        } else {
                            self.with_control(else_line)?
                        };
                        Some(vec![nested])
                    }
                    None => {
                        let (else_list, end) = self.item_list()?;
                        if let ListEnd::Else { line } = end {
                            return Err(self.error(line, "expected end; found {{else}}"));
                        }
                        Some(else_list)
                    }
                }
            }
        };
        Ok(Branch {
            line,
            pipe,
            list,
            else_list,
        })
    }

    fn if_control(&mut self, line: usize) -> Result<Node, TemplateError> {
        self.parse_control("if", line).map(Node::If)
    }

    fn with_control(&mut self, line: usize) -> Result<Node, TemplateError> {
        self.parse_control("with", line).map(Node::With)
    }

    fn range_control(&mut self, line: usize) -> Result<Node, TemplateError> {
        self.parse_control("range", line).map(Node::Range)
    }

    fn end_control(&mut self) -> Result<Item, TemplateError> {
        self.expect(TokenKind::RightDelim, "end")?;
        Ok(Item::End)
    }

    fn else_control(&mut self, line: usize) -> Result<Item, TemplateError> {
        if matches!(
            self.peek_non_space().kind,
            TokenKind::Keyword(Keyword::If) | TokenKind::Keyword(Keyword::With)
        ) {
            return Ok(Item::Else { line });
        }
        self.expect(TokenKind::RightDelim, "else")?;
        Ok(Item::Else { line })
    }

    fn loop_control(&mut self, line: usize, is_break: bool) -> Result<Node, TemplateError> {
        let keyword = if is_break { "break" } else { "continue" };
        let token = self.next_non_space();
        if token.kind != TokenKind::RightDelim {
            return Err(self.unexpected(&token, &format!("{{{{{}}}}}", keyword)));
        }
        if self.range_depth == 0 {
            return Err(self.error(line, format!("{{{{{}}}}} outside {{{{range}}}}", keyword)));
        }
        Ok(if is_break {
            Node::Break { line }
        } else {
            Node::Continue { line }
        })
    }

    fn template_control(&mut self, line: usize) -> Result<Node, TemplateError> {
        let context = "template clause";
        let token = self.next_non_space();
        let name = self.template_name(&token, context)?;
        let pipe = if self.next_non_space().kind != TokenKind::RightDelim {
            self.backup();
            Some(self.pipeline(context, false)?)
        } else {
            None
        };
        Ok(Node::Template { line, name, pipe })
    }

    fn block_control(&mut self, line: usize) -> Result<Node, TemplateError> {
        let context = "block clause";
        let token = self.next_non_space();
        let name = self.template_name(&token, context)?;
        let pipe = self.pipeline(context, false)?;

        let saved_vars = std::mem::replace(&mut self.vars, vec!["$".to_string()]);
        let saved_depth = std::mem::replace(&mut self.range_depth, 0);
        let body = self.item_list();
        self.vars = saved_vars;
        self.range_depth = saved_depth;
        let (list, end) = body?;
        if let ListEnd::Else { line } = end {
            return Err(self.error(line, format!("unexpected {{{{else}}}} in {}", context)));
        }
        self.definitions.insert(name.clone(), list);
        Ok(Node::Template {
            line,
            name,
            pipe: Some(pipe),
        })
    }
}

/// Integer literal with Go-style base prefixes
fn parse_int(text: &str) -> Option<i64> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = if let Some(d) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (16, d)
    } else if let Some(d) = body.strip_prefix("0o").or_else(|| body.strip_prefix("0O")) {
        (8, d)
    } else if let Some(d) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        (2, d)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..])
    } else {
        (10, body)
    };
    if digits.is_empty() {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
