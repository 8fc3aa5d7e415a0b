//! Template execution
//!
//! Walks the parsed tree against a data value, writing rendered text into a
//! buffer. Variables live on a stack that is truncated when a control
//! structure ends, so declarations never leak out of their block.

use crate::templates::ast::{Branch, Node, Operand, Pipeline};
use crate::templates::engine::{MissingKey, Template};
use crate::templates::error::TemplateError;
use crate::templates::value::Value;

/// Nested `template`/`block` invocations allowed before giving up
pub(crate) const MAX_TEMPLATE_DEPTH: usize = 1000;

static NIL: Value = Value::Nil;

/// Control flow signalled out of a list of nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

pub(crate) struct State<'t> {
    template: &'t Template,
    out: String,
    vars: Vec<(String, Value)>,
    depth: usize,
    line: usize,
    context: String,
}

impl<'t> State<'t> {
    pub(crate) fn new(template: &'t Template, data: &Value) -> Self {
        Self {
            template,
            out: String::new(),
            vars: vec![("$".to_string(), data.clone())],
            depth: 0,
            line: 1,
            context: String::new(),
        }
    }

    pub(crate) fn run(mut self, data: &Value) -> Result<String, TemplateError> {
        let template = self.template;
        self.walk(data, &template.tree.root)?;
        Ok(self.out)
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::Execution {
            name: self.template.name.clone(),
            line: self.line,
            context: self.context.clone(),
            message: message.into(),
        }
    }

    fn at(&mut self, line: usize, pipe: &Pipeline) {
        self.line = line;
        self.context = pipe.to_string();
    }

    fn walk(&mut self, dot: &Value, nodes: &[Node]) -> Result<Flow, TemplateError> {
        for node in nodes {
            let flow = match node {
                Node::Text(text) => {
                    self.out.push_str(text);
                    Flow::Normal
                }
                Node::Action { line, pipe } => {
                    self.at(*line, pipe);
                    let value = self.eval_pipeline(dot, pipe)?;
                    if pipe.decl.is_empty() {
                        self.print(&value);
                    }
                    Flow::Normal
                }
                Node::If(branch) => self.walk_if_or_with(dot, branch, false)?,
                Node::With(branch) => self.walk_if_or_with(dot, branch, true)?,
                Node::Range(branch) => self.walk_range(dot, branch)?,
                Node::Template { line, name, pipe } => {
                    self.walk_template(dot, *line, name, pipe.as_ref())?;
                    Flow::Normal
                }
                Node::Break { .. } => Flow::Break,
                Node::Continue { .. } => Flow::Continue,
            };
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn print(&mut self, value: &Value) {
        match value {
            Value::Nil => self.out.push_str("<no value>"),
            Value::String(s) => self.out.push_str(s),
            other => self.out.push_str(&other.to_string()),
        }
    }

    fn walk_if_or_with(
        &mut self,
        dot: &Value,
        branch: &Branch,
        is_with: bool,
    ) -> Result<Flow, TemplateError> {
        let mark = self.vars.len();
        self.at(branch.line, &branch.pipe);
        let result = self.eval_pipeline(dot, &branch.pipe).and_then(|value| {
            if value.is_true() {
                if is_with {
                    self.walk(&value, &branch.list)
                } else {
                    self.walk(dot, &branch.list)
                }
            } else if let Some(else_list) = &branch.else_list {
                self.walk(dot, else_list)
            } else {
                Ok(Flow::Normal)
            }
        });
        self.vars.truncate(mark);
        result
    }

    fn walk_range(&mut self, dot: &Value, branch: &Branch) -> Result<Flow, TemplateError> {
        let mark = self.vars.len();
        self.at(branch.line, &branch.pipe);
        let result = self.range_inner(dot, branch);
        self.vars.truncate(mark);
        result.map(|_| Flow::Normal)
    }

    fn range_inner(&mut self, dot: &Value, branch: &Branch) -> Result<(), TemplateError> {
        let value = self.eval_pipeline(dot, &branch.pipe)?;
        let decls = branch.pipe.decl.len();
        match value {
            Value::List(items) if !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    if self.one_iteration(Value::Int(i as i64), item, branch, decls)? == Flow::Break {
                        break;
                    }
                }
                Ok(())
            }
            Value::Map(map) if !map.is_empty() => {
                for (key, item) in &map {
                    if self.one_iteration(Value::from(key.as_str()), item, branch, decls)? == Flow::Break {
                        break;
                    }
                }
                Ok(())
            }
            Value::Int(n) if n > 0 => {
                if decls > 1 {
                    return Err(self.error(format!(
                        "can't use {} to iterate over more than one variable",
                        n
                    )));
                }
                for i in 0..n {
                    let current = Value::Int(i);
                    if self.one_iteration(current.clone(), &current, branch, decls)? == Flow::Break {
                        break;
                    }
                }
                Ok(())
            }
            Value::List(_) | Value::Map(_) | Value::Int(_) | Value::Nil => {
                if let Some(else_list) = &branch.else_list {
                    self.walk(dot, else_list)?;
                }
                Ok(())
            }
            other => Err(self.error(format!("range can't iterate over {}", other))),
        }
    }

    fn one_iteration(
        &mut self,
        index: Value,
        elem: &Value,
        branch: &Branch,
        decls: usize,
    ) -> Result<Flow, TemplateError> {
        if decls > 0 {
            self.set_top_var(1, elem.clone());
        }
        if decls > 1 {
            self.set_top_var(2, index);
        }
        let mark = self.vars.len();
        let flow = self.walk(elem, &branch.list);
        self.vars.truncate(mark);
        flow
    }

    fn walk_template(
        &mut self,
        dot: &Value,
        line: usize,
        name: &str,
        pipe: Option<&Pipeline>,
    ) -> Result<(), TemplateError> {
        let template = self.template;
        self.line = line;
        self.context = format!("template {:?}", name);
        let body = template
            .tree
            .definitions
            .get(name)
            .ok_or_else(|| self.error(format!("template: no template {:?} associated with template {:?}", name, template.name)))?;
        if self.depth >= MAX_TEMPLATE_DEPTH {
            return Err(self.error(format!(
                "exceeded maximum template depth ({})",
                MAX_TEMPLATE_DEPTH
            )));
        }
        let new_dot = match pipe {
            Some(pipe) => {
                self.at(line, pipe);
                self.eval_pipeline(dot, pipe)?
            }
            None => Value::Nil,
        };
        let saved = std::mem::replace(&mut self.vars, vec![("$".to_string(), new_dot.clone())]);
        self.depth += 1;
        let result = self.walk(&new_dot, body);
        self.depth -= 1;
        self.vars = saved;
        result.map(|_| ())
    }

    // variables

    fn var_value(&self, name: &str) -> Result<Value, TemplateError> {
        self.vars
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| self.error(format!("undefined variable: {}", name)))
    }

    fn set_var(&mut self, name: &str, value: Value) -> Result<(), TemplateError> {
        match self.vars.iter_mut().rev().find(|(n, _)| n == name) {
            Some(slot) => {
                slot.1 = value;
                Ok(())
            }
            None => Err(self.error(format!("undefined variable: {}", name))),
        }
    }

    fn set_top_var(&mut self, n: usize, value: Value) {
        let len = self.vars.len();
        if let Some(slot) = len.checked_sub(n).and_then(|i| self.vars.get_mut(i)) {
            slot.1 = value;
        }
    }

    // evaluation

    fn eval_pipeline(&mut self, dot: &Value, pipe: &Pipeline) -> Result<Value, TemplateError> {
        let mut value: Option<Value> = None;
        for cmd in &pipe.cmds {
            value = Some(self.eval_command(dot, &cmd.args, value)?);
        }
        let value = value.unwrap_or_default();
        for name in &pipe.decl {
            if pipe.is_assign {
                self.set_var(name, value.clone())?;
            } else {
                self.vars.push((name.clone(), value.clone()));
            }
        }
        Ok(value)
    }

    fn eval_command(
        &mut self,
        dot: &Value,
        args: &[Operand],
        last: Option<Value>,
    ) -> Result<Value, TemplateError> {
        let first = &args[0];
        match first {
            Operand::Field(fields) => {
                let has_args = args.len() > 1 || last.is_some();
                return self.walk_fields(dot, fields, has_args);
            }
            Operand::Chain(base, fields) => {
                let has_args = args.len() > 1 || last.is_some();
                let receiver = self.eval_chain_base(dot, base)?;
                return self.walk_fields(&receiver, fields, has_args);
            }
            Operand::Identifier(name) => return self.eval_function(dot, name, &args[1..], last),
            Operand::Variable(name, fields) => {
                let value = self.var_value(name)?;
                if fields.is_empty() {
                    self.not_a_function(args, &last)?;
                    return Ok(value);
                }
                let has_args = args.len() > 1 || last.is_some();
                return self.walk_fields(&value, fields, has_args);
            }
            Operand::Pipeline(pipe) => {
                self.not_a_function(args, &last)?;
                return self.eval_pipeline(dot, pipe);
            }
            _ => {}
        }
        self.not_a_function(args, &last)?;
        match first {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Dot => Ok(dot.clone()),
            _ => Err(self.error("nil is not a command")),
        }
    }

    fn not_a_function(&self, args: &[Operand], last: &Option<Value>) -> Result<(), TemplateError> {
        if args.len() > 1 || last.is_some() {
            return Err(self.error(format!("can't give argument to non-function {}", args[0])));
        }
        Ok(())
    }

    fn eval_chain_base(&mut self, dot: &Value, base: &Operand) -> Result<Value, TemplateError> {
        if matches!(base, Operand::Nil) {
            return Err(self.error("indirection through explicit nil"));
        }
        self.eval_arg(dot, base)
    }

    /// Resolve `.A.B.C` against `receiver`.
    ///
    /// A missing key yields nil (or an error under [`MissingKey::Error`]);
    /// stepping into nil or a non-map is always an error.
    fn walk_fields(
        &self,
        receiver: &Value,
        fields: &[String],
        has_args: bool,
    ) -> Result<Value, TemplateError> {
        let mut current = receiver;
        for (i, field) in fields.iter().enumerate() {
            let last = i + 1 == fields.len();
            current = match current {
                Value::Map(map) => {
                    if last && has_args {
                        return Err(self.error(format!(
                            "{} is not a method but has arguments",
                            field
                        )));
                    }
                    match map.get(field) {
                        Some(value) => value,
                        None => match self.template.missing_key {
                            MissingKey::Zero => &NIL,
                            MissingKey::Error => {
                                return Err(self.error(format!("map has no entry for key {:?}", field)))
                            }
                        },
                    }
                }
                Value::Nil => {
                    return Err(self.error(format!(
                        "nil pointer evaluating interface {{}}.{}",
                        field
                    )))
                }
                other => {
                    return Err(self.error(format!(
                        "can't evaluate field {} in type {}",
                        field,
                        other.type_name()
                    )))
                }
            };
        }
        Ok(current.clone())
    }

    fn eval_function(
        &mut self,
        dot: &Value,
        name: &str,
        args: &[Operand],
        last: Option<Value>,
    ) -> Result<Value, TemplateError> {
        let template = self.template;
        let helper = template
            .functions
            .get(name)
            .ok_or_else(|| self.error(format!("{:?} is not a defined function", name)))?;
        let count = args.len() + usize::from(last.is_some());
        if !helper.arity.accepts(count) {
            return Err(self.error(helper.arity.mismatch(name, count)));
        }

        if name == "and" || name == "or" {
            let stop_on = name == "or";
            let mut result = Value::Nil;
            for arg in args {
                result = self.eval_arg(dot, arg)?;
                if result.is_true() == stop_on {
                    return Ok(result);
                }
            }
            if let Some(value) = last {
                result = value;
            }
            return Ok(result);
        }

        let mut values = Vec::with_capacity(count);
        for arg in args {
            values.push(self.eval_arg(dot, arg)?);
        }
        if let Some(value) = last {
            values.push(value);
        }
        (helper.call)(&values).map_err(|message| self.error(format!("error calling {}: {}", name, message)))
    }

    fn eval_arg(&mut self, dot: &Value, arg: &Operand) -> Result<Value, TemplateError> {
        match arg {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Nil => Ok(Value::Nil),
            Operand::Dot => Ok(dot.clone()),
            Operand::Field(fields) => self.walk_fields(dot, fields, false),
            Operand::Variable(name, fields) => {
                let value = self.var_value(name)?;
                if fields.is_empty() {
                    return Ok(value);
                }
                self.walk_fields(&value, fields, false)
            }
            Operand::Pipeline(pipe) => self.eval_pipeline(dot, pipe),
            Operand::Identifier(name) => self.eval_function(dot, name, &[], None),
            Operand::Chain(base, fields) => {
                let receiver = self.eval_chain_base(dot, base)?;
                self.walk_fields(&receiver, fields, false)
            }
        }
    }
}
