//! Parsed template tree

use std::fmt;

use crate::templates::value::Value;

/// A node of a template body
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action { line: usize, pipe: Pipeline },
    If(Branch),
    With(Branch),
    Range(Branch),
    Template {
        line: usize,
        name: String,
        pipe: Option<Pipeline>,
    },
    Break { line: usize },
    Continue { line: usize },
}

/// Shared shape of `if`, `with` and `range`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Branch {
    pub line: usize,
    pub pipe: Pipeline,
    pub list: Vec<Node>,
    pub else_list: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Pipeline {
    pub line: usize,
    pub is_assign: bool,
    pub decl: Vec<String>,
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// Bool, number, char or string constant
    Literal(Value),
    Nil,
    Dot,
    /// `.A.B`
    Field(Vec<String>),
    /// `$x.A.B`
    Variable(String, Vec<String>),
    /// Helper name
    Identifier(String),
    /// `( pipeline )`
    Pipeline(Box<Pipeline>),
    /// `(...).A.B` or `helper.A`
    Chain(Box<Operand>, Vec<String>),
}

impl Operand {
    /// Operands that cannot start a later pipeline stage
    pub(crate) fn is_constant(&self) -> bool {
        matches!(self, Operand::Literal(_) | Operand::Nil | Operand::Dot)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(Value::String(s)) => write!(f, "{:?}", s),
            Operand::Literal(v) => write!(f, "{}", v),
            Operand::Nil => f.write_str("nil"),
            Operand::Dot => f.write_str("."),
            Operand::Field(fields) => {
                for field in fields {
                    write!(f, ".{}", field)?;
                }
                Ok(())
            }
            Operand::Variable(name, fields) => {
                f.write_str(name)?;
                for field in fields {
                    write!(f, ".{}", field)?;
                }
                Ok(())
            }
            Operand::Identifier(name) => f.write_str(name),
            Operand::Pipeline(pipe) => write!(f, "({})", pipe),
            Operand::Chain(base, fields) => {
                match base.as_ref() {
                    Operand::Pipeline(_) => write!(f, "{}", base)?,
                    other => write!(f, "({})", other)?,
                }
                for field in fields {
                    write!(f, ".{}", field)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decl.is_empty() {
            f.write_str(&self.decl.join(", "))?;
            f.write_str(if self.is_assign { " = " } else { " := " })?;
        }
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", cmd)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_display() {
        let pipe = Pipeline {
            line: 1,
            is_assign: false,
            decl: vec!["$x".to_string()],
            cmds: vec![
                Command {
                    args: vec![Operand::Field(vec!["Values".into(), "name".into()])],
                },
                Command {
                    args: vec![
                        Operand::Identifier("default".into()),
                        Operand::Literal(Value::from("n")),
                    ],
                },
            ],
        };
        assert_eq!(pipe.to_string(), "$x := .Values.name | default \"n\"");
    }
}
