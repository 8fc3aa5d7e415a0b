//! Template engine for rendering Go-style templates
//!
//! Provides template rendering with support for:
//! - Configurable action delimiters (default `((` and `))`)
//! - Field paths, variables, pipelines and parenthesised sub-pipelines
//! - Conditionals (`if`/`else if`/`else`), `with`, and `range` with `break`/`continue`
//! - Named templates via `define`, `template` and `block`
//! - A helper library covering strings, lists, dicts, math, encoding and more

use std::sync::Arc;

use crate::templates::error::TemplateError;
use crate::templates::exec::State;
use crate::templates::functions::FunctionRegistry;
use crate::templates::lexer::lex;
use crate::templates::parser::{parse, Tree};
use crate::templates::value::Value;

/// Action delimiter pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub left: String,
    pub right: String,
}

impl Delimiters {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// The stock `{{` / `}}` pair
    pub fn braces() -> Self {
        Self::new("{{", "}}")
    }
}

impl Default for Delimiters {
    /// `((` / `))`, which leaves `{{ }}` in starter files untouched for the
    /// chart's own render step.
    fn default() -> Self {
        Self::new("((", "))")
    }
}

/// What a field lookup yields when the key is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKey {
    /// Absent keys evaluate to nil and print as `<no value>`
    #[default]
    Zero,
    /// Absent keys abort execution
    Error,
}

/// Template engine holding delimiters, helpers and lookup policy
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    delimiters: Delimiters,
    functions: Arc<FunctionRegistry>,
    missing_key: MissingKey,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create an engine with the default delimiters and the full helper library
    pub fn new() -> Self {
        Self {
            delimiters: Delimiters::default(),
            functions: Arc::new(FunctionRegistry::builtin()),
            missing_key: MissingKey::default(),
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn with_missing_key(mut self, missing_key: MissingKey) -> Self {
        self.missing_key = missing_key;
        self
    }

    /// Replace the helper registry
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = Arc::new(functions);
        self
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn missing_key(&self) -> MissingKey {
        self.missing_key
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Parse `source` into an executable template
    ///
    /// # Arguments
    /// * `name` - Name used in error messages, usually the file path
    /// * `source` - Template text
    ///
    /// # Returns
    /// Parsed template or a syntax error with line number
    pub fn parse(&self, name: &str, source: &str) -> Result<Template, TemplateError> {
        let tokens = lex(name, source, &self.delimiters.left, &self.delimiters.right)?;
        let tree = parse(name, tokens, &self.functions)?;
        Ok(Template {
            name: name.to_string(),
            tree,
            functions: Arc::clone(&self.functions),
            missing_key: self.missing_key,
        })
    }

    /// Parse and execute in one step
    pub fn render(&self, name: &str, source: &str, data: &Value) -> Result<String, TemplateError> {
        self.parse(name, source)?.execute(data)
    }
}

/// A parsed template ready for execution
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) name: String,
    pub(crate) tree: Tree,
    pub(crate) functions: Arc<FunctionRegistry>,
    pub(crate) missing_key: MissingKey,
}

impl Template {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the template against `data`
    pub fn execute(&self, data: &Value) -> Result<String, TemplateError> {
        State::new(self, data).run(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Value {
        Value::from(
            serde_yaml::from_str::<serde_yaml::Value>(
                r#"
Values:
  name: web
  replicas: 3
  enabled: true
  ports: [80, 443]
  labels:
    tier: front
    app: shop
  empty: ""
Chart:
  name: demo
"#,
            )
            .unwrap(),
        )
    }

    fn render(src: &str) -> Result<String, TemplateError> {
        TemplateEngine::new().render("test", src, &data())
    }

    #[test]
    fn test_render_fields() {
        assert_eq!(render("name: (( .Values.name ))").unwrap(), "name: web");
        assert_eq!(render("(( .Chart.name ))-(( .Values.replicas ))").unwrap(), "demo-3");
    }

    #[test]
    fn test_braces_pass_through() {
        let src = "image: {{ .Values.image }}\nname: (( .Values.name ))";
        assert_eq!(render(src).unwrap(), "image: {{ .Values.image }}\nname: web");
    }

    #[test]
    fn test_missing_key_prints_no_value() {
        assert_eq!(render("(( .Values.nope ))").unwrap(), "<no value>");
    }

    #[test]
    fn test_missing_intermediate_is_error() {
        let err = render("(( .Values.nope.deeper ))").unwrap_err();
        assert!(!err.is_syntax());
        assert!(err.to_string().contains("nil pointer evaluating interface {}.deeper"));
    }

    #[test]
    fn test_strict_missing_key() {
        let engine = TemplateEngine::new().with_missing_key(MissingKey::Error);
        let err = engine.render("t", "(( .Values.nope ))", &data()).unwrap_err();
        assert!(err.to_string().contains("map has no entry for key \"nope\""));
    }

    #[test]
    fn test_pipelines_and_helpers() {
        assert_eq!(render("(( .Values.name | upper | quote ))").unwrap(), "\"WEB\"");
        assert_eq!(render("(( .Values.empty | default \"x\" ))").unwrap(), "x");
        assert_eq!(render("(( printf \"%s-%d\" .Values.name .Values.replicas ))").unwrap(), "web-3");
        assert_eq!(render("(( (list 1 2 3) | len ))").unwrap(), "3");
    }

    #[test]
    fn test_conditionals() {
        let src = "((if .Values.enabled))on((else))off((end))";
        assert_eq!(render(src).unwrap(), "on");
        let src = "((if .Values.empty))a((else if eq .Values.name \"web\"))b((else))c((end))";
        assert_eq!(render(src).unwrap(), "b");
    }

    #[test]
    fn test_with_rebinds_dot() {
        assert_eq!(render("((with .Values.labels))(( .tier ))((end))").unwrap(), "front");
        assert_eq!(render("((with .Values.empty))x((else))y((end))").unwrap(), "y");
    }

    #[test]
    fn test_range_list_and_map() {
        assert_eq!(
            render("((range $i, $p := .Values.ports))(( $i )):(( $p )) ((end))").unwrap(),
            "0:80 1:443 "
        );
        assert_eq!(
            render("((range $k, $v := .Values.labels))(( $k ))=(( $v ));((end))").unwrap(),
            "app=shop;tier=front;"
        );
        assert_eq!(render("((range .Values.missing))x((else))none((end))").unwrap(), "none");
    }

    #[test]
    fn test_range_break_continue() {
        let src = "((range (until 6)))((if eq . 1))((continue))((end))((if eq . 4))((break))((end))(( . ))((end))";
        assert_eq!(render(src).unwrap(), "023");
    }

    #[test]
    fn test_range_over_int() {
        assert_eq!(render("((range 3))(( . ))((end))").unwrap(), "012");
    }

    #[test]
    fn test_variables_and_assignment() {
        let src = "(( $x := 1 ))((if true))(( $x = 2 ))((end))(( $x ))";
        assert_eq!(render(src).unwrap(), "2");
        assert_eq!(render("((with .Values))(( $.Chart.name ))((end))").unwrap(), "demo");
    }

    #[test]
    fn test_trim_markers() {
        let src = "a\n  ((- .Values.name -))  \nb";
        assert_eq!(render(src).unwrap(), "awebb");
    }

    #[test]
    fn test_define_and_template() {
        let src = r#"((define "greet"))hi (( . ))((end))(( template "greet" .Values.name ))"#;
        assert_eq!(render(src).unwrap(), "hi web");
        let src = r#"((block "b" .Chart.name))[(( . ))]((end))"#;
        assert_eq!(render(src).unwrap(), "[demo]");
    }

    #[test]
    fn test_recursion_limit() {
        // debug builds use large frames; give the walk room to hit the limit
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| {
                let src = r#"((define "loop"))(( template "loop" . ))((end))(( template "loop" . ))"#;
                render(src).unwrap_err()
            })
            .unwrap();
        let err = handle.join().unwrap();
        assert!(err.to_string().contains("exceeded maximum template depth"));
    }

    #[test]
    fn test_and_or_short_circuit() {
        assert_eq!(render("(( or .Values.empty .Values.name ))").unwrap(), "web");
        assert_eq!(render("(( and .Values.empty (fail \"unreached\") ))").unwrap(), "");
    }

    #[test]
    fn test_helper_errors() {
        let err = render("(( fail \"boom\" ))").unwrap_err();
        assert!(err.to_string().contains("error calling fail: boom"));
        let err = render("(( upper ))").unwrap_err();
        assert!(err.to_string().contains("wrong number of args for upper: want 1 got 0"));
    }

    #[test]
    fn test_comments_and_custom_delimiters() {
        assert_eq!(render("a((/* hidden */))b").unwrap(), "ab");
        let engine = TemplateEngine::new().with_delimiters(Delimiters::braces());
        assert_eq!(engine.render("t", "{{ .Chart.name }}", &data()).unwrap(), "demo");
    }

    #[test]
    fn test_field_on_scalar() {
        let err = render("(( .Values.name.first ))").unwrap_err();
        assert!(err.to_string().contains("can't evaluate field first in type string"));
    }
}
