//! Runtime values for the expression language.

use std::collections::BTreeMap;
use std::fmt;

/// A value produced or consumed by expression evaluation.
///
/// The closed set matches what server-rendered attribute expressions can
/// express: literals, and object literals for scope declarations and request
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Truthiness for visibility bindings and logical operators:
    /// `null`, `false`, `0`, and `""` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// The value rendered as text content or a request parameter.
    ///
    /// Numbers that are whole render without a trailing `.0`, matching how
    /// the values appear in markup.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.clone(),
            Value::Object(_) => "[object]".to_string(),
        }
    }

    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(0.5).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Str("x".into()).is_truthy());
        assert!(Value::Object(BTreeMap::new()).is_truthy());
    }

    #[test]
    fn render_whole_number_without_fraction() {
        assert_eq!(Value::Number(3.0).render(), "3");
        assert_eq!(Value::Number(-2.0).render(), "-2");
    }

    #[test]
    fn render_fractional_number() {
        assert_eq!(Value::Number(3.5).render(), "3.5");
    }

    #[test]
    fn render_null_is_empty() {
        assert_eq!(Value::Null.render(), "");
    }

    #[test]
    fn render_string_verbatim() {
        assert_eq!(Value::Str("Hello".into()).render(), "Hello");
    }

    #[test]
    fn display_matches_render() {
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn from_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(2.0), Value::Number(2.0));
        assert_eq!(Value::from("hi"), Value::Str("hi".into()));
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Str("x".into()).type_name(), "string");
    }
}
