//! The attribute value model shared by every extracted mapping.
//!
//! HCL attribute values arrive as [`hcl_edit::expr::Expression`] and are
//! converted into an explicit scalar/sequence/mapping sum type at the parser
//! boundary. Unresolved Terraform expressions are kept as tagged
//! [`Reference`]s (or [`Template`]s when embedded in strings) rather than
//! opaque text.

use std::fmt::{Display, Formatter, Result as FmtResult};

use hcl_edit::expr::{Expression, ObjectKey, TraversalOperator};
use hcl_edit::template::Element;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::Reference;

/// Ordered mapping from attribute (or resource) name to value.
pub type AttributeMap = IndexMap<String, Value>;

/// A string with embedded interpolations, e.g. `"${var.project}-${var.environment}"`.
///
/// The raw text is kept verbatim for reporting; the references embedded in
/// the interpolations are extracted for rule matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub raw: String,
    pub references: Vec<Reference>,
}

/// One normalized HCL attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Reference(Reference),
    Template(Template),
    Sequence(Vec<Value>),
    Mapping(AttributeMap),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&AttributeMap> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Scalar access mode: a single-element sequence stands in for its sole
    /// element. Used for tfvars-style lookups. Nested blocks, which are
    /// sequences of mappings by construction, must be accessed with
    /// [`Value::index`] instead.
    pub fn as_scalar(&self) -> &Value {
        match self {
            Value::Sequence(items) if items.len() == 1 => &items[0],
            other => other,
        }
    }

    /// Explicit one-level indexed access mode, for nested blocks such as
    /// `point_in_time_recovery[0]`.
    pub fn index(&self, idx: usize) -> Option<&Value> {
        self.as_sequence().and_then(|items| items.get(idx))
    }

    /// Look up a key on a mapping value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Whether this value is the literal unscoped wildcard `"*"`.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Value::String(s) if s.trim() == "*")
    }

    /// Whether this value, or any value nested in it, references the dotted
    /// query (e.g. `var.dynamodb_table_arns`).
    pub fn references(&self, query: &str) -> bool {
        match self {
            Value::Reference(r) => r.matches(query),
            Value::Template(t) => t.references.iter().any(|r| r.matches(query)),
            Value::Sequence(items) => items.iter().any(|v| v.references(query)),
            Value::Mapping(map) => map.values().any(|v| v.references(query)),
            _ => false,
        }
    }

    /// Compare against an expected value from the rule catalog.
    pub fn matches_json(&self, expected: &serde_json::Value) -> bool {
        match (self, expected) {
            (Value::Null, serde_json::Value::Null) => true,
            (Value::Bool(a), serde_json::Value::Bool(b)) => a == b,
            (Value::Int(a), serde_json::Value::Number(b)) => b.as_i64() == Some(*a),
            (Value::Float(a), serde_json::Value::Number(b)) => b.as_f64() == Some(*a),
            (Value::String(a), serde_json::Value::String(b)) => a == b,
            (Value::Sequence(a), serde_json::Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(v, e)| v.matches_json(e))
            }
            (Value::Mapping(a), serde_json::Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|e| v.matches_json(e)))
            }
            _ => false,
        }
    }

    /// Convert an HCL expression into a normalized value.
    pub fn from_expr(expr: &Expression) -> Value {
        match expr {
            Expression::Null(_) => Value::Null,
            Expression::Bool(b) => Value::Bool(*b.value()),
            Expression::Number(n) => match (n.value().as_i64(), n.value().as_f64()) {
                (Some(i), _) => Value::Int(i),
                (None, Some(f)) => Value::Float(f),
                (None, None) => Value::Null,
            },
            Expression::String(s) => Value::String(s.value().to_string()),
            Expression::Array(items) => {
                Value::Sequence(items.iter().map(Value::from_expr).collect())
            }
            Expression::Object(object) => {
                let mut map = AttributeMap::new();
                for (key, value) in object.iter() {
                    let key = match key {
                        ObjectKey::Ident(ident) => ident.as_str().to_string(),
                        ObjectKey::Expression(Expression::String(s)) => s.value().to_string(),
                        ObjectKey::Expression(other) => other.to_string().trim().to_string(),
                    };
                    map.insert(key, Value::from_expr(value.expr()));
                }
                Value::Mapping(map)
            }
            Expression::Variable(ident) => {
                Value::Reference(Reference::new(ident.as_str(), Vec::new()))
            }
            Expression::Traversal(traversal) => match reference_from_traversal(traversal) {
                Some(reference) => Value::Reference(reference),
                None => unresolved(expr),
            },
            Expression::StringTemplate(template) => {
                // A template without interpolations is just a string.
                let mut raw = String::new();
                let mut references = Vec::new();
                let mut interpolated = false;
                for element in template.iter() {
                    match element {
                        Element::Literal(literal) => raw.push_str(literal.value()),
                        Element::Interpolation(interpolation) => {
                            interpolated = true;
                            raw.push_str("${");
                            raw.push_str(interpolation.expr.to_string().trim());
                            raw.push('}');
                            collect_references(&interpolation.expr, &mut references);
                        }
                        Element::Directive(_) => interpolated = true,
                    }
                }
                if interpolated {
                    Value::Template(Template { raw, references })
                } else {
                    Value::String(raw)
                }
            }
            Expression::Parenthesis(inner) => Value::from_expr(inner.inner()),
            // Conditionals, function calls, operators and for-expressions
            // stay unresolved; only the references inside them matter to
            // rule evaluation.
            other => unresolved(other),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Reference(r) => write!(f, "{r}"),
            Value::Template(t) => write!(f, "{:?}", t.raw),
            Value::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn unresolved(expr: &Expression) -> Value {
    let mut references = Vec::new();
    collect_references(expr, &mut references);
    Value::Template(Template {
        raw: expr.to_string().trim().to_string(),
        references,
    })
}

fn reference_from_traversal(traversal: &hcl_edit::expr::Traversal) -> Option<Reference> {
    let Expression::Variable(root) = &traversal.expr else {
        return None;
    };
    let mut path = Vec::new();
    for operator in traversal.operators.iter() {
        match operator.value() {
            TraversalOperator::GetAttr(ident) => path.push(ident.as_str().to_string()),
            // Index segments do not change which variable is referenced.
            TraversalOperator::Index(_) | TraversalOperator::LegacyIndex(_) => {}
            TraversalOperator::AttrSplat(_) | TraversalOperator::FullSplat(_) => {}
        }
    }
    Some(Reference::new(root.as_str(), path))
}

/// Collect every variable reference reachable from an expression.
fn collect_references(expr: &Expression, out: &mut Vec<Reference>) {
    match expr {
        Expression::Variable(ident) => out.push(Reference::new(ident.as_str(), Vec::new())),
        Expression::Traversal(traversal) => {
            if let Some(reference) = reference_from_traversal(traversal) {
                out.push(reference);
            } else {
                collect_references(&traversal.expr, out);
            }
        }
        Expression::Array(items) => {
            for item in items.iter() {
                collect_references(item, out);
            }
        }
        Expression::Object(object) => {
            for (key, value) in object.iter() {
                if let ObjectKey::Expression(key_expr) = key {
                    collect_references(key_expr, out);
                }
                collect_references(value.expr(), out);
            }
        }
        Expression::StringTemplate(template) => {
            for element in template.iter() {
                if let Element::Interpolation(interpolation) = element {
                    collect_references(&interpolation.expr, out);
                }
            }
        }
        Expression::HeredocTemplate(heredoc) => {
            for element in heredoc.template.iter() {
                if let Element::Interpolation(interpolation) = element {
                    collect_references(&interpolation.expr, out);
                }
            }
        }
        Expression::FuncCall(call) => {
            for arg in call.args.iter() {
                collect_references(arg, out);
            }
        }
        Expression::Conditional(conditional) => {
            collect_references(&conditional.cond_expr, out);
            collect_references(&conditional.true_expr, out);
            collect_references(&conditional.false_expr, out);
        }
        Expression::BinaryOp(op) => {
            collect_references(&op.lhs_expr, out);
            collect_references(&op.rhs_expr, out);
        }
        Expression::UnaryOp(op) => collect_references(&op.expr, out),
        Expression::Parenthesis(inner) => collect_references(inner.inner(), out),
        Expression::ForExpr(for_expr) => {
            collect_references(&for_expr.value_expr, out);
            if let Some(key_expr) = &for_expr.key_expr {
                collect_references(key_expr, out);
            }
            if let Some(cond) = &for_expr.cond {
                collect_references(&cond.expr, out);
            }
        }
        Expression::Bool(_)
        | Expression::Null(_)
        | Expression::Number(_)
        | Expression::String(_) => {}
    }
}
