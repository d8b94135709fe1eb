//! Data-driven style expressions.
//!
//! An [`Expression`] is pure data handed to the renderer, which evaluates it
//! per feature and per zoom level. The style side only builds and serializes
//! these trees; it never evaluates them.

use serde::{Serialize, Serializer};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// Feature property lookup.
    Get(String),
    Zoom,
    /// Linear interpolation between `(stop, output)` pairs.
    Interpolate {
        input: Box<Expression>,
        stops: Vec<(f64, Expression)>,
    },
    Case {
        branches: Vec<(Expression, Expression)>,
        fallback: Box<Expression>,
    },
    Match {
        input: Box<Expression>,
        arms: Vec<(Value, Expression)>,
        fallback: Box<Expression>,
    },
    Coalesce(Vec<Expression>),
    Compare {
        op: CompareOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    In {
        needle: Box<Expression>,
        haystack: Vec<Value>,
    },
    All(Vec<Expression>),
    Any(Vec<Expression>),
    /// Any other renderer operator, passed through by name.
    Call(String, Vec<Expression>),
}

impl Expression {
    pub fn lit(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn get(property: &str) -> Self {
        Expression::Get(property.to_string())
    }

    pub fn compare(op: CompareOp, left: Expression, right: Expression) -> Self {
        Expression::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Eq, left, right)
    }

    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Gt, left, right)
    }

    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Ge, left, right)
    }

    pub fn property_in(property: &str, values: Vec<Value>) -> Self {
        Expression::In {
            needle: Box::new(Expression::get(property)),
            haystack: values,
        }
    }

    pub fn interpolate_zoom(stops: Vec<(f64, Expression)>) -> Self {
        Expression::Interpolate {
            input: Box::new(Expression::Zoom),
            stops,
        }
    }

    pub fn match_property(
        property: &str,
        arms: Vec<(Value, Expression)>,
        fallback: Expression,
    ) -> Self {
        Expression::Match {
            input: Box::new(Expression::get(property)),
            arms,
            fallback: Box::new(fallback),
        }
    }

    pub fn call(op: &str, args: Vec<Expression>) -> Self {
        Expression::Call(op.to_string(), args)
    }

    /// Renderer JSON representation.
    pub fn to_json(&self) -> Value {
        match self {
            // Bare arrays would be read as expressions, so they need wrapping.
            Expression::Literal(v @ (Value::Array(_) | Value::Object(_))) => {
                json!(["literal", v])
            }
            Expression::Literal(v) => v.clone(),
            Expression::Get(p) => json!(["get", p]),
            Expression::Zoom => json!(["zoom"]),
            Expression::Interpolate { input, stops } => {
                let mut expr = vec![json!("interpolate"), json!(["linear"]), input.to_json()];
                for (stop, out) in stops {
                    expr.push(json!(stop));
                    expr.push(out.to_json());
                }
                Value::Array(expr)
            }
            Expression::Case { branches, fallback } => {
                let mut expr = vec![json!("case")];
                for (cond, out) in branches {
                    expr.push(cond.to_json());
                    expr.push(out.to_json());
                }
                expr.push(fallback.to_json());
                Value::Array(expr)
            }
            Expression::Match {
                input,
                arms,
                fallback,
            } => {
                let mut expr = vec![json!("match"), input.to_json()];
                for (label, out) in arms {
                    expr.push(label.clone());
                    expr.push(out.to_json());
                }
                expr.push(fallback.to_json());
                Value::Array(expr)
            }
            Expression::Coalesce(items) => prefixed("coalesce", items),
            Expression::Compare { op, left, right } => {
                json!([op.as_str(), left.to_json(), right.to_json()])
            }
            Expression::In { needle, haystack } => {
                json!(["in", needle.to_json(), ["literal", haystack]])
            }
            Expression::All(items) => prefixed("all", items),
            Expression::Any(items) => prefixed("any", items),
            Expression::Call(op, args) => prefixed(op, args),
        }
    }
}

fn prefixed(op: &str, items: &[Expression]) -> Value {
    let mut expr = vec![json!(op)];
    expr.extend(items.iter().map(Expression::to_json));
    Value::Array(expr)
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Expression::lit(s)
    }
}

impl From<f64> for Expression {
    fn from(n: f64) -> Self {
        Expression::lit(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_interpolation_serializes_as_renderer_array() {
        let expr = Expression::interpolate_zoom(vec![
            (5.0, Expression::lit(1.0)),
            (12.0, Expression::lit(4.0)),
        ]);
        assert_eq!(
            expr.to_json(),
            json!(["interpolate", ["linear"], ["zoom"], 5.0, 1.0, 12.0, 4.0])
        );
    }

    #[test]
    fn array_literals_are_wrapped() {
        assert_eq!(
            Expression::lit(json!([0.0, 1.5])).to_json(),
            json!(["literal", [0.0, 1.5]])
        );
        assert_eq!(Expression::lit("none").to_json(), json!("none"));
    }

    #[test]
    fn membership_filter_uses_literal_list() {
        let expr = Expression::property_in("voltage", vec![json!(400), json!(220)]);
        assert_eq!(
            expr.to_json(),
            json!(["in", ["get", "voltage"], ["literal", [400, 220]]])
        );
    }

    #[test]
    fn match_and_coalesce_nest() {
        let expr = Expression::match_property(
            "source",
            vec![(json!("hydro"), "#1f78b4".into())],
            Expression::Coalesce(vec![Expression::get("color"), "#7f7f7f".into()]),
        );
        assert_eq!(
            expr.to_json(),
            json!([
                "match",
                ["get", "source"],
                "hydro",
                "#1f78b4",
                ["coalesce", ["get", "color"], "#7f7f7f"]
            ])
        );
    }
}
