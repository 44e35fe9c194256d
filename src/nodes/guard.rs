use std::collections::HashMap;
use evalexpr::{
    build_operator_tree, ContextWithMutableVariables, DefaultNumericTypes, EvalexprError,
    HashMapContext, Node as EvalNode, Operator, Value as EvalValue,
};
use serde_json::Value;
use thiserror::Error;

/// Process-instance variable context.
pub type Variables = HashMap<String, Value>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationError {
    #[error("guard references undefined variable '{0}'")]
    UnknownVariable(String),
    #[error("malformed guard '{expression}': {reason}")]
    Malformed { expression: String, reason: String },
    #[error("guard '{expression}' failed: {reason}")]
    Failed { expression: String, reason: String },
}

/// 预编译的条件表达式
///
/// Accepts `${...}` template wrapping and single-quoted string literals, so
/// `${pass=='1'}` and `pass == "1"` compile to the same tree.
///
/// A variable that is only ever compared (`==` / `!=`) against literals of
/// one type is converted to that type before evaluation, the way template
/// expressions coerce: `pass == '1'` holds for `pass = 1`, `amount == 100`
/// holds for `amount = 100.0` and `done == true` holds for `done = "true"`.
/// Values that cannot be converted are left as they are and compare unequal.
#[derive(Debug, Clone)]
pub struct Guard {
    raw: String,
    tree: EvalNode<DefaultNumericTypes>,
    coercions: HashMap<String, Coercion>,
}

/// Literal type a variable is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coercion {
    Str,
    Int,
    Float,
    Bool,
}

impl Guard {
    pub fn parse(raw: &str) -> Result<Self, EvaluationError> {
        let source = normalize(raw);
        let tree = build_operator_tree::<DefaultNumericTypes>(&source).map_err(|e| {
            EvaluationError::Malformed {
                expression: raw.to_string(),
                reason: e.to_string(),
            }
        })?;

        if let Some(target) = tree.iter_write_variable_identifiers().next() {
            return Err(EvaluationError::Malformed {
                expression: raw.to_string(),
                reason: format!("assignment to '{}' is not allowed in a guard", target),
            });
        }

        let mut hints = HashMap::new();
        collect_hints(&tree, &mut hints);
        let coercions = hints.into_iter()
            .filter_map(|(name, hint)| hint.map(|c| (name, c)))
            .collect();

        Ok(Self {
            raw: raw.to_string(),
            tree,
            coercions,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn evaluate(&self, vars: &Variables) -> Result<bool, EvaluationError> {
        let ctx = self.context(vars)?;
        self.tree
            .eval_boolean_with_context(&ctx)
            .map_err(|e| match e {
                EvalexprError::VariableIdentifierNotFound(name) => {
                    EvaluationError::UnknownVariable(name)
                }
                other => self.failed(other),
            })
    }

    fn context(&self, vars: &Variables) -> Result<HashMapContext<DefaultNumericTypes>, EvaluationError> {
        let mut ctx = HashMapContext::<DefaultNumericTypes>::new();
        for (k, v) in vars {
            // Structured values are not addressable from guards.
            if let Some(ev) = to_eval_value(v, self.coercions.get(k).copied()) {
                ctx.set_value(k.clone(), ev).map_err(|e| self.failed(e))?;
            }
        }
        Ok(ctx)
    }

    fn failed(&self, err: EvalexprError) -> EvaluationError {
        EvaluationError::Failed {
            expression: self.raw.clone(),
            reason: err.to_string(),
        }
    }
}

/// Evaluates an optional guard. An absent guard is always true.
pub fn evaluate(guard: Option<&str>, vars: &Variables) -> Result<bool, EvaluationError> {
    match guard {
        None => Ok(true),
        Some(raw) if raw.trim().is_empty() => Ok(true),
        Some(raw) => Guard::parse(raw)?.evaluate(vars),
    }
}

/// Records, per variable, the literal type it is compared against. `None`
/// marks a variable used any other way, or against mixed types.
fn collect_hints(node: &EvalNode<DefaultNumericTypes>, hints: &mut HashMap<String, Option<Coercion>>) {
    let children = node.children();
    let compared = matches!(node.operator(), Operator::Eq | Operator::Neq) && children.len() == 2;

    for (i, child) in children.iter().enumerate() {
        match child.operator() {
            Operator::VariableIdentifierRead { identifier } => {
                let hint = if compared { literal_kind(&children[1 - i]) } else { None };
                hints.entry(identifier.clone())
                    .and_modify(|h| {
                        if *h != hint {
                            *h = None;
                        }
                    })
                    .or_insert(hint);
            }
            _ => collect_hints(child, hints),
        }
    }
}

fn literal_kind(node: &EvalNode<DefaultNumericTypes>) -> Option<Coercion> {
    match node.operator() {
        Operator::Const { value } => match value {
            EvalValue::String(_) => Some(Coercion::Str),
            EvalValue::Int(_) => Some(Coercion::Int),
            EvalValue::Float(_) => Some(Coercion::Float),
            EvalValue::Boolean(_) => Some(Coercion::Bool),
            _ => None,
        },
        _ => None,
    }
}

fn to_eval_value(value: &Value, coercion: Option<Coercion>) -> Option<EvalValue<DefaultNumericTypes>> {
    let coerced = match (value, coercion) {
        (Value::Number(n), Some(Coercion::Str)) => Some(EvalValue::String(n.to_string())),
        (Value::Bool(b), Some(Coercion::Str)) => Some(EvalValue::String(b.to_string())),
        (Value::Number(n), Some(Coercion::Int)) => integral(n).map(EvalValue::Int),
        (Value::Number(n), Some(Coercion::Float)) => n.as_f64().map(EvalValue::Float),
        (Value::String(s), Some(Coercion::Int)) => s.trim().parse::<i64>().ok().map(EvalValue::Int),
        (Value::String(s), Some(Coercion::Float)) => s.trim().parse::<f64>().ok().map(EvalValue::Float),
        (Value::String(s), Some(Coercion::Bool)) => s.trim().parse::<bool>().ok().map(EvalValue::Boolean),
        _ => None,
    };
    if coerced.is_some() {
        return coerced;
    }

    match value {
        Value::String(s) => Some(EvalValue::String(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(EvalValue::Int(i)),
            None => n.as_f64().map(EvalValue::Float),
        },
        Value::Bool(b) => Some(EvalValue::Boolean(*b)),
        Value::Null => Some(EvalValue::Empty),
        _ => None,
    }
}

/// `100` and `100.0` both give `100`; fractional values give `None`.
fn integral(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Strips a `${ }` wrapper and rewrites single-quoted literals as
/// double-quoted ones.
fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("${")
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);

    let mut out = String::with_capacity(body.len() + 2);
    let mut quote: Option<char> = None;
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (None, '\'') => {
                quote = Some('\'');
                out.push('"');
            }
            (None, '"') => {
                quote = Some('"');
                out.push('"');
            }
            (Some(_), '\\') => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            (Some('\''), '\'') => {
                quote = None;
                out.push('"');
            }
            (Some('\''), '"') => out.push_str("\\\""),
            (Some('"'), '"') => {
                quote = None;
                out.push('"');
            }
            (_, c) => out.push(c),
        }
    }
    out
}
