//! Embedded expression language.
//!
//! Expressions appear in holes (`{user.name}`), attribute values
//! (`class={["btn", {"active": on}]}`), conditional guards
//! (`{_if(items):}`) and component props. They are parsed once with the
//! template and evaluated fresh on every render.
//!
//! # Grammar (loosest binding first)
//!
//! ```text
//! or       := and (("or" | "||") and)*
//! and      := not (("and" | "&&") not)*
//! not      := ("not" | "!") not | cmp
//! cmp      := add (("==" | "!=" | "<" | "<=" | ">" | ">=" | "in") add)?
//! add      := postfix ("+" postfix)*
//! postfix  := primary ("." ident | "[" or "]" | "(" args ")")*
//! primary  := literal | ident | "(" or ")" | list | comprehension | map
//! ```

mod parse;

pub use parse::MAX_EXPR_DEPTH;
pub(crate) use parse::{parse_expr, parse_hole};

use crate::context::Context;
use crate::template::{TemplateError, TemplateResult};
use crate::value::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Add,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Field(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    /// `[item for var in iter if cond]`
    Comprehension {
        item: Box<Expr>,
        var: String,
        iter: Box<Expr>,
        cond: Option<Box<Expr>>,
    },
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
}

/// Lookup chain: comprehension variables shadow the context.
struct Env<'a> {
    ctx: &'a Context,
    local: Option<(&'a str, &'a Value, &'a Env<'a>)>,
}

impl Env<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        match self.local {
            Some((var, value, _)) if var == name => Some(value),
            Some((_, _, parent)) => parent.lookup(name),
            None => self.ctx.get(name),
        }
    }
}

impl Expr {
    /// Evaluate against a binding context.
    pub fn eval(&self, ctx: &Context) -> TemplateResult<Value> {
        self.eval_in(&Env { ctx, local: None })
    }

    /// Name of a bare variable reference, used for `{name}` prop shorthand.
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Self::Var(name) => Some(name),
            _ => None,
        }
    }

    fn eval_in(&self, env: &Env<'_>) -> TemplateResult<Value> {
        match self {
            Self::Literal(v) => Ok(v.clone()),
            Self::Var(name) => env
                .lookup(name)
                .cloned()
                .ok_or_else(|| TemplateError::binding(format!("undefined name `{name}`"))),
            Self::Field(base, name) => Ok(base.eval_in(env)?.field(name)),
            Self::Index(base, key) => {
                let base = base.eval_in(env)?;
                let key = key.eval_in(env)?;
                Ok(base.index(&key))
            }
            Self::List(items) => items
                .iter()
                .map(|e| e.eval_in(env))
                .collect::<TemplateResult<Vec<_>>>()
                .map(Value::List),
            Self::Map(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, e) in entries {
                    map.insert(key.clone(), e.eval_in(env)?);
                }
                Ok(Value::Map(map))
            }
            Self::Comprehension {
                item,
                var,
                iter,
                cond,
            } => {
                let source = iterable(iter.eval_in(env)?)?;
                let mut out = Vec::with_capacity(source.len());
                for value in &source {
                    let inner = Env {
                        ctx: env.ctx,
                        local: Some((var.as_str(), value, env)),
                    };
                    if let Some(cond) = cond
                        && !cond.eval_in(&inner)?.is_truthy()
                    {
                        continue;
                    }
                    out.push(item.eval_in(&inner)?);
                }
                Ok(Value::List(out))
            }
            Self::Not(e) => Ok(Value::Bool(!e.eval_in(env)?.is_truthy())),
            Self::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, env),
            Self::Call(callee, args) => {
                let callee = callee.eval_in(env)?;
                let Value::Func(func) = callee else {
                    return Err(TemplateError::value(format!(
                        "a {} is not callable",
                        callee.type_name()
                    )));
                };
                let args = args
                    .iter()
                    .map(|e| e.eval_in(env))
                    .collect::<TemplateResult<Vec<_>>>()?;
                func.call(&args)
            }
        }
    }
}

fn iterable(value: Value) -> TemplateResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items),
        Value::Map(map) => Ok(map.into_keys().map(Value::from).collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(TemplateError::value(format!(
            "cannot iterate over a {}",
            other.type_name()
        ))),
    }
}

fn eval_binary(op: BinOp, lhs: &Expr, rhs: &Expr, env: &Env<'_>) -> TemplateResult<Value> {
    let left = lhs.eval_in(env)?;
    match op {
        BinOp::And if !left.is_truthy() => return Ok(left),
        BinOp::Or if left.is_truthy() => return Ok(left),
        BinOp::And | BinOp::Or => return rhs.eval_in(env),
        _ => {}
    }
    let right = rhs.eval_in(env)?;

    let ordering = |want: fn(std::cmp::Ordering) -> bool| {
        left.compare(&right).map(want).ok_or_else(|| {
            TemplateError::value(format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            ))
        })
    };

    let result = match op {
        BinOp::Eq => left == right,
        BinOp::Ne => left != right,
        BinOp::Lt => ordering(|o| o.is_lt())?,
        BinOp::Le => ordering(|o| o.is_le())?,
        BinOp::Gt => ordering(|o| o.is_gt())?,
        BinOp::Ge => ordering(|o| o.is_ge())?,
        BinOp::In => contains(&right, &left)?,
        BinOp::Add => return add(left, right),
        BinOp::And | BinOp::Or => unreachable!("short-circuited above"),
    };
    Ok(Value::Bool(result))
}

fn contains(haystack: &Value, needle: &Value) -> TemplateResult<bool> {
    match (haystack, needle) {
        (Value::List(items), _) => Ok(items.contains(needle)),
        (Value::Map(map), Value::Str(key)) => Ok(map.contains_key(&**key)),
        (Value::Str(s), Value::Str(sub)) => Ok(s.contains(&**sub)),
        _ => Err(TemplateError::value(format!(
            "cannot test membership of {} in {}",
            needle.type_name(),
            haystack.type_name()
        ))),
    }
}

fn add(left: Value, right: Value) -> TemplateResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(b)
            .map(Value::Int)
            .ok_or_else(|| TemplateError::value("integer overflow in `+`")),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 + b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::from(format!("{a}{b}"))),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (a, b) => Err(TemplateError::value(format!(
            "cannot add {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}
