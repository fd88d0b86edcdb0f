//! Parsed template tree.
//!
//! Nodes are produced once by the parser and never mutated afterwards;
//! every render walks the same tree with a fresh context.

use serde::Deserialize;

use crate::expr::Expr;

/// Byte range in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(Text),
    Expression(Expression),
    Element(Element),
    Component(Invocation),
    Slot(SlotMarker),
    Fill(SlotFill),
    Conditional(Conditional),
}

impl Node {
    /// Whitespace-only text, the only node that can make a fill "empty".
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.content.trim().is_empty())
    }
}

/// Literal markup, emitted as-is (modulo whitespace normalization).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Text {
    pub content: String,
    /// Directly follows a block marker (`{_if(..):}`, `{name:end}`, ...)
    /// or a hole that has a line to itself.
    pub after_block: bool,
    /// Directly precedes one of the above.
    pub before_block: bool,
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Directive {
    #[default]
    Escape,
    Safe,
    Json,
}

impl Directive {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "escape" => Some(Self::Escape),
            "safe" => Some(Self::Safe),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// `{expr}` / `{expr | directive}`
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub expr: Expr,
    pub directive: Directive,
    pub span: Span,
}

// ============================================================================
// Elements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// `disabled`
    Bare,
    /// `type="text"`, stored without quotes.
    Literal(String),
    /// `class={["btn", {"active": on}]}`
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    Named {
        name: String,
        value: AttrValue,
        span: Span,
    },
    /// `{mapping}` written where an attribute would be.
    Spread { expr: Expr, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FragmentName {
    Static(String),
    /// Taken from an expression-valued `id`, resolved per render.
    Dynamic(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentMarker {
    pub name: FragmentName,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
    pub fragment: Option<FragmentMarker>,
    pub whitespace: Option<WhitespaceMode>,
    pub span: Span,
}

// ============================================================================
// Components and slots
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PropBinding {
    Named {
        name: String,
        value: AttrValue,
        span: Span,
    },
    /// `{user}` binds prop `user` to the variable of the same name.
    Shorthand { name: String, span: Span },
    /// `{...props}`
    Spread { expr: Expr, span: Span },
}

/// `<{Name} ...>children</{Name}>`
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub name: String,
    pub props: Vec<PropBinding>,
    /// Fill content: `Node::Fill` regions plus unmarked default content.
    pub children: Vec<Node>,
    pub span: Span,
}

/// Name of the unnamed slot.
pub const DEFAULT_SLOT: &str = "default";

/// `<{slot}/>`, `<{slot:name}/>`, `<{slot:name}>default</{slot:name}>`
#[derive(Debug, Clone, PartialEq)]
pub struct SlotMarker {
    pub name: String,
    pub default: Option<Vec<Node>>,
    pub span: Span,
}

/// `{name:}` ... `{name:end}` inside an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotFill {
    pub name: String,
    pub children: Vec<Node>,
    pub span: Span,
}

// ============================================================================
// Conditionals
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalForm {
    /// `{_if(expr)}<element/>`
    Inline(Box<Node>),
    /// `{_if(expr):}` ... `{_else:}` ... `{_if:end}`
    Block {
        then: Vec<Node>,
        otherwise: Option<Vec<Node>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub guard: Expr,
    pub form: ConditionalForm,
    pub span: Span,
}

// ============================================================================
// Whitespace
// ============================================================================

/// Text normalization applied at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceMode {
    Keep,
    #[default]
    Trim,
    Dedent,
    Strip,
}

impl WhitespaceMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "keep" => Some(Self::Keep),
            "trim" => Some(Self::Trim),
            "dedent" => Some(Self::Dedent),
            "strip" => Some(Self::Strip),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Trim => "trim",
            Self::Dedent => "dedent",
            Self::Strip => "strip",
        }
    }
}
