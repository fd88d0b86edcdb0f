//! Template rendering.
//!
//! Rendering is a pure walk over an immutable [`Template`]: the same
//! template, context and selection always produce the same output, and
//! nothing is shared between renders.
//!
//! # Modes
//!
//! | Mode   | Used when            | Text / holes | Tags    | Conditionals, components |
//! |--------|----------------------|--------------|---------|--------------------------|
//! | `Full` | no selection, or inside a selected fragment | emitted | emitted | evaluated |
//! | `Seek` | a selection is active, outside any match    | skipped | skipped | evaluated |
//!
//! Seeking still evaluates guards and descends into components and slot
//! fills, so a fragment declared inside a layout or behind a conditional is
//! found exactly where a full render would place it.
//!
//! # Whitespace
//!
//! Only `keep` reproduces a conditional branch or fill byte for byte. The
//! default `trim` drops the line break ending a `{_if(..):}` or fill marker
//! line and the indentation before the closing marker, so a marker or hole
//! on a line of its own leaves no blank line behind.

mod attr;
pub(crate) mod escape;
mod fragment;
mod slot;
mod whitespace;


use crate::component::ComponentRegistry;
use crate::context::Context;
use crate::template::{
    Attr, AttrValue, ConditionalForm, Directive, Element, Expression, Invocation, Node, Origin,
    PropBinding, SlotMarker, Span, Template, TemplateError, TemplateResult, WhitespaceMode,
};
use crate::value::Value;

use attr::AttrSet;
use escape::{escape, is_void_element, keeps_whitespace};
use slot::SlotFills;

pub use fragment::Selection;

/// Per-render settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Whitespace mode for templates that do not override it.
    pub whitespace: WhitespaceMode,
    /// Maximum component nesting depth.
    pub max_depth: usize,
    /// Reject props a component does not declare.
    pub strict_props: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            whitespace: WhitespaceMode::Trim,
            max_depth: 64,
            strict_props: false,
        }
    }
}

/// Render `template` against `ctx`.
///
/// With a selection, only elements whose fragment name is selected are
/// emitted, concatenated in document order.
pub fn render(
    template: &Template,
    ctx: &Context,
    registry: &dyn ComponentRegistry,
    options: &RenderOptions,
    selection: Option<&Selection>,
) -> TemplateResult<String> {
    let renderer = Renderer {
        registry,
        options,
        selection,
    };
    let scope = Scope {
        ctx,
        template,
        slots: None,
        whitespace: options.whitespace,
        depth: 0,
    };
    let mode = if selection.is_some() { Mode::Seek } else { Mode::Full };

    let mut out = String::with_capacity(256);
    renderer.nodes(template.nodes(), scope, mode, &mut out)?;
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    Seek,
}

/// Everything a node needs to render: bindings, the template it belongs to
/// (for error origins), and the fills of the invocation being rendered.
#[derive(Clone, Copy)]
pub(crate) struct Scope<'a> {
    ctx: &'a Context,
    template: &'a Template,
    slots: Option<&'a SlotFills<'a>>,
    whitespace: WhitespaceMode,
    depth: usize,
}

impl Scope<'_> {
    fn origin(&self, span: Span) -> Origin {
        self.template.origin(span)
    }
}

struct Renderer<'r> {
    registry: &'r dyn ComponentRegistry,
    options: &'r RenderOptions,
    selection: Option<&'r Selection>,
}

impl Renderer<'_> {
    fn nodes<'a>(&self, nodes: &'a [Node], scope: Scope<'a>, mode: Mode, out: &mut String) -> TemplateResult<()> {
        for node in nodes {
            self.node(node, scope, mode, out)?;
        }
        Ok(())
    }

    fn node_refs<'a>(
        &self,
        nodes: &[&'a Node],
        scope: Scope<'a>,
        mode: Mode,
        out: &mut String,
    ) -> TemplateResult<()> {
        for node in nodes {
            self.node(node, scope, mode, out)?;
        }
        Ok(())
    }

    fn node<'a>(&self, node: &'a Node, scope: Scope<'a>, mode: Mode, out: &mut String) -> TemplateResult<()> {
        match node {
            Node::Text(text) => {
                if mode == Mode::Full {
                    out.push_str(&whitespace::normalize(text, scope.whitespace));
                }
            }
            Node::Expression(expr) => {
                if mode == Mode::Full {
                    self.expression(expr, scope, out)
                        .map_err(|e| e.at(scope.origin(expr.span)))?;
                }
            }
            Node::Element(el) => self.element(el, scope, mode, out)?,
            Node::Component(inv) => self.component(inv, scope, mode, out)?,
            Node::Slot(slot) => self.slot(slot, scope, mode, out)?,
            // consumed by slot partitioning
            Node::Fill(_) => {}
            Node::Conditional(cond) => {
                let on = cond
                    .guard
                    .eval(scope.ctx)
                    .map_err(|e| e.at(scope.origin(cond.span)))?
                    .is_truthy();
                match &cond.form {
                    ConditionalForm::Inline(inner) if on => self.node(inner, scope, mode, out)?,
                    ConditionalForm::Inline(_) => {}
                    ConditionalForm::Block { then, .. } if on => self.nodes(then, scope, mode, out)?,
                    ConditionalForm::Block { otherwise, .. } => {
                        if let Some(otherwise) = otherwise {
                            self.nodes(otherwise, scope, mode, out)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn expression(&self, expr: &Expression, scope: Scope<'_>, out: &mut String) -> TemplateResult<()> {
        let value = expr.expr.eval(scope.ctx)?;
        match (expr.directive, &value) {
            (Directive::Escape, value) => write_escaped(value, out)?,
            (Directive::Safe, value) => out.push_str(&value.to_text()?),
            (Directive::Json, value) => {
                let json = serde_json::to_string(value)
                    .map_err(|err| TemplateError::value(format!("cannot serialize to JSON: {err}")))?;
                out.push_str(&escape(&json));
            }
        }
        Ok(())
    }

    fn element<'a>(&self, el: &'a Element, scope: Scope<'a>, mode: Mode, out: &mut String) -> TemplateResult<()> {
        let mut mode = mode;
        if let Some(marker) = &el.fragment {
            let name = fragment::resolve_name(&marker.name, scope.ctx)
                .map_err(|e| e.at(scope.origin(marker.span)))?;
            if mode == Mode::Seek && self.selection.is_some_and(|s| s.contains(&name)) {
                mode = Mode::Full;
            }
        }

        let whitespace = match el.whitespace {
            Some(mode) => mode,
            None if keeps_whitespace(&el.tag) => WhitespaceMode::Keep,
            None => scope.whitespace,
        };
        let scope = Scope { whitespace, ..scope };

        if mode == Mode::Seek {
            return self.nodes(&el.children, scope, mode, out);
        }

        let mut attrs = AttrSet::default();
        for attr in &el.attrs {
            match attr {
                Attr::Named {
                    name,
                    value: AttrValue::Bare,
                    ..
                } => attrs.set(name, None),
                Attr::Named {
                    name,
                    value: AttrValue::Literal(literal),
                    ..
                } => attrs.set_literal(name, literal),
                Attr::Named {
                    name,
                    value: AttrValue::Expr(expr),
                    span,
                } => expr
                    .eval(scope.ctx)
                    .and_then(|value| attr::apply(&mut attrs, name, value))
                    .map_err(|e| e.at(scope.origin(*span)))?,
                Attr::Spread { expr, span } => expr
                    .eval(scope.ctx)
                    .and_then(|value| attr::apply_spread(&mut attrs, value))
                    .map_err(|e| e.at(scope.origin(*span)))?,
            }
        }

        out.push('<');
        out.push_str(&el.tag);
        attrs.write_to(out);
        out.push('>');
        if is_void_element(&el.tag.to_ascii_lowercase()) {
            return Ok(());
        }
        self.nodes(&el.children, scope, Mode::Full, out)?;
        out.push_str("</");
        out.push_str(&el.tag);
        out.push('>');
        Ok(())
    }

    fn component<'a>(&self, inv: &'a Invocation, scope: Scope<'a>, mode: Mode, out: &mut String) -> TemplateResult<()> {
        let origin = || scope.origin(inv.span);
        if scope.depth >= self.options.max_depth {
            return Err(TemplateError::binding(format!(
                "component nesting exceeds max_depth ({}) at `{}`",
                self.options.max_depth, inv.name
            ))
            .at(origin()));
        }

        let component = self.registry.resolve(&inv.name).map_err(|e| e.at(origin()))?;
        let supplied = self.props(inv, scope)?;
        let bound = component
            .schema()
            .bind(&inv.name, supplied, self.options.strict_props)
            .map_err(|e| e.at(origin()))?;
        let fills = SlotFills::new(slot::partition(inv, &component, scope.template)?, scope);

        let ctx = scope.ctx.child(bound);
        let template: &Template = component.template();
        let inner = Scope {
            ctx: &ctx,
            template,
            slots: Some(&fills),
            whitespace: self.options.whitespace,
            depth: scope.depth + 1,
        };
        self.nodes(template.nodes(), inner, mode, out)
    }

    fn props(&self, inv: &Invocation, scope: Scope<'_>) -> TemplateResult<Vec<(String, Value)>> {
        let mut supplied = Vec::with_capacity(inv.props.len());
        for prop in &inv.props {
            match prop {
                PropBinding::Named { name, value, span } => {
                    let value = match value {
                        AttrValue::Bare => Value::Bool(true),
                        AttrValue::Literal(literal) => Value::from(literal.as_str()),
                        AttrValue::Expr(expr) => {
                            expr.eval(scope.ctx).map_err(|e| e.at(scope.origin(*span)))?
                        }
                    };
                    supplied.push((name.clone(), value));
                }
                PropBinding::Shorthand { name, span } => {
                    let value = scope.ctx.get(name).cloned().ok_or_else(|| {
                        TemplateError::binding(format!("undefined name `{name}`")).at(scope.origin(*span))
                    })?;
                    supplied.push((name.clone(), value));
                }
                PropBinding::Spread { expr, span } => {
                    match expr.eval(scope.ctx).map_err(|e| e.at(scope.origin(*span)))? {
                        Value::Map(map) => supplied.extend(map),
                        Value::Null => {}
                        other => {
                            return Err(TemplateError::value(format!(
                                "prop spread expects a mapping, got a {}",
                                other.type_name()
                            ))
                            .at(scope.origin(*span)));
                        }
                    }
                }
            }
        }
        Ok(supplied)
    }

    /// Caller's fill in the caller's scope, else the slot's own default.
    fn slot<'a>(&self, slot: &'a SlotMarker, scope: Scope<'a>, mode: Mode, out: &mut String) -> TemplateResult<()> {
        if let Some(fills) = scope.slots
            && let Some(nodes) = fills.get(&slot.name)
        {
            return self.node_refs(nodes, fills.caller, mode, out);
        }
        if let Some(default) = &slot.default {
            self.nodes(default, scope, mode, out)?;
        }
        Ok(())
    }
}

/// Escape a hole value. Markup passes through, including markup nested in
/// lists; list items are separated by a space as in [`Value::to_text`].
fn write_escaped(value: &Value, out: &mut String) -> TemplateResult<()> {
    match value {
        Value::Markup(markup) => out.push_str(markup.as_str()),
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_escaped(item, out)?;
            }
        }
        value => out.push_str(&escape(&value.to_text()?)),
    }
    Ok(())
}
