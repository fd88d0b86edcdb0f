//! Template parsing.
//!
//! A [`Template`] is the immutable result of parsing one source document:
//! the node tree plus what is needed to report errors against the source.
//! Parsing and rendering are separate phases; a template that parsed
//! successfully can only fail to render for binding or value reasons.
//!
//! # Example
//!
//! ```ignore
//! let tpl = Template::parse("page.html", "<h1>{title}</h1>")?;
//! assert_eq!(tpl.name(), "page.html");
//! ```

mod error;
mod lexer;
mod node;
mod parser;

use std::sync::Arc;

pub use error::{ErrorKind, LineIndex, Location, Origin, TemplateError, TemplateResult};
pub use node::{
    Attr, AttrValue, Conditional, ConditionalForm, DEFAULT_SLOT, Directive, Element, Expression,
    FragmentMarker, FragmentName, Invocation, Node, PropBinding, SlotFill, SlotMarker, Span, Text,
    WhitespaceMode,
};
pub use parser::MAX_NESTING;

/// Parsed, immutable template.
#[derive(Debug, Clone)]
pub struct Template {
    name: Arc<str>,
    nodes: Vec<Node>,
    lines: LineIndex,
}

impl Template {
    /// Parse `source`; `name` is used in error locations and logs.
    pub fn parse(name: impl Into<Arc<str>>, source: &str) -> TemplateResult<Self> {
        let name = name.into();
        let lines = LineIndex::new(source);
        let nodes = parser::parse(&name, source, &lines)?;
        Ok(Self { name, nodes, lines })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn locate(&self, offset: usize) -> Location {
        self.lines.locate(offset)
    }

    /// Error origin for a node span.
    pub fn origin(&self, span: Span) -> Origin {
        Origin::new(Arc::clone(&self.name), self.locate(span.start))
    }

    /// Slots declared anywhere in the tree, with whether each has default
    /// content. First declaration wins for duplicates.
    pub fn declared_slots(&self) -> Vec<(&str, bool)> {
        let mut slots: Vec<(&str, bool)> = Vec::new();
        walk(&self.nodes, &mut |node| {
            if let Node::Slot(slot) = node
                && !slots.iter().any(|(name, _)| *name == slot.name)
            {
                slots.push((&slot.name, slot.default.is_some()));
            }
        });
        slots
    }

    /// Statically known fragment names, in document order.
    ///
    /// Fragments named by an expression `id` are only known at render time
    /// and are not listed.
    pub fn fragment_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        walk(&self.nodes, &mut |node| {
            if let Node::Element(Element {
                fragment:
                    Some(FragmentMarker {
                        name: FragmentName::Static(name),
                        ..
                    }),
                ..
            }) = node
            {
                names.push(name.as_str());
            }
        });
        names
    }
}

/// Pre-order walk over every node, including branches and fill content.
fn walk<'a>(nodes: &'a [Node], visit: &mut impl FnMut(&'a Node)) {
    for node in nodes {
        visit(node);
        match node {
            Node::Text(_) | Node::Expression(_) => {}
            Node::Element(el) => walk(&el.children, visit),
            Node::Component(inv) => walk(&inv.children, visit),
            Node::Fill(fill) => walk(&fill.children, visit),
            Node::Slot(slot) => {
                if let Some(default) = &slot.default {
                    walk(default, visit);
                }
            }
            Node::Conditional(cond) => match &cond.form {
                ConditionalForm::Inline(inner) => walk(std::slice::from_ref(&**inner), visit),
                ConditionalForm::Block { then, otherwise } => {
                    walk(then, visit);
                    if let Some(otherwise) = otherwise {
                        walk(otherwise, visit);
                    }
                }
            },
        }
    }
}
