//! Template parser: tokens -> validated node tree.
//!
//! A stack machine over the lexer's tokens. Every open construct is a
//! [`Frame`]; closing a construct pops its frame and appends the finished
//! node to the new top.
//!
//! | Frame       | Opened by              | Closed by                          |
//! |-------------|------------------------|------------------------------------|
//! | `Element`   | `<tag>`                | `</tag>`                           |
//! | `Component` | `<{Name}>`             | `</{Name}>`                        |
//! | `Slot`      | `<{slot:name}>`        | `</{slot:name}>`                   |
//! | `If`        | `{_if(expr):}`         | `{_if:end}`                        |
//! | `Fill`      | `{name:}`              | `{name:end}`, next fill, `</{Name}>` |
//!
//! A fill is the only construct with an implicit close, and only when the
//! enclosing component is the sole other construct it could belong to.

use std::sync::Arc;

use super::error::{LineIndex, Origin, TemplateError, TemplateResult};
use super::lexer::{self, RawAttr, RawValue, Tag, TagName, Token};
use super::node::{
    Attr, AttrValue, Conditional, ConditionalForm, DEFAULT_SLOT, Directive, Element, Expression,
    FragmentMarker, FragmentName, Invocation, Node, PropBinding, SlotFill, SlotMarker, Span, Text,
    WhitespaceMode,
};
use crate::expr::{Expr, parse_expr, parse_hole};
use crate::render::escape::is_void_element;

/// Deepest nesting of elements, components, slots, conditionals and fills.
/// Rendering recurses once per level.
pub const MAX_NESTING: usize = 128;

pub(crate) fn parse(name: &Arc<str>, source: &str, lines: &LineIndex) -> TemplateResult<Vec<Node>> {
    let tokens = lexer::tokenize(source).map_err(|e| syntax(name, lines, e.message, e.offset))?;
    let mut parser = Parser {
        name,
        lines,
        stack: vec![Frame::new(FrameKind::Root)],
        pending_if: None,
        after_block: false,
        hole_line: false,
    };
    for token in tokens {
        parser.feed(token)?;
    }
    parser.finish()
}

fn syntax(name: &Arc<str>, lines: &LineIndex, message: impl Into<String>, offset: usize) -> TemplateError {
    TemplateError::syntax(message, Origin::new(Arc::clone(name), lines.locate(offset)))
}

// ============================================================================
// Frames
// ============================================================================

type InlineIf = Option<(Expr, Span)>;

enum FrameKind {
    Root,
    Element {
        tag: String,
        attrs: Vec<Attr>,
        fragment: Option<FragmentMarker>,
        whitespace: Option<WhitespaceMode>,
        span: Span,
        inline_if: InlineIf,
    },
    Component {
        name: String,
        props: Vec<PropBinding>,
        span: Span,
        inline_if: InlineIf,
    },
    Slot {
        name: String,
        span: Span,
    },
    If {
        guard: Expr,
        span: Span,
        then: Option<Vec<Node>>,
    },
    Fill {
        name: String,
        span: Span,
    },
}

struct Frame {
    kind: FrameKind,
    children: Vec<Node>,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    fn describe(&self) -> String {
        match &self.kind {
            FrameKind::Root => "end of template".to_string(),
            FrameKind::Element { tag, .. } => format!("`</{tag}>`"),
            FrameKind::Component { name, .. } => format!("`</{{{name}}}>`"),
            FrameKind::Slot { name, .. } => format!("`</{{{}}}>`", slot_tag(name)),
            FrameKind::If { .. } => "`{_if:end}`".to_string(),
            FrameKind::Fill { name, .. } => format!("`{{{name}:end}}`"),
        }
    }

    fn open_offset(&self) -> usize {
        match &self.kind {
            FrameKind::Root => 0,
            FrameKind::Element { span, .. }
            | FrameKind::Component { span, .. }
            | FrameKind::Slot { span, .. }
            | FrameKind::If { span, .. }
            | FrameKind::Fill { span, .. } => span.start,
        }
    }
}

fn slot_tag(name: &str) -> String {
    if name == DEFAULT_SLOT {
        "slot".to_string()
    } else {
        format!("slot:{name}")
    }
}

// ============================================================================
// Hole classification
// ============================================================================

enum Marker {
    Expr(Expr, Directive),
    IfBlock(Expr),
    IfInline(Expr),
    Else,
    IfEnd,
    FillOpen(String),
    FillEnd(String),
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c == '-' || c.is_ascii_alphanumeric())
}

/// Index of the `)` closing the `(` at `open`, skipping quoted strings.
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'p> {
    name: &'p Arc<str>,
    lines: &'p LineIndex,
    stack: Vec<Frame>,
    pending_if: InlineIf,
    after_block: bool,
    /// The last node is a hole that starts its own line.
    hole_line: bool,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>, offset: usize) -> TemplateError {
        syntax(self.name, self.lines, message, offset)
    }

    /// Push a frame for a newly opened construct.
    fn open(&mut self, kind: FrameKind) -> TemplateResult<()> {
        let frame = Frame::new(kind);
        // the root frame does not count
        if self.stack.len() > MAX_NESTING {
            return Err(self.error(
                format!("constructs nested too deeply (limit {MAX_NESTING})"),
                frame.open_offset(),
            ));
        }
        self.stack.push(frame);
        Ok(())
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn push(&mut self, node: Node) {
        self.after_block = false;
        self.hole_line = false;
        self.top().children.push(node);
    }

    fn push_text(&mut self, content: &str) {
        let mut after_block = std::mem::take(&mut self.after_block);
        let hole_line = std::mem::take(&mut self.hole_line);
        let children = &mut self.top().children;
        if let Some(Node::Text(prev)) = children.last_mut() {
            prev.content.push_str(content);
            return;
        }
        // a hole alone on its line is normalized like a block marker
        if hole_line && (content.starts_with('\n') || content.starts_with("\r\n")) {
            let before = children.len().checked_sub(2).and_then(|i| children.get_mut(i));
            if let Some(Node::Text(before)) = before {
                before.before_block = true;
            }
            after_block = true;
        }
        children.push(Node::Text(Text {
            content: content.to_string(),
            after_block,
            before_block: false,
        }));
    }

    /// Whether a hole pushed now would start its line.
    fn at_line_start(&mut self) -> bool {
        match self.top().children.last() {
            Some(Node::Text(text)) => text
                .content
                .rfind('\n')
                .is_some_and(|nl| text.content[nl + 1..].chars().all(|c| c == ' ' || c == '\t')),
            _ => false,
        }
    }

    /// Flag the text just before a block marker, then expect text after it.
    fn mark_block(&mut self) {
        if let Some(Node::Text(text)) = self.top().children.last_mut() {
            text.before_block = true;
        }
    }

    fn feed(&mut self, token: Token<'_>) -> TemplateResult<()> {
        if let Some((_, if_span)) = &self.pending_if {
            let if_start = if_span.start;
            match &token {
                Token::Text { text, .. } if text.trim().is_empty() => return Ok(()),
                Token::Open(Tag {
                    name: TagName::Brace(name, _),
                    ..
                }) if is_slot_name(name) => {
                    return Err(self.error("inline `_if` cannot guard a slot declaration", if_start));
                }
                Token::Open(_) => {}
                _ => {
                    return Err(self.error(
                        "inline `_if` must be followed by an element or component",
                        if_start,
                    ));
                }
            }
        }

        if !matches!(token, Token::Text { .. }) {
            self.hole_line = false;
        }
        match token {
            Token::Text { text, .. } => {
                self.push_text(&text);
                Ok(())
            }
            Token::Hole { body, span } => self.hole(body, span),
            Token::Open(tag) => self.open_tag(tag),
            Token::Close { name, span } => self.close_tag(name, span),
        }
    }

    fn finish(mut self) -> TemplateResult<Vec<Node>> {
        if let Some((_, span)) = &self.pending_if {
            return Err(self.error(
                "inline `_if` must be followed by an element or component",
                span.start,
            ));
        }
        if self.stack.len() > 1 {
            let frame = &self.stack[self.stack.len() - 1];
            return Err(self.error(
                format!("unclosed construct: expected {}", frame.describe()),
                frame.open_offset(),
            ));
        }
        Ok(self.stack.pop().map(|f| f.children).unwrap_or_default())
    }

    // ------------------------------------------------------------------------
    // Holes and markers
    // ------------------------------------------------------------------------

    fn classify(&self, body: &str, span: Span) -> TemplateResult<Marker> {
        let offset = span.start + 1;
        let trimmed = body.trim();
        let lead = offset + (body.len() - body.trim_start().len());

        match trimmed {
            "_else:" => return Ok(Marker::Else),
            "_if:end" => return Ok(Marker::IfEnd),
            _ => {}
        }

        if let Some(rest) = trimmed.strip_prefix("_if")
            && !rest.starts_with(|c: char| c == '_' || c.is_ascii_alphanumeric())
        {
            if !rest.starts_with('(') {
                return Err(self.error("malformed conditional marker", lead));
            }
            let close = matching_paren(trimmed, 3)
                .ok_or_else(|| self.error("unclosed `(` in conditional", lead + 3))?;
            let guard = parse_expr(&trimmed[4..close], lead + 4)
                .map_err(|e| self.error(e.message, e.offset))?;
            return match trimmed[close + 1..].trim() {
                ":" => Ok(Marker::IfBlock(guard)),
                "" => Ok(Marker::IfInline(guard)),
                _ => Err(self.error(
                    "expected `:` or `}` after the conditional guard",
                    lead + close + 1,
                )),
            };
        }

        if let Some(name) = trimmed.strip_suffix(":end")
            && is_ident(name)
        {
            return Ok(Marker::FillEnd(name.to_string()));
        }
        if let Some(name) = trimmed.strip_suffix(':')
            && is_ident(name)
        {
            return Ok(Marker::FillOpen(name.to_string()));
        }

        let (expr, directive) = parse_hole(body, offset).map_err(|e| self.error(e.message, e.offset))?;
        let directive = match directive {
            None => Directive::Escape,
            Some((name, at)) => Directive::from_name(&name)
                .ok_or_else(|| self.error(format!("unknown directive `{name}`"), at))?,
        };
        Ok(Marker::Expr(expr, directive))
    }

    fn hole(&mut self, body: &str, span: Span) -> TemplateResult<()> {
        match self.classify(body, span)? {
            Marker::Expr(expr, directive) => {
                let hole_line = self.at_line_start();
                self.push(Node::Expression(Expression {
                    expr,
                    directive,
                    span,
                }));
                self.hole_line = hole_line;
            }
            Marker::IfInline(guard) => self.pending_if = Some((guard, span)),
            Marker::IfBlock(guard) => {
                self.mark_block();
                self.open(FrameKind::If {
                    guard,
                    span,
                    then: None,
                })?;
                self.after_block = true;
            }
            Marker::Else => {
                self.mark_block();
                let problem = match &self.top().kind {
                    FrameKind::If { then: None, .. } => None,
                    FrameKind::If { .. } => Some("duplicate `{_else:}` in conditional"),
                    _ => Some("`{_else:}` outside a conditional block"),
                };
                if let Some(problem) = problem {
                    return Err(self.error(problem, span.start));
                }
                let frame = self.top();
                if let FrameKind::If { then, .. } = &mut frame.kind {
                    *then = Some(std::mem::take(&mut frame.children));
                }
                self.after_block = true;
            }
            Marker::IfEnd => {
                self.mark_block();
                if !matches!(self.top().kind, FrameKind::If { .. }) {
                    let expected = self.top_description();
                    return Err(self.error(
                        format!("unexpected `{{_if:end}}`; expected {expected}"),
                        span.start,
                    ));
                }
                self.close_frame()?;
                self.after_block = true;
            }
            Marker::FillOpen(name) => {
                self.mark_block();
                if matches!(self.top().kind, FrameKind::Fill { .. }) {
                    self.close_frame()?;
                }
                if !matches!(self.top().kind, FrameKind::Component { .. }) {
                    return Err(self.error(
                        format!("slot fill `{{{name}:}}` must appear directly inside a component"),
                        span.start,
                    ));
                }
                self.open(FrameKind::Fill { name, span })?;
                self.after_block = true;
            }
            Marker::FillEnd(name) => {
                self.mark_block();
                let open = matches!(&self.top().kind, FrameKind::Fill { name: open, .. } if *open == name);
                if !open {
                    let expected = self.top_description();
                    return Err(self.error(
                        format!("unexpected `{{{name}:end}}`; expected {expected}"),
                        span.start,
                    ));
                }
                self.close_frame()?;
                self.after_block = true;
            }
        }
        Ok(())
    }

    fn top_description(&self) -> String {
        self.stack.last().map(Frame::describe).unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------------

    fn open_tag(&mut self, tag: Tag<'_>) -> TemplateResult<()> {
        let inline_if = self.pending_if.take();
        match tag.name {
            TagName::Html(name) => {
                let (attrs, fragment, whitespace) = self.element_attrs(tag.attrs)?;
                let kind = FrameKind::Element {
                    tag: name.to_string(),
                    attrs,
                    fragment,
                    whitespace,
                    span: tag.span,
                    inline_if,
                };
                self.open(kind)?;
                if tag.self_closing || is_void_element(&name.to_ascii_lowercase()) {
                    self.close_frame()?;
                }
            }
            TagName::Brace(name, offset) if is_slot_name(name) => {
                if let Some(attr) = tag.attrs.first() {
                    let at = match attr {
                        RawAttr::Named { span, .. } | RawAttr::Brace { span, .. } => span.start,
                    };
                    return Err(self.error("slot declarations take no attributes", at));
                }
                let slot = slot_name(name)
                    .ok_or_else(|| self.error(format!("invalid slot name in `<{{{name}}}>`"), offset))?;
                if tag.self_closing {
                    self.push(Node::Slot(SlotMarker {
                        name: slot,
                        default: None,
                        span: tag.span,
                    }));
                } else {
                    self.open(FrameKind::Slot {
                        name: slot,
                        span: tag.span,
                    })?;
                }
            }
            TagName::Brace(name, offset) => {
                if !is_component_name(name) {
                    return Err(self.error(format!("invalid component name `{name}`"), offset));
                }
                let props = self.component_props(tag.attrs)?;
                self.open(FrameKind::Component {
                    name: name.to_string(),
                    props,
                    span: tag.span,
                    inline_if,
                })?;
                if tag.self_closing {
                    self.close_frame()?;
                }
            }
        }
        Ok(())
    }

    fn close_tag(&mut self, name: TagName<'_>, span: Span) -> TemplateResult<()> {
        // a fill region ends implicitly at its component's end tag
        if let TagName::Brace(closing, _) = name
            && !is_slot_name(closing)
            && matches!(self.top().kind, FrameKind::Fill { .. })
            && self.stack.len() >= 2
            && matches!(
                &self.stack[self.stack.len() - 2].kind,
                FrameKind::Component { name, .. } if name == closing
            )
        {
            self.close_frame()?;
        }

        let matches = match (&self.top().kind, name) {
            (FrameKind::Element { tag, .. }, TagName::Html(closing)) => tag.eq_ignore_ascii_case(closing),
            (FrameKind::Component { name, .. }, TagName::Brace(closing, _)) => name == closing,
            (FrameKind::Slot { name, .. }, TagName::Brace(closing, _)) => {
                slot_name(closing).is_some_and(|c| c == *name) && is_slot_name(closing)
            }
            _ => false,
        };
        if !matches {
            let found = match name {
                TagName::Html(tag) => format!("`</{tag}>`"),
                TagName::Brace(inner, _) => format!("`</{{{inner}}}>`"),
            };
            let expected = self.top_description();
            return Err(self.error(format!("unexpected {found}; expected {expected}"), span.start));
        }
        self.close_frame()
    }

    /// Pop the top frame, build its node, and attach it to the parent.
    fn close_frame(&mut self) -> TemplateResult<()> {
        let Some(frame) = self.stack.pop() else {
            return Ok(());
        };
        let children = frame.children;
        match frame.kind {
            FrameKind::Root => {
                self.stack.push(Frame {
                    kind: FrameKind::Root,
                    children,
                });
            }
            FrameKind::Element {
                tag,
                attrs,
                fragment,
                whitespace,
                span,
                inline_if,
            } => {
                let node = Node::Element(Element {
                    tag,
                    attrs,
                    children,
                    fragment,
                    whitespace,
                    span,
                });
                self.push_guarded(node, inline_if);
            }
            FrameKind::Component {
                name,
                props,
                span,
                inline_if,
            } => {
                self.check_fills(&name, &children)?;
                let node = Node::Component(Invocation {
                    name,
                    props,
                    children,
                    span,
                });
                self.push_guarded(node, inline_if);
            }
            FrameKind::Slot { name, span } => self.push(Node::Slot(SlotMarker {
                name,
                default: Some(children),
                span,
            })),
            FrameKind::If { guard, span, then } => {
                let form = match then {
                    Some(then) => ConditionalForm::Block {
                        then,
                        otherwise: Some(children),
                    },
                    None => ConditionalForm::Block {
                        then: children,
                        otherwise: None,
                    },
                };
                self.push(Node::Conditional(Conditional { guard, form, span }));
            }
            FrameKind::Fill { name, span } => self.push(Node::Fill(SlotFill {
                name,
                children,
                span,
            })),
        }
        Ok(())
    }

    fn push_guarded(&mut self, node: Node, inline_if: InlineIf) {
        let node = match inline_if {
            Some((guard, span)) => Node::Conditional(Conditional {
                guard,
                form: ConditionalForm::Inline(Box::new(node)),
                span,
            }),
            None => node,
        };
        self.push(node);
    }

    /// Fill names are unique; an explicit default fill excludes stray content.
    fn check_fills(&self, component: &str, children: &[Node]) -> TemplateResult<()> {
        let mut seen: Vec<&str> = Vec::new();
        let mut explicit_default = None;
        for child in children {
            if let Node::Fill(fill) = child {
                if seen.contains(&fill.name.as_str()) {
                    return Err(self.error(
                        format!("slot `{}` is filled twice in `{component}`", fill.name),
                        fill.span.start,
                    ));
                }
                seen.push(&fill.name);
                if fill.name == DEFAULT_SLOT {
                    explicit_default = Some(fill.span);
                }
            }
        }
        if let Some(span) = explicit_default
            && let Some(stray) = children
                .iter()
                .find(|c| !matches!(c, Node::Fill(_)) && !c.is_blank())
        {
            let at = node_offset(stray).unwrap_or(span.start);
            return Err(self.error(
                format!("content outside any fill in `{component}`, which already has `{{default:}}`"),
                at,
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------------

    fn attr_value(&self, value: RawValue<'_>) -> TemplateResult<AttrValue> {
        Ok(match value {
            RawValue::Bare => AttrValue::Bare,
            RawValue::Quoted(s) => AttrValue::Literal(s.to_string()),
            RawValue::Brace { body, offset } => AttrValue::Expr(
                parse_expr(body, offset).map_err(|e| self.error(e.message, e.offset))?,
            ),
        })
    }

    fn spread_expr(&self, body: &str, offset: usize) -> TemplateResult<Expr> {
        let lead = body.len() - body.trim_start().len();
        let (body, offset) = match body.trim_start().strip_prefix("...") {
            Some(rest) => (rest, offset + lead + 3),
            None => (body, offset),
        };
        parse_expr(body, offset).map_err(|e| self.error(e.message, e.offset))
    }

    fn element_attrs(
        &self,
        raw: Vec<RawAttr<'_>>,
    ) -> TemplateResult<(Vec<Attr>, Option<FragmentMarker>, Option<WhitespaceMode>)> {
        let mut attrs = Vec::with_capacity(raw.len());
        let mut fragment_request = None;
        let mut whitespace = None;

        for attr in raw {
            match attr {
                RawAttr::Brace { body, offset, span } => attrs.push(Attr::Spread {
                    expr: self.spread_expr(body, offset)?,
                    span,
                }),
                RawAttr::Named {
                    name: "_fragment",
                    value,
                    span,
                } => fragment_request = Some((value, span)),
                RawAttr::Named {
                    name: "_whitespace",
                    value,
                    span,
                } => {
                    let mode = match value {
                        RawValue::Quoted(mode) => WhitespaceMode::from_name(mode.trim()),
                        _ => None,
                    };
                    whitespace = Some(mode.ok_or_else(|| {
                        self.error("`_whitespace` must be one of keep, trim, dedent, strip", span.start)
                    })?);
                }
                RawAttr::Named { name, span, .. } if name.starts_with('_') => {
                    return Err(self.error(format!("unknown directive attribute `{name}`"), span.start));
                }
                RawAttr::Named { name, value, span } => attrs.push(Attr::Named {
                    name: name.to_string(),
                    value: self.attr_value(value)?,
                    span,
                }),
            }
        }

        let fragment = match fragment_request {
            None => None,
            Some((value, span)) => Some(FragmentMarker {
                name: self.fragment_name(value, &attrs, span)?,
                span,
            }),
        };
        Ok((attrs, fragment, whitespace))
    }

    /// Explicit name first, then a literal `id`, then an expression `id`.
    fn fragment_name(&self, value: RawValue<'_>, attrs: &[Attr], span: Span) -> TemplateResult<FragmentName> {
        match value {
            RawValue::Quoted(name) if !name.trim().is_empty() => {
                return Ok(FragmentName::Static(name.trim().to_string()));
            }
            RawValue::Quoted(_) => {
                return Err(self.error("`_fragment` name is empty", span.start));
            }
            RawValue::Brace { body, offset } => {
                let expr = parse_expr(body, offset).map_err(|e| self.error(e.message, e.offset))?;
                return Ok(FragmentName::Dynamic(expr));
            }
            RawValue::Bare => {}
        }

        let id = attrs.iter().rev().find_map(|attr| match attr {
            Attr::Named { name, value, .. } if name == "id" => Some(value),
            _ => None,
        });
        match id {
            Some(AttrValue::Literal(id)) if !id.trim().is_empty() => {
                Ok(FragmentName::Static(id.trim().to_string()))
            }
            Some(AttrValue::Expr(expr)) => Ok(FragmentName::Dynamic(expr.clone())),
            _ => Err(self.error(
                "`_fragment` needs a name or a non-empty `id` attribute",
                span.start,
            )),
        }
    }

    fn component_props(&self, raw: Vec<RawAttr<'_>>) -> TemplateResult<Vec<PropBinding>> {
        let mut props = Vec::with_capacity(raw.len());
        for attr in raw {
            match attr {
                RawAttr::Named { name, span, .. } if name.starts_with('_') => {
                    return Err(self.error(
                        format!("directive attribute `{name}` is not allowed on a component"),
                        span.start,
                    ));
                }
                RawAttr::Named { name, value, span } => props.push(PropBinding::Named {
                    name: name.to_string(),
                    value: self.attr_value(value)?,
                    span,
                }),
                RawAttr::Brace { body, offset, span } => {
                    let trimmed = body.trim();
                    if trimmed.starts_with("...") {
                        props.push(PropBinding::Spread {
                            expr: self.spread_expr(body, offset)?,
                            span,
                        });
                    } else if is_ident(trimmed) && !trimmed.contains('-') {
                        props.push(PropBinding::Shorthand {
                            name: trimmed.to_string(),
                            span,
                        });
                    } else {
                        return Err(self.error(
                            "component attributes in braces must be `{name}` or `{...mapping}`",
                            span.start,
                        ));
                    }
                }
            }
        }
        Ok(props)
    }
}

fn is_slot_name(name: &str) -> bool {
    name == "slot" || name.starts_with("slot:")
}

/// `slot` -> default, `slot:name` -> name.
fn slot_name(name: &str) -> Option<String> {
    match name.strip_prefix("slot") {
        Some("") => Some(DEFAULT_SLOT.to_string()),
        Some(rest) => rest
            .strip_prefix(':')
            .map(str::trim)
            .filter(|n| is_ident(n))
            .map(str::to_string),
        None => None,
    }
}

fn is_component_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('.')
            .all(|segment| is_ident(segment) && !segment.contains('-'))
}

fn node_offset(node: &Node) -> Option<usize> {
    match node {
        Node::Text(_) => None,
        Node::Expression(e) => Some(e.span.start),
        Node::Element(e) => Some(e.span.start),
        Node::Component(c) => Some(c.span.start),
        Node::Slot(s) => Some(s.span.start),
        Node::Fill(f) => Some(f.span.start),
        Node::Conditional(c) => Some(c.span.start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{ErrorKind, Template};

    fn parse_ok(src: &str) -> Vec<Node> {
        Template::parse("test.html", src)
            .expect("template should parse")
            .nodes()
            .to_vec()
    }

    fn parse_err(src: &str) -> TemplateError {
        let err = Template::parse("test.html", src).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax, "unexpected error: {err}");
        err
    }

    #[test]
    fn test_element_tree() {
        let nodes = parse_ok(r#"<div class="a"><p>Hi {name}</p><br></div>"#);
        let [Node::Element(div)] = nodes.as_slice() else {
            panic!("expected one element");
        };
        assert_eq!(div.tag, "div");
        assert_eq!(div.children.len(), 2);
        let Node::Element(p) = &div.children[0] else {
            panic!("expected <p>");
        };
        assert!(matches!(&p.children[1], Node::Expression(e) if e.expr.as_var() == Some("name")));
        assert!(matches!(&div.children[1], Node::Element(br) if br.tag == "br" && br.children.is_empty()));
    }

    #[test]
    fn test_block_conditional_with_else() {
        let nodes = parse_ok("{_if(a):}\n  yes\n{_else:}\n  no\n{_if:end}");
        let [Node::Conditional(cond)] = nodes.as_slice() else {
            panic!("expected a conditional");
        };
        let ConditionalForm::Block { then, otherwise } = &cond.form else {
            panic!("expected block form");
        };
        let Node::Text(text) = &then[0] else {
            panic!("expected text");
        };
        assert!(text.after_block && text.before_block);
        assert!(otherwise.as_ref().is_some_and(|o| o.len() == 1));
    }

    #[test]
    fn test_inline_conditional_wraps_next_element() {
        let nodes = parse_ok("{_if(show)}\n  <b>x</b> tail");
        let Node::Conditional(cond) = &nodes[0] else {
            panic!("expected a conditional");
        };
        assert!(matches!(&cond.form, ConditionalForm::Inline(node) if matches!(**node, Node::Element(_))));
        assert!(matches!(&nodes[1], Node::Text(t) if t.content == " tail"));
    }

    #[test]
    fn test_inline_conditional_needs_element() {
        let err = parse_err("{_if(show)} text");
        assert!(err.message().contains("inline `_if`"));
        parse_err("{_if(show)}");
    }

    #[test]
    fn test_unclosed_block_conditional() {
        let err = parse_err("<div>{_if(a):}x</div>");
        assert!(err.message().contains("{_if:end}"));
        let err = parse_err("{_if(a):}x");
        assert_eq!(err.location().map(|l| l.column), Some(1));
    }

    #[test]
    fn test_mismatched_close() {
        let err = parse_err("<div><span></div>");
        assert!(err.message().contains("`</span>`"));
        assert_eq!(err.location().map(|l| l.column), Some(12));
    }

    #[test]
    fn test_component_and_fills() {
        let nodes = parse_ok(
            r#"<{Card} title="t" {user} {...extra}>{header:}<h1>H</h1>{header:end}body</{Card}>"#,
        );
        let [Node::Component(card)] = nodes.as_slice() else {
            panic!("expected a component");
        };
        assert_eq!(card.name, "Card");
        assert!(matches!(&card.props[1], PropBinding::Shorthand { name, .. } if name == "user"));
        assert!(matches!(&card.props[2], PropBinding::Spread { .. }));
        assert!(matches!(&card.children[0], Node::Fill(f) if f.name == "header"));
        assert!(matches!(&card.children[1], Node::Text(t) if t.content == "body"));
    }

    #[test]
    fn test_fill_closes_implicitly() {
        let nodes = parse_ok("<{Page}>{a:}one{b:}two</{Page}>");
        let Node::Component(page) = &nodes[0] else {
            panic!("expected a component");
        };
        let names: Vec<_> = page
            .children
            .iter()
            .filter_map(|c| match c {
                Node::Fill(f) => Some(f.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_fill_outside_component() {
        parse_err("<div>{a:}x{a:end}</div>");
        parse_err("<{C}><div>{a:}x{a:end}</div></{C}>");
    }

    #[test]
    fn test_duplicate_fill() {
        let err = parse_err("<{C}>{a:}1{a:end}{a:}2{a:end}</{C}>");
        assert!(err.message().contains("filled twice"));
    }

    #[test]
    fn test_explicit_default_excludes_stray_content() {
        parse_err("<{C}>{default:}x{default:end}stray</{C}>");
        parse_ok("<{C}>\n  {default:}x{default:end}\n</{C}>");
    }

    #[test]
    fn test_slot_declarations() {
        let nodes = parse_ok("<{slot}/><{slot:side}>fallback</{slot:side}>");
        assert!(matches!(&nodes[0], Node::Slot(s) if s.name == DEFAULT_SLOT && s.default.is_none()));
        assert!(matches!(&nodes[1], Node::Slot(s) if s.name == "side" && s.default.as_ref().is_some_and(|d| d.len() == 1)));
    }

    #[test]
    fn test_fragment_names() {
        let nodes = parse_ok(r#"<div _fragment id="a"></div><p _fragment="b" id="x"></p><i id={key} _fragment></i>"#);
        let names: Vec<_> = nodes
            .iter()
            .map(|n| match n {
                Node::Element(e) => e.fragment.as_ref().map(|f| f.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names[0], Some(FragmentName::Static("a".into())));
        assert_eq!(names[1], Some(FragmentName::Static("b".into())));
        assert!(matches!(&names[2], Some(FragmentName::Dynamic(_))));
    }

    #[test]
    fn test_fragment_without_name_fails() {
        let err = parse_err("<div _fragment></div>");
        assert!(err.message().contains("`_fragment`"));
        parse_err(r#"<div _fragment="" id="a"></div>"#);
    }

    #[test]
    fn test_unknown_directive_attribute() {
        parse_err("<div _foo></div>");
        parse_err("<{C} _fragment/>");
        parse_err(r#"<div _whitespace="squash"></div>"#);
    }

    #[test]
    fn test_unknown_hole_directive() {
        let err = parse_err("{x | shout}");
        assert!(err.message().contains("shout"));
        assert_eq!(err.location().map(|l| l.column), Some(6));
    }

    #[test]
    fn test_hole_on_own_line_flags_neighbours() {
        let nodes = parse_ok("<ul>\n  {x}\n</ul>");
        let Node::Element(ul) = &nodes[0] else {
            panic!("expected element");
        };
        let [Node::Text(before), Node::Expression(_), Node::Text(after)] = ul.children.as_slice() else {
            panic!("unexpected children: {:?}", ul.children);
        };
        assert!(before.before_block && !before.after_block);
        assert!(after.after_block && !after.before_block);

        // sharing the line with other content leaves the text alone
        for src in ["<p>a {x}\nb</p>", "<p>\n  {x} b\n</p>", "<p>\n  {x}</p>"] {
            let nodes = parse_ok(src);
            let Node::Element(p) = &nodes[0] else {
                panic!("expected element");
            };
            for child in &p.children {
                if let Node::Text(text) = child {
                    assert!(!text.before_block && !text.after_block, "{src}");
                }
            }
        }
    }

    #[test]
    fn test_nesting_limit() {
        let at_limit = format!("{}x{}", "<b>".repeat(MAX_NESTING), "</b>".repeat(MAX_NESTING));
        parse_ok(&at_limit);

        let deep = format!("{}x{}", "<b>".repeat(2000), "</b>".repeat(2000));
        let err = parse_err(&deep);
        assert!(err.message().contains("nested too deeply"));
        assert_eq!(err.location().map(|l| l.offset), Some(3 * MAX_NESTING));

        let conditionals = "{_if(a):}".repeat(500);
        assert!(parse_err(&conditionals).message().contains("nested too deeply"));
    }

    #[test]
    fn test_deep_expression_is_syntax_error() {
        let src = format!("<p>{{{}1{}}}</p>", "(".repeat(5000), ")".repeat(5000));
        let err = parse_err(&src);
        assert!(err.message().contains("nested too deeply"));
    }

    #[test]
    fn test_expression_error_location() {
        let err = parse_err("line one\n  {a +}");
        let loc = err.location().unwrap();
        assert_eq!((loc.line, loc.column), (2, 7));
    }
}
