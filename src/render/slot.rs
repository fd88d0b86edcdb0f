//! Slot resolution: split an invocation's children into per-slot fills.

use rustc_hash::FxHashMap;

use super::Scope;
use crate::component::Component;
use crate::template::{DEFAULT_SLOT, Invocation, Node, Template, TemplateError, TemplateResult};

/// Plain `Vec` keeps `SlotFills` covariant, so a component scope can
/// borrow it for less than `'a`.
pub(crate) type FillNodes<'a> = Vec<&'a Node>;

/// Fill content of one invocation, rendered lazily in the caller's scope.
pub(crate) struct SlotFills<'a> {
    fills: FxHashMap<&'a str, FillNodes<'a>>,
    pub caller: Scope<'a>,
}

impl<'a> SlotFills<'a> {
    pub fn new(fills: FxHashMap<&'a str, FillNodes<'a>>, caller: Scope<'a>) -> Self {
        Self { fills, caller }
    }

    /// Fill for `name`, or `None` when absent or whitespace-only, in which
    /// case the slot's own default content applies.
    pub fn get(&self, name: &str) -> Option<&[&'a Node]> {
        self.fills
            .get(name)
            .filter(|nodes| nodes.iter().any(|n| !n.is_blank()))
            .map(|nodes| nodes.as_slice())
    }
}

/// Partition `inv`'s children by slot name.
///
/// Named fills must match a slot the component declares. Unmarked content
/// goes to the default slot; it is an error only if it is non-blank and the
/// component has no default slot.
pub(crate) fn partition<'a>(
    inv: &'a Invocation,
    component: &Component,
    caller: &Template,
) -> TemplateResult<FxHashMap<&'a str, FillNodes<'a>>> {
    let schema = component.schema();
    let mut fills: FxHashMap<&'a str, FillNodes<'a>> = FxHashMap::default();
    let mut unmarked = FillNodes::new();

    for child in &inv.children {
        match child {
            Node::Fill(fill) => {
                if !schema.has_slot(&fill.name) {
                    return Err(TemplateError::binding(format!(
                        "component `{}` has no slot `{}`",
                        inv.name, fill.name
                    ))
                    .at(caller.origin(fill.span)));
                }
                fills.insert(&fill.name, fill.children.iter().collect());
            }
            other => unmarked.push(other),
        }
    }

    if unmarked.iter().any(|n| !n.is_blank()) {
        if !schema.has_slot(DEFAULT_SLOT) {
            return Err(TemplateError::binding(format!(
                "component `{}` has no default slot for content outside named fills",
                inv.name
            ))
            .at(caller.origin(inv.span)));
        }
        fills.insert(DEFAULT_SLOT, unmarked);
    }
    Ok(fills)
}
