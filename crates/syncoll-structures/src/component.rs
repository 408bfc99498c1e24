//! Component graph shape (spec §4.1 `Component`). The matching algorithm
//! itself lives in `syncoll-match`; this crate only owns the static shape a
//! structure file compiles to.

use serde::{Deserialize, Serialize};

use crate::order::Order;
use crate::restriction::RestrictionGroup;

/// Whether a child edge must be satisfied, may be absent, or must be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentStatus {
    Required,
    Optional,
    Forbidden,
}

/// A component's role in output: an ordinary slot, one of the (at most two)
/// content-bearing core words, or the second core word in a two-core-word
/// structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentType {
    Other,
    Core,
    Core2w,
}

/// An edge from a parent component to a child component, labelled by the
/// deprel that must connect the matched tokens (a pipe-joined label is a
/// union of accepted deprels) and constrained by linear order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildEdge {
    pub deprel: String,
    pub order: Order,
    pub component_idx: usize,
    pub status: ComponentStatus,
}

/// One node of the component graph. Components live in a flat arena
/// (`SyntacticStructure::components`); `children` references siblings by
/// index rather than owning them, so the graph can be a DAG (the same
/// component reused under two parents) without aliasing problems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub component_type: ComponentType,
    pub restriction: RestrictionGroup,
    pub children: Vec<ChildEdge>,
}

impl Component {
    pub fn new(id: impl Into<String>, restriction: RestrictionGroup) -> Self {
        Self {
            id: id.into(),
            component_type: ComponentType::Other,
            restriction,
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, deprel: impl Into<String>, order: Order, status: ComponentStatus, component_idx: usize) {
        self.children.push(ChildEdge {
            deprel: deprel.into(),
            order,
            component_idx,
            status,
        });
    }

    pub fn is_core(&self) -> bool {
        matches!(self.component_type, ComponentType::Core | ComponentType::Core2w)
    }
}
