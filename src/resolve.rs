//! The single dispatch point deciding whether a value is a leaf.
//!
//! Checks, in order:
//!
//! 1. a built-in scalar kind → its table entry
//! 2. a sequence whose element kind has a table entry → a repeated strategy
//! 3. a [`FlagValue`](crate::FlagValue) extension → the extension strategy
//! 4. anything else is not a leaf, and the caller recurses into it

use crate::reflect::{Node, Reflect};
use crate::strategy::{self, Strategy};

pub fn resolve(value: &dyn Reflect) -> Option<Strategy> {
    match value.node() {
        Node::Scalar(kind) => Some(Strategy::Leaf(strategy::lookup(kind))),
        Node::Sequence(seq) => seq
            .element_kind()
            .map(|kind| Strategy::Repeated(strategy::lookup(kind))),
        Node::Extension(ext) => Some(Strategy::Extension {
            toggle: ext.is_toggle(),
        }),
        Node::Record(_) | Node::Mapping(_) | Node::Reference(_) | Node::Opaque => None,
    }
}
