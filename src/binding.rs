//! Named handles over one leaf of a shared configuration tree.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::FlagtreeError;
use crate::reflect::{Node, NodeMut, Reflect, SetError, Target};
use crate::strategy::Strategy;
use crate::types::{Step, Value};

/// A configuration tree shared between its owner and its bindings.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a configuration value so it can be bound.
pub fn shared<T: Reflect>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// One settable leaf, identified by its dotted path.
///
/// A binding holds the tree handle and the route from the root to its leaf,
/// and walks that route again on every call. Writes made by one binding are
/// visible to every other binding over the same tree.
#[derive(Clone)]
pub struct Binding {
    name: String,
    root: Rc<RefCell<dyn Reflect>>,
    route: Vec<Step>,
    strategy: Strategy,
}

impl Binding {
    pub(crate) fn new(
        name: String,
        root: Rc<RefCell<dyn Reflect>>,
        route: Vec<Step>,
        strategy: Strategy,
    ) -> Self {
        Self {
            name,
            root,
            route,
            strategy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse `text` and write it to the leaf. Sequences get one element
    /// appended per call.
    pub fn set(&self, text: &str) -> Result<(), FlagtreeError> {
        let mut root = self
            .root
            .try_borrow_mut()
            .map_err(|_| self.borrowed())?;
        let location = locate_mut(&mut *root, &self.route).ok_or_else(|| self.stale())?;
        self.strategy
            .set(location, text)
            .map_err(|e| match e {
                SetError::Parse(source) => FlagtreeError::ParseFailure {
                    path: self.name.clone(),
                    text: text.to_string(),
                    source,
                },
                SetError::Mismatch => self.stale(),
            })?;
        tracing::trace!(flag = %self.name, value = text, "set");
        Ok(())
    }

    pub fn get(&self) -> Result<Value, FlagtreeError> {
        let root = self.root.try_borrow().map_err(|_| self.borrowed())?;
        locate(&*root, &self.route)
            .and_then(|location| self.strategy.get(location))
            .ok_or_else(|| self.stale())
    }

    /// The current value in the text form [`set`](Self::set) accepts.
    pub fn format(&self) -> Result<String, FlagtreeError> {
        let root = self.root.try_borrow().map_err(|_| self.borrowed())?;
        locate(&*root, &self.route)
            .and_then(|location| self.strategy.format(location))
            .ok_or_else(|| self.stale())
    }

    /// Whether the flag may be given without an argument, meaning `"true"`.
    pub fn is_toggle(&self) -> bool {
        self.strategy.is_toggle()
    }

    /// Whether each set appends instead of replacing.
    pub fn is_repeated(&self) -> bool {
        self.strategy.is_repeated()
    }

    fn stale(&self) -> FlagtreeError {
        FlagtreeError::StaleBinding {
            path: self.name.clone(),
        }
    }

    fn borrowed(&self) -> FlagtreeError {
        FlagtreeError::TreeBorrowed {
            path: self.name.clone(),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format() {
            Ok(text) => f.write_str(&text),
            Err(_) => Ok(()),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("route", &self.route)
            .field("strategy", &self.strategy)
            .finish()
    }
}

fn locate<'a>(mut node: &'a dyn Reflect, route: &[Step]) -> Option<&'a dyn Reflect> {
    for step in route {
        node = match (step, node.node()) {
            (Step::Field(index), Node::Record(record)) => record.field(*index)?,
            (Step::Key(key), Node::Mapping(map)) => map.entry(key)?,
            (Step::Deref, Node::Reference(reference)) => reference.target()?,
            _ => return None,
        };
    }
    Some(node)
}

fn locate_mut<'a>(mut node: &'a mut dyn Reflect, route: &[Step]) -> Option<&'a mut dyn Reflect> {
    for step in route {
        node = match (step, node.node_mut()) {
            (Step::Field(index), NodeMut::Record(record)) => record.field_mut(*index)?,
            (Step::Key(key), NodeMut::Mapping(map)) => map.entry_mut(key)?,
            (Step::Deref, NodeMut::Reference(reference)) => match reference.target_mut() {
                Target::Present(target) => target,
                Target::Nil | Target::Shared => return None,
            },
            _ => return None,
        };
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Coordinates, Sample};
    use crate::strategy::lookup;
    use crate::types::Kind;
    use std::collections::HashMap;

    fn leaf<T: Reflect>(
        tree: &Shared<T>,
        name: &str,
        route: Vec<Step>,
        kind: Kind,
    ) -> Binding {
        Binding::new(
            name.to_string(),
            tree.clone(),
            route,
            Strategy::Leaf(lookup(kind)),
        )
    }

    #[test]
    fn set_writes_through_the_route() {
        let tree = shared(Sample::default());
        let grid = leaf(
            &tree,
            "location.grid",
            vec![Step::Field(2), Step::Deref, Step::Field(0)],
            Kind::U64,
        );
        tree.borrow_mut().location = Some(Coordinates::default());

        grid.set("0x10").unwrap();
        assert_eq!(tree.borrow().location.as_ref().unwrap().grid, 16);
        assert_eq!(grid.get().unwrap(), Value::U64(16));
        assert_eq!(grid.format().unwrap(), "16");
        assert_eq!(grid.to_string(), "16");
    }

    #[test]
    fn parse_failure_names_the_path_and_keeps_the_value() {
        let tree = shared(Sample::default());
        let index = leaf(&tree, "index", vec![Step::Field(1)], Kind::I32);
        index.set("4").unwrap();

        let err = index.set("four").unwrap_err();
        assert!(matches!(
            &err,
            FlagtreeError::ParseFailure { path, text, .. } if path == "index" && text == "four"
        ));
        assert_eq!(tree.borrow().index, 4);
    }

    #[test]
    fn route_through_nil_reference_is_stale() {
        let tree = shared(Sample::default());
        let grid = leaf(
            &tree,
            "location.grid",
            vec![Step::Field(2), Step::Deref, Step::Field(0)],
            Kind::U64,
        );
        assert!(matches!(
            grid.set("1"),
            Err(FlagtreeError::StaleBinding { path }) if path == "location.grid"
        ));
        assert!(grid.get().is_err());
    }

    #[test]
    fn held_borrow_is_reported_not_panicked() {
        let tree = shared(Sample::default());
        let name = leaf(&tree, "name", vec![Step::Field(0)], Kind::Text);
        let guard = tree.borrow_mut();
        assert!(matches!(
            name.set("x"),
            Err(FlagtreeError::TreeBorrowed { path }) if path == "name"
        ));
        assert!(name.get().is_err());
        drop(guard);
        name.set("x").unwrap();
    }

    #[test]
    fn keyed_binding_sees_external_mutation() {
        let tree = shared(HashMap::from([("Banana".to_string(), 7i64)]));
        let banana = Binding::new(
            "Banana".into(),
            tree.clone(),
            Vec::new(),
            Strategy::Keyed {
                key: "Banana".into(),
                element: Box::new(Strategy::Leaf(lookup(Kind::I64))),
            },
        );

        tree.borrow_mut().insert("Banana".into(), 12);
        assert_eq!(banana.get().unwrap(), Value::I64(12));

        tree.borrow_mut().clear();
        assert!(matches!(
            banana.format(),
            Err(FlagtreeError::StaleBinding { .. })
        ));
        banana.set("10").unwrap();
        assert_eq!(tree.borrow()["Banana"], 10);
    }

    #[test]
    fn clones_share_the_tree() {
        let tree = shared(Sample::default());
        let name = leaf(&tree, "name", vec![Step::Field(0)], Kind::Text);
        let copy = name.clone();
        copy.set("shared").unwrap();
        assert_eq!(name.format().unwrap(), "shared");
    }
}
