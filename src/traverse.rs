//! The recursive walk that turns a configuration tree into bindings.
//!
//! Each subtree is visited with a [`Cursor`] carrying its dotted path, the
//! route from the root, what kind of slot holds it, and the help text of the
//! field being visited. Leaves become bindings as soon as they are reached,
//! so an error leaves everything visited before it installed.

use std::cell::RefCell;
use std::rc::Rc;

use crate::binding::Binding;
use crate::error::FlagtreeError;
use crate::reflect::{Mapping, NodeMut, Record, Reference, Reflect, Target};
use crate::registry::Registry;
use crate::resolve::resolve;
use crate::strategy::Strategy;
use crate::types::Step;

/// What kind of slot holds the value being visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// The root of the tree.
    Root,
    /// A record field; a nil reference here is materialized.
    Field,
    /// A record field marked `#[flag(required)]`.
    Required,
    /// A mapping entry; it cannot be allocated in place.
    Entry,
}

#[derive(Debug, Clone)]
struct Cursor {
    path: String,
    route: Vec<Step>,
    access: Access,
    help: Option<&'static str>,
}

impl Cursor {
    fn root() -> Self {
        Self {
            path: String::new(),
            route: Vec::new(),
            access: Access::Root,
            help: None,
        }
    }

    fn child(&self, path: String, step: Step, access: Access, help: Option<&'static str>) -> Self {
        let mut route = self.route.clone();
        route.push(step);
        Self {
            path,
            route,
            access,
            help,
        }
    }

    fn deref(mut self) -> Self {
        self.route.push(Step::Deref);
        self
    }
}

/// Join a path and a segment with `.`, omitting the dot for the first segment.
fn dotted(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

/// Walk the tree behind `root` and register one binding per leaf.
pub(crate) fn walk(
    root: &Rc<RefCell<dyn Reflect>>,
    registry: &mut dyn Registry,
) -> Result<(), FlagtreeError> {
    let mut tree = root
        .try_borrow_mut()
        .map_err(|_| FlagtreeError::TreeBorrowed {
            path: String::new(),
        })?;
    let mut walker = Walker { root, registry };
    walker.visit(&mut *tree, Cursor::root())
}

struct Walker<'a> {
    root: &'a Rc<RefCell<dyn Reflect>>,
    registry: &'a mut dyn Registry,
}

impl Walker<'_> {
    fn visit(&mut self, value: &mut dyn Reflect, at: Cursor) -> Result<(), FlagtreeError> {
        let type_name = value.type_name();

        if let Some(strategy) = resolve(&*value) {
            if at.access == Access::Root {
                return Err(FlagtreeError::UnsupportedType {
                    type_name,
                    path: at.path,
                });
            }
            return self.install(at.path, at.route, strategy, at.help);
        }

        match value.node_mut() {
            NodeMut::Record(record) => self.visit_record(record, &at),
            NodeMut::Mapping(map) => self.visit_mapping(map, &at),
            NodeMut::Reference(reference) => self.visit_reference(reference, type_name, at),
            NodeMut::Scalar(_) | NodeMut::Sequence(_) | NodeMut::Extension(_) | NodeMut::Opaque => {
                Err(FlagtreeError::UnsupportedType {
                    type_name,
                    path: at.path,
                })
            }
        }
    }

    fn visit_record(&mut self, record: &mut dyn Record, at: &Cursor) -> Result<(), FlagtreeError> {
        for (index, field) in record.fields().iter().enumerate() {
            let Some(child) = record.field_mut(index) else {
                continue;
            };
            // A flattened leaf still needs a name of its own.
            let path = if field.flatten && resolve(&*child).is_none() {
                at.path.clone()
            } else {
                dotted(&at.path, field.name)
            };
            let access = if field.required {
                Access::Required
            } else {
                Access::Field
            };
            let cursor = at.child(path, Step::Field(index), access, field.help);
            self.visit(child, cursor)?;
        }
        Ok(())
    }

    fn visit_mapping(&mut self, map: &mut dyn Mapping, at: &Cursor) -> Result<(), FlagtreeError> {
        if !map.has_text_keys() {
            return Err(FlagtreeError::NonStringMapKey {
                key_type: map.key_type(),
                path: at.path.clone(),
            });
        }

        for key in map.keys() {
            let path = dotted(&at.path, &key);
            let Some(entry) = map.entry_mut(&key) else {
                continue;
            };
            match resolve(&*entry) {
                // Entries are written back through the mapping, so the route
                // stops at the mapping itself.
                Some(element) => {
                    let strategy = Strategy::Keyed {
                        key,
                        element: Box::new(element),
                    };
                    self.install(path, at.route.clone(), strategy, None)?;
                }
                None => {
                    let cursor = at.child(path, Step::Key(key), Access::Entry, None);
                    self.visit(entry, cursor)?;
                }
            }
        }
        Ok(())
    }

    fn visit_reference(
        &mut self,
        reference: &mut dyn Reference,
        type_name: &'static str,
        at: Cursor,
    ) -> Result<(), FlagtreeError> {
        match reference.target_mut() {
            Target::Present(target) => return self.visit(target, at.deref()),
            Target::Shared => {
                return Err(FlagtreeError::UnsettableLeaf {
                    type_name,
                    path: at.path,
                });
            }
            Target::Nil => {}
        }

        match at.access {
            Access::Root => Err(FlagtreeError::NilConfiguration),
            Access::Field => {
                tracing::debug!(path = %at.path, type_name, "materializing nil reference");
                let Some(target) = reference.materialize() else {
                    return Err(FlagtreeError::NilUnallocatableReference { path: at.path });
                };
                self.visit(target, at.deref())
            }
            Access::Required | Access::Entry => {
                Err(FlagtreeError::NilUnallocatableReference { path: at.path })
            }
        }
    }

    fn install(
        &mut self,
        name: String,
        route: Vec<Step>,
        strategy: Strategy,
        help: Option<&'static str>,
    ) -> Result<(), FlagtreeError> {
        tracing::debug!(flag = %name, ?strategy, "binding installed");
        let binding = Binding::new(name.clone(), Rc::clone(self.root), route, strategy);
        self.registry.register(name, binding, help)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_joins_segments() {
        assert_eq!(dotted("", "host"), "host");
        assert_eq!(dotted("database", "url"), "database.url");
        assert_eq!(dotted("hosts.primary", "grid"), "hosts.primary.grid");
    }

    #[test]
    fn child_cursor_extends_route() {
        let root = Cursor::root();
        let field = root.child("location".into(), Step::Field(2), Access::Field, None);
        let target = field.clone().deref();
        assert_eq!(field.route, vec![Step::Field(2)]);
        assert_eq!(target.route, vec![Step::Field(2), Step::Deref]);
        assert_eq!(target.path, "location");
        assert!(root.route.is_empty());
    }
}
