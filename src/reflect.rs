//! Runtime shape information for configuration trees.
//!
//! Every type that can appear in a bound tree implements [`Reflect`], which
//! reports the value's shape as a [`Node`] (read access) or [`NodeMut`]
//! (write access). The traversal engine and the bindings only ever talk to a
//! tree through these two views.
//!
//! | Shape       | Types                                                        |
//! |-------------|--------------------------------------------------------------|
//! | `Scalar`    | `bool`, `i32`, `i64`, `u32`, `u64`, `f64`, `String`          |
//! | `Sequence`  | `Vec<T>`                                                     |
//! | `Record`    | structs deriving `Reflect`                                   |
//! | `Mapping`   | `HashMap<K, V>`, `BTreeMap<K, V>`                            |
//! | `Reference` | `Option<T>`, `Box<T>`, `Rc<T>`, `Arc<T>`                     |
//! | `Extension` | types implementing [`FlagValue`], derived with `#[flag(value)]` |
//! | `Opaque`    | other primitives; they have no strategy                      |

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;

use crate::error::BoxError;
use crate::types::{Kind, Value};

/// A value whose shape can be inspected and navigated at runtime.
pub trait Reflect: Any {
    fn node(&self) -> Node<'_>;

    fn node_mut(&mut self) -> NodeMut<'_>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The primitive kind of this type, if it is one of the built-in scalars.
    fn scalar_kind() -> Option<Kind>
    where
        Self: Sized,
    {
        None
    }
}

/// Read view of a value's shape.
pub enum Node<'a> {
    Scalar(Kind),
    Sequence(&'a dyn Sequence),
    Record(&'a dyn Record),
    Mapping(&'a dyn Mapping),
    Reference(&'a dyn Reference),
    Extension(&'a dyn FlagValue),
    Opaque,
}

/// Write view of a value's shape.
pub enum NodeMut<'a> {
    Scalar(Kind),
    Sequence(&'a mut dyn Sequence),
    Record(&'a mut dyn Record),
    Mapping(&'a mut dyn Mapping),
    Reference(&'a mut dyn Reference),
    Extension(&'a mut dyn FlagValue),
    Opaque,
}

/// Why a write through a strategy did not happen.
#[derive(Debug, Error)]
pub enum SetError {
    #[error("{0}")]
    Parse(BoxError),

    #[error("location does not hold the expected type")]
    Mismatch,
}

/// Callback used to write into a freshly created or existing element.
pub type WriteFn<'w> = dyn FnMut(&mut dyn Reflect) -> Result<(), SetError> + 'w;

/// Static description of one bindable record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Path segment contributed by this field.
    pub name: &'static str,
    /// Help text, from `#[flag(help = "...")]` or the doc comment.
    pub help: Option<&'static str>,
    /// Merge a container field's children into the parent's namespace.
    pub flatten: bool,
    /// A nil reference here is an error instead of being materialized.
    pub required: bool,
}

impl Field {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            help: None,
            flatten: false,
            required: false,
        }
    }
}

/// A struct with named fields. Implemented by `#[derive(Reflect)]`.
pub trait Record {
    /// Bindable fields in declaration order. Skipped fields are absent.
    fn fields(&self) -> &'static [Field];

    fn field(&self, index: usize) -> Option<&dyn Reflect>;

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;
}

/// An ordered, growable sequence.
pub trait Sequence {
    fn element_kind(&self) -> Option<Kind>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect>;

    /// Append a default element after `write` succeeds on it. Nothing is
    /// appended when `write` fails.
    fn push_with(&mut self, write: &mut WriteFn<'_>) -> Result<(), SetError>;
}

/// A dynamic key-to-value mapping.
pub trait Mapping {
    fn key_type(&self) -> &'static str;

    fn has_text_keys(&self) -> bool;

    /// Current keys, sorted.
    fn keys(&self) -> Vec<String>;

    fn entry(&self, key: &str) -> Option<&dyn Reflect>;

    fn entry_mut(&mut self, key: &str) -> Option<&mut dyn Reflect>;

    /// Write through the mapping under `key`. An absent key gets a default
    /// element, inserted only once `write` succeeds.
    fn upsert(&mut self, key: &str, write: &mut WriteFn<'_>) -> Result<(), SetError>;
}

/// Conversion between a mapping's key type and its path segment.
pub trait MapKey: Sized {
    const TEXT: bool;

    fn to_text(&self) -> String;

    fn from_text(text: &str) -> Option<Self>;
}

/// Resolution of a reference for writing.
pub enum Target<'a> {
    Present(&'a mut dyn Reflect),
    Nil,
    /// The target exists but is not uniquely owned.
    Shared,
}

/// A nilable or shared pointer to another value.
pub trait Reference {
    fn target(&self) -> Option<&dyn Reflect>;

    fn target_mut(&mut self) -> Target<'_>;

    /// Allocate a default target if the reference is nil and return it.
    fn materialize(&mut self) -> Option<&mut dyn Reflect>;
}

/// Capability for caller-defined leaf types.
///
/// A type implementing `FlagValue` and deriving `Reflect` with
/// `#[flag(value)]` becomes a leaf without touching the strategy table.
pub trait FlagValue: fmt::Display {
    fn set(&mut self, text: &str) -> Result<(), BoxError>;

    fn get(&self) -> Value;

    /// Whether a bare flag with no argument should mean `"true"`.
    fn is_toggle(&self) -> bool {
        false
    }
}

macro_rules! scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Reflect for $ty {
            fn node(&self) -> Node<'_> {
                Node::Scalar(Kind::$kind)
            }

            fn node_mut(&mut self) -> NodeMut<'_> {
                NodeMut::Scalar(Kind::$kind)
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }

            fn scalar_kind() -> Option<Kind> {
                Some(Kind::$kind)
            }
        }
    )*};
}

scalar! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f64 => F64,
    String => Text,
}

macro_rules! opaque {
    ($($ty:ty),* $(,)?) => {$(
        impl Reflect for $ty {
            fn node(&self) -> Node<'_> {
                Node::Opaque
            }

            fn node_mut(&mut self) -> NodeMut<'_> {
                NodeMut::Opaque
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    )*};
}

opaque!(i8, i16, isize, u8, u16, usize, f32, char);

impl MapKey for String {
    const TEXT: bool = true;

    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

macro_rules! non_text_key {
    ($($ty:ty),* $(,)?) => {$(
        impl MapKey for $ty {
            const TEXT: bool = false;

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn from_text(_: &str) -> Option<Self> {
                None
            }
        }
    )*};
}

non_text_key!(bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn node(&self) -> Node<'_> {
        Node::Sequence(self)
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Sequence(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: Reflect + Default> Sequence for Vec<T> {
    fn element_kind(&self) -> Option<Kind> {
        T::scalar_kind()
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element(&self, index: usize) -> Option<&dyn Reflect> {
        self.as_slice().get(index).map(|v| v as &dyn Reflect)
    }

    fn push_with(&mut self, write: &mut WriteFn<'_>) -> Result<(), SetError> {
        let mut fresh = T::default();
        write(&mut fresh)?;
        self.push(fresh);
        Ok(())
    }
}

impl<K, V, S> Reflect for HashMap<K, V, S>
where
    K: MapKey + Eq + Hash + 'static,
    V: Reflect + Default,
    S: BuildHasher + 'static,
{
    fn node(&self) -> Node<'_> {
        Node::Mapping(self)
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Mapping(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<K, V, S> Mapping for HashMap<K, V, S>
where
    K: MapKey + Eq + Hash + 'static,
    V: Reflect + Default,
    S: BuildHasher + 'static,
{
    fn key_type(&self) -> &'static str {
        std::any::type_name::<K>()
    }

    fn has_text_keys(&self) -> bool {
        K::TEXT
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = HashMap::keys(self).map(MapKey::to_text).collect();
        keys.sort();
        keys
    }

    fn entry(&self, key: &str) -> Option<&dyn Reflect> {
        let key = K::from_text(key)?;
        HashMap::get(self, &key).map(|v| v as &dyn Reflect)
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut dyn Reflect> {
        let key = K::from_text(key)?;
        HashMap::get_mut(self, &key).map(|v| v as &mut dyn Reflect)
    }

    fn upsert(&mut self, key: &str, write: &mut WriteFn<'_>) -> Result<(), SetError> {
        let key = K::from_text(key).ok_or(SetError::Mismatch)?;
        match HashMap::get_mut(self, &key) {
            Some(slot) => write(slot),
            None => {
                let mut fresh = V::default();
                write(&mut fresh)?;
                self.insert(key, fresh);
                Ok(())
            }
        }
    }
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: MapKey + Ord + 'static,
    V: Reflect + Default,
{
    fn node(&self) -> Node<'_> {
        Node::Mapping(self)
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Mapping(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<K, V> Mapping for BTreeMap<K, V>
where
    K: MapKey + Ord + 'static,
    V: Reflect + Default,
{
    fn key_type(&self) -> &'static str {
        std::any::type_name::<K>()
    }

    fn has_text_keys(&self) -> bool {
        K::TEXT
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = BTreeMap::keys(self).map(MapKey::to_text).collect();
        keys.sort();
        keys
    }

    fn entry(&self, key: &str) -> Option<&dyn Reflect> {
        let key = K::from_text(key)?;
        BTreeMap::get(self, &key).map(|v| v as &dyn Reflect)
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut dyn Reflect> {
        let key = K::from_text(key)?;
        BTreeMap::get_mut(self, &key).map(|v| v as &mut dyn Reflect)
    }

    fn upsert(&mut self, key: &str, write: &mut WriteFn<'_>) -> Result<(), SetError> {
        let key = K::from_text(key).ok_or(SetError::Mismatch)?;
        match BTreeMap::get_mut(self, &key) {
            Some(slot) => write(slot),
            None => {
                let mut fresh = V::default();
                write(&mut fresh)?;
                self.insert(key, fresh);
                Ok(())
            }
        }
    }
}

impl<T: Reflect + Default> Reflect for Option<T> {
    fn node(&self) -> Node<'_> {
        Node::Reference(self)
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Reference(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: Reflect + Default> Reference for Option<T> {
    fn target(&self) -> Option<&dyn Reflect> {
        self.as_ref().map(|v| v as &dyn Reflect)
    }

    fn target_mut(&mut self) -> Target<'_> {
        match self {
            Some(v) => Target::Present(v),
            None => Target::Nil,
        }
    }

    fn materialize(&mut self) -> Option<&mut dyn Reflect> {
        Some(self.get_or_insert_with(T::default))
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn node(&self) -> Node<'_> {
        Node::Reference(self)
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Reference(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: Reflect> Reference for Box<T> {
    fn target(&self) -> Option<&dyn Reflect> {
        Some(&**self)
    }

    fn target_mut(&mut self) -> Target<'_> {
        Target::Present(&mut **self)
    }

    fn materialize(&mut self) -> Option<&mut dyn Reflect> {
        Some(&mut **self)
    }
}

macro_rules! counted {
    ($($ptr:ident),* $(,)?) => {$(
        impl<T: Reflect> Reflect for $ptr<T> {
            fn node(&self) -> Node<'_> {
                Node::Reference(self)
            }

            fn node_mut(&mut self) -> NodeMut<'_> {
                NodeMut::Reference(self)
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        impl<T: Reflect> Reference for $ptr<T> {
            fn target(&self) -> Option<&dyn Reflect> {
                Some(&**self)
            }

            fn target_mut(&mut self) -> Target<'_> {
                match $ptr::get_mut(self) {
                    Some(v) => Target::Present(v),
                    None => Target::Shared,
                }
            }

            fn materialize(&mut self) -> Option<&mut dyn Reflect> {
                $ptr::get_mut(self).map(|v| v as &mut dyn Reflect)
            }
        }
    )*};
}

counted!(Rc, Arc);
