//! Read, write and format strategies for leaves.
//!
//! Leaf strategies are stateless statics, one per [`Kind`], shared by every
//! leaf of that kind. [`Strategy`] composes them for sequences, mapping
//! entries and caller-defined [`FlagValue`](crate::FlagValue) types.

use std::fmt;
use std::marker::PhantomData;
use std::num::IntErrorKind;

use thiserror::Error;

use crate::error::BoxError;
use crate::reflect::{Node, NodeMut, Reflect, SetError};
use crate::types::{Kind, Value};

/// Read/write/format behavior for one primitive kind.
pub trait LeafStrategy: Sync {
    fn kind(&self) -> Kind;

    /// Parse `text`, then write it. The location is untouched on failure.
    fn set(&self, location: &mut dyn Reflect, text: &str) -> Result<(), SetError>;

    fn get(&self, location: &dyn Reflect) -> Option<Value>;

    /// Canonical text such that `set(format(x))` leaves `x` unchanged.
    fn format(&self, location: &dyn Reflect) -> Option<String>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("invalid syntax for {kind}")]
    Syntax { kind: Kind },

    #[error("value out of range for {kind}")]
    Range { kind: Kind },
}

/// Textual grammar of a primitive.
trait Grammar: Reflect + Sized {
    const KIND: Kind;

    fn parse(text: &str) -> Result<Self, BoxError>;

    fn value(&self) -> Value;

    fn render(&self) -> String;
}

impl Grammar for bool {
    const KIND: Kind = Kind::Bool;

    fn parse(text: &str) -> Result<Self, BoxError> {
        match text {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(GrammarError::Syntax { kind: Kind::Bool }.into()),
        }
    }

    fn value(&self) -> Value {
        Value::Bool(*self)
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

macro_rules! integer_grammar {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Grammar for $ty {
            const KIND: Kind = Kind::$kind;

            fn parse(text: &str) -> Result<Self, BoxError> {
                Ok(parse_integer(text, Kind::$kind)?)
            }

            fn value(&self) -> Value {
                Value::$kind(*self)
            }

            fn render(&self) -> String {
                self.to_string()
            }
        }
    )*};
}

integer_grammar! {
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
}

impl Grammar for f64 {
    const KIND: Kind = Kind::F64;

    fn parse(text: &str) -> Result<Self, BoxError> {
        Ok(text.parse::<f64>()?)
    }

    fn value(&self) -> Value {
        Value::F64(*self)
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl Grammar for String {
    const KIND: Kind = Kind::Text;

    fn parse(text: &str) -> Result<Self, BoxError> {
        Ok(text.to_string())
    }

    fn value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn render(&self) -> String {
        self.clone()
    }
}

/// Parse a signed or unsigned integer with an optional radix prefix:
/// `0x` hex, `0o` octal, `0b` binary, or a bare leading `0` for octal.
/// `_` may separate digits.
fn parse_integer<T: TryFrom<i128>>(text: &str, kind: Kind) -> Result<T, GrammarError> {
    let syntax = GrammarError::Syntax { kind };
    let range = GrammarError::Range { kind };

    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, digits) = split_radix(unsigned);

    if digits.is_empty()
        || digits.starts_with(['_', '+', '-'])
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return Err(syntax);
    }
    let digits: String = digits.chars().filter(|c| *c != '_').collect();

    let magnitude = u128::from_str_radix(&digits, radix).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => range.clone(),
        _ => syntax.clone(),
    })?;
    let magnitude = i128::try_from(magnitude).map_err(|_| range.clone())?;
    let signed = if negative { -magnitude } else { magnitude };
    T::try_from(signed).map_err(|_| range)
}

fn split_radix(digits: &str) -> (u32, &str) {
    let bytes = digits.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        match bytes[1] {
            b'x' | b'X' => return (16, &digits[2..]),
            b'o' | b'O' => return (8, &digits[2..]),
            b'b' | b'B' => return (2, &digits[2..]),
            _ => return (8, &digits[1..]),
        }
    }
    (10, digits)
}

/// The table entry for one primitive type.
struct Scalar<T>(PhantomData<fn() -> T>);

impl<T: Grammar> LeafStrategy for Scalar<T> {
    fn kind(&self) -> Kind {
        T::KIND
    }

    fn set(&self, location: &mut dyn Reflect, text: &str) -> Result<(), SetError> {
        let slot = location
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(SetError::Mismatch)?;
        *slot = T::parse(text).map_err(SetError::Parse)?;
        Ok(())
    }

    fn get(&self, location: &dyn Reflect) -> Option<Value> {
        location.as_any().downcast_ref::<T>().map(T::value)
    }

    fn format(&self, location: &dyn Reflect) -> Option<String> {
        location.as_any().downcast_ref::<T>().map(T::render)
    }
}

static BOOL: Scalar<bool> = Scalar(PhantomData);
static I32: Scalar<i32> = Scalar(PhantomData);
static I64: Scalar<i64> = Scalar(PhantomData);
static U32: Scalar<u32> = Scalar(PhantomData);
static U64: Scalar<u64> = Scalar(PhantomData);
static F64: Scalar<f64> = Scalar(PhantomData);
static TEXT: Scalar<String> = Scalar(PhantomData);

/// The strategy table.
pub fn lookup(kind: Kind) -> &'static dyn LeafStrategy {
    match kind {
        Kind::Bool => &BOOL,
        Kind::I32 => &I32,
        Kind::I64 => &I64,
        Kind::U32 => &U32,
        Kind::U64 => &U64,
        Kind::F64 => &F64,
        Kind::Text => &TEXT,
    }
}

/// How a binding reads, writes and renders its location.
#[derive(Clone)]
pub enum Strategy {
    /// A primitive, replaced on every set.
    Leaf(&'static dyn LeafStrategy),
    /// A sequence of primitives; each set appends one element.
    Repeated(&'static dyn LeafStrategy),
    /// A caller-defined [`FlagValue`](crate::FlagValue).
    Extension { toggle: bool },
    /// One entry of a mapping, written back through the mapping.
    Keyed { key: String, element: Box<Strategy> },
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Leaf(leaf) => write!(f, "Leaf({})", leaf.kind()),
            Strategy::Repeated(element) => write!(f, "Repeated({})", element.kind()),
            Strategy::Extension { toggle } => write!(f, "Extension {{ toggle: {toggle} }}"),
            Strategy::Keyed { key, element } => write!(f, "Keyed({key:?}, {element:?})"),
        }
    }
}

impl Strategy {
    pub fn set(&self, location: &mut dyn Reflect, text: &str) -> Result<(), SetError> {
        match self {
            Strategy::Leaf(leaf) => leaf.set(location, text),
            Strategy::Repeated(element) => match location.node_mut() {
                NodeMut::Sequence(seq) => seq.push_with(&mut |slot| element.set(slot, text)),
                _ => Err(SetError::Mismatch),
            },
            Strategy::Extension { .. } => match location.node_mut() {
                NodeMut::Extension(ext) => ext.set(text).map_err(SetError::Parse),
                _ => Err(SetError::Mismatch),
            },
            Strategy::Keyed { key, element } => match location.node_mut() {
                NodeMut::Mapping(map) => map.upsert(key, &mut |slot| element.set(slot, text)),
                _ => Err(SetError::Mismatch),
            },
        }
    }

    /// `None` when the location no longer holds what the strategy expects.
    pub fn get(&self, location: &dyn Reflect) -> Option<Value> {
        match self {
            Strategy::Leaf(leaf) => leaf.get(location),
            Strategy::Repeated(element) => match location.node() {
                Node::Sequence(seq) => (0..seq.len())
                    .map(|i| element.get(seq.element(i)?))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::List),
                _ => None,
            },
            Strategy::Extension { .. } => match location.node() {
                Node::Extension(ext) => Some(ext.get()),
                _ => None,
            },
            Strategy::Keyed { key, element } => match location.node() {
                Node::Mapping(map) => element.get(map.entry(key)?),
                _ => None,
            },
        }
    }

    pub fn format(&self, location: &dyn Reflect) -> Option<String> {
        match self {
            Strategy::Leaf(leaf) => leaf.format(location),
            Strategy::Repeated(element) => match location.node() {
                Node::Sequence(seq) => {
                    let mut out = String::from("[");
                    for i in 0..seq.len() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&element.format(seq.element(i)?)?);
                    }
                    out.push(']');
                    Some(out)
                }
                _ => None,
            },
            Strategy::Extension { .. } => match location.node() {
                Node::Extension(ext) => Some(ext.to_string()),
                _ => None,
            },
            Strategy::Keyed { key, element } => match location.node() {
                Node::Mapping(map) => element.format(map.entry(key)?),
                _ => None,
            },
        }
    }

    /// Whether a bare flag with no argument means `"true"`.
    pub fn is_toggle(&self) -> bool {
        match self {
            Strategy::Leaf(leaf) => leaf.kind() == Kind::Bool,
            Strategy::Repeated(_) => false,
            Strategy::Extension { toggle } => *toggle,
            Strategy::Keyed { element, .. } => element.is_toggle(),
        }
    }

    pub fn is_repeated(&self) -> bool {
        match self {
            Strategy::Repeated(_) => true,
            Strategy::Keyed { element, .. } => element.is_repeated(),
            _ => false,
        }
    }
}
