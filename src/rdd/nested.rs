//! Shape inspection used by [`super::Rdd::flatten`] and [`super::Rdd::flat_map`].

use crate::types::Value;

/// How an element looks to `flatten`.
#[derive(Debug, PartialEq)]
pub enum Shape<'a, T> {
    /// A plain element; passed through unchanged.
    Scalar,
    /// A sequence of elements of the collection's own type; spliced into the output.
    Sequence(&'a [T]),
    /// A sequence of some other element type. It cannot be spliced into a collection of `T`,
    /// so it is passed through unflattened.
    Foreign,
}

/// Capability implemented by element types that may hold nested sequences.
pub trait Nested: Sized {
    fn shape(&self) -> Shape<'_, Self>;
}

impl Nested for Value {
    fn shape(&self) -> Shape<'_, Self> {
        match self {
            Value::List(items) => Shape::Sequence(items.as_slice()),
            _ => Shape::Scalar,
        }
    }
}

macro_rules! scalar_nested {
    ($($t:ty),* $(,)?) => {
        $(
            impl Nested for $t {
                fn shape(&self) -> Shape<'_, Self> {
                    Shape::Scalar
                }
            }
        )*
    };
}

scalar_nested!(i32, i64, u32, u64, usize, f64, bool, char, String, &str);
