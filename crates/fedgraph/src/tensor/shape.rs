//! Partially known tensor shapes.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Represents a single axis extent in a tensor shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Static(usize),
    /// Extent unknown until values are supplied.
    Dynamic,
}

impl Dimension {
    pub fn value(self) -> Option<usize> {
        match self {
            Dimension::Static(value) => Some(value),
            Dimension::Dynamic => None,
        }
    }

    /// A declared dimension accepts any extent when dynamic, otherwise only an equal one.
    pub fn is_assignable_from(self, other: Dimension) -> bool {
        match (self, other) {
            (Dimension::Dynamic, _) => true,
            (Dimension::Static(a), Dimension::Static(b)) => a == b,
            (Dimension::Static(_), Dimension::Dynamic) => false,
        }
    }
}

impl From<Option<usize>> for Dimension {
    fn from(value: Option<usize>) -> Self {
        match value {
            Some(value) => Dimension::Static(value),
            None => Dimension::Dynamic,
        }
    }
}

impl From<usize> for Dimension {
    fn from(value: usize) -> Self {
        Dimension::Static(value)
    }
}

/// Logical tensor shape as an ordered list of dimensions. Rank is always known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape {
    dims: SmallVec<[Dimension; 4]>,
}

impl Shape {
    pub fn new(dims: impl IntoIterator<Item = Dimension>) -> Self {
        Self {
            dims: dims.into_iter().collect(),
        }
    }

    /// Rank-0 shape.
    pub fn scalar() -> Self {
        Self::default()
    }

    pub fn from_static(dims: &[usize]) -> Self {
        Self::new(dims.iter().copied().map(Dimension::Static))
    }

    pub fn from_partial(dims: &[Option<usize>]) -> Self {
        Self::new(dims.iter().copied().map(Dimension::from))
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    /// Concrete extents with every dynamic dimension replaced by zero.
    pub fn zeroed_dims(&self) -> Vec<usize> {
        self.dims.iter().map(|dim| dim.value().unwrap_or(0)).collect()
    }

    pub fn is_assignable_from(&self, other: &Shape) -> bool {
        self.rank() == other.rank()
            && self
                .dims
                .iter()
                .zip(other.dims.iter())
                .all(|(a, b)| a.is_assignable_from(*b))
    }

    /// Keeps dimensions both shapes agree on and relaxes the rest to dynamic.
    /// Returns `None` when ranks differ.
    pub fn most_specific_compatible(&self, other: &Shape) -> Option<Shape> {
        if self.rank() != other.rank() {
            return None;
        }
        Some(Shape::new(self.dims.iter().zip(other.dims.iter()).map(
            |(a, b)| {
                if a == b {
                    *a
                } else {
                    Dimension::Dynamic
                }
            },
        )))
    }

    /// Drops the leading dimension, or `None` for scalars.
    pub fn without_leading(&self) -> Option<Shape> {
        if self.dims.is_empty() {
            None
        } else {
            Some(Shape::new(self.dims[1..].iter().copied()))
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, dim) in self.dims.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            match dim {
                Dimension::Static(value) => write!(f, "{value}")?,
                Dimension::Dynamic => f.write_str("?")?,
            }
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_disagreeing_dimensions_to_dynamic() {
        let a = Shape::from_static(&[1, 2]);
        let b = Shape::from_static(&[1, 3]);
        let merged = a.most_specific_compatible(&b).expect("same rank");
        assert_eq!(merged, Shape::from_partial(&[Some(1), None]));
        assert!(a.most_specific_compatible(&Shape::scalar()).is_none());
    }

    #[test]
    fn renders_dynamic_dimensions() {
        assert_eq!(Shape::from_partial(&[None, Some(10)]).to_string(), "[?,10]");
        assert_eq!(Shape::scalar().to_string(), "[]");
    }
}
