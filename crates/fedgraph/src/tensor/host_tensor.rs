//! Host-backed dense arrays used for constants, dataset slices and fetched values.

use std::fmt;

use ndarray::{Array1, ArrayD, ArrayViewD, Axis, IxDyn};

use super::{dtype::DType, shape::Shape};
use crate::error::{Error, Result};

/// Dense host array tagged with its element type.
#[derive(Debug, Clone, PartialEq)]
pub enum HostTensor {
    Bool(ArrayD<bool>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    Str(ArrayD<String>),
}

/// Scalar types that map onto a [`HostTensor`] variant.
pub trait HostElement: Clone + fmt::Debug + 'static {
    const DTYPE: DType;

    fn wrap(array: ArrayD<Self>) -> HostTensor;

    fn view(tensor: &HostTensor) -> Option<ArrayViewD<'_, Self>>;
}

macro_rules! host_element {
    ($ty:ty, $variant:ident, $dtype:expr) => {
        impl HostElement for $ty {
            const DTYPE: DType = $dtype;

            fn wrap(array: ArrayD<Self>) -> HostTensor {
                HostTensor::$variant(array)
            }

            fn view(tensor: &HostTensor) -> Option<ArrayViewD<'_, Self>> {
                match tensor {
                    HostTensor::$variant(array) => Some(array.view()),
                    _ => None,
                }
            }
        }
    };
}

host_element!(bool, Bool, DType::Bool);
host_element!(i32, I32, DType::I32);
host_element!(i64, I64, DType::I64);
host_element!(f32, F32, DType::F32);
host_element!(f64, F64, DType::F64);
host_element!(String, Str, DType::String);

impl HostTensor {
    /// Rank-0 tensor holding a single value.
    pub fn scalar<T: HostElement>(value: T) -> Self {
        T::wrap(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Rank-1 tensor over the provided values.
    pub fn from_vec<T: HostElement>(values: Vec<T>) -> Self {
        T::wrap(Array1::from_vec(values).into_dyn())
    }

    /// Builds a tensor of arbitrary rank, validating the element count against `dims`.
    pub fn from_shape_vec<T: HostElement>(dims: &[usize], values: Vec<T>) -> Result<Self> {
        let len = values.len();
        ArrayD::from_shape_vec(IxDyn(dims), values)
            .map(T::wrap)
            .map_err(|_| {
                Error::type_mismatch(format!(
                    "{len} values do not fill a {} tensor of shape {dims:?}",
                    T::DTYPE
                ))
            })
    }

    /// Zero-filled (false / empty string) tensor of the given dtype and extents.
    pub fn zeros(dtype: DType, dims: &[usize]) -> Result<Self> {
        let shape = IxDyn(dims);
        Ok(match dtype {
            DType::Bool => HostTensor::Bool(ArrayD::from_elem(shape, false)),
            DType::I32 => HostTensor::I32(ArrayD::from_elem(shape, 0)),
            DType::I64 => HostTensor::I64(ArrayD::from_elem(shape, 0)),
            DType::F32 => HostTensor::F32(ArrayD::from_elem(shape, 0.0)),
            DType::F64 => HostTensor::F64(ArrayD::from_elem(shape, 0.0)),
            DType::String => HostTensor::Str(ArrayD::from_elem(shape, String::new())),
            DType::Variant => {
                return Err(Error::type_mismatch(
                    "variant tensors have no host representation",
                ))
            }
        })
    }

    pub fn dtype(&self) -> DType {
        match self {
            HostTensor::Bool(_) => DType::Bool,
            HostTensor::I32(_) => DType::I32,
            HostTensor::I64(_) => DType::I64,
            HostTensor::F32(_) => DType::F32,
            HostTensor::F64(_) => DType::F64,
            HostTensor::Str(_) => DType::String,
        }
    }

    pub fn dims(&self) -> &[usize] {
        match self {
            HostTensor::Bool(array) => array.shape(),
            HostTensor::I32(array) => array.shape(),
            HostTensor::I64(array) => array.shape(),
            HostTensor::F32(array) => array.shape(),
            HostTensor::F64(array) => array.shape(),
            HostTensor::Str(array) => array.shape(),
        }
    }

    /// Fully static shape of the array.
    pub fn shape(&self) -> Shape {
        Shape::from_static(self.dims())
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.dims().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the typed array when `T` matches the stored dtype.
    pub fn as_array<T: HostElement>(&self) -> Option<ArrayViewD<'_, T>> {
        T::view(self)
    }

    /// Flattened numeric view; `None` for strings.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        self.to_f64_array().map(|array| array.iter().copied().collect())
    }

    /// Stacks equally shaped tensors along a new leading axis.
    pub fn stack(parts: &[HostTensor]) -> Result<HostTensor> {
        let first = parts
            .first()
            .ok_or_else(|| Error::shape_mismatch("cannot stack an empty list of tensors"))?;
        match first {
            HostTensor::Bool(_) => stack_typed::<bool>(parts),
            HostTensor::I32(_) => stack_typed::<i32>(parts),
            HostTensor::I64(_) => stack_typed::<i64>(parts),
            HostTensor::F32(_) => stack_typed::<f32>(parts),
            HostTensor::F64(_) => stack_typed::<f64>(parts),
            HostTensor::Str(_) => stack_typed::<String>(parts),
        }
    }

    /// Splits the tensor along its leading axis.
    pub fn unstack(&self) -> Result<Vec<HostTensor>> {
        if self.dims().is_empty() {
            return Err(Error::shape_mismatch("cannot slice a scalar tensor"));
        }
        Ok(match self {
            HostTensor::Bool(array) => unstack_typed(array),
            HostTensor::I32(array) => unstack_typed(array),
            HostTensor::I64(array) => unstack_typed(array),
            HostTensor::F32(array) => unstack_typed(array),
            HostTensor::F64(array) => unstack_typed(array),
            HostTensor::Str(array) => unstack_typed(array),
        })
    }

    /// Converts numeric values to another numeric dtype. Strings only cast to strings.
    pub fn cast(&self, dtype: DType) -> Result<HostTensor> {
        if self.dtype() == dtype {
            return Ok(self.clone());
        }
        if !self.dtype().is_numeric() || !dtype.is_numeric() {
            return Err(Error::type_mismatch(format!(
                "cannot convert a {} tensor to {dtype}",
                self.dtype()
            )));
        }
        let mismatch = || Error::type_mismatch(format!("cannot convert {} values", self.dtype()));
        Ok(match dtype {
            DType::Bool => {
                HostTensor::Bool(self.to_f64_array().ok_or_else(mismatch)?.mapv(|v| v != 0.0))
            }
            DType::I32 => {
                let values = self.to_i64_array().ok_or_else(mismatch)?;
                if values.iter().any(|v| i32::try_from(*v).is_err()) {
                    return Err(Error::type_mismatch(format!(
                        "{} values do not fit into int32",
                        self.dtype()
                    )));
                }
                HostTensor::I32(values.mapv(|v| v as i32))
            }
            DType::I64 => HostTensor::I64(self.to_i64_array().ok_or_else(mismatch)?),
            DType::F32 => {
                HostTensor::F32(self.to_f64_array().ok_or_else(mismatch)?.mapv(|v| v as f32))
            }
            DType::F64 => HostTensor::F64(self.to_f64_array().ok_or_else(mismatch)?),
            DType::String | DType::Variant => return Err(mismatch()),
        })
    }

    fn to_f64_array(&self) -> Option<ArrayD<f64>> {
        Some(match self {
            HostTensor::Bool(array) => array.mapv(|v| if v { 1.0 } else { 0.0 }),
            HostTensor::I32(array) => array.mapv(f64::from),
            HostTensor::I64(array) => array.mapv(|v| v as f64),
            HostTensor::F32(array) => array.mapv(f64::from),
            HostTensor::F64(array) => array.clone(),
            HostTensor::Str(_) => return None,
        })
    }

    fn to_i64_array(&self) -> Option<ArrayD<i64>> {
        Some(match self {
            HostTensor::Bool(array) => array.mapv(i64::from),
            HostTensor::I32(array) => array.mapv(i64::from),
            HostTensor::I64(array) => array.clone(),
            HostTensor::F32(array) => array.mapv(|v| v as i64),
            HostTensor::F64(array) => array.mapv(|v| v as i64),
            HostTensor::Str(_) => return None,
        })
    }
}

fn typed_views<T: HostElement>(parts: &[HostTensor]) -> Result<Vec<ArrayViewD<'_, T>>> {
    parts
        .iter()
        .map(|part| {
            T::view(part).ok_or_else(|| {
                Error::type_mismatch(format!(
                    "expected a {} tensor, found {}",
                    T::DTYPE,
                    part.dtype()
                ))
            })
        })
        .collect()
}

fn stack_typed<T: HostElement>(parts: &[HostTensor]) -> Result<HostTensor> {
    let views = typed_views::<T>(parts)?;
    ndarray::stack(Axis(0), &views)
        .map(T::wrap)
        .map_err(|err| Error::shape_mismatch(format!("cannot stack tensors: {err}")))
}

fn unstack_typed<T: HostElement>(array: &ArrayD<T>) -> Vec<HostTensor> {
    array
        .outer_iter()
        .map(|row| T::wrap(row.to_owned()))
        .collect()
}

impl From<bool> for HostTensor {
    fn from(value: bool) -> Self {
        HostTensor::scalar(value)
    }
}

impl From<i32> for HostTensor {
    fn from(value: i32) -> Self {
        HostTensor::scalar(value)
    }
}

impl From<i64> for HostTensor {
    fn from(value: i64) -> Self {
        HostTensor::scalar(value)
    }
}

impl From<f32> for HostTensor {
    fn from(value: f32) -> Self {
        HostTensor::scalar(value)
    }
}

impl From<f64> for HostTensor {
    fn from(value: f64) -> Self {
        HostTensor::scalar(value)
    }
}

impl From<&str> for HostTensor {
    fn from(value: &str) -> Self {
        HostTensor::scalar(value.to_string())
    }
}
