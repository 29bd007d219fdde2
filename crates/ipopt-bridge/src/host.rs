//! Host-side values handed to and returned from problem callables.
//!
//! A [`HostArray`] is a dynamically shaped array that also carries its element
//! type at runtime, so the marshaling layer can reject data of the wrong type or
//! layout instead of silently reinterpreting it. Conversions into host values are
//! structural only: nothing is ever cast to another element type here.

use std::borrow::Cow;
use std::fmt;

use ndarray::{Array, Array1, ArrayD, Dimension, IxDyn};

/// Element type of a host array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Float64,
    Float32,
    Int64,
    Int32,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Float64 => write!(f, "float64"),
            DType::Float32 => write!(f, "float32"),
            DType::Int64 => write!(f, "int64"),
            DType::Int32 => write!(f, "int32"),
        }
    }
}

/// Array of any supported element type and any number of dimensions.
#[derive(Debug, Clone, PartialEq)]
pub enum HostArray {
    Float64(ArrayD<f64>),
    Float32(ArrayD<f32>),
    Int64(ArrayD<i64>),
    Int32(ArrayD<i32>),
}

impl HostArray {
    pub fn dtype(&self) -> DType {
        match self {
            HostArray::Float64(_) => DType::Float64,
            HostArray::Float32(_) => DType::Float32,
            HostArray::Int64(_) => DType::Int64,
            HostArray::Int32(_) => DType::Int32,
        }
    }

    /// Total number of elements across all dimensions (1 for a 0-d array).
    pub fn len(&self) -> usize {
        match self {
            HostArray::Float64(a) => a.len(),
            HostArray::Float32(a) => a.len(),
            HostArray::Int64(a) => a.len(),
            HostArray::Int32(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            HostArray::Float64(a) => a.shape(),
            HostArray::Float32(a) => a.shape(),
            HostArray::Int64(a) => a.shape(),
            HostArray::Int32(a) => a.shape(),
        }
    }

    /// True when the elements are contiguous in row-major (C) order.
    pub fn is_standard_layout(&self) -> bool {
        match self {
            HostArray::Float64(a) => a.is_standard_layout(),
            HostArray::Float32(a) => a.is_standard_layout(),
            HostArray::Int64(a) => a.is_standard_layout(),
            HostArray::Int32(a) => a.is_standard_layout(),
        }
    }
}

/// Element types that can cross the bridge.
pub trait Element: Copy + 'static {
    const DTYPE: DType;

    /// Borrow the typed array if `array` holds this element type.
    fn downcast(array: &HostArray) -> Option<&ArrayD<Self>>;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn downcast(array: &HostArray) -> Option<&ArrayD<Self>> {
                match array {
                    HostArray::$variant(a) => Some(a),
                    _ => None,
                }
            }
        }

        impl<D: Dimension> From<Array<$ty, D>> for HostArray {
            fn from(array: Array<$ty, D>) -> Self {
                HostArray::$variant(array.into_dyn())
            }
        }

        impl From<Vec<$ty>> for HostArray {
            fn from(values: Vec<$ty>) -> Self {
                HostArray::$variant(Array1::from(values).into_dyn())
            }
        }

        impl<D: Dimension> From<Array<$ty, D>> for HostValue {
            fn from(array: Array<$ty, D>) -> Self {
                HostValue::Array(array.into())
            }
        }

        impl From<Vec<$ty>> for HostValue {
            fn from(values: Vec<$ty>) -> Self {
                HostValue::Array(values.into())
            }
        }

        impl From<&[$ty]> for HostValue {
            fn from(values: &[$ty]) -> Self {
                HostValue::Array(values.to_vec().into())
            }
        }
    };
}

impl_element!(f64, Float64);
impl_element!(f32, Float32);
impl_element!(i64, Int64);
impl_element!(i32, Int32);

/// Value produced by a host callable or supplied as problem data.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Float(f64),
    Int(i64),
    Array(HostArray),
}

impl HostValue {
    /// Interpret the value as a scalar.
    ///
    /// Only plain numbers qualify; arrays do not, not even single-element ones.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            HostValue::Float(v) => Some(*v),
            HostValue::Int(v) => Some(*v as f64),
            HostValue::Array(_) => None,
        }
    }

    /// View the value as a host array: numbers become 0-d arrays of their own type.
    ///
    /// Arrays are borrowed, never copied.
    pub fn to_array(&self) -> Cow<'_, HostArray> {
        match self {
            HostValue::Float(v) => {
                Cow::Owned(HostArray::Float64(ArrayD::from_elem(IxDyn(&[]), *v)))
            }
            HostValue::Int(v) => Cow::Owned(HostArray::Int64(ArrayD::from_elem(IxDyn(&[]), *v))),
            HostValue::Array(a) => Cow::Borrowed(a),
        }
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Float(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Int(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Int(value.into())
    }
}

impl From<HostArray> for HostValue {
    fn from(array: HostArray) -> Self {
        HostValue::Array(array)
    }
}
