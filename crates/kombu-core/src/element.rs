//! Vector element types.
//!
//! Datasets are generic over their element type. The [`VectorElement`]
//! trait covers the types the file formats and distance kernels understand:
//! 32-bit floats, 16-bit floats (via the `half` crate), and signed/unsigned
//! 8-bit integers. Distance kernels widen every element to `f32` before
//! accumulating.

use half::f16;

/// Runtime tag for a dataset's element type.
///
/// Used by the file loaders to dispatch on the stored representation and by
/// the native container header to record it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit IEEE-754 float.
    F32,
    /// 16-bit IEEE-754 float.
    F16,
    /// 8-bit signed integer.
    I8,
    /// 8-bit unsigned integer.
    U8,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 => 2,
            DType::I8 | DType::U8 => 1,
        }
    }

    /// Stable on-disk code for the native container header.
    pub fn code(&self) -> u8 {
        match self {
            DType::F32 => 0,
            DType::F16 => 1,
            DType::I8 => 2,
            DType::U8 => 3,
        }
    }

    /// Decode an on-disk code. Returns `None` for unknown codes.
    pub fn from_code(code: u8) -> Option<DType> {
        match code {
            0 => Some(DType::F32),
            1 => Some(DType::F16),
            2 => Some(DType::I8),
            3 => Some(DType::U8),
            _ => None,
        }
    }
}

/// An element of a stored vector.
///
/// Implementations provide widening to `f32` for distance computation,
/// narrowing from `f32` for fixtures and format conversion, and
/// little-endian byte conversion for the file formats.
pub trait VectorElement:
    Copy + Default + Send + Sync + PartialEq + std::fmt::Debug + 'static
{
    /// Runtime tag matching this type.
    const DTYPE: DType;

    /// Widen to `f32`.
    fn to_f32(self) -> f32;

    /// Narrow from `f32`. Out-of-range values saturate.
    fn from_f32(value: f32) -> Self;

    /// Read one element from `Self::DTYPE.size_in_bytes()` little-endian
    /// bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Append this element's little-endian bytes to `out`.
    fn write_le(self, out: &mut Vec<u8>);
}

impl VectorElement for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(value: f32) -> Self {
        value
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        f32::from_le_bytes(bytes[..4].try_into().unwrap())
    }

    #[inline]
    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl VectorElement for f16 {
    const DTYPE: DType = DType::F16;

    #[inline]
    fn to_f32(self) -> f32 {
        f32::from(self)
    }

    #[inline]
    fn from_f32(value: f32) -> Self {
        f16::from_f32(value)
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        f16::from_le_bytes(bytes[..2].try_into().unwrap())
    }

    #[inline]
    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl VectorElement for i8 {
    const DTYPE: DType = DType::I8;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_f32(value: f32) -> Self {
        value as i8
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    #[inline]
    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }
}

impl VectorElement for u8 {
    const DTYPE: DType = DType::U8;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_f32(value: f32) -> Self {
        value as u8
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }

    #[inline]
    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}
