use std::str::FromStr;

use crate::error::CodecError;

/// Element type of a flat numeric buffer.
///
/// The wire form is a one-character typecode string, length-prefixed like any
/// other string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    I8,
    U8,
    I32,
    U32,
    F32,
    F64,
}

impl TypeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeCode::I8 => "b",
            TypeCode::U8 => "B",
            TypeCode::I32 => "i",
            TypeCode::U32 => "I",
            TypeCode::F32 => "f",
            TypeCode::F64 => "d",
        }
    }

    /// Width of one element in bytes
    pub fn width(&self) -> usize {
        match self {
            TypeCode::I8 | TypeCode::U8 => 1,
            TypeCode::I32 | TypeCode::U32 | TypeCode::F32 => 4,
            TypeCode::F64 => 8,
        }
    }
}

impl FromStr for TypeCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "b" => Ok(TypeCode::I8),
            "B" => Ok(TypeCode::U8),
            "i" => Ok(TypeCode::I32),
            "I" => Ok(TypeCode::U32),
            "f" => Ok(TypeCode::F32),
            "d" => Ok(TypeCode::F64),
            _ => Err(()),
        }
    }
}

/// A flat homogeneous numeric buffer: one field transposed across every
/// element of a large collection (structure-of-arrays form).
#[derive(Debug, Clone, PartialEq)]
pub struct TypedArray {
    code: TypeCode,
    data: Vec<u8>,
}

impl TypedArray {
    /// Wrap raw bytes, checking element alignment
    pub fn from_bytes(code: TypeCode, data: Vec<u8>) -> Result<Self, CodecError> {
        if data.len() % code.width() != 0 {
            return Err(CodecError::MisalignedTypedArray {
                len: data.len(),
                width: code.width(),
            });
        }
        Ok(Self { code, data })
    }

    pub fn from_f32_slice(values: &[f32]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 4);
        for value in values {
            data.extend_from_slice(&value.to_le_bytes());
        }
        Self {
            code: TypeCode::F32,
            data,
        }
    }

    pub fn from_f64_slice(values: &[f64]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 8);
        for value in values {
            data.extend_from_slice(&value.to_le_bytes());
        }
        Self {
            code: TypeCode::F64,
            data,
        }
    }

    pub fn from_i32_slice(values: &[i32]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 4);
        for value in values {
            data.extend_from_slice(&value.to_le_bytes());
        }
        Self {
            code: TypeCode::I32,
            data,
        }
    }

    pub fn code(&self) -> TypeCode {
        self.code
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Number of scalar elements in the buffer
    pub fn element_count(&self) -> usize {
        self.data.len() / self.code.width()
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.data
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
            .collect()
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data
            .chunks_exact(8)
            .map(|chunk| f64::from_le_bytes(chunk.try_into().unwrap()))
            .collect()
    }

    pub fn to_i32_vec(&self) -> Vec<i32> {
        self.data
            .chunks_exact(4)
            .map(|chunk| i32::from_le_bytes(chunk.try_into().unwrap()))
            .collect()
    }
}
