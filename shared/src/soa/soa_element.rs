use serde::{Deserialize, Serialize};

use meld_codec::{TypeCode, TypedArray};

use crate::{
    error::SyncError,
    graph::{LiveStruct, LiveValue, VisitPath},
};

/// One field transposed across every element of a collection.
///
/// The raw buffer never rides inside the JSON-encoded proxy; it is stripped
/// into the binary soa-section of the wire payload and grafted back on
/// decode, which is why `data` is skipped by serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoaElement {
    #[serde(with = "super::typecode_serde")]
    pub code: TypeCode,
    /// Scalar components per collection element (3 for a vec3)
    pub components: usize,
    /// Collection element count the buffer was read from
    pub count: usize,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl SoaElement {
    /// Bulk-read `field` across every element of an ordered collection
    pub fn read(
        elements: &[LiveValue],
        field: &str,
        code: TypeCode,
        components: usize,
        path: &VisitPath,
    ) -> Result<Self, SyncError> {
        let mut data = Vec::with_capacity(elements.len() * components * code.width());
        for element in elements {
            let Some(element) = element.as_struct() else {
                return Err(SyncError::StructuralMismatch {
                    path: path.to_string(),
                    reason: "bulk collection element is not a struct".to_string(),
                });
            };
            write_components(&mut data, element, field, code, components);
        }
        Ok(Self {
            code,
            components,
            count: elements.len(),
            data,
        })
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Scalar element count carried by the buffer
    pub fn scalar_count(&self) -> usize {
        self.data.len() / self.code.width()
    }

    pub fn to_typed_array(&self) -> Result<TypedArray, SyncError> {
        Ok(TypedArray::from_bytes(self.code, self.data.clone())?)
    }

    /// Write one element's components back into its live struct
    pub fn write_element(&self, index: usize, field: &str, target: &mut LiveStruct) {
        let stride = self.components * self.code.width();
        let start = index * stride;
        if start + stride > self.data.len() {
            return;
        }
        let chunk = &self.data[start..start + stride];

        let value = if self.components == 1 {
            scalar_from_bytes(chunk, self.code)
        } else {
            let mut parts = Vec::with_capacity(self.components);
            for part in chunk.chunks_exact(self.code.width()) {
                parts.push(f32_from_bytes(part, self.code));
            }
            LiveValue::Vector(parts)
        };
        target.set_field(field, value);
    }
}

fn write_components(
    data: &mut Vec<u8>,
    element: &LiveStruct,
    field: &str,
    code: TypeCode,
    components: usize,
) {
    match element.field(field) {
        Some(LiveValue::Float(value)) if components == 1 => {
            push_scalar(data, *value, code);
        }
        Some(LiveValue::Int(value)) if components == 1 => {
            push_scalar(data, *value as f64, code);
        }
        Some(LiveValue::Bool(value)) if components == 1 => {
            push_scalar(data, if *value { 1.0 } else { 0.0 }, code);
        }
        Some(LiveValue::Vector(parts)) => {
            for i in 0..components {
                push_scalar(data, parts.get(i).copied().unwrap_or(0.0) as f64, code);
            }
        }
        // missing or unrepresentable fields transpose as zeros
        _ => {
            for _ in 0..components {
                push_scalar(data, 0.0, code);
            }
        }
    }
}

fn push_scalar(data: &mut Vec<u8>, value: f64, code: TypeCode) {
    match code {
        TypeCode::I8 => data.push(value as i8 as u8),
        TypeCode::U8 => data.push(value as u8),
        TypeCode::I32 => data.extend_from_slice(&(value as i32).to_le_bytes()),
        TypeCode::U32 => data.extend_from_slice(&(value as u32).to_le_bytes()),
        TypeCode::F32 => data.extend_from_slice(&(value as f32).to_le_bytes()),
        TypeCode::F64 => data.extend_from_slice(&value.to_le_bytes()),
    }
}

fn scalar_from_bytes(chunk: &[u8], code: TypeCode) -> LiveValue {
    match code {
        TypeCode::I8 => LiveValue::Int(chunk[0] as i8 as i64),
        TypeCode::U8 => LiveValue::Int(chunk[0] as i64),
        TypeCode::I32 => LiveValue::Int(i32::from_le_bytes(chunk.try_into().unwrap()) as i64),
        TypeCode::U32 => LiveValue::Int(u32::from_le_bytes(chunk.try_into().unwrap()) as i64),
        TypeCode::F32 => LiveValue::Float(f32::from_le_bytes(chunk.try_into().unwrap()) as f64),
        TypeCode::F64 => LiveValue::Float(f64::from_le_bytes(chunk.try_into().unwrap())),
    }
}

fn f32_from_bytes(chunk: &[u8], code: TypeCode) -> f32 {
    match code {
        TypeCode::I8 => chunk[0] as i8 as f32,
        TypeCode::U8 => chunk[0] as f32,
        TypeCode::I32 => i32::from_le_bytes(chunk.try_into().unwrap()) as f32,
        TypeCode::U32 => u32::from_le_bytes(chunk.try_into().unwrap()) as f32,
        TypeCode::F32 => f32::from_le_bytes(chunk.try_into().unwrap()),
        TypeCode::F64 => f64::from_le_bytes(chunk.try_into().unwrap()) as f32,
    }
}
