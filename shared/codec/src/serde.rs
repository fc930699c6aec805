use crate::{error::CodecError, reader::ByteReader, typed_array::TypedArray, writer::ByteWriter};

/// Types that know how to write themselves into a [`ByteWriter`]
pub trait Encode {
    fn encode(&self, writer: &mut ByteWriter);
}

/// Types that know how to read themselves out of a [`ByteReader`]
pub trait Decode: Sized {
    fn decode(reader: &mut ByteReader) -> Result<Self, CodecError>;
}

macro_rules! impl_primitive {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Encode for $ty {
            fn encode(&self, writer: &mut ByteWriter) {
                writer.$write(*self);
            }
        }

        impl Decode for $ty {
            fn decode(reader: &mut ByteReader) -> Result<Self, CodecError> {
                reader.$read()
            }
        }
    };
}

impl_primitive!(u8, write_u8, read_u8);
impl_primitive!(u16, write_u16, read_u16);
impl_primitive!(u32, write_u32, read_u32);
impl_primitive!(u64, write_u64, read_u64);
impl_primitive!(i32, write_i32, read_i32);
impl_primitive!(i64, write_i64, read_i64);
impl_primitive!(f32, write_f32, read_f32);
impl_primitive!(f64, write_f64, read_f64);
impl_primitive!(bool, write_bool, read_bool);

impl Encode for String {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_string(self);
    }
}

impl Decode for String {
    fn decode(reader: &mut ByteReader) -> Result<Self, CodecError> {
        reader.read_string()
    }
}

impl Encode for &str {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_string(self);
    }
}

impl Encode for TypedArray {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_typed_array(self);
    }
}

impl Decode for TypedArray {
    fn decode(reader: &mut ByteReader) -> Result<Self, CodecError> {
        reader.read_typed_array()
    }
}

/// Sequences carry a u32 count prefix
impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.len() as u32);
        for item in self {
            item.encode(writer);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(reader: &mut ByteReader) -> Result<Self, CodecError> {
        let count = reader.read_u32()? as usize;
        let mut out = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            out.push(T::decode(reader)?);
        }
        Ok(out)
    }
}

impl<A: Encode, B: Encode> Encode for (A, B) {
    fn encode(&self, writer: &mut ByteWriter) {
        self.0.encode(writer);
        self.1.encode(writer);
    }
}

impl<A: Decode, B: Decode> Decode for (A, B) {
    fn decode(reader: &mut ByteReader) -> Result<Self, CodecError> {
        Ok((A::decode(reader)?, B::decode(reader)?))
    }
}

impl<A: Encode, B: Encode, C: Encode> Encode for (A, B, C) {
    fn encode(&self, writer: &mut ByteWriter) {
        self.0.encode(writer);
        self.1.encode(writer);
        self.2.encode(writer);
    }
}

impl<A: Decode, B: Decode, C: Decode> Decode for (A, B, C) {
    fn decode(reader: &mut ByteReader) -> Result<Self, CodecError> {
        Ok((A::decode(reader)?, B::decode(reader)?, C::decode(reader)?))
    }
}
