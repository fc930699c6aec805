//! Bulk array (AOS/SOA) subsystem.
//!
//! Large homogeneous collections (thousands of elements) are too slow to
//! diff element-by-element. One designated field across *all* elements is
//! transposed into a flat typed buffer instead; diffing is a single bulk
//! equality check and application is a single bulk write-back. Buffers are
//! always replaced whole, never patched in place.

mod aos_element;
mod array_group;
mod soa_element;

pub use aos_element::AosElement;
pub use array_group::ArrayGroupProxy;
pub use soa_element::SoaElement;

pub(crate) mod typecode_serde {
    use meld_codec::TypeCode;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(code: &TypeCode, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(code.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TypeCode, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse()
            .map_err(|_| de::Error::custom(format!("unknown typecode {text:?}")))
    }
}
