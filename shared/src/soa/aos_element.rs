use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    graph::{LiveStruct, LiveValue},
    proxy::ScalarValue,
};

/// Per-index dictionary for a field that cannot live in a flat typed buffer
/// (e.g. a small enum-as-string on each element).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AosElement {
    pub values: BTreeMap<usize, ScalarValue>,
}

impl AosElement {
    /// Collect `field` from every element that carries a representable value
    pub fn read(elements: &[LiveValue], field: &str) -> Self {
        let mut values = BTreeMap::new();
        for (index, element) in elements.iter().enumerate() {
            let Some(element) = element.as_struct() else {
                continue;
            };
            if let Some(value) = element.field(field).and_then(ScalarValue::from_live) {
                values.insert(index, value);
            }
        }
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write one element's entry back into its live struct, if present
    pub fn write_element(&self, index: usize, field: &str, target: &mut LiveStruct) {
        if let Some(value) = self.values.get(&index) {
            target.set_field(field, value.to_live());
        }
    }
}
