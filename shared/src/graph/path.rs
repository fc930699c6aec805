use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::SyncError,
    graph::value::{CollectionStorage, LiveStruct, LiveValue},
};

/// One step from a container into a child node.
///
/// `Name` addresses a struct field or a map key; `Index` addresses a
/// position in an ordered collection. The JSON form is a bare string or
/// number, which keeps wire paths compact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathStep {
    Index(usize),
    Name(String),
}

impl PathStep {
    pub fn name(value: impl Into<String>) -> Self {
        PathStep::Name(value.into())
    }
}

/// Ownership-free traversal context: the (container, key) steps from the
/// synchronization root to the current node.
///
/// Owned transiently by the traversal call stack; also used to locate the
/// owning collection of a bulk-array buffer inside a wire payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisitPath {
    steps: Vec<PathStep>,
}

impl VisitPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    pub fn pop(&mut self) {
        self.steps.pop();
    }

    pub fn child(&self, step: PathStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// JSON-array string form used in wire soa-sections
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.steps).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn from_json(text: &str) -> Result<Self, SyncError> {
        let steps: Vec<PathStep> = serde_json::from_str(text)?;
        Ok(Self { steps })
    }
}

impl fmt::Display for VisitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "<root>");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Name(name) => {
                    if i == 0 {
                        write!(f, "{name}")?;
                    } else {
                        write!(f, ".{name}")?;
                    }
                }
                PathStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Walk a datablock root down a path, yielding the addressed slot.
///
/// `Name` steps traverse struct fields or map entries; `Index` steps
/// traverse ordered collections. Returns `None` when the path no longer
/// matches the live shape (the caller logs and skips).
pub fn navigate_mut<'v>(root: &'v mut LiveStruct, path: &VisitPath) -> Option<&'v mut LiveValue> {
    let mut steps = path.steps().iter();

    let first = steps.next()?;
    let mut current = match first {
        PathStep::Name(name) => root.field_mut(name)?,
        PathStep::Index(_) => return None,
    };

    for step in steps {
        current = match (step, current) {
            (PathStep::Name(name), LiveValue::Struct(s)) => s.field_mut(name)?,
            (PathStep::Name(name), LiveValue::Collection(c)) => c.get_key_mut(name)?,
            (PathStep::Index(index), LiveValue::Collection(c)) => match &mut c.storage {
                CollectionStorage::Seq(items) => items.get_mut(*index)?,
                CollectionStorage::Map(_) => return None,
            },
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::value::{LiveCollection, ResizePolicy};

    fn sample_root() -> LiveStruct {
        LiveStruct::new("Object").with_field(
            "children",
            LiveValue::Collection(
                LiveCollection::seq(ResizePolicy::Resizable)
                    .with_item(LiveValue::Struct(
                        LiveStruct::new("Child").with_field("x", LiveValue::Float(1.0)),
                    ))
                    .with_item(LiveValue::Struct(
                        LiveStruct::new("Child").with_field("x", LiveValue::Float(2.0)),
                    )),
            ),
        )
    }

    #[test]
    fn json_roundtrip_preserves_step_kinds() {
        let mut path = VisitPath::root();
        path.push(PathStep::name("children"));
        path.push(PathStep::Index(1));
        path.push(PathStep::name("x"));

        let json = path.to_json();
        assert_eq!(json, r#"["children",1,"x"]"#);
        assert_eq!(VisitPath::from_json(&json).unwrap(), path);
    }

    #[test]
    fn navigation_follows_names_and_indices() {
        let mut root = sample_root();
        let mut path = VisitPath::root();
        path.push(PathStep::name("children"));
        path.push(PathStep::Index(1));
        path.push(PathStep::name("x"));

        let slot = navigate_mut(&mut root, &path).unwrap();
        assert_eq!(*slot, LiveValue::Float(2.0));
    }

    #[test]
    fn navigation_fails_softly_on_shape_mismatch() {
        let mut root = sample_root();
        let mut path = VisitPath::root();
        path.push(PathStep::name("children"));
        path.push(PathStep::Index(9));

        assert!(navigate_mut(&mut root, &path).is_none());
    }

    #[test]
    fn display_is_readable() {
        let mut path = VisitPath::root();
        path.push(PathStep::name("children"));
        path.push(PathStep::Index(0));
        path.push(PathStep::name("x"));
        assert_eq!(path.to_string(), "children[0].x");
    }
}
