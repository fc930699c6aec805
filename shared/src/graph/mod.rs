//! Dynamic live-graph model.
//!
//! The domain schema being synchronized is an external collaborator; the
//! engine sees it as a dynamic value tree of structs, collections, scalars
//! and uuid references, plus a registry of named top-level collections.

mod path;
mod registry;
mod value;

pub use path::{navigate_mut, PathStep, VisitPath};
pub use registry::{GraphRegistry, LiveDatablock};
pub use value::{CollectionStorage, LiveCollection, LiveStruct, LiveValue, ResizePolicy};
