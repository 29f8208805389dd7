//! The entities and changes that apideploy turns into HTTP requests, together
//! with the pure, synchronous parts of request shaping: field path resolution
//! and capability filtering.

pub mod change;
pub mod element;
pub mod filter;
pub mod path;

pub use change::{ActionKind, Change};
pub use element::{ElemId, Entity, FieldAnnotations, ObjectType, ParentRef};
pub use filter::{filter_undeployable_values, FieldPredicate, FieldRef};
pub use path::{FieldPath, PathError, Scope};
