//! Predicate algebra and edge descriptions.

pub mod codec;
mod edge;
mod predicate;
mod properties;

pub use edge::DetachedEdgeDescription;
pub use predicate::PropertyPredicate;
pub use properties::{
    AbsentKeys, DetachedPropertiesDescription, LazyPropertiesDescription, PropertiesDescription,
};
