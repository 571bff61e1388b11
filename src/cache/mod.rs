//! Per-vertex degree caching and its persistence.

mod persistence;
mod scope;
mod vertex;

pub use persistence::{DegreePersistence, PropertyPerEntry, SingleBlob};
pub use scope::{CachingScope, DegreeCache};
pub use vertex::DegreeCachingVertex;
