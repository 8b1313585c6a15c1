//! Version maps
//!
//! One [`VersionMap`] per class-version transition records how each changed
//! field looked one version earlier. A class's maps together form a
//! [`MapChain`], which walks a field back across any number of versions.

mod chain;
mod map;

pub use chain::{Lineage, MapChain};
pub use map::VersionMap;
