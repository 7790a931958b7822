//! Data models for containers and blobs.

mod blob;
mod container;

pub use blob::*;
pub use container::*;

use std::collections::HashMap;

/// User-defined metadata or index tags of a blob.
pub type Metadata = HashMap<String, String>;
