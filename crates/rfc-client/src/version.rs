//! Version information exposed by clients.

use serde::Serialize;

use crate::transport::LibraryVersion;

/// Version of this client crate.
pub const BINDING_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Transport library version plus the client crate version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    /// Library major version.
    pub major: u32,
    /// Library minor version.
    pub minor: u32,
    /// Library patch level.
    pub patch_level: u32,
    /// Client crate version.
    pub binding: String,
}

impl Version {
    /// Combines a library version with [`BINDING_VERSION`].
    #[must_use]
    pub fn from_library(library: LibraryVersion) -> Self {
        Self {
            major: library.major,
            minor: library.minor,
            patch_level: library.patch_level,
            binding: BINDING_VERSION.to_owned(),
        }
    }
}
