//! Top-level error type for atlas consumers.

use thiserror::Error;

use crate::cache::CacheError;
use crate::descriptor::NameParseError;
use crate::mesh::MeshError;
use crate::registry::RegistryError;
use crate::tree::{LookupError, StructuralError};
use crate::volume::VolumeError;

/// Any failure surfaced by the atlas facade.
///
/// Wraps the subsystem errors so callers can match on the failure class
/// while still reaching the specific diagnostic underneath.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// The symbolic atlas name could not be parsed.
    #[error(transparent)]
    InvalidName(#[from] NameParseError),

    /// Version resolution against the remote registry failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Downloading, installing, or inspecting the cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The region table is malformed; the atlas is unusable until
    /// re-fetched.
    #[error(transparent)]
    Structure(#[from] StructuralError),

    /// A region lookup missed.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Reading a volume failed.
    #[error(transparent)]
    Volume(#[from] VolumeError),

    /// Loading a region mesh failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_lookup_error() {
        let err: AtlasError = LookupError::NotFound {
            key: "\"CTX\"".to_string(),
        }
        .into();

        assert!(matches!(err, AtlasError::Lookup(_)));
        assert!(err.to_string().contains("CTX"));
    }

    #[test]
    fn test_wraps_name_error() {
        let parse_err = "not-an-atlas".parse::<crate::descriptor::AtlasName>().unwrap_err();
        let err: AtlasError = parse_err.into();
        assert!(matches!(err, AtlasError::InvalidName(_)));
    }
}
