use std::{error, fmt};

/// Unified error type
///
/// Pose evaluation itself never fails: missing or sparse data falls back to
/// the bind pose or identity. Only the loading side (options, motion
/// containers, glTF import) returns `AnimError`.
///
/// Some error types from other crates are large so are boxed.
#[derive(Debug)]
pub enum AnimError {
    InvalidFile,
    UnsupportedFormat,
    SerdeYamlError(Box<serde_yaml::Error>),
    StdIoError(std::io::Error),
    GltfError(Box<gltf::Error>),
    ImportError(crate::import::ImportError),
}

impl error::Error for AnimError {}

impl fmt::Display for AnimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidFile => write!(f, "invalid file"),
            Self::UnsupportedFormat => write!(f, "format is not supported"),
            Self::SerdeYamlError(e) => {
                write!(f, "serde_yaml::Error: {e}")
            }
            Self::StdIoError(e) => write!(f, "std::io::Error: {}", e.kind()),
            Self::GltfError(e) => {
                write!(f, "gltf Error: {e}")
            }
            Self::ImportError(e) => write!(f, "import error: {e}"),
        }
    }
}

impl From<serde_yaml::Error> for AnimError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::SerdeYamlError(Box::new(e))
    }
}

impl From<std::io::Error> for AnimError {
    fn from(e: std::io::Error) -> Self {
        Self::StdIoError(e)
    }
}

impl From<gltf::Error> for AnimError {
    fn from(e: gltf::Error) -> Self {
        Self::GltfError(Box::new(e))
    }
}

impl From<crate::import::ImportError> for AnimError {
    fn from(e: crate::import::ImportError) -> Self {
        Self::ImportError(e)
    }
}
