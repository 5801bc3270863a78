use crate::motion::DEFAULT_FRAME_RATE;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(default)]
pub struct ImportOptions {
    /// Convert from glTF +Y up to +Z up
    pub swizzle: bool,
    /// glTF keys are in seconds. They are stored as frames at this rate.
    pub frame_rate: f32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            swizzle: false,
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

/// Errors specific to importing data. `AnimError` has a `From` trait to
/// handle these.
#[derive(Debug)]
pub enum ImportError {
    NoInverseBind,
    SparseAnimation,
    NoSampler,
    NoSamplerOutput,
    Morphing,
    NoNodeInfo(usize),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::NoInverseBind => {
                write!(f, "inverse bind matrices are required for a skin")
            }
            Self::SparseAnimation => {
                write!(f, "sparse animation data is not supported")
            }
            Self::NoSampler => {
                write!(f, "a sampler is required for animation")
            }
            Self::NoSamplerOutput => {
                write!(f, "a sampler output is required for animation")
            }
            Self::Morphing => {
                write!(f, "morphing animation is not supported")
            }
            Self::NoNodeInfo(a) => write!(f, "node {a} has missing info"),
        }
    }
}
