pub mod container;
pub mod sampler;
mod types;

// Re-exports
pub use {
    container::{ContainerFormat, MotionContainer, MotionFile},
    sampler::{find_frames, FrameBracket, Interpolate},
    types::{BoneClip, MotionBone, MotionClip, Track, DEFAULT_FRAME_RATE},
};
