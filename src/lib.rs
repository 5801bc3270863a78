//! Skeletal animation pose evaluation
//!
//! Clips are sampled per bone and composed down the hierarchy into world
//! and skinning matrices that live in an `AnimatedMesh`. A `Workspace` ties
//! animators to meshes and lets one animator hang its root bones off the
//! bones of another, such as a sword following a hand.

pub mod anim_error;
pub mod animator;
pub mod hash;
pub mod import;
pub mod mesh;
pub mod motion;
pub mod options;
pub mod skeleton;
pub mod transform;
pub mod workspace;

// Re-exports
pub use {
    anim_error::AnimError,
    animator::{Animator, OwnerPose, PoseContext},
    hash::name_hash,
    mesh::AnimatedMesh,
    motion::{BoneClip, MotionBone, MotionClip, MotionContainer, Track},
    options::AnimatorOptions,
    skeleton::{Bone, BoneDesc, Skeleton},
    transform::BoneTransform,
    workspace::{AnimatorId, MeshId, Workspace},
};
