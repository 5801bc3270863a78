use crate::{
    mesh::AnimatedMesh,
    motion::MotionClip,
    skeleton::{Bone, Skeleton},
    transform::BoneTransform,
};
use log::trace;
use nalgebra_glm as glm;

/// World pose of the animator this one is attached to
#[derive(Copy, Clone, Debug)]
pub struct OwnerPose<'a> {
    pub skeleton: &'a Skeleton,
    pub world: &'a [glm::Mat4],
}

/// Everything outside the animator and its mesh that evaluation reads
#[derive(Copy, Clone, Debug, Default)]
pub struct PoseContext<'a> {
    /// Active reference skeleton, which is the animator's own or one
    /// inherited from its owner chain
    pub reference: Option<&'a Skeleton>,
    pub owner: Option<OwnerPose<'a>>,
}

fn is_root_motion_bone(bone: &Bone) -> bool {
    bone.parent.is_none() && bone.name.eq_ignore_ascii_case("root")
}

/// Local transform of one bone at `frame`. Later sources override earlier
/// ones: bind pose, static motion bone, reference skeleton bind, then any
/// keyframe track that yields a sample.
fn resolve_local(
    bone: &Bone,
    clip: &MotionClip,
    frame: f32,
    reference: Option<&Skeleton>,
) -> BoneTransform {
    let mut local = bone.local_bind;
    let mut bone_clip = clip.bone_clip(bone.name_hash);

    if let Some(m) = clip.motion_bone(bone.name_hash) {
        local.translation = m.translation;
        local.rotation = m.rotation;
    }

    if let Some(reference) = reference {
        match reference.bone_by_hash(bone.name_hash) {
            Some(r) => local = r.local_bind,
            // Not part of the reference rig so the clip may not move it
            None => bone_clip = None,
        }
    }

    if let Some(c) = bone_clip {
        if let Some(v) = c.translation.as_ref().and_then(|t| t.sample(frame)) {
            local.translation = v;
        }
        if let Some(v) = c.rotation.as_ref().and_then(|t| t.sample(frame)) {
            local.rotation = v;
        }
        if let Some(v) = c.scale.as_ref().and_then(|t| t.sample(frame)) {
            local.scale = v;
        }
    }
    local
}

/// World transform of the owner bone a root bone hangs from, if the whole
/// chain of lookups succeeds
fn attachment_parent(bone: &Bone, ctx: &PoseContext) -> Option<glm::Mat4> {
    let owner = ctx.owner?;
    let reference = ctx.reference?;
    let ref_bone = reference.bone_by_hash(bone.name_hash)?;
    let ref_parent = reference.bone(ref_bone.parent?)?;
    let index = owner.skeleton.index_of_hash(ref_parent.name_hash)?;
    owner.world.get(index).copied()
}

/// Writes the pose of `clip` at `frame` into the mesh buffers
///
/// The buffers must already match the skeleton. Bones are visited once in
/// table order so each parent's world transform is final before any child
/// reads it.
pub fn evaluate(
    clip: &MotionClip,
    frame: f32,
    ignore_root_motion: bool,
    ctx: &PoseContext,
    mesh: &mut AnimatedMesh,
) {
    let (skeleton, bone_matrices, deform_bone_matrices) = mesh.pose_buffers();
    trace!(
        "evaluate clip={} frame={} bones={}",
        clip.name(),
        frame,
        skeleton.bone_count()
    );

    for bone in skeleton.bones() {
        // Pinned root: children still read it, its skinning matrix is left
        if ignore_root_motion && is_root_motion_bone(bone) {
            bone_matrices[bone.index] = glm::Mat4::identity();
            continue;
        }

        let local = resolve_local(bone, clip, frame, ctx.reference).to_mat4();
        let world = match bone.parent {
            Some(p) => {
                debug_assert!(p < bone.index, "bone table out of order");
                bone_matrices[p] * local
            }
            None => attachment_parent(bone, ctx)
                .map_or(local, |parent| parent * local),
        };

        bone_matrices[bone.index] = world;
        if let Some(r) = bone.remap {
            if let Some(slot) = deform_bone_matrices.get_mut(r) {
                *slot = world * bone.inverse_global_bind;
            }
        }
    }
}
