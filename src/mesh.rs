use crate::{hash::name_hash, skeleton::Skeleton};
use log::debug;
use nalgebra_glm as glm;
use std::sync::Arc;

/// Skinned mesh state that the animation system writes into
///
/// The mesh owns the skeleton reference and the two output buffers. An
/// animator borrows the buffers mutably while it evaluates a pose and a
/// renderer borrows them immutably to draw, so the borrow checker keeps the
/// "update, then draw" phases apart.
#[derive(Clone, Debug)]
pub struct AnimatedMesh {
    skeleton: Arc<Skeleton>,
    bone_matrices: Vec<glm::Mat4>,
    deform_bone_matrices: Vec<glm::Mat4>,
}

impl AnimatedMesh {
    /// Creates the mesh in its bind pose
    #[must_use]
    pub fn new(skeleton: Arc<Skeleton>) -> Self {
        let mut mesh = Self {
            skeleton,
            bone_matrices: Vec::new(),
            deform_bone_matrices: Vec::new(),
        };
        mesh.reset_to_bind_pose();
        mesh
    }

    #[must_use]
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Swaps the skeleton. The buffers keep their old contents until the
    /// next update resizes them.
    pub fn set_skeleton(&mut self, skeleton: Arc<Skeleton>) {
        self.skeleton = skeleton;
    }

    /// World transform of every bone, in skeleton order
    #[must_use]
    pub fn bone_matrices(&self) -> &[glm::Mat4] {
        &self.bone_matrices
    }

    /// Skinning matrix of every deform bone, indexed by remap index
    #[must_use]
    pub fn deform_bone_matrices(&self) -> &[glm::Mat4] {
        &self.deform_bone_matrices
    }

    /// Skinning matrices as raw bytes, ready to copy into a uniform or
    /// storage buffer. Column major, 64 bytes per bone.
    #[must_use]
    pub fn skinning_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.deform_bone_matrices)
    }

    /// Skinning matrices as GLSL friendly `mat4` arrays
    #[must_use]
    pub fn skinning_arrays(&self) -> Vec<[[f32; 4]; 4]> {
        self.deform_bone_matrices.iter().map(|m| (*m).into()).collect()
    }

    #[must_use]
    pub fn world_matrix(&self, index: usize) -> Option<&glm::Mat4> {
        self.bone_matrices.get(index)
    }

    #[must_use]
    pub fn world_matrix_by_hash(&self, hash: u32) -> Option<&glm::Mat4> {
        self.skeleton
            .index_of_hash(hash)
            .and_then(|i| self.bone_matrices.get(i))
    }

    #[must_use]
    pub fn world_matrix_by_name(&self, name: &str) -> Option<&glm::Mat4> {
        self.world_matrix_by_hash(name_hash(name))
    }

    /// Resizes the buffers if the skeleton has changed since they were
    /// created. New buffers are filled with identity.
    pub(crate) fn ensure_buffers(&mut self) {
        let bone_count = self.skeleton.bone_count();
        if self.bone_matrices.len() != bone_count {
            debug!("resizing bone matrices to {}", bone_count);
            self.bone_matrices = vec![glm::Mat4::identity(); bone_count];
        }
        let deform_count = self.skeleton.deform_bone_count();
        if self.deform_bone_matrices.len() != deform_count {
            debug!("resizing deform bone matrices to {}", deform_count);
            self.deform_bone_matrices =
                vec![glm::Mat4::identity(); deform_count];
        }
    }

    /// Puts every bone back at its bind pose and every skinning matrix back
    /// to identity
    pub(crate) fn reset_to_bind_pose(&mut self) {
        self.bone_matrices.clear();
        self.bone_matrices
            .extend(self.skeleton.bones().iter().map(|b| b.global_bind));
        self.deform_bone_matrices.clear();
        self.deform_bone_matrices.resize(
            self.skeleton.deform_bone_count(),
            glm::Mat4::identity(),
        );
    }

    /// Split borrow for pose evaluation
    pub(crate) fn pose_buffers(
        &mut self,
    ) -> (&Skeleton, &mut [glm::Mat4], &mut [glm::Mat4]) {
        (
            self.skeleton.as_ref(),
            &mut self.bone_matrices,
            &mut self.deform_bone_matrices,
        )
    }
}
