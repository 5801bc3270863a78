use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};

/// Decomposed local transform of a bone
///
/// Matrices use the `nalgebra_glm` column vector convention, so a transform
/// is built as `T * R * S` and a child is placed in the world by
/// `parent_world * local`. Engines using row vectors write the same
/// operations as `S * R * T` and `local * parent_world`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneTransform {
    pub translation: glm::Vec3,
    pub rotation: glm::Quat,
    pub scale: glm::Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self {
            translation: glm::Vec3::zeros(),
            rotation: glm::Quat::identity(),
            scale: glm::vec3(1.0, 1.0, 1.0),
        }
    }
}

impl BoneTransform {
    #[must_use]
    pub const fn new(
        translation: glm::Vec3,
        rotation: glm::Quat,
        scale: glm::Vec3,
    ) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Composes the transform into a matrix. The rotation is used as is,
    /// without normalizing, so a quaternion that has drifted from unit length
    /// produces the same skewed matrix the source data would.
    #[must_use]
    pub fn to_mat4(&self) -> glm::Mat4 {
        compose(&self.translation, &self.rotation, &self.scale)
    }

    /// Decomposes an affine matrix without shear into translation, rotation
    /// and scale. A zero scale axis leaves the rotation as identity.
    #[must_use]
    pub fn from_mat4(m: &glm::Mat4) -> Self {
        let translation = glm::vec3(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        let x = glm::vec3(m[(0, 0)], m[(1, 0)], m[(2, 0)]);
        let y = glm::vec3(m[(0, 1)], m[(1, 1)], m[(2, 1)]);
        let z = glm::vec3(m[(0, 2)], m[(1, 2)], m[(2, 2)]);
        let mut scale =
            glm::vec3(glm::length(&x), glm::length(&y), glm::length(&z));

        // A negative determinant means one axis is mirrored. Put it on x.
        let basis = glm::mat4_to_mat3(m);
        if glm::determinant(&basis) < 0.0 {
            scale.x = -scale.x;
        }

        if glm::comp_min(&glm::abs(&scale)) < f32::EPSILON {
            return Self::new(translation, glm::Quat::identity(), scale);
        }

        let rot_mat = glm::mat3(
            x.x / scale.x, y.x / scale.y, z.x / scale.z, //
            x.y / scale.x, y.y / scale.y, z.y / scale.z, //
            x.z / scale.x, y.z / scale.y, z.z / scale.z,
        );
        let rotation = glm::mat3_to_quat(&rot_mat);
        Self::new(translation, rotation, scale)
    }
}

/// Builds `T * R * S`
#[must_use]
pub fn compose(
    translation: &glm::Vec3,
    rotation: &glm::Quat,
    scale: &glm::Vec3,
) -> glm::Mat4 {
    glm::translation(translation)
        * glm::quat_to_mat4(rotation)
        * glm::scaling(scale)
}

/// Component-wise quaternion lerp. Not spherical and not renormalized, so
/// the result drifts from unit length between keys that are far apart.
#[must_use]
pub fn quat_lerp(a: &glm::Quat, b: &glm::Quat, t: f32) -> glm::Quat {
    a.lerp(b, t)
}
