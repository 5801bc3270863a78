use crate::{hash::name_hash, transform::BoneTransform};
use ahash::{HashMap, HashMapExt};
use log::{debug, warn};
use nalgebra_glm as glm;

/// Bone as supplied by a skeleton provider, before the derived bind data
/// has been calculated
#[derive(Clone, Debug)]
pub struct BoneDesc {
    pub name: String,
    pub parent: Option<usize>,
    pub local_bind: glm::Mat4,
    pub remap: Option<usize>,
}

impl BoneDesc {
    /// Convenience for building a bone from decomposed bind values
    #[must_use]
    pub fn new(
        name: &str,
        parent: Option<usize>,
        local_bind: &BoneTransform,
        remap: Option<usize>,
    ) -> Self {
        Self {
            name: name.to_string(),
            parent,
            local_bind: local_bind.to_mat4(),
            remap,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    pub name_hash: u32,
    pub index: usize,
    pub parent: Option<usize>,
    pub local_bind: BoneTransform,
    pub global_bind: glm::Mat4,
    pub inverse_global_bind: glm::Mat4,
    pub remap: Option<usize>,
}

/// Bone table in hierarchy order
///
/// Every bone's parent must appear at a smaller index than the bone itself.
/// Pose evaluation walks the bones once in order and relies on parents being
/// finished before their children. This is checked with `debug_assert!` only.
/// A release build given a badly ordered table will quietly produce poses
/// built on stale parent data.
#[derive(Clone, Debug)]
pub struct Skeleton {
    name: String,
    bones: Vec<Bone>,
    by_hash: HashMap<u32, usize>,
    deform_bone_count: usize,
}

impl Skeleton {
    /// Builds the skeleton and its lookup table and caches the bind pose
    /// world transforms and their inverses
    #[must_use]
    pub fn new(name: &str, descs: Vec<BoneDesc>) -> Self {
        let count = descs.len();
        let mut bones: Vec<Bone> = Vec::with_capacity(count);
        let mut by_hash = HashMap::with_capacity(count);

        for (index, desc) in descs.into_iter().enumerate() {
            let parent = desc.parent.filter(|p| {
                if *p >= count {
                    warn!(
                        "bone {} parent {} out of range, treating as root",
                        desc.name, p
                    );
                    return false;
                }
                true
            });
            debug_assert!(
                parent.map_or(true, |p| p < index),
                "bone {index} ({}) has parent {parent:?} at a later index",
                desc.name,
            );

            let global_bind = match parent {
                Some(p) if p < index => bones[p].global_bind * desc.local_bind,
                _ => desc.local_bind,
            };
            let inverse_global_bind =
                global_bind.try_inverse().unwrap_or_else(|| {
                    warn!("bone {} bind matrix is not invertible", desc.name);
                    glm::Mat4::identity()
                });

            let hash = name_hash(&desc.name);
            // If two bones share a hash the first one wins, the same as a
            // front to back search would
            by_hash.entry(hash).or_insert(index);

            bones.push(Bone {
                name_hash: hash,
                index,
                parent,
                local_bind: BoneTransform::from_mat4(&desc.local_bind),
                global_bind,
                inverse_global_bind,
                remap: desc.remap,
                name: desc.name,
            });
        }

        let deform_bone_count = bones
            .iter()
            .filter_map(|b| b.remap)
            .max()
            .map_or(0, |m| m + 1);
        debug!(
            "skeleton {} bones={} deform bones={}",
            name,
            bones.len(),
            deform_bone_count
        );

        Self {
            name: name.to_string(),
            bones,
            by_hash,
            deform_bone_count,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub const fn deform_bone_count(&self) -> usize {
        self.deform_bone_count
    }

    #[must_use]
    pub fn index_of_hash(&self, hash: u32) -> Option<usize> {
        self.by_hash.get(&hash).copied()
    }

    #[must_use]
    pub fn bone_by_hash(&self, hash: u32) -> Option<&Bone> {
        self.index_of_hash(hash).map(|i| &self.bones[i])
    }

    #[must_use]
    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bone_by_hash(name_hash(name))
    }

    /// True if every parent comes before its children. Loaders can use this
    /// to reject data before it reaches the evaluator.
    #[must_use]
    pub fn is_hierarchy_ordered(&self) -> bool {
        self.bones
            .iter()
            .all(|b| b.parent.map_or(true, |p| p < b.index))
    }
}
