use ahash::{HashMap, HashMapExt};
use itertools::Itertools;
use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};

/// Frame rate used when a clip header has a zero, negative or NaN rate
pub const DEFAULT_FRAME_RATE: f32 = 60.0;

/// Keyframes for one component of one bone
///
/// `frame_indexes` are in frame units (seconds times frame rate) and must be
/// ascending. `values` runs parallel to it. Either may be empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Track<T> {
    pub frame_indexes: Vec<f32>,
    pub values: Vec<T>,
}

impl<T> Track<T> {
    #[must_use]
    pub const fn new(frame_indexes: Vec<f32>, values: Vec<T>) -> Self {
        Self {
            frame_indexes,
            values,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame_indexes.is_empty()
    }

    /// Checks the keys are ascending and each key has a value. The sampler
    /// does not check this itself.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.frame_indexes.len() == self.values.len()
            && self
                .frame_indexes
                .iter()
                .tuple_windows()
                .all(|(a, b)| a <= b)
    }
}

/// Animated tracks for one bone. Each component is independent, so a clip
/// may animate only rotation and leave translation and scale alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoneClip {
    pub bone_hash: u32,
    pub translation: Option<Track<glm::Vec3>>,
    pub rotation: Option<Track<glm::Quat>>,
    pub scale: Option<Track<glm::Vec3>>,
}

/// Fixed pose for a bone that has no keyframes but is not at its bind pose
/// either
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionBone {
    pub bone_hash: u32,
    pub translation: glm::Vec3,
    pub rotation: glm::Quat,
}

/// One animation clip with hash lookups built at construction
#[derive(Clone, Debug)]
pub struct MotionClip {
    name: String,
    frame_rate: f32,
    frame_count: f32,
    bone_clips: Vec<BoneClip>,
    motion_bones: Vec<MotionBone>,
    clip_by_hash: HashMap<u32, usize>,
    static_by_hash: HashMap<u32, usize>,
}

impl MotionClip {
    #[must_use]
    pub fn new(
        name: &str,
        frame_rate: f32,
        frame_count: f32,
        bone_clips: Vec<BoneClip>,
        motion_bones: Vec<MotionBone>,
    ) -> Self {
        // First entry for a hash wins, as with a front to back search
        let mut clip_by_hash = HashMap::with_capacity(bone_clips.len());
        for (i, c) in bone_clips.iter().enumerate() {
            clip_by_hash.entry(c.bone_hash).or_insert(i);
        }
        let mut static_by_hash = HashMap::with_capacity(motion_bones.len());
        for (i, m) in motion_bones.iter().enumerate() {
            static_by_hash.entry(m.bone_hash).or_insert(i);
        }
        Self {
            name: name.to_string(),
            frame_rate,
            frame_count,
            bone_clips,
            motion_bones,
            clip_by_hash,
            static_by_hash,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame rate as stored in the clip header, which may be invalid
    #[must_use]
    pub const fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    #[must_use]
    pub const fn frame_count(&self) -> f32 {
        self.frame_count
    }

    /// Frame rate used for evaluation. Anything not greater than zero
    /// (including NaN) becomes `DEFAULT_FRAME_RATE`.
    #[must_use]
    pub fn effective_frame_rate(&self) -> f32 {
        if self.frame_rate > 0.0 {
            self.frame_rate
        } else {
            DEFAULT_FRAME_RATE
        }
    }

    /// Length in seconds
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.frame_count / self.effective_frame_rate()
    }

    #[must_use]
    pub fn bone_clips(&self) -> &[BoneClip] {
        &self.bone_clips
    }

    #[must_use]
    pub fn motion_bones(&self) -> &[MotionBone] {
        &self.motion_bones
    }

    #[must_use]
    pub fn bone_clip(&self, bone_hash: u32) -> Option<&BoneClip> {
        self.clip_by_hash
            .get(&bone_hash)
            .map(|i| &self.bone_clips[*i])
    }

    #[must_use]
    pub fn motion_bone(&self, bone_hash: u32) -> Option<&MotionBone> {
        self.static_by_hash
            .get(&bone_hash)
            .map(|i| &self.motion_bones[*i])
    }
}
