use super::types::{BoneClip, MotionBone, MotionClip, Track};
use crate::{
    anim_error::AnimError,
    hash::name_hash,
    import::{gltf_file, ImportOptions},
};
use log::{debug, error, warn};
use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Anything that can supply a list of clips to an animator
pub trait MotionContainer {
    /// # Errors
    /// May return `AnimError` if the clips can't be produced
    fn load_clips(&self) -> Result<Vec<MotionClip>, AnimError>;
}

/// Clips that were already parsed elsewhere, such as by an engine motion
/// parser
impl MotionContainer for [MotionClip] {
    fn load_clips(&self) -> Result<Vec<MotionClip>, AnimError> {
        Ok(self.to_vec())
    }
}

impl MotionContainer for Vec<MotionClip> {
    fn load_clips(&self) -> Result<Vec<MotionClip>, AnimError> {
        Ok(self.clone())
    }
}

/// Container formats recognised by file extension
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContainerFormat {
    Yaml,
    Gltf,
    /// Engine motion list. Needs the engine parser, which is not part of
    /// this crate.
    MotionList,
    /// Engine motion tree, see `MotionList`
    MotionTree,
    /// Engine motion pack, see `MotionList`
    MotionPack,
}

impl ContainerFormat {
    /// Works out the format from the extension. Engine files are often
    /// versioned like `walk.motlist.85` so a numeric final extension is
    /// skipped.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let mut ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if ext.chars().all(|c| c.is_ascii_digit()) {
            ext = Path::new(path.file_stem()?)
                .extension()?
                .to_str()?
                .to_ascii_lowercase();
        }
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "gltf" | "glb" => Some(Self::Gltf),
            "motlist" => Some(Self::MotionList),
            "mottree" => Some(Self::MotionTree),
            "motpack" => Some(Self::MotionPack),
            _ => None,
        }
    }
}

/// A motion container on disk
#[derive(Clone, Debug)]
pub struct MotionFile {
    pub path: PathBuf,
    pub import_options: ImportOptions,
}

impl MotionFile {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            import_options: ImportOptions::default(),
        }
    }
}

impl MotionContainer for MotionFile {
    fn load_clips(&self) -> Result<Vec<MotionClip>, AnimError> {
        let Some(format) = ContainerFormat::from_path(&self.path) else {
            error!("{:?} is not a recognised motion container", self.path);
            return Err(AnimError::InvalidFile);
        };
        debug!("loading {:?} as {:?}", self.path, format);
        match format {
            ContainerFormat::Yaml => {
                let text = fs::read_to_string(&self.path)?;
                clips_from_yaml(&text)
            }
            ContainerFormat::Gltf => {
                gltf_file::load_clips(&self.path, &self.import_options)
            }
            ContainerFormat::MotionList
            | ContainerFormat::MotionTree
            | ContainerFormat::MotionPack => {
                error!(
                    "{:?} needs an engine motion parser, supply the clips \
                     directly instead",
                    self.path
                );
                Err(AnimError::UnsupportedFormat)
            }
        }
    }
}

/// Text form of a motion list. Bones are named rather than hashed.
#[derive(Serialize, Deserialize, Debug, Default)]
struct YamlMotionList {
    clips: Vec<YamlClip>,
}

#[derive(Serialize, Deserialize, Debug)]
struct YamlClip {
    name: String,
    frame_rate: f32,
    frame_count: f32,
    #[serde(default)]
    bones: Vec<YamlBoneClip>,
    #[serde(default)]
    static_bones: Vec<YamlMotionBone>,
}

#[derive(Serialize, Deserialize, Debug)]
struct YamlBoneClip {
    bone: String,
    #[serde(default)]
    translation: Option<Track<glm::Vec3>>,
    #[serde(default)]
    rotation: Option<Track<glm::Quat>>,
    #[serde(default)]
    scale: Option<Track<glm::Vec3>>,
}

#[derive(Serialize, Deserialize, Debug)]
struct YamlMotionBone {
    bone: String,
    translation: glm::Vec3,
    rotation: glm::Quat,
}

fn check_track<T>(clip: &str, bone: &str, track: Option<&Track<T>>) {
    if let Some(t) = track {
        if !t.is_well_formed() {
            warn!("clip {clip} bone {bone} has a malformed track");
        }
    }
}

impl From<YamlClip> for MotionClip {
    fn from(y: YamlClip) -> Self {
        let bone_clips = y
            .bones
            .into_iter()
            .map(|b| {
                check_track(&y.name, &b.bone, b.translation.as_ref());
                check_track(&y.name, &b.bone, b.rotation.as_ref());
                check_track(&y.name, &b.bone, b.scale.as_ref());
                BoneClip {
                    bone_hash: name_hash(&b.bone),
                    translation: b.translation,
                    rotation: b.rotation,
                    scale: b.scale,
                }
            })
            .collect();
        let motion_bones = y
            .static_bones
            .into_iter()
            .map(|m| MotionBone {
                bone_hash: name_hash(&m.bone),
                translation: m.translation,
                rotation: m.rotation,
            })
            .collect();
        Self::new(
            &y.name,
            y.frame_rate,
            y.frame_count,
            bone_clips,
            motion_bones,
        )
    }
}

/// Parses a YAML motion list
///
/// ```yaml
/// clips:
///   - name: wave
///     frame_rate: 30
///     frame_count: 60
///     bones:
///       - bone: Hand
///         rotation:
///           frame_indexes: [0, 60]
///           values: [[0, 0, 0, 1], [0, 0, 1, 0]]
///     static_bones:
///       - bone: Spine
///         translation: [0, 1, 0]
///         rotation: [0, 0, 0, 1]
/// ```
/// Quaternions are written `[x, y, z, w]`.
///
/// # Errors
/// May return `AnimError`
pub fn clips_from_yaml(text: &str) -> Result<Vec<MotionClip>, AnimError> {
    let list: YamlMotionList = serde_yaml::from_str(text)?;
    Ok(list.clips.into_iter().map(Into::into).collect())
}
