use crate::anim_error::AnimError;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Settings applied to every animator a `Workspace` creates
///
/// ```
/// let options = skelpose::AnimatorOptions::from_yaml(
///     "ignore_root_motion: true",
/// ).unwrap();
/// assert!(options.ignore_root_motion);
/// assert!(!options.autoplay);
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AnimatorOptions {
    /// Pin an unparented bone named "root" (any case) at the origin so the
    /// character animates in place
    pub ignore_root_motion: bool,
    /// Start playing as soon as a motion is selected
    pub autoplay: bool,
}

impl AnimatorOptions {
    /// # Errors
    /// May return `AnimError`
    pub fn from_yaml(text: &str) -> Result<Self, AnimError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// # Errors
    /// May return `AnimError`
    pub fn load(path: &Path) -> Result<Self, AnimError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    #[must_use]
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }
}
