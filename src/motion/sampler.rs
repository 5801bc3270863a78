use super::types::Track;
use crate::transform;
use nalgebra_glm as glm;

/// The pair of keys around a query frame and how far the query is between
/// them
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameBracket {
    pub first: usize,
    pub second: usize,
    pub weight: f32,
}

impl FrameBracket {
    const fn clamped(index: usize) -> Self {
        Self {
            first: index,
            second: 0,
            weight: 0.0,
        }
    }
}

/// Finds the keys to interpolate between for a frame
///
/// Returns `None` when there are no keys, in which case the caller keeps
/// whatever value it already had. A query before the first key gives
/// `(0, 0, 0.0)` and a query at or after the last key gives `(last, 0, 0.0)`.
/// There is no blending from the last key back to the first, so a looping
/// clip holds its final value until the time wraps.
///
/// Keys are expected to be ascending. The search is a binary search for the
/// first key strictly greater than `frame`.
#[must_use]
pub fn find_frames(frame_indexes: &[f32], frame: f32) -> Option<FrameBracket> {
    let last = frame_indexes.len().checked_sub(1)?;
    let second = frame_indexes.partition_point(|k| *k <= frame);
    if second > last {
        return Some(FrameBracket::clamped(last));
    }
    if second == 0 {
        return Some(FrameBracket::clamped(0));
    }
    let first = second - 1;
    let start = frame_indexes[first];
    let end = frame_indexes[second];
    Some(FrameBracket {
        first,
        second,
        weight: (frame - start) / (end - start),
    })
}

/// Values that can be blended between two keys
pub trait Interpolate: Copy {
    #[must_use]
    fn interpolate(&self, other: &Self, weight: f32) -> Self;
}

impl Interpolate for glm::Vec3 {
    fn interpolate(&self, other: &Self, weight: f32) -> Self {
        glm::lerp(self, other, weight)
    }
}

/// Plain component-wise lerp, see `transform::quat_lerp`
impl Interpolate for glm::Quat {
    fn interpolate(&self, other: &Self, weight: f32) -> Self {
        transform::quat_lerp(self, other, weight)
    }
}

impl<T: Interpolate> Track<T> {
    /// Samples the track at a frame. `None` if the track has no keys or if
    /// the value array is too short for the keys found.
    #[must_use]
    pub fn sample(&self, frame: f32) -> Option<T> {
        let bracket = find_frames(&self.frame_indexes, frame)?;
        let a = self.values.get(bracket.first)?;
        let b = self.values.get(bracket.second)?;
        Some(a.interpolate(b, bracket.weight))
    }
}
