pub mod pose;

// Re-exports
pub use pose::{OwnerPose, PoseContext};

use crate::{
    mesh::AnimatedMesh,
    motion::{MotionClip, MotionContainer},
    options::AnimatorOptions,
    skeleton::Skeleton,
    workspace::{AnimatorId, MeshId},
};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Playback state for one animated mesh
///
/// An animator holds the clips it can play and where it is in the active
/// one. It never owns the mesh it drives: every call that writes a pose is
/// handed the mesh for the duration of that call. A `Workspace` keeps track
/// of which mesh and which owner animator go with which animator.
#[derive(Clone, Debug)]
pub struct Animator {
    clips: Vec<MotionClip>,
    active: Option<usize>,
    mesh: Option<MeshId>,
    owner: Option<AnimatorId>,
    reference: Option<Arc<Skeleton>>,
    current_time: f32,
    clip_framerate: f32,
    clip_duration: f32,
    is_playing: bool,
    is_active: bool,
    ignore_root_motion: bool,
    autoplay: bool,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(&AnimatorOptions::default())
    }
}

impl Animator {
    #[must_use]
    pub fn new(options: &AnimatorOptions) -> Self {
        Self {
            clips: Vec::new(),
            active: None,
            mesh: None,
            owner: None,
            reference: None,
            current_time: 0.0,
            clip_framerate: 0.0,
            clip_duration: 0.0,
            is_playing: false,
            is_active: false,
            ignore_root_motion: options.ignore_root_motion,
            autoplay: options.autoplay,
        }
    }

    /// Replaces the clip list with the clips from `container` and resets
    /// playback. A container that fails to load is logged and leaves the
    /// list empty. Returns the number of clips now available.
    pub fn load_animation_list<C: MotionContainer + ?Sized>(
        &mut self,
        container: &C,
    ) -> usize {
        let clips = container.load_clips().unwrap_or_else(|e| {
            error!("animation list failed to load: {}", e);
            Vec::new()
        });
        self.set_clips(clips);
        self.clips.len()
    }

    /// Replaces the clip list and resets playback. No clip is active
    /// afterwards.
    pub fn set_clips(&mut self, clips: Vec<MotionClip>) {
        info!("animator has {} clips", clips.len());
        self.clips = clips;
        self.active = None;
        self.clip_framerate = 0.0;
        self.clip_duration = 0.0;
        self.reset_playback();
    }

    #[must_use]
    pub fn clips(&self) -> &[MotionClip] {
        &self.clips
    }

    #[must_use]
    pub fn motion_names(&self) -> Vec<&str> {
        self.clips.iter().map(MotionClip::name).collect()
    }

    #[must_use]
    pub fn find_motion(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|c| c.name() == name)
    }

    #[must_use]
    pub const fn active_motion_index(&self) -> Option<usize> {
        self.active
    }

    #[must_use]
    pub fn active_motion(&self) -> Option<&MotionClip> {
        self.active.and_then(|i| self.clips.get(i))
    }

    #[must_use]
    pub fn active_motion_name(&self) -> Option<&str> {
        self.active_motion().map(MotionClip::name)
    }

    /// Makes clip `index` active, rewinds to time 0 and writes the first
    /// frame into `mesh`. Returns false and changes nothing if there is no
    /// such clip.
    pub fn set_active_motion(
        &mut self,
        index: usize,
        mesh: &mut AnimatedMesh,
        ctx: &PoseContext,
    ) -> bool {
        if !self.activate(index) {
            return false;
        }
        self.update(0.0, mesh, ctx);
        true
    }

    /// As `set_active_motion` but by clip name
    pub fn set_active_motion_by_name(
        &mut self,
        name: &str,
        mesh: &mut AnimatedMesh,
        ctx: &PoseContext,
    ) -> bool {
        match self.find_motion(name) {
            Some(index) => self.set_active_motion(index, mesh, ctx),
            None => {
                warn!("no motion named {}", name);
                false
            }
        }
    }

    /// Switches the active clip and starts playback if autoplay is set,
    /// without evaluating anything
    pub(crate) fn activate(&mut self, index: usize) -> bool {
        if !self.select_motion(index) {
            return false;
        }
        if self.autoplay {
            self.play();
        }
        true
    }

    fn select_motion(&mut self, index: usize) -> bool {
        let Some(clip) = self.clips.get(index) else {
            warn!(
                "motion index {} out of range, {} clips loaded",
                index,
                self.clips.len()
            );
            return false;
        };
        if clip.frame_rate() <= 0.0 || clip.frame_rate().is_nan() {
            warn!(
                "motion {} has frame rate {}, using {}",
                clip.name(),
                clip.frame_rate(),
                clip.effective_frame_rate()
            );
        }
        self.clip_framerate = clip.effective_frame_rate();
        self.clip_duration = clip.duration();
        self.current_time = 0.0;
        self.active = Some(index);
        debug!(
            "active motion {} rate={} duration={}",
            clip.name(),
            self.clip_framerate,
            self.clip_duration
        );
        true
    }

    /// Advances time by `delta_time` and writes the resulting pose into
    /// `mesh`
    ///
    /// Does nothing without an active clip. Playback state is not checked,
    /// so a paused animator still moves if this is called; callers that
    /// want pausing to stop time should only call it while `is_playing`.
    /// Time past the end of the clip wraps once, so a `delta_time` longer
    /// than the clip lands late in the next loop.
    pub fn update(
        &mut self,
        delta_time: f32,
        mesh: &mut AnimatedMesh,
        ctx: &PoseContext,
    ) {
        let Some(clip) = self.active.and_then(|i| self.clips.get(i)) else {
            return;
        };
        mesh.ensure_buffers();

        self.current_time += delta_time;
        if self.current_time > self.clip_duration {
            self.current_time -= self.clip_duration;
        }
        let frame = self.current_time * self.clip_framerate;
        pose::evaluate(clip, frame, self.ignore_root_motion, ctx, mesh);
        self.is_active = true;
    }

    pub fn play(&mut self) {
        self.is_playing = true;
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
    }

    /// Stops playback, rewinds and puts `mesh` back in its bind pose
    pub fn stop(&mut self, mesh: &mut AnimatedMesh) {
        self.halt();
        mesh.reset_to_bind_pose();
    }

    /// `stop` for an animator with no mesh to reset
    pub(crate) fn halt(&mut self) {
        self.reset_playback();
        self.is_active = false;
    }

    /// Rewinds to time 0 and evaluates that frame straight away
    pub fn restart(&mut self, mesh: &mut AnimatedMesh, ctx: &PoseContext) {
        self.rewind();
        self.update(0.0, mesh, ctx);
    }

    /// `restart` for an animator with no mesh to evaluate into
    pub(crate) fn rewind(&mut self) {
        self.current_time = 0.0;
    }

    fn reset_playback(&mut self) {
        self.is_playing = false;
        self.current_time = 0.0;
    }

    /// Jumps to `time` seconds, clamped to the clip
    pub fn seek(&mut self, time: f32) {
        self.current_time = time.min(self.clip_duration).max(0.0);
    }

    /// Seeks to `percentage / total_time` seconds
    ///
    /// Note this divides rather than multiplies, so on a 2 second clip
    /// `seek_percentage(1.0)` lands at 0.5 seconds rather than the end.
    /// Existing content depends on the behaviour so it is kept.
    pub fn seek_percentage(&mut self, percentage: f32) {
        self.seek(percentage / self.total_time());
    }

    /// Clears every clip and detaches the mesh
    pub fn unload(&mut self) {
        self.set_clips(Vec::new());
        self.mesh = None;
        self.is_active = false;
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// True once a pose has been written, until the next `stop`
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub const fn current_time(&self) -> f32 {
        self.current_time
    }

    #[must_use]
    pub fn current_frame(&self) -> f32 {
        self.current_time * self.clip_framerate
    }

    /// Duration of the active clip in seconds
    #[must_use]
    pub const fn total_time(&self) -> f32 {
        self.clip_duration
    }

    #[must_use]
    pub fn total_frames(&self) -> f32 {
        self.active_motion().map_or(0.0, MotionClip::frame_count)
    }

    /// Frame rate of the active clip after replacing an invalid rate
    #[must_use]
    pub const fn frame_rate(&self) -> f32 {
        self.clip_framerate
    }

    #[must_use]
    pub const fn ignore_root_motion(&self) -> bool {
        self.ignore_root_motion
    }

    pub fn set_ignore_root_motion(&mut self, ignore: bool) {
        self.ignore_root_motion = ignore;
    }

    #[must_use]
    pub const fn autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
    }

    /// The animator's own reference skeleton. An attached animator without
    /// one uses its owner's, see `Workspace::active_skeleton`.
    #[must_use]
    pub fn reference_skeleton(&self) -> Option<&Arc<Skeleton>> {
        self.reference.as_ref()
    }

    pub fn set_reference_skeleton(&mut self, skeleton: Option<Arc<Skeleton>>) {
        self.reference = skeleton;
    }

    #[must_use]
    pub const fn mesh(&self) -> Option<MeshId> {
        self.mesh
    }

    pub(crate) fn set_mesh(&mut self, mesh: Option<MeshId>) {
        self.mesh = mesh;
    }

    #[must_use]
    pub const fn owner(&self) -> Option<AnimatorId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<AnimatorId>) {
        self.owner = owner;
    }
}
