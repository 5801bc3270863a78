use crate::{
    animator::{Animator, OwnerPose, PoseContext},
    mesh::AnimatedMesh,
    motion::MotionContainer,
    options::AnimatorOptions,
    skeleton::Skeleton,
};
use ahash::{HashSet, HashSetExt};
use log::{debug, trace, warn};
use std::sync::Arc;

/// Handle to a mesh held by a `Workspace`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(usize);

/// Handle to an animator held by a `Workspace`
///
/// Animators refer to their owner through this handle rather than a
/// reference, so an owner and the things attached to it never own each
/// other.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatorId(usize);

/// Holds the meshes and animators of a scene and wires them together
///
/// The workspace owns every mesh buffer. During an update it lends the
/// animator's mesh out mutably and its owner's mesh out immutably, which is
/// only possible because they are different meshes. An animator whose
/// owner drives the same mesh is evaluated as if it had no owner.
#[derive(Debug, Default)]
pub struct Workspace {
    options: AnimatorOptions,
    meshes: Vec<AnimatedMesh>,
    animators: Vec<Animator>,
}

/// Mutable access to one mesh and shared access to another
fn split_meshes(
    meshes: &mut [AnimatedMesh],
    target: usize,
    other: Option<usize>,
) -> Option<(&mut AnimatedMesh, Option<&AnimatedMesh>)> {
    if target >= meshes.len() {
        return None;
    }
    match other {
        Some(o) if o < target => {
            let (low, high) = meshes.split_at_mut(target);
            Some((high.first_mut()?, low.get(o)))
        }
        Some(o) if o > target && o < meshes.len() => {
            let (low, high) = meshes.split_at_mut(o);
            Some((low.get_mut(target)?, high.first()))
        }
        _ => Some((meshes.get_mut(target)?, None)),
    }
}

impl Workspace {
    #[must_use]
    pub const fn new(options: AnimatorOptions) -> Self {
        Self {
            options,
            meshes: Vec::new(),
            animators: Vec::new(),
        }
    }

    #[must_use]
    pub const fn options(&self) -> &AnimatorOptions {
        &self.options
    }

    pub fn add_mesh(&mut self, mesh: AnimatedMesh) -> MeshId {
        debug!("adding mesh with skeleton {}", mesh.skeleton().name());
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    #[must_use]
    pub fn mesh(&self, id: MeshId) -> Option<&AnimatedMesh> {
        self.meshes.get(id.0)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut AnimatedMesh> {
        self.meshes.get_mut(id.0)
    }

    /// Creates an animator with the workspace options
    pub fn create_animator(&mut self) -> AnimatorId {
        self.animators.push(Animator::new(&self.options));
        AnimatorId(self.animators.len() - 1)
    }

    #[must_use]
    pub fn animator(&self, id: AnimatorId) -> Option<&Animator> {
        self.animators.get(id.0)
    }

    pub fn animator_mut(&mut self, id: AnimatorId) -> Option<&mut Animator> {
        self.animators.get_mut(id.0)
    }

    /// Points an animator at the mesh it drives. Returns false if either
    /// handle is unknown.
    pub fn bind_mesh(&mut self, id: AnimatorId, mesh: MeshId) -> bool {
        if mesh.0 >= self.meshes.len() {
            warn!("{:?} does not exist", mesh);
            return false;
        }
        let Some(a) = self.animators.get_mut(id.0) else {
            return false;
        };
        a.set_mesh(Some(mesh));
        true
    }

    /// Attaches an animator to another so its root bones follow the owner's
    /// bones. `None` detaches it. An animator can't own itself.
    pub fn set_owner(
        &mut self,
        id: AnimatorId,
        owner: Option<AnimatorId>,
    ) -> bool {
        if let Some(o) = owner {
            if o == id || o.0 >= self.animators.len() {
                warn!("{:?} can't be the owner of {:?}", o, id);
                return false;
            }
        }
        let Some(a) = self.animators.get_mut(id.0) else {
            return false;
        };
        a.set_owner(owner);
        true
    }

    pub fn set_reference_skeleton(
        &mut self,
        id: AnimatorId,
        skeleton: Option<Arc<Skeleton>>,
    ) -> bool {
        let Some(a) = self.animators.get_mut(id.0) else {
            return false;
        };
        a.set_reference_skeleton(skeleton);
        true
    }

    /// Reference skeleton in effect for an animator: its own, or else the
    /// first one found walking up its owners. The walk stops if it comes
    /// back to an animator it has already visited.
    #[must_use]
    pub fn active_skeleton(&self, id: AnimatorId) -> Option<&Arc<Skeleton>> {
        let mut visited = HashSet::new();
        let mut current = id;
        loop {
            let animator = self.animators.get(current.0)?;
            if let Some(skeleton) = animator.reference_skeleton() {
                return Some(skeleton);
            }
            visited.insert(current);
            current = animator.owner()?;
            if visited.contains(&current) {
                return None;
            }
        }
    }

    /// Number of owners above an animator
    fn owner_depth(&self, id: AnimatorId) -> usize {
        let mut visited = HashSet::new();
        let mut current = id;
        while let Some(owner) =
            self.animators.get(current.0).and_then(Animator::owner)
        {
            if !visited.insert(current) || visited.contains(&owner) {
                break;
            }
            current = owner;
        }
        visited.len()
    }

    /// Runs `f` with the animator, its mesh and the context it evaluates
    /// in. `None` if the animator is unknown or has no mesh.
    fn with_pose<R>(
        &mut self,
        id: AnimatorId,
        f: impl FnOnce(&mut Animator, &mut AnimatedMesh, &PoseContext) -> R,
    ) -> Option<R> {
        let reference = self.active_skeleton(id).cloned();
        let animator = self.animators.get(id.0)?;
        let mesh = animator.mesh()?;
        let owner_mesh = animator
            .owner()
            .and_then(|o| self.animators.get(o.0))
            .and_then(Animator::mesh)
            .filter(|m| {
                if *m == mesh {
                    warn!("{:?} and its owner share {:?}", id, mesh);
                    return false;
                }
                true
            });

        let (mesh, owner_mesh) =
            split_meshes(&mut self.meshes, mesh.0, owner_mesh.map(|m| m.0))?;
        let ctx = PoseContext {
            reference: reference.as_deref(),
            owner: owner_mesh.map(|m| OwnerPose {
                skeleton: m.skeleton(),
                world: m.bone_matrices(),
            }),
        };
        let animator = self.animators.get_mut(id.0)?;
        Some(f(animator, mesh, &ctx))
    }

    /// Loads clips into an animator, see `Animator::load_animation_list`.
    /// Returns the clip count, 0 for an unknown animator.
    pub fn load_animation_list<C: MotionContainer + ?Sized>(
        &mut self,
        id: AnimatorId,
        container: &C,
    ) -> usize {
        self.animators
            .get_mut(id.0)
            .map_or(0, |a| a.load_animation_list(container))
    }

    /// Selects a clip and evaluates its first frame. False for an unknown
    /// animator or clip.
    pub fn set_active_motion(&mut self, id: AnimatorId, index: usize) -> bool {
        let Some(animator) = self.animators.get_mut(id.0) else {
            return false;
        };
        if !animator.activate(index) {
            return false;
        }
        self.update(id, 0.0);
        true
    }

    pub fn set_active_motion_by_name(
        &mut self,
        id: AnimatorId,
        name: &str,
    ) -> bool {
        let Some(index) = self.animator(id).and_then(|a| a.find_motion(name))
        else {
            warn!("{:?} has no motion named {}", id, name);
            return false;
        };
        self.set_active_motion(id, index)
    }

    /// Advances one animator, see `Animator::update`. Does nothing if it
    /// has no mesh.
    pub fn update(&mut self, id: AnimatorId, delta_time: f32) {
        self.with_pose(id, |a, mesh, ctx| a.update(delta_time, mesh, ctx));
    }

    /// Stops an animator and resets its mesh to the bind pose
    pub fn stop(&mut self, id: AnimatorId) {
        if self.with_pose(id, |a, mesh, _| a.stop(mesh)).is_none() {
            if let Some(a) = self.animators.get_mut(id.0) {
                a.halt();
            }
        }
    }

    /// Rewinds an animator and evaluates its first frame. Without a mesh
    /// only the time is reset.
    pub fn restart(&mut self, id: AnimatorId) {
        if self.with_pose(id, |a, mesh, ctx| a.restart(mesh, ctx)).is_none() {
            if let Some(a) = self.animators.get_mut(id.0) {
                a.rewind();
            }
        }
    }

    pub fn unload(&mut self, id: AnimatorId) {
        if let Some(a) = self.animators.get_mut(id.0) {
            a.unload();
        }
    }

    /// Advances every playing animator. Owners are updated before the
    /// animators attached to them so attachments follow the current frame.
    pub fn update_all(&mut self, delta_time: f32) {
        let mut order: Vec<(usize, AnimatorId)> = self
            .animators
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_playing())
            .map(|(i, _)| (self.owner_depth(AnimatorId(i)), AnimatorId(i)))
            .collect();
        order.sort_unstable();
        trace!("update_all dt={} animators={}", delta_time, order.len());
        for (_, id) in order {
            self.update(id, delta_time);
        }
    }
}
