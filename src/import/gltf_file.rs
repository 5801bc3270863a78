// Some code inspired by
// https://github.com/KhronosGroup/glTF-Tutorials/

use super::types::{ImportError, ImportOptions};
use crate::{
    anim_error::AnimError,
    hash::name_hash,
    motion::{BoneClip, MotionClip, Track},
    skeleton::{BoneDesc, Skeleton},
    transform::BoneTransform,
};
use ahash::{HashMap, HashMapExt};
use gltf::{
    animation::{util::ReadOutputs, Interpolation},
    buffer::Data,
    Document, Gltf, Node,
};
use log::{debug, error, info, warn};
use nalgebra_glm as glm;
use std::{fs, io, path::Path};

/// Comparison value for checking the file's inverse bind matrices against
/// the ones calculated from the node tree
const BIND_EPSILON: f32 = 0.005;

#[derive(Clone, Debug)]
struct NodeInfo {
    name: String,
    parent: Option<usize>,
    transform: BoneTransform,
}

type NodeTree = HashMap<usize, NodeInfo>;

/// Swizzles a quaternion from Y axis up to Z axis up
fn quat_swizzle(q: &glm::Quat) -> glm::Quat {
    glm::quat(q.i, -q.k, q.j, q.w)
}

/// Swizzles a vector from Y axis up to Z axis up
fn vec_swizzle(v: &glm::Vec3) -> glm::Vec3 {
    glm::vec3(v.x, -v.z, v.y)
}

/// Swizzles a scale from Y axis up to Z axis up. Scale has no direction so
/// the axes swap without the sign change.
fn scale_swizzle(v: &glm::Vec3) -> glm::Vec3 {
    glm::vec3(v.x, v.z, v.y)
}

fn load_impl<P>(path: P) -> Result<(Document, Vec<Data>), AnimError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let base = path.parent().unwrap_or_else(|| Path::new("./"));
    let file = fs::File::open(path).map_err(AnimError::StdIoError)?;
    let reader = io::BufReader::new(file);
    let gltf = Gltf::from_reader(reader)?;
    let buffers =
        gltf::import_buffers(&gltf.document, Some(base), gltf.blob)?;

    // Some info
    info!(
        "{:?}, base path={:?}, buffer count={}, first buffer length={}",
        path,
        base,
        buffers.len(),
        buffers.first().map_or(0, |b| b.len()),
    );

    Ok((gltf.document, buffers))
}

/// Recursive node tree traversal
fn traverse_tree(
    node: &Node,
    tree: &mut NodeTree,
    parent: Option<usize>,
    options: &ImportOptions,
) {
    // Walk children of this node
    for child in node.children() {
        traverse_tree(&child, tree, Some(node.index()), options);
    }

    // Collect node information
    let name = node
        .name()
        .map_or_else(|| format!("node.{}", node.index()), ToString::to_string);
    let (t, r, s) = node.transform().decomposed();
    let (translation, rotation, scale): (glm::Vec3, glm::Quat, glm::Vec3) =
        (t.into(), r.into(), s.into());
    let transform = if options.swizzle {
        BoneTransform::new(
            vec_swizzle(&translation),
            quat_swizzle(&rotation),
            scale_swizzle(&scale),
        )
    } else {
        BoneTransform::new(translation, rotation, scale)
    };

    tree.insert(
        node.index(),
        NodeInfo {
            name,
            parent,
            transform,
        },
    );
}

fn node_tree(document: &Document, options: &ImportOptions) -> NodeTree {
    let mut tree = NodeTree::new();
    for scene in document.scenes() {
        for node in scene.nodes() {
            traverse_tree(&node, &mut tree, None, options);
        }
    }
    debug!("node tree={:?}", tree);
    tree
}

/// Ancestors of a node, nearest first. The walk is bounded by the tree size
/// so a malformed parent loop can't hang the import.
fn ancestors(tree: &NodeTree, index: usize) -> Vec<usize> {
    let mut ret = Vec::new();
    let mut current = tree.get(&index).and_then(|n| n.parent);
    while let Some(p) = current {
        if ret.len() >= tree.len() {
            break;
        }
        ret.push(p);
        current = tree.get(&p).and_then(|n| n.parent);
    }
    ret
}

/// World transform of a node in its scene
fn global_transform(
    tree: &NodeTree,
    index: usize,
) -> Result<glm::Mat4, AnimError> {
    let info = tree.get(&index).ok_or(ImportError::NoNodeInfo(index))?;
    let mut m = info.transform.to_mat4();
    for a in ancestors(tree, index) {
        let parent = tree.get(&a).ok_or(ImportError::NoNodeInfo(a))?;
        m = parent.transform.to_mat4() * m;
    }
    Ok(m)
}

fn load_skeletons_impl(
    document: &Document,
    buffers: &[Data],
    tree: &NodeTree,
) -> Result<Vec<Skeleton>, AnimError> {
    let mut ret = Vec::new();

    for skin in document.skins() {
        let reader = skin.reader(|x| Some(&buffers[x.index()]));
        let Some(ibms) = reader.read_inverse_bind_matrices() else {
            error!("skin {} is missing inverse bind matrices", skin.index());
            return Err(ImportError::NoInverseBind.into());
        };
        let ibms: Vec<glm::Mat4> = ibms.map(Into::into).collect();
        let joints: Vec<usize> = skin.joints().map(|n| n.index()).collect();

        // Joint index within the skin is the deform index the mesh's vertex
        // data refers to
        let mut joint_of_node = HashMap::<usize, usize>::new();
        for (j, node_index) in joints.iter().enumerate() {
            if !tree.contains_key(node_index) {
                error!(
                    "skin {} has no node info for node index {}",
                    skin.index(),
                    node_index
                );
                return Err(ImportError::NoNodeInfo(*node_index).into());
            }
            joint_of_node.insert(*node_index, j);
        }

        // Nearest joint ancestor of each joint. Non-joint nodes in between
        // are folded into the local bind transform.
        let joint_parent: Vec<Option<usize>> = joints
            .iter()
            .map(|n| {
                ancestors(tree, *n)
                    .into_iter()
                    .find(|a| joint_of_node.contains_key(a))
            })
            .collect();

        // Sorting by depth puts every parent before its children
        let mut order: Vec<usize> = (0..joints.len()).collect();
        order.sort_by_key(|j| ancestors(tree, joints[*j]).len());
        let mut bone_of_joint = vec![0; joints.len()];
        for (bone, j) in order.iter().enumerate() {
            bone_of_joint[*j] = bone;
        }

        let mut descs = Vec::with_capacity(joints.len());
        for j in order {
            let node_index = joints[j];
            let global = global_transform(tree, node_index)?;
            let (parent, local_bind) = match joint_parent[j] {
                Some(parent_node) => {
                    let parent_global = global_transform(tree, parent_node)?;
                    let inv = parent_global
                        .try_inverse()
                        .unwrap_or_else(glm::Mat4::identity);
                    let parent = bone_of_joint[joint_of_node[&parent_node]];
                    (Some(parent), inv * global)
                }
                None => (None, global),
            };

            if let Some(ibm) = ibms.get(j) {
                let c = glm::equal_columns_eps(
                    &(ibm * global),
                    &glm::Mat4::identity(),
                    BIND_EPSILON,
                );
                if !(c.x && c.y && c.z && c.w) {
                    warn!(
                        "skin {} joint {} inverse bind does not match the node \
                         tree, using the node tree",
                        skin.index(),
                        j
                    );
                }
            }

            descs.push(BoneDesc {
                name: tree[&node_index].name.clone(),
                parent,
                local_bind,
                remap: Some(j),
            });
        }

        let name = skin.name().map_or_else(
            || format!("skin.{}", skin.index()),
            ToString::to_string,
        );
        ret.push(Skeleton::new(&name, descs));
    }

    if ret.is_empty() {
        warn!("no skins found");
    }
    Ok(ret)
}

/// Keys are stored as frames rather than seconds
fn frames_from_times(times: &[f32], frame_rate: f32) -> Vec<f32> {
    times.iter().map(|t| t * frame_rate).collect()
}

/// Cubic spline samplers store an in tangent, value and out tangent per key.
/// Only the values are kept, which makes them linear.
fn key_values<T>(
    values: Vec<T>,
    key_count: usize,
    interpolation: Interpolation,
) -> Vec<T> {
    if interpolation == Interpolation::CubicSpline
        && values.len() == key_count * 3
    {
        values.into_iter().skip(1).step_by(3).collect()
    } else {
        values
    }
}

fn load_clips_impl(
    document: &Document,
    buffers: &[Data],
    tree: &NodeTree,
    options: &ImportOptions,
) -> Result<Vec<MotionClip>, AnimError> {
    use gltf::accessor::Iter;

    let frame_rate = options.frame_rate;
    let mut ret = Vec::new();
    for animation in document.animations() {
        debug!("animation name={:?}", animation.name());
        let mut bone_clips = HashMap::<usize, BoneClip>::new();
        let mut frame_count = 0.0_f32;

        for channel in animation.channels() {
            let node = channel.target().node();
            let interpolation = channel.sampler().interpolation();
            if interpolation != Interpolation::Linear {
                warn!(
                    "animation {} node {} uses {:?}, treating as linear",
                    animation.index(),
                    node.index(),
                    interpolation
                );
            }
            let Some(info) = tree.get(&node.index()) else {
                return Err(ImportError::NoNodeInfo(node.index()).into());
            };

            let reader = channel.reader(|x| Some(&buffers[x.index()]));
            let times: Vec<f32> = if let Some(inputs) = reader.read_inputs() {
                match inputs {
                    Iter::Standard(times) => times.collect(),
                    Iter::Sparse(_) => {
                        error!("Unsupported sparse animation format");
                        return Err(ImportError::SparseAnimation.into());
                    }
                }
            } else {
                error!("Animation does not contain a sampler");
                return Err(ImportError::NoSampler.into());
            };
            let frames = frames_from_times(&times, frame_rate);
            if let Some(last) = frames.last() {
                frame_count = frame_count.max(*last);
            }

            let clip = bone_clips.entry(node.index()).or_insert_with(|| {
                BoneClip {
                    bone_hash: name_hash(&info.name),
                    ..Default::default()
                }
            });

            let Some(outputs) = reader.read_outputs() else {
                error!("Animation does not contain a sampler output");
                return Err(ImportError::NoSamplerOutput.into());
            };
            match outputs {
                ReadOutputs::Translations(x) => {
                    let v: Vec<glm::Vec3> = x
                        .map(|d| {
                            let v: glm::Vec3 = d.into();
                            if options.swizzle {
                                vec_swizzle(&v)
                            } else {
                                v
                            }
                        })
                        .collect();
                    let v = key_values(v, frames.len(), interpolation);
                    clip.translation = Some(Track::new(frames, v));
                }
                ReadOutputs::Rotations(x) => {
                    let q: Vec<glm::Quat> = x
                        .into_f32()
                        .map(|d| {
                            let q: glm::Quat = d.into();
                            if options.swizzle {
                                quat_swizzle(&q)
                            } else {
                                q
                            }
                        })
                        .collect();
                    let q = key_values(q, frames.len(), interpolation);
                    clip.rotation = Some(Track::new(frames, q));
                }
                ReadOutputs::Scales(x) => {
                    let v: Vec<glm::Vec3> = x
                        .map(|d| {
                            let v: glm::Vec3 = d.into();
                            if options.swizzle {
                                scale_swizzle(&v)
                            } else {
                                v
                            }
                        })
                        .collect();
                    let v = key_values(v, frames.len(), interpolation);
                    clip.scale = Some(Track::new(frames, v));
                }
                ReadOutputs::MorphTargetWeights(_) => {
                    error!("Morphing not supported");
                    return Err(ImportError::Morphing.into());
                }
            }
        }

        // Node order keeps the output stable between runs
        let mut nodes: Vec<usize> = bone_clips.keys().copied().collect();
        nodes.sort_unstable();
        let clips: Vec<BoneClip> = nodes
            .into_iter()
            .filter_map(|n| bone_clips.remove(&n))
            .collect();

        let name = animation.name().map_or_else(
            || format!("animation.{}", animation.index()),
            ToString::to_string,
        );
        ret.push(MotionClip::new(
            &name,
            frame_rate,
            frame_count,
            clips,
            Vec::new(),
        ));
    }
    Ok(ret)
}

/// Loads the skeleton of each skin in a glTF file
///
/// # Errors
/// May return `AnimError`
pub fn load_skeletons(
    path: &Path,
    options: &ImportOptions,
) -> Result<Vec<Skeleton>, AnimError> {
    let (document, buffers) = load_impl(path)?;
    let tree = node_tree(&document, options);
    load_skeletons_impl(&document, &buffers, &tree)
}

/// Loads every animation in a glTF file as a clip. Channels are matched to
/// bones by the hash of the target node's name.
///
/// # Errors
/// May return `AnimError`
pub fn load_clips(
    path: &Path,
    options: &ImportOptions,
) -> Result<Vec<MotionClip>, AnimError> {
    let (document, buffers) = load_impl(path)?;
    let tree = node_tree(&document, options);
    load_clips_impl(&document, &buffers, &tree, options)
}

/// Loads skeletons and clips from a glTF file
///
/// # Errors
/// May return `AnimError`
pub fn load(
    path: &Path,
    options: &ImportOptions,
) -> Result<(Vec<Skeleton>, Vec<MotionClip>), AnimError> {
    let (document, buffers) = load_impl(path)?;
    let tree = node_tree(&document, options);
    let skeletons = load_skeletons_impl(&document, &buffers, &tree)?;
    let clips = load_clips_impl(&document, &buffers, &tree, options)?;
    debug!("skeletons={:?}", skeletons);
    Ok((skeletons, clips))
}
