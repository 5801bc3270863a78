//! Pose evaluation through the public `Workspace` API
//!
//! Skeletons here are small chains offset along an axis so the expected world
//! positions can be worked out by hand. Bone origins are compared rather than
//! whole matrices where that makes the intent clearer.

use log::info;
use nalgebra_glm as glm;
use skelpose::{
    motion::MotionFile, name_hash, AnimatedMesh, AnimatorId, AnimatorOptions,
    BoneClip, BoneDesc, BoneTransform, MotionBone, MotionClip, Skeleton,
    Track, Workspace,
};
use std::{path::Path, sync::Arc, sync::Once};

const EPSILON: f32 = 0.0005_f32; // Small value for float comparisons
static INIT: Once = Once::new();

/// Initializes logging in a "once per test run" manner. Call at the start of
/// each test that needs logging.
fn init_tests() {
    INIT.call_once(|| {
        env_logger::init();
    });
}

fn offset(x: f32, y: f32, z: f32) -> BoneTransform {
    BoneTransform::new(
        glm::vec3(x, y, z),
        glm::Quat::identity(),
        glm::vec3(1.0, 1.0, 1.0),
    )
}

/// Skeleton where every bone deforms, remapped to its own index
fn skeleton(
    name: &str,
    bones: &[(&str, Option<usize>, BoneTransform)],
) -> Arc<Skeleton> {
    let descs = bones
        .iter()
        .enumerate()
        .map(|(i, (n, p, t))| BoneDesc::new(n, *p, t, Some(i)))
        .collect();
    Arc::new(Skeleton::new(name, descs))
}

fn slide(bone: &str, frames: Vec<f32>, to: &[glm::Vec3]) -> BoneClip {
    BoneClip {
        bone_hash: name_hash(bone),
        translation: Some(Track::new(frames, to.to_vec())),
        ..Default::default()
    }
}

fn origin(m: &glm::Mat4) -> glm::Vec3 {
    (m * glm::vec4(0.0, 0.0, 0.0, 1.0)).xyz()
}

fn check_vec(a: &glm::Vec3, b: &glm::Vec3) {
    let c = glm::equal_eps(a, b, EPSILON);
    assert!(c.x && c.y && c.z, "{a:?} != {b:?}");
}

fn check_mat(a: &glm::Mat4, b: &glm::Mat4) {
    let c = glm::equal_columns_eps(a, b, EPSILON);
    assert!(c.x && c.y && c.z && c.w, "{a:?} != {b:?}");
}

fn world(ws: &Workspace, id: AnimatorId, bone: &str) -> glm::Mat4 {
    let mesh = ws.animator(id).and_then(|a| a.mesh()).unwrap();
    *ws.mesh(mesh).unwrap().world_matrix_by_name(bone).unwrap()
}

/// Workspace with one animator driving one mesh
fn single(
    options: AnimatorOptions,
    skeleton: Arc<Skeleton>,
    clips: Vec<MotionClip>,
) -> (Workspace, AnimatorId) {
    let mut ws = Workspace::new(options);
    let mesh = ws.add_mesh(AnimatedMesh::new(skeleton));
    let id = ws.create_animator();
    assert!(ws.bind_mesh(id, mesh));
    assert_eq!(ws.load_animation_list(id, &clips), clips.len());
    (ws, id)
}

fn arm() -> Arc<Skeleton> {
    skeleton(
        "arm",
        &[
            ("shoulder", None, BoneTransform::default()),
            ("elbow", Some(0), offset(1.0, 0.0, 0.0)),
            ("hand", Some(1), offset(1.0, 0.0, 0.0)),
        ],
    )
}

#[test]
fn clip_timing() {
    init_tests();
    let clips = vec![
        MotionClip::new("walk", 30.0, 60.0, Vec::new(), Vec::new()),
        MotionClip::new("zero", 0.0, 120.0, Vec::new(), Vec::new()),
    ];
    let (mut ws, id) = single(AnimatorOptions::default(), arm(), clips);

    assert!(ws.set_active_motion_by_name(id, "walk"));
    let a = ws.animator(id).unwrap();
    assert!((a.total_time() - 2.0).abs() < EPSILON);
    assert!((a.total_frames() - 60.0).abs() < EPSILON);

    // A zero frame rate plays at the default rate
    assert!(ws.set_active_motion(id, 1));
    ws.update(id, 0.5);
    let a = ws.animator(id).unwrap();
    info!("zero rate clip frame={}", a.current_frame());
    assert!(!a.current_frame().is_nan());
    assert!((a.current_frame() - 30.0).abs() < EPSILON);
    assert!((a.total_time() - 2.0).abs() < EPSILON);
}

#[test]
fn seeking() {
    init_tests();
    let clips = vec![MotionClip::new("walk", 30.0, 60.0, vec![], vec![])];
    let (mut ws, id) = single(AnimatorOptions::default(), arm(), clips);
    assert!(ws.set_active_motion(id, 0));
    let a = ws.animator_mut(id).unwrap();

    a.seek(-5.0);
    assert!(a.current_time().abs() < EPSILON);
    a.seek(10.0);
    assert!((a.current_time() - 2.0).abs() < EPSILON);

    // Percentage is divided by the total time
    a.seek_percentage(1.0);
    assert!((a.current_time() - 0.5).abs() < EPSILON);
    a.seek_percentage(3.0);
    assert!((a.current_time() - 1.5).abs() < EPSILON);
}

#[test]
fn invalid_motion_selection() {
    init_tests();
    let clips = vec![MotionClip::new("walk", 30.0, 60.0, vec![], vec![])];
    let (mut ws, id) = single(AnimatorOptions::default(), arm(), clips);
    assert!(!ws.set_active_motion(id, 1));
    assert!(!ws.set_active_motion_by_name(id, "run"));
    assert!(!ws.animator(id).unwrap().is_active());
    assert!(ws.animator(id).unwrap().active_motion_index().is_none());
}

#[test]
fn hierarchy_composition() {
    init_tests();
    let quarter = glm::quat_angle_axis(
        std::f32::consts::FRAC_PI_2,
        &glm::vec3(0.0, 0.0, 1.0),
    );
    let bend = BoneClip {
        bone_hash: name_hash("elbow"),
        rotation: Some(Track::new(
            vec![0.0, 30.0],
            vec![glm::Quat::identity(), quarter],
        )),
        ..Default::default()
    };
    let clips = vec![MotionClip::new("bend", 30.0, 60.0, vec![bend], vec![])];
    let (mut ws, id) = single(AnimatorOptions::default(), arm(), clips);
    assert!(ws.set_active_motion(id, 0));
    ws.update(id, 1.0);

    check_vec(&origin(&world(&ws, id, "elbow")), &glm::vec3(1.0, 0.0, 0.0));
    check_vec(&origin(&world(&ws, id, "hand")), &glm::vec3(1.0, 1.0, 0.0));

    // Every child is its parent's world times its own local
    let elbow = world(&ws, id, "elbow");
    let hand = world(&ws, id, "hand");
    check_mat(&hand, &(elbow * offset(1.0, 0.0, 0.0).to_mat4()));

    // Skinning matrices carry the bind pose back out
    let mesh = ws.mesh(ws.animator(id).unwrap().mesh().unwrap()).unwrap();
    let bone = mesh.skeleton().bone_by_name("hand").unwrap();
    let skin = mesh.deform_bone_matrices()[bone.remap.unwrap()];
    check_mat(&skin, &(hand * bone.inverse_global_bind));
}

#[test]
fn stop_reverts_to_bind() {
    init_tests();
    let clips = vec![MotionClip::new(
        "reach",
        30.0,
        60.0,
        vec![slide(
            "hand",
            vec![0.0, 60.0],
            &[glm::vec3(1.0, 0.0, 0.0), glm::vec3(1.0, 4.0, 0.0)],
        )],
        vec![],
    )];
    let (mut ws, id) = single(AnimatorOptions::default(), arm(), clips);
    assert!(ws.set_active_motion(id, 0));
    ws.animator_mut(id).unwrap().play();
    ws.update_all(1.0);
    check_vec(&origin(&world(&ws, id, "hand")), &glm::vec3(2.0, 2.0, 0.0));

    ws.stop(id);
    let a = ws.animator(id).unwrap();
    assert!(!a.is_playing());
    assert!(!a.is_active());
    assert!(a.current_time().abs() < EPSILON);
    let mesh = ws.mesh(a.mesh().unwrap()).unwrap();
    for (bone, m) in mesh.skeleton().bones().iter().zip(mesh.bone_matrices()) {
        check_mat(m, &bone.global_bind);
    }
    for m in mesh.deform_bone_matrices() {
        check_mat(m, &glm::Mat4::identity());
    }
}

#[test]
fn root_motion_suppression() {
    init_tests();
    let body = skeleton(
        "body",
        &[
            ("Root", None, offset(0.0, 0.0, 1.0)),
            ("pelvis", Some(0), offset(0.0, 1.0, 0.0)),
        ],
    );
    let walk = MotionClip::new(
        "walk",
        30.0,
        30.0,
        vec![slide(
            "Root",
            vec![0.0, 30.0],
            &[glm::vec3(0.0, 0.0, 0.0), glm::vec3(6.0, 0.0, 0.0)],
        )],
        vec![],
    );
    let options = AnimatorOptions {
        ignore_root_motion: true,
        ..Default::default()
    };
    let (mut ws, id) = single(options, body, vec![walk.clone()]);
    assert!(ws.set_active_motion(id, 0));
    ws.update(id, 0.5);
    check_mat(&world(&ws, id, "Root"), &glm::Mat4::identity());
    check_vec(&origin(&world(&ws, id, "pelvis")), &glm::vec3(0.0, 1.0, 0.0));

    // The pinned root leaves its skinning matrix as it was
    let mesh = ws.mesh(ws.animator(id).unwrap().mesh().unwrap()).unwrap();
    check_mat(&mesh.deform_bone_matrices()[0], &glm::Mat4::identity());

    // Only an unparented bone counts as the root
    let nested = skeleton(
        "nested",
        &[
            ("hips", None, BoneTransform::default()),
            ("Root", Some(0), BoneTransform::default()),
        ],
    );
    let options = AnimatorOptions {
        ignore_root_motion: true,
        ..Default::default()
    };
    let (mut ws, id) = single(options, nested, vec![walk]);
    assert!(ws.set_active_motion(id, 0));
    ws.update(id, 0.5);
    check_vec(&origin(&world(&ws, id, "Root")), &glm::vec3(3.0, 0.0, 0.0));
}

#[test]
fn reference_skeleton_suppression() {
    init_tests();
    let body = skeleton(
        "body",
        &[
            ("A", None, BoneTransform::default()),
            ("B", Some(0), offset(0.0, 1.0, 0.0)),
            ("C", Some(0), offset(0.0, 1.0, 0.0)),
        ],
    );
    let reference = skeleton(
        "reference",
        &[
            ("A", None, offset(0.0, 0.0, 2.0)),
            ("C", Some(0), offset(0.0, 0.0, 9.0)),
        ],
    );
    let tracks = vec![
        slide("A", vec![0.0], &[glm::vec3(3.0, 0.0, 0.0)]),
        slide("B", vec![0.0], &[glm::vec3(7.0, 0.0, 0.0)]),
    ];
    let held = MotionBone {
        bone_hash: name_hash("B"),
        translation: glm::vec3(0.0, 4.0, 0.0),
        rotation: glm::Quat::identity(),
    };
    let clips = vec![
        MotionClip::new("plain", 30.0, 30.0, tracks.clone(), vec![]),
        MotionClip::new("held", 30.0, 30.0, tracks, vec![held]),
    ];
    let (mut ws, id) = single(AnimatorOptions::default(), body, clips);

    // Without a reference skeleton every track applies
    assert!(ws.set_active_motion(id, 0));
    check_vec(&origin(&world(&ws, id, "B")), &glm::vec3(10.0, 0.0, 0.0));

    assert!(ws.set_reference_skeleton(id, Some(reference)));
    ws.restart(id);
    check_vec(&origin(&world(&ws, id, "A")), &glm::vec3(3.0, 0.0, 0.0));
    // B is not in the reference so its track is ignored
    check_vec(&origin(&world(&ws, id, "B")), &glm::vec3(3.0, 1.0, 0.0));
    // C takes its bind from the reference
    check_vec(&origin(&world(&ws, id, "C")), &glm::vec3(3.0, 0.0, 9.0));

    assert!(ws.set_active_motion_by_name(id, "held"));
    check_vec(&origin(&world(&ws, id, "B")), &glm::vec3(3.0, 4.0, 0.0));
}

#[test]
fn attachment_follows_owner() {
    init_tests();
    let sword_rig = skeleton(
        "sword",
        &[
            ("Grip", None, BoneTransform::default()),
            ("Tip", Some(0), offset(0.0, 0.0, 1.0)),
        ],
    );
    let body_rig = skeleton(
        "body",
        &[
            ("Root", None, BoneTransform::default()),
            ("Hand", Some(0), offset(0.0, 1.0, 0.0)),
        ],
    );
    let reference = skeleton(
        "held item",
        &[
            ("Hand", None, BoneTransform::default()),
            ("Grip", Some(0), offset(0.5, 0.0, 0.0)),
        ],
    );
    let run = MotionClip::new(
        "run",
        30.0,
        30.0,
        vec![slide(
            "Root",
            vec![0.0, 30.0],
            &[glm::vec3(0.0, 0.0, 0.0), glm::vec3(3.0, 0.0, 0.0)],
        )],
        vec![],
    );
    let still = MotionClip::new("still", 30.0, 30.0, vec![], vec![]);

    let mut ws = Workspace::default();
    // The sword is created first so update order has to come from ownership
    let sword = ws.create_animator();
    let body = ws.create_animator();
    let sword_mesh = ws.add_mesh(AnimatedMesh::new(sword_rig));
    let body_mesh = ws.add_mesh(AnimatedMesh::new(body_rig));
    assert!(ws.bind_mesh(sword, sword_mesh));
    assert!(ws.bind_mesh(body, body_mesh));
    assert!(ws.set_owner(sword, Some(body)));
    assert!(ws.set_reference_skeleton(sword, Some(reference)));
    assert_eq!(ws.load_animation_list(body, &[run][..]), 1);
    assert_eq!(ws.load_animation_list(sword, &[still][..]), 1);
    assert!(ws.set_active_motion(body, 0));
    assert!(ws.set_active_motion(sword, 0));
    ws.animator_mut(body).unwrap().play();
    ws.animator_mut(sword).unwrap().play();

    ws.update_all(0.5);
    let hand = world(&ws, body, "Hand");
    check_vec(&origin(&hand), &glm::vec3(1.5, 1.0, 0.0));
    let grip = world(&ws, sword, "Grip");
    check_mat(&grip, &(hand * offset(0.5, 0.0, 0.0).to_mat4()));
    check_vec(&origin(&world(&ws, sword, "Tip")), &glm::vec3(2.0, 1.0, 1.0));

    // Detached, the grip is placed by its local transform alone
    assert!(ws.set_owner(sword, None));
    ws.update(sword, 0.0);
    check_vec(&origin(&world(&ws, sword, "Grip")), &glm::vec3(0.5, 0.0, 0.0));
}

/// Sword held by a body through `reference`, both evaluated at frame 0
fn held_sword(
    body_rig: Arc<Skeleton>,
    reference: Arc<Skeleton>,
) -> (Workspace, AnimatorId) {
    let sword_rig = skeleton(
        "sword",
        &[
            ("Grip", None, BoneTransform::default()),
            ("Tip", Some(0), offset(0.0, 0.0, 1.0)),
        ],
    );
    let still = MotionClip::new("still", 30.0, 30.0, vec![], vec![]);

    let mut ws = Workspace::default();
    let body = ws.create_animator();
    let sword = ws.create_animator();
    let body_mesh = ws.add_mesh(AnimatedMesh::new(body_rig));
    let sword_mesh = ws.add_mesh(AnimatedMesh::new(sword_rig));
    assert!(ws.bind_mesh(body, body_mesh));
    assert!(ws.bind_mesh(sword, sword_mesh));
    assert!(ws.set_owner(sword, Some(body)));
    assert!(ws.set_reference_skeleton(sword, Some(reference)));
    assert_eq!(ws.load_animation_list(body, &[still.clone()][..]), 1);
    assert_eq!(ws.load_animation_list(sword, &[still][..]), 1);
    assert!(ws.set_active_motion(body, 0));
    assert!(ws.set_active_motion(sword, 0));
    (ws, sword)
}

#[test]
fn attachment_falls_back_to_local() {
    init_tests();
    let body_rig = skeleton(
        "body",
        &[
            ("Root", None, offset(4.0, 0.0, 0.0)),
            ("Paw", Some(0), offset(0.0, 1.0, 0.0)),
        ],
    );
    let local = offset(0.5, 0.0, 0.0).to_mat4();

    // The owner has no bone named after the grip's reference parent
    let by_hand = skeleton(
        "held item",
        &[
            ("Hand", None, BoneTransform::default()),
            ("Grip", Some(0), offset(0.5, 0.0, 0.0)),
        ],
    );
    let (ws, sword) = held_sword(Arc::clone(&body_rig), by_hand);
    check_mat(&world(&ws, sword, "Grip"), &local);
    check_vec(&origin(&world(&ws, sword, "Tip")), &glm::vec3(0.5, 0.0, 1.0));

    // The grip has no parent in the reference
    let loose = skeleton("loose", &[("Grip", None, offset(0.5, 0.0, 0.0))]);
    let (ws, sword) = held_sword(body_rig, loose);
    check_mat(&world(&ws, sword, "Grip"), &local);
}

#[test]
fn restart_is_idempotent() {
    init_tests();
    let clips = vec![MotionClip::new(
        "reach",
        30.0,
        60.0,
        vec![slide(
            "hand",
            vec![0.0, 20.0, 60.0],
            &[
                glm::vec3(1.0, 0.0, 0.0),
                glm::vec3(1.0, 2.0, 0.0),
                glm::vec3(1.0, 4.0, 0.0),
            ],
        )],
        vec![],
    )];
    let (mut ws, id) = single(AnimatorOptions::default(), arm(), clips);
    assert!(ws.set_active_motion(id, 0));
    ws.update(id, 0.7);

    let mesh_id = ws.animator(id).unwrap().mesh().unwrap();
    ws.restart(id);
    let first = ws.mesh(mesh_id).unwrap().bone_matrices().to_vec();
    ws.restart(id);
    assert_eq!(ws.mesh(mesh_id).unwrap().bone_matrices(), &first[..]);
    ws.update(id, 0.0);
    assert_eq!(ws.mesh(mesh_id).unwrap().bone_matrices(), &first[..]);
    assert!(ws.animator(id).unwrap().current_time().abs() < EPSILON);
}

#[test]
fn update_all_skips_paused() {
    init_tests();
    let clips = vec![MotionClip::new("walk", 30.0, 60.0, vec![], vec![])];
    let mut ws = Workspace::default();
    let mesh = ws.add_mesh(AnimatedMesh::new(arm()));
    let other_mesh = ws.add_mesh(AnimatedMesh::new(arm()));
    let playing = ws.create_animator();
    let paused = ws.create_animator();
    for (id, m) in [(playing, mesh), (paused, other_mesh)] {
        assert!(ws.bind_mesh(id, m));
        assert_eq!(ws.load_animation_list(id, &clips), 1);
        assert!(ws.set_active_motion(id, 0));
    }
    ws.animator_mut(playing).unwrap().play();
    ws.update_all(0.5);
    ws.update_all(0.25);
    let t = |id| ws.animator(id).unwrap().current_time();
    assert!((t(playing) - 0.75).abs() < EPSILON);
    assert!(t(paused).abs() < EPSILON);
}

#[test]
fn autoplay_option() {
    init_tests();
    let options = AnimatorOptions::from_yaml("autoplay: true").unwrap();
    let clips = vec![MotionClip::new("walk", 30.0, 60.0, vec![], vec![])];
    let (mut ws, id) = single(options, arm(), clips);
    assert!(!ws.animator(id).unwrap().is_playing());
    assert!(ws.set_active_motion(id, 0));
    assert!(ws.animator(id).unwrap().is_playing());
}

#[test]
fn unsupported_container_leaves_list_empty() {
    init_tests();
    let clips = vec![MotionClip::new("walk", 30.0, 60.0, vec![], vec![])];
    let (mut ws, id) = single(AnimatorOptions::default(), arm(), clips);
    assert!(ws.set_active_motion(id, 0));

    let engine_file = MotionFile::new(Path::new("ch01_0000.motlist.85"));
    assert_eq!(ws.load_animation_list(id, &engine_file), 0);
    let a = ws.animator(id).unwrap();
    assert!(a.motion_names().is_empty());
    assert!(a.active_motion().is_none());

    // Nothing to evaluate, so time stays put
    ws.update(id, 0.5);
    assert!(ws.animator(id).unwrap().current_time().abs() < EPSILON);
    assert!(!ws.set_active_motion(id, 0));
}

#[test]
fn unload_detaches_mesh() {
    init_tests();
    let clips = vec![MotionClip::new("walk", 30.0, 60.0, vec![], vec![])];
    let (mut ws, id) = single(AnimatorOptions::default(), arm(), clips);
    assert!(ws.set_active_motion(id, 0));
    ws.unload(id);
    let a = ws.animator(id).unwrap();
    assert!(a.mesh().is_none());
    assert!(a.clips().is_empty());
    assert!(!a.is_active());
}
