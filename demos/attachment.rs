//! Demo of attaching one animated mesh to another
//!
//! Loads the arm from a glTF file, hangs a two bone staff from its Hand and
//! steps the workspace at a fixed rate, printing where the staff ends up.
//! Run with `RUST_LOG=info` to see the loader output as well.
use log::info;
use nalgebra_glm as glm;
use skelpose::{
    import::{gltf_file, ImportOptions},
    AnimatedMesh, AnimatorOptions, BoneDesc, BoneTransform, Skeleton,
    Workspace,
};
use std::{path::Path, sync::Arc};

const FILENAME: &str = "./tests/assets/arm.gltf";
const SIM_RATE: f32 = 1.0 / 30.0;
const TICKS: usize = 45;

fn origin(m: &glm::Mat4) -> glm::Vec3 {
    (m * glm::vec4(0.0, 0.0, 0.0, 1.0)).xyz()
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let file_path = if args.len() < 2 {
        FILENAME.to_string()
    } else {
        args[1].clone()
    };

    let (skeletons, clips) =
        gltf_file::load(Path::new(&file_path), &ImportOptions::default())
            .unwrap();
    let arm = Arc::new(skeletons.into_iter().next().unwrap());

    // The staff's own rig has no idea where it is held. The reference rig
    // says its Grip hangs off a Hand, which the workspace finds in the arm.
    let staff = Arc::new(Skeleton::new(
        "staff",
        vec![
            BoneDesc::new("Grip", None, &BoneTransform::default(), Some(0)),
            BoneDesc::new(
                "Top",
                Some(0),
                &BoneTransform::new(
                    glm::vec3(0.0, 0.0, 1.5),
                    glm::Quat::identity(),
                    glm::vec3(1.0, 1.0, 1.0),
                ),
                Some(1),
            ),
        ],
    ));
    let held = Arc::new(Skeleton::new(
        "held",
        vec![
            BoneDesc::new("Hand", None, &BoneTransform::default(), None),
            BoneDesc::new(
                "Grip",
                Some(0),
                &BoneTransform::new(
                    glm::vec3(0.1, 0.0, 0.0),
                    glm::Quat::identity(),
                    glm::vec3(1.0, 1.0, 1.0),
                ),
                None,
            ),
        ],
    ));
    let idle = skelpose::MotionClip::new("idle", 30.0, 30.0, vec![], vec![]);

    let mut ws = Workspace::new(AnimatorOptions {
        autoplay: true,
        ..Default::default()
    });
    let arm_mesh = ws.add_mesh(AnimatedMesh::new(arm));
    let staff_mesh = ws.add_mesh(AnimatedMesh::new(staff));
    let arm_anim = ws.create_animator();
    let staff_anim = ws.create_animator();
    ws.bind_mesh(arm_anim, arm_mesh);
    ws.bind_mesh(staff_anim, staff_mesh);
    ws.set_owner(staff_anim, Some(arm_anim));
    ws.set_reference_skeleton(staff_anim, Some(held));

    let count = ws.load_animation_list(arm_anim, &clips);
    info!("{} clips in {}", count, file_path);
    ws.load_animation_list(staff_anim, &[idle][..]);
    ws.set_active_motion(arm_anim, 0);
    ws.set_active_motion(staff_anim, 0);

    for tick in 0..TICKS {
        ws.update_all(SIM_RATE);
        let hand = ws.mesh(arm_mesh).unwrap().world_matrix_by_name("Hand");
        let top = ws.mesh(staff_mesh).unwrap().world_matrix_by_name("Top");
        if let (Some(hand), Some(top)) = (hand, top) {
            println!(
                "tick {:2} hand {:?} staff top {:?}",
                tick,
                origin(hand).as_slice(),
                origin(top).as_slice()
            );
        }
    }
}
