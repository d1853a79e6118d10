use {
    animate::{math, Posture, Skeleton, Vec3},
    approx::assert_relative_eq,
    std::sync::Arc,
};

/// Leg hanging from a rotated pelvis with a slightly bent knee.
fn leg() -> Posture {
    let mut skeleton = Skeleton::new("pelvis", Vec3::zeros());
    let hip = skeleton
        .add_joint("hip", Vec3::new(1.0, 0.0, 0.0), 0)
        .unwrap();
    let knee = skeleton
        .add_joint("knee", Vec3::new(0.0, -5.0, 0.0), hip)
        .unwrap();
    skeleton
        .add_joint("ankle", Vec3::new(0.0, -5.0, 0.0), knee)
        .unwrap();

    let mut posture = Posture::new(Arc::new(skeleton));
    posture.set_root_position(Vec3::new(0.0, 10.0, 0.0));
    posture.set_local_rotation(0, math::rot_y(0.3));
    posture.set_local_rotation(knee, math::rot_x(0.4));
    posture
}

#[test]
fn test_reachable_targets() {
    let targets = [
        Vec3::new(1.0, 3.0, 2.0),
        Vec3::new(4.0, 8.0, 0.0),
        Vec3::new(-3.0, 5.0, 4.0),
        Vec3::new(1.5, 1.0, -1.0),
        Vec3::new(0.0, 6.0, 6.0),
    ];

    for target in &targets {
        let mut posture = leg();
        let hip = posture.global_position(1);
        let distance = (target - hip).norm();
        assert!(distance <= 10.0);

        ik::solve(&mut posture, "ankle", *target, None).unwrap();
        assert_relative_eq!(posture.global_position(3), *target, epsilon = 1e-3);

        // Bones keep their lengths.
        let knee = posture.global_position(2);
        assert_relative_eq!((knee - posture.global_position(1)).norm(), 5.0, epsilon = 1e-9);
        assert_relative_eq!((posture.global_position(3) - knee).norm(), 5.0, epsilon = 1e-9);
    }
}

#[test]
fn test_unreachable_target_extends_chain() {
    let mut posture = leg();
    let hip = posture.global_position(1);
    let target = hip + Vec3::new(12.0, -9.0, 0.0);

    ik::solve(&mut posture, "ankle", target, None).unwrap();

    let expected = hip + (target - hip).normalize() * 10.0;
    assert_relative_eq!(posture.global_position(3), expected, epsilon = 1e-3);
}

#[test]
fn test_pelvis_untouched() {
    let mut posture = leg();
    let pelvis = *posture.local_rotation(0);
    ik::solve(&mut posture, "ankle", Vec3::new(2.0, 2.0, 2.0), None).unwrap();
    assert_eq!(*posture.local_rotation(0), pelvis);
    assert_eq!(*posture.local_rotation(3), math::Rotation::identity());
}

/// Chain with bones of length 5 and 3 along x.
fn uneven_chain() -> Posture {
    let mut skeleton = Skeleton::new("a", Vec3::zeros());
    let c = skeleton
        .add_joint("c", Vec3::new(5.0, 0.0, 0.0), 0)
        .unwrap();
    skeleton
        .add_joint("b", Vec3::new(3.0, 0.0, 0.0), c)
        .unwrap();
    let mut posture = Posture::new(Arc::new(skeleton));
    posture.set_local_rotation(c, math::rot_z(0.7));
    posture
}

#[test]
fn test_target_at_grandparent() {
    let mut posture = leg();
    let hip = posture.global_position(1);

    ik::solve(&mut posture, "ankle", hip, None).unwrap();
    assert_relative_eq!(posture.global_position(3), hip, epsilon = 1e-6);
}

#[test]
fn test_target_at_full_extension() {
    let mut posture = leg();
    let hip = posture.global_position(1);
    let target = hip + Vec3::new(6.0, -8.0, 0.0);

    ik::solve(&mut posture, "ankle", target, None).unwrap();
    assert_relative_eq!(posture.global_position(3), target, epsilon = 1e-3);
}

#[test]
fn test_target_at_bone_length_difference() {
    let mut posture = uneven_chain();
    let target = Vec3::new(0.0, 2.0, 0.0);

    ik::solve(&mut posture, "b", target, None).unwrap();
    assert_relative_eq!(posture.global_position(2), target, epsilon = 1e-3);
    assert_relative_eq!(posture.global_position(1).norm(), 5.0, epsilon = 1e-9);
}

#[test]
fn test_target_too_close_stops_at_bone_length_difference() {
    let mut posture = uneven_chain();
    let target = Vec3::new(0.0, 1.0, 0.0);

    ik::solve(&mut posture, "b", target, None).unwrap();
    assert_relative_eq!(
        posture.global_position(2),
        Vec3::new(0.0, 2.0, 0.0),
        epsilon = 1e-3
    );
}
