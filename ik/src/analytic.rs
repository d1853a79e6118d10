use {
    crate::IkError,
    animate::{
        math::{self, Vec3},
        JointRef, Posture,
    },
    std::f64::consts::FRAC_PI_2,
};

/// Moves `target` to `new_position` by rotating its parent and grandparent.
///
/// Bone lengths are preserved, so a position out of reach leaves the chain
/// fully extended towards it. Without `parent_joint_axis` the chain keeps
/// bending in its current plane. The axis is given in the parent joint's
/// frame.
///
/// Degenerate geometry (straight chain, zero-length bones) is handled on a
/// best-effort basis and never fails.
#[tracing::instrument(level = "debug", skip(posture, target))]
pub fn solve<'p, 'a>(
    posture: &'p mut Posture,
    target: impl Into<JointRef<'a>>,
    new_position: Vec3,
    parent_joint_axis: Option<Vec3>,
) -> Result<&'p mut Posture, IkError> {
    let skeleton = posture.skeleton().clone();
    let target = skeleton.resolve(target)?;

    let (parent, grandparent) = match skeleton.parent_index(target) {
        Some(parent) => match skeleton.parent_index(parent) {
            Some(grandparent) => (parent, grandparent),
            None => {
                return Err(IkError::InvalidChain {
                    joint: skeleton.label(target).to_owned(),
                })
            }
        },
        None => {
            return Err(IkError::InvalidChain {
                joint: skeleton.label(target).to_owned(),
            })
        }
    };

    let a_pos = posture.global_position(grandparent);
    let c_pos = posture.global_position(parent);
    let b_pos = posture.global_position(target);
    let parent_rotation = posture.global_rotation(parent);

    let l = (b_pos - a_pos).norm();
    let m = (c_pos - a_pos).norm();
    let n = (b_pos - c_pos).norm();
    let l_new = (new_position - a_pos).norm();

    let (a, b) = interior_angles(l, m, n);
    let (a_new, b_new) = interior_angles(l_new, m, n);

    let axis = match parent_joint_axis {
        Some(axis) => {
            parent_rotation * math::normalize_or(&axis, Vec3::z())
        }
        None => {
            let normal = (c_pos - a_pos).cross(&(b_pos - a_pos));
            match normal.try_normalize(math::EPSILON) {
                Some(normal) => normal,
                None => {
                    tracing::warn!(
                        "Chain at `{}` has no bend plane, bending about parent z axis",
                        skeleton.label(target)
                    );
                    parent_rotation * Vec3::z()
                }
            }
        }
    };

    let rot_b = b - b_new;
    let rot_a = a_new - a - rot_b;
    posture.rotate_global(grandparent, &math::exp(&axis, rot_b));
    posture.rotate_global(parent, &math::exp(&axis, rot_a));

    // The in-plane step leaves the target on the initial grandparent-target
    // line, swing that line onto the new position. A folded chain has no
    // such line, so the target's current position is used instead.
    let (reach, l_reach) = if l < math::EPSILON {
        let reach = posture.global_position(target) - a_pos;
        (reach, reach.norm())
    } else {
        (b_pos - a_pos, l)
    };
    let displacement = (new_position - a_pos - reach).norm();
    let angle = math::acos_clamped(
        (l_new * l_new + l_reach * l_reach - displacement * displacement)
            / (2.0 * l_new * l_reach),
    );
    let swing = reach.cross(&(new_position - a_pos));
    let swing_axis = match swing.try_normalize(math::EPSILON) {
        Some(swing_axis) => swing_axis,
        None if angle > FRAC_PI_2 => axis,
        None => Vec3::zeros(),
    };
    posture.rotate_global(grandparent, &math::exp(&swing_axis, angle));

    tracing::debug!(
        "Moved `{}` to {:?}, residual {}",
        skeleton.label(target),
        new_position,
        (posture.global_position(target) - new_position).norm()
    );
    Ok(posture)
}

/// Interior angles of the chain triangle opposite the first bone (`a`, at
/// the target) and opposite the second bone (`b`, at the grandparent) for a
/// grandparent-target distance `l` and bone lengths `m` and `n`.
///
/// A vanishing `l` is the folded limit with both angles at `π/2`.
fn interior_angles(l: f64, m: f64, n: f64) -> (f64, f64) {
    if l < math::EPSILON {
        return (FRAC_PI_2, FRAC_PI_2);
    }
    (
        math::acos_clamped((l * l + n * n - m * m) / (2.0 * l * n)),
        math::acos_clamped((l * l + m * m - n * n) / (2.0 * l * m)),
    )
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        animate::Skeleton,
        approx::assert_relative_eq,
        std::sync::Arc,
    };

    fn straight_chain() -> Posture {
        let mut skeleton = Skeleton::new("shoulder", Vec3::zeros());
        let elbow = skeleton
            .add_joint("elbow", Vec3::new(5.0, 0.0, 0.0), 0)
            .unwrap();
        skeleton
            .add_joint("wrist", Vec3::new(5.0, 0.0, 0.0), elbow)
            .unwrap();
        Posture::new(Arc::new(skeleton))
    }

    #[test]
    fn test_straight_chain_reaches() {
        let mut posture = straight_chain();
        let target = Vec3::new(7.0, 6.0, 0.0);
        solve(&mut posture, "wrist", target, None).unwrap();

        assert_relative_eq!(posture.global_position(2), target, epsilon = 1e-3);
        assert!(posture.local_rotation(0).angle() > 1e-6);
        assert!(posture.local_rotation(1).angle() > 1e-6);
    }

    #[test]
    fn test_returns_same_posture() {
        let mut posture = straight_chain();
        let returned: *const Posture =
            solve(&mut posture, 2usize, Vec3::new(6.0, 0.0, 0.0), None).unwrap();
        assert_eq!(returned, &posture as *const Posture);
    }

    #[test]
    fn test_shallow_chain_fails() {
        let mut posture = straight_chain();
        let err = solve(&mut posture, "elbow", Vec3::zeros(), None).unwrap_err();
        assert_eq!(
            err,
            IkError::InvalidChain {
                joint: "elbow".to_owned()
            }
        );
        // Nothing was changed.
        assert_relative_eq!(posture.local_rotation(0).angle(), 0.0);
    }

    #[test]
    fn test_unknown_joint() {
        let mut posture = straight_chain();
        let err = solve(&mut posture, "ankle", Vec3::zeros(), None).unwrap_err();
        assert!(matches!(err, IkError::Animate { .. }));
    }

    #[test]
    fn test_axis_selects_bend_direction() {
        let target = Vec3::new(6.0, 0.0, 0.0);

        let mut up = straight_chain();
        solve(&mut up, "wrist", target, Some(-Vec3::z())).unwrap();
        assert_relative_eq!(up.global_position(2), target, epsilon = 1e-6);
        assert_relative_eq!(
            up.global_position(1),
            Vec3::new(3.0, 4.0, 0.0),
            epsilon = 1e-6
        );

        let mut down = straight_chain();
        solve(&mut down, "wrist", target, Some(Vec3::z())).unwrap();
        assert_relative_eq!(down.global_position(2), target, epsilon = 1e-6);
        assert_relative_eq!(
            down.global_position(1),
            Vec3::new(3.0, -4.0, 0.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_target_at_grandparent_folds_chain() {
        let mut posture = straight_chain();
        posture.set_local_rotation(1, math::rot_z(0.5));
        solve(&mut posture, "wrist", Vec3::zeros(), None).unwrap();

        assert_relative_eq!(posture.global_position(2), Vec3::zeros(), epsilon = 1e-6);
        assert_relative_eq!(posture.global_position(1).norm(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_folded_chain_unfolds() {
        let mut posture = straight_chain();
        posture.set_local_rotation(1, math::rot_z(std::f64::consts::PI));
        assert_relative_eq!(posture.global_position(2), Vec3::zeros(), epsilon = 1e-9);

        let target = Vec3::new(3.0, 4.0, 0.0);
        solve(&mut posture, "wrist", target, None).unwrap();
        assert_relative_eq!(posture.global_position(2), target, epsilon = 1e-6);
    }
}
