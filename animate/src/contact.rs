//! Ground contact detection for a single joint over a motion.

use crate::{error::Error, motion::Motion, skeleton::JointRef};

/// Thresholds for classifying a joint as touching the ground.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ContactThresholds {
    /// Joint must be below this height.
    pub height_ref: f64,

    /// Joint speed must be below this value.
    pub speed_ref: f64,

    /// Index of the up axis: 1 for y-up, 2 for z-up.
    pub up_axis: usize,
}

impl Default for ContactThresholds {
    fn default() -> Self {
        ContactThresholds {
            height_ref: 0.1,
            speed_ref: 0.4,
            up_axis: 1,
        }
    }
}

/// Per-frame contact flags of the joint.
pub fn contact_states<'a>(
    motion: &Motion,
    joint: impl Into<JointRef<'a>>,
    thresholds: &ContactThresholds,
) -> Result<Vec<bool>, Error> {
    let index = motion.skeleton().resolve(joint)?;
    if thresholds.up_axis > 2 {
        return Err(Error::InvalidOperation {
            reason: "up axis must be 0, 1 or 2",
        });
    }

    (0..motion.len())
        .map(|frame| -> Result<bool, Error> {
            let position = motion.position(index, frame)?;
            let speed = motion.velocity(index, frame, None)?.norm();
            Ok(position[thresholds.up_axis] < thresholds.height_ref
                && speed < thresholds.speed_ref)
        })
        .collect()
}

/// Splits contact flags into frames where contacts start and end.
///
/// A contact already active at frame 0 starts there, one still active at the
/// last frame ends there.
pub fn contact_timings(states: &[bool]) -> (Vec<usize>, Vec<usize>) {
    let mut starts = Vec::new();
    let mut ends = Vec::new();

    let (first, last) = match (states.first(), states.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return (starts, ends),
    };

    if first {
        starts.push(0);
    }

    for (frame, pair) in states.windows(2).enumerate() {
        if pair[0] != pair[1] {
            if pair[1] {
                starts.push(frame + 1);
            } else {
                ends.push(frame + 1);
            }
        }
    }

    if last {
        ends.push(states.len() - 1);
    }

    (starts, ends)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{math::Vec3, posture::Posture, skeleton::Skeleton},
        std::sync::Arc,
    };

    #[test]
    fn test_timings() {
        let states = [true, true, false, false, true, false, true];
        assert_eq!(contact_timings(&states), (vec![0, 4, 6], vec![2, 5, 6]));
        assert_eq!(contact_timings(&[]), (vec![], vec![]));
        assert_eq!(contact_timings(&[false, false]), (vec![], vec![]));
    }

    #[test]
    fn test_states_from_height_and_speed() {
        let mut skeleton = Skeleton::new("hips", Vec3::zeros());
        skeleton
            .add_joint("foot", Vec3::new(0.0, -1.0, 0.0), 0)
            .unwrap();
        let skeleton = Arc::new(skeleton);

        // Hips height per frame, foot hangs 1 unit below.
        let heights = [1.05, 1.05, 1.05, 1.5, 2.0];
        let mut motion = Motion::new(skeleton.clone(), 30.0);
        for &h in &heights {
            let mut posture = Posture::new(skeleton.clone());
            posture.set_root_position(Vec3::new(0.0, h, 0.0));
            motion.push(posture).unwrap();
        }

        let thresholds = ContactThresholds {
            height_ref: 0.1,
            speed_ref: 1.0,
            up_axis: 1,
        };
        let states = contact_states(&motion, "foot", &thresholds).unwrap();
        // Frame 2 is low but already moving up fast.
        assert_eq!(states, vec![true, true, false, false, false]);
    }
}
