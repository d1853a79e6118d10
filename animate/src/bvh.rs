//! Biovision hierarchy (BVH) loading and writing over `bvh_anim`.

use {
    crate::{
        loader::{LoadError, Loader},
        math::{self, Rotation, Vec3},
        motion::Motion,
        posture::Posture,
        skeleton::Skeleton,
    },
    bvh_anim::{Bvh, ChannelType},
    std::{
        fmt::Write as _,
        io::{self, Read, Write},
        sync::Arc,
    },
};

const ROOT_CHANNELS: &str =
    "CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation";

const JOINT_CHANNELS: &str = "CHANNELS 3 Zrotation Xrotation Yrotation";

/// Loads BVH files into a [`Motion`].
///
/// End sites become joints labelled `<parent>_Effector`.
#[derive(Clone, Copy, Debug)]
pub struct BvhLoader {
    /// Multiplier for offsets and root translation.
    pub scale: f64,

    /// Keep the root joint's `OFFSET` as a fixed translation.
    pub apply_root_offset: bool,
}

impl Default for BvhLoader {
    fn default() -> Self {
        BvhLoader {
            scale: 1.0,
            apply_root_offset: false,
        }
    }
}

impl Loader for BvhLoader {
    fn load(&self, reader: &mut dyn Read) -> Result<Motion, LoadError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let declared = declared_frames(&bytes)?;
        let bvh = bvh_anim::from_reader(&bytes[..])?;
        let motion = self.convert(&bvh)?;

        if let Some(declared) = declared {
            if motion.len() != declared {
                return Err(LoadError::FrameCount {
                    declared,
                    available: motion.len(),
                });
            }
        }
        Ok(motion)
    }
}

impl BvhLoader {
    /// Builds the skeleton and returns it with the skeleton index of every
    /// BVH joint.
    pub fn skeleton(
        &self,
        bvh: &Bvh,
    ) -> Result<(Skeleton, Vec<usize>), LoadError> {
        let mut joints = bvh.joints();
        let root = joints.next().ok_or(LoadError::MissingRoot)?;
        let root = root.data();

        let root_offset = if self.apply_root_offset {
            let o = root.offset();
            self.offset(o.x, o.y, o.z)
        } else {
            Vec3::zeros()
        };
        let mut skeleton = Skeleton::new(root.name().to_string(), root_offset);
        let mut indices = vec![0];

        for joint in joints {
            let data = joint.data();
            let parent = data
                .parent_index()
                .and_then(|parent| indices.get(parent).copied())
                .ok_or(LoadError::MissingRoot)?;

            let label = data.name().to_string();
            let o = data.offset();
            let offset = self.offset(o.x, o.y, o.z);
            let index = skeleton.add_joint(&label, offset, parent)?;
            indices.push(index);

            if let Some(end_site) = data.end_site() {
                skeleton.add_joint(
                    format!("{}_Effector", label),
                    self.offset(end_site.x, end_site.y, end_site.z),
                    index,
                )?;
            }
        }

        Ok((skeleton, indices))
    }

    /// Converts parsed BVH data. Rotation channels compose in listed order.
    pub fn convert(&self, bvh: &Bvh) -> Result<Motion, LoadError> {
        let frame_time = bvh.frame_time().as_secs_f64();
        if !(frame_time > 0.0) {
            return Err(LoadError::InvalidFrameTime { frame_time });
        }

        let (skeleton, indices) = self.skeleton(bvh)?;
        let skeleton = Arc::new(skeleton);
        let mut motion = Motion::new(skeleton.clone(), 1.0 / frame_time);

        let mut ignored_positions = false;
        for (frame_index, frame) in bvh.frames().enumerate() {
            let mut rotations =
                vec![Rotation::identity(); skeleton.joint_count()];
            let mut root_position = Vec3::zeros();

            for (joint, &index) in bvh.joints().zip(&indices) {
                let data = joint.data();
                let mut rotation = Rotation::identity();

                for channel in data.channels() {
                    let value = match frame.get(channel) {
                        Some(&value) => f64::from(value),
                        None => {
                            return Err(LoadError::MissingValue {
                                frame: frame_index,
                                joint: data.name().to_string(),
                            })
                        }
                    };

                    let axis = match channel.channel_type() {
                        ChannelType::RotationX => math::rot_x(value.to_radians()),
                        ChannelType::RotationY => math::rot_y(value.to_radians()),
                        ChannelType::RotationZ => math::rot_z(value.to_radians()),
                        _ if index != 0 => {
                            ignored_positions = true;
                            continue;
                        }
                        ChannelType::PositionX => {
                            root_position.x = value * self.scale;
                            continue;
                        }
                        ChannelType::PositionY => {
                            root_position.y = value * self.scale;
                            continue;
                        }
                        ChannelType::PositionZ => {
                            root_position.z = value * self.scale;
                            continue;
                        }
                    };
                    rotation *= axis;
                }
                rotations[index] = rotation;
            }

            let mut posture = Posture::new(skeleton.clone());
            posture.set_local_rotations(rotations)?;
            posture.set_root_position(root_position);
            motion.push(posture)?;
        }

        if ignored_positions {
            tracing::warn!("Position channels of non-root joints are ignored");
        }
        tracing::debug!(
            "Converted BVH with {} joints and {} frames",
            skeleton.joint_count(),
            motion.len()
        );
        Ok(motion)
    }

    fn offset(&self, x: f32, y: f32, z: f32) -> Vec3 {
        Vec3::new(x.into(), y.into(), z.into()) * self.scale
    }
}

/// `Frames:` value of the file, if present.
///
/// Fails when more frames are declared than values follow, so a corrupt
/// count never reaches an allocation.
fn declared_frames(bytes: &[u8]) -> Result<Option<usize>, LoadError> {
    let text = String::from_utf8_lossy(bytes);
    let mut tokens = text.split_whitespace();

    while let Some(token) = tokens.next() {
        if token.eq_ignore_ascii_case("Frames:") {
            let declared = match tokens.next().map(str::parse::<usize>) {
                Some(Ok(declared)) => declared,
                _ => return Ok(None),
            };

            // Skip `Frame Time: <seconds>`.
            let available = tokens.skip(3).count();
            if declared > available {
                return Err(LoadError::FrameCount {
                    declared,
                    available,
                });
            }
            return Ok(Some(declared));
        }
    }
    Ok(None)
}

/// Writes the motion as BVH.
///
/// The root gets position and `Z X Y` rotation channels, other joints with
/// children get `Z X Y` rotation channels and childless joints are written as
/// end sites.
pub fn write_bvh(
    motion: &Motion,
    mut writer: &mut dyn Write,
) -> io::Result<()> {
    let skeleton = motion.skeleton();

    let mut text = String::from("HIERARCHY\n");
    write_joint(skeleton, 0, 0, &mut text);

    text.push_str("MOTION\n");
    let _ = writeln!(text, "Frames: {}", motion.len());
    let _ = writeln!(text, "Frame Time: {}", 1.0 / motion.fps());

    let order: Vec<usize> = skeleton
        .descendants(0)
        .filter(|&index| index == 0 || !skeleton.children(index).is_empty())
        .collect();

    for posture in motion {
        let mut values = Vec::new();
        for &index in &order {
            if index == 0 {
                let root = posture.root_position();
                values.extend_from_slice(&[root.x, root.y, root.z]);
            }
            let (z, x, y) = math::to_zxy(posture.local_rotation(index));
            values.extend_from_slice(&[
                z.to_degrees(),
                x.to_degrees(),
                y.to_degrees(),
            ]);
        }

        let line: Vec<String> = values.iter().map(f64::to_string).collect();
        text.push_str(&line.join(" "));
        text.push('\n');
    }

    let bvh = bvh_anim::from_reader(text.as_bytes())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    bvh.write_to(&mut writer)
}

fn write_joint(
    skeleton: &Skeleton,
    index: usize,
    depth: usize,
    text: &mut String,
) {
    let indent = "  ".repeat(depth);
    let offset = skeleton.offset(index);
    let children = skeleton.children(index);

    let channels = if index == 0 {
        let _ = writeln!(text, "{}ROOT {}", indent, skeleton.label(index));
        Some(ROOT_CHANNELS)
    } else if children.is_empty() {
        let _ = writeln!(text, "{}End Site", indent);
        None
    } else {
        let _ = writeln!(text, "{}JOINT {}", indent, skeleton.label(index));
        Some(JOINT_CHANNELS)
    };

    let _ = writeln!(text, "{}{{", indent);
    let _ = writeln!(
        text,
        "{}  OFFSET {} {} {}",
        indent, offset.x, offset.y, offset.z
    );
    if let Some(channels) = channels {
        let _ = writeln!(text, "{}  {}", indent, channels);
    }
    for &child in children {
        write_joint(skeleton, child, depth + 1, text);
    }
    let _ = writeln!(text, "{}}}", indent);
}
