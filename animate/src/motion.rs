use {
    crate::{
        error::Error,
        math::Vec3,
        posture::Posture,
        skeleton::{JointRef, Skeleton},
    },
    std::{borrow::Cow, ops::Range, sync::Arc},
};

pub const DEFAULT_FPS: f64 = 30.0;

const DEFAULT_NAME: &str = "no name";

/// Ordered sequence of postures sharing one skeleton and frame rate.
///
/// Carries a single frame cursor. Independent cursors over the same motion
/// are obtained through [`Motion::view`].
#[derive(Clone, Debug)]
pub struct Motion {
    skeleton: Arc<Skeleton>,
    postures: Vec<Posture>,
    fps: f64,
    name: String,
    frame: usize,
}

impl Motion {
    pub fn new(skeleton: Arc<Skeleton>, fps: f64) -> Self {
        Motion {
            skeleton,
            postures: Vec::new(),
            fps,
            name: DEFAULT_NAME.to_owned(),
            frame: 0,
        }
    }

    pub fn from_postures(
        skeleton: Arc<Skeleton>,
        postures: Vec<Posture>,
        fps: f64,
    ) -> Result<Self, Error> {
        if postures
            .iter()
            .any(|p| !Arc::ptr_eq(p.skeleton(), &skeleton))
        {
            return Err(Error::SkeletonMismatch);
        }

        Ok(Motion {
            postures,
            ..Motion::new(skeleton, fps)
        })
    }

    pub fn push(&mut self, posture: Posture) -> Result<(), Error> {
        if !Arc::ptr_eq(posture.skeleton(), &self.skeleton) {
            return Err(Error::SkeletonMismatch);
        }
        self.postures.push(posture);
        Ok(())
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn len(&self) -> usize {
        self.postures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postures.is_empty()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn set_fps(&mut self, fps: f64) {
        self.fps = fps;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn postures(&self) -> &[Posture] {
        &self.postures
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posture> {
        self.postures.iter()
    }

    pub fn get(&self, frame: usize) -> Result<&Posture, Error> {
        let len = self.postures.len();
        self.postures
            .get(frame)
            .ok_or_else(|| Error::out_of_range(frame as f64, len))
    }

    pub fn get_mut(&mut self, frame: usize) -> Result<&mut Posture, Error> {
        let len = self.postures.len();
        self.postures
            .get_mut(frame)
            .ok_or_else(|| Error::out_of_range(frame as f64, len))
    }

    /// Posture at a possibly fractional frame.
    ///
    /// Whole frames borrow the stored posture. Frame `k + t` with `0 < t < 1`
    /// yields a new posture blended between frames `k` and `k + 1`.
    pub fn sample(&self, frame: f64) -> Result<Cow<'_, Posture>, Error> {
        let len = self.postures.len();
        if !frame.is_finite() || frame < 0.0 {
            return Err(Error::out_of_range(frame, len));
        }

        let floor = frame.floor();
        let k = floor as usize;
        let t = frame - floor;
        if t == 0.0 {
            return self.get(k).map(Cow::Borrowed);
        }

        match (self.postures.get(k), self.postures.get(k + 1)) {
            (Some(p0), Some(p1)) => Ok(Cow::Owned(p0.blend(p1, t)?)),
            _ => Err(Error::out_of_range(frame, len)),
        }
    }

    /// New motion with frames in `range`. Metadata is copied and the cursor
    /// starts at 0.
    pub fn slice(&self, range: Range<usize>) -> Result<Motion, Error> {
        let len = self.postures.len();
        if range.end > len {
            return Err(Error::out_of_range(range.end as f64, len));
        }
        if range.start > range.end {
            return Err(Error::out_of_range(range.start as f64, len));
        }

        Ok(Motion {
            skeleton: self.skeleton.clone(),
            postures: self.postures[range].to_vec(),
            fps: self.fps,
            name: self.name.clone(),
            frame: 0,
        })
    }

    /// New motion with frames of `self` followed by frames of `next`.
    /// Metadata comes from `self`.
    pub fn concat(&self, next: &Motion) -> Result<Motion, Error> {
        if !Arc::ptr_eq(&self.skeleton, &next.skeleton) {
            return Err(Error::SkeletonMismatch);
        }

        let mut motion = self.clone();
        motion.postures.extend(next.postures.iter().cloned());
        Ok(motion)
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn go_to_frame(&mut self, frame: usize) -> Result<(), Error> {
        self.frame = checked_frame(frame as i64, self.len())?;
        Ok(())
    }

    pub fn move_frame(&mut self, offset: isize) -> Result<(), Error> {
        self.frame =
            checked_frame(self.frame as i64 + offset as i64, self.len())?;
        Ok(())
    }

    pub fn current_posture(&self) -> Result<&Posture, Error> {
        self.get(self.frame)
    }

    /// Lightweight read-only cursor independent of the motion's own one.
    pub fn view(&self) -> MotionView<'_> {
        MotionView {
            motion: self,
            frame: 0,
        }
    }

    pub fn position<'a>(
        &self,
        joint: impl Into<JointRef<'a>>,
        frame: usize,
    ) -> Result<Vec3, Error> {
        let index = self.skeleton.resolve(joint)?;
        Ok(self.get(frame)?.global_position(index))
    }

    pub fn positions(&self, frame: usize) -> Result<Vec<Vec3>, Error> {
        Ok(self.get(frame)?.global_positions())
    }

    /// Velocity of the joint by finite difference.
    ///
    /// Without `frame1` uses frames around `frame0`, clamped to the sequence
    /// ends. Returns zero if `frame0 == frame1` or the motion has one frame.
    pub fn velocity<'a>(
        &self,
        joint: impl Into<JointRef<'a>>,
        frame0: usize,
        frame1: Option<usize>,
    ) -> Result<Vec3, Error> {
        let index = self.skeleton.resolve(joint)?;
        self.velocity_at(index, frame0, frame1)
    }

    pub fn velocities(
        &self,
        frame0: usize,
        frame1: Option<usize>,
    ) -> Result<Vec<Vec3>, Error> {
        self.derivatives(frame0, frame1, |frame| self.positions(frame))
    }

    /// Finite difference of [`Motion::velocity`] with the same frame rules.
    pub fn acceleration<'a>(
        &self,
        joint: impl Into<JointRef<'a>>,
        frame0: usize,
        frame1: Option<usize>,
    ) -> Result<Vec3, Error> {
        let index = self.skeleton.resolve(joint)?;
        self.derivative(frame0, frame1, |frame| {
            self.velocity_at(index, frame, None)
        })
    }

    pub fn accelerations(
        &self,
        frame0: usize,
        frame1: Option<usize>,
    ) -> Result<Vec<Vec3>, Error> {
        self.derivatives(frame0, frame1, |frame| self.velocities(frame, None))
    }

    fn velocity_at(
        &self,
        index: usize,
        frame0: usize,
        frame1: Option<usize>,
    ) -> Result<Vec3, Error> {
        self.derivative(frame0, frame1, |frame| {
            Ok(self.get(frame)?.global_position(index))
        })
    }

    /// Validates frames and picks the pair to difference.
    /// `None` means the derivative is zero.
    fn difference_frames(
        &self,
        frame0: usize,
        frame1: Option<usize>,
    ) -> Result<Option<(usize, usize)>, Error> {
        self.get(frame0)?;
        if let Some(frame1) = frame1 {
            self.get(frame1)?;
        }

        if frame1 == Some(frame0) || self.postures.len() == 1 {
            return Ok(None);
        }

        Ok(Some(match frame1 {
            Some(frame1) => (frame0, frame1),
            None => {
                let prev = frame0.saturating_sub(1);
                let next = (frame0 + 1).min(self.postures.len() - 1);
                (prev, next)
            }
        }))
    }

    fn derivative(
        &self,
        frame0: usize,
        frame1: Option<usize>,
        value: impl Fn(usize) -> Result<Vec3, Error>,
    ) -> Result<Vec3, Error> {
        match self.difference_frames(frame0, frame1)? {
            None => Ok(Vec3::zeros()),
            Some((f0, f1)) => {
                let scale = self.fps / (f1 as f64 - f0 as f64);
                Ok((value(f1)? - value(f0)?) * scale)
            }
        }
    }

    fn derivatives(
        &self,
        frame0: usize,
        frame1: Option<usize>,
        values: impl Fn(usize) -> Result<Vec<Vec3>, Error>,
    ) -> Result<Vec<Vec3>, Error> {
        match self.difference_frames(frame0, frame1)? {
            None => Ok(vec![Vec3::zeros(); self.skeleton.joint_count()]),
            Some((f0, f1)) => {
                let scale = self.fps / (f1 as f64 - f0 as f64);
                let v0 = values(f0)?;
                let v1 = values(f1)?;
                Ok(v0
                    .iter()
                    .zip(v1.iter())
                    .map(|(v0, v1)| (v1 - v0) * scale)
                    .collect())
            }
        }
    }
}

impl<'a> IntoIterator for &'a Motion {
    type Item = &'a Posture;
    type IntoIter = std::slice::Iter<'a, Posture>;

    fn into_iter(self) -> Self::IntoIter {
        self.postures.iter()
    }
}

/// Frame cursor borrowing a [`Motion`].
#[derive(Clone, Copy, Debug)]
pub struct MotionView<'a> {
    motion: &'a Motion,
    frame: usize,
}

impl<'a> MotionView<'a> {
    pub fn motion(&self) -> &'a Motion {
        self.motion
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn go_to_frame(&mut self, frame: usize) -> Result<(), Error> {
        self.frame = checked_frame(frame as i64, self.motion.len())?;
        Ok(())
    }

    pub fn move_frame(&mut self, offset: isize) -> Result<(), Error> {
        self.frame = checked_frame(
            self.frame as i64 + offset as i64,
            self.motion.len(),
        )?;
        Ok(())
    }

    pub fn current_posture(&self) -> Result<&'a Posture, Error> {
        self.motion.get(self.frame)
    }
}

fn checked_frame(frame: i64, len: usize) -> Result<usize, Error> {
    if frame < 0 || frame >= len as i64 {
        Err(Error::out_of_range(frame as f64, len))
    } else {
        Ok(frame as usize)
    }
}
