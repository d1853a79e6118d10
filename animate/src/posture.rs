use {
    crate::{
        error::Error,
        math::{self, Rotation, Transform, Vec3},
        skeleton::Skeleton,
    },
    std::{cell::RefCell, sync::Arc},
};

/// Cached global transforms guarded by per-joint dirty flags.
#[derive(Clone, Debug)]
struct GlobalCache {
    transforms: Box<[Transform]>,
    dirty: Box<[bool]>,
}

/// Single animation frame over a shared [`Skeleton`].
///
/// Stores the root position and one local rotation per joint. Global
/// transforms are derived lazily: writes only mark affected joints dirty and
/// the next read recomputes every dirty joint in ascending index order, so a
/// parent is always resolved before its children.
///
/// Joint indices passed to methods of this type must be valid for the
/// skeleton. Use [`Skeleton::resolve`] to validate labels or external indices.
#[derive(Clone, Debug)]
pub struct Posture {
    skeleton: Arc<Skeleton>,
    root_position: Vec3,
    local_rotations: Box<[Rotation]>,
    cache: RefCell<GlobalCache>,
}

impl Posture {
    /// Identity rotations everywhere and root at the origin.
    pub fn new(skeleton: Arc<Skeleton>) -> Self {
        let count = skeleton.joint_count();
        Posture {
            skeleton,
            root_position: Vec3::zeros(),
            local_rotations: vec![Rotation::identity(); count].into(),
            cache: RefCell::new(GlobalCache {
                transforms: vec![Transform::identity(); count].into(),
                dirty: vec![true; count].into(),
            }),
        }
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    /// Checks that both postures are bound to the same skeleton instance.
    pub fn same_skeleton(&self, other: &Posture) -> bool {
        Arc::ptr_eq(&self.skeleton, &other.skeleton)
    }

    pub fn root_position(&self) -> &Vec3 {
        &self.root_position
    }

    /// Moves the root. Every joint depends on it so the whole skeleton
    /// becomes dirty.
    pub fn set_root_position(&mut self, position: Vec3) {
        self.root_position = position;
        self.cache.get_mut().dirty.iter_mut().for_each(|d| *d = true);
    }

    pub fn local_rotations(&self) -> &[Rotation] {
        &self.local_rotations
    }

    pub fn local_rotation(&self, index: usize) -> &Rotation {
        &self.local_rotations[index]
    }

    /// Sets rotation relative to the parent frame and marks the subtree
    /// rooted at `index` dirty. Ancestors and siblings are unaffected.
    pub fn set_local_rotation(&mut self, index: usize, rotation: Rotation) {
        self.local_rotations[index] = rotation;

        let dirty = &mut self.cache.get_mut().dirty;
        for descendant in self.skeleton.descendants(index) {
            dirty[descendant] = true;
        }
    }

    /// Replaces all local rotations at once, in skeleton index order.
    pub fn set_local_rotations(
        &mut self,
        rotations: Vec<Rotation>,
    ) -> Result<(), Error> {
        let expected = self.skeleton.joint_count();
        if rotations.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: rotations.len(),
            });
        }

        self.local_rotations = rotations.into();
        self.cache.get_mut().dirty.iter_mut().for_each(|d| *d = true);
        Ok(())
    }

    /// Full world transform of the joint.
    pub fn global_transform(&self, index: usize) -> Transform {
        let mut cache = self.cache.borrow_mut();
        self.resolve_dirty(&mut cache);
        cache.transforms[index]
    }

    pub fn global_position(&self, index: usize) -> Vec3 {
        self.global_transform(index).translation.vector
    }

    pub fn global_rotation(&self, index: usize) -> Rotation {
        self.global_transform(index).rotation
    }

    /// World transforms of all joints in skeleton index order.
    pub fn global_transforms(&self) -> Vec<Transform> {
        let mut cache = self.cache.borrow_mut();
        self.resolve_dirty(&mut cache);
        cache.transforms.to_vec()
    }

    /// World positions of all joints in skeleton index order.
    pub fn global_positions(&self) -> Vec<Vec3> {
        let mut cache = self.cache.borrow_mut();
        self.resolve_dirty(&mut cache);
        cache
            .transforms
            .iter()
            .map(|t| t.translation.vector)
            .collect()
    }

    /// Sets the local rotation that yields `rotation` in world space,
    /// `local = parent_global⁻¹ ∘ rotation`.
    pub fn set_global_rotation(&mut self, index: usize, rotation: Rotation) {
        let local = match self.skeleton.parent_index(index) {
            Some(parent) => self.global_rotation(parent).inverse() * rotation,
            None => rotation,
        };
        self.set_local_rotation(index, local);
    }

    /// Applies `rotation` in world frame on top of the joint's current
    /// global rotation.
    pub fn rotate_global(&mut self, index: usize, rotation: &Rotation) {
        let global = self.global_rotation(index);
        self.set_global_rotation(index, rotation * global);
    }

    /// Marks every joint dirty and recomputes all global transforms.
    pub fn update_global_transforms(&mut self) {
        let mut cache = self.cache.borrow_mut();
        cache.dirty.iter_mut().for_each(|d| *d = true);
        self.resolve_dirty(&mut cache);
    }

    /// Root position and local rotations interpolated towards `other`.
    ///
    /// Root position is linearly interpolated, local rotations are slerped.
    /// `t` is not clamped.
    pub fn blend(&self, other: &Posture, t: f64) -> Result<Posture, Error> {
        if !self.same_skeleton(other) {
            return Err(Error::SkeletonMismatch);
        }

        let mut blended = Posture::new(self.skeleton.clone());
        blended.root_position =
            math::lerp(&self.root_position, &other.root_position, t);
        blended.local_rotations = self
            .local_rotations
            .iter()
            .zip(other.local_rotations.iter())
            .map(|(r0, r1)| math::slerp(r0, r1, t))
            .collect();
        Ok(blended)
    }

    /// Posture with the same root position and either identity rotations or
    /// the given initial ones.
    pub fn tpose(
        &self,
        initial_rotations: Option<Vec<Rotation>>,
    ) -> Result<Posture, Error> {
        let mut tpose = Posture::new(self.skeleton.clone());
        tpose.set_root_position(self.root_position);
        if let Some(rotations) = initial_rotations {
            tpose.set_local_rotations(rotations)?;
        }
        Ok(tpose)
    }

    fn resolve_dirty(&self, cache: &mut GlobalCache) {
        let GlobalCache { transforms, dirty } = cache;

        for index in 0..dirty.len() {
            if !dirty[index] {
                continue;
            }

            // Root offset is zero unless a loader applied it explicitly.
            let base = match self.skeleton.parent_index(index) {
                None => math::translation(&self.root_position),
                Some(parent) => transforms[parent],
            };
            transforms[index] = base
                * math::translation(self.skeleton.offset(index))
                * math::rotation(&self.local_rotations[index]);
            dirty[index] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::math::{rot_x, rot_y, rot_z},
        approx::assert_relative_eq,
        std::f64::consts::FRAC_PI_2,
    };

    /// root ─ a ─ b
    ///   └─ c
    fn skeleton() -> Arc<Skeleton> {
        let mut skeleton = Skeleton::new("root", Vec3::zeros());
        let a = skeleton.add_joint("a", Vec3::new(1.0, 0.0, 0.0), 0).unwrap();
        skeleton.add_joint("b", Vec3::new(1.0, 0.0, 0.0), a).unwrap();
        skeleton.add_joint("c", Vec3::new(0.0, 0.0, 2.0), 0).unwrap();
        Arc::new(skeleton)
    }

    fn from_scratch(posture: &Posture) -> Vec<Transform> {
        let mut fresh = Posture::new(posture.skeleton().clone());
        fresh.set_root_position(*posture.root_position());
        fresh
            .set_local_rotations(posture.local_rotations().to_vec())
            .unwrap();
        fresh.global_transforms()
    }

    #[test]
    fn test_rest_pose_positions() {
        let mut posture = Posture::new(skeleton());
        posture.set_root_position(Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(posture.global_position(2), Vec3::new(2.0, 1.0, 0.0));
        assert_relative_eq!(posture.global_position(3), Vec3::new(0.0, 1.0, 2.0));
    }

    #[test]
    fn test_rotation_propagates_to_descendants_only() {
        let mut posture = Posture::new(skeleton());
        let before = posture.global_transforms();

        posture.set_local_rotation(1, rot_z(FRAC_PI_2));

        assert_relative_eq!(posture.global_position(2), Vec3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(
            posture.global_rotation(2).angle_to(&rot_z(FRAC_PI_2)),
            0.0,
            epsilon = 1e-12
        );
        assert_eq!(posture.global_transform(0), before[0]);
        assert_eq!(posture.global_transform(3), before[3]);
    }

    #[test]
    fn test_only_subtree_marked_dirty() {
        let mut posture = Posture::new(skeleton());
        posture.global_transforms();
        posture.set_local_rotation(1, rot_x(0.3));

        let dirty = posture.cache.borrow().dirty.to_vec();
        assert_eq!(dirty, vec![false, true, true, false]);

        posture.global_position(0);
        assert!(posture.cache.borrow().dirty.iter().all(|d| !d));
    }

    #[test]
    fn test_lazy_recompute_matches_full() {
        let mut posture = Posture::new(skeleton());
        posture.set_local_rotation(0, rot_y(0.4));
        let _ = posture.global_position(2);
        posture.set_local_rotation(1, rot_x(-1.2));
        let _ = posture.global_position(3);
        posture.set_root_position(Vec3::new(3.0, -1.0, 0.5));
        posture.set_local_rotation(2, rot_z(0.7));
        posture.set_local_rotation(0, rot_z(0.1) * rot_x(0.2));

        let lazy = posture.global_transforms();
        let full = from_scratch(&posture);
        for (l, f) in lazy.iter().zip(full.iter()) {
            assert_relative_eq!(l.translation.vector, f.translation.vector, epsilon = 1e-12);
            assert_relative_eq!(l.rotation.angle_to(&f.rotation), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_set_global_rotation_roundtrip() {
        let mut posture = Posture::new(skeleton());
        posture.set_local_rotation(0, rot_y(0.5));
        posture.set_local_rotation(1, rot_x(0.25));
        posture.set_local_rotation(2, rot_z(-0.8));

        for index in 0..4 {
            let local = *posture.local_rotation(index);
            let global = posture.global_rotation(index);
            posture.set_global_rotation(index, global);
            assert_relative_eq!(
                posture.local_rotation(index).angle_to(&local),
                0.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_rotate_global() {
        let mut posture = Posture::new(skeleton());
        posture.set_local_rotation(0, rot_y(FRAC_PI_2));
        posture.rotate_global(1, &rot_x(FRAC_PI_2));

        let expected = rot_x(FRAC_PI_2) * rot_y(FRAC_PI_2);
        assert_relative_eq!(
            posture.global_rotation(1).angle_to(&expected),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_blend_endpoints() {
        let skeleton = skeleton();
        let mut p0 = Posture::new(skeleton.clone());
        let mut p1 = Posture::new(skeleton);
        p0.set_root_position(Vec3::new(1.0, 2.0, 3.0));
        p1.set_root_position(Vec3::new(-1.0, 0.0, 5.0));
        p0.set_local_rotation(1, rot_x(0.3));
        p1.set_local_rotation(1, rot_x(0.9));
        p1.set_local_rotation(3, rot_y(-0.4));

        let start = p0.blend(&p1, 0.0).unwrap();
        let end = p0.blend(&p1, 1.0).unwrap();
        assert_relative_eq!(*start.root_position(), *p0.root_position());
        assert_relative_eq!(*end.root_position(), *p1.root_position());
        for index in 0..4 {
            assert_relative_eq!(
                start.local_rotation(index).angle_to(p0.local_rotation(index)),
                0.0,
                epsilon = 1e-9
            );
            assert_relative_eq!(
                end.local_rotation(index).angle_to(p1.local_rotation(index)),
                0.0,
                epsilon = 1e-9
            );
        }

        let half = p0.blend(&p1, 0.5).unwrap();
        assert_relative_eq!(*half.root_position(), Vec3::new(0.0, 1.0, 4.0));
        assert_relative_eq!(
            half.local_rotation(1).angle_to(&rot_x(0.6)),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_blend_skeleton_mismatch() {
        let p0 = Posture::new(skeleton());
        let p1 = Posture::new(skeleton());
        assert_eq!(p0.blend(&p1, 0.5).unwrap_err(), Error::SkeletonMismatch);
    }

    #[test]
    fn test_set_local_rotations_length() {
        let mut posture = Posture::new(skeleton());
        let err = posture
            .set_local_rotations(vec![Rotation::identity(); 2])
            .unwrap_err();
        assert_eq!(
            err,
            Error::LengthMismatch {
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn test_tpose_keeps_root() {
        let mut posture = Posture::new(skeleton());
        posture.set_root_position(Vec3::new(0.0, 0.0, 9.0));
        posture.set_local_rotation(1, rot_x(1.0));
        let tpose = posture.tpose(None).unwrap();
        assert_eq!(tpose.root_position(), posture.root_position());
        assert_relative_eq!(tpose.local_rotation(1).angle(), 0.0);
    }
}
