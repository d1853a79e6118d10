//! Drawing hooks for postures.

use crate::{
    math::{Transform, Vec3},
    posture::Posture,
};

/// Receives the drawable parts of a posture.
///
/// Implemented by whatever draws skeletons, be it a window, a plot or a log.
pub trait PoseRenderer {
    /// Called once per joint in index order.
    fn joint(&mut self, index: usize, label: &str, transform: &Transform);

    /// Called once per parent-child pair after the joint's parent was drawn.
    fn bone(&mut self, parent: Vec3, child: Vec3);
}

/// Feeds every joint and bone of the posture to the renderer.
pub fn render_posture(posture: &Posture, renderer: &mut dyn PoseRenderer) {
    let skeleton = posture.skeleton();
    let transforms = posture.global_transforms();

    for (index, transform) in transforms.iter().enumerate() {
        renderer.joint(index, skeleton.label(index), transform);
        if let Some(parent) = skeleton.parent_index(index) {
            renderer.bone(
                transforms[parent].translation.vector,
                transform.translation.vector,
            );
        }
    }
}
