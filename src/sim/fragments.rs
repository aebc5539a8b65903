//! Fragment integration

use super::state::{Floor, Fragment};
use crate::consts::FRAGMENT_REST_OFFSET;
use crate::settings::PhysicsSettings;

/// Advance every fragment by one frame
///
/// Fragments only land while above the floor's footprint; elsewhere they keep
/// falling.
pub fn step_fragments(fragments: &mut [Fragment], floor: &Floor, physics: &PhysicsSettings) {
    for fragment in fragments.iter_mut() {
        fragment.velocity.x *= physics.friction;
        fragment.velocity.z *= physics.friction;
        fragment.velocity.y += fragment.gravity;
        fragment.position += fragment.velocity;

        if fragment.position.y - fragment.height < floor.surface_y()
            && floor.contains_xz(fragment.position)
        {
            fragment.velocity.y = -fragment.velocity.y * physics.fragment_damping;
            fragment.position.y = floor.surface_y() + fragment.height + FRAGMENT_REST_OFFSET;
        }
    }
}
