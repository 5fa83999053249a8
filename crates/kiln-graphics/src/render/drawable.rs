use crate::state::RenderStates;

use super::RenderTarget;

/// Something that knows how to draw itself into a render target.
///
/// Implementors usually combine `states` with their own transform or
/// texture and forward to [`RenderTarget::draw_vertices`] or
/// [`RenderTarget::draw_buffer`].
pub trait Drawable {
    fn draw(&self, target: &mut RenderTarget, states: &RenderStates);
}
