use std::cell::Cell;
use std::rc::Rc;

use log::{debug, warn};

use crate::id::LayerId;
use crate::layer::{BlendMode, Layer};
use crate::registry::{check_opacity, LayerRegistry, RegistryError};

/// The part of a canvas the paint hooks act on.
pub trait CompositeContext {
    fn composite_operation(&self) -> BlendMode;

    fn set_composite_operation(&mut self, mode: BlendMode);
}

/// Per-layer pre/post paint hooks.
///
/// The pre-paint hook applies the layer's blend mode as it is at paint time. The post-paint hook
/// always restores `SourceOver`, every layer shares one canvas context and a mode left behind
/// would apply to the next layer's paint pass.
#[derive(Debug, Clone)]
pub struct PaintHooks {
    blend_mode: Rc<Cell<BlendMode>>,
}

impl PaintHooks {
    pub fn for_layer(layer: &Layer) -> Self {
        Self {
            blend_mode: layer.shared_blend_mode(),
        }
    }

    pub fn pre_paint(&self, context: &mut dyn CompositeContext) {
        context.set_composite_operation(self.blend_mode.get());
    }

    pub fn post_paint(&self, context: &mut dyn CompositeContext) {
        context.set_composite_operation(BlendMode::SourceOver);
    }

    /// Runs `draw` between the pre and post hooks. Surfaces should paint every drawable
    /// through this.
    pub fn paint<C: CompositeContext>(&self, context: &mut C, draw: impl FnOnce(&mut C)) {
        self.pre_paint(context);
        draw(context);
        self.post_paint(context);
    }
}

impl<H> LayerRegistry<H> {
    /// Values outside `0.0..=1.0` are rejected and leave the stored opacity unchanged.
    /// Callers with a percentage slider divide by 100 first.
    pub fn set_opacity(&mut self, id: &LayerId, opacity: f32) -> Result<(), RegistryError> {
        if let Err(e) = check_opacity(opacity) {
            warn!("Rejecting opacity. id: {}, value: {}", id, opacity);
            return Err(e);
        }
        let layer = self.get_mut(id)?;
        layer.set_opacity(opacity);
        debug!("Opacity changed. id: {}, opacity: {:.2}", id, opacity);
        Ok(())
    }

    /// Flips between `SourceOver` and `Multiply`, returning the new mode.
    ///
    /// Only takes effect on the next paint pass, the caller must request a redraw.
    pub fn toggle_blend_mode(&mut self, id: &LayerId) -> Result<BlendMode, RegistryError> {
        let layer = self.get(id)?;
        let blend_mode = layer.blend_mode().toggled();
        layer.set_blend_mode(blend_mode);
        debug!("Blend mode changed. id: {}, blend_mode: {}", id, blend_mode);
        Ok(blend_mode)
    }
}
