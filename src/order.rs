use log::debug;

use crate::id::LayerId;
use crate::registry::{LayerRegistry, RegistryError};
use crate::surface::MapSurface;

/// Maps the panel's list order (topmost first) to the draw order (bottom first).
///
/// The top of the list is the top of the draw stack, so the mapping is a reversal.
pub fn draw_order_from_ui(ui_ids: &[LayerId]) -> Vec<LayerId> {
    ui_ids
        .iter()
        .rev()
        .cloned()
        .collect()
}

/// The inverse of [`draw_order_from_ui`].
pub fn ui_order_from_draw(draw_ids: &[LayerId]) -> Vec<LayerId> {
    draw_ids
        .iter()
        .rev()
        .cloned()
        .collect()
}

/// Applies a drag-reorder reported by the panel to the registry and the surface.
///
/// The record store itself is never reordered, only the draw order.
pub fn apply_ui_order<S: MapSurface>(
    registry: &mut LayerRegistry<S::Handle>,
    surface: &mut S,
    ui_ids: &[LayerId],
) -> Result<(), RegistryError> {
    registry.reorder(draw_order_from_ui(ui_ids))?;
    sync_surface_order(registry, surface);
    Ok(())
}

/// Pushes the registry's draw order to the surface, replacing its stack.
pub fn sync_surface_order<S: MapSurface>(registry: &LayerRegistry<S::Handle>, surface: &mut S) {
    let handles = registry
        .handles_in_draw_order()
        .cloned()
        .collect::<Vec<_>>();
    debug!("Syncing surface draw order. layers: {}", handles.len());
    surface.set_draw_order(&handles);
}
