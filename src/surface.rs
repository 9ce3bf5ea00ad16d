//! Seams to the collaborators the viewer drives but does not implement: the rendering surface
//! and the layer list panel.

use std::path::PathBuf;
use std::sync::Arc;

use nalgebra::Point2;

use crate::blend::PaintHooks;
use crate::geometry::{Extent, Feature};
use crate::id::LayerId;
use crate::layer::{BlendMode, Layer};

/// The rendering engine. Owns drawables, tile fetching, projection and hit-testing.
///
/// Coordinates are web mercator metres.
pub trait MapSurface {
    /// Opaque reference to a drawable owned by the surface.
    type Handle: Clone + std::fmt::Debug;

    /// Creates a drawable for the layer's content and places it at the top of the stack.
    fn add_drawable(&mut self, layer: &Layer) -> Self::Handle;

    fn remove_drawable(&mut self, handle: &Self::Handle);

    /// Replaces the whole stack, bottom to top.
    fn set_draw_order(&mut self, handles: &[Self::Handle]);

    fn set_visible(&mut self, handle: &Self::Handle, visible: bool);

    fn set_opacity(&mut self, handle: &Self::Handle, opacity: f32);

    /// Hooks must run around every paint pass of the drawable, see [`PaintHooks::paint`].
    fn register_paint_hooks(&mut self, handle: &Self::Handle, hooks: PaintHooks);

    fn unregister_paint_hooks(&mut self, handle: &Self::Handle);

    /// `None` while the view has no resolution yet.
    fn current_zoom(&self) -> Option<f64>;

    fn request_redraw(&mut self);

    fn fit_extent(&mut self, extent: &Extent);

    fn set_view(&mut self, center: Point2<f64>, zoom: f64);

    /// Features drawn under the given pixel, topmost layer first.
    fn features_at_pixel(&self, _pixel: Point2<f64>) -> Vec<Feature> {
        vec![]
    }
}

/// The layer list panel, as seen from the viewer.
pub trait LayerPanel {
    /// New entries go to the top of the list.
    fn on_layer_added(&mut self, id: &LayerId, title: &str, visible: bool);

    fn on_layer_removed(&mut self, id: &LayerId);

    /// Opacity and blend mode of a listed layer, sent right after [`LayerPanel::on_layer_added`]
    /// and whenever either changes.
    fn on_layer_style_changed(&mut self, _id: &LayerId, _opacity: f32, _blend_mode: BlendMode) {}

    /// One-shot user notice, e.g. an unreadable file.
    fn notify(&mut self, message: &str);

    /// Ask the user a yes/no question. The answer comes back as
    /// [`PanelEvent::JumpConfirmed`] or [`PanelEvent::JumpDeclined`].
    fn request_confirmation(&mut self, prompt: &str);

    fn show_feature_info(&mut self, _text: &str) {}
}

/// User actions reported by the panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// Ids as listed, top of the list first.
    ReorderRequested(Vec<LayerId>),
    VisibilityToggled(LayerId, bool),
    /// Already scaled from the 0..100 slider to 0..1.
    OpacityChanged(LayerId, f32),
    BlendToggled(LayerId),
    RemoveRequested(LayerId),
    ZoomToLayer(LayerId),
    FileDropped(DroppedFile),
    SearchSubmitted(String),
    JumpConfirmed,
    JumpDeclined,
}

/// A file dropped onto the map, either already read or as a path to read.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedFile {
    pub name: String,
    pub path: Option<PathBuf>,
    pub bytes: Option<Arc<[u8]>>,
}
