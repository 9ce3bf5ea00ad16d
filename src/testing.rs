//! Recording test doubles for the surface, panel, canvas and geocoder.

use std::cell::RefCell;
use std::collections::HashMap;

use nalgebra::{Point2, Vector2};

use crate::blend::{CompositeContext, PaintHooks};
use crate::geocoding::{GeocodeError, Geocoder, Place};
use crate::geometry::{Extent, Feature};
use crate::id::LayerId;
use crate::layer::{BlendMode, Layer, LayerContent};
use crate::surface::{LayerPanel, MapSurface};
use crate::view::MapView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawableId(pub usize);

#[derive(Debug, Clone)]
pub struct Drawable {
    pub title: String,
    pub content: LayerContent,
    pub visible: bool,
    pub opacity: f32,
    pub hooks: Option<PaintHooks>,
}

/// In-memory surface that records every call and can simulate paint passes.
#[derive(Debug)]
pub struct RecordingSurface {
    next_id: usize,
    drawables: HashMap<DrawableId, Drawable>,
    stack: Vec<DrawableId>,
    view: Option<MapView>,
    viewport: Vector2<f64>,
    redraws: usize,
    visibility_updates: usize,
    fitted: Vec<Extent>,
    hits: Vec<Feature>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self {
            next_id: 0,
            drawables: HashMap::new(),
            stack: vec![],
            view: None,
            viewport: Vector2::new(800.0, 600.0),
            redraws: 0,
            visibility_updates: 0,
            fitted: vec![],
            hits: vec![],
        }
    }
}

impl RecordingSurface {
    pub fn with_view(view: MapView) -> Self {
        Self {
            view: Some(view),
            ..Self::default()
        }
    }

    /// `None` simulates a view without a resolution.
    pub fn set_zoom(&mut self, zoom: Option<f64>) {
        self.view = zoom.map(|zoom| MapView {
            zoom,
            ..self.view.clone().unwrap_or_default()
        });
    }

    pub fn view(&self) -> Option<&MapView> {
        self.view.as_ref()
    }

    pub fn drawable(&self, handle: DrawableId) -> Option<&Drawable> {
        self.drawables.get(&handle)
    }

    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    /// Bottom to top.
    pub fn stack(&self) -> &[DrawableId] {
        &self.stack
    }

    pub fn stack_titles(&self) -> Vec<&str> {
        self.stack
            .iter()
            .filter_map(|handle| self.drawables.get(handle))
            .map(|drawable| drawable.title.as_str())
            .collect()
    }

    pub fn redraws(&self) -> usize {
        self.redraws
    }

    pub fn visibility_updates(&self) -> usize {
        self.visibility_updates
    }

    pub fn fitted(&self) -> &[Extent] {
        &self.fitted
    }

    pub fn set_hits(&mut self, hits: Vec<Feature>) {
        self.hits = hits;
    }

    /// Paints every visible drawable bottom to top, returning the composite operation each one
    /// found on the canvas before its hooks ran.
    pub fn paint(&self, canvas: &mut RecordingCanvas) -> Vec<(String, BlendMode)> {
        let mut starts = vec![];
        for drawable in self
            .stack
            .iter()
            .filter_map(|handle| self.drawables.get(handle))
            .filter(|drawable| drawable.visible)
        {
            starts.push((drawable.title.clone(), canvas.composite_operation()));
            match &drawable.hooks {
                Some(hooks) => hooks.paint(canvas, |canvas| canvas.fill(&drawable.title)),
                None => canvas.fill(&drawable.title),
            }
        }
        starts
    }
}

impl MapSurface for RecordingSurface {
    type Handle = DrawableId;

    fn add_drawable(&mut self, layer: &Layer) -> Self::Handle {
        let handle = DrawableId(self.next_id);
        self.next_id += 1;
        self.drawables.insert(handle, Drawable {
            title: layer.title().to_string(),
            content: layer.content().clone(),
            visible: layer.visible(),
            opacity: layer.opacity(),
            hooks: None,
        });
        self.stack.push(handle);
        handle
    }

    fn remove_drawable(&mut self, handle: &Self::Handle) {
        self.drawables.remove(handle);
        self.stack
            .retain(|entry| entry != handle);
    }

    fn set_draw_order(&mut self, handles: &[Self::Handle]) {
        self.stack.clear();
        self.stack
            .extend_from_slice(handles);
    }

    fn set_visible(&mut self, handle: &Self::Handle, visible: bool) {
        self.visibility_updates += 1;
        if let Some(drawable) = self.drawables.get_mut(handle) {
            drawable.visible = visible;
        }
    }

    fn set_opacity(&mut self, handle: &Self::Handle, opacity: f32) {
        if let Some(drawable) = self.drawables.get_mut(handle) {
            drawable.opacity = opacity;
        }
    }

    fn register_paint_hooks(&mut self, handle: &Self::Handle, hooks: PaintHooks) {
        if let Some(drawable) = self.drawables.get_mut(handle) {
            drawable.hooks = Some(hooks);
        }
    }

    fn unregister_paint_hooks(&mut self, handle: &Self::Handle) {
        if let Some(drawable) = self.drawables.get_mut(handle) {
            drawable.hooks = None;
        }
    }

    fn current_zoom(&self) -> Option<f64> {
        self.view
            .as_ref()
            .map(|view| view.zoom)
    }

    fn request_redraw(&mut self) {
        self.redraws += 1;
    }

    fn fit_extent(&mut self, extent: &Extent) {
        let mut view = self.view.clone().unwrap_or_default();
        view.fit_extent(extent, self.viewport);
        self.view = Some(view);
        self.fitted.push(extent.clone());
    }

    fn set_view(&mut self, center: Point2<f64>, zoom: f64) {
        let mut view = self.view.clone().unwrap_or_default();
        view.center = center;
        view.set_zoom(zoom);
        self.view = Some(view);
    }

    fn features_at_pixel(&self, _pixel: Point2<f64>) -> Vec<Feature> {
        self.hits.clone()
    }
}

/// Canvas that records the composite operation in effect for each fill.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    composite_operation: BlendMode,
    fills: Vec<(String, BlendMode)>,
}

impl RecordingCanvas {
    pub fn fill(&mut self, label: &str) {
        self.fills
            .push((label.to_string(), self.composite_operation));
    }

    pub fn fills(&self) -> &[(String, BlendMode)] {
        &self.fills
    }
}

impl CompositeContext for RecordingCanvas {
    fn composite_operation(&self) -> BlendMode {
        self.composite_operation
    }

    fn set_composite_operation(&mut self, mode: BlendMode) {
        self.composite_operation = mode;
    }
}

/// Panel that keeps the list entries, top first, and every message it was shown.
#[derive(Debug, Default)]
pub struct RecordingPanel {
    pub entries: Vec<(LayerId, String, bool)>,
    pub notices: Vec<String>,
    pub prompts: Vec<String>,
    pub feature_info: Option<String>,
    pub styles: HashMap<LayerId, (f32, BlendMode)>,
}

impl RecordingPanel {
    pub fn ids(&self) -> Vec<LayerId> {
        self.entries
            .iter()
            .map(|(id, _, _)| id.clone())
            .collect()
    }
}

impl LayerPanel for RecordingPanel {
    fn on_layer_added(&mut self, id: &LayerId, title: &str, visible: bool) {
        self.entries
            .insert(0, (id.clone(), title.to_string(), visible));
    }

    fn on_layer_removed(&mut self, id: &LayerId) {
        self.entries
            .retain(|(entry, _, _)| entry != id);
        self.styles.remove(id);
    }

    fn on_layer_style_changed(&mut self, id: &LayerId, opacity: f32, blend_mode: BlendMode) {
        self.styles
            .insert(id.clone(), (opacity, blend_mode));
    }

    fn notify(&mut self, message: &str) {
        self.notices
            .push(message.to_string());
    }

    fn request_confirmation(&mut self, prompt: &str) {
        self.prompts
            .push(prompt.to_string());
    }

    fn show_feature_info(&mut self, text: &str) {
        self.feature_info = Some(text.to_string());
    }
}

/// Geocoder answering from a fixed table.
#[derive(Debug, Default)]
pub struct StubGeocoder {
    pub places: HashMap<String, Place>,
    pub failure: Option<String>,
    queries: RefCell<Vec<String>>,
}

impl StubGeocoder {
    pub fn with_place(mut self, query: &str, place: Place) -> Self {
        self.places
            .insert(query.to_string(), place);
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl Geocoder for StubGeocoder {
    fn search(&self, query: &str) -> Result<Option<Place>, GeocodeError> {
        self.queries
            .borrow_mut()
            .push(query.to_string());
        if let Some(message) = &self.failure {
            return Err(GeocodeError::Unavailable(message.clone()));
        }
        Ok(self.places.get(query).cloned())
    }
}
