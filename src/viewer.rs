use std::path::Path;

use log::{debug, error, info, warn};
use nalgebra::Point2;
use serde::Deserialize;
use thiserror::Error;

use crate::blend::PaintHooks;
use crate::format::{decode_with_fallback, DecodeError, VectorFormat};
use crate::geocoding::{GeocodeError, Geocoder, Place};
use crate::geometry::projection::lon_lat_to_web_mercator;
use crate::geometry::{Feature, GeometryExt};
use crate::id::LayerId;
use crate::layer::{BlendMode, Layer, LayerContent, LayerSpec, VectorSource};
use crate::order::{apply_ui_order, sync_surface_order, ui_order_from_draw};
use crate::registry::{LayerRegistry, RegistryError};
use crate::sources::Project;
use crate::surface::{DroppedFile, LayerPanel, MapSurface, PanelEvent};
use crate::view::MapView;
use crate::visibility::{effective_visible, refresh_zoom_gated_layers};

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Unknown format file: {file_name}")]
    UnknownFormat {
        file_name: String,
        #[source]
        cause: DecodeError,
    },
    #[error("Unable to read file. file: {file_name}, cause: {cause}")]
    Io {
        file_name: String,
        #[source]
        cause: std::io::Error,
    },
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    #[error("No geocoder configured")]
    NoGeocoder,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewerConfiguration {
    /// Lon/lat, degrees.
    pub initial_center: [f64; 2],
    pub initial_zoom: f64,
    pub max_zoom: f64,
    /// Zoom level used when jumping to a search result.
    pub search_zoom: f64,
    pub geocoder_endpoint: String,
}

impl Default for ViewerConfiguration {
    fn default() -> Self {
        Self {
            initial_center: [138.7313889, 35.3622222],
            initial_zoom: 5.0,
            max_zoom: 18.0,
            search_zoom: 15.0,
            geocoder_endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
        }
    }
}

impl ViewerConfiguration {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn initial_view(&self) -> MapView {
        let [lon, lat] = self.initial_center;
        MapView::new(Point2::new(lon, lat), self.initial_zoom, self.max_zoom)
    }
}

/// What came of a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Empty query, nothing was sent.
    Skipped,
    NoResults,
    /// A place was found and the user was asked whether to jump to it.
    AwaitingConfirmation(Place),
}

/// Ties the layer registry to a rendering surface and a layer panel.
///
/// All mutation happens through `&mut self`, every operation completes before the next event is
/// handled and a failed operation leaves the previous state in place.
pub struct MapViewer<S: MapSurface, P: LayerPanel> {
    registry: LayerRegistry<S::Handle>,
    surface: S,
    panel: P,
    configuration: ViewerConfiguration,
    geocoder: Option<Box<dyn Geocoder>>,
    pending_jump: Option<Place>,
}

impl<S: MapSurface, P: LayerPanel> MapViewer<S, P> {
    pub fn new(surface: S, panel: P, configuration: ViewerConfiguration) -> Self {
        Self {
            registry: LayerRegistry::new(),
            surface,
            panel,
            configuration,
            geocoder: None,
            pending_jump: None,
        }
    }

    pub fn with_geocoder(self, geocoder: Box<dyn Geocoder>) -> Self {
        Self {
            geocoder: Some(geocoder),
            ..self
        }
    }

    pub fn registry(&self) -> &LayerRegistry<S::Handle> {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    pub fn configuration(&self) -> &ViewerConfiguration {
        &self.configuration
    }

    pub fn layer(&self, id: &LayerId) -> Result<&Layer, ViewerError> {
        Ok(self.registry.get(id)?)
    }

    /// Panel order: topmost layer first.
    pub fn ui_order(&self) -> Vec<LayerId> {
        ui_order_from_draw(self.registry.draw_order())
    }

    /// Registers the layer, puts its drawable on top of the stack with paint hooks attached and
    /// lists it at the top of the panel.
    pub fn add_layer(&mut self, spec: LayerSpec) -> Result<LayerId, ViewerError> {
        let layer = self.registry.prepare(spec)?;
        self.attach_layer(layer)
    }

    fn attach_layer(&mut self, layer: Layer) -> Result<LayerId, ViewerError> {
        let handle = self.surface.add_drawable(&layer);
        self.surface
            .register_paint_hooks(&handle, PaintHooks::for_layer(&layer));
        self.surface
            .set_opacity(&handle, layer.opacity());

        let id = layer.id().clone();
        let title = layer.title().to_string();
        let visible = layer.visible();
        let opacity = layer.opacity();
        let blend_mode = layer.blend_mode();
        let zoom_gated = layer.is_zoom_gated();
        if !zoom_gated {
            self.surface
                .set_visible(&handle, visible);
        }

        if let Err(e) = self
            .registry
            .insert(layer, handle.clone())
        {
            self.surface
                .unregister_paint_hooks(&handle);
            self.surface.remove_drawable(&handle);
            return Err(e.into());
        }
        self.panel
            .on_layer_added(&id, &title, visible);
        self.panel
            .on_layer_style_changed(&id, opacity, blend_mode);

        if zoom_gated {
            refresh_zoom_gated_layers(&self.registry, &mut self.surface);
        }
        Ok(id)
    }

    /// Detaches the paint hooks, drops the drawable, the record and the panel entry.
    pub fn remove_layer(&mut self, id: &LayerId) -> Result<(), ViewerError> {
        let (layer, handle) = self.registry.remove(id)?;

        self.surface
            .unregister_paint_hooks(&handle);
        self.surface
            .remove_drawable(&handle);
        self.panel.on_layer_removed(id);
        self.surface.request_redraw();

        debug!("Layer removed from surface and panel. id: {}, title: '{}'", id, layer.title());
        Ok(())
    }

    /// Adds the project's layers in order. Every layer is validated before the first one is
    /// attached, a rejected layer leaves the viewer as it was.
    pub fn load_project(&mut self, project: Project) -> Result<Vec<LayerId>, ViewerError> {
        info!("Loading project. layers: {}", project.layers.len());
        let layers = self
            .registry
            .prepare_all(project.layers)?;
        layers
            .into_iter()
            .map(|layer| self.attach_layer(layer))
            .collect()
    }

    /// Checkbox toggle. Zoom-gated layers defer to the visibility policy for the final answer.
    pub fn set_visibility(&mut self, id: &LayerId, visible: bool) -> Result<(), ViewerError> {
        let layer = self.registry.get_mut(id)?;
        layer.set_visible(visible);
        let zoom_gated = layer.is_zoom_gated();

        match zoom_gated {
            true => refresh_zoom_gated_layers(&self.registry, &mut self.surface),
            false => {
                let handle = self.registry.handle(id)?;
                self.surface
                    .set_visible(handle, visible);
            }
        }
        Ok(())
    }

    /// The visibility the surface was last told for this layer.
    pub fn effective_visibility(&self, id: &LayerId) -> Result<bool, ViewerError> {
        let layer = self.registry.get(id)?;
        Ok(effective_visible(layer, self.surface.current_zoom()))
    }

    pub fn set_opacity(&mut self, id: &LayerId, opacity: f32) -> Result<(), ViewerError> {
        self.registry
            .set_opacity(id, opacity)?;
        let handle = self.registry.handle(id)?;
        self.surface
            .set_opacity(handle, opacity);
        let blend_mode = self.registry.get(id)?.blend_mode();
        self.panel
            .on_layer_style_changed(id, opacity, blend_mode);
        Ok(())
    }

    pub fn toggle_blend_mode(&mut self, id: &LayerId) -> Result<BlendMode, ViewerError> {
        let blend_mode = self
            .registry
            .toggle_blend_mode(id)?;
        // blend mode is read at paint time, nothing changes until the next paint pass
        self.surface.request_redraw();
        let opacity = self.registry.get(id)?.opacity();
        self.panel
            .on_layer_style_changed(id, opacity, blend_mode);
        Ok(blend_mode)
    }

    /// Applies the panel's order, topmost first.
    pub fn apply_ui_order(&mut self, ui_ids: &[LayerId]) -> Result<(), ViewerError> {
        apply_ui_order(&mut self.registry, &mut self.surface, ui_ids)?;
        Ok(())
    }

    /// Sets the draw order directly, bottom first.
    pub fn reorder(&mut self, draw_ids: Vec<LayerId>) -> Result<(), ViewerError> {
        self.registry.reorder(draw_ids)?;
        sync_surface_order(&self.registry, &mut self.surface);
        Ok(())
    }

    /// Must be called whenever the surface's zoom level changes.
    pub fn zoom_changed(&mut self) {
        debug!("Zoom changed. zoom: {:?}", self.surface.current_zoom());
        refresh_zoom_gated_layers(&self.registry, &mut self.surface);
    }

    pub fn zoom_to_layer(&mut self, id: &LayerId) -> Result<(), ViewerError> {
        let layer = self.registry.get(id)?;
        match layer.extent() {
            Some(extent) => self.surface.fit_extent(&extent),
            None => debug!("Layer has no extent to zoom to. id: {}", id),
        }
        Ok(())
    }

    /// Decodes the text with the candidates for the file's extension and adds the result as a
    /// layer titled with the file name, then fits the view to it.
    pub fn load_layer_from_text(&mut self, file_name: &str, text: &str) -> Result<LayerId, ViewerError> {
        let candidates = VectorFormat::candidates_for_file_name(file_name);
        let (format, mut features) = match decode_with_fallback(text, &candidates) {
            Ok(decoded) => decoded,
            Err(cause) => {
                let e = ViewerError::UnknownFormat {
                    file_name: file_name.to_string(),
                    cause,
                };
                warn!("{}", e);
                self.panel.notify(&e.to_string());
                return Err(e);
            }
        };

        for geometry in features
            .iter_mut()
            .filter_map(|feature| feature.geometry.as_mut())
        {
            geometry.apply_transform(&lon_lat_to_web_mercator);
        }

        info!(
            "Loaded file. file: {}, format: {}, features: {}",
            file_name,
            format,
            features.len()
        );

        let spec = LayerSpec::new(LayerContent::Vector(VectorSource::new(features))).with_title(file_name);
        let id = self.add_layer(spec)?;
        self.zoom_to_layer(&id)?;
        Ok(id)
    }

    pub fn load_layer_from_path(&mut self, path: &Path) -> Result<LayerId, ViewerError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(cause) => {
                let e = ViewerError::Io {
                    file_name,
                    cause,
                };
                error!("{}", e);
                self.panel.notify(&e.to_string());
                return Err(e);
            }
        };

        self.load_layer_from_text(&file_name, &text)
    }

    pub fn load_dropped_file(&mut self, file: &DroppedFile) -> Result<LayerId, ViewerError> {
        match (&file.bytes, &file.path) {
            (Some(bytes), _) => {
                let text = String::from_utf8_lossy(bytes);
                self.load_layer_from_text(&file.name, &text)
            }
            (None, Some(path)) => self.load_layer_from_path(path),
            (None, None) => {
                let e = ViewerError::Io {
                    file_name: file.name.clone(),
                    cause: std::io::Error::new(std::io::ErrorKind::NotFound, "dropped file has no contents"),
                };
                self.panel.notify(&e.to_string());
                Err(e)
            }
        }
    }

    /// Runs the search with the configured geocoder and hands the result to
    /// [`MapViewer::apply_search_result`]. Failures are reported once, never retried.
    pub fn search(&mut self, query: &str) -> Result<SearchOutcome, ViewerError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchOutcome::Skipped);
        }

        let geocoder = self
            .geocoder
            .as_ref()
            .ok_or(ViewerError::NoGeocoder)?;
        let result = match geocoder.search(query) {
            Ok(result) => result,
            Err(e) => {
                error!("Search failed. query: '{}', cause: {}", query, e);
                self.panel
                    .notify(&format!("Search failed for '{}'.", query));
                return Err(e.into());
            }
        };

        Ok(self.apply_search_result(query, result))
    }

    /// For hosts that run the geocoder themselves. A place is held until the user confirms or
    /// declines the jump.
    pub fn apply_search_result(&mut self, query: &str, result: Option<Place>) -> SearchOutcome {
        match result {
            None => {
                info!("No search results. query: '{}'", query);
                self.panel
                    .notify(&format!("No search results for '{}'.", query));
                SearchOutcome::NoResults
            }
            Some(place) => {
                self.panel
                    .request_confirmation(&place.confirmation_prompt());
                self.pending_jump = Some(place.clone());
                SearchOutcome::AwaitingConfirmation(place)
            }
        }
    }

    pub fn pending_jump(&self) -> Option<&Place> {
        self.pending_jump.as_ref()
    }

    /// Recenters on the pending search result, if any.
    pub fn confirm_jump(&mut self) {
        let Some(place) = self.pending_jump.take() else {
            return;
        };
        let center = lon_lat_to_web_mercator(Point2::new(place.lon, place.lat));
        info!("Jumping to search result. name: '{}', lon: {}, lat: {}", place.display_name, place.lon, place.lat);
        self.surface
            .set_view(center, self.configuration.search_zoom);
        self.zoom_changed();
    }

    pub fn decline_jump(&mut self) {
        if let Some(place) = self.pending_jump.take() {
            debug!("Jump declined. name: '{}'", place.display_name);
        }
    }

    /// Shows the names of the features under the pixel, comma separated.
    pub fn display_feature_info(&mut self, pixel: Point2<f64>) {
        let features = self.surface.features_at_pixel(pixel);
        let text = feature_info_text(&features);
        self.panel.show_feature_info(&text);
    }

    /// Dispatches a panel action. Errors have already been logged; they are returned so hosts
    /// can react too.
    pub fn handle_panel_event(&mut self, event: PanelEvent) -> Result<(), ViewerError> {
        debug!("Panel event. event: {:?}", event);
        match event {
            PanelEvent::ReorderRequested(ids) => self.apply_ui_order(&ids),
            PanelEvent::VisibilityToggled(id, visible) => self.set_visibility(&id, visible),
            PanelEvent::OpacityChanged(id, opacity) => self.set_opacity(&id, opacity),
            PanelEvent::BlendToggled(id) => self
                .toggle_blend_mode(&id)
                .map(|_| ()),
            PanelEvent::RemoveRequested(id) => self.remove_layer(&id),
            PanelEvent::ZoomToLayer(id) => self.zoom_to_layer(&id),
            PanelEvent::FileDropped(file) => self
                .load_dropped_file(&file)
                .map(|_| ()),
            PanelEvent::SearchSubmitted(query) => self.search(&query).map(|_| ()),
            PanelEvent::JumpConfirmed => {
                self.confirm_jump();
                Ok(())
            }
            PanelEvent::JumpDeclined => {
                self.decline_jump();
                Ok(())
            }
        }
    }
}

/// Names of the features, comma separated. An unnamed feature keeps its slot as an empty name.
pub fn feature_info_text(features: &[Feature]) -> String {
    features
        .iter()
        .map(|feature| feature.name().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}
