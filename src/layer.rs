use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::geometry::{features_extent, Extent, Feature};
use crate::id::LayerId;

pub const DEFAULT_TITLE: &str = "no title";

/// Canvas compositing operation used while a layer paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    SourceOver,
    Multiply,
}

impl BlendMode {
    pub fn toggled(self) -> Self {
        match self {
            BlendMode::SourceOver => BlendMode::Multiply,
            BlendMode::Multiply => BlendMode::SourceOver,
        }
    }

    /// The canvas `globalCompositeOperation` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlendMode::SourceOver => "source-over",
            BlendMode::Multiply => "multiply",
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raster XYZ tiles, `url` contains `{z}`, `{x}` and `{y}` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSource {
    pub url: String,
    pub attribution: Option<String>,
}

/// GeoJSON vector tiles served on a fixed tile grid.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorTileSource {
    pub url: String,
    pub attribution: Option<String>,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

/// Features held in memory, already in map projection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorSource {
    pub features: Vec<Feature>,
}

impl VectorSource {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
        }
    }

    pub fn extent(&self) -> Extent {
        features_extent(&self.features)
    }
}

/// What a layer draws. The surface builds its drawable from this.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    Tile(TileSource),
    Vector(VectorSource),
    VectorTile(VectorTileSource),
}

/// Request to create a layer. Unset fields get their defaults when the layer is registered.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: Option<LayerId>,
    pub title: Option<String>,
    pub blend_mode: Option<BlendMode>,
    pub visible: bool,
    pub opacity: f32,
    /// When set the layer is zoom-gated, it only renders at or above this zoom level.
    pub min_zoom: Option<f64>,
    pub content: LayerContent,
}

impl LayerSpec {
    pub fn new(content: LayerContent) -> Self {
        Self {
            id: None,
            title: None,
            blend_mode: None,
            visible: true,
            opacity: 1.0,
            min_zoom: None,
            content,
        }
    }

    pub fn with_id(self, id: impl Into<LayerId>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    pub fn with_blend_mode(self, blend_mode: BlendMode) -> Self {
        Self {
            blend_mode: Some(blend_mode),
            ..self
        }
    }

    pub fn with_visible(self, visible: bool) -> Self {
        Self {
            visible,
            ..self
        }
    }

    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            opacity,
            ..self
        }
    }

    pub fn with_min_zoom(self, min_zoom: f64) -> Self {
        Self {
            min_zoom: Some(min_zoom),
            ..self
        }
    }
}

/// A registered layer.
///
/// The blend mode lives in a shared cell so that the paint hooks registered with the surface
/// read the current value at paint time.
#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    title: String,
    blend_mode: Rc<Cell<BlendMode>>,
    visible: bool,
    opacity: f32,
    min_zoom: Option<f64>,
    content: LayerContent,
}

impl Layer {
    pub(crate) fn from_spec(id: LayerId, spec: LayerSpec) -> Self {
        let LayerSpec {
            title,
            blend_mode,
            visible,
            opacity,
            min_zoom,
            content,
            ..
        } = spec;

        Self {
            id,
            title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            blend_mode: Rc::new(Cell::new(blend_mode.unwrap_or_default())),
            visible,
            opacity,
            min_zoom,
            content,
        }
    }

    pub fn id(&self) -> &LayerId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode.get()
    }

    pub(crate) fn shared_blend_mode(&self) -> Rc<Cell<BlendMode>> {
        Rc::clone(&self.blend_mode)
    }

    pub(crate) fn set_blend_mode(&self, blend_mode: BlendMode) {
        self.blend_mode.set(blend_mode);
    }

    /// The manual (checkbox) visibility. See `visibility::effective_visible` for what is rendered.
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub(crate) fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
    }

    pub fn min_zoom(&self) -> Option<f64> {
        self.min_zoom
    }

    pub fn is_zoom_gated(&self) -> bool {
        self.min_zoom.is_some()
    }

    pub fn content(&self) -> &LayerContent {
        &self.content
    }

    /// Extent of in-memory features, `None` for tiled content or when there is nothing to show.
    pub fn extent(&self) -> Option<Extent> {
        match &self.content {
            LayerContent::Vector(source) => Some(source.extent()).filter(|extent| !extent.is_empty()),
            LayerContent::Tile(_) | LayerContent::VectorTile(_) => None,
        }
    }
}

#[cfg(test)]
mod layer_tests {
    use geo_types::point;
    use nalgebra::Point2;

    use super::*;

    fn tile_content() -> LayerContent {
        LayerContent::Tile(TileSource {
            url: "https://tiles.example/{z}/{x}/{y}.png".to_string(),
            attribution: None,
        })
    }

    #[test]
    fn unset_fields_get_defaults() {
        // when
        let layer = Layer::from_spec(LayerId::from("L0"), LayerSpec::new(tile_content()));

        // then
        assert_eq!(layer.title(), DEFAULT_TITLE);
        assert_eq!(layer.blend_mode(), BlendMode::SourceOver);
        assert!(layer.visible());
        assert_eq!(layer.opacity(), 1.0);
        assert!(!layer.is_zoom_gated());
    }

    #[test]
    fn explicit_fields_are_kept() {
        // given
        let spec = LayerSpec::new(tile_content())
            .with_title("relief")
            .with_blend_mode(BlendMode::Multiply)
            .with_visible(false)
            .with_opacity(0.25)
            .with_min_zoom(16.0);

        // when
        let layer = Layer::from_spec(LayerId::from("L7"), spec);

        // then
        assert_eq!(layer.id().as_str(), "L7");
        assert_eq!(layer.title(), "relief");
        assert_eq!(layer.blend_mode(), BlendMode::Multiply);
        assert!(!layer.visible());
        assert_eq!(layer.opacity(), 0.25);
        assert_eq!(layer.min_zoom(), Some(16.0));
    }

    #[test]
    fn blend_mode_changes_are_seen_through_the_shared_cell() {
        // given
        let layer = Layer::from_spec(LayerId::from("L0"), LayerSpec::new(tile_content()));
        let shared = layer.shared_blend_mode();

        // when
        layer.set_blend_mode(BlendMode::Multiply);

        // then
        assert_eq!(shared.get(), BlendMode::Multiply);
    }

    #[test]
    fn extent_only_for_non_empty_vector_content() {
        let empty = Layer::from_spec(
            LayerId::from("L0"),
            LayerSpec::new(LayerContent::Vector(VectorSource::default())),
        );
        let point = Layer::from_spec(
            LayerId::from("L1"),
            LayerSpec::new(LayerContent::Vector(VectorSource::new(vec![Feature::new(point!(x: 1.0, y: 2.0))]))),
        );
        let tiles = Layer::from_spec(LayerId::from("L2"), LayerSpec::new(tile_content()));

        assert_eq!(empty.extent(), None);
        assert_eq!(point.extent().map(|extent| extent.center()), Some(Point2::new(1.0, 2.0)));
        assert_eq!(tiles.extent(), None);
    }

    #[test]
    fn blend_mode_toggles_between_the_two_modes() {
        assert_eq!(BlendMode::SourceOver.toggled(), BlendMode::Multiply);
        assert_eq!(BlendMode::Multiply.toggled(), BlendMode::SourceOver);
        assert_eq!(BlendMode::Multiply.to_string(), "multiply");
    }
}
