use std::collections::BTreeMap;

use crate::layer::{LayerContent, LayerSpec, TileSource, VectorTileSource};

/// An entry a data source can create a layer from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    pub id: &'static str,
    pub title: &'static str,
}

/// A provider of ready-made layers.
pub trait DataSource {
    fn list(&self) -> Vec<SourceEntry>;

    /// `None` for an unknown sub-source id.
    fn create_layer(&self, sub_id: &str) -> Option<LayerSpec>;
}

/// Data sources by name.
#[derive(Default)]
pub struct DataSources {
    sources: BTreeMap<String, Box<dyn DataSource>>,
}

impl DataSources {
    /// All built-in sources.
    pub fn builtin() -> Self {
        let mut sources = Self::default();
        sources.register("GSITiles", Box::new(GsiTiles));
        sources
    }

    pub fn register(&mut self, name: &str, source: Box<dyn DataSource>) {
        self.sources
            .insert(name.to_string(), source);
    }

    pub fn get(&self, name: &str) -> Option<&dyn DataSource> {
        self.sources
            .get(name)
            .map(|source| source.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources
            .keys()
            .map(String::as_str)
    }
}

const GSI_ATTRIBUTION: &str =
    "<a href='http://maps.gsi.go.jp/development/ichiran.html' target='_blank'>地理院タイル</a>";

/// Tiles published by the Geospatial Information Authority of Japan.
#[derive(Debug, Default, Clone, Copy)]
pub struct GsiTiles;

impl GsiTiles {
    pub const STANDARD: &'static str = "std";
    pub const RELIEF: &'static str = "relief";
    pub const PHOTO: &'static str = "ort";
    /// Experimental road centre line vector tiles, only published at zoom 16.
    pub const ROAD_CENTER_LINES: &'static str = "experimental_rdcl";

    const ROAD_CENTER_LINES_ZOOM: u8 = 16;
}

impl DataSource for GsiTiles {
    fn list(&self) -> Vec<SourceEntry> {
        vec![
            SourceEntry {
                id: Self::STANDARD,
                title: "地理院地図 (標準地図)",
            },
            SourceEntry {
                id: Self::RELIEF,
                title: "色別標高図",
            },
            SourceEntry {
                id: Self::PHOTO,
                title: "写真",
            },
            SourceEntry {
                id: Self::ROAD_CENTER_LINES,
                title: "道路中心線 (z>=16)",
            },
        ]
    }

    fn create_layer(&self, sub_id: &str) -> Option<LayerSpec> {
        let entry = self
            .list()
            .into_iter()
            .find(|entry| entry.id == sub_id)?;

        let spec = match sub_id {
            Self::ROAD_CENTER_LINES => LayerSpec::new(LayerContent::VectorTile(VectorTileSource {
                url: format!("http://cyberjapandata.gsi.go.jp/xyz/{}/{{z}}/{{x}}/{{y}}.geojson", sub_id),
                attribution: Some(GSI_ATTRIBUTION.to_string()),
                min_zoom: Self::ROAD_CENTER_LINES_ZOOM,
                max_zoom: Self::ROAD_CENTER_LINES_ZOOM,
            }))
            .with_min_zoom(Self::ROAD_CENTER_LINES_ZOOM as f64),
            _ => {
                let extension = match sub_id {
                    Self::PHOTO => "jpg",
                    _ => "png",
                };
                LayerSpec::new(LayerContent::Tile(TileSource {
                    url: format!("http://cyberjapandata.gsi.go.jp/xyz/{}/{{z}}/{{x}}/{{y}}.{}", sub_id, extension),
                    attribution: Some(GSI_ATTRIBUTION.to_string()),
                }))
            }
        };

        Some(spec.with_title(entry.title))
    }
}

/// A set of layers to add in order, the last one ends up on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Project {
    pub layers: Vec<LayerSpec>,
}

impl Project {
    /// The startup layers: the standard map, plus hidden relief, photo and road centre line layers.
    pub fn default_project() -> Self {
        let gsi = GsiTiles;
        let layers = [
            (GsiTiles::STANDARD, true),
            (GsiTiles::RELIEF, false),
            (GsiTiles::PHOTO, false),
            (GsiTiles::ROAD_CENTER_LINES, false),
        ]
        .into_iter()
        .filter_map(|(sub_id, visible)| {
            gsi.create_layer(sub_id)
                .map(|spec| spec.with_visible(visible))
        })
        .collect();

        Self {
            layers,
        }
    }
}
