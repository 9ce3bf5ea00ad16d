use log::debug;
use nalgebra::{Point2, Vector2};

use crate::geometry::projection::lon_lat_to_web_mercator;
use crate::geometry::Extent;

/// Resolution at zoom level 0 for 256 pixel web mercator tiles, in metres per pixel.
pub const ZOOM_0_RESOLUTION: f64 = 156_543.033_928_040_97;

/// Center and zoom of a web mercator map view.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    /// Web mercator metres.
    pub center: Point2<f64>,
    pub zoom: f64,
    pub max_zoom: f64,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: Point2::origin(),
            zoom: 0.0,
            max_zoom: 18.0,
        }
    }
}

impl MapView {
    pub fn new(center_lon_lat: Point2<f64>, zoom: f64, max_zoom: f64) -> Self {
        let mut view = Self {
            center: lon_lat_to_web_mercator(center_lon_lat),
            zoom: 0.0,
            max_zoom,
        };
        view.set_zoom(zoom);
        view
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(0.0, self.max_zoom);
    }

    /// Metres per pixel.
    pub fn resolution(&self) -> f64 {
        resolution_for_zoom(self.zoom)
    }

    pub fn set_resolution(&mut self, resolution: f64) {
        self.set_zoom(zoom_for_resolution(resolution));
    }

    pub fn center_on_lon_lat(&mut self, lon_lat: Point2<f64>, zoom: f64) {
        self.center = lon_lat_to_web_mercator(lon_lat);
        self.set_zoom(zoom);
    }

    /// Centers the view on the extent and picks the zoom at which it fits the viewport.
    ///
    /// A zero-sized extent (a single point) zooms to `max_zoom`.
    pub fn fit_extent(&mut self, extent: &Extent, viewport: Vector2<f64>) {
        if extent.is_empty() {
            return;
        }

        let resolution = f64::max(extent.width() / viewport.x, extent.height() / viewport.y);
        self.center = extent.center();
        match resolution > 0.0 {
            true => self.set_resolution(resolution),
            false => self.set_zoom(self.max_zoom),
        }

        debug!(
            "Fit view. center: {:?}, resolution: {:.4}, zoom: {:.2}",
            self.center, resolution, self.zoom
        );
    }
}

pub fn resolution_for_zoom(zoom: f64) -> f64 {
    ZOOM_0_RESOLUTION / 2.0_f64.powf(zoom)
}

pub fn zoom_for_resolution(resolution: f64) -> f64 {
    (ZOOM_0_RESOLUTION / resolution).log2()
}

#[cfg(test)]
mod view_tests {
    use nalgebra::{Point2, Vector2};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0.0, ZOOM_0_RESOLUTION)]
    #[case(1.0, ZOOM_0_RESOLUTION / 2.0)]
    #[case(15.0, 4.777_314_267_823_516)]
    fn resolution_halves_per_zoom_level(#[case] zoom: f64, #[case] expected: f64) {
        assert!((resolution_for_zoom(zoom) - expected).abs() < 1e-9);
        assert!((zoom_for_resolution(expected) - zoom).abs() < 1e-9);
    }

    #[test]
    fn zoom_is_clamped_to_max() {
        let mut view = MapView::default();
        view.set_zoom(25.0);
        assert_eq!(view.zoom, 18.0);
    }

    #[test]
    fn fit_extent_centers_and_zooms() {
        // given
        let mut view = MapView::default();
        let extent = Extent {
            min: Point2::new(0.0, 0.0),
            max: Point2::new(8_000.0, 3_000.0),
        };

        // when
        view.fit_extent(&extent, Vector2::new(800.0, 600.0));

        // then
        assert_eq!(view.center, Point2::new(4_000.0, 1_500.0));
        assert!((view.resolution() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn fit_point_extent_zooms_to_max() {
        let mut view = MapView::default();
        let extent = Extent::from_points(&[Point2::new(5.0, 5.0)]);

        view.fit_extent(&extent, Vector2::new(800.0, 600.0));

        assert_eq!(view.center, Point2::new(5.0, 5.0));
        assert_eq!(view.zoom, view.max_zoom);
    }

    #[test]
    fn fit_empty_extent_is_ignored() {
        let mut view = MapView::default();
        view.fit_extent(&Extent::default(), Vector2::new(800.0, 600.0));
        assert_eq!(view, MapView::default());
    }
}
