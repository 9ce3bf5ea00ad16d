use log::{debug, trace};

use crate::layer::Layer;
use crate::registry::LayerRegistry;
use crate::surface::MapSurface;

/// The visibility actually passed to the surface.
///
/// Zoom-gated layers additionally need `zoom >= min_zoom`; an unknown zoom hides them.
pub fn effective_visible(layer: &Layer, zoom: Option<f64>) -> bool {
    match layer.min_zoom() {
        None => layer.visible(),
        Some(min_zoom) => layer.visible() && zoom.is_some_and(|zoom| zoom >= min_zoom),
    }
}

/// Recomputes every zoom-gated layer against the surface's current zoom and pushes the result.
///
/// Must run on every zoom change and on every checkbox toggle of a zoom-gated layer.
#[profiling::function]
pub fn refresh_zoom_gated_layers<S: MapSurface>(registry: &LayerRegistry<S::Handle>, surface: &mut S) {
    let zoom = surface.current_zoom();
    debug!("Refreshing zoom-gated layers. zoom: {:?}", zoom);

    let updates = registry
        .zoom_gated()
        .map(|(layer, handle)| {
            let visible = effective_visible(layer, zoom);
            trace!(
                "Zoom-gated layer. id: {}, visible: {}, min_zoom: {:?}, effective: {}",
                layer.id(),
                layer.visible(),
                layer.min_zoom(),
                visible
            );
            (handle.clone(), visible)
        })
        .collect::<Vec<_>>();

    for (handle, visible) in updates {
        surface.set_visible(&handle, visible);
    }
}

#[cfg(test)]
mod visibility_tests {
    use rstest::rstest;

    use super::*;
    use crate::layer::{LayerContent, LayerSpec, VectorTileSource};
    use crate::testing::RecordingSurface;

    fn gated(visible: bool) -> LayerSpec {
        LayerSpec::new(LayerContent::VectorTile(VectorTileSource {
            url: "https://tiles.example/{z}/{x}/{y}.geojson".to_string(),
            attribution: None,
            min_zoom: 16,
            max_zoom: 16,
        }))
        .with_visible(visible)
        .with_min_zoom(16.0)
    }

    fn layer(spec: LayerSpec) -> Layer {
        let mut registry = LayerRegistry::<()>::new();
        registry
            .prepare(spec)
            .unwrap()
    }

    #[rstest]
    #[case(Some(15.0), false)]
    #[case(Some(15.99), false)]
    #[case(Some(16.0), true)]
    #[case(Some(20.0), true)]
    #[case(None, false)]
    fn gated_visible_layer_follows_zoom(#[case] zoom: Option<f64>, #[case] expected: bool) {
        assert_eq!(effective_visible(&layer(gated(true)), zoom), expected);
    }

    #[rstest]
    #[case(Some(0.0))]
    #[case(Some(16.0))]
    #[case(Some(20.0))]
    #[case(None)]
    fn gated_hidden_layer_is_never_visible(#[case] zoom: Option<f64>) {
        assert!(!effective_visible(&layer(gated(false)), zoom));
    }

    #[rstest]
    #[case(true, None)]
    #[case(true, Some(3.0))]
    #[case(false, Some(18.0))]
    fn normal_layer_ignores_zoom(#[case] visible: bool, #[case] zoom: Option<f64>) {
        let spec = gated(visible);
        let spec = LayerSpec {
            min_zoom: None,
            ..spec
        };

        assert_eq!(effective_visible(&layer(spec), zoom), visible);
    }

    #[test]
    fn refresh_only_touches_zoom_gated_layers() {
        // given
        let mut surface = RecordingSurface::default();
        let mut registry = LayerRegistry::new();
        let roads = registry
            .add(gated(true).with_id("roads"), |layer| surface.add_drawable(layer))
            .unwrap();
        let base = registry
            .add(LayerSpec { min_zoom: None, ..gated(false) }, |layer| surface.add_drawable(layer))
            .unwrap();
        let roads_handle = *registry.handle(&roads).unwrap();
        let base_handle = *registry.handle(&base).unwrap();

        // when
        surface.set_zoom(Some(17.0));
        refresh_zoom_gated_layers(&registry, &mut surface);

        // then
        assert_eq!(surface.drawable(roads_handle).map(|d| d.visible), Some(true));
        assert_eq!(surface.drawable(base_handle).map(|d| d.visible), Some(false));
        assert_eq!(surface.visibility_updates(), 1);

        // when
        surface.set_zoom(Some(12.0));
        refresh_zoom_gated_layers(&registry, &mut surface);

        // then
        assert_eq!(surface.drawable(roads_handle).map(|d| d.visible), Some(false));
        assert_eq!(surface.visibility_updates(), 2);
    }
}
