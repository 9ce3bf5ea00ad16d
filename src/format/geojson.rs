use geojson::feature::Id;
use geojson::GeoJson;
use serde_json::Value;

use super::DecodeError;
use crate::geometry::{Feature, Geometry};

/// A feature collection, a single feature or a bare geometry. A bare geometry becomes one
/// feature without properties.
pub(super) fn read_features(text: &str) -> Result<Vec<Feature>, DecodeError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .map(read_feature)
            .collect(),
        GeoJson::Feature(feature) => Ok(vec![read_feature(feature)?]),
        GeoJson::Geometry(geometry) => Ok(vec![Feature::new(Geometry::try_from(geometry)?)]),
    }
}

fn read_feature(feature: geojson::Feature) -> Result<Feature, DecodeError> {
    let geometry = feature
        .geometry
        .map(Geometry::try_from)
        .transpose()?;

    let mut properties = feature
        .properties
        .unwrap_or_default();
    if let Some(id) = feature.id {
        let id = match id {
            Id::String(value) => Value::String(value),
            Id::Number(value) => Value::Number(value),
        };
        properties
            .entry("id")
            .or_insert(id);
    }

    Ok(Feature {
        geometry,
        properties,
    })
}

#[cfg(test)]
mod geojson_tests {
    use geo_types::point;

    use super::*;

    #[test]
    fn feature_collection() {
        // given
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "id": 7, "properties": { "name": "summit" },
                  "geometry": { "type": "Point", "coordinates": [138.73, 35.36, 3776] } },
                { "type": "Feature", "properties": null,
                  "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] } },
                { "type": "Feature", "properties": {}, "geometry": null }
            ]
        }"#;

        // when
        let features = read_features(text).unwrap();

        // then
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].geometry, Some(Geometry::Point(point!(x: 138.73, y: 35.36))));
        assert_eq!(features[0].name(), Some("summit"));
        assert_eq!(features[0].properties.get("id"), Some(&Value::from(7)));
        assert!(matches!(&features[1].geometry, Some(Geometry::Polygon(polygon)) if polygon.exterior().0.len() == 4));
        assert_eq!(features[2].geometry, None);
    }

    #[test]
    fn bare_geometry_becomes_one_feature() {
        let text = r#"{ "type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]], [[2, 2], [3, 3]]] }"#;

        let features = read_features(text).unwrap();

        assert_eq!(features.len(), 1);
        assert!(matches!(&features[0].geometry, Some(Geometry::MultiLineString(lines)) if lines.0.len() == 2));
    }

    #[test]
    fn geometry_collection_is_nested() {
        let text = r#"{ "type": "GeometryCollection", "geometries": [
            { "type": "Point", "coordinates": [1, 2] },
            { "type": "MultiPolygon", "coordinates": [[[[0, 0], [1, 0], [0, 1], [0, 0]]]] }
        ] }"#;

        let features = read_features(text).unwrap();

        match &features[0].geometry {
            Some(Geometry::GeometryCollection(collection)) => assert_eq!(collection.0.len(), 2),
            other => panic!("unexpected geometry: {:?}", other),
        }
    }

    #[test]
    fn topology_is_rejected() {
        let result = read_features(r#"{ "type": "Topology", "objects": {}, "arcs": [] }"#);
        assert!(matches!(result, Err(DecodeError::GeoJson(_))));
    }

    #[test]
    fn not_json_is_rejected() {
        assert!(matches!(read_features("<gpx/>"), Err(DecodeError::GeoJson(_))));
    }
}
