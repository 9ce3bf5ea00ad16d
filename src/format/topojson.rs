//! TopoJSON topologies: shared arcs, optionally quantized and delta-encoded.

use geo_types::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point};
use serde_json::{Map, Value};

use super::DecodeError;
use crate::geometry::{polygon_from_rings, Feature, Geometry};

type Arc = Vec<Coord<f64>>;

fn type_of(value: &Value) -> Result<&str, DecodeError> {
    value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::structure("object without 'type'"))
}

/// `[x, y]` or `[x, y, z, ...]`, extra ordinates are dropped.
fn position(value: &Value) -> Result<Coord<f64>, DecodeError> {
    let ordinates = as_array(value)?;
    match (
        ordinates.first().and_then(Value::as_f64),
        ordinates.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Coord {
            x,
            y,
        }),
        _ => Err(DecodeError::structure("position needs two numbers")),
    }
}

/// Maps quantized integer positions back to real coordinates.
#[derive(Debug, Clone, Copy)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

impl Transform {
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let pair = |key: &str| -> Result<[f64; 2], DecodeError> {
            let point = value
                .get(key)
                .map(position)
                .transpose()?
                .ok_or_else(|| DecodeError::structure(format!("transform without '{}'", key)))?;
            Ok([point.x, point.y])
        };
        Ok(Self {
            scale: pair("scale")?,
            translate: pair("translate")?,
        })
    }

    fn apply(&self, point: Coord<f64>) -> Coord<f64> {
        Coord {
            x: point.x * self.scale[0] + self.translate[0],
            y: point.y * self.scale[1] + self.translate[1],
        }
    }
}

pub(super) fn read_features(text: &str) -> Result<Vec<Feature>, DecodeError> {
    let root: Value = serde_json::from_str(text)?;
    if type_of(&root)? != "Topology" {
        return Err(DecodeError::structure("expected a Topology"));
    }

    let transform = root
        .get("transform")
        .map(Transform::from_value)
        .transpose()?;
    let arcs = read_arcs(&root, transform)?;

    let objects = root
        .get("objects")
        .and_then(Value::as_object)
        .ok_or_else(|| DecodeError::structure("Topology without 'objects'"))?;

    let mut features = vec![];
    for object in objects.values() {
        read_object(object, &arcs, transform, &mut features)?;
    }
    Ok(features)
}

/// Decodes every arc to absolute coordinates. Quantized arcs are delta-encoded, each position
/// after the first is relative to the previous one.
fn read_arcs(root: &Value, transform: Option<Transform>) -> Result<Vec<Arc>, DecodeError> {
    let Some(arcs) = root.get("arcs") else {
        return Ok(vec![]);
    };
    let arcs = arcs
        .as_array()
        .ok_or_else(|| DecodeError::structure("'arcs' is not an array"))?;

    arcs.iter()
        .map(|arc| -> Result<Arc, DecodeError> {
            let positions = arc
                .as_array()
                .ok_or_else(|| DecodeError::structure("arc is not an array"))?;
            let mut cursor = Coord::zero();
            positions
                .iter()
                .map(|value| -> Result<Coord<f64>, DecodeError> {
                    let point = position(value)?;
                    Ok(match transform {
                        Some(transform) => {
                            cursor = cursor + point;
                            transform.apply(cursor)
                        }
                        None => point,
                    })
                })
                .collect()
        })
        .collect()
}

fn read_object(
    object: &Value,
    arcs: &[Arc],
    transform: Option<Transform>,
    features: &mut Vec<Feature>,
) -> Result<(), DecodeError> {
    if type_of(object)? == "GeometryCollection" {
        let geometries = object
            .get("geometries")
            .and_then(Value::as_array)
            .ok_or_else(|| DecodeError::structure("GeometryCollection without 'geometries'"))?;
        for geometry in geometries {
            read_object(geometry, arcs, transform, features)?;
        }
        return Ok(());
    }

    let mut properties = object
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);
    if let Some(id) = object.get("id") {
        properties
            .entry("id")
            .or_insert_with(|| id.clone());
    }

    features.push(Feature {
        geometry: read_geometry(object, arcs, transform)?,
        properties,
    });
    Ok(())
}

fn read_geometry(object: &Value, arcs: &[Arc], transform: Option<Transform>) -> Result<Option<Geometry>, DecodeError> {
    let point = |value: &Value| -> Result<Point<f64>, DecodeError> {
        let point = position(value)?;
        Ok(Point(match transform {
            Some(transform) => transform.apply(point),
            None => point,
        }))
    };
    let field = move |key: &str| {
        object
            .get(key)
            .ok_or_else(|| DecodeError::structure(format!("geometry without '{}'", key)))
    };

    let geometry = match type_of(object)? {
        "Point" => Geometry::Point(point(field("coordinates")?)?),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint(
            as_array(field("coordinates")?)?
                .iter()
                .map(point)
                .collect::<Result<_, _>>()?,
        )),
        "LineString" => Geometry::LineString(line(field("arcs")?, arcs)?),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString(lines(field("arcs")?, arcs)?)),
        "Polygon" => Geometry::Polygon(polygon_from_rings(lines(field("arcs")?, arcs)?)),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon(
            as_array(field("arcs")?)?
                .iter()
                .map(|polygon| lines(polygon, arcs).map(polygon_from_rings))
                .collect::<Result<_, _>>()?,
        )),
        // null geometry objects carry only properties
        _ => return Ok(None),
    };
    Ok(Some(geometry))
}

fn as_array(value: &Value) -> Result<&Vec<Value>, DecodeError> {
    value
        .as_array()
        .ok_or_else(|| DecodeError::structure("expected an array"))
}

/// Joins arcs into one line. A negative index `i` means arc `!i` reversed; the first point of
/// each following arc repeats the last point of the previous one and is skipped.
fn line(indexes: &Value, arcs: &[Arc]) -> Result<LineString<f64>, DecodeError> {
    let mut points: Vec<Coord<f64>> = vec![];
    for index in as_array(indexes)? {
        let index = index
            .as_i64()
            .ok_or_else(|| DecodeError::structure("arc index is not an integer"))?;
        let (arc_index, reversed) = match index < 0 {
            true => (!index, true),
            false => (index, false),
        };
        let arc = usize::try_from(arc_index)
            .ok()
            .and_then(|arc_index| arcs.get(arc_index))
            .ok_or_else(|| DecodeError::structure(format!("arc index out of range. index: {}", index)))?;

        let mut arc = arc.clone();
        if reversed {
            arc.reverse();
        }
        let skip = match points.is_empty() {
            true => 0,
            false => 1,
        };
        points.extend(arc.into_iter().skip(skip));
    }
    Ok(LineString(points))
}

fn lines(value: &Value, arcs: &[Arc]) -> Result<Vec<LineString<f64>>, DecodeError> {
    as_array(value)?
        .iter()
        .map(|indexes| line(indexes, arcs))
        .collect()
}

#[cfg(test)]
mod topojson_tests {
    use geo_types::{line_string, polygon};

    use super::*;

    #[test]
    fn quantized_arcs_are_delta_decoded_and_transformed() {
        // given
        let text = r#"{
            "type": "Topology",
            "transform": { "scale": [0.5, 2.0], "translate": [100.0, 10.0] },
            "objects": {
                "roads": { "type": "LineString", "arcs": [0], "properties": { "name": "main" } }
            },
            "arcs": [[[0, 0], [2, 1], [2, 1]]]
        }"#;

        // when
        let features = read_features(text).unwrap();

        // then
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].name(), Some("main"));
        assert_eq!(
            features[0].geometry,
            Some(Geometry::LineString(line_string![
                (x: 100.0, y: 10.0),
                (x: 101.0, y: 12.0),
                (x: 102.0, y: 14.0),
            ]))
        );
    }

    #[test]
    fn shared_and_reversed_arcs_form_closed_rings() {
        // given
        // two arcs: the top-right half and the bottom-left half of a square
        let text = r#"{
            "type": "Topology",
            "objects": {
                "square": { "type": "Polygon", "arcs": [[0, -2]] }
            },
            "arcs": [
                [[0, 0], [1, 0], [1, 1]],
                [[0, 0], [0, 1], [1, 1]]
            ]
        }"#;

        // when
        let features = read_features(text).unwrap();

        // then
        assert_eq!(
            features[0].geometry,
            Some(Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 1.0),
                (x: 0.0, y: 0.0),
            ]))
        );
    }

    #[test]
    fn null_typed_geometry_keeps_properties() {
        let text = r#"{
            "type": "Topology",
            "objects": {
                "a": { "type": "GeometryCollection", "geometries": [
                    { "type": "Point", "coordinates": [1, 2] },
                    { "type": "MultiPoint", "coordinates": [[3, 4], [5, 6]] }
                ] },
                "b": { "type": "Null", "id": "empty" }
            },
            "arcs": []
        }"#;

        let features = read_features(text).unwrap();

        assert_eq!(features.len(), 3);
        assert_eq!(features[2].geometry, None);
        assert_eq!(features[2].properties.get("id"), Some(&Value::from("empty")));
    }

    #[test]
    fn out_of_range_arc_is_an_error() {
        let text = r#"{ "type": "Topology", "objects": { "x": { "type": "LineString", "arcs": [3] } }, "arcs": [] }"#;
        assert!(matches!(read_features(text), Err(DecodeError::Structure(_))));
    }

    #[test]
    fn geojson_is_rejected() {
        let text = r#"{ "type": "FeatureCollection", "features": [] }"#;
        assert!(matches!(read_features(text), Err(DecodeError::Structure(_))));
    }
}
