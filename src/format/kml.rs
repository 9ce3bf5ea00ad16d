use geo_types::{Coord, GeometryCollection, LineString, Point};
use roxmltree::{Document, Node};

use super::DecodeError;
use crate::geometry::{polygon_from_rings, Feature, Geometry};

/// Reads every `Placemark`, wherever it is nested (Document, Folder, ...).
pub(super) fn read_features(text: &str) -> Result<Vec<Feature>, DecodeError> {
    let document = Document::parse(text)?;
    if document.root_element().tag_name().name() != "kml" {
        return Ok(vec![]);
    }

    document
        .descendants()
        .filter(|node| is(node, "Placemark"))
        .map(read_placemark)
        .collect()
}

fn is(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| is(child, name))
}

fn read_placemark(placemark: Node) -> Result<Feature, DecodeError> {
    let geometry = placemark
        .children()
        .filter(Node::is_element)
        .find_map(|node| read_geometry(node).transpose())
        .transpose()?;

    let mut feature = Feature {
        geometry,
        ..Feature::default()
    };
    for key in ["name", "description"] {
        if let Some(value) = child(placemark, key).and_then(|node| node.text()) {
            feature = feature.with_property(key, value.trim());
        }
    }
    Ok(feature)
}

/// `Ok(None)` for elements that are not geometries.
fn read_geometry(node: Node) -> Result<Option<Geometry>, DecodeError> {
    let geometry = match node.tag_name().name() {
        "Point" => {
            let points = coordinates_of(node)?;
            match points.0.first() {
                Some(point) => Geometry::Point(Point(*point)),
                None => return Err(DecodeError::structure("Point without coordinates")),
            }
        }
        "LineString" => Geometry::LineString(coordinates_of(node)?),
        "LinearRing" => Geometry::Polygon(polygon_from_rings(vec![coordinates_of(node)?])),
        "Polygon" => {
            let mut rings = vec![];
            for boundary in ["outerBoundaryIs", "innerBoundaryIs"] {
                for ring in node
                    .children()
                    .filter(|child| is(child, boundary))
                    .filter_map(child_ring)
                {
                    rings.push(coordinates_of(ring)?);
                }
            }
            if rings.is_empty() {
                return Err(DecodeError::structure("Polygon without outerBoundaryIs"));
            }
            Geometry::Polygon(polygon_from_rings(rings))
        }
        "MultiGeometry" => Geometry::GeometryCollection(GeometryCollection(
            node.children()
                .filter(Node::is_element)
                .filter_map(|child| read_geometry(child).transpose())
                .collect::<Result<_, _>>()?,
        )),
        _ => return Ok(None),
    };
    Ok(Some(geometry))
}

fn child_ring<'a, 'input>(boundary: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    child(boundary, "LinearRing")
}

/// `lon,lat[,alt]` tuples separated by whitespace.
fn coordinates_of(node: Node) -> Result<LineString<f64>, DecodeError> {
    let text = child(node, "coordinates")
        .and_then(|coordinates| coordinates.text())
        .unwrap_or_default();

    text.split_whitespace()
        .map(|tuple| {
            let mut ordinates = tuple
                .split(',')
                .map(|value| value.trim().parse::<f64>());
            match (ordinates.next(), ordinates.next()) {
                (Some(Ok(lon)), Some(Ok(lat))) => Ok(Coord {
                    x: lon,
                    y: lat,
                }),
                _ => Err(DecodeError::structure(format!("invalid coordinate tuple '{}'", tuple))),
            }
        })
        .collect()
}

#[cfg(test)]
mod kml_tests {
    use geo_types::point;
    use serde_json::Value;

    use super::*;

    const KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Folder>
      <Placemark>
        <name>Summit</name>
        <description> Highest point </description>
        <Point><coordinates>138.7274,35.3606,3776</coordinates></Point>
      </Placemark>
    </Folder>
    <Placemark>
      <name>Lake</name>
      <Polygon>
        <outerBoundaryIs><LinearRing><coordinates>
          0,0 1,0 1,1 0,0
        </coordinates></LinearRing></outerBoundaryIs>
        <innerBoundaryIs><LinearRing><coordinates>0.2,0.2 0.4,0.2 0.2,0.4 0.2,0.2</coordinates></LinearRing></innerBoundaryIs>
      </Polygon>
    </Placemark>
    <Placemark>
      <MultiGeometry>
        <LineString><coordinates>0,0 2,2</coordinates></LineString>
        <Point><coordinates>5,5</coordinates></Point>
      </MultiGeometry>
    </Placemark>
    <Placemark><name>no geometry</name></Placemark>
  </Document>
</kml>"#;

    #[test]
    fn nested_placemarks() {
        // when
        let features = read_features(KML).unwrap();

        // then
        assert_eq!(features.len(), 4);

        assert_eq!(features[0].name(), Some("Summit"));
        assert_eq!(features[0].properties.get("description"), Some(&Value::from("Highest point")));
        assert_eq!(features[0].geometry, Some(Geometry::Point(point!(x: 138.7274, y: 35.3606))));

        match &features[1].geometry {
            Some(Geometry::Polygon(polygon)) => {
                assert_eq!(polygon.interiors().len(), 1);
                assert_eq!(polygon.exterior().0.len(), 4);
            }
            other => panic!("unexpected geometry: {:?}", other),
        }

        match &features[2].geometry {
            Some(Geometry::GeometryCollection(collection)) => assert_eq!(collection.0.len(), 2),
            other => panic!("unexpected geometry: {:?}", other),
        }

        assert_eq!(features[3].geometry, None);
    }

    #[test]
    fn bad_coordinates_are_an_error() {
        let text = "<kml><Placemark><LineString><coordinates>1,x</coordinates></LineString></Placemark></kml>";
        assert!(matches!(read_features(text), Err(DecodeError::Structure(_))));
    }

    #[test]
    fn gpx_yields_nothing() {
        assert!(read_features("<gpx/>").unwrap().is_empty());
    }
}
