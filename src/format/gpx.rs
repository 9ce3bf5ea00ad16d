use geo_types::{Coord, LineString, MultiLineString, Point};
use roxmltree::{Document, Node};

use super::DecodeError;
use crate::geometry::{Feature, Geometry};

/// Waypoints become points, routes line strings and tracks multi line strings, one line per
/// track segment.
pub(super) fn read_features(text: &str) -> Result<Vec<Feature>, DecodeError> {
    let document = Document::parse(text)?;
    let root = document.root_element();
    if root.tag_name().name() != "gpx" {
        return Ok(vec![]);
    }

    let mut features = vec![];
    for node in root
        .children()
        .filter(Node::is_element)
    {
        let geometry = match node.tag_name().name() {
            "wpt" => Geometry::Point(Point(read_point(node)?)),
            "rte" => Geometry::LineString(read_points(node, "rtept")?),
            "trk" => Geometry::MultiLineString(MultiLineString(
                elements(node, "trkseg")
                    .map(|segment| read_points(segment, "trkpt"))
                    .collect::<Result<_, _>>()?,
            )),
            _ => continue,
        };

        let mut feature = Feature::new(geometry);
        for key in ["name", "desc", "type"] {
            if let Some(value) = child_text(node, key) {
                feature = feature.with_property(key, value);
            }
        }
        features.push(feature);
    }
    Ok(features)
}

fn elements<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && child.tag_name().name() == name)
}

fn child_text<'a>(node: Node<'a, '_>, name: &'static str) -> Option<&'a str> {
    elements(node, name)
        .next()
        .and_then(|child| child.text())
        .map(str::trim)
}

fn read_point(node: Node) -> Result<Coord<f64>, DecodeError> {
    let coordinate = |key: &str| {
        node.attribute(key)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .ok_or_else(|| DecodeError::structure(format!("<{}> without numeric '{}'", node.tag_name().name(), key)))
    };
    Ok(Coord {
        x: coordinate("lon")?,
        y: coordinate("lat")?,
    })
}

fn read_points(node: Node, name: &'static str) -> Result<LineString<f64>, DecodeError> {
    elements(node, name)
        .map(read_point)
        .collect()
}
