use geo_types::{Coord, LineString, Polygon, Rect};
use nalgebra::Point2;
use serde_json::{Map, Value};

mod extent;
pub mod projection;

pub use extent::Extent;

/// Feature geometry. Coordinates are lon/lat when freshly decoded and web mercator metres once a
/// layer has been created from them.
pub type Geometry = geo_types::Geometry<f64>;

pub trait CoordToPoint2 {
    fn to_point2(&self) -> Point2<f64>;
}

impl CoordToPoint2 for Coord<f64> {
    fn to_point2(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

pub trait Point2ToCoord {
    fn to_coord(&self) -> Coord<f64>;
}

impl Point2ToCoord for Point2<f64> {
    fn to_coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

/// Builds a polygon from its rings, exterior first. No rings gives an empty polygon.
pub fn polygon_from_rings(rings: Vec<LineString<f64>>) -> Polygon<f64> {
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .unwrap_or_else(|| LineString::new(vec![]));
    Polygon::new(exterior, rings.collect())
}

pub trait GeometryExt {
    fn type_name(&self) -> &'static str;

    /// Visits every coordinate of the geometry, in storage order.
    fn for_each_point(&self, f: &mut impl FnMut(Point2<f64>));

    /// Applies `transform` to every coordinate in place.
    fn apply_transform(&mut self, transform: &impl Fn(Point2<f64>) -> Point2<f64>);

    fn extent(&self) -> Extent;
}

impl GeometryExt for Geometry {
    fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Line(_) => "Line",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::GeometryCollection(_) => "GeometryCollection",
            Geometry::Rect(_) => "Rect",
            Geometry::Triangle(_) => "Triangle",
        }
    }

    fn for_each_point(&self, f: &mut impl FnMut(Point2<f64>)) {
        visit_coords(self, &mut |coord| f(coord.to_point2()));
    }

    fn apply_transform(&mut self, transform: &impl Fn(Point2<f64>) -> Point2<f64>) {
        transform_coords(self, &|coord| transform(coord.to_point2()).to_coord());
    }

    fn extent(&self) -> Extent {
        let mut extent = Extent::default();
        self.for_each_point(&mut |point| extent.expand_to_point(&point));
        extent
    }
}

fn visit_polygon(polygon: &Polygon<f64>, f: &mut dyn FnMut(Coord<f64>)) {
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        ring.0.iter().copied().for_each(&mut *f);
    }
}

fn visit_coords(geometry: &Geometry, f: &mut dyn FnMut(Coord<f64>)) {
    match geometry {
        Geometry::Point(point) => f(point.0),
        Geometry::Line(line) => {
            f(line.start);
            f(line.end);
        }
        Geometry::LineString(line) => line.0.iter().copied().for_each(f),
        Geometry::Polygon(polygon) => visit_polygon(polygon, f),
        Geometry::MultiPoint(points) => points.0.iter().for_each(|point| f(point.0)),
        Geometry::MultiLineString(lines) => lines
            .0
            .iter()
            .flat_map(|line| line.0.iter().copied())
            .for_each(f),
        Geometry::MultiPolygon(polygons) => {
            for polygon in &polygons.0 {
                visit_polygon(polygon, f);
            }
        }
        Geometry::GeometryCollection(collection) => {
            for geometry in &collection.0 {
                visit_coords(geometry, f);
            }
        }
        Geometry::Rect(rect) => {
            f(rect.min());
            f(rect.max());
        }
        Geometry::Triangle(triangle) => {
            f(triangle.0);
            f(triangle.1);
            f(triangle.2);
        }
    }
}

fn transform_coords(geometry: &mut Geometry, transform: &dyn Fn(Coord<f64>) -> Coord<f64>) {
    let transform_line = |line: &mut LineString<f64>| {
        for coord in line.0.iter_mut() {
            *coord = transform(*coord);
        }
    };
    let transform_polygon = |polygon: &mut Polygon<f64>| {
        polygon.exterior_mut(|exterior| transform_line(exterior));
        polygon.interiors_mut(|interiors| interiors.iter_mut().for_each(transform_line));
    };

    match geometry {
        Geometry::Point(point) => point.0 = transform(point.0),
        Geometry::Line(line) => {
            line.start = transform(line.start);
            line.end = transform(line.end);
        }
        Geometry::LineString(line) => transform_line(line),
        Geometry::Polygon(polygon) => transform_polygon(polygon),
        Geometry::MultiPoint(points) => {
            for point in points.0.iter_mut() {
                point.0 = transform(point.0);
            }
        }
        Geometry::MultiLineString(lines) => lines.0.iter_mut().for_each(transform_line),
        Geometry::MultiPolygon(polygons) => polygons.0.iter_mut().for_each(transform_polygon),
        Geometry::GeometryCollection(collection) => {
            for geometry in collection.0.iter_mut() {
                transform_coords(geometry, transform);
            }
        }
        // both projections in use are monotonic per axis, so a rect stays a rect
        Geometry::Rect(rect) => *rect = Rect::new(transform(rect.min()), transform(rect.max())),
        Geometry::Triangle(triangle) => {
            triangle.0 = transform(triangle.0);
            triangle.1 = transform(triangle.1);
            triangle.2 = transform(triangle.2);
        }
    }
}

/// A geometry plus its attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feature {
    /// Features without geometry are legal in GeoJSON, they are kept but never drawn.
    pub geometry: Option<Geometry>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties
            .insert(key.to_string(), value.into());
        self
    }

    /// The `name` attribute, used for feature info display.
    pub fn name(&self) -> Option<&str> {
        self.properties
            .get("name")
            .and_then(Value::as_str)
    }
}

/// Combined extent of all feature geometries.
pub fn features_extent(features: &[Feature]) -> Extent {
    let mut extent = Extent::default();
    for geometry in features
        .iter()
        .filter_map(|feature| feature.geometry.as_ref())
    {
        extent.expand(&geometry.extent());
    }
    extent
}
