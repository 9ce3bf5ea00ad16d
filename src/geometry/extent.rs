use nalgebra::Point2;

/// Axis-aligned extent, in whatever coordinate system the points were in.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct Extent {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            min: Point2::new(f64::MAX, f64::MAX),
            max: Point2::new(f64::MIN, f64::MIN),
        }
    }
}

impl Extent {
    /// Note that an extent of 0,0 -> 0,0 is NOT empty, a single point has a zero-sized extent.
    ///
    /// Only an extent which is the same as the one returned by `default` counts as empty.
    pub fn is_empty(&self) -> bool {
        self.eq(&Extent::default())
    }

    pub fn expand(&mut self, other: &Extent) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
    }

    pub fn expand_to_point(&mut self, point: &Point2<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.min.x + self.max.x, self.min.y + self.max.y) / 2.0
    }

    pub fn contains(&self, point: &Point2<f64>) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn from_points(points: &[Point2<f64>]) -> Self {
        let mut extent = Self::default();
        for point in points {
            extent.expand_to_point(point);
        }
        extent
    }
}
