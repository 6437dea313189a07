//! Geographic values for geo filters and distance aggregations.
//!
//! Points serialize in `[lon, lat]` order. Shapes serialize as
//! `{"type": ..., "coordinates": ...}` objects.

use serde_json::{json, Value};

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Point { lat, lon }
    }
}

impl From<Point> for Value {
    fn from(point: Point) -> Self {
        json!([point.lon, point.lat])
    }
}

/// A geographic shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Circle around a center with a radius such as `"2km"`.
    Circle { center: Point, radius: String },
    /// Rectangle given by its upper-left and lower-right corners.
    BoundingBox { upper_left: Point, lower_right: Point },
    /// Open line through the given points.
    Line(Vec<Point>),
    /// Closed polygon with optional holes.
    Polygon { shell: Vec<Point>, holes: Vec<Vec<Point>> },
}

impl Shape {
    pub fn circle(center: Point, radius: impl Into<String>) -> Self {
        Shape::Circle {
            center,
            radius: radius.into(),
        }
    }

    pub fn bounding_box(upper_left: Point, lower_right: Point) -> Self {
        Shape::BoundingBox {
            upper_left,
            lower_right,
        }
    }

    pub fn line(points: impl IntoIterator<Item = Point>) -> Self {
        Shape::Line(points.into_iter().collect())
    }

    pub fn polygon(points: impl IntoIterator<Item = Point>) -> Self {
        Shape::Polygon {
            shell: points.into_iter().collect(),
            holes: Vec::new(),
        }
    }

    /// Adds a hole to a polygon. Other shapes are returned unchanged.
    pub fn hole(mut self, points: impl IntoIterator<Item = Point>) -> Self {
        if let Shape::Polygon { holes, .. } = &mut self {
            holes.push(points.into_iter().collect());
        }
        self
    }

    /// Returns the wire name of this shape's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Circle { .. } => "circle",
            Shape::BoundingBox { .. } => "envelope",
            Shape::Line(_) => "linestring",
            Shape::Polygon { .. } => "polygon",
        }
    }
}

fn points(points: &[Point]) -> Value {
    Value::Array(points.iter().copied().map(Value::from).collect())
}

impl From<Shape> for Value {
    fn from(shape: Shape) -> Self {
        let type_name = shape.type_name();
        match shape {
            Shape::Circle { center, radius } => json!({
                "type": type_name,
                "coordinates": Value::from(center),
                "radius": radius,
            }),
            Shape::BoundingBox {
                upper_left,
                lower_right,
            } => json!({
                "type": type_name,
                "coordinates": [Value::from(upper_left), Value::from(lower_right)],
            }),
            Shape::Line(line) => json!({
                "type": type_name,
                "coordinates": points(&line),
            }),
            Shape::Polygon { shell, holes } => {
                let mut rings = vec![points(&shell)];
                rings.extend(holes.iter().map(|hole| points(hole)));
                json!({
                    "type": type_name,
                    "coordinates": rings,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_is_lon_lat() {
        assert_eq!(Value::from(Point::new(10.0, 20.0)), json!([20.0, 10.0]));
    }

    #[test]
    fn circle() {
        let circle = Shape::circle(Point::new(1.0, 2.0), "2km");
        assert_eq!(
            Value::from(circle),
            json!({"type": "circle", "coordinates": [2.0, 1.0], "radius": "2km"})
        );
    }

    #[test]
    fn bounding_box() {
        let bbox = Shape::bounding_box(Point::new(1.0, 0.0), Point::new(0.0, 1.0));
        assert_eq!(
            Value::from(bbox),
            json!({"type": "envelope", "coordinates": [[0.0, 1.0], [1.0, 0.0]]})
        );
    }

    #[test]
    fn polygon_with_hole() {
        let shell = [Point::new(0.0, 0.0), Point::new(0.0, 4.0), Point::new(4.0, 0.0)];
        let hole = [Point::new(1.0, 1.0), Point::new(1.0, 2.0), Point::new(2.0, 1.0)];
        let polygon = Shape::polygon(shell).hole(hole);
        assert_eq!(
            Value::from(polygon),
            json!({
                "type": "polygon",
                "coordinates": [
                    [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]],
                    [[1.0, 1.0], [2.0, 1.0], [1.0, 2.0]]
                ]
            })
        );
    }

    #[test]
    fn hole_ignored_on_line() {
        let line = Shape::line([Point::new(0.0, 0.0)]).hole([Point::new(1.0, 1.0)]);
        assert_eq!(line, Shape::Line(vec![Point::new(0.0, 0.0)]));
    }
}
