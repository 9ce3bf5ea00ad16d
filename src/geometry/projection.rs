//! Spherical mercator conversions between EPSG:4326 (lon/lat degrees) and EPSG:3857 (metres).

use std::f64::consts::PI;

use nalgebra::Point2;

pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the web mercator square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

pub fn lon_lat_to_web_mercator(lon_lat: Point2<f64>) -> Point2<f64> {
    let lat = lon_lat.y.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * lon_lat.x.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    Point2::new(x, y)
}

pub fn web_mercator_to_lon_lat(xy: Point2<f64>) -> Point2<f64> {
    let lon = (xy.x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (xy.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    Point2::new(lon, lat)
}

#[cfg(test)]
mod projection_tests {
    use nalgebra::Point2;
    use rstest::rstest;

    use super::*;

    #[test]
    fn origin_maps_to_origin() {
        let xy = lon_lat_to_web_mercator(Point2::new(0.0, 0.0));
        assert!(xy.x.abs() < 1e-9);
        assert!(xy.y.abs() < 1e-9);
    }

    #[test]
    fn antimeridian_is_half_the_world_width() {
        let xy = lon_lat_to_web_mercator(Point2::new(180.0, 0.0));
        assert!((xy.x - 20_037_508.342_789_244).abs() < 1e-6);
    }

    #[rstest]
    #[case(138.7313889, 35.3622222)]
    #[case(-0.1276, 51.5072)]
    #[case(151.2093, -33.8688)]
    fn inverse_restores_lon_lat(#[case] lon: f64, #[case] lat: f64) {
        let restored = web_mercator_to_lon_lat(lon_lat_to_web_mercator(Point2::new(lon, lat)));
        assert!((restored.x - lon).abs() < 1e-9);
        assert!((restored.y - lat).abs() < 1e-9);
    }

    #[test]
    fn latitude_is_clamped_at_the_poles() {
        let pole = lon_lat_to_web_mercator(Point2::new(0.0, 90.0));
        let limit = lon_lat_to_web_mercator(Point2::new(0.0, MAX_LATITUDE));
        assert!(pole.y.is_finite());
        assert_eq!(pole.y, limit.y);
    }
}
