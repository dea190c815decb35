//! Reprojection from spherical Web Mercator to WGS-84.

use std::f64::consts::FRAC_PI_2;

use geo::Coord;

/// Radius of the sphere used by Web Mercator, in metres.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Convert a Web Mercator coordinate (metres) into longitude/latitude
/// degrees.
#[expect(
    clippy::float_arithmetic,
    reason = "inverse Mercator projection is floating-point maths"
)]
pub(crate) fn web_mercator_to_wgs84(coord: Coord<f64>) -> Coord<f64> {
    let lon = (coord.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (coord.y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
    Coord { x: lon, y: lat }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[expect(clippy::float_arithmetic, reason = "test tolerance check")]
    fn assert_close(actual: f64, expected: f64) {
        let delta = (actual - expected).abs();
        assert!(delta <= 1.0e-6, "expected {expected}, got {actual}");
    }

    #[rstest]
    #[case(0.0, 0.0, 0.0, 0.0)]
    #[case(20_037_508.342_789_244, 0.0, 180.0, 0.0)]
    #[case(-20_037_508.342_789_244, 0.0, -180.0, 0.0)]
    // Bonn city centre.
    #[case(789_444.432_858_658_3, 6_574_305.246_834_791, 7.0917, 50.7336)]
    fn inverts_web_mercator(
        #[case] x: f64,
        #[case] y: f64,
        #[case] lon: f64,
        #[case] lat: f64,
    ) {
        let coord = web_mercator_to_wgs84(Coord { x, y });
        assert_close(coord.x, lon);
        assert_close(coord.y, lat);
    }
}
