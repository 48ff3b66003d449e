//! Great-circle distance.

use crate::constants::EARTH_RADIUS_KM;

/// Haversine distance in kilometres between two `(lat, lon)` pairs in degrees.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Round a value to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS: &[(f64, f64)] = &[
        (41.90, 12.49),
        (45.4642, 9.19),
        (-33.8688, 151.2093),
        (90.0, 0.0),
        (-90.0, 180.0),
        (0.0, -180.0),
    ];

    #[test]
    fn test_distance_to_self_is_zero() {
        for &(lat, lng) in POINTS {
            assert_eq!(distance_km(lat, lng, lat, lng), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        for &(a_lat, a_lng) in POINTS {
            for &(b_lat, b_lng) in POINTS {
                let ab = distance_km(a_lat, a_lng, b_lat, b_lng);
                let ba = distance_km(b_lat, b_lng, a_lat, a_lng);
                assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0));
                assert!(ab >= 0.0);
            }
        }
    }

    #[test]
    fn test_rome_hundredth_of_a_degree_east() {
        let d = distance_km(41.90, 12.50, 41.90, 12.49);
        assert!((d - 0.8276).abs() < 1e-3, "got {d}");
        assert_eq!(round_to(d, 2), 0.83);
    }

    #[test]
    fn test_rome_to_milan() {
        let d = distance_km(41.9028, 12.4964, 45.4642, 9.19);
        assert!((d - 477.0).abs() < 2.0, "got {d}");
    }

    #[test]
    fn test_antipodes_is_half_circumference() {
        let d = distance_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(0.876, 1), 0.9);
        assert_eq!(round_to(2.0, 2), 2.0);
    }
}
