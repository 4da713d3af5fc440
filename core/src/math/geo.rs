/// Mean Earth radius used by the spherical distance model.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub struct GeoHelper;

impl GeoHelper {
    /// Great-circle distance in metres between two WGS-84 coordinates, spherical model.
    pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let phi1 = lat1.to_radians();
        let phi2 = lat2.to_radians();
        let dphi = (lat2 - lat1).to_radians();
        let dlambda = (lon2 - lon1).to_radians();

        let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Signed heading change in degrees, wrapped to [-180, 180).
    pub fn heading_delta_deg(from: f64, to: f64) -> f64 {
        (to - from + 180.0).rem_euclid(360.0) - 180.0
    }
}
