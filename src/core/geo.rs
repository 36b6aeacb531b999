use crate::domain::model::{Coordinate, Facility};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// 30 km/h. No road network or traffic model behind it.
pub const AVERAGE_SPEED_KM_PER_MIN: f64 = 0.5;

/// Great-circle distance in kilometres (haversine).
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

pub fn estimate_travel_minutes(distance_km: f64) -> u32 {
    (distance_km / AVERAGE_SPEED_KM_PER_MIN).round().max(0.0) as u32
}

/// Refreshes the derived distance and travel time of every facility.
/// Input order is kept.
pub fn recompute_all(reference: Coordinate, facilities: &[Facility]) -> Vec<Facility> {
    facilities
        .iter()
        .map(|facility| {
            let mut updated = facility.clone();
            update_derived(reference, &mut updated);
            updated
        })
        .collect()
}

pub(crate) fn update_derived(reference: Coordinate, facility: &mut Facility) {
    facility.distance_km = distance_km(reference, facility.coordinate);
    facility.travel_minutes = estimate_travel_minutes(facility.distance_km);
}

/// Display ordering, nearest first. Stable for equal distances.
pub fn sort_by_distance(facilities: &mut [Facility]) {
    facilities.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
}

pub fn nearest(facilities: &[Facility]) -> Option<&Facility> {
    facilities
        .iter()
        .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
}

/// The "melhor preço" card: the facility paying the highest price per unit.
/// Despite the name this is a maximum, as shown on the dashboard.
pub fn cheapest(facilities: &[Facility]) -> Option<&Facility> {
    facilities
        .iter()
        .max_by(|a, b| a.price_per_unit.total_cmp(&b.price_per_unit))
}
