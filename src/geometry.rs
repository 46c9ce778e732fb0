//! Distance, elevation and slope statistics over point sequences.

use crate::gpx_types::{Distance, Elevation, GpxPoint};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points, from lat/lon in degrees.
pub fn haversine_distance(from: &GpxPoint, to: &GpxPoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let sin_dlat = ((to.lat - from.lat).to_radians() / 2.0).sin();
    let sin_dlon = ((to.lon - from.lon).to_radians() / 2.0).sin();

    let a = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Total and running distance along `points`.
///
/// `cumul[i]` is the distance traveled from the first point to point `i`, so
/// it starts at zero and ends at `total`. A single point gives `[0.0]`; no
/// points give an empty sequence.
pub fn accumulate_distance(points: &[GpxPoint]) -> Distance {
    let mut total = 0.0;
    let mut cumul = Vec::with_capacity(points.len());

    if !points.is_empty() {
        cumul.push(total);
    }
    for pair in points.windows(2) {
        total += haversine_distance(&pair[0], &pair[1]);
        cumul.push(total);
    }

    Distance { total, cumul }
}

/// Gain, loss, extremes and mean of the present elevations in `points`.
///
/// Pairs with a missing elevation on either end contribute no gain or loss.
/// Aggregates that come out as exactly zero (or undefined) are reported as
/// `None`, so a flat track has no `pos`/`neg` and a track at sea level has
/// no `max`/`min`.
pub fn aggregate_elevation(points: &[GpxPoint]) -> Elevation {
    let mut gain = 0.0;
    let mut loss = 0.0;

    for pair in points.windows(2) {
        if let (Some(ele), Some(next)) = (pair[0].ele, pair[1].ele) {
            let diff = next - ele;
            if diff > 0.0 {
                gain += diff;
            } else if diff < 0.0 {
                loss += diff;
            }
        }
    }

    let elevations: Vec<f64> = points.iter().filter_map(|pt| pt.ele).collect();
    let (max, min, avg) = if elevations.is_empty() {
        (None, None, None)
    } else {
        let max = elevations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = elevations.iter().copied().fold(f64::INFINITY, f64::min);
        let avg = elevations.iter().sum::<f64>() / elevations.len() as f64;
        (Some(max), Some(min), Some(avg))
    };

    Elevation {
        max: max.and_then(non_zero),
        min: min.and_then(non_zero),
        pos: non_zero(gain.abs()),
        neg: non_zero(loss.abs()),
        avg: avg.and_then(non_zero),
    }
}

/// Percent grade of each consecutive pair of points.
///
/// A missing elevation on either end yields `NaN` for that pair, and a
/// zero-length segment yields an infinite (or `NaN`) grade.
pub fn compute_slopes(points: &[GpxPoint], cumul: &[f64]) -> Vec<f64> {
    points
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let rise = match (pair[0].ele, pair[1].ele) {
                (Some(ele), Some(next)) => next - ele,
                _ => f64::NAN,
            };
            let run = match (cumul.get(i), cumul.get(i + 1)) {
                (Some(start), Some(end)) => end - start,
                _ => f64::NAN,
            };
            rise * 100.0 / run
        })
        .collect()
}

fn non_zero(value: f64) -> Option<f64> {
    if value == 0.0 || value.is_nan() {
        None
    } else {
        Some(value)
    }
}
