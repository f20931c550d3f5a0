//! Trip feature construction

use crate::encode::dummies_drop_first;
use crate::errors::Result;
use crate::frame::FeatureRow;
use crate::time::{parse_pickup_datetime, Calendar};
use serde::{Deserialize, Serialize};
use taxiscore_reference::{DurationTable, HotnessTable, ZoneDirectory};

/// Borough used for zones missing from the directory.
pub const UNKNOWN_BOROUGH: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    pub pickup_zone: String,
    pub dropoff_zone: String,
    /// `MM/DD/YYYY HH:MM:SS AM/PM`
    pub pickup_datetime: String,
}

/// Tables consulted while building a trip row.
#[derive(Debug, Clone, Copy)]
pub struct TripLookups<'a> {
    pub hotness: &'a HotnessTable,
    pub duration: &'a DurationTable,
    pub zones: &'a ZoneDirectory,
}

pub fn is_airport_zone(zone: &str) -> bool {
    zone.contains("Airport")
}

const BOROUGH_FIELDS: [&str; 2] = ["pickup_borough", "dropoff_borough"];

/// Build the numeric row for a trip before alignment.
///
/// The row holds `dropoff_zone_hotness`, `trip_duration_variability`,
/// `sin_hour`, `cos_hour`, `is_weekend` and `is_airport_trip`. Drop-off time
/// features reuse the pickup hour and day. Boroughs go through drop-first
/// dummy encoding, which on a single trip leaves no indicator columns, so
/// every `*_borough_*` model input aligns to 0.
pub fn build_trip_features(request: &TripRequest, lookups: TripLookups<'_>) -> Result<FeatureRow> {
    let pickup = parse_pickup_datetime(&request.pickup_datetime)?;
    let calendar = Calendar::of(&pickup);
    let (sin_hour, cos_hour) = calendar.cyclic_hour();

    let hotness = lookups
        .hotness
        .lookup(&request.dropoff_zone, calendar.day_of_week, calendar.hour)
        .unwrap_or(0.0);
    let variability = lookups
        .duration
        .lookup(
            &request.pickup_zone,
            &request.dropoff_zone,
            calendar.day_of_week,
            calendar.hour,
        )
        .unwrap_or(0.0);

    let airport = is_airport_zone(&request.pickup_zone) || is_airport_zone(&request.dropoff_zone);

    let mut row = FeatureRow::new();
    row.set_number("dropoff_zone_hotness", hotness);
    row.set_number("trip_duration_variability", variability);
    row.set_number("sin_hour", sin_hour);
    row.set_number("cos_hour", cos_hour);
    row.set_number("is_weekend", f64::from(calendar.weekend_flag()));
    row.set_number("is_airport_trip", if airport { 1.0 } else { 0.0 });

    let trip_zones = [&request.pickup_zone, &request.dropoff_zone];
    for (field, zone) in BOROUGH_FIELDS.into_iter().zip(trip_zones) {
        let borough = lookups.zones.borough_of(zone).unwrap_or(UNKNOWN_BOROUGH);
        row.set_category(field, borough);
    }
    dummies_drop_first(std::slice::from_mut(&mut row), &BOROUGH_FIELDS)?;

    Ok(row)
}
