//! Zone-level pickup demand prediction
//!
//! One feature row per zone of the directory: calendar features, POI
//! densities with weekend/time-of-day interactions, and categorical
//! interactions that are target-encoded before alignment. The model predicts
//! `log1p(trip_count)`, so outputs pass through `expm1`.

use crate::align::ColumnAligner;
use crate::encode::apply_target_encoding;
use crate::errors::{PipelineError, Result};
use crate::frame::FeatureRow;
use crate::resources::{capitalize, HotspotResources};
use crate::time::{Calendar, TimeOfDay};
use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};
use taxiscore_gbdt::Ensemble;
use taxiscore_reference::lags::{lag_feature_name, ROLLING_AVG_FEATURE};
use taxiscore_reference::{is_us_holiday, Month, PoiTable, ProxyLags};
use tracing::debug;

/// Categorical columns that exist only to be target-encoded.
pub const RAW_CATEGORICALS: [&str; 9] = [
    "pickup_zone",
    "day_time_interaction",
    "holiday_time_interaction",
    "zone_hour_interaction",
    "zone_isweekend_interaction",
    "hour_isweekend_interaction",
    "zone_time_isweekend_interaction",
    "zone_hour_isweekend_interaction",
    "zone_hour_holiday_interaction",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotPrediction {
    pub pickup_zone: String,
    pub location_id: i64,
    pub predicted_trip_count: f64,
}

/// Time-dependent inputs shared by every zone's row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotspotMoment {
    pub month: u32,
    pub calendar: Calendar,
    pub time_of_day: TimeOfDay,
    pub is_holiday: bool,
}

impl HotspotMoment {
    pub fn of<Tz: TimeZone>(time: &DateTime<Tz>) -> Self {
        let calendar = Calendar::of(time);
        Self {
            month: time.month(),
            calendar,
            time_of_day: TimeOfDay::from_hour(calendar.hour),
            is_holiday: is_us_holiday(time.date_naive()),
        }
    }
}

/// Feature row for one zone, before target encoding.
pub fn build_zone_row(zone: &str, moment: &HotspotMoment, poi: &PoiTable) -> FeatureRow {
    let cal = moment.calendar;
    let weekend = cal.weekend_flag();
    let holiday = u8::from(moment.is_holiday);
    let tod = moment.time_of_day;
    let tod_label = tod.label();
    let tod_column = tod.column_label();

    let mut row = FeatureRow::new();
    row.set_number("pickup_month", moment.month as f64);
    row.set_number("pickup_hour", cal.hour as f64);
    row.set_number("pickup_day_of_week", cal.day_of_week as f64);
    row.set_number("is_weekend", weekend as f64);
    row.set_number("time_of_day_encoded", tod.code() as f64);

    if let Some(densities) = poi.densities(zone) {
        for (column, density) in densities {
            row.set_number(column, density);
            row.set_number(format!("{column}_x_isweekend"), density * weekend as f64);
            row.set_number(format!("{column}_x_{tod_column}"), density);
        }
        let product = |a: &str, b: &str| Some(poi.value(zone, a)? * poi.value(zone, b)?);
        if let Some(v) = product("nightlife_density_per_sq_mile", "hotel_density_per_sq_mile") {
            row.set_number("nightlife_x_hotels", v);
        }
        if let Some(v) = product("restaurant_density_per_sq_mile", "tourism_density_per_sq_mile") {
            row.set_number("restaurants_x_tourism", v);
        }
    }

    let hour = cal.hour;
    let dow = cal.day_of_week;
    row.set_category("pickup_zone", zone);
    row.set_category("day_time_interaction", format!("{dow}_{tod_label}"));
    row.set_category("holiday_time_interaction", format!("{holiday}_{tod_label}"));
    row.set_category("zone_hour_interaction", format!("{zone}_{hour}"));
    row.set_category("zone_isweekend_interaction", format!("{zone}_{weekend}"));
    row.set_category("hour_isweekend_interaction", format!("{hour}_{weekend}"));
    row.set_category(
        "zone_time_isweekend_interaction",
        format!("{zone}_{tod_label}_{weekend}"),
    );
    row.set_category(
        "zone_hour_isweekend_interaction",
        format!("{zone}_{hour}_{weekend}"),
    );
    row.set_category(
        "zone_hour_holiday_interaction",
        format!("{zone}_{hour}_{holiday}"),
    );
    row
}

fn add_lag_features(row: &mut FeatureRow, zone: &str, lags: &ProxyLags, hours: &[u32]) {
    for &h in hours {
        let name = lag_feature_name(h);
        let value = lags.value(&name, zone).unwrap_or(0.0);
        row.set_number(name, value);
    }
    if !hours.is_empty() {
        row.set_number(
            ROLLING_AVG_FEATURE,
            lags.value(ROLLING_AVG_FEATURE, zone).unwrap_or(0.0),
        );
    }
}

/// Encoded feature rows for every zone, with the zone's id if known.
pub fn build_hotspot_rows<Tz: TimeZone>(
    time: &DateTime<Tz>,
    resources: &HotspotResources,
) -> Result<Vec<(String, Option<i64>, FeatureRow)>> {
    let moment = HotspotMoment::of(time);
    let lags = resources
        .lags
        .as_ref()
        .map(|table| table.proxy_lags(time.naive_local(), &resources.lag_hours));

    let mut zones = Vec::with_capacity(resources.zones.len());
    let mut rows = Vec::with_capacity(resources.zones.len());
    for record in resources.zones.records() {
        let mut row = build_zone_row(&record.zone, &moment, &resources.poi);
        row.set_number("zoneID", record.object_id.map_or(f64::NAN, |id| id as f64));
        if let Some(lags) = &lags {
            add_lag_features(&mut row, &record.zone, lags, &resources.lag_hours);
        }
        zones.push((record.zone.clone(), record.object_id));
        rows.push(row);
    }

    apply_target_encoding(&mut rows, &resources.encoder, &RAW_CATEGORICALS)?;

    Ok(zones
        .into_iter()
        .zip(rows)
        .map(|((zone, id), row)| (zone, id, row))
        .collect())
}

/// Predict trip counts for every zone at `time`, highest first.
///
/// `time` must already be in New York local time. Zones without an id are
/// scored but left out of the result; ties keep directory order.
pub fn predict_hotspots<Tz: TimeZone>(
    time: &DateTime<Tz>,
    resources: &HotspotResources,
    model: &Ensemble,
) -> Result<Vec<HotspotPrediction>> {
    let rows = build_hotspot_rows(time, resources)?;
    let aligner = ColumnAligner::new(&resources.model_features);
    let matrix = rows
        .iter()
        .map(|(_, _, row)| aligner.align(row))
        .collect::<Result<Vec<_>>>()?;

    let predictions = model.predict_batch(&matrix);
    debug!(zones = predictions.len(), "scored hotspot rows");

    let mut response: Vec<HotspotPrediction> = rows
        .into_iter()
        .zip(predictions)
        .filter_map(|((zone, id, _), pred)| {
            id.map(|location_id| HotspotPrediction {
                pickup_zone: zone,
                location_id,
                predicted_trip_count: pred.exp_m1(),
            })
        })
        .collect();

    response.sort_by(|a, b| b.predicted_trip_count.total_cmp(&a.predicted_trip_count));
    Ok(response)
}

/// Month whose model serves `time`; January has none.
pub fn hotspot_month<Tz: TimeZone>(time: &DateTime<Tz>) -> Result<Month> {
    let month = Month::from_number(time.month())?;
    if month == Month::January {
        return Err(PipelineError::UnsupportedMonth(capitalize(month.full_name())));
    }
    Ok(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;
    use std::path::Path;
    use taxiscore_reference::table::CsvTable;

    fn poi() -> PoiTable {
        let table = CsvTable::parse(
            Path::new("poi.csv"),
            "zone,nightlife_density_per_sq_mile,hotel_density_per_sq_mile\n\
             SoHo,10,2\n",
        )
        .unwrap();
        PoiTable::from_table(&table).unwrap()
    }

    #[test]
    fn test_zone_row_features() {
        // Saturday 4 July 2026, 16:00 local: weekend, holiday, evening rush.
        let time = New_York.with_ymd_and_hms(2026, 7, 4, 16, 0, 0).unwrap();
        let moment = HotspotMoment::of(&time);
        assert!(moment.is_holiday);

        let row = build_zone_row("SoHo", &moment, &poi());
        assert_eq!(row.number("pickup_month"), Some(7.0));
        assert_eq!(row.number("pickup_day_of_week"), Some(5.0));
        assert_eq!(row.number("time_of_day_encoded"), Some(3.0));
        assert_eq!(row.number("nightlife_density_per_sq_mile_x_isweekend"), Some(10.0));
        assert_eq!(row.number("hotel_density_per_sq_mile_x_Evening_Rush"), Some(2.0));
        assert_eq!(row.number("nightlife_x_hotels"), Some(20.0));
        assert!(!row.contains("restaurants_x_tourism"));
        assert_eq!(row.category("day_time_interaction"), Some("5_Evening Rush"));
        assert_eq!(row.category("holiday_time_interaction"), Some("1_Evening Rush"));
        assert_eq!(
            row.category("zone_time_isweekend_interaction"),
            Some("SoHo_Evening Rush_1")
        );
        assert_eq!(row.category("zone_hour_holiday_interaction"), Some("SoHo_16_1"));
    }

    #[test]
    fn test_zone_without_poi() {
        let time = New_York.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap();
        let row = build_zone_row("Astoria", &HotspotMoment::of(&time), &poi());
        assert_eq!(row.number("is_weekend"), Some(0.0));
        assert!(!row.contains("nightlife_density_per_sq_mile"));
        assert_eq!(row.category("hour_isweekend_interaction"), Some("9_0"));
    }

    #[test]
    fn test_january_rejected() {
        let time = New_York.with_ymd_and_hms(2025, 1, 20, 9, 0, 0).unwrap();
        assert!(matches!(
            hotspot_month(&time),
            Err(PipelineError::UnsupportedMonth(m)) if m == "January"
        ));
        let time = New_York.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(hotspot_month(&time).unwrap(), Month::February);
    }
}
