//! Time-bucketed rollups of the telemetry log for charting.
//!
//! Bucket ordering is part of the chart contract: hourly buckets run
//! ascending through the day, weekly and monthly buckets run descending by
//! recency (the front-end reverses them for display) and are capped at the
//! 10 / 12 most recent buckets.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::model::SensorReading;

/// Chart granularity for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Hour-of-day buckets, today's readings only.
    Hourly,
    /// ISO-week buckets, most recent 10.
    Weekly,
    /// Year-month buckets, most recent 12.
    Monthly,
}

impl Granularity {
    /// Bucket cap for this granularity; `None` means unbounded (hourly can
    /// never exceed 24 buckets anyway).
    fn limit(self) -> Option<usize> {
        match self {
            Granularity::Hourly => None,
            Granularity::Weekly => Some(10),
            Granularity::Monthly => Some(12),
        }
    }
}

impl FromStr for Granularity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Granularity::Hourly),
            // Legacy alias from the first dashboard iteration.
            "daily" => Ok(Granularity::Hourly),
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            _ => Err(()),
        }
    }
}

/// One aggregated bucket: the label charts group by, plus arithmetic means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryBucket {
    pub label: String,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
}

/// Label a reading's capture time for the given granularity, or `None`
/// when the reading falls outside the granularity's range (hourly only
/// looks at today).
fn bucket_label(
    captured_at: DateTime<Utc>,
    granularity: Granularity,
    now: DateTime<Utc>,
) -> Option<String> {
    match granularity {
        Granularity::Hourly => {
            if captured_at.date_naive() != now.date_naive() {
                return None;
            }
            Some(format!("{:02}:00", captured_at.hour()))
        }
        Granularity::Weekly => {
            let week = captured_at.iso_week();
            Some(format!("{}-{:02}", week.year(), week.week()))
        }
        Granularity::Monthly => Some(format!(
            "{}-{:02}",
            captured_at.year(),
            captured_at.month()
        )),
    }
}

/// Roll up readings into ordered buckets of mean temperature and humidity.
///
/// Readings are expected to belong to a single device; an empty slice
/// yields an empty result rather than an error.
pub fn aggregate(
    readings: &[SensorReading],
    granularity: Granularity,
    now: DateTime<Utc>,
) -> Vec<HistoryBucket> {
    let mut sums: HashMap<String, (f64, f64, u32)> = HashMap::new();

    for reading in readings {
        let Some(label) = bucket_label(reading.captured_at, granularity, now) else {
            continue;
        };
        let entry = sums.entry(label).or_insert((0.0, 0.0, 0));
        entry.0 += reading.temperature;
        entry.1 += reading.humidity;
        entry.2 += 1;
    }

    let mut buckets: Vec<HistoryBucket> = sums
        .into_iter()
        .map(|(label, (temp_sum, hum_sum, count))| HistoryBucket {
            label,
            avg_temperature: temp_sum / count as f64,
            avg_humidity: hum_sum / count as f64,
        })
        .collect();

    // Zero-padded labels sort chronologically as strings, matching the
    // GROUP BY label ordering the charts were built against.
    match granularity {
        Granularity::Hourly => buckets.sort_by(|a, b| a.label.cmp(&b.label)),
        Granularity::Weekly | Granularity::Monthly => {
            buckets.sort_by(|a, b| b.label.cmp(&a.label))
        }
    }

    if let Some(limit) = granularity.limit() {
        buckets.truncate(limit);
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceState;
    use pretty_assertions::assert_eq;

    fn reading(at: &str, temperature: f64, humidity: f64) -> SensorReading {
        SensorReading {
            device_id: "Room-01".to_string(),
            temperature,
            humidity,
            state: DeviceState::Unknown,
            desired_temp: None,
            captured_at: at.parse().unwrap(),
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_granularity() {
        assert_eq!("hourly".parse(), Ok(Granularity::Hourly));
        assert_eq!("daily".parse(), Ok(Granularity::Hourly));
        assert_eq!("weekly".parse(), Ok(Granularity::Weekly));
        assert_eq!("monthly".parse(), Ok(Granularity::Monthly));
        assert_eq!("yearly".parse::<Granularity>(), Err(()));
    }

    #[test]
    fn test_empty_readings_empty_result() {
        let buckets = aggregate(&[], Granularity::Hourly, Utc::now());
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_hourly_averages_within_bucket() {
        let readings = vec![
            reading("2026-08-23T09:00:00Z", 21.0, 50.0),
            reading("2026-08-23T09:45:00Z", 22.0, 60.0),
        ];

        let buckets = aggregate(&readings, Granularity::Hourly, ts("2026-08-23T12:00:00Z"));

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].label, "09:00");
        assert_eq!(buckets[0].avg_temperature, 21.5);
        assert_eq!(buckets[0].avg_humidity, 55.0);
    }

    #[test]
    fn test_hourly_ascending_and_today_only() {
        let readings = vec![
            reading("2026-08-23T14:10:00Z", 23.0, 40.0),
            reading("2026-08-23T08:05:00Z", 20.0, 45.0),
            reading("2026-08-22T08:05:00Z", 99.0, 99.0), // yesterday, ignored
        ];

        let buckets = aggregate(&readings, Granularity::Hourly, ts("2026-08-23T18:00:00Z"));

        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["08:00", "14:00"]);
        assert_eq!(buckets[0].avg_temperature, 20.0);
    }

    #[test]
    fn test_weekly_descending_capped_at_ten() {
        // One reading per ISO week across twelve consecutive weeks.
        let mut readings = Vec::new();
        for week in 0..12u32 {
            let day = 5 + week * 7; // 2026-01-05 is a Monday
            let date = ts("2026-01-01T00:00:00Z") + chrono::Duration::days(day as i64 - 1);
            readings.push(reading(&date.to_rfc3339(), 20.0, 50.0));
        }

        let buckets = aggregate(&readings, Granularity::Weekly, ts("2026-03-31T00:00:00Z"));

        assert_eq!(buckets.len(), 10);
        // Most recent week first.
        assert!(buckets[0].label > buckets[9].label);
    }

    #[test]
    fn test_weekly_label_format() {
        let readings = vec![reading("2026-08-23T09:00:00Z", 21.0, 50.0)];
        let buckets = aggregate(&readings, Granularity::Weekly, ts("2026-08-23T12:00:00Z"));
        // 2026-08-23 is a Sunday of ISO week 34.
        assert_eq!(buckets[0].label, "2026-34");
    }

    #[test]
    fn test_monthly_descending_capped_at_twelve() {
        let mut readings = Vec::new();
        for month in 1..=12u32 {
            readings.push(reading(
                &format!("2025-{month:02}-15T12:00:00Z"),
                20.0,
                50.0,
            ));
        }
        readings.push(reading("2026-01-15T12:00:00Z", 20.0, 50.0));

        let buckets = aggregate(&readings, Granularity::Monthly, ts("2026-01-20T00:00:00Z"));

        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].label, "2026-01");
        assert_eq!(buckets[11].label, "2025-02");
    }

    #[test]
    fn test_bucket_wire_names() {
        let bucket = HistoryBucket {
            label: "09:00".to_string(),
            avg_temperature: 21.5,
            avg_humidity: 55.0,
        };
        let json = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json["avgTemperature"], 21.5);
        assert_eq!(json["avgHumidity"], 55.0);
    }
}
