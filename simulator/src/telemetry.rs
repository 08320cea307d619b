use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

/// Body accepted by `POST /api/send_telemetry`.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "Status")]
    pub status: u8,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

/// Simulated PIR occupancy sensor. Reports 1 while motion keeps being seen
/// and drops back to 0 once the hold window passes without motion.
#[derive(Debug)]
pub struct OccupancySensor {
    device_id: String,
    hold: Duration,
    motion_probability: f64,
    last_motion: Option<DateTime<Utc>>,
}

impl OccupancySensor {
    /// `motion_probability` is clamped to `[0, 1]`; NaN means no motion.
    pub fn new(device_id: String, hold: Duration, motion_probability: f64) -> Self {
        let motion_probability = if motion_probability.is_nan() {
            0.0
        } else {
            motion_probability.clamp(0.0, 1.0)
        };

        Self {
            device_id,
            hold,
            motion_probability,
            last_motion: None,
        }
    }

    /// Samples the sensor at `now`.
    pub fn sample(&mut self, rng: &mut impl Rng, now: DateTime<Utc>) -> Reading {
        if rng.gen_bool(self.motion_probability) {
            self.last_motion = Some(now);
        }
        self.reading_at(now)
    }

    fn reading_at(&self, now: DateTime<Utc>) -> Reading {
        let occupied = match (self.last_motion, chrono::Duration::from_std(self.hold)) {
            (Some(last), Ok(hold)) => now - last < hold,
            _ => false,
        };

        Reading {
            device_id: self.device_id.clone(),
            status: u8::from(occupied),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_704_067_200 + secs, 0).unwrap()
    }

    #[test]
    fn test_idle_sensor_reports_free() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut sensor = OccupancySensor::new("ESP32-0".to_string(), Duration::from_secs(10), 0.0);

        let reading = sensor.sample(&mut rng, at(0));
        assert_eq!(reading.status, 0);
        assert_eq!(reading.timestamp, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_motion_holds_for_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut sensor = OccupancySensor::new("ESP32-0".to_string(), Duration::from_secs(10), 1.0);
        assert_eq!(sensor.sample(&mut rng, at(0)).status, 1);

        sensor.motion_probability = 0.0;
        assert_eq!(sensor.sample(&mut rng, at(9)).status, 1);
        assert_eq!(sensor.sample(&mut rng, at(10)).status, 0);
    }

    #[test]
    fn test_out_of_range_probability_is_clamped() {
        let mut rng = StdRng::seed_from_u64(7);
        let hold = Duration::from_secs(10);

        let mut sensor = OccupancySensor::new("ESP32-0".to_string(), hold, f64::NAN);
        assert_eq!(sensor.motion_probability, 0.0);
        assert_eq!(sensor.sample(&mut rng, at(0)).status, 0);

        let mut sensor = OccupancySensor::new("ESP32-0".to_string(), hold, f64::INFINITY);
        assert_eq!(sensor.motion_probability, 1.0);
        assert_eq!(sensor.sample(&mut rng, at(0)).status, 1);

        let sensor = OccupancySensor::new("ESP32-0".to_string(), hold, -0.5);
        assert_eq!(sensor.motion_probability, 0.0);
    }

    #[test]
    fn test_reading_uses_device_field_names() {
        let reading = Reading {
            device_id: "ESP32-0".to_string(),
            status: 0,
            timestamp: "t".to_string(),
        };
        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(value["DeviceID"], "ESP32-0");
        assert_eq!(value["Status"], 0);
    }
}
