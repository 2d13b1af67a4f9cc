//! Breakdown of MPRIS microsecond times into format placeholders

use crate::format::{FormatValue, Lookup};

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// A track length or position split into the units exposed to
/// `length_format` and `position_format`
#[derive(Debug, Clone, PartialEq)]
pub struct TimeElements {
    pub tot_sec: f64,
    pub seconds: i64,
    pub tot_min: f64,
    pub minutes: i64,
    pub tot_hours: f64,
    pub hours: i64,
    pub adapted: String,
}

impl TimeElements {
    /// Build from a time in microseconds; a missing value counts as zero
    pub fn from_micros(micros: Option<i64>) -> Self {
        let micros = micros.unwrap_or(0).max(0);

        let tot_sec = micros as f64 / MICROS_PER_SECOND;
        let seconds = (tot_sec as i64) % 60;

        let tot_min = tot_sec / 60.0;
        let minutes = (tot_min as i64) % 60;

        let tot_hours = tot_min / 60.0;
        let hours = (tot_hours as i64) % 60;

        let adapted = if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{}:{:02}", minutes, seconds)
        };

        TimeElements {
            tot_sec,
            seconds,
            tot_min,
            minutes,
            tot_hours,
            hours,
            adapted,
        }
    }

    /// Placeholder lookup for [`crate::format::render`]
    pub fn lookup(&self, name: &str) -> Lookup {
        let value = match name {
            "tot_sec" => FormatValue::Float(self.tot_sec),
            "seconds" => FormatValue::Int(self.seconds),
            "tot_min" => FormatValue::Float(self.tot_min),
            "minutes" => FormatValue::Int(self.minutes),
            "tot_hours" => FormatValue::Float(self.tot_hours),
            "hours" => FormatValue::Int(self.hours),
            "adapted" => FormatValue::Text(self.adapted.clone()),
            _ => return Lookup::Unknown,
        };
        Lookup::Value(value)
    }

    /// Render a `length_format`/`position_format` template
    pub fn render(&self, template: &str) -> String {
        crate::format::render(template, |name| self.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_track_is_minutes_and_seconds() {
        let t = TimeElements::from_micros(Some(65_000_000));
        assert_eq!(t.minutes, 1);
        assert_eq!(t.seconds, 5);
        assert_eq!(t.hours, 0);
        assert_eq!(t.adapted, "1:05");
    }

    #[test]
    fn test_long_track_pads_every_field() {
        let micros = (3600 + 2 * 60 + 3) * 1_000_000;
        let t = TimeElements::from_micros(Some(micros));
        assert_eq!(t.adapted, "01:02:03");
    }

    #[test]
    fn test_missing_length_is_zero() {
        let t = TimeElements::from_micros(None);
        assert_eq!(t.tot_sec, 0.0);
        assert_eq!(t.adapted, "0:00");
    }

    #[test]
    fn test_negative_time_clamps_to_zero() {
        let t = TimeElements::from_micros(Some(-5_000_000));
        assert_eq!(t.tot_sec, 0.0);
        assert_eq!(t.seconds, 0);
        assert_eq!(t.adapted, "0:00");
    }

    #[test]
    fn test_hours_wrap_at_sixty() {
        let t = TimeElements::from_micros(Some(61 * 3600 * 1_000_000));
        assert_eq!(t.hours, 1);
        assert_eq!(t.tot_hours, 61.0);
        assert_eq!(t.adapted, "01:00:00");

        // A whole multiple of 60 hours drops back to the short form
        let t = TimeElements::from_micros(Some(60 * 3600 * 1_000_000));
        assert_eq!(t.hours, 0);
        assert_eq!(t.adapted, "0:00");
    }

    #[test]
    fn test_render_with_totals() {
        let t = TimeElements::from_micros(Some(90_000_000));
        assert_eq!(t.render("{tot_sec}s"), "90.0s");
        assert_eq!(t.render("{tot_min} min"), "1.5 min");
        assert_eq!(t.render("{adapted} {bogus}"), "1:30 {bogus}");
    }
}
