//! Piecewise-constant power schedules
//!
//! A schedule is a list of `(duration, power)` segments applied back to back.
//! The battery state is carried across segment boundaries; only the requested
//! power changes.

use serde::{Deserialize, Serialize};

use crate::error::{SimResult, require_non_negative};

/// One constant-power stretch of a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSegment {
    /// Segment length in seconds
    pub duration_s: f64,
    /// Requested power in watts
    pub power_w: f64,
    /// Optional tag such as "Medium" or "Gaming"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl LoadSegment {
    pub fn seconds(duration_s: f64, power_w: f64) -> Self {
        LoadSegment {
            duration_s,
            power_w,
            label: None,
        }
    }

    pub fn hours(duration_h: f64, power_w: f64) -> Self {
        Self::seconds(duration_h * 3600.0, power_w)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        require_non_negative("segment duration", self.duration_s)?;
        require_non_negative("segment power", self.power_w)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadSchedule {
    segments: Vec<LoadSegment>,
}

impl LoadSchedule {
    pub fn new(segments: Vec<LoadSegment>) -> SimResult<Self> {
        for segment in &segments {
            segment.validate()?;
        }
        Ok(LoadSchedule { segments })
    }

    /// Append a segment, builder style
    pub fn then(mut self, segment: LoadSegment) -> SimResult<Self> {
        segment.validate()?;
        self.segments.push(segment);
        Ok(self)
    }

    pub fn segments(&self) -> &[LoadSegment] {
        &self.segments
    }

    pub fn total_duration_s(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_s).sum()
    }

    /// Power requested at simulated time `t`, or `None` past the end.
    pub fn power_at(&self, t: f64) -> Option<f64> {
        let mut start = 0.0;
        for segment in &self.segments {
            let end = start + segment.duration_s;
            if t >= start && t < end {
                return Some(segment.power_w);
            }
            start = end;
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The day-long usage pattern: medium, light and heavy phases over
    /// fifteen hours starting at 09:00.
    pub fn typical_day() -> Self {
        const HIGH: f64 = 3.87;
        const MEDIUM: f64 = 2.21;
        const LOW: f64 = 1.00;
        let plan = [
            (0.5, MEDIUM, "Medium"),
            (2.5, LOW, "Low"),
            (1.0, MEDIUM, "Medium"),
            (1.0, HIGH, "High"),
            (3.0, LOW, "Low"),
            (1.5, MEDIUM, "Medium"),
            (2.0, HIGH, "High"),
            (2.0, MEDIUM, "Medium"),
            (1.5, LOW, "Low"),
        ];
        LoadSchedule {
            segments: plan
                .iter()
                .map(|&(hours, power, label)| LoadSegment::hours(hours, power).with_label(label))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_at_walks_segments() {
        let schedule = LoadSchedule::new(vec![
            LoadSegment::seconds(1800.0, 2.21),
            LoadSegment::seconds(1800.0, 1.00),
        ])
        .unwrap();

        assert_eq!(schedule.power_at(0.0), Some(2.21));
        assert_eq!(schedule.power_at(1799.0), Some(2.21));
        assert_eq!(schedule.power_at(1800.0), Some(1.00));
        assert_eq!(schedule.power_at(3600.0), None);
        assert!((schedule.total_duration_s() - 3600.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_negative_power() {
        let result = LoadSchedule::new(vec![LoadSegment::seconds(10.0, -1.0)]);
        assert!(result.is_err());

        let result = LoadSchedule::default().then(LoadSegment::seconds(-10.0, 1.0));
        assert!(result.is_err());
    }

    #[test]
    fn test_typical_day_spans_fifteen_hours() {
        let day = LoadSchedule::typical_day();
        assert_eq!(day.segments().len(), 9);
        assert!((day.total_duration_s() - 15.0 * 3600.0).abs() < 1e-9);
        assert_eq!(day.segments()[3].label.as_deref(), Some("High"));
    }

    #[test]
    fn test_serde_is_a_plain_list() {
        let schedule = LoadSchedule::new(vec![LoadSegment::hours(0.5, 2.21).with_label("Medium")]).unwrap();
        let json = serde_json::to_string(&schedule).unwrap();
        assert_eq!(json, r#"[{"duration_s":1800.0,"power_w":2.21,"label":"Medium"}]"#);

        let back: LoadSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schedule);
    }
}
