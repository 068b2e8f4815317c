//! Subsystem power model
//!
//! Turns a usage scenario (screen brightness, CPU load, radio traffic, ...)
//! into a total power draw using fixed linear coefficients. The coefficients
//! come from offline fits of measured energy logs; only their evaluation
//! lives here.

use serde::{Deserialize, Serialize};
use simcore::error::{SimResult, require_in_range, require_non_negative, require_positive};

/// Highest screen brightness level
pub const MAX_BRIGHTNESS: f64 = 255.0;

/// Linear power coefficients per subsystem
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerCoefficients {
    /// Screen power offset whenever the panel is lit (W)
    pub screen_base_w: f64,
    /// Watts per brightness level
    pub screen_slope_w: f64,
    /// CPU power at full load (W)
    pub cpu_max_power_w: f64,
    /// Watts per MB/s of WiFi traffic
    pub wifi_slope_w: f64,
}

impl Default for PowerCoefficients {
    fn default() -> Self {
        PowerCoefficients {
            screen_base_w: 0.05,
            screen_slope_w: 0.0055,
            cpu_max_power_w: 1.5,
            wifi_slope_w: 0.005,
        }
    }
}

/// How the phone is being used
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageScenario {
    /// 0 (screen off) to 255
    pub brightness: f64,
    /// 0.0 idle to 1.0 saturated
    pub cpu_load: f64,
    pub gpu_power_w: f64,
    pub audio_power_w: f64,
    pub wifi_mbps: f64,
    /// Everything not modelled separately: modem, sensors, leakage
    pub base_power_w: f64,
}

impl Default for UsageScenario {
    fn default() -> Self {
        Self::light_idle()
    }
}

impl UsageScenario {
    pub fn heavy_gaming() -> Self {
        UsageScenario {
            brightness: 220.0,
            cpu_load: 1.0,
            gpu_power_w: 2.0,
            audio_power_w: 0.3,
            wifi_mbps: 1.0,
            base_power_w: 0.4,
        }
    }

    pub fn video_streaming() -> Self {
        UsageScenario {
            brightness: 150.0,
            cpu_load: 0.3,
            gpu_power_w: 0.1,
            audio_power_w: 0.2,
            wifi_mbps: 5.0,
            base_power_w: 0.2,
        }
    }

    pub fn light_idle() -> Self {
        UsageScenario {
            brightness: 0.0,
            cpu_load: 0.02,
            gpu_power_w: 0.0,
            audio_power_w: 0.0,
            wifi_mbps: 0.0,
            base_power_w: 0.15,
        }
    }

    /// Named presets in display order
    pub fn presets() -> [(&'static str, UsageScenario); 3] {
        [
            ("Heavy Gaming", Self::heavy_gaming()),
            ("Video Streaming", Self::video_streaming()),
            ("Light Idle", Self::light_idle()),
        ]
    }

    pub fn validate(&self) -> SimResult<()> {
        require_in_range("brightness", self.brightness, 0.0, MAX_BRIGHTNESS)?;
        require_in_range("cpu load", self.cpu_load, 0.0, 1.0)?;
        require_non_negative("gpu power (W)", self.gpu_power_w)?;
        require_non_negative("audio power (W)", self.audio_power_w)?;
        require_non_negative("wifi throughput (MB/s)", self.wifi_mbps)?;
        require_non_negative("base power (W)", self.base_power_w)?;
        Ok(())
    }

    pub fn breakdown(&self, coeffs: &PowerCoefficients) -> SimResult<PowerBreakdown> {
        self.validate()?;
        // Screen off draws nothing, not the base term
        let screen_w = if self.brightness == 0.0 {
            0.0
        } else {
            coeffs.screen_base_w + coeffs.screen_slope_w * self.brightness
        };
        Ok(PowerBreakdown {
            screen_w,
            cpu_w: self.cpu_load * coeffs.cpu_max_power_w,
            gpu_w: self.gpu_power_w,
            wifi_w: self.wifi_mbps * coeffs.wifi_slope_w,
            audio_w: self.audio_power_w,
            base_w: self.base_power_w,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subsystem {
    Screen,
    Cpu,
    Gpu,
    Wifi,
    Audio,
    SystemBase,
}

impl Subsystem {
    pub fn label(&self) -> &'static str {
        match self {
            Subsystem::Screen => "Screen",
            Subsystem::Cpu => "CPU",
            Subsystem::Gpu => "GPU",
            Subsystem::Wifi => "WiFi",
            Subsystem::Audio => "Audio",
            Subsystem::SystemBase => "System Base",
        }
    }
}

/// Power per subsystem in watts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerBreakdown {
    pub screen_w: f64,
    pub cpu_w: f64,
    pub gpu_w: f64,
    pub wifi_w: f64,
    pub audio_w: f64,
    pub base_w: f64,
}

impl PowerBreakdown {
    pub fn total_w(&self) -> f64 {
        self.screen_w + self.cpu_w + self.wifi_w + self.gpu_w + self.audio_w + self.base_w
    }

    pub fn entries(&self) -> [(Subsystem, f64); 6] {
        [
            (Subsystem::Screen, self.screen_w),
            (Subsystem::Cpu, self.cpu_w),
            (Subsystem::Gpu, self.gpu_w),
            (Subsystem::Wifi, self.wifi_w),
            (Subsystem::Audio, self.audio_w),
            (Subsystem::SystemBase, self.base_w),
        ]
    }

    /// Subsystems drawing more than `threshold_w`, in display order.
    pub fn significant(&self, threshold_w: f64) -> Vec<(Subsystem, f64)> {
        self.entries()
            .into_iter()
            .filter(|&(_, watts)| watts > threshold_w)
            .collect()
    }

    /// Share of the total per subsystem, 0..1
    pub fn fractions(&self) -> Vec<(Subsystem, f64)> {
        let total = self.total_w();
        if total <= 0.0 {
            return Vec::new();
        }
        self.entries()
            .into_iter()
            .map(|(subsystem, watts)| (subsystem, watts / total))
            .collect()
    }
}

/// Energy-division runtime estimate in hours, ignoring all circuit losses.
pub fn naive_tte_hours(capacity_mah: f64, nominal_voltage: f64, soc: f64, total_w: f64) -> SimResult<f64> {
    require_positive("capacity (mAh)", capacity_mah)?;
    require_positive("nominal voltage", nominal_voltage)?;
    require_in_range("state of charge", soc, 0.0, 1.0)?;
    require_positive("total power (W)", total_w)?;
    let battery_wh = (capacity_mah / 1000.0) * nominal_voltage;
    Ok(battery_wh * soc / total_w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heavy_gaming_breakdown() {
        let breakdown = UsageScenario::heavy_gaming()
            .breakdown(&PowerCoefficients::default())
            .unwrap();

        assert!((breakdown.screen_w - (0.05 + 0.0055 * 220.0)).abs() < 1e-12);
        assert!((breakdown.cpu_w - 1.5).abs() < 1e-12);
        assert!((breakdown.wifi_w - 0.005).abs() < 1e-12);
        assert!((breakdown.total_w() - 5.465).abs() < 1e-9);
    }

    #[test]
    fn test_screen_off_draws_nothing() {
        let breakdown = UsageScenario::light_idle()
            .breakdown(&PowerCoefficients::default())
            .unwrap();
        assert_eq!(breakdown.screen_w, 0.0);
        assert!((breakdown.total_w() - (0.02 * 1.5 + 0.15)).abs() < 1e-12);
    }

    #[test]
    fn test_significant_filters_small_entries() {
        let breakdown = UsageScenario::light_idle()
            .breakdown(&PowerCoefficients::default())
            .unwrap();
        let shown = breakdown.significant(0.01);
        let names: Vec<_> = shown.iter().map(|(s, _)| s.label()).collect();
        assert_eq!(names, vec!["CPU", "System Base"]);
    }

    #[test]
    fn test_fractions_sum_to_one() {
        let breakdown = UsageScenario::video_streaming()
            .breakdown(&PowerCoefficients::default())
            .unwrap();
        let sum: f64 = breakdown.fractions().iter().map(|(_, f)| f).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_out_of_range_usage() {
        let coeffs = PowerCoefficients::default();
        let too_bright = UsageScenario { brightness: 300.0, ..UsageScenario::heavy_gaming() };
        assert!(too_bright.breakdown(&coeffs).is_err());

        let overloaded = UsageScenario { cpu_load: 1.5, ..UsageScenario::heavy_gaming() };
        assert!(overloaded.breakdown(&coeffs).is_err());

        let negative = UsageScenario { gpu_power_w: -0.1, ..UsageScenario::heavy_gaming() };
        assert!(negative.breakdown(&coeffs).is_err());
    }

    #[test]
    fn test_naive_tte() {
        // 4575 mAh at 3.87 V is about 17.7 Wh
        let hours = naive_tte_hours(4575.0, 3.87, 1.0, 3.87).unwrap();
        assert!((hours - 4.575).abs() < 1e-12);

        let half = naive_tte_hours(4575.0, 3.87, 0.5, 3.87).unwrap();
        assert!((half - hours / 2.0).abs() < 1e-12);

        assert!(naive_tte_hours(4575.0, 3.87, 1.0, 0.0).is_err());
    }
}
