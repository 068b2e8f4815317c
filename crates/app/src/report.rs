//! Plain-text summaries printed by the CLI

use std::fmt;

use electrical::analysis::{DischargeRun, RunSummary, SweepPoint, Termination};
use electrical::load::PowerBreakdown;
use electrical::sensitivity::SensitivityReport;

fn termination_label(termination: Termination) -> &'static str {
    match termination {
        Termination::Depleted => "depleted",
        Termination::VoltageCollapse => "voltage collapse",
        Termination::TimeLimit => "time limit reached",
        Termination::ScheduleComplete => "schedule complete",
    }
}

/// `3.25 h (3 h 15 min)`
pub fn format_hours(hours: f64) -> String {
    let total_min = (hours * 60.0).floor() as u64;
    format!("{hours:.2} h ({} h {:02} min)", total_min / 60, total_min % 60)
}

pub struct Summary<'a>(pub &'a RunSummary);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        writeln!(f, "termination : {}", termination_label(summary.termination))?;
        writeln!(f, "runtime     : {}", format_hours(summary.tte_hours()))?;
        writeln!(f, "steps       : {}", summary.steps)?;
        match summary.final_voltage {
            Some(v) => writeln!(f, "final V     : {v:.4} V")?,
            None => writeln!(f, "final V     : -")?,
        }
        writeln!(f, "final SoC   : {:.2} %", summary.final_state_of_charge * 100.0)
    }
}

/// Summary followed by the sampled curve, one line per sample.
pub struct Trace<'a>(pub &'a DischargeRun);

impl fmt::Display for Trace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Summary(&self.0.summary))?;
        writeln!(f, "\n{:>10} {:>9} {:>9} {:>8} {:>7}", "t [min]", "V", "I [A]", "SoC [%]", "P [W]")?;
        let trace = &self.0.trace;
        for i in 0..trace.len() {
            writeln!(
                f,
                "{:>10.1} {:>9.4} {:>9.4} {:>8.2} {:>7.2}",
                trace.times_s[i] / 60.0,
                trace.voltages[i],
                trace.currents[i],
                trace.soc[i] * 100.0,
                trace.power_w[i]
            )?;
        }
        Ok(())
    }
}

pub struct Breakdown<'a> {
    pub name: &'a str,
    pub breakdown: &'a PowerBreakdown,
}

impl fmt::Display for Breakdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] Total Power: {:.3} W", self.name, self.breakdown.total_w())?;
        for (subsystem, fraction) in self.breakdown.fractions() {
            if fraction > 0.0 {
                writeln!(f, "  {:<12} {:>5.1} %", subsystem.label(), fraction * 100.0)?;
            }
        }
        Ok(())
    }
}

/// Tornado table, most influential parameter first
pub struct Sensitivity<'a>(pub &'a SensitivityReport);

impl fmt::Display for Sensitivity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(
            f,
            "Baseline TTE = {:.4} h, perturbation ±{:.0} %",
            report.baseline_tte_h,
            report.perturbation * 100.0
        )?;
        for row in report.ranked() {
            writeln!(
                f,
                "{:<28} Low={:>7.2}%  High={:>7.2}% | Sensitivity={:.2}",
                row.parameter.label(),
                row.delta_low_pct,
                row.delta_high_pct,
                row.index
            )?;
        }
        Ok(())
    }
}

/// One line per swept value
pub struct Sweep<'a> {
    pub parameter: &'a str,
    pub points: &'a [SweepPoint],
}

impl fmt::Display for Sweep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for point in self.points {
            writeln!(
                f,
                "{} = {:<8.4} {:<18} {}",
                self.parameter,
                point.value,
                termination_label(point.summary.termination),
                format_hours(point.summary.tte_hours())
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(termination: Termination, elapsed_s: f64) -> RunSummary {
        RunSummary {
            termination,
            elapsed_s,
            steps: elapsed_s as u64,
            final_voltage: None,
            final_state_of_charge: 1.0,
        }
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(3.25), "3.25 h (3 h 15 min)");
        assert_eq!(format_hours(0.0), "0.00 h (0 h 00 min)");
    }

    #[test]
    fn test_summary_mentions_termination() {
        let text = Summary(&summary(Termination::VoltageCollapse, 0.0)).to_string();
        assert!(text.contains("voltage collapse"));
        assert!(text.contains("final V     : -"));
        assert!(text.contains("100.00 %"));
    }

    #[test]
    fn test_sweep_lists_every_point() {
        let points = [
            SweepPoint { value: 0.05, summary: summary(Termination::Depleted, 15598.0) },
            SweepPoint { value: 0.15, summary: summary(Termination::Depleted, 14669.0) },
        ];
        let text = Sweep { parameter: "R0", points: &points }.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("R0 = 0.0500"));
        assert!(lines[1].contains("4.07 h (4 h 04 min)"));
    }
}
