use super::{ProgressSink, RunProgressEvent, RunSummary};
use std::io::{self, Write};

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&mut self, _event: &RunProgressEvent) {}
}

/// Line-oriented progress for a human operator.
///
/// ```text
/// #      Step   Time (ps)   Potential (kcal/mol)   Temp (K)  Progress   Speed (ns/day)
///       20000      40.000            -101234.567     300.12     10.0%            12.34
/// ```
///
/// Write failures are ignored; progress is not part of the scientific record.
pub struct ConsoleReporter<W: Write> {
    out: W,
    header_written: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn header(&mut self) {
        if self.header_written {
            return;
        }
        let _ = writeln!(
            self.out,
            "#{:>10} {:>11} {:>22} {:>10} {:>9} {:>16}",
            "Step", "Time (ps)", "Potential (kcal/mol)", "Temp (K)", "Progress", "Speed (ns/day)"
        );
        self.header_written = true;
    }
}

impl<W: Write> ProgressSink for ConsoleReporter<W> {
    fn minimized(&mut self, initial_energy: f64, minimized_energy: f64) {
        let _ = writeln!(
            self.out,
            "# minimized: {initial_energy:.3} -> {minimized_energy:.3} kcal/mol"
        );
        let _ = self.out.flush();
    }

    fn progress(&mut self, event: &RunProgressEvent) {
        self.header();
        let speed = event
            .ns_per_day()
            .map_or_else(|| "--".to_string(), |s| format!("{s:.2}"));
        let _ = writeln!(
            self.out,
            " {:>10} {:>11.3} {:>22.3} {:>10.2} {:>8.1}% {:>16}",
            event.step,
            event.time,
            event.potential_energy,
            event.temperature,
            event.percent_complete,
            speed
        );
        let _ = self.out.flush();
    }

    fn completed(&mut self, summary: &RunSummary) {
        let _ = writeln!(
            self.out,
            "# completed {} steps, {} frames, final {:.3} kcal/mol at {:.2} K in {:.1}s",
            summary.total_steps,
            summary.frames_written,
            summary.final_potential_energy,
            summary.final_temperature,
            summary.elapsed.as_secs_f64()
        );
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn event(step: u64) -> RunProgressEvent {
        RunProgressEvent {
            step,
            total_steps: 200_000,
            time: step as f64 * 0.002,
            potential_energy: -1234.5,
            temperature: 299.87,
            percent_complete: step as f64 / 2000.0,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn progress_lines_follow_a_single_header() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.progress(&event(20_000));
        reporter.progress(&event(40_000));
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('#'));
        assert!(lines[1].contains("20000"));
        assert!(lines[1].contains("-1234.500"));
        assert!(lines[1].contains("299.87"));
        assert!(lines[1].contains("10.0%"));
        assert!(lines[2].contains("20.0%"));
        // zero elapsed time has no speed
        assert!(lines[1].trim_end().ends_with("--"));
    }

    #[test]
    fn completion_line_reports_summary() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.completed(&RunSummary {
            total_steps: 1000,
            frames_written: 11,
            initial_energy: 10.0,
            minimized_energy: -5.0,
            final_potential_energy: -4.25,
            final_temperature: 301.0,
            elapsed: Duration::from_millis(1500),
        });
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            text,
            "# completed 1000 steps, 11 frames, final -4.250 kcal/mol at 301.00 K in 1.5s\n"
        );
    }

    #[test]
    fn speed_is_derived_from_elapsed_time() {
        let mut e = event(20_000);
        e.elapsed = Duration::from_secs(86_400);
        // 40 ps in one day
        assert!((e.ns_per_day().unwrap() - 0.04).abs() < 1e-12);
    }
}
