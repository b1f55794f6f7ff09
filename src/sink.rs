use std::io::Write;
use std::ops::Range;
use std::time::Duration;
use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::Config;
use crate::frame::Frame;

/// Rendering backend fed by the visualization consumer.
pub trait FrameSink {
    /// Replace the displayed series with `frame` and redraw.
    fn update(&mut self, frame: &Frame) -> Result<()>;

    /// How long the receive loop should yield after an update so the
    /// backend gets a chance to draw.
    fn redraw_pause(&self) -> Duration {
        Duration::ZERO
    }
}

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const LABEL_WIDTH: usize = 10;

/// Column chart drawn with plain characters on a terminal.
pub struct TerminalPlot<W: Write> {
    out: W,
    width: usize,
    height: usize,
    clear_screen: bool,
    pause: Duration,
    series: Vec<f64>,
    x_range: Range<usize>,
    frames: u64,
}

impl<W: Write> TerminalPlot<W> {
    pub fn new(out: W, width: usize, height: usize) -> Self {
        Self {
            out,
            width: width.max(1),
            height: height.max(1),
            clear_screen: false,
            pause: Duration::ZERO,
            series: Vec::new(),
            x_range: 0..0,
            frames: 0,
        }
    }

    pub fn from_config(out: W, config: &Config) -> Self {
        Self::new(out, config.plot_width, config.plot_height)
            .with_clear_screen(config.clear_screen)
            .with_redraw_pause(config.redraw_pause())
    }

    pub fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    pub fn with_redraw_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn series(&self) -> &[f64] {
        &self.series
    }

    pub fn x_range(&self) -> Range<usize> {
        self.x_range.clone()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn redraw(&mut self) -> Result<()> {
        let chart = self.render();
        if self.clear_screen {
            self.out.write_all(CLEAR_SCREEN.as_bytes())?;
        }
        self.out.write_all(chart.as_bytes())?;
        self.out.flush().context("Failed to flush plot output")?;
        Ok(())
    }

    fn render(&self) -> String {
        let peak = match Frame::new(self.series.clone()).peak(1) {
            Some((bin, value)) => format!("peak bin {} = {:.2}", bin, value),
            None => "peak -".to_string(),
        };
        let mut text = format!(
            "frame {} | {} samples | x [{}, {}) | {}\n",
            self.frames,
            self.series.len(),
            self.x_range.start,
            self.x_range.end,
            peak
        );

        let columns = self.columns();
        if columns.is_empty() {
            text.push_str("(no samples)\n");
            return text;
        }

        let y_max = columns.iter().copied().fold(0.0_f64, f64::max);
        let scale = if y_max > 0.0 { y_max } else { 1.0 };
        let levels: Vec<usize> = columns
            .iter()
            .map(|v| {
                let level = (v.max(0.0) / scale * self.height as f64).round();
                (level as usize).min(self.height)
            })
            .collect();

        for row in (1..=self.height).rev() {
            let label = if row == self.height {
                format!("{:>width$.2}", scale, width = LABEL_WIDTH)
            } else if row == 1 {
                format!("{:>width$.2}", 0.0, width = LABEL_WIDTH)
            } else {
                " ".repeat(LABEL_WIDTH)
            };
            let bars: String = levels
                .iter()
                .map(|&level| if level >= row { '#' } else { ' ' })
                .collect();
            text.push_str(&format!("{} |{}\n", label, bars.trim_end()));
        }

        text.push_str(&format!("{} +{}\n", " ".repeat(LABEL_WIDTH), "-".repeat(levels.len())));
        let end = self.x_range.end.to_string();
        let gap = (levels.len() + 1).saturating_sub(end.len() + 1).max(1);
        text.push_str(&format!("{}  0{}{}\n", " ".repeat(LABEL_WIDTH), " ".repeat(gap), end));
        text
    }

    /// Bucket the series into at most `width` columns, keeping each bucket's
    /// largest finite value.
    fn columns(&self) -> Vec<f64> {
        let n = self.series.len();
        let count = self.width.min(n);
        (0..count)
            .map(|c| {
                let start = c * n / count;
                let end = (c + 1) * n / count;
                self.series[start..end]
                    .iter()
                    .copied()
                    .filter(|v| v.is_finite())
                    .fold(0.0_f64, f64::max)
            })
            .collect()
    }
}

impl<W: Write> FrameSink for TerminalPlot<W> {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        self.series = frame.samples().to_vec();
        self.x_range = frame.x_range();
        self.frames += 1;
        self.redraw()
    }

    fn redraw_pause(&self) -> Duration {
        self.pause
    }
}

#[derive(Serialize)]
struct FrameRecord {
    x_range: [usize; 2],
    samples: Vec<serde_json::Value>,
}

/// JSON has no infinities or NaN, so those go out as the strings `"inf"`,
/// `"-inf"` and `"NaN"` instead of collapsing to `null`.
fn sample_value(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(v.to_string()))
}

/// Writes every frame as one JSON object per line.
pub struct JsonLines<W: Write> {
    out: W,
}

impl<W: Write> JsonLines<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> FrameSink for JsonLines<W> {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        let range = frame.x_range();
        let record = FrameRecord {
            x_range: [range.start, range.end],
            samples: frame.samples().iter().copied().map(sample_value).collect(),
        };
        serde_json::to_writer(&mut self.out, &record).context("Failed to encode frame")?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(plot: &TerminalPlot<Vec<u8>>) -> String {
        String::from_utf8(plot.get_ref().clone()).unwrap()
    }

    #[test]
    fn update_replaces_series() {
        let mut plot = TerminalPlot::new(Vec::new(), 8, 4);
        plot.update(&Frame::new(vec![1.0, 2.0, 3.0, 4.0])).unwrap();
        plot.update(&Frame::new(vec![1.0, 2.5, 3.2])).unwrap();

        assert_eq!(plot.series(), &[1.0, 2.5, 3.2]);
        assert_eq!(plot.x_range(), 0..3);
        assert_eq!(plot.frames(), 2);
    }

    #[test]
    fn header_reports_range_and_peak() {
        let mut plot = TerminalPlot::new(Vec::new(), 8, 4);
        plot.update(&Frame::new(vec![50.0, 1.0, 9.5, 2.0])).unwrap();

        let text = output(&plot);
        assert!(text.starts_with("frame 1 | 4 samples | x [0, 4) | peak bin 2 = 9.50\n"));
    }

    #[test]
    fn tallest_column_reaches_top_row() {
        let mut plot = TerminalPlot::new(Vec::new(), 4, 4);
        plot.update(&Frame::new(vec![0.0, 4.0, 2.0, 0.0])).unwrap();

        let text = output(&plot);
        let rows: Vec<&str> = text.lines().skip(1).take(4).collect();
        assert_eq!(rows[0], "      4.00 | #");
        assert_eq!(rows[3], "      0.00 | ##");
    }

    #[test]
    fn wide_frames_are_bucketed() {
        let mut plot = TerminalPlot::new(Vec::new(), 4, 2);
        let samples: Vec<f64> = (0..128).map(|i| i as f64).collect();
        plot.update(&Frame::new(samples)).unwrap();

        let text = output(&plot);
        let axis = text.lines().nth(3).unwrap();
        assert_eq!(axis.trim(), "+----");
        assert!(text.lines().nth(4).unwrap().trim_end().ends_with("128"));
    }

    #[test]
    fn clear_screen_prefix() {
        let mut plot = TerminalPlot::new(Vec::new(), 4, 2).with_clear_screen(true);
        plot.update(&Frame::new(vec![1.0])).unwrap();
        assert!(output(&plot).starts_with(CLEAR_SCREEN));
    }

    #[test]
    fn redraw_pause_from_config() {
        let plot = TerminalPlot::from_config(Vec::new(), &Config::default());
        assert_eq!(plot.redraw_pause(), Duration::from_millis(10));
    }

    #[test]
    fn json_lines_shape() {
        let mut sink = JsonLines::new(Vec::new());
        sink.update(&Frame::new(vec![1.0, 2.5, 3.2])).unwrap();
        sink.update(&Frame::new(vec![7.0])).unwrap();

        let text = String::from_utf8(sink.get_ref().clone()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0], serde_json::json!({"x_range": [0, 3], "samples": [1.0, 2.5, 3.2]}));
        assert_eq!(lines[1]["x_range"], serde_json::json!([0, 1]));
        assert_eq!(sink.redraw_pause(), Duration::ZERO);
    }

    #[test]
    fn json_lines_keeps_non_finite_samples() {
        let mut sink = JsonLines::new(Vec::new());
        sink.update(&Frame::parse("DATA:1,inf,nan,-inf").unwrap()).unwrap();

        let text = String::from_utf8(sink.get_ref().clone()).unwrap();
        assert_eq!(
            text,
            "{\"x_range\":[0,4],\"samples\":[1.0,\"inf\",\"NaN\",\"-inf\"]}\n"
        );
    }
}
