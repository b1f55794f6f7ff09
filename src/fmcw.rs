use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

use crate::frame::Frame;

pub const FFT_SIZE: usize = 256;
pub const SAMPLE_RATE: f64 = 5_000_000.0;
pub const SWEEP_BANDWIDTH: f64 = 2_000_000.0;
/// TX/RX amplitude in ADC counts.
pub const AMPLITUDE: f64 = 2000.0;

/// FMCW range processing: linear chirp reference, dechirp mixing, Hann window,
/// FFT and magnitudes of the first half of the spectrum.
///
/// With a sweep of `bandwidth` over one buffer of `fft_size` samples, an echo
/// delayed by `tau` seconds beats at `bandwidth * tau` bins.
pub struct Radar {
    fft_size: usize,
    sample_rate: f64,
    bandwidth: f64,
    reference: Vec<Complex<f64>>,
    window: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
}

impl Radar {
    pub fn new(fft_size: usize, sample_rate: f64, bandwidth: f64) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let mut radar = Self {
            fft_size,
            sample_rate,
            bandwidth,
            reference: Vec::new(),
            window: create_hann_window(fft_size),
            fft,
        };
        radar.reference = (0..fft_size)
            .map(|i| Complex::from_polar(1.0, radar.chirp_phase(i as f64 / sample_rate)))
            .collect();
        radar
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of magnitudes reported per frame.
    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }

    pub fn reference(&self) -> &[Complex<f64>] {
        &self.reference
    }

    /// Phase of the unit chirp at time `t`, extended as a parabola outside the sweep.
    fn chirp_phase(&self, t: f64) -> f64 {
        let sweep_time = self.fft_size as f64 / self.sample_rate;
        PI * (self.bandwidth / sweep_time) * t * t
    }

    pub fn delay_for_bin(&self, bin: f64) -> f64 {
        bin / self.bandwidth
    }

    pub fn bin_for_delay(&self, delay: f64) -> f64 {
        self.bandwidth * delay
    }

    /// Simulated receive buffer: the chirp delayed by `delay` seconds, plus the
    /// undelayed TX leakage scaled by `leakage`.
    pub fn echo(&self, delay: f64, leakage: f64) -> Vec<Complex<f64>> {
        (0..self.fft_size)
            .map(|i| {
                let t = i as f64 / self.sample_rate;
                let target = Complex::from_polar(AMPLITUDE, self.chirp_phase(t - delay));
                target + self.reference[i] * (AMPLITUDE * leakage)
            })
            .collect()
    }

    /// Dechirp `rx` against the reference, window it, transform it and keep the
    /// magnitudes of bins `0..fft_size / 2`.
    pub fn process(&self, rx: &[Complex<f64>]) -> Frame {
        let mut buffer: Vec<Complex<f64>> = self
            .reference
            .iter()
            .zip(rx.iter())
            .zip(self.window.iter())
            .map(|((&r, &x), &w)| r * x.conj() * w)
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        Frame::new(buffer.iter().take(self.bins()).map(|bin| bin.norm()).collect())
    }
}

impl Default for Radar {
    fn default() -> Self {
        Self::new(FFT_SIZE, SAMPLE_RATE, SWEEP_BANDWIDTH)
    }
}

fn create_hann_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - ((2.0 * PI * i as f64) / (size - 1) as f64).cos()))
        .collect()
}

/// Bin the simulated target sits in for frame `frame_index`; sweeps `2..bins - 1`
/// so it never merges with the DC leakage.
pub fn target_bin(bins: usize, frame_index: u64) -> Option<usize> {
    if bins < 4 {
        return None;
    }
    Some(2 + (frame_index % (bins as u64 - 3)) as usize)
}

/// Frame the radar would report for a target whose range moves with `frame_index`.
pub fn simulate_frame(radar: &Radar, frame_index: u64) -> Frame {
    let delay = target_bin(radar.bins(), frame_index)
        .map(|bin| radar.delay_for_bin(bin as f64));
    let rx = match delay {
        Some(delay) => radar.echo(delay, 0.3),
        None => radar.echo(0.0, 0.0),
    };
    radar.process(&rx)
}
