//! Spectrum extraction.
//!
//! Performs a windowed FFT on the captured samples once per frame and maps
//! the smoothed magnitudes onto unsigned byte bins, the unit the
//! visualization consumes.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// FFT size; half of it becomes the bin count
const FFT_SIZE: usize = 256;

/// Number of spectrum bins handed to the visualization each frame
pub const BIN_COUNT: usize = FFT_SIZE / 2;

/// Exponential smoothing factor applied to magnitudes across frames
const SMOOTHING: f32 = 0.8;

/// Decibel window mapped onto the 0-255 bin range
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// One frame of spectrum data: ordered byte magnitudes plus their mean.
#[derive(Clone)]
pub struct SpectrumFrame {
    /// Per-bin energy magnitudes, 0-255
    pub bins: Vec<u8>,
    /// Arithmetic mean of all bins
    pub aggregate: f32,
}

impl SpectrumFrame {
    /// Panics on an empty bin sequence: downstream wrap-around indexing is
    /// undefined for zero bins, so that is a fatal configuration error.
    pub fn new(bins: Vec<u8>) -> Self {
        assert!(!bins.is_empty(), "spectrum frame must have at least one bin");
        let aggregate = bins.iter().map(|&b| b as f32).sum::<f32>() / bins.len() as f32;
        Self { bins, aggregate }
    }
}

/// Per-frame spectrum analyzer with pre-allocated FFT resources.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    fft_window: Vec<f32>,
    /// Time-smoothed linear magnitudes, carried across frames
    smoothed: [f32; BIN_COUNT],
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        // Pre-compute Hann window
        let fft_window: Vec<f32> = (0..FFT_SIZE)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / FFT_SIZE as f32).cos()))
            .collect();

        Self {
            fft,
            fft_buffer: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            fft_window,
            smoothed: [0.0; BIN_COUNT],
        }
    }

    /// Analyze captured samples. Call once per frame.
    pub fn analyze(&mut self, samples: &[f32]) -> SpectrumFrame {
        let sample_count = samples.len().min(FFT_SIZE);

        // Apply window and fill buffer (reusing the pre-allocated buffer),
        // zero-padding when fewer samples are available.
        for i in 0..FFT_SIZE {
            if i < sample_count {
                self.fft_buffer[i] = Complex::new(samples[i] * self.fft_window[i], 0.0);
            } else {
                self.fft_buffer[i] = Complex::new(0.0, 0.0);
            }
        }

        self.fft.process(&mut self.fft_buffer);

        let mut bins = Vec::with_capacity(BIN_COUNT);
        for i in 0..BIN_COUNT {
            let magnitude = self.fft_buffer[i].norm() / FFT_SIZE as f32;

            // Smooth in the linear domain before converting to dB
            self.smoothed[i] = self.smoothed[i] * SMOOTHING + magnitude * (1.0 - SMOOTHING);

            let db = 20.0 * (self.smoothed[i] + 1e-10).log10();
            let scaled = 255.0 * (db - MIN_DB) / (MAX_DB - MIN_DB);
            bins.push(scaled.clamp(0.0, 255.0) as u8);
        }

        SpectrumFrame::new(bins)
    }
}
