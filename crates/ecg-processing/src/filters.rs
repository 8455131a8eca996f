//! Digital filters for ECG signal conditioning
//!
//! One direct-form filter type covers every shape the pipeline needs:
//! pure-FIR (notch, derivative), recursive IIR (baseline and QRS band
//! shaping) and box moving-average, all parameterized by coefficient sets
//! from the published tables in [`crate::coefficients`].

use crate::coefficients::{
    BaselineBiquad, BASELINE_HP_005, BASELINE_HP_015, BASELINE_HP_05, DERIVATIVE_FF,
    INTEGRATION_WINDOW, NOTCH_50_HZ, NOTCH_60_HZ, QRS_HIGHPASS_FB, QRS_HIGHPASS_FF,
    QRS_LOWPASS_FB, QRS_LOWPASS_FF, QRS_LOWPASS_GAIN,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Baseline-removal cutoff selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaselineCutoff {
    /// 0.05 Hz cutoff
    Hz005,
    /// 0.15 Hz cutoff
    Hz015,
    /// 0.5 Hz cutoff
    Hz05,
}

impl BaselineCutoff {
    fn biquad(self) -> BaselineBiquad {
        match self {
            BaselineCutoff::Hz005 => BASELINE_HP_005,
            BaselineCutoff::Hz015 => BASELINE_HP_015,
            BaselineCutoff::Hz05 => BASELINE_HP_05,
        }
    }
}

/// Powerline interference frequency selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerlineFreq {
    /// No notch filtering
    Off,
    /// 50 Hz mains
    Hz50,
    /// 60 Hz mains
    Hz60,
}

/// Single-sample-at-a-time linear recursive filter.
///
/// `process` shifts the bounded history buffers, computes the weighted sum
/// and returns the new output; state is never reset mid-run so the filter
/// behaves like the continuous real-time process it models. Inputs are
/// divided by `gain` before the taps. Feedback taps *add*:
/// `y[n] = sum(ff[i] * x[n-i]) + sum(fb[j] * y[n-1-j])`.
#[derive(Debug, Clone)]
pub struct DirectFormFilter {
    feed_forward: Vec<f64>,
    feedback: Vec<f64>,
    gain: f64,
    x_hist: VecDeque<f64>,
    y_hist: VecDeque<f64>,
}

impl DirectFormFilter {
    /// Feed-forward only filter.
    pub fn fir(taps: &[f64]) -> Self {
        Self::iir(taps, &[], 1.0)
    }

    /// Recursive filter with feed-forward and feedback taps.
    pub fn iir(feed_forward: &[f64], feedback: &[f64], gain: f64) -> Self {
        let mut x_hist = VecDeque::with_capacity(feed_forward.len());
        let mut y_hist = VecDeque::with_capacity(feedback.len());
        x_hist.extend(std::iter::repeat(0.0).take(feed_forward.len()));
        y_hist.extend(std::iter::repeat(0.0).take(feedback.len()));

        DirectFormFilter {
            feed_forward: feed_forward.to_vec(),
            feedback: feedback.to_vec(),
            gain,
            x_hist,
            y_hist,
        }
    }

    /// Box moving-average as the FIR special case.
    pub fn moving_average(window: usize) -> Self {
        let window = window.max(1);
        Self::fir(&vec![1.0 / window as f64; window])
    }

    /// Process one sample and return the filtered value.
    pub fn process(&mut self, input: f64) -> f64 {
        self.x_hist.pop_back();
        self.x_hist.push_front(input / self.gain);

        let mut acc = 0.0f64;
        for (tap, x) in self.feed_forward.iter().zip(self.x_hist.iter()) {
            acc += tap * x;
        }
        for (tap, y) in self.feedback.iter().zip(self.y_hist.iter()) {
            acc += tap * y;
        }

        if !self.feedback.is_empty() {
            self.y_hist.pop_back();
            self.y_hist.push_front(acc);
        }
        acc
    }

    /// Run the filter over a whole series, returning the filtered copy.
    pub fn apply(&mut self, input: &[f64]) -> Vec<f64> {
        input.iter().map(|&x| self.process(x)).collect()
    }

    /// Filter order (longest tap set).
    pub fn order(&self) -> usize {
        self.feed_forward.len().max(self.feedback.len() + 1)
    }
}

/// Baseline-drift removal high-pass for the configured cutoff.
pub fn baseline_highpass(cutoff: BaselineCutoff) -> DirectFormFilter {
    let bq = cutoff.biquad();
    DirectFormFilter::iir(&[1.0, -2.0, 1.0], &[bq.hp1, bq.hp0], bq.gain)
}

/// Powerline notch for the configured mains frequency, if any.
pub fn powerline_notch(freq: PowerlineFreq) -> Option<DirectFormFilter> {
    match freq {
        PowerlineFreq::Off => None,
        PowerlineFreq::Hz50 => Some(DirectFormFilter::fir(&NOTCH_50_HZ)),
        PowerlineFreq::Hz60 => Some(DirectFormFilter::fir(&NOTCH_60_HZ)),
    }
}

/// QRS band-shaping low-pass half of the detection pair.
pub fn qrs_lowpass() -> DirectFormFilter {
    DirectFormFilter::iir(&QRS_LOWPASS_FF, &QRS_LOWPASS_FB, QRS_LOWPASS_GAIN)
}

/// QRS band-shaping high-pass half of the detection pair.
pub fn qrs_highpass() -> DirectFormFilter {
    DirectFormFilter::iir(&QRS_HIGHPASS_FF, &QRS_HIGHPASS_FB, 1.0)
}

/// First-order RC baseline corrector, a cheaper alternative to the biquad
/// when only coarse drift removal is needed.
pub fn rc_baseline(cutoff_hz: f64, sampling_rate: f64) -> DirectFormFilter {
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff_hz);
    let dt = 1.0 / sampling_rate;
    let alpha = rc / (rc + dt);
    DirectFormFilter::iir(&[alpha, -alpha], &[alpha], 1.0)
}

/// First-difference derivative.
pub fn derivative() -> DirectFormFilter {
    DirectFormFilter::fir(&DERIVATIVE_FF)
}

/// Boxcar integrator over the rectified derivative.
pub fn integrator() -> DirectFormFilter {
    DirectFormFilter::moving_average(INTEGRATION_WINDOW)
}

/// Ordered cascade of filters applied in sequence.
pub struct FilterCascade {
    stages: Vec<DirectFormFilter>,
}

impl FilterCascade {
    pub fn new() -> Self {
        FilterCascade { stages: Vec::new() }
    }

    pub fn push(&mut self, stage: DirectFormFilter) -> &mut Self {
        self.stages.push(stage);
        self
    }

    /// Conditioning chain for a raw lead: baseline removal plus optional
    /// powerline notch.
    pub fn conditioning(cutoff: BaselineCutoff, powerline: PowerlineFreq) -> Self {
        let mut cascade = FilterCascade::new();
        cascade.push(baseline_highpass(cutoff));
        if let Some(notch) = powerline_notch(powerline) {
            cascade.push(notch);
        }
        cascade
    }

    pub fn process(&mut self, input: f64) -> f64 {
        self.stages.iter_mut().fold(input, |x, stage| stage.process(x))
    }

    pub fn apply(&mut self, input: &[f64]) -> Vec<f64> {
        input.iter().map(|&x| self.process(x)).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for FilterCascade {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_input_zero_output() {
        let zeros = vec![0.0; 256];
        let mut shapes = vec![
            DirectFormFilter::fir(&NOTCH_50_HZ),
            baseline_highpass(BaselineCutoff::Hz05),
            qrs_lowpass(),
            qrs_highpass(),
            derivative(),
            DirectFormFilter::moving_average(16),
        ];
        for filter in &mut shapes {
            let out = filter.apply(&zeros);
            assert!(out.iter().all(|&y| y == 0.0));
        }
    }

    #[test]
    fn test_moving_average_converges_on_constant() {
        let mut filter = DirectFormFilter::moving_average(10);
        let out = filter.apply(&vec![1.0; 100]);
        // Once the window has filled, the average is exactly the input
        assert!((out[50] - 1.0).abs() < 1e-12);
        // Before it fills, the zero-initialized history dilutes the mean
        assert!(out[0] < 1.0);
    }

    #[test]
    fn test_derivative_of_ramp_is_constant() {
        let ramp: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let mut filter = derivative();
        let out = filter.apply(&ramp);
        for &y in &out[1..] {
            assert!((y - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_baseline_highpass_removes_dc() {
        let mut filter = baseline_highpass(BaselineCutoff::Hz05);
        let out = filter.apply(&vec![100.0; 4000]);
        // A constant input decays toward zero through the high-pass
        let tail: f64 = out[3500..].iter().map(|y| y.abs()).sum::<f64>() / 500.0;
        assert!(tail < 1.0, "residual DC {}", tail);
    }

    #[test]
    fn test_qrs_pair_passes_sharp_transients() {
        // An impulse must survive the band-shaping pair with nonzero energy
        let mut input = vec![0.0; 128];
        input[64] = 100.0;

        let mut lowpass = qrs_lowpass();
        let mut highpass = qrs_highpass();
        let shaped: Vec<f64> = input
            .iter()
            .map(|&x| highpass.process(lowpass.process(x)))
            .collect();

        let energy: f64 = shaped.iter().map(|y| y * y).sum();
        assert!(energy > 0.0);
    }

    #[test]
    fn test_rc_baseline_rejects_dc() {
        let mut filter = rc_baseline(0.5, 500.0);
        let out = filter.apply(&vec![50.0; 4000]);
        assert!(out[0] > 0.0);
        assert!(out[3999].abs() < 0.5, "residual DC {}", out[3999]);
    }

    #[test]
    fn test_cascade_order_and_state() {
        let mut cascade = FilterCascade::conditioning(BaselineCutoff::Hz015, PowerlineFreq::Hz60);
        assert_eq!(cascade.len(), 2);

        let out = cascade.apply(&vec![0.0; 64]);
        assert!(out.iter().all(|&y| y == 0.0));
    }
}
