//! Fiducial-point location and clinical interval/axis computation
//!
//! Works on the dominant morphology class's extended average waveform and
//! its numeric difference arrays. Every search window that would leave the
//! array fails silently with `None`; dependent measurements stay at their
//! sentinel rather than aborting the run.

use serde::{Deserialize, Serialize};

/// Milliseconds per sample tick at the device's fixed 500 Hz rate.
pub const MS_PER_TICK: f64 = 2.0;

/// A located wave extremum: sample index within the template plus value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavePoint {
    pub index: usize,
    pub value: f64,
}

/// All fiducial points located on one template.
#[derive(Debug, Clone, Default)]
pub struct Fiducials {
    /// R peak (global maximum)
    pub r: Option<WavePoint>,
    /// Q peak (local minimum before R)
    pub q: Option<WavePoint>,
    /// QRS onset from the second-derivative crossing before Q
    pub q_onset: Option<usize>,
    /// S peak (local minimum after R)
    pub s: Option<WavePoint>,
    /// S end from the third-difference sign change
    pub s_end: Option<usize>,
    /// P peak
    pub p: Option<WavePoint>,
    /// P onset from the second-derivative peak before P
    pub p_onset: Option<usize>,
    /// P end from the second-derivative peak after P
    pub p_end: Option<usize>,
    /// T peak
    pub t: Option<WavePoint>,
    /// T end from the second-derivative peak after T
    pub t_end: Option<usize>,
}

/// Interval measurements in milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalSet {
    pub p_duration_ms: Option<f64>,
    pub pr_interval_ms: Option<f64>,
    pub qrs_duration_ms: Option<f64>,
    pub qt_interval_ms: Option<f64>,
    pub qtc_interval_ms: Option<f64>,
}

/// Frontal-plane axes in truncated degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisSet {
    pub p_deg: Option<i32>,
    pub qrs_deg: Option<i32>,
    pub t_deg: Option<i32>,
}

/// Forward first difference, one element shorter than the input.
fn diff(x: &[f64]) -> Vec<f64> {
    x.windows(2).map(|w| w[1] - w[0]).collect()
}

/// True when the pair straddles zero with a definite direction.
fn crossing(a: f64, b: f64) -> bool {
    (a < 0.0 && b >= 0.0) || (a > 0.0 && b <= 0.0)
}

/// Upward zero-crossing of the derivative: a local minimum of the signal.
fn upward(a: f64, b: f64) -> bool {
    a < 0.0 && b >= 0.0
}

/// Index of the minimum value over an inclusive index range.
fn argmin(x: &[f64], lo: usize, hi: usize) -> Option<usize> {
    let hi = hi.min(x.len().saturating_sub(1));
    (lo..=hi).min_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(std::cmp::Ordering::Equal))
}

/// Index of the maximum value over an inclusive index range.
fn argmax(x: &[f64], lo: usize, hi: usize) -> Option<usize> {
    let hi = hi.min(x.len().saturating_sub(1));
    (lo..=hi).max_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap_or(std::cmp::Ordering::Equal))
}

/// Extractor over one dominant template.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        FeatureExtractor
    }

    /// Locate every fiducial point on the template.
    pub fn locate(&self, template: &[f64]) -> Fiducials {
        let mut fid = Fiducials::default();
        if template.len() < 8 {
            return fid;
        }
        let d1 = diff(template);
        let d2 = diff(&d1);
        let d3 = diff(&d2);

        let r_idx = match argmax(template, 0, template.len() - 1) {
            Some(i) if template[i] > 0.0 => i,
            _ => return fid,
        };
        fid.r = Some(WavePoint { index: r_idx, value: template[r_idx] });

        fid.q = find_q(template, &d1, r_idx);
        if let Some(q) = fid.q {
            fid.q_onset = onset_before(&d2, q.index, 30);
        }

        fid.s = find_s(template, &d1, r_idx);
        if let Some(s) = fid.s {
            fid.s_end = third_diff_end(&d3, s.index, 40);
        }

        if let Some(q) = fid.q {
            fid.p = find_p(template, q.index);
            if let Some(p) = fid.p {
                fid.p_onset = curvature_peak(&d2, p.index.saturating_sub(50), p.index);
                fid.p_end = curvature_peak(&d2, p.index + 1, p.index + 50);
            }

            let t_start = fid.s_end.unwrap_or(r_idx + 40);
            fid.t = find_t(template, t_start, q.index + 250);
            if let Some(t) = fid.t {
                fid.t_end = curvature_peak(&d2, t.index + 1, t.index + 50);
            }
        }

        fid
    }

    /// Derive the interval set from located fiducials and the RR mean.
    pub fn intervals(&self, fid: &Fiducials, rr_ms: Option<f64>) -> IntervalSet {
        let mut set = IntervalSet::default();

        if let (Some(q), Some(s)) = (fid.q, fid.s) {
            if s.index > q.index {
                set.qrs_duration_ms = Some(MS_PER_TICK * (s.index - q.index) as f64);
            }
        }
        if let (Some(q), Some(onset)) = (fid.q, fid.p_onset) {
            if q.index > onset {
                set.pr_interval_ms = Some(MS_PER_TICK * (q.index - onset) as f64);
            }
        }
        if let (Some(onset), Some(end)) = (fid.p_onset, fid.p_end) {
            if end > onset {
                set.p_duration_ms = Some(MS_PER_TICK * (end - onset) as f64);
            }
        }
        if let (Some(q), Some(t_end)) = (fid.q, fid.t_end) {
            if t_end > q.index {
                let qt = MS_PER_TICK * (t_end - q.index) as f64;
                set.qt_interval_ms = Some(qt);
                if let Some(rr) = rr_ms {
                    if rr > 0.0 {
                        set.qtc_interval_ms = Some(qt / libm::sqrt(rr / 1000.0));
                    }
                }
            }
        }
        set
    }

    /// Frontal-plane axes from the primary template and its orthogonal
    /// projection (the same beat windows averaged on the derived lead).
    pub fn axes(&self, fid: &Fiducials, primary: &[f64], ortho: &[f64]) -> AxisSet {
        let mut axes = AxisSet::default();

        let qrs_points: Vec<usize> = [fid.q, fid.r, fid.s]
            .iter()
            .flatten()
            .map(|w| w.index)
            .collect();
        if !qrs_points.is_empty() {
            let first: f64 = qrs_points.iter().filter_map(|&i| primary.get(i)).sum();
            let second: f64 = qrs_points.iter().filter_map(|&i| ortho.get(i)).sum();
            axes.qrs_deg = frontal_axis(first, second);
        }

        if let Some(p) = fid.p {
            if let (Some(&a), Some(&b)) = (primary.get(p.index), ortho.get(p.index)) {
                axes.p_deg = frontal_axis(a, b);
            }
        }
        if let Some(t) = fid.t {
            if let (Some(&a), Some(&b)) = (primary.get(t.index), ortho.get(t.index)) {
                axes.t_deg = frontal_axis(a, b);
            }
        }
        axes
    }
}

/// Q wave: an upward derivative crossing 5..40 samples before R, refined
/// to the local minimum around the crossing.
fn find_q(template: &[f64], d1: &[f64], r: usize) -> Option<WavePoint> {
    let mut zero = None;
    for off in 5..=40usize {
        let i = r.checked_sub(off)?;
        if i == 0 {
            break;
        }
        if upward(d1[i - 1], d1[i]) {
            zero = Some(i);
            break;
        }
    }
    let zero = zero?;
    let idx = argmin(template, zero.saturating_sub(10), zero + 10)?;
    Some(WavePoint { index: idx, value: template[idx] })
}

/// S wave: the first upward derivative crossing after R, refined to the
/// local minimum around the crossing.
fn find_s(template: &[f64], d1: &[f64], r: usize) -> Option<WavePoint> {
    let mut zero = None;
    for i in (r + 1)..(r + 60).min(d1.len()) {
        if upward(d1[i - 1], d1[i]) {
            zero = Some(i);
            break;
        }
    }
    let zero = zero?;
    let idx = argmin(template, zero.saturating_sub(10), zero + 10)?;
    if idx <= r {
        return None;
    }
    Some(WavePoint { index: idx, value: template[idx] })
}

/// S end: first third-difference sign change after the S peak.
fn third_diff_end(d3: &[f64], s: usize, span: usize) -> Option<usize> {
    for j in (s + 1)..(s + span).min(d3.len()) {
        if crossing(d3[j - 1], d3[j]) {
            return Some(j);
        }
    }
    None
}

/// P wave: the maximum up to 150 samples before Q; must be positive.
fn find_p(template: &[f64], q: usize) -> Option<WavePoint> {
    if q < 2 {
        return None;
    }
    let lo = q.saturating_sub(150);
    let idx = argmax(template, lo, q - 1)?;
    if template[idx] <= 0.0 {
        return None;
    }
    Some(WavePoint { index: idx, value: template[idx] })
}

/// T wave: the maximum between the QRS boundary and the Q+250 horizon;
/// must be positive.
fn find_t(template: &[f64], start: usize, horizon: usize) -> Option<WavePoint> {
    if start >= template.len() {
        return None;
    }
    let idx = argmax(template, start, horizon)?;
    if template[idx] <= 0.0 {
        return None;
    }
    Some(WavePoint { index: idx, value: template[idx] })
}

/// Wave onset: second-derivative crossing walking backward from `from`.
fn onset_before(d2: &[f64], from: usize, span: usize) -> Option<usize> {
    let stop = from.saturating_sub(span).max(1);
    let from = from.min(d2.len().saturating_sub(1));
    for j in (stop..=from).rev() {
        if crossing(d2[j - 1], d2[j]) {
            return Some(j);
        }
    }
    None
}

/// Largest second-derivative value over an inclusive range.
fn curvature_peak(d2: &[f64], lo: usize, hi: usize) -> Option<usize> {
    if lo >= d2.len() {
        return None;
    }
    argmax(d2, lo, hi)
}

/// Frontal-plane angle from two orthogonal projections, truncated degrees.
pub fn frontal_axis(first: f64, second: f64) -> Option<i32> {
    let hyp = libm::hypot(first, second);
    if hyp == 0.0 {
        return None;
    }
    Some(libm::asin(second / hyp).to_degrees() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian(t: f64, center: f64, sigma: f64, amplitude: f64) -> f64 {
        let u = (t - center) / sigma;
        amplitude * (-0.5 * u * u).exp()
    }

    /// Stylized PQRST template, 400 samples, R at 200.
    fn pqrst_template() -> Vec<f64> {
        (0..400)
            .map(|i| {
                let t = i as f64;
                gaussian(t, 120.0, 8.0, 30.0)
                    + gaussian(t, 188.0, 2.5, -40.0)
                    + gaussian(t, 200.0, 3.5, 300.0)
                    + gaussian(t, 212.0, 2.5, -60.0)
                    + gaussian(t, 285.0, 14.0, 80.0)
            })
            .collect()
    }

    #[test]
    fn test_fiducial_ordering() {
        let template = pqrst_template();
        let fid = FeatureExtractor::new().locate(&template);

        let r = fid.r.unwrap();
        let q = fid.q.unwrap();
        let s = fid.s.unwrap();
        assert!(q.index < r.index, "Q {} before R {}", q.index, r.index);
        assert!(r.index < s.index, "R {} before S {}", r.index, s.index);
        assert_eq!(r.index, 200);
        assert!(q.value < 0.0);
        assert!(s.value < 0.0);
    }

    #[test]
    fn test_p_and_t_location() {
        let template = pqrst_template();
        let fid = FeatureExtractor::new().locate(&template);

        let p = fid.p.unwrap();
        assert!(p.index.abs_diff(120) <= 3, "P at {}", p.index);
        assert!(p.value > 20.0);

        let t = fid.t.unwrap();
        assert!(t.index.abs_diff(285) <= 3, "T at {}", t.index);

        let p_onset = fid.p_onset.unwrap();
        let p_end = fid.p_end.unwrap();
        assert!(p_onset < p.index && p.index < p_end);

        let t_end = fid.t_end.unwrap();
        assert!(t_end > t.index);
    }

    #[test]
    fn test_intervals_positive_and_scaled() {
        let template = pqrst_template();
        let extractor = FeatureExtractor::new();
        let fid = extractor.locate(&template);
        let set = extractor.intervals(&fid, Some(800.0));

        let qrs = set.qrs_duration_ms.unwrap();
        let pr = set.pr_interval_ms.unwrap();
        let qt = set.qt_interval_ms.unwrap();
        let qtc = set.qtc_interval_ms.unwrap();

        assert!(qrs > 0.0);
        assert!(pr > qrs / 2.0, "PR {} spans atrial conduction", pr);
        assert!(qt > qrs, "QT {} exceeds QRS {}", qt, qrs);
        // Bazett with RR 800 ms divides by sqrt(0.8) < 1, so QTc > QT
        assert!(qtc > qt);

        // Tick scaling: every interval is an even number of milliseconds
        for ms in [qrs, pr, qt] {
            assert_eq!(ms % MS_PER_TICK, 0.0);
        }
    }

    #[test]
    fn test_missing_waves_leave_sentinels() {
        // Bare R spike: no P, no T
        let template: Vec<f64> = (0..400)
            .map(|i| gaussian(i as f64, 200.0, 3.0, 300.0))
            .collect();
        let extractor = FeatureExtractor::new();
        let fid = extractor.locate(&template);

        assert!(fid.r.is_some());
        assert!(fid.p.is_none());
        let set = extractor.intervals(&fid, Some(800.0));
        assert!(set.pr_interval_ms.is_none());
        assert!(set.p_duration_ms.is_none());
    }

    #[test]
    fn test_all_negative_template_yields_nothing() {
        let template = vec![-5.0; 400];
        let fid = FeatureExtractor::new().locate(&template);
        assert!(fid.r.is_none());
        assert!(fid.q.is_none());
    }

    #[test]
    fn test_short_template_is_safe() {
        let fid = FeatureExtractor::new().locate(&[1.0, 2.0, 1.0]);
        assert!(fid.r.is_none());
    }

    #[test]
    fn test_frontal_axis_quadrants() {
        assert_eq!(frontal_axis(3.0, 4.0), Some(53));
        assert_eq!(frontal_axis(3.0, -4.0), Some(-53));
        assert_eq!(frontal_axis(1.0, 0.0), Some(0));
        assert_eq!(frontal_axis(0.0, 0.0), None);
        // Range is always within [-90, 90]
        assert_eq!(frontal_axis(0.0, 5.0), Some(90));
        assert_eq!(frontal_axis(0.0, -5.0), Some(-90));
    }

    #[test]
    fn test_axes_from_projections() {
        let template = pqrst_template();
        // Orthogonal projection: half the primary amplitude everywhere
        let ortho: Vec<f64> = template.iter().map(|v| v / 2.0).collect();
        let extractor = FeatureExtractor::new();
        let fid = extractor.locate(&template);
        let axes = extractor.axes(&fid, &template, &ortho);

        // atan-like relation: asin(0.5/hypot(1,0.5)) = 26 degrees
        assert_eq!(axes.qrs_deg, Some(26));
        assert_eq!(axes.p_deg, Some(26));
        assert_eq!(axes.t_deg, Some(26));
        for axis in [axes.qrs_deg, axes.p_deg, axes.t_deg] {
            let a = axis.unwrap();
            assert!((-90..=90).contains(&a));
        }
    }
}
