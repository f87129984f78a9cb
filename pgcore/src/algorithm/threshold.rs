use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::algorithm::segment::Segment;
use crate::config::PeakSearchConfig;
use crate::error::{PeakSearchError, Result};

/// Interquartile range of the standard normal distribution. Dividing an IQR
/// by this gives a standard deviation estimate that single outliers cannot inflate.
pub const IQR_TO_SIGMA: f64 = 1.349;

/// Percentile of already sorted data, linear interpolation between order statistics.
///
/// # Arguments
///
/// * `sorted` - values sorted in ascending order
/// * `q` - percentile in [0, 100]
///
/// # Returns
///
/// The interpolated value, NaN for empty input.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() { return f64::NAN; }
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Robust noise statistics of one width trial's S/N over one segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SegmentStats {
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub sigma: f64,
    pub period_mid: f64,
    pub log_period_mid: f64,
}

impl SegmentStats {
    pub fn from_segment(snrs: &[f64], seg: &Segment) -> Result<Self> {
        let mut values = match snrs.get(seg.start..seg.end) {
            Some(values) if !values.is_empty() => values.to_vec(),
            _ => return Err(PeakSearchError::ShapeMismatch { expected: snrs.len(), got: seg.end }),
        };
        values.sort_unstable_by(|a, b| a.total_cmp(b));

        let p25 = percentile(&values, 25.0);
        let median = percentile(&values, 50.0);
        let p75 = percentile(&values, 75.0);

        Ok(SegmentStats {
            p25,
            median,
            p75,
            sigma: (p75 - p25) / IQR_TO_SIGMA,
            period_mid: seg.period_mid,
            log_period_mid: seg.log_period_mid,
        })
    }

    /// Value the dynamic threshold is fitted to.
    #[inline]
    pub fn target(&self, nsigma: f64) -> f64 {
        self.median + nsigma * self.sigma
    }
}

/// Median and robust standard deviation of every segment.
pub fn segment_stats(snrs: &[f64], segments: &[Segment]) -> Result<Vec<SegmentStats>> {
    segments.iter().map(|seg| SegmentStats::from_segment(snrs, seg)).collect()
}

/// Ordinary least-squares polynomial fit.
///
/// # Description
///
/// Solves the Vandermonde system by SVD after scaling every column to unit
/// norm. Singular values below `n * eps` relative to the largest are dropped.
///
/// # Returns
///
/// `degree + 1` coefficients, highest degree first.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Vec<f64>> {
    if x.len() != y.len() {
        return Err(PeakSearchError::ThresholdFit(format!(
            "x and y lengths differ ({} vs {})", x.len(), y.len()
        )));
    }
    if x.is_empty() {
        return Err(PeakSearchError::ThresholdFit("no points to fit".to_string()));
    }

    let n = x.len();
    let ncoef = degree + 1;
    let mut lhs = DMatrix::<f64>::from_fn(n, ncoef, |r, c| x[r].powi((degree - c) as i32));

    let scale: Vec<f64> = lhs.column_iter()
        .map(|col| {
            let norm = col.norm();
            if norm > 0.0 { norm } else { 1.0 }
        })
        .collect();
    for (c, s) in scale.iter().enumerate() {
        lhs.column_mut(c).unscale_mut(*s);
    }

    let rhs = DVector::<f64>::from_column_slice(y);
    let svd = lhs.svd(true, true);
    let rcond = n as f64 * f64::EPSILON * svd.singular_values.max();
    let solution = svd.solve(&rhs, rcond)
        .map_err(|e| PeakSearchError::ThresholdFit(e.to_string()))?;

    Ok(solution.iter().zip(scale.iter()).map(|(c, s)| c / s).collect())
}

/// Evaluates a polynomial, coefficients highest degree first.
#[inline]
pub fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Detection threshold as a function of trial period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ThresholdFunction {
    /// Polynomial in ln(period), clamped below at `snr_min`
    Dynamic { coefficients: Vec<f64>, snr_min: f64 },
    /// Constant `snr_min`, reported as an all-zero polynomial of `degree`
    Static { snr_min: f64, degree: usize },
}

impl ThresholdFunction {
    #[inline]
    pub fn evaluate(&self, period: f64) -> f64 {
        match self {
            ThresholdFunction::Dynamic { coefficients, snr_min } => {
                polyval(coefficients, period.ln()).max(*snr_min)
            }
            ThresholdFunction::Static { snr_min, .. } => *snr_min,
        }
    }

    pub fn evaluate_many(&self, periods: &[f64]) -> Vec<f64> {
        periods.iter().map(|&p| self.evaluate(p)).collect()
    }

    /// Fitted coefficients, highest degree first.
    pub fn coefficients(&self) -> Vec<f64> {
        match self {
            ThresholdFunction::Dynamic { coefficients, .. } => coefficients.clone(),
            ThresholdFunction::Static { degree, .. } => vec![0.0; degree + 1],
        }
    }

    #[inline]
    pub fn snr_min(&self) -> f64 {
        match self {
            ThresholdFunction::Dynamic { snr_min, .. } | ThresholdFunction::Static { snr_min, .. } => *snr_min,
        }
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, ThresholdFunction::Dynamic { .. })
    }
}

/// Fits `median + nsigma * sigma` of every segment against its log period.
pub fn threshold_function_dynamic(
    stats: &[SegmentStats],
    snr_min: f64,
    nsigma: f64,
    polydeg: usize,
) -> Result<ThresholdFunction> {
    let x: Vec<f64> = stats.iter().map(|s| s.log_period_mid).collect();
    let y: Vec<f64> = stats.iter().map(|s| s.target(nsigma)).collect();
    let coefficients = polyfit(&x, &y, polydeg)?;
    Ok(ThresholdFunction::Dynamic { coefficients, snr_min })
}

pub fn threshold_function_static(snr_min: f64, polydeg: usize) -> ThresholdFunction {
    ThresholdFunction::Static { snr_min, degree: polydeg }
}

/// Picks the threshold policy: a constant threshold when there are fewer
/// than `min_segments` segments, a fitted one otherwise.
pub fn fit_threshold(stats: &[SegmentStats], config: &PeakSearchConfig) -> Result<ThresholdFunction> {
    if stats.len() < config.min_segments {
        debug!(
            "fit_threshold: {} segments < {}, constant threshold {}",
            stats.len(), config.min_segments, config.snr_min
        );
        return Ok(threshold_function_static(config.snr_min, config.polydeg));
    }
    let tfunc = threshold_function_dynamic(stats, config.snr_min, config.nsigma, config.polydeg)?;
    debug!("fit_threshold: {} segments, coefficients {:?}", stats.len(), tfunc.coefficients());
    Ok(tfunc)
}
