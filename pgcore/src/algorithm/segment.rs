use log::debug;
use serde::Serialize;

use crate::error::{PeakSearchError, Result};

/// Contiguous block of period trials `[start, end)` over which the noise
/// statistics are assumed stationary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub mid: usize,
    pub period_mid: f64,
    pub log_period_mid: f64,
}

impl Segment {
    #[inline]
    pub fn len(&self) -> usize { self.end - self.start }

    #[inline]
    pub fn is_empty(&self) -> bool { self.end == self.start }
}

/// Breaks the period trials into equal-sized segments.
///
/// # Description
///
/// The FFA period trials are spaced nearly uniformly in DFT bin space, so the
/// number of segments is set by how many DFT bins the trials span: one
/// segment per `segment_dftbins_length` bins, at least one, and never more
/// segments than trials. The last segment absorbs the remainder and always
/// ends at `periods.len()`.
///
/// # Arguments
///
/// * `periods` - monotonic trial periods
/// * `tobs` - observation duration, in the same time unit as the periods
/// * `segment_dftbins_length` - minimum segment length in DFT bins
pub fn segment(periods: &[f64], tobs: f64, segment_dftbins_length: f64) -> Result<Vec<Segment>> {
    let n = periods.len();
    if n == 0 { return Err(PeakSearchError::EmptyPeriodogram); }
    if !(segment_dftbins_length.is_finite() && segment_dftbins_length > 0.0) {
        return Err(PeakSearchError::InvalidConfig(format!(
            "segment_dftbins_length must be positive and finite, got {}", segment_dftbins_length
        )));
    }

    // number of DFT bin indexes spanned by the period trials
    let dbi_range = (tobs / periods[0] - tobs / periods[n - 1]).abs();
    let nseg = ((dbi_range / segment_dftbins_length).floor() as usize).clamp(1, n);
    let slen = n / nseg;

    let segments: Vec<Segment> = (0..nseg)
        .map(|iseg| {
            let start = iseg * slen;
            let end = if iseg + 1 == nseg { n } else { (iseg + 1) * slen };
            let mid = (start + end) / 2;
            let period_mid = periods[mid];
            Segment { start, end, mid, period_mid, log_period_mid: period_mid.ln() }
        })
        .collect();

    debug!("segment: {} trials spanning {:.2} DFT bins -> {} segments of {} trials", n, dbi_range, nseg, slen);
    Ok(segments)
}
