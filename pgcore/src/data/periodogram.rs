use serde::{Deserialize, Serialize};

use crate::error::{PeakSearchError, Result};

/// Fixed metadata of the dispersion-measure trial a periodogram was computed for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodogramMetadata {
    pub dm: f64,
    /// Average number of phase bins used by the search, normaliser for duty cycles
    pub bins_avg: f64,
}

impl PeriodogramMetadata {
    pub fn new(dm: f64, bins_avg: f64) -> Result<Self> {
        if !(bins_avg.is_finite() && bins_avg > 0.0) {
            return Err(PeakSearchError::InvalidBinsAvg(bins_avg));
        }
        Ok(PeriodogramMetadata { dm, bins_avg })
    }
}

/// S/N of every (period trial, width trial) pair of one DM trial.
///
/// # Description
///
/// The S/N table is stored column-major: all period trials of width 0, then
/// all period trials of width 1 and so on, so that `snr_column` is a plain slice.
#[derive(Clone, Debug)]
pub struct Periodogram {
    periods: Vec<f64>,
    widths: Vec<u32>,
    tobs: f64,
    snrs: Vec<f64>,
    metadata: PeriodogramMetadata,
}

impl Periodogram {
    /// Builds a periodogram, checking the grid shape and the period axis.
    ///
    /// # Arguments
    ///
    /// * `periods` - strictly monotonic, positive trial periods in seconds
    /// * `widths` - boxcar width trials in samples
    /// * `tobs` - total observation duration in seconds
    /// * `snrs` - column-major S/N table of `periods.len() * widths.len()` values
    /// * `metadata` - DM and average number of bins
    pub fn new(
        periods: Vec<f64>,
        widths: Vec<u32>,
        tobs: f64,
        snrs: Vec<f64>,
        metadata: PeriodogramMetadata,
    ) -> Result<Self> {
        if periods.is_empty() { return Err(PeakSearchError::EmptyPeriodogram); }
        if widths.is_empty() { return Err(PeakSearchError::EmptyWidths); }
        if !(tobs.is_finite() && tobs > 0.0) {
            return Err(PeakSearchError::InvalidDuration(tobs));
        }
        if !(metadata.bins_avg.is_finite() && metadata.bins_avg > 0.0) {
            return Err(PeakSearchError::InvalidBinsAvg(metadata.bins_avg));
        }

        let expected = periods.len() * widths.len();
        if snrs.len() != expected {
            return Err(PeakSearchError::ShapeMismatch { expected, got: snrs.len() });
        }

        if let Some((index, &value)) = periods.iter().enumerate().find(|(_, p)| !(p.is_finite() && **p > 0.0)) {
            return Err(PeakSearchError::NonPositivePeriod { index, value });
        }
        check_strictly_monotonic(&periods)?;

        Ok(Periodogram { periods, widths, tobs, snrs, metadata })
    }

    /// Builds a periodogram from one S/N row per period trial.
    pub fn from_rows(
        periods: Vec<f64>,
        widths: Vec<u32>,
        tobs: f64,
        rows: &[Vec<f64>],
        metadata: PeriodogramMetadata,
    ) -> Result<Self> {
        if rows.len() != periods.len() {
            return Err(PeakSearchError::ShapeMismatch {
                expected: periods.len() * widths.len(),
                got: rows.iter().map(|r| r.len()).sum(),
            });
        }
        let cols = widths.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(PeakSearchError::ShapeMismatch { expected: cols, got: bad.len() });
        }

        let n = periods.len();
        let mut snrs = vec![0.0; n * cols];
        for (ip, row) in rows.iter().enumerate() {
            for (iw, &v) in row.iter().enumerate() {
                snrs[iw * n + ip] = v;
            }
        }
        Periodogram::new(periods, widths, tobs, snrs, metadata)
    }

    #[inline]
    pub fn periods(&self) -> &[f64] { &self.periods }

    #[inline]
    pub fn widths(&self) -> &[u32] { &self.widths }

    #[inline]
    pub fn tobs(&self) -> f64 { self.tobs }

    #[inline]
    pub fn metadata(&self) -> &PeriodogramMetadata { &self.metadata }

    #[inline]
    pub fn num_periods(&self) -> usize { self.periods.len() }

    #[inline]
    pub fn num_widths(&self) -> usize { self.widths.len() }

    /// Column-major S/N table.
    #[inline]
    pub fn snrs(&self) -> &[f64] { &self.snrs }

    #[inline]
    pub fn snr(&self, iperiod: usize, iwidth: usize) -> f64 {
        self.snrs[iwidth * self.periods.len() + iperiod]
    }

    /// S/N of every period trial for one width trial.
    pub fn snr_column(&self, iwidth: usize) -> Result<&[f64]> {
        if iwidth >= self.widths.len() {
            return Err(PeakSearchError::WidthIndexOutOfRange { index: iwidth, count: self.widths.len() });
        }
        let n = self.periods.len();
        Ok(&self.snrs[iwidth * n..(iwidth + 1) * n])
    }

    #[inline]
    pub fn dft_bin(&self, period: f64) -> f64 {
        self.tobs / period
    }

    /// DFT bin index of every period trial.
    pub fn dft_bins(&self) -> Vec<f64> {
        self.periods.iter().map(|&p| self.tobs / p).collect()
    }

    pub fn freqs(&self) -> Vec<f64> {
        self.periods.iter().map(|&p| 1.0 / p).collect()
    }
}

fn check_strictly_monotonic(periods: &[f64]) -> Result<()> {
    if periods.len() < 2 { return Ok(()); }
    let increasing = periods[1] > periods[0];
    for (i, w) in periods.windows(2).enumerate() {
        let ok = if increasing { w[1] > w[0] } else { w[1] < w[0] };
        if !ok {
            return Err(PeakSearchError::NonMonotonicPeriods { index: i + 1 });
        }
    }
    Ok(())
}
