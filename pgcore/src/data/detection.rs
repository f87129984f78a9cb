use std::fmt::{Display, Formatter};

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::data::peak::Peak;
use crate::data::periodogram::{Periodogram, PeriodogramMetadata};

/// A group of Peaks found at (nearly) the same period in different width trials.
///
/// # Description
///
/// The highest S/N peak of the group represents the detection. A local window
/// of the periodogram centred on it is copied in, so the detection can be
/// inspected or plotted after the periodogram is gone.
#[derive(Clone, Debug, Serialize)]
pub struct Detection {
    top: Peak,
    peaks: Vec<Peak>,
    period_trials: Vec<f64>,
    snr_trials: Vec<f64>,
    width_trials: Vec<u32>,
    metadata: PeriodogramMetadata,
}

impl Detection {
    /// Builds a detection from a peak group, or `None` for an empty group.
    ///
    /// # Arguments
    ///
    /// * `peaks` - peaks merged into this detection
    /// * `pgram` - periodogram the peaks were found in
    /// * `period_slice_width` - width of the kept period window, in DFT bins
    pub fn new(peaks: Vec<Peak>, pgram: &Periodogram, period_slice_width: f64) -> Option<Self> {
        // reversed so that the first of several equal maxima wins
        let top = peaks.iter().rev().max_by_key(|p| OrderedFloat(p.snr()))?.clone();

        let center = pgram.dft_bin(top.period());
        let half = period_slice_width / 2.0;
        let indices: Vec<usize> = pgram.periods().iter()
            .enumerate()
            .filter(|&(_, &p)| (pgram.dft_bin(p) - center).abs() < half)
            .map(|(i, _)| i)
            .collect();

        let period_trials: Vec<f64> = indices.iter().map(|&i| pgram.periods()[i]).collect();
        let mut snr_trials = Vec::with_capacity(indices.len() * pgram.num_widths());
        for iw in 0..pgram.num_widths() {
            snr_trials.extend(indices.iter().map(|&i| pgram.snr(i, iw)));
        }

        Some(Detection {
            top,
            peaks,
            period_trials,
            snr_trials,
            width_trials: pgram.widths().to_vec(),
            metadata: *pgram.metadata(),
        })
    }

    /// The representative (highest S/N) peak.
    #[inline]
    pub fn peak(&self) -> &Peak { &self.top }

    #[inline]
    pub fn period(&self) -> f64 { self.top.period() }

    #[inline]
    pub fn freq(&self) -> f64 { self.top.freq() }

    #[inline]
    pub fn snr(&self) -> f64 { self.top.snr() }

    #[inline]
    pub fn dm(&self) -> f64 { self.top.dm() }

    #[inline]
    pub fn iw(&self) -> usize { self.top.iw() }

    #[inline]
    pub fn width(&self) -> u32 { self.top.width() }

    #[inline]
    pub fn ducy(&self) -> f64 { self.top.ducy() }

    /// All peaks merged into this detection.
    #[inline]
    pub fn peaks(&self) -> &[Peak] { &self.peaks }

    #[inline]
    pub fn period_trials(&self) -> &[f64] { &self.period_trials }

    /// Column-major S/N window, `period_trials().len()` rows by `width_trials().len()` columns.
    #[inline]
    pub fn snr_trials(&self) -> &[f64] { &self.snr_trials }

    #[inline]
    pub fn width_trials(&self) -> &[u32] { &self.width_trials }

    #[inline]
    pub fn metadata(&self) -> &PeriodogramMetadata { &self.metadata }

    #[inline]
    pub fn snr_trial(&self, iperiod: usize, iwidth: usize) -> f64 {
        self.snr_trials[iwidth * self.period_trials.len() + iperiod]
    }

    /// S/N across the period window for one width trial.
    pub fn snr_trial_column(&self, iwidth: usize) -> Option<&[f64]> {
        if iwidth >= self.width_trials.len() { return None; }
        let n = self.period_trials.len();
        Some(&self.snr_trials[iwidth * n..(iwidth + 1) * n])
    }
}

impl Display for Detection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.top.write_summary(f, "Detection")
    }
}
