use serde::{Deserialize, Serialize};

use crate::error::{PeakSearchError, Result};

/// Named numeric parameters of the candidate search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakSearchConfig {
    /// Minimum segment length, in DFT bins
    pub segment_dftbins_length: f64,
    /// Fewer segments than this and the threshold falls back to a constant
    pub min_segments: usize,
    /// Significance floor, the threshold never drops below it
    pub snr_min: f64,
    /// Number of robust sigmas above the median for the dynamic threshold
    pub nsigma: f64,
    /// Radius, in DFT bins, used to group significant trials of one width
    pub peak_clustering_radius: f64,
    /// Radius, in DFT bins, used to merge peaks across widths
    pub detection_clustering_radius: f64,
    /// Degree of the threshold polynomial in log(period)
    pub polydeg: usize,
    /// Width, in DFT bins, of the period window kept in each detection
    pub period_slice_width: f64,
}

impl Default for PeakSearchConfig {
    fn default() -> Self {
        Self {
            segment_dftbins_length: 10.0,
            min_segments: 8,
            snr_min: 6.5,
            nsigma: 6.5,
            peak_clustering_radius: 0.20,
            detection_clustering_radius: 0.20,
            polydeg: 2,
            period_slice_width: 1.0,
        }
    }
}

impl PeakSearchConfig {
    /// Use the same radius for both clustering stages.
    pub fn with_clustering_radius(mut self, radius: f64) -> Self {
        self.peak_clustering_radius = radius;
        self.detection_clustering_radius = radius;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("segment_dftbins_length", self.segment_dftbins_length),
            ("peak_clustering_radius", self.peak_clustering_radius),
            ("detection_clustering_radius", self.detection_clustering_radius),
            ("period_slice_width", self.period_slice_width),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PeakSearchError::InvalidConfig(format!(
                    "{} must be positive and finite, got {}", name, value
                )));
            }
        }

        if !self.snr_min.is_finite() {
            return Err(PeakSearchError::InvalidConfig(format!("snr_min must be finite, got {}", self.snr_min)));
        }
        if !self.nsigma.is_finite() {
            return Err(PeakSearchError::InvalidConfig(format!("nsigma must be finite, got {}", self.nsigma)));
        }
        Ok(())
    }
}
