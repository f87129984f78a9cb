use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use crate::data::periodogram::{Periodogram, PeriodogramMetadata};
use crate::error::{PeakSearchError, Result};

/// Background S/N of a synthetic periodogram.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum NoiseModel {
    /// `level` plus noise drawn uniformly from [-amplitude, amplitude]
    Uniform { level: f64, amplitude: f64 },
    /// `level` plus Gaussian noise of standard deviation `sigma`
    Gaussian { level: f64, sigma: f64 },
}

/// A Gaussian bump in DFT bin space added on top of the noise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InjectedSignal {
    /// Period trial at the centre of the bump
    pub period_index: usize,
    /// Standard deviation of the bump, in DFT bins
    pub dft_sigma: f64,
    /// Bump height for every width trial
    pub snr_by_width: Vec<f64>,
}

/// Builder for periodograms with trials evenly spaced in DFT bin space.
#[derive(Clone, Debug)]
pub struct SyntheticPeriodogram {
    pub n_periods: usize,
    pub period_min: f64,
    pub dft_range: f64,
    pub tobs: f64,
    pub widths: Vec<u32>,
    pub dm: f64,
    pub bins_avg: f64,
    pub noise: NoiseModel,
    pub signals: Vec<InjectedSignal>,
    pub seed: u64,
}

impl Default for SyntheticPeriodogram {
    fn default() -> Self {
        SyntheticPeriodogram {
            n_periods: 10_000,
            period_min: 0.5,
            dft_range: 50.0,
            tobs: 3600.0,
            widths: vec![1],
            dm: 0.0,
            bins_avg: 256.0,
            noise: NoiseModel::Uniform { level: 1.0, amplitude: 0.3 },
            signals: Vec::new(),
            seed: 42,
        }
    }
}

impl SyntheticPeriodogram {
    pub fn with_signal(mut self, signal: InjectedSignal) -> Self {
        self.signals.push(signal);
        self
    }

    /// Trial periods, increasing from `period_min`, spanning `dft_range` DFT bins.
    pub fn periods(&self) -> Vec<f64> {
        let bin_start = self.tobs / self.period_min;
        let step = if self.n_periods > 1 { self.dft_range / (self.n_periods - 1) as f64 } else { 0.0 };
        (0..self.n_periods)
            .map(|i| self.tobs / (bin_start - i as f64 * step))
            .collect()
    }

    pub fn build(&self) -> Result<Periodogram> {
        let periods = self.periods();
        let n = periods.len();
        let nw = self.widths.len();

        if self.tobs / self.period_min <= self.dft_range {
            return Err(PeakSearchError::InvalidConfig(format!(
                "dft_range {} reaches past DFT bin zero", self.dft_range
            )));
        }
        for signal in &self.signals {
            if signal.period_index >= n {
                return Err(PeakSearchError::InvalidConfig(format!(
                    "injected signal at trial {} beyond {} trials", signal.period_index, n
                )));
            }
            if signal.snr_by_width.len() != nw {
                return Err(PeakSearchError::ShapeMismatch { expected: nw, got: signal.snr_by_width.len() });
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut snrs: Vec<f64> = match self.noise {
            NoiseModel::Uniform { level, amplitude } => {
                let dist = Uniform::new_inclusive(-amplitude.abs(), amplitude.abs());
                (0..n * nw).map(|_| level + dist.sample(&mut rng)).collect()
            }
            NoiseModel::Gaussian { level, sigma } => {
                let dist = Normal::new(level, sigma)
                    .map_err(|e| PeakSearchError::InvalidConfig(e.to_string()))?;
                (0..n * nw).map(|_| dist.sample(&mut rng)).collect()
            }
        };

        let bins: Vec<f64> = periods.iter().map(|&p| self.tobs / p).collect();
        for signal in &self.signals {
            let center = bins[signal.period_index];
            let two_sigma2 = 2.0 * signal.dft_sigma * signal.dft_sigma;
            for (iw, &height) in signal.snr_by_width.iter().enumerate() {
                let column = &mut snrs[iw * n..(iw + 1) * n];
                for (value, &bin) in column.iter_mut().zip(bins.iter()) {
                    let d = bin - center;
                    *value += height * (-d * d / two_sigma2).exp();
                }
            }
        }

        let metadata = PeriodogramMetadata::new(self.dm, self.bins_avg)?;
        Periodogram::new(periods, self.widths.clone(), self.tobs, snrs, metadata)
    }
}
