use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Best significant trial of one cluster found in a single width trial.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Peak {
    period: f64,
    snr: f64,
    dm: f64,
    iw: usize,
    width: u32,
    ducy: f64,
}

impl Peak {
    /// # Arguments
    ///
    /// * `iw` - index of the width trial the peak was found in
    /// * `width` - that width trial, in samples
    /// * `bins_avg` - average number of bins, the duty cycle is `width / bins_avg`
    pub fn new(period: f64, snr: f64, dm: f64, iw: usize, width: u32, bins_avg: f64) -> Self {
        Peak {
            period,
            snr,
            dm,
            iw,
            width,
            ducy: width as f64 / bins_avg,
        }
    }

    #[inline]
    pub fn period(&self) -> f64 { self.period }

    #[inline]
    pub fn freq(&self) -> f64 { 1.0 / self.period }

    #[inline]
    pub fn snr(&self) -> f64 { self.snr }

    #[inline]
    pub fn dm(&self) -> f64 { self.dm }

    /// Best trial width index.
    #[inline]
    pub fn iw(&self) -> usize { self.iw }

    #[inline]
    pub fn width(&self) -> u32 { self.width }

    /// Best duty cycle.
    #[inline]
    pub fn ducy(&self) -> f64 { self.ducy }

    pub(crate) fn write_summary(&self, f: &mut Formatter<'_>, name: &str) -> std::fmt::Result {
        write!(
            f,
            "{} [P0 = {:.9e}, W = {:3}, DM = {:8.3}, S/N = {:6.2}]",
            name, self.period, self.width, self.dm, self.snr
        )
    }
}

impl Display for Peak {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write_summary(f, "Peak")
    }
}
