pub mod config;
pub mod error;

// data module
pub mod data {
    pub mod periodogram;
    pub mod peak;
    pub mod detection;
}

// algorithm module
pub mod algorithm {
    pub mod clustering;
    pub mod segment;
    pub mod threshold;
    pub mod peak_detection;
}

// synthetic data module
pub mod sim {
    pub mod periodogram;
}

// Re-export commonly used types
pub use config::PeakSearchConfig;
pub use error::{PeakSearchError, Result};
pub use data::periodogram::{Periodogram, PeriodogramMetadata};
pub use data::peak::Peak;
pub use data::detection::Detection;
pub use algorithm::peak_detection::{find_peaks, find_peaks_single, find_peaks_with_diagnostics, PeakSearch, SingleWidthSearch};
pub use algorithm::threshold::ThresholdFunction;
