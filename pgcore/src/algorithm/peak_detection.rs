use log::{debug, trace};
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::algorithm::clustering::cluster_1d;
use crate::algorithm::segment::{segment, Segment};
use crate::algorithm::threshold::{fit_threshold, segment_stats, SegmentStats};
use crate::config::PeakSearchConfig;
use crate::data::detection::Detection;
use crate::data::peak::Peak;
use crate::data::periodogram::Periodogram;
use crate::error::{PeakSearchError, Result};

/// Everything computed for one width trial.
#[derive(Clone, Debug)]
pub struct SingleWidthSearch {
    pub stats: Vec<SegmentStats>,
    /// Threshold polynomial coefficients in ln(period), highest degree first
    pub coefficients: Vec<f64>,
    /// Threshold at every period trial
    pub threshold: Vec<f64>,
    pub peaks: Vec<Peak>,
}

/// Detections of one DM trial together with the per-width diagnostics.
#[derive(Clone, Debug)]
pub struct PeakSearch {
    pub segments: Vec<Segment>,
    /// One entry per width trial, in width order
    pub widths: Vec<SingleWidthSearch>,
    pub detections: Vec<Detection>,
}

/// Finds the peaks of a single width trial.
///
/// # Description
///
/// Period trials whose S/N exceeds the threshold are grouped by their DFT bin
/// index `tobs / period`: two significant trials closer than
/// `peak_clustering_radius` bins belong to the same peak. Each group
/// yields one Peak at its highest S/N trial.
///
/// # Arguments
///
/// * `pgram` - the periodogram
/// * `iwidth` - index of the width trial to search
/// * `segments` - segmentation of the period trials, see [`segment`]
/// * `config` - search parameters
pub fn find_peaks_single(
    pgram: &Periodogram,
    iwidth: usize,
    segments: &[Segment],
    config: &PeakSearchConfig,
) -> Result<SingleWidthSearch> {
    config.validate()?;

    let snrs = pgram.snr_column(iwidth)?;
    let periods = pgram.periods();
    let width = pgram.widths()[iwidth];
    let metadata = pgram.metadata();

    if let Some(seg) = segments.last() {
        if seg.end != periods.len() {
            return Err(PeakSearchError::ShapeMismatch { expected: periods.len(), got: seg.end });
        }
    }

    let stats = segment_stats(snrs, segments)?;
    let tfunc = fit_threshold(&stats, config)?;

    // selection threshold as a function of period, not log(period)
    let threshold = tfunc.evaluate_many(periods);

    let significant: Vec<usize> = (0..periods.len())
        .filter(|&i| snrs[i] > threshold[i])
        .collect();

    let mut peaks = Vec::new();
    if !significant.is_empty() {
        let dbi: Vec<f64> = significant.iter().map(|&i| pgram.dft_bin(periods[i])).collect();

        for cluster in cluster_1d(&dbi, config.peak_clustering_radius) {
            // first trial wins among equal S/N maxima
            let imax = cluster.iter()
                .map(|&c| significant[c])
                .rev()
                .max_by_key(|&i| OrderedFloat(snrs[i]));

            if let Some(imax) = imax {
                trace!(
                    "find_peaks_single: width {} cluster of {} trials, best P0 = {:.9e} S/N = {:.2}",
                    width, cluster.len(), periods[imax], snrs[imax]
                );
                peaks.push(Peak::new(periods[imax], snrs[imax], metadata.dm, iwidth, width, metadata.bins_avg));
            }
        }
    }

    debug!(
        "find_peaks_single: width {} ({}), {} significant trials, {} peaks",
        iwidth, width, significant.len(), peaks.len()
    );

    Ok(SingleWidthSearch {
        stats,
        coefficients: tfunc.coefficients(),
        threshold,
        peaks,
    })
}

/// Finds the peaks of every width trial, then merges peaks found at nearly
/// the same period into Detections.
pub fn find_peaks(pgram: &Periodogram, config: &PeakSearchConfig) -> Result<Vec<Detection>> {
    Ok(find_peaks_with_diagnostics(pgram, config)?.detections)
}

/// Same as [`find_peaks`], also returning the segmentation and the per-width
/// statistics, threshold fits and peaks.
pub fn find_peaks_with_diagnostics(pgram: &Periodogram, config: &PeakSearchConfig) -> Result<PeakSearch> {
    config.validate()?;

    let segments = segment(pgram.periods(), pgram.tobs(), config.segment_dftbins_length)?;

    // widths are independent, collect keeps them in width order
    let widths: Vec<SingleWidthSearch> = (0..pgram.num_widths())
        .into_par_iter()
        .map(|iw| find_peaks_single(pgram, iw, &segments, config))
        .collect::<Result<Vec<_>>>()?;

    let all_peaks: Vec<Peak> = widths.iter()
        .flat_map(|w| w.peaks.iter().cloned())
        .collect();

    // second stage: group peaks with close periods but different widths
    let dbi: Vec<f64> = all_peaks.iter().map(|p| pgram.dft_bin(p.period())).collect();
    let detections: Vec<Detection> = cluster_1d(&dbi, config.detection_clustering_radius)
        .into_iter()
        .filter_map(|cluster| {
            let group: Vec<Peak> = cluster.iter().map(|&i| all_peaks[i].clone()).collect();
            Detection::new(group, pgram, config.period_slice_width)
        })
        .collect();

    debug!(
        "find_peaks: DM {:.3}, {} widths, {} peaks -> {} detections",
        pgram.metadata().dm, pgram.num_widths(), all_peaks.len(), detections.len()
    );

    Ok(PeakSearch { segments, widths, detections })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::periodogram::PeriodogramMetadata;
    use crate::sim::periodogram::{InjectedSignal, NoiseModel, SyntheticPeriodogram};

    fn flat_column_pgram(snrs: Vec<f64>, tobs: f64, bin_start: f64, bin_step: f64) -> Periodogram {
        let periods: Vec<f64> = (0..snrs.len()).map(|i| tobs / (bin_start - i as f64 * bin_step)).collect();
        Periodogram::new(periods, vec![3], tobs, snrs, PeriodogramMetadata::new(5.0, 128.0).unwrap()).unwrap()
    }

    #[test]
    fn test_single_width_argmax_per_cluster() {
        // bins 0.05 apart: runs of significant trials separated by more than 0.2 bins
        let mut snrs = vec![1.0; 60];
        snrs[10] = 7.0; snrs[11] = 9.0; snrs[12] = 8.0;
        snrs[30] = 12.0; snrs[31] = 7.0;
        snrs[50] = 6.6;
        let pgram = flat_column_pgram(snrs, 100.0, 500.0, 0.05);
        let config = PeakSearchConfig::default();
        let segments = segment(pgram.periods(), pgram.tobs(), config.segment_dftbins_length).unwrap();

        let result = find_peaks_single(&pgram, 0, &segments, &config).unwrap();
        assert_eq!(result.coefficients, vec![0.0, 0.0, 0.0]);
        assert!(result.threshold.iter().all(|&t| t == 6.5));
        assert_eq!(result.stats.len(), 1);

        // clusters come out by ascending DFT bin, i.e. descending period
        let periods: Vec<f64> = result.peaks.iter().map(|p| p.period()).collect();
        assert_eq!(periods, vec![pgram.periods()[50], pgram.periods()[30], pgram.periods()[11]]);
        let best: Vec<f64> = result.peaks.iter().map(|p| p.snr()).collect();
        assert_eq!(best, vec![6.6, 12.0, 9.0]);
        assert!(result.peaks.iter().all(|p| p.iw() == 0 && p.width() == 3 && p.dm() == 5.0));
        assert!(result.peaks.iter().all(|p| p.ducy() == 3.0 / 128.0));
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut snrs = vec![1.0; 20];
        snrs[5] = 6.5;
        let pgram = flat_column_pgram(snrs, 100.0, 500.0, 0.05);
        let config = PeakSearchConfig::default();
        let segments = segment(pgram.periods(), pgram.tobs(), config.segment_dftbins_length).unwrap();
        let result = find_peaks_single(&pgram, 0, &segments, &config).unwrap();
        assert!(result.peaks.is_empty());
    }

    #[test]
    fn test_single_width_is_deterministic() {
        let pgram = SyntheticPeriodogram { n_periods: 3000, dft_range: 125.0, ..Default::default() }
            .with_signal(InjectedSignal { period_index: 1200, dft_sigma: 0.03, snr_by_width: vec![15.0] })
            .build()
            .unwrap();
        let config = PeakSearchConfig::default();
        let segments = segment(pgram.periods(), pgram.tobs(), config.segment_dftbins_length).unwrap();

        let a = find_peaks_single(&pgram, 0, &segments, &config).unwrap();
        let b = find_peaks_single(&pgram, 0, &segments, &config).unwrap();
        assert_eq!(a.peaks, b.peaks);
        assert_eq!(a.coefficients, b.coefficients);
        // 12 segments, so the threshold was fitted
        assert_eq!(a.stats.len(), 12);
        assert!(a.threshold.iter().all(|&t| t >= config.snr_min));
        assert_eq!(a.peaks.len(), 1);
        assert_eq!(a.peaks[0].period(), pgram.periods()[1200]);
    }

    #[test]
    fn test_width_index_out_of_range() {
        let pgram = flat_column_pgram(vec![1.0; 10], 100.0, 500.0, 0.05);
        let config = PeakSearchConfig::default();
        let segments = segment(pgram.periods(), pgram.tobs(), config.segment_dftbins_length).unwrap();
        assert_eq!(
            find_peaks_single(&pgram, 1, &segments, &config).unwrap_err(),
            PeakSearchError::WidthIndexOutOfRange { index: 1, count: 1 }
        );
    }

    #[test]
    fn test_single_injected_bump() {
        let injected = 6000;
        let sim = SyntheticPeriodogram::default()
            .with_signal(InjectedSignal { period_index: injected, dft_sigma: 0.02, snr_by_width: vec![10.0] });
        let pgram = sim.build().unwrap();

        let detections = find_peaks(&pgram, &PeakSearchConfig::default()).unwrap();
        assert_eq!(detections.len(), 1);

        let det = &detections[0];
        let periods = pgram.periods();
        let spacing = periods[injected + 1] - periods[injected];
        assert!((det.period() - periods[injected]).abs() <= spacing * 1.000001);
        assert!((det.snr() - 11.0).abs() <= 0.3 + 1e-9);
        assert_eq!(det.iw(), 0);
        assert_eq!(det.metadata(), pgram.metadata());

        // one DFT bin wide window centred on the detection
        let window = det.period_trials();
        assert!(window.contains(&det.period()));
        assert!(window.iter().all(|&p| (pgram.dft_bin(p) - pgram.dft_bin(det.period())).abs() < 0.5));
        assert_eq!(det.snr_trials().len(), window.len());
    }

    #[test]
    fn test_pure_noise_gives_no_detections() {
        let sim = SyntheticPeriodogram {
            widths: vec![1, 2, 4, 8],
            noise: NoiseModel::Uniform { level: 2.0, amplitude: 2.5 },
            seed: 7,
            ..Default::default()
        };
        let pgram = sim.build().unwrap();
        assert!(pgram.snrs().iter().all(|&v| v < 5.0));

        let search = find_peaks_with_diagnostics(&pgram, &PeakSearchConfig::default()).unwrap();
        assert!(search.detections.is_empty());
        assert_eq!(search.widths.len(), 4);
        assert!(search.widths.iter().all(|w| w.peaks.is_empty()));
    }

    #[test]
    fn test_bump_across_widths_merges_into_one_detection() {
        let injected = 4321;
        let sim = SyntheticPeriodogram { widths: vec![2, 4, 8], bins_avg: 64.0, dm: 42.0, ..Default::default() }
            .with_signal(InjectedSignal { period_index: injected, dft_sigma: 0.02, snr_by_width: vec![8.0, 12.0, 10.0] });
        let pgram = sim.build().unwrap();

        let search = find_peaks_with_diagnostics(&pgram, &PeakSearchConfig::default()).unwrap();
        assert!(search.widths.iter().all(|w| w.peaks.len() == 1));
        assert_eq!(search.detections.len(), 1);

        let det = &search.detections[0];
        assert_eq!(det.peaks().len(), 3);
        assert_eq!(det.iw(), 1);
        assert_eq!(det.width(), 4);
        assert_eq!(det.ducy(), 4.0 / 64.0);
        assert_eq!(det.dm(), 42.0);
        assert_eq!(det.width_trials(), &[2, 4, 8]);
        assert_eq!(det.snr_trials().len(), det.period_trials().len() * 3);
        let best = det.peaks().iter().map(|p| p.snr()).fold(f64::MIN, f64::max);
        assert_eq!(det.snr(), best);
    }

    #[test]
    fn test_separate_signals_give_separate_detections() {
        let sim = SyntheticPeriodogram::default()
            .with_signal(InjectedSignal { period_index: 2000, dft_sigma: 0.02, snr_by_width: vec![10.0] })
            .with_signal(InjectedSignal { period_index: 8000, dft_sigma: 0.02, snr_by_width: vec![14.0] });
        let pgram = sim.build().unwrap();

        let detections = find_peaks(&pgram, &PeakSearchConfig::default()).unwrap();
        assert_eq!(detections.len(), 2);
        // ascending DFT bin, i.e. descending period
        assert!(detections[0].period() > detections[1].period());
        assert!(detections[0].snr() > 14.0);
        assert!(detections[1].snr() < 12.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sim = SyntheticPeriodogram { n_periods: 4000, dft_range: 105.0, widths: vec![1, 2, 3, 4, 5, 6], ..Default::default() }
            .with_signal(InjectedSignal {
                period_index: 1500,
                dft_sigma: 0.03,
                snr_by_width: vec![7.0, 9.0, 11.0, 13.0, 11.0, 9.0],
            });
        let pgram = sim.build().unwrap();
        let config = PeakSearchConfig::default();

        let search = find_peaks_with_diagnostics(&pgram, &config).unwrap();
        let sequential: Vec<Peak> = (0..pgram.num_widths())
            .flat_map(|iw| find_peaks_single(&pgram, iw, &search.segments, &config).unwrap().peaks)
            .collect();
        let pooled: Vec<Peak> = search.widths.iter().flat_map(|w| w.peaks.clone()).collect();
        assert_eq!(pooled, sequential);
        assert_eq!(search.detections.len(), 1);
        assert_eq!(search.detections[0].iw(), 3);
    }

    #[test]
    fn test_single_width_rejects_bad_radius() {
        let pgram = SyntheticPeriodogram { n_periods: 1000, ..Default::default() }
            .with_signal(InjectedSignal { period_index: 500, dft_sigma: 0.02, snr_by_width: vec![10.0] })
            .build()
            .unwrap();
        let segments = segment(pgram.periods(), pgram.tobs(), 10.0).unwrap();
        for radius in [f64::NAN, 0.0, -0.2] {
            let config = PeakSearchConfig { peak_clustering_radius: radius, ..Default::default() };
            assert!(matches!(
                find_peaks_single(&pgram, 0, &segments, &config),
                Err(PeakSearchError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_few_segments_with_high_degree_fit() {
        let pgram = SyntheticPeriodogram { n_periods: 3000, dft_range: 125.0, ..Default::default() }
            .with_signal(InjectedSignal { period_index: 1200, dft_sigma: 0.03, snr_by_width: vec![15.0] })
            .build()
            .unwrap();
        let config = PeakSearchConfig { min_segments: 2, polydeg: 2, ..Default::default() };

        let search = find_peaks_with_diagnostics(&pgram, &config).unwrap();
        assert_eq!(search.segments.len(), 12);
        assert_eq!(search.widths[0].coefficients.len(), 3);
        assert_eq!(search.detections.len(), 1);
        assert_eq!(search.detections[0].period(), pgram.periods()[1200]);
    }

    #[test]
    fn test_clustering_radii_are_independent() {
        // default grid: 0.005 DFT bins between trials, 60 trials is 0.3 bins
        let sim = SyntheticPeriodogram { widths: vec![1, 2], ..Default::default() }
            .with_signal(InjectedSignal { period_index: 5000, dft_sigma: 0.02, snr_by_width: vec![10.0, 0.0] })
            .with_signal(InjectedSignal { period_index: 5060, dft_sigma: 0.02, snr_by_width: vec![0.0, 10.0] });
        let pgram = sim.build().unwrap();

        let search = find_peaks_with_diagnostics(&pgram, &PeakSearchConfig::default()).unwrap();
        assert!(search.widths.iter().all(|w| w.peaks.len() == 1));
        assert_eq!(search.detections.len(), 2);

        let config = PeakSearchConfig {
            peak_clustering_radius: 0.2,
            detection_clustering_radius: 0.5,
            ..Default::default()
        };
        let search = find_peaks_with_diagnostics(&pgram, &config).unwrap();
        assert!(search.widths.iter().all(|w| w.peaks.len() == 1));
        assert_eq!(search.detections.len(), 1);
        assert_eq!(search.detections[0].peaks().len(), 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let pgram = SyntheticPeriodogram { n_periods: 100, ..Default::default() }.build().unwrap();
        let config = PeakSearchConfig { detection_clustering_radius: -1.0, ..Default::default() };
        assert!(matches!(find_peaks(&pgram, &config), Err(PeakSearchError::InvalidConfig(_))));
    }
}
