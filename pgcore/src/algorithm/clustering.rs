use itertools::Itertools;
use log::trace;

/// Single-linkage clustering of scalar values on a line.
///
/// # Description
///
/// Values are sorted and the sorted sequence is split wherever two consecutive
/// values are `radius` or more apart. Each group lists indices into `values`,
/// ordered by value; groups come out ordered by their smallest value.
/// Equal values always stay together for any `radius > 0`.
///
/// # Arguments
///
/// * `values` - values to cluster, in any order
/// * `radius` - gap at or above which two neighbours are split
///
/// # Example
///
/// ```
/// use pgcore::algorithm::clustering::cluster_1d;
///
/// let groups = cluster_1d(&[5.0, 1.0, 1.1, 5.05, 3.0], 0.2);
/// assert_eq!(groups, vec![vec![1, 2], vec![4], vec![0, 3]]);
/// ```
pub fn cluster_1d(values: &[f64], radius: f64) -> Vec<Vec<usize>> {
    let order: Vec<usize> = (0..values.len())
        .sorted_by(|&a, &b| values[a].total_cmp(&values[b]))
        .collect();

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();

    for i in order {
        if let Some(&last) = current.last() {
            // NaN gaps compare false, so a NaN always starts its own group
            if !(values[i] - values[last] < radius) {
                groups.push(std::mem::take(&mut current));
            }
        }
        current.push(i);
    }
    if !current.is_empty() { groups.push(current); }

    trace!("cluster_1d: {} values, radius {}, {} groups", values.len(), radius, groups.len());
    groups
}
