//! Sliding windows for the recurrent model
//!
//! Consecutive rows grouped into fixed-length windows, stride 1.

use super::vector::{FeatureVector, SampleBatch};

/// Pad short batches by repeating the last row up to `window` rows
pub fn pad_to_window(batch: &[FeatureVector], window: usize) -> SampleBatch {
    let mut padded = batch.to_vec();
    if let Some(last) = batch.last() {
        while padded.len() < window {
            padded.push(last.clone());
        }
    }
    padded
}

/// Number of windows a batch of `rows` rows produces (after padding)
pub fn window_count(rows: usize, window: usize) -> usize {
    if rows == 0 || window == 0 {
        0
    } else {
        rows.max(window) - window + 1
    }
}

/// All stride-1 windows of `window` rows; short batches are padded first
pub fn sliding_windows(batch: &[FeatureVector], window: usize) -> Vec<SampleBatch> {
    let padded = pad_to_window(batch, window);
    let count = window_count(batch.len(), window);
    (0..count)
        .map(|start| padded[start..start + window].to_vec())
        .collect()
}

/// Window indices whose span covers `row`, with the row's offset inside each
pub fn covering_windows(
    row: usize,
    window: usize,
    count: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let first = (row + 1).saturating_sub(window);
    let last = row.min(count.saturating_sub(1));
    (first..=last)
        .filter(move |_| count > 0)
        .map(move |start| (start, row - start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_count() {
        assert_eq!(window_count(0, 3), 0);
        assert_eq!(window_count(2, 3), 1);
        assert_eq!(window_count(3, 3), 1);
        assert_eq!(window_count(10, 3), 8);
    }

    #[test]
    fn test_sliding_windows_stride_one() {
        let batch: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32]).collect();
        let windows = sliding_windows(&batch, 3);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], vec![vec![0.0], vec![1.0], vec![2.0]]);
        assert_eq!(windows[2], vec![vec![2.0], vec![3.0], vec![4.0]]);
    }

    #[test]
    fn test_short_batch_is_padded_with_last_row() {
        let batch = vec![vec![1.0, 1.0], vec![2.0, 2.0]];
        let windows = sliding_windows(&batch, 4);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), 4);
        assert_eq!(windows[0][3], vec![2.0, 2.0]);
        assert!(sliding_windows(&[], 4).is_empty());
    }

    #[test]
    fn test_covering_windows() {
        // 5 rows, window 3 → windows start at 0, 1, 2
        let covering: Vec<_> = covering_windows(0, 3, 3).collect();
        assert_eq!(covering, vec![(0, 0)]);

        let covering: Vec<_> = covering_windows(2, 3, 3).collect();
        assert_eq!(covering, vec![(0, 2), (1, 1), (2, 0)]);

        let covering: Vec<_> = covering_windows(4, 3, 3).collect();
        assert_eq!(covering, vec![(2, 2)]);

        assert_eq!(covering_windows(0, 3, 0).count(), 0);
    }
}
