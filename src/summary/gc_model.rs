/// Fractional deviation of a per-read GC histogram from its best-fit normal
/// curve.
///
/// Interior zero buckets are first replaced by the average of their
/// neighbours (a smoothing pass over sparse histograms). The fit centre is
/// the weighted mean of the smoothed histogram, its spread the (N−1)-divisor
/// standard deviation about that centre. The Gaussian built from those two is
/// renormalized to the histogram's total count, and the result is the L1
/// distance between histogram and curve divided by the total.
///
/// Degenerate histograms (fewer than two observations, or zero spread) have
/// no defined fit and yield 0.
pub fn gc_deviation(gc_count: &[u64; 101]) -> f64 {
    let mut smoothed = [0.0f64; 101];
    for (slot, &count) in smoothed.iter_mut().zip(gc_count) {
        *slot = count as f64;
    }
    for i in 1..=98 {
        if smoothed[i] == 0.0 {
            smoothed[i] = (smoothed[i - 1] + smoothed[i + 1]) / 2.0;
        }
    }

    let total: f64 = smoothed.iter().sum();
    if total < 2.0 {
        return 0.0;
    }

    let mode = smoothed.iter().enumerate().map(|(i, &c)| i as f64 * c).sum::<f64>() / total;
    let variance = smoothed
        .iter()
        .enumerate()
        .map(|(i, &c)| c * (i as f64 - mode).powi(2))
        .sum::<f64>()
        / (total - 1.0);
    let stdev = variance.sqrt();
    if stdev == 0.0 {
        return 0.0;
    }

    let mut theoretical = [0.0f64; 101];
    for (i, slot) in theoretical.iter_mut().enumerate() {
        *slot = (-(i as f64 - mode).powi(2) / (2.0 * stdev * stdev)).exp();
    }
    let scale = total / theoretical.iter().sum::<f64>();

    smoothed
        .iter()
        .zip(&theoretical)
        .map(|(&observed, &expected)| (observed - expected * scale).abs())
        .sum::<f64>()
        / total
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_histogram_has_no_deviation() {
        assert_eq!(gc_deviation(&[0; 101]), 0.0);
    }

    #[test]
    fn single_bucket_histogram_has_no_deviation() {
        let mut gc = [0u64; 101];
        gc[50] = 1000;
        assert_eq!(gc_deviation(&gc), 0.0, "zero spread");
    }

    #[test]
    fn near_normal_histogram_deviates_little() {
        // A discretized bell around 50
        let mut gc = [0u64; 101];
        for i in 0..=100u64 {
            let x = i as f64 - 50.0;
            gc[i as usize] = (1000.0 * (-x * x / 200.0).exp()).round() as u64;
        }
        let deviation = gc_deviation(&gc);
        assert!(deviation < 0.02, "deviation {deviation}");
    }

    #[test]
    fn bimodal_histogram_deviates_substantially() {
        let mut gc = [0u64; 101];
        gc[20] = 500;
        gc[21] = 500;
        gc[80] = 500;
        gc[81] = 500;
        let deviation = gc_deviation(&gc);
        assert!(deviation > 0.2, "deviation {deviation}");
    }

    #[test]
    fn interior_zeros_are_smoothed_from_neighbours() {
        let mut gc = [0u64; 101];
        gc[40] = 100;
        gc[42] = 100;
        // Bucket 41 is zero but flanked, so the fit sees a filled bucket
        // there instead of a notch
        let deviation = gc_deviation(&gc);
        assert!((0.0..0.5).contains(&deviation), "deviation {deviation}");
    }
}
