pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Population standard deviation.
    pub fn std_dev(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        let mean = Self::mean(values);
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
        var.sqrt()
    }

    pub fn min(values: &[f64]) -> f64 {
        values.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    pub fn max(values: &[f64]) -> f64 {
        values.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    /// Largest absolute difference between consecutive values.
    pub fn max_abs_delta(values: &[f64]) -> f64 {
        values
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0, f64::max)
    }

    /// Least-squares slope of `ys` against `xs`. Zero when undefined.
    pub fn slope(xs: &[f64], ys: &[f64]) -> f64 {
        let n = xs.len().min(ys.len());
        if n < 2 {
            return 0.0;
        }
        let mx = Self::mean(&xs[..n]);
        let my = Self::mean(&ys[..n]);
        let mut num = 0.0;
        let mut den = 0.0;
        for i in 0..n {
            num += (xs[i] - mx) * (ys[i] - my);
            den += (xs[i] - mx) * (xs[i] - mx);
        }
        if den > 0.0 {
            num / den
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequences_yield_zero() {
        assert_eq!(StatsHelper::mean(&[]), 0.0);
        assert_eq!(StatsHelper::std_dev(&[]), 0.0);
        assert_eq!(StatsHelper::max(&[]), 0.0);
        assert_eq!(StatsHelper::slope(&[1.0], &[2.0]), 0.0);
    }

    #[test]
    fn std_dev_of_known_sequence() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((StatsHelper::std_dev(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn slope_recovers_linear_trend() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 1.5, 2.0, 2.5];
        assert!((StatsHelper::slope(&xs, &ys) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn max_abs_delta_sees_drops() {
        assert_eq!(StatsHelper::max_abs_delta(&[5.0, 5.0, 1.0, 2.0]), 4.0);
    }
}
