//! Linear interpolation used to expand low-resolution forecast coefficients

/// Weights mapping `from` evenly spaced knots onto `to` output positions.
///
/// Row `i` of the returned `to x from` matrix holds the weights that produce
/// output `i`. Knots and outputs both span the closed interval [0, 1], so
/// the first and last outputs reproduce the first and last knots.
pub fn linear_weights(from: usize, to: usize) -> Vec<Vec<f64>> {
    let mut weights = vec![vec![0.0; from]; to];
    if from == 0 {
        return weights;
    }
    for (i, row) in weights.iter_mut().enumerate() {
        if from == 1 || to == 1 {
            row[0] = 1.0;
            continue;
        }
        let position = i as f64 * (from - 1) as f64 / (to - 1) as f64;
        let left = (position.floor() as usize).min(from - 1);
        let right = (left + 1).min(from - 1);
        let frac = position - left as f64;
        row[left] += 1.0 - frac;
        if right != left {
            row[right] += frac;
        }
    }
    weights
}

/// Apply weights from [`linear_weights`] to `knots`
pub fn interpolate(weights: &[Vec<f64>], knots: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .map(|row| row.iter().zip(knots).map(|(w, k)| w * k).sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_when_sizes_match() {
        let weights = linear_weights(4, 4);
        let out = interpolate(&weights, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn expands_between_knots() {
        let weights = linear_weights(2, 5);
        let out = interpolate(&weights, &[0.0, 4.0]);
        for (got, want) in out.iter().zip([0.0, 1.0, 2.0, 3.0, 4.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn single_knot_is_constant() {
        let weights = linear_weights(1, 3);
        assert_eq!(interpolate(&weights, &[7.5]), vec![7.5, 7.5, 7.5]);
    }

    #[test]
    fn rows_sum_to_one() {
        for row in linear_weights(3, 12) {
            assert_relative_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
    }
}
