use crate::error;
use crate::utils;

/// Constituent codes per index name. Ordered so weight sums are accumulated in a fixed order.
pub type StocksByIndex = std::collections::HashMap<String, std::collections::BTreeSet<String>>;

/// Constituent weights per index name.
pub type WeightsByIndex = std::collections::HashMap<String, std::collections::HashMap<String, f64>>;

/// Pairwise overlap of the selected indices, rows and columns in `names` order.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OverlapMatrices {
    pub count_matrix: Vec<Vec<usize>>,
    pub weight_matrix: Vec<Vec<f64>>,
}

/// Computes shared constituent count and shared weight for every pair of indices.
///
/// For a pair `(i, j)` the weight is the sum of both sides' weights over the
/// shared stocks, rounded to 4 decimals, then halved. On the diagonal that
/// gives the index's own total weight.
///
/// # Errors
/// * `OverlapError::Internal` if a name is missing from either map.
pub fn compute_overlap(
    stocks_by_index: &StocksByIndex,
    weights_by_index: &WeightsByIndex,
    names: &[String],
) -> error::Result<OverlapMatrices> {
    let n = names.len();
    let mut count_matrix = vec![vec![0usize; n]; n];
    let mut weight_matrix = vec![vec![0f64; n]; n];

    let mut stocks = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);
    for name in names {
        stocks.push(lookup(stocks_by_index, name)?);
        weights.push(lookup(weights_by_index, name)?);
    }

    // (i, j) and (j, i) add the same terms in the same order, so fill one triangle and mirror it.
    for i in 0..n {
        for j in i..n {
            let mut shared = 0usize;
            let mut overlap_weight = 0.0;
            for stock in stocks[i].intersection(stocks[j]) {
                shared += 1;
                overlap_weight += weights[i].get(stock).copied().unwrap_or(0.0)
                    + weights[j].get(stock).copied().unwrap_or(0.0);
            }

            let weight = utils::round_to(overlap_weight, 4) / 2.0;
            count_matrix[i][j] = shared;
            count_matrix[j][i] = shared;
            weight_matrix[i][j] = weight;
            weight_matrix[j][i] = weight;
        }
    }

    Ok(OverlapMatrices { count_matrix, weight_matrix })
}

fn lookup<'a, V>(map: &'a std::collections::HashMap<String, V>, name: &str) -> error::Result<&'a V> {
    map.get(name)
        .ok_or_else(|| error::OverlapError::Internal(format!("No holdings collected for index {:?}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn holdings(indices: &[(&str, Vec<(&str, f64)>)]) -> (StocksByIndex, WeightsByIndex, Vec<String>) {
        let mut stocks = StocksByIndex::new();
        let mut weights = WeightsByIndex::new();
        let mut names = Vec::new();
        for (name, members) in indices {
            names.push(name.to_string());
            stocks.insert(name.to_string(), members.iter().map(|(c, _)| c.to_string()).collect());
            weights.insert(name.to_string(), members.iter().map(|(c, w)| (c.to_string(), *w)).collect());
        }
        (stocks, weights, names)
    }

    #[test]
    fn counts_and_weights_shared_constituents() {
        let (stocks, weights, names) = holdings(&[
            ("A", vec![("000001", 10.0), ("000002", 20.0), ("000003", 30.0)]),
            ("B", vec![("000002", 5.0), ("000003", 15.0), ("000004", 80.0)]),
        ]);

        let result = compute_overlap(&stocks, &weights, &names).unwrap();
        assert_eq!(result.count_matrix, vec![vec![3, 2], vec![2, 3]]);
        // (20 + 5 + 30 + 15) / 2
        assert_eq!(result.weight_matrix[0][1], 35.0);
        assert_eq!(result.weight_matrix[1][0], 35.0);
    }

    #[test]
    fn diagonal_is_own_size_and_total_weight() {
        let (stocks, weights, names) = holdings(&[
            ("A", vec![("000001", 0.1234), ("000002", 0.5)]),
            ("B", vec![("000009", 1.0)]),
        ]);

        let result = compute_overlap(&stocks, &weights, &names).unwrap();
        assert_eq!(result.count_matrix[0][0], 2);
        assert_eq!(result.count_matrix[1][1], 1);
        assert_eq!(result.weight_matrix[0][0], 0.6234);
        assert_eq!(result.weight_matrix[1][1], 1.0);
        assert_eq!(result.count_matrix[0][1], 0);
        assert_eq!(result.weight_matrix[0][1], 0.0);
    }

    #[test]
    fn rounds_before_halving() {
        // 0.00013 rounds to 0.0001, halved to 0.00005. Halving first would round 0.000065 instead.
        let (stocks, weights, names) = holdings(&[
            ("A", vec![("000001", 0.00006)]),
            ("B", vec![("000001", 0.00007)]),
        ]);

        let result = compute_overlap(&stocks, &weights, &names).unwrap();
        assert!((result.weight_matrix[0][1] - 0.00005).abs() < 1e-12);
    }

    #[test]
    fn pair_weight_rounds_like_decimal_arithmetic() {
        // 0.0002 + 0.00015 sits just below 0.00035, so it rounds to 0.0003 before halving.
        let (stocks, weights, names) = holdings(&[
            ("A", vec![("000001", 0.0002)]),
            ("B", vec![("000001", 0.00015)]),
        ]);

        let result = compute_overlap(&stocks, &weights, &names).unwrap();
        assert_eq!(result.weight_matrix[0][1], 0.00015);
        assert_eq!(result.weight_matrix[1][0], 0.00015);
    }

    #[test]
    fn tied_pair_weight_rounds_to_even() {
        // 0.03125 is exact in binary: the tie goes to 0.0312, halved to 0.0156.
        let (stocks, weights, names) = holdings(&[
            ("A", vec![("000001", 0.015625)]),
            ("B", vec![("000001", 0.015625)]),
        ]);

        let result = compute_overlap(&stocks, &weights, &names).unwrap();
        assert_eq!(result.weight_matrix[0][1], 0.0156);
    }

    #[test]
    fn matrices_are_symmetric() {
        let (stocks, weights, names) = holdings(&[
            ("A", vec![("000001", 1.1), ("000002", 2.2), ("000005", 0.3)]),
            ("B", vec![("000002", 3.3), ("000005", 0.7)]),
            ("C", vec![("000001", 4.4), ("000005", 0.05)]),
        ]);

        let result = compute_overlap(&stocks, &weights, &names).unwrap();
        for i in 0..names.len() {
            for j in 0..names.len() {
                assert_eq!(result.count_matrix[i][j], result.count_matrix[j][i]);
                assert_eq!(result.weight_matrix[i][j], result.weight_matrix[j][i]);
            }
        }
    }

    #[test]
    fn missing_name_is_internal_error() {
        let (stocks, weights, _) = holdings(&[("A", vec![("000001", 1.0)])]);
        let err = compute_overlap(&stocks, &weights, &["A".to_string(), "Z".to_string()]).unwrap_err();
        assert!(matches!(err, error::OverlapError::Internal(_)));
    }
}
