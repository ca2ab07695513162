//! Weighted score shared by human finalization and AI triage.

/// A criterion's weight and, when scored, its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScore {
    pub nota: Option<f64>,
    pub peso: f64,
}

impl WeightedScore {
    pub fn scored(nota: f64, peso: f64) -> Self {
        Self {
            nota: Some(nota),
            peso,
        }
    }
}

/// `round2(Σ(nota·peso) / Σpeso)` over the scored entries; 0 when nothing carries weight.
pub fn weighted_average<I>(scores: I) -> f64
where
    I: IntoIterator<Item = WeightedScore>,
{
    let (weighted_sum, weight_sum) = scores
        .into_iter()
        .filter_map(|entry| entry.nota.map(|nota| (nota, entry.peso)))
        .fold((0.0_f64, 0.0_f64), |(sum, weights), (nota, peso)| {
            (sum + nota * peso, weights + peso)
        });

    if weight_sum == 0.0 {
        return 0.0;
    }

    round2(weighted_sum / weight_sum)
}

/// Half-up rounding to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_scale_each_score() {
        let total = weighted_average([
            WeightedScore::scored(8.0, 2.0),
            WeightedScore::scored(6.0, 1.0),
            WeightedScore::scored(10.0, 1.0),
        ]);
        assert_eq!(total, 8.0);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(weighted_average(Vec::new()), 0.0);
    }

    #[test]
    fn unscored_criteria_are_excluded_from_the_denominator() {
        let total = weighted_average([
            WeightedScore::scored(9.0, 1.0),
            WeightedScore {
                nota: None,
                peso: 5.0,
            },
        ]);
        assert_eq!(total, 9.0);
    }

    #[test]
    fn zero_weight_sum_scores_zero() {
        assert_eq!(weighted_average([WeightedScore::scored(7.0, 0.0)]), 0.0);
    }

    #[test]
    fn results_round_half_up_to_two_decimals() {
        // (7 + 8 + 8) / 3 = 7.666…
        let total = weighted_average([
            WeightedScore::scored(7.0, 1.0),
            WeightedScore::scored(8.0, 1.0),
            WeightedScore::scored(8.0, 1.0),
        ]);
        assert_eq!(total, 7.67);
        assert_eq!(round2(2.125), 2.13);
        assert_eq!(round2(4.0), 4.0);
    }
}
