//! Collocation statistics (spec §6 "Statistics"), grounded on
//! `original_source/cordex/writers/formatter.py` (`StatsFormatter`).

/// LogDice: `14 + log2(2 * f_xy / (f_x + f_y))`. Used both for the "core"
/// pair (the structure's one or two core components) and for "all"
/// components; callers pass whichever frequencies apply.
pub fn log_dice(f_xy: f64, f_x: f64, f_y: f64) -> f64 {
    if f_x + f_y <= 0.0 || f_xy <= 0.0 {
        return f64::NEG_INFINITY;
    }
    14.0 + (2.0 * f_xy / (f_x + f_y)).log2()
}

/// LogDice generalized to every core component's base frequency rather than
/// just the jppb pair (spec §6 `StatsFormatter.content_right`'s
/// `logdice_all`): zero-frequency components are dropped before averaging,
/// since a core word that never occurred alone contributes no signal.
pub fn log_dice_all(f_xy: f64, freqs: &[f64]) -> f64 {
    let nonzero: Vec<f64> = freqs.iter().copied().filter(|f| *f > 0.0).collect();
    if nonzero.is_empty() || f_xy <= 0.0 {
        return f64::NEG_INFINITY;
    }
    14.0 + (nonzero.len() as f64 * f_xy / nonzero.iter().sum::<f64>()).log2()
}

/// Delta-P from word 1 to word 2: how much more likely word 2 is given
/// word 1, versus its base rate in the rest of the corpus.
pub fn delta_p_1_to_2(f_xy: f64, f_x: f64, f_y: f64, corpus_size: f64) -> f64 {
    if f_x <= 0.0 || corpus_size - f_x <= 0.0 {
        return 0.0;
    }
    f_xy / f_x - (f_y - f_xy) / (corpus_size - f_x)
}

/// Delta-P from word 2 to word 1, the mirror of [`delta_p_1_to_2`].
pub fn delta_p_2_to_1(f_xy: f64, f_x: f64, f_y: f64, corpus_size: f64) -> f64 {
    delta_p_1_to_2(f_xy, f_y, f_x, corpus_size)
}

/// Count of distinct joined-surface-form strings across a collocation's
/// matches (spec §6, `StructureMatch.distinct_forms`).
pub fn distinct_forms(forms: &[String]) -> usize {
    let mut seen = std::collections::BTreeSet::new();
    for f in forms {
        seen.insert(f.as_str());
    }
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dice_of_perfectly_associated_pair_is_fifteen() {
        // f_xy == f_x == f_y: ratio is 1, so logdice = 14 + log2(2) = 15.
        let score = log_dice(10.0, 10.0, 10.0);
        assert!((score - 15.0).abs() < 1e-9);
    }

    #[test]
    fn log_dice_all_matches_log_dice_for_two_equal_frequencies() {
        let core = log_dice(10.0, 10.0, 10.0);
        let all = log_dice_all(10.0, &[10.0, 10.0]);
        assert!((core - all).abs() < 1e-9);
    }

    #[test]
    fn log_dice_all_drops_zero_frequency_components() {
        let with_zero = log_dice_all(5.0, &[0.0, 10.0]);
        let without_zero = log_dice_all(5.0, &[10.0]);
        assert!((with_zero - without_zero).abs() < 1e-9);
    }

    #[test]
    fn delta_p_is_zero_when_no_association() {
        // f_xy scales exactly with f_x/corpus_size * f_y: no extra lift.
        let corpus_size = 1000.0;
        let f_x = 100.0;
        let f_y = 50.0;
        let f_xy = f_x * f_y / corpus_size;
        let score = delta_p_1_to_2(f_xy, f_x, f_y, corpus_size);
        assert!(score.abs() < 1e-9);
    }

    #[test]
    fn distinct_forms_counts_unique_strings() {
        let forms = vec!["a b".to_string(), "a b".to_string(), "a c".to_string()];
        assert_eq!(distinct_forms(&forms), 2);
    }
}
