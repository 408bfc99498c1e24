//! Slovenian voicing-assimilation fixes for single-letter preposition
//! components (`s`/`z`, `k`/`h`) and the fixed-restriction-order check,
//! grounded on `original_source/cordex/postprocessors/postprocessor.py`.

use std::collections::BTreeMap;

use syncoll_store::MatchedToken;

const VOICELESS: &[char] = &['c', 'č', 'f', 'h', 'k', 'p', 's', 'š', 't'];

/// Picks `s` before a voiceless consonant, `z` otherwise.
pub fn fix_sz_sl(next_word: &str) -> char {
    match next_word.chars().next() {
        Some(c) if VOICELESS.contains(&c) => 's',
        _ => 'z',
    }
}

/// Picks `h` before `g`/`k`, `k` otherwise.
pub fn fix_kh_sl(next_word: &str) -> char {
    match next_word.chars().next() {
        Some('g') | Some('k') => 'h',
        _ => 'k',
    }
}

/// Numerically orders a match's non-root components by component id, the
/// same order `process`'s `collocation_id` list relies on.
fn ordered_non_root(tokens: &BTreeMap<String, MatchedToken>) -> Vec<String> {
    let mut ids: Vec<String> = tokens.keys().filter(|id| id.as_str() != "#").cloned().collect();
    ids.sort_by_key(|id| id.parse::<i64>().unwrap_or(i64::MAX));
    ids
}

/// Rewrites a matched preposition component's lemma and surface text to the
/// phonologically correct voicing based on its right-hand neighbor's lemma,
/// for every bound component except the last, and returns the
/// (component_id, lemma) pairs the fixed collocation key is built from. A
/// no-op outside Slovenian or with fewer than two bound components.
pub fn apply_voicing_fix(lang: &str, tokens: &mut BTreeMap<String, MatchedToken>) -> Vec<(String, String)> {
    let order = ordered_non_root(tokens);

    if lang == "sl" && order.len() > 1 {
        for i in 0..order.len() - 1 {
            let word = tokens[&order[i]].lemma.clone();
            let next_lemma = tokens[&order[i + 1]].lemma.clone();
            let correct = if word == "s" || word == "z" {
                Some(fix_sz_sl(&next_lemma))
            } else if word == "k" || word == "h" {
                Some(fix_kh_sl(&next_lemma))
            } else {
                None
            };
            if let Some(letter) = correct {
                let fixed = letter.to_string();
                if let Some(token) = tokens.get_mut(&order[i]) {
                    token.lemma = fixed.clone();
                    token.text = fixed;
                }
            }
        }
    }

    order.into_iter().map(|id| (id.clone(), tokens[&id].lemma.clone())).collect()
}

/// Checks that bound component ids appear in the same relative order as
/// their tokens' sentence positions, when `fixed_restriction_order` is
/// enabled. Always true when it is disabled.
pub fn is_fixed_restriction_order(fixed_restriction_order: bool, tokens: &BTreeMap<String, MatchedToken>) -> bool {
    if !fixed_restriction_order {
        return true;
    }

    let mut by_position: Vec<&MatchedToken> = tokens.values().collect();
    by_position.sort_by_key(|tok| tok.int_id);

    let mut prev_id: i64 = -1;
    for token in by_position {
        if token.component_id == "#" {
            continue;
        }
        let int_key: i64 = token.component_id.parse().unwrap_or(0);
        if prev_id > int_key {
            return false;
        }
        prev_id = int_key;
    }
    true
}
