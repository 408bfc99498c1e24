//! Per-component restriction predicates (spec §4.1 `Restriction`,
//! `RestrictionGroup`): morphology, lexis and adjacency ("space") checks
//! evaluated against a candidate token.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use syncoll_core::{determine_ppb, determine_ppb_ud, msd_to_properties, Token};

/// Which side(s) of a token carry a "glue" (no-space) join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpacePattern {
    Neither,
    Left,
    Right,
    Both,
}

impl SpacePattern {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "neither" => Some(SpacePattern::Neither),
            "left" => Some(SpacePattern::Left),
            "right" => Some(SpacePattern::Right),
            "both" => Some(SpacePattern::Both),
            _ => None,
        }
    }

    fn matches(&self, token: &Token) -> bool {
        let expect = match self {
            SpacePattern::Neither => (false, false),
            SpacePattern::Left => (true, false),
            SpacePattern::Right => (false, true),
            SpacePattern::Both => (true, true),
        };
        (token.previous_glue, token.glue) == expect
    }
}

/// A single restriction predicate. Each variant corresponds to one
/// `<restriction type="...">` kind in a structure file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Restriction {
    /// Compact-tag (xpos) feature constraints: feature name -> allowed
    /// value set (a pipe-joined attribute value is an OR of values).
    Morphology { constraints: BTreeMap<String, Vec<String>> },
    /// Featural-tag (udpos) feature constraints, matched directly against
    /// the token's feature map without decoding.
    MorphologyUd { constraints: BTreeMap<String, Vec<String>> },
    /// Lemma membership in a fixed list.
    Lexis { lemmas: Vec<String> },
    /// Glue/adjacency pattern.
    Space { pattern: SpacePattern },
    /// Always matches; used for components with no restriction.
    MatchAll,
}

impl Restriction {
    /// Evaluates this restriction against a token. A tag that fails to
    /// decode is treated as a non-match rather than propagated, per the
    /// matcher's error-handling contract (spec §7): malformed annotation on
    /// one candidate token should not abort the whole match attempt.
    pub fn matches(&self, token: &Token) -> bool {
        match self {
            Restriction::MatchAll => true,
            Restriction::Lexis { lemmas } => lemmas.iter().any(|l| l == &token.lemma),
            Restriction::Space { pattern } => pattern.matches(token),
            Restriction::Morphology { constraints } => {
                let Some(xpos) = token.xpos() else { return false };
                let Ok(props) = msd_to_properties(xpos) else {
                    return false;
                };
                constraints.iter().all(|(feature, allowed)| match props.get(feature) {
                    Some(value) => allowed.iter().any(|a| a == value),
                    None => false,
                })
            }
            Restriction::MorphologyUd { constraints } => {
                let Some(udpos) = token.udpos() else { return false };
                constraints.iter().all(|(feature, allowed)| match udpos.get(feature) {
                    Some(value) => allowed.iter().any(|a| a == value),
                    None => false,
                })
            }
        }
    }

    /// Content-word priority for core-word selection (spec §4.1/§9). Only
    /// morphology restrictions carry a `pos` (and, for verbs, `type`)
    /// constraint to score; everything else sorts last.
    pub fn ppb(&self) -> i32 {
        match self {
            Restriction::Morphology { constraints } => {
                let mut props = BTreeMap::new();
                if let Some(values) = constraints.get("pos") {
                    if let Some(first) = values.first() {
                        props.insert("pos".to_string(), first.clone());
                    }
                }
                if let Some(values) = constraints.get("type") {
                    if let Some(first) = values.first() {
                        props.insert("type".to_string(), first.clone());
                    }
                }
                if props.contains_key("pos") {
                    determine_ppb(&props)
                } else {
                    4
                }
            }
            Restriction::MorphologyUd { constraints } => constraints
                .get("pos")
                .and_then(|values| values.first())
                .map(|pos| determine_ppb_ud(pos))
                .unwrap_or(4),
            _ => 4,
        }
    }
}

/// How member restrictions of a [`RestrictionGroup`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    And,
    Or,
}

/// An ordered, combined set of restrictions attached to one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictionGroup {
    pub combinator: Combinator,
    pub members: Vec<Restriction>,
}

impl RestrictionGroup {
    pub fn match_all() -> Self {
        Self {
            combinator: Combinator::And,
            members: vec![Restriction::MatchAll],
        }
    }

    pub fn matches(&self, token: &Token) -> bool {
        match self.combinator {
            Combinator::And => self.members.iter().all(|r| r.matches(token)),
            Combinator::Or => self.members.iter().any(|r| r.matches(token)),
        }
    }

    /// The most content-bearing `ppb` score among member restrictions,
    /// used by the matcher to order sibling components by selectivity and
    /// by structure loading to pick core words.
    pub fn ppb(&self) -> i32 {
        self.members.iter().map(Restriction::ppb).min().unwrap_or(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncoll_core::Tag;

    fn tok_with_tag(tag: Tag) -> Token {
        let mut t = Token::new("pes", "psa", "s1", "1", 1, false, tag);
        t.previous_glue = false;
        t
    }

    #[test]
    fn morphology_restriction_matches_on_decoded_feature() {
        let mut constraints = BTreeMap::new();
        constraints.insert("pos".to_string(), vec!["noun".to_string()]);
        constraints.insert("case".to_string(), vec!["genitive".to_string(), "accusative".to_string()]);
        let r = Restriction::Morphology { constraints };
        assert!(r.matches(&tok_with_tag(Tag::Compact("Ncfsg".into()))));
        assert!(!r.matches(&tok_with_tag(Tag::Compact("Ncfsn".into()))));
    }

    #[test]
    fn malformed_tag_is_non_match_not_error() {
        let mut constraints = BTreeMap::new();
        constraints.insert("pos".to_string(), vec!["noun".to_string()]);
        let r = Restriction::Morphology { constraints };
        assert!(!r.matches(&tok_with_tag(Tag::Compact("????".into()))));
    }

    #[test]
    fn group_or_combinator() {
        let group = RestrictionGroup {
            combinator: Combinator::Or,
            members: vec![
                Restriction::Lexis { lemmas: vec!["pes".to_string()] },
                Restriction::Lexis { lemmas: vec!["maček".to_string()] },
            ],
        };
        assert!(group.matches(&tok_with_tag(Tag::Compact("Ncmsn".into()))));
    }

    #[test]
    fn space_pattern_checks_both_glue_flags() {
        let mut t = tok_with_tag(Tag::Compact("Ncmsn".into()));
        t.previous_glue = true;
        t.glue = false;
        let r = Restriction::Space { pattern: SpacePattern::Left };
        assert!(r.matches(&t));
        assert!(!Restriction::Space { pattern: SpacePattern::Right }.matches(&t));
    }
}
