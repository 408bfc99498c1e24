//! Depth-first dependency-subgraph matcher (spec §4.2 "Matcher"). For a
//! compiled [`SyntacticStructure`] and a [`Sentence`], finds every subgraph
//! assignment of component ids to token indices that satisfies every
//! required/optional/forbidden child edge, order constraint, and the
//! injectivity rule that no token is reused under two component ids.

use std::collections::BTreeMap;

use syncoll_core::{Sentence, Token};
use syncoll_structures::{ChildEdge, ComponentStatus, SyntacticStructure};

/// component id -> matched token index, for one full structure match.
pub type Assignment = BTreeMap<String, usize>;

/// Finds every match of `structure` in `sentence`, trying every token
/// (including the synthetic root, for `modra`-rooted structures) as the
/// candidate for the structure's root component.
pub fn match_sentence(structure: &SyntacticStructure, sentence: &Sentence) -> Vec<Assignment> {
    let mut out = Vec::new();
    for idx in 0..sentence.tokens.len() {
        out.extend(match_component(structure, structure.root_idx, idx, sentence));
    }
    out
}

/// Tries `component_idx` against `token_idx`, recursing into children and
/// composing the cartesian product of their sub-assignments.
fn match_component(structure: &SyntacticStructure, component_idx: usize, token_idx: usize, sentence: &Sentence) -> Vec<Assignment> {
    let component = &structure.components[component_idx];
    let token = sentence.token(token_idx);

    if !component.restriction.matches(token) {
        return Vec::new();
    }

    let mut base = Assignment::new();
    base.insert(component.id.clone(), token_idx);

    let mut edges: Vec<&ChildEdge> = component.children.iter().collect();
    edges.sort_by_key(|edge| selectivity_key(structure, edge));

    let mut combos = vec![base];
    for edge in edges {
        let child_options = candidate_sub_assignments(structure, edge, token_idx, sentence);

        match edge.status {
            ComponentStatus::Forbidden => {
                if !child_options.is_empty() {
                    return Vec::new();
                }
            }
            ComponentStatus::Required => {
                if child_options.is_empty() {
                    return Vec::new();
                }
                combos = cartesian_merge(combos, &child_options, false);
            }
            ComponentStatus::Optional => {
                combos = cartesian_merge(combos, &child_options, true);
            }
        }
        if combos.is_empty() {
            return Vec::new();
        }
    }

    combos
}

/// All (ordered, injective-within-itself) sub-assignments the child
/// component at `edge` can produce from candidates reachable along its
/// deprel from `parent_idx`.
fn candidate_sub_assignments(structure: &SyntacticStructure, edge: &ChildEdge, parent_idx: usize, sentence: &Sentence) -> Vec<Assignment> {
    let parent = sentence.token(parent_idx);
    let mut out = Vec::new();
    for candidate_idx in sentence.children_along(parent_idx, &edge.deprel) {
        let candidate = sentence.token(candidate_idx);
        // `Order::matches(from, to)` takes the parent as `from` and the
        // candidate child as `to` (spec §4.2 "from-to ⇒ parent.int_id <
        // child.int_id"; `original_source/cordex/structures/component.py`
        // calls `order.match(word, next_word)` the same way).
        if !edge.order.matches(parent, candidate) {
            continue;
        }
        out.extend(match_component(structure, edge.component_idx, candidate_idx, sentence));
    }
    out
}

/// Merges each existing combination with each option for one child edge,
/// dropping combinations where a token would be assigned to two different
/// component ids. When `allow_skip` is set (optional edges), each existing
/// combination also survives unchanged, representing "child absent".
fn cartesian_merge(existing: Vec<Assignment>, options: &[Assignment], allow_skip: bool) -> Vec<Assignment> {
    let mut out = Vec::new();
    for base in &existing {
        for option in options {
            if let Some(merged) = try_merge(base, option) {
                out.push(merged);
            }
        }
        if allow_skip {
            out.push(base.clone());
        }
    }
    out
}

fn try_merge(a: &Assignment, b: &Assignment) -> Option<Assignment> {
    let mut used_tokens: BTreeMap<usize, &str> = BTreeMap::new();
    for (id, tok) in a.iter().chain(b.iter()) {
        if let Some(existing_id) = used_tokens.get(tok) {
            if *existing_id != id.as_str() {
                return None;
            }
        }
        used_tokens.insert(*tok, id.as_str());
    }
    let mut merged = a.clone();
    for (id, tok) in b {
        match merged.get(id) {
            Some(existing) if existing != tok => return None,
            _ => {
                merged.insert(id.clone(), *tok);
            }
        }
    }
    Some(merged)
}

/// Sort key making more selective child edges run first: edges whose
/// target restriction has more members, then lower (more content-bearing)
/// `ppb`, are tried before loosely constrained ones.
fn selectivity_key(structure: &SyntacticStructure, edge: &ChildEdge) -> (i32, i32) {
    let restriction = &structure.components[edge.component_idx].restriction;
    (-(restriction.members.len() as i32), restriction.ppb())
}

#[allow(dead_code)]
fn assignment_tokens<'a>(assignment: &Assignment, sentence: &'a Sentence) -> BTreeMap<&'a str, &'a Token> {
    assignment
        .iter()
        .map(|(id, idx)| (id.as_str(), sentence.token(*idx)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncoll_core::Tag;
    use syncoll_structures::{Component, ComponentType, Order, RestrictionGroup};

    fn sentence_pes_lep() -> Sentence {
        // "lep pes" (nice dog): c2 --amod--> c1, c1 is the noun head.
        let mut noun = Token::new("pes", "pes", "s1", "2", 2, false, Tag::Compact("Ncmsn".into()));
        let adj = Token::new("lep", "lep", "s1", "1", 1, false, Tag::Compact("Agpmsn".into()));
        noun.add_link("amod", 1);
        Sentence { tokens: vec![noun, adj], root: 0 }
    }

    fn noun_adj_structure() -> SyntacticStructure {
        let mut noun_restriction = RestrictionGroup::match_all();
        noun_restriction.members = vec![syncoll_structures::Restriction::Morphology {
            constraints: BTreeMap::from([("pos".to_string(), vec!["noun".to_string()])]),
        }];
        let mut adj_restriction = RestrictionGroup::match_all();
        adj_restriction.members = vec![syncoll_structures::Restriction::Morphology {
            constraints: BTreeMap::from([("pos".to_string(), vec!["adjective".to_string()])]),
        }];

        let mut c0 = Component::new("c1", noun_restriction);
        let c1 = Component::new("c2", adj_restriction);
        // The fixture sentences below always place the adjective before the
        // noun head, so the parent (noun) follows its child: `ToFrom`.
        c0.add_child("amod", Order::ToFrom, ComponentStatus::Required, 1);
        c0.component_type = ComponentType::Core;

        SyntacticStructure {
            id: "S1".to_string(),
            structure_type: "collocation".to_string(),
            system_type: syncoll_structures::SystemType::Jos,
            components: vec![c0, c1],
            root_idx: 0,
            core_component_ids: vec!["c1".to_string()],
            max_num_components: 2,
            representations: Vec::new(),
        }
    }

    #[test]
    fn matches_required_child_and_orders_correctly() {
        let sentence = sentence_pes_lep();
        let structure = noun_adj_structure();
        let matches = match_sentence(&structure, &sentence);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].get("c1"), Some(&0));
        assert_eq!(matches[0].get("c2"), Some(&1));
    }

    #[test]
    fn no_match_without_required_child() {
        let mut sentence = sentence_pes_lep();
        sentence.tokens[0].links.clear();
        let structure = noun_adj_structure();
        assert!(match_sentence(&structure, &sentence).is_empty());
    }

    #[test]
    fn injectivity_prevents_reusing_a_token_across_components() {
        // Two children under the same deprel, both required by distinct
        // components pointing at structurally-identical restrictions should
        // each grab a distinct token, never the same one twice.
        let mut noun = Token::new("pes", "pes", "s1", "3", 3, false, Tag::Compact("Ncmsn".into()));
        let adj1 = Token::new("lep", "lep", "s1", "1", 1, false, Tag::Compact("Agpmsn".into()));
        let adj2 = Token::new("star", "star", "s1", "2", 2, false, Tag::Compact("Agpmsn".into()));
        noun.add_link("amod", 1);
        noun.add_link("amod", 2);
        let sentence = Sentence { tokens: vec![noun, adj1, adj2], root: 0 };

        let structure = noun_adj_structure();
        let matches = match_sentence(&structure, &sentence);
        // one match per distinct adjective child, never both mapped to c2 at once
        assert_eq!(matches.len(), 2);
        for m in &matches {
            assert_ne!(m.get("c1"), m.get("c2"));
        }
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use syncoll_core::Tag;
    use syncoll_structures::{Component, ComponentType, Order, RestrictionGroup};

    /// Noun head with `n` adjective children under `amod`, each placed
    /// either before or after the head per `adj_before_head`, with possibly
    /// repeated lemmas (so some candidates are structurally indistinguishable
    /// and the matcher must still keep them injective). Tokens are emitted
    /// in strictly increasing `int_id` order, head included.
    fn noun_with_adjectives(lemmas: &[String], adj_before_head: &[bool]) -> Sentence {
        let before: Vec<String> = lemmas.iter().zip(adj_before_head).filter(|(_, &b)| b).map(|(l, _)| l.clone()).collect();
        let after: Vec<String> = lemmas.iter().zip(adj_before_head).filter(|(_, &b)| !b).map(|(l, _)| l.clone()).collect();
        let head_pos = before.len() as i64 + 1;

        let mut tokens = Vec::new();
        for (i, lemma) in before.iter().enumerate() {
            let int_id = i as i64 + 1;
            tokens.push(Token::new(lemma.clone(), lemma.clone(), "s1", int_id.to_string(), int_id, false, Tag::Compact("Agpmsn".into())));
        }
        let head_idx = tokens.len();
        tokens.push(Token::new("pes", "pes", "s1", head_pos.to_string(), head_pos, false, Tag::Compact("Ncmsn".into())));
        for (i, lemma) in after.iter().enumerate() {
            let int_id = head_pos + 1 + i as i64;
            tokens.push(Token::new(lemma.clone(), lemma.clone(), "s1", int_id.to_string(), int_id, false, Tag::Compact("Agpmsn".into())));
        }

        for idx in 0..tokens.len() {
            if idx != head_idx {
                tokens[head_idx].add_link("amod", idx);
            }
        }

        Sentence { tokens, root: head_idx }
    }

    fn structure_with_order(order: Order) -> SyntacticStructure {
        let mut noun_restriction = RestrictionGroup::match_all();
        noun_restriction.members = vec![syncoll_structures::Restriction::Morphology {
            constraints: BTreeMap::from([("pos".to_string(), vec!["noun".to_string()])]),
        }];
        let mut adj_restriction = RestrictionGroup::match_all();
        adj_restriction.members = vec![syncoll_structures::Restriction::Morphology {
            constraints: BTreeMap::from([("pos".to_string(), vec!["adjective".to_string()])]),
        }];

        let mut c0 = Component::new("c1", noun_restriction);
        let c1 = Component::new("c2", adj_restriction);
        c0.add_child("amod", order, ComponentStatus::Optional, 1);
        c0.component_type = ComponentType::Core;

        SyntacticStructure {
            id: "S1".to_string(),
            structure_type: "collocation".to_string(),
            system_type: syncoll_structures::SystemType::Jos,
            components: vec![c0, c1],
            root_idx: 0,
            core_component_ids: vec!["c1".to_string()],
            max_num_components: 2,
            representations: Vec::new(),
        }
    }

    proptest! {
        /// Spec §8 property 1: injectivity. However the sentence is shaped,
        /// no returned assignment may map two component ids to the same
        /// token index.
        #[test]
        fn matches_are_always_injective(
            lemmas in prop::collection::vec("[a-c]", 0..5),
            positions in prop::collection::vec(any::<bool>(), 0..5),
        ) {
            let n = lemmas.len().min(positions.len());
            let sentence = noun_with_adjectives(&lemmas[..n], &positions[..n]);
            let structure = structure_with_order(Order::Any);
            for assignment in match_sentence(&structure, &sentence) {
                let mut seen = std::collections::BTreeSet::new();
                for &idx in assignment.values() {
                    prop_assert!(seen.insert(idx), "token {idx} bound under two component ids");
                }
            }
        }

        /// Spec §8 property 4: ordered children. Every match of an edge
        /// with order `from-to` binds a child whose `int_id` exceeds the
        /// head's, regardless of how many candidates precede or follow it.
        #[test]
        fn from_to_order_constraint_always_holds(
            lemmas in prop::collection::vec("[a-c]", 0..5),
            positions in prop::collection::vec(any::<bool>(), 0..5),
        ) {
            let n = lemmas.len().min(positions.len());
            let sentence = noun_with_adjectives(&lemmas[..n], &positions[..n]);
            let structure = structure_with_order(Order::FromTo);
            for assignment in match_sentence(&structure, &sentence) {
                if let (Some(&head), Some(&child)) = (assignment.get("c1"), assignment.get("c2")) {
                    let head_int = sentence.token(head).int_id;
                    let child_int = sentence.token(child).int_id;
                    prop_assert!(head_int < child_int);
                }
            }
        }
    }
}
