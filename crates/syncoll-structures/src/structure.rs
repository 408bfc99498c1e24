//! Structure-file loading: parses a `<syntactic_structure>` XML document
//! into a [`SyntacticStructure`] compiled to a component arena, and
//! determines the one or two core (content-bearing) components a
//! structure's matches are keyed by (spec §4 "Structure loader", §9
//! "Core-word determination").

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use syncoll_core::{SyncollError, SyncollResult};

use crate::component::{ChildEdge, Component, ComponentStatus, ComponentType};
use crate::order::Order;
use crate::restriction::{Combinator, Restriction, RestrictionGroup, SpacePattern};

/// Which annotation flavour a structure's restrictions are written against.
/// A structure file declares exactly one; it must match the corpus being
/// processed (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemType {
    Jos,
    Ud,
}

impl SystemType {
    fn parse(s: &str) -> SyncollResult<Self> {
        match s {
            "JOS" => Ok(SystemType::Jos),
            "UD" => Ok(SystemType::Ud),
            other => Err(SyncollError::structure_load(
                "system_type",
                format!("unknown system_type '{other}'"),
            )),
        }
    }
}

/// A parsed `<representation>` element: which component it renders, which
/// recipe variant (`rendition`), and for `word_form` which selection mode
/// (`msd`/`all`/`agreement`) plus any extra parameters. `syncoll-represent`
/// turns these into executable recipes; this crate only carries the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepresentationSpec {
    pub component_id: String,
    pub rendition: String,
    pub selection: Option<String>,
    pub params: BTreeMap<String, String>,
}

/// A content-bearing deprel set used to pick UD core words when a structure
/// gives no explicit morphology restriction to score by ppb (spec §9).
const CORE_DEPRELS: &[&str] = &[
    "nsubj", "obj", "iobj", "csubj", "ccomp", "xcomp", "obl", "nmod", "amod", "advmod", "acl", "advcl",
];

/// A compiled structure: a flat component arena plus the root index, the
/// chosen core component id(s), and the representation specs for every
/// component that renders output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntacticStructure {
    pub id: String,
    pub structure_type: String,
    pub system_type: SystemType,
    pub components: Vec<Component>,
    pub root_idx: usize,
    pub core_component_ids: Vec<String>,
    pub max_num_components: usize,
    pub representations: Vec<RepresentationSpec>,
}

impl SyntacticStructure {
    /// Parses one `<syntactic_structure>` document, with core-word-tie
    /// ambiguity treated as fatal (matches `StatsFormatter.set_structure`'s
    /// `assert len(jppb) == 2`, the path every caller exercised before the
    /// spec's statistics toggle existed).
    pub fn from_xml(xml: &str) -> SyncollResult<Self> {
        Self::from_xml_with_options(xml, true)
    }

    /// Parses one `<syntactic_structure>` document. `statistics` controls
    /// whether an indeterminate (more than two tied) core-word pick is a
    /// hard error: the original's tie assertion only runs from the stats
    /// formatter's `set_structure` path, so a non-statistics run tolerates
    /// the ambiguity by keeping the two lowest-scoring components in
    /// restriction order (spec §9 Open Question).
    pub fn from_xml_with_options(xml: &str, statistics: bool) -> SyncollResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut id = String::new();
        let mut structure_type = String::new();
        let mut system_type = SystemType::Jos;

        let mut components: Vec<Component> = Vec::new();
        let mut id_to_idx: BTreeMap<String, usize> = BTreeMap::new();
        let mut pending_restriction: Option<(Combinator, Vec<Restriction>)> = None;
        let mut current_component_id: Option<String> = None;

        let mut edges: Vec<(String, String, String, Order, ComponentStatus)> = Vec::new();
        let mut representations: Vec<RepresentationSpec> = Vec::new();

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).map_err(|e| {
                SyncollError::structure_load("xml", format!("parse error: {e}"))
            })? {
                Event::Eof => break,
                Event::Start(e) | Event::Empty(e) => {
                    let name = e.name();
                    let local = String::from_utf8_lossy(name.as_ref()).to_string();
                    let attrs = attrs_of(&e)?;
                    match local.as_str() {
                        "syntactic_structure" => {
                            id = attrs.get("id").cloned().unwrap_or_default();
                            structure_type = attrs.get("type").cloned().unwrap_or_else(|| "collocation".to_string());
                            if let Some(st) = attrs.get("system_type") {
                                system_type = SystemType::parse(st)?;
                            }
                        }
                        "component" => {
                            let cid = attrs
                                .get("id")
                                .cloned()
                                .ok_or_else(|| SyncollError::structure_load(&id, "component missing id"))?;
                            current_component_id = Some(cid.clone());
                            id_to_idx.insert(cid, components.len());
                            components.push(Component::new(
                                current_component_id.clone().unwrap(),
                                RestrictionGroup::match_all(),
                            ));
                            pending_restriction = None;
                        }
                        "restrictions" => {
                            let combinator = match attrs.get("combinator").map(String::as_str) {
                                Some("or") => Combinator::Or,
                                _ => Combinator::And,
                            };
                            pending_restriction = Some((combinator, Vec::new()));
                        }
                        "restriction" => {
                            // handled by nested <feature>/<lemma>/<space> leaves below via
                            // a small lookahead-free model: restriction type drives which
                            // leaf elements are expected, accumulated into `constraints`.
                            let kind = attrs.get("type").cloned().unwrap_or_default();
                            current_restriction_kind(&mut pending_restriction, &kind);
                        }
                        "feature" => {
                            let name = attrs.get("name").cloned().unwrap_or_default();
                            let value = attrs.get("value").cloned().unwrap_or_default();
                            let values: Vec<String> = value.split('|').map(|s| s.to_string()).collect();
                            add_feature(&mut pending_restriction, name, values);
                        }
                        "lemma" => {
                            let value = attrs.get("value").cloned().unwrap_or_default();
                            add_lemma(&mut pending_restriction, value);
                        }
                        "space" => {
                            let pattern = attrs.get("pattern").cloned().unwrap_or_default();
                            add_space(&mut pending_restriction, pattern)?;
                        }
                        "dependency" => {
                            let from = attrs
                                .get("from")
                                .cloned()
                                .ok_or_else(|| SyncollError::structure_load(&id, "dependency missing 'from'"))?;
                            let to = attrs
                                .get("to")
                                .cloned()
                                .ok_or_else(|| SyncollError::structure_load(&id, "dependency missing 'to'"))?;
                            let deprel = attrs.get("deprel").cloned().unwrap_or_default();
                            let order = Order::parse(attrs.get("order").map(String::as_str).unwrap_or("00"))?;
                            let status = match attrs.get("status").map(String::as_str) {
                                Some("optional") => ComponentStatus::Optional,
                                Some("forbidden") => ComponentStatus::Forbidden,
                                _ => ComponentStatus::Required,
                            };
                            edges.push((from, to, deprel, order, status));
                        }
                        "representation" => {
                            let component_id = attrs.get("component").cloned().unwrap_or_default();
                            let rendition = attrs.get("rendition").cloned().unwrap_or_default();
                            let selection = attrs.get("selection").cloned();
                            let mut params = attrs.clone();
                            params.remove("component");
                            params.remove("rendition");
                            params.remove("selection");
                            representations.push(RepresentationSpec {
                                component_id,
                                rendition,
                                selection,
                                params,
                            });
                        }
                        _ => {}
                    }
                }
                Event::End(e) => {
                    let local = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if local == "component" {
                        if let (Some(cid), Some((combinator, members))) = (current_component_id.take(), pending_restriction.take()) {
                            let idx = *id_to_idx.get(&cid).expect("component just inserted");
                            components[idx].restriction = RestrictionGroup {
                                combinator,
                                members: if members.is_empty() { vec![Restriction::MatchAll] } else { members },
                            };
                        }
                    }
                }
                _ => {}
            }
            buf.clear();
        }

        // A `modra` edge anchors to a synthetic root component `#` that a
        // structure file need not declare with its own `<component>` element
        // (`from_xml`'s `fake_root_component`, prepended to `components`
        // whenever any dependency carries deprel `modra`).
        if edges.iter().any(|(from, to, _, _, _)| from == "#" || to == "#") && !id_to_idx.contains_key("#") {
            components.insert(0, Component::new("#", RestrictionGroup::match_all()));
            for idx in id_to_idx.values_mut() {
                *idx += 1;
            }
            id_to_idx.insert("#".to_string(), 0);
        }

        for (from, to, deprel, order, status) in edges {
            let from_idx = *id_to_idx
                .get(&from)
                .ok_or_else(|| SyncollError::structure_load(&id, format!("unknown component '{from}'")))?;
            let to_idx = *id_to_idx
                .get(&to)
                .ok_or_else(|| SyncollError::structure_load(&id, format!("unknown component '{to}'")))?;
            components[from_idx].add_child(deprel, order, status, to_idx);
        }

        if components.is_empty() {
            return Err(SyncollError::structure_load(&id, "structure has no components"));
        }

        let root_idx = find_root(&components);
        let max_num_components = components.len();

        let core_component_ids = match system_type {
            SystemType::Jos => determine_core2w(&components, statistics)?,
            SystemType::Ud => determine_core2w_ud(&components, statistics)?,
        };

        for cid in &core_component_ids {
            let idx = *id_to_idx.get(cid).expect("core id came from components");
            components[idx].component_type = if core_component_ids.len() == 2 {
                ComponentType::Core2w
            } else {
                ComponentType::Core
            };
        }

        Ok(SyntacticStructure {
            id,
            structure_type,
            system_type,
            components,
            root_idx,
            core_component_ids,
            max_num_components,
            representations,
        })
    }
}

fn attrs_of(e: &quick_xml::events::BytesStart) -> SyncollResult<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| SyncollError::structure_load("xml", format!("bad attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| SyncollError::structure_load("xml", format!("bad attribute value: {err}")))?
            .to_string();
        out.insert(key, value);
    }
    Ok(out)
}

fn current_restriction_kind(pending: &mut Option<(Combinator, Vec<Restriction>)>, kind: &str) {
    let Some((_, members)) = pending else { return };
    match kind {
        "morphology" => members.push(Restriction::Morphology { constraints: BTreeMap::new() }),
        "morphology_ud" => members.push(Restriction::MorphologyUd { constraints: BTreeMap::new() }),
        "lexis" => members.push(Restriction::Lexis { lemmas: Vec::new() }),
        "space" => {} // filled in by the `<space>` leaf itself
        _ => {}
    }
}

fn add_feature(pending: &mut Option<(Combinator, Vec<Restriction>)>, name: String, values: Vec<String>) {
    let Some((_, members)) = pending else { return };
    match members.last_mut() {
        Some(Restriction::Morphology { constraints }) => {
            constraints.insert(name, values);
        }
        Some(Restriction::MorphologyUd { constraints }) => {
            constraints.insert(name, values);
        }
        _ => {}
    }
}

fn add_lemma(pending: &mut Option<(Combinator, Vec<Restriction>)>, value: String) {
    let Some((_, members)) = pending else { return };
    match members.last_mut() {
        Some(Restriction::Lexis { lemmas }) => lemmas.push(value),
        _ => {}
    }
}

fn add_space(pending: &mut Option<(Combinator, Vec<Restriction>)>, pattern: String) -> SyncollResult<()> {
    let Some((_, members)) = pending else { return Ok(()) };
    let parsed = SpacePattern::parse(&pattern)
        .ok_or_else(|| SyncollError::structure_load("space", format!("unknown space pattern '{pattern}'")))?;
    members.push(Restriction::Space { pattern: parsed });
    Ok(())
}

fn find_root(components: &[Component]) -> usize {
    let mut has_parent = vec![false; components.len()];
    for c in components {
        for edge in &c.children {
            has_parent[edge.component_idx] = true;
        }
    }
    has_parent.iter().position(|&p| !p).unwrap_or(0)
}

/// Picks the two core components for a JOS-flavour structure, scoring each
/// component's restriction by `ppb` (lowest wins) and keeping the two
/// lowest-ranked regardless of whether the lowest rank is unique. Only a
/// 3-way-or-wider tie at the second-place rank is fatal, matching
/// `determine_core2w`'s `ppb_components[1][1] == ppb_components[2][1]`
/// check (spec §9 Open Question: structures are fatal here only when
/// downstream statistics depend on a unique core pair).
fn determine_core2w(components: &[Component], statistics: bool) -> SyncollResult<Vec<String>> {
    let mut scored: Vec<(i32, &Component)> = components.iter().map(|c| (c.restriction.ppb(), c)).collect();
    scored.sort_by_key(|(score, _)| *score);

    if statistics && scored.len() > 2 && scored[1].0 == scored[2].0 {
        return Err(SyncollError::structure_ambiguous(
            "unknown",
            format!("components tie for the second-lowest ppb score {}", scored[1].0),
        ));
    }

    let take = scored.len().min(2);
    Ok(scored[..take].iter().map(|(_, c)| c.id.clone()).collect())
}

/// UD-flavour equivalent: scores components by the deprel of their incoming
/// edge against [`CORE_DEPRELS`] when no explicit morphology restriction is
/// present, falling back to restriction-based `ppb`.
fn determine_core2w_ud(components: &[Component], statistics: bool) -> SyncollResult<Vec<String>> {
    let mut incoming_deprel: BTreeMap<usize, &str> = BTreeMap::new();
    for c in components {
        for edge in &c.children {
            incoming_deprel.insert(edge.component_idx, edge.deprel.as_str());
        }
    }

    let mut scored: Vec<(i32, &Component)> = components
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            let restriction_score = c.restriction.ppb();
            let score = if restriction_score < 4 {
                restriction_score
            } else if incoming_deprel
                .get(&idx)
                .map(|d| CORE_DEPRELS.iter().any(|core| d.split('|').any(|part| part == *core)))
                .unwrap_or(false)
            {
                0
            } else {
                4
            };
            (score, c)
        })
        .collect();
    scored.sort_by_key(|(score, _)| *score);

    if statistics && scored.len() > 2 && scored[1].0 == scored[2].0 {
        return Err(SyncollError::structure_ambiguous(
            "unknown",
            format!("components tie for the second-lowest ppb score {}", scored[1].0),
        ));
    }

    let take = scored.len().min(2);
    Ok(scored[..take].iter().map(|(_, c)| c.id.clone()).collect())
}

/// Parses a bundle of `<syntactic_structure>` documents (concatenated or
/// wrapped in a container element) and keeps only collocation-type
/// structures, matching the filter the original pipeline applies before
/// matching (formal/descendant-only structures are excluded).
pub fn build_structures(xml_documents: &[String]) -> SyncollResult<Vec<SyntacticStructure>> {
    build_structures_with_options(xml_documents, true)
}

/// As [`build_structures`], but threads the `statistics` toggle through to
/// every structure's core-word determination (spec §9 Open Question).
pub fn build_structures_with_options(xml_documents: &[String], statistics: bool) -> SyncollResult<Vec<SyntacticStructure>> {
    let mut out = Vec::new();
    for doc in xml_documents {
        let structure = SyntacticStructure::from_xml_with_options(doc, statistics)?;
        if structure.structure_type == "collocation" {
            out.push(structure);
        }
    }
    Ok(out)
}
