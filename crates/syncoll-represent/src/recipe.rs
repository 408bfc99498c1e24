//! Representation recipes (spec §5 "Representation engine"): five
//! independent variants plus a dependent agreement variant, each collecting
//! observed tokens across every match of its component and then picking one
//! canonical surface form.

use std::collections::{BTreeMap, BTreeSet};

use syncoll_core::{msd_to_properties, Token};

use crate::lookup::LookupBackend;

/// Features compared when checking agreement between a dependent and its
/// head (spec §5 agreement protocol). Only the features present on both
/// sides are required to match, so a noun (no person) can still agree with
/// a pronoun head on gender/number/case alone.
const AGREEMENT_FEATURES: &[&str] = &["gender", "number", "case", "person"];

/// What `render` produced for one component: the chosen surface text and
/// its tag, or `(None, None)` when no assignment could be rendered at all.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub text: Option<String>,
    pub msd: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LemmaRecipe {
    first: Option<(String, String)>,
}

impl LemmaRecipe {
    pub fn new() -> Self {
        Self { first: None }
    }

    pub fn add_word(&mut self, token: &Token) {
        if self.first.is_none() {
            self.first = Some((token.lemma.clone(), token.tag.render()));
        }
    }

    /// Renders the first observed lemma, paired with its tag unless a
    /// lookup backend is available to supply the lemma's canonical tag
    /// instead (spec §5 "lemma" rendition: only the tag may be rewritten by
    /// a backend, never the emitted text).
    pub fn render(&self, lookup: Option<&dyn LookupBackend>) -> Rendered {
        let Some((lemma, tag)) = &self.first else {
            return Rendered::default();
        };
        if let Some(canonical) = lookup.and_then(|backend| backend.find_lemma(lemma)).and_then(|forms| forms.into_iter().next()) {
            return Rendered { text: Some(lemma.clone()), msd: Some(canonical.msd) };
        }
        Rendered { text: Some(lemma.clone()), msd: Some(tag.clone()) }
    }
}

#[derive(Debug, Clone)]
pub struct LexisRecipe {
    text: String,
    tag: String,
}

impl LexisRecipe {
    pub fn new(text: impl Into<String>, tag: impl Into<String>) -> Self {
        Self { text: text.into(), tag: tag.into() }
    }

    pub fn add_word(&mut self, _token: &Token) {}

    pub fn render(&self) -> Rendered {
        Rendered { text: Some(self.text.clone()), msd: Some(self.tag.clone()) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordFormAllRecipe {
    forms: BTreeSet<String>,
    tags: BTreeSet<String>,
}

impl WordFormAllRecipe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_word(&mut self, token: &Token) {
        self.forms.insert(token.text.to_lowercase());
        self.tags.insert(token.tag.render());
    }

    /// Joins every distinct lowercased surface form with `/`, paired with
    /// every distinct tag observed across the same words, also `/`-joined
    /// (`WordFormAllCR._render`'s `"/".join(set(forms)), "/".join(set(msds))`).
    pub fn render(&self) -> Rendered {
        if self.forms.is_empty() {
            return Rendered::default();
        }
        Rendered {
            text: Some(self.forms.iter().cloned().collect::<Vec<_>>().join("/")),
            msd: Some(self.tags.iter().cloned().collect::<Vec<_>>().join("/")),
        }
    }
}

/// (msd, lemma, text) tuple tallying, shared by `word-form-any`, `-msd` and
/// `-agreement`.
#[derive(Debug, Clone, Default)]
pub struct FormCounts {
    counts: BTreeMap<(String, String, String), usize>,
}

impl FormCounts {
    pub fn add(&mut self, token: &Token) {
        let key = (token.tag.render(), token.lemma.clone(), token.text.clone());
        *self.counts.entry(key).or_insert(0) += 1;
    }

    pub fn most_frequent(&self) -> Option<(&str, &str, &str)> {
        self.counts
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|((msd, lemma, text), _)| (msd.as_str(), lemma.as_str(), text.as_str()))
    }

    pub fn matching<'a>(&'a self, predicate: impl Fn(&str) -> bool + 'a) -> impl Iterator<Item = (&'a str, &'a str, &'a str, usize)> {
        self.counts
            .iter()
            .filter(move |((msd, _, _), _)| predicate(msd))
            .map(|((msd, lemma, text), count)| (msd.as_str(), lemma.as_str(), text.as_str(), *count))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Folds casing variants of the same `(msd, lemma)` text into their
    /// majority-cased form when the minority variant's observed share falls
    /// below `threshold` (spec §9 "lowercase-collapse threshold"), so a rare
    /// sentence-initial capitalisation doesn't win a form vote it wouldn't
    /// otherwise have.
    pub fn collapse_casing(&mut self, threshold: f64) {
        let mut by_fold: BTreeMap<(String, String, String), Vec<((String, String, String), usize)>> = BTreeMap::new();
        for (key, count) in &self.counts {
            let fold_key = (key.0.clone(), key.1.clone(), key.2.to_lowercase());
            by_fold.entry(fold_key).or_default().push((key.clone(), *count));
        }

        let mut merged = BTreeMap::new();
        for (_, mut variants) in by_fold {
            if variants.len() == 1 {
                let (key, count) = variants.remove(0);
                merged.insert(key, count);
                continue;
            }
            variants.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
            let total: usize = variants.iter().map(|(_, count)| *count).sum();
            let (dominant_key, dominant_count) = variants[0].clone();
            let mut collapsed = dominant_count;
            for (key, count) in &variants[1..] {
                let share = *count as f64 / total as f64;
                if share < threshold {
                    collapsed += count;
                } else {
                    merged.insert(key.clone(), *count);
                }
            }
            merged.insert(dominant_key, collapsed);
        }
        self.counts = merged;
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordFormAnyRecipe {
    pub(crate) counts: FormCounts,
}

impl WordFormAnyRecipe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_word(&mut self, token: &Token) {
        self.counts.add(token);
    }

    /// Picks the most frequent observed `(msd, lemma, text)` triple. Falls
    /// back to the lookup backend's most frequent form for the dominant
    /// lemma when nothing was observed at all, and to `(None, None)` if the
    /// backend has nothing either (spec §5 "total failure" case).
    pub fn render(&self, lookup: Option<&dyn LookupBackend>, fallback_lemma: Option<&str>) -> Rendered {
        if let Some((msd, _, text)) = self.counts.most_frequent() {
            return Rendered { text: Some(text.to_string()), msd: Some(msd.to_string()) };
        }
        if let (Some(backend), Some(lemma)) = (lookup, fallback_lemma) {
            if let Some(form) = backend.find_lemma(lemma).and_then(|forms| forms.into_iter().next()) {
                return Rendered { text: Some(form.text), msd: Some(form.msd) };
            }
        }
        Rendered::default()
    }
}

/// A component's chosen restriction on which msd positions matter when
/// reducing observed tags to a common tag (spec §5 `word-form-msd`).
#[derive(Debug, Clone, Default)]
pub struct MsdSelector {
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WordFormMsdRecipe {
    pub(crate) counts: FormCounts,
    selector: MsdSelector,
}

impl WordFormMsdRecipe {
    pub fn new(selector: MsdSelector) -> Self {
        Self { counts: FormCounts::default(), selector }
    }

    pub fn add_word(&mut self, token: &Token) {
        self.counts.add(token);
    }

    /// Reduces all observed tags to their values on the selector's feature
    /// set, then groups by that common tag before picking the most frequent
    /// group (`_common_xpos`/`_common_udpos` in the original).
    pub fn render(&self, lookup: Option<&dyn LookupBackend>, fallback_lemma: Option<&str>) -> Rendered {
        if self.counts.is_empty() {
            return word_form_any_fallback(lookup, fallback_lemma);
        }
        let mut grouped: BTreeMap<String, (usize, String, String)> = BTreeMap::new();
        for (msd, lemma, text, count) in self.counts.matching(|_| true) {
            let key = common_tag(msd, &self.selector.features);
            let entry = grouped.entry(key).or_insert((0, lemma.to_string(), text.to_string()));
            entry.0 += count;
        }
        match grouped.into_iter().max_by_key(|(_, (count, _, _))| *count) {
            Some((common, (_, lemma, text))) => Rendered { text: Some(text), msd: Some(common) },
            None => word_form_any_fallback(lookup, fallback_lemma),
        }
    }
}

fn word_form_any_fallback(lookup: Option<&dyn LookupBackend>, fallback_lemma: Option<&str>) -> Rendered {
    if let (Some(backend), Some(lemma)) = (lookup, fallback_lemma) {
        if let Some(form) = backend.find_lemma(lemma).and_then(|forms| forms.into_iter().next()) {
            return Rendered { text: Some(form.text), msd: Some(form.msd) };
        }
    }
    Rendered::default()
}

/// Reduces a compact tag to just the values at `features`, decoding it and
/// re-reading the named feature values back out in a stable order. Tags
/// that fail to decode reduce to themselves unchanged.
fn common_tag(msd: &str, features: &[String]) -> String {
    let Ok(props) = msd_to_properties(msd) else {
        return msd.to_string();
    };
    features
        .iter()
        .map(|f| props.get(f).cloned().unwrap_or_else(|| "-".to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// `word-form-agreement`: like `word-form-msd`, but the observed form must
/// also agree with the rendered form of a named head component on the
/// shared [`AGREEMENT_FEATURES`] (spec §5 agreement protocol).
#[derive(Debug, Clone)]
pub struct WordFormAgreementRecipe {
    pub(crate) counts: FormCounts,
    selector: MsdSelector,
    pub head_component_id: String,
}

impl WordFormAgreementRecipe {
    pub fn new(head_component_id: impl Into<String>, selector: MsdSelector) -> Self {
        Self {
            counts: FormCounts::default(),
            selector,
            head_component_id: head_component_id.into(),
        }
    }

    pub fn add_word(&mut self, token: &Token) {
        self.counts.add(token);
    }

    /// `head_msd` is the already-rendered tag of this recipe's agreement
    /// head; observations are filtered to those sharing its value on every
    /// feature present in both tags before the usual common-tag reduction.
    pub fn render(&self, head_msd: Option<&str>, lookup: Option<&dyn LookupBackend>, fallback_lemma: Option<&str>) -> Rendered {
        let Some(head_msd) = head_msd else {
            return word_form_any_fallback(lookup, fallback_lemma);
        };
        let Ok(head_props) = msd_to_properties(head_msd) else {
            return word_form_any_fallback(lookup, fallback_lemma);
        };

        let mut grouped: BTreeMap<String, (usize, String, String)> = BTreeMap::new();
        for (msd, lemma, text, count) in self.counts.matching(|msd| agrees(msd, &head_props)) {
            let key = common_tag(msd, &self.selector.features);
            let entry = grouped.entry(key).or_insert((0, lemma.to_string(), text.to_string()));
            entry.0 += count;
        }

        match grouped.into_iter().max_by_key(|(_, (count, _, _))| *count) {
            Some((common, (_, lemma, text))) => Rendered { text: Some(text), msd: Some(common) },
            None => {
                if let (Some(backend), Some(lemma)) = (lookup, fallback_lemma) {
                    if let Some(form) = backend.find_form(lemma, head_msd) {
                        return Rendered { text: Some(form.text), msd: Some(form.msd) };
                    }
                }
                Rendered::default()
            }
        }
    }
}

fn agrees(candidate_msd: &str, head_props: &BTreeMap<String, String>) -> bool {
    let Ok(candidate_props) = msd_to_properties(candidate_msd) else {
        return false;
    };
    AGREEMENT_FEATURES.iter().all(|feature| {
        match (candidate_props.get(*feature), head_props.get(*feature)) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncoll_core::Tag;

    fn tok(lemma: &str, text: &str, tag: &str) -> Token {
        Token::new(lemma, text, "s1", "1", 1, false, Tag::Compact(tag.to_string()))
    }

    #[test]
    fn lemma_recipe_keeps_first_observation() {
        let mut r = LemmaRecipe::new();
        r.add_word(&tok("pes", "psa", "Ncmsg"));
        r.add_word(&tok("pes", "psu", "Ncmsd"));
        let rendered = r.render(None);
        assert_eq!(rendered.text.as_deref(), Some("pes"));
        assert_eq!(rendered.msd.as_deref(), Some("Ncmsg"));
    }

    #[test]
    fn word_form_all_joins_lowercased_forms_and_tags() {
        let mut r = WordFormAllRecipe::new();
        r.add_word(&tok("pes", "Psa", "Ncmsg"));
        r.add_word(&tok("pes", "psu", "Ncmsd"));
        r.add_word(&tok("pes", "psu", "Ncmsd"));
        let rendered = r.render();
        assert_eq!(rendered.text.as_deref(), Some("psa/psu"));
        assert_eq!(rendered.msd.as_deref(), Some("Ncmsd/Ncmsg"));
    }

    #[test]
    fn word_form_any_picks_most_frequent_triple() {
        let mut r = WordFormAnyRecipe::new();
        r.add_word(&tok("pes", "psa", "Ncmsg"));
        r.add_word(&tok("pes", "psa", "Ncmsg"));
        r.add_word(&tok("pes", "psu", "Ncmsd"));
        let rendered = r.render(None, Some("pes"));
        assert_eq!(rendered.text.as_deref(), Some("psa"));
    }

    #[test]
    fn word_form_any_renders_none_none_on_total_failure() {
        let r = WordFormAnyRecipe::new();
        let rendered = r.render(None, None);
        assert!(rendered.text.is_none() && rendered.msd.is_none());
    }

    #[test]
    fn agreement_recipe_filters_by_shared_features() {
        let mut r = WordFormAgreementRecipe::new("c1", MsdSelector { features: vec!["gender".into(), "number".into(), "case".into()] });
        r.add_word(&tok("lep", "lepega", "Agpmsg"));
        r.add_word(&tok("lep", "lepo", "Agpfsn"));
        let rendered = r.render(Some("Ncmsg"), None, None);
        assert_eq!(rendered.text.as_deref(), Some("lepega"));
    }

    #[test]
    fn collapse_casing_folds_rare_variant_into_dominant() {
        let mut counts = FormCounts::default();
        for _ in 0..9 {
            counts.add(&tok("pes", "Pes", "Ncmsn"));
        }
        counts.add(&tok("pes", "pes", "Ncmsn"));
        counts.collapse_casing(0.2);
        assert_eq!(counts.most_frequent(), Some(("Ncmsn", "pes", "Pes")));
        assert_eq!(counts.matching(|_| true).count(), 1);
    }

    #[test]
    fn collapse_casing_keeps_frequent_variant_above_threshold() {
        let mut counts = FormCounts::default();
        for _ in 0..6 {
            counts.add(&tok("pes", "Pes", "Ncmsn"));
        }
        for _ in 0..4 {
            counts.add(&tok("pes", "pes", "Ncmsn"));
        }
        counts.collapse_casing(0.2);
        assert_eq!(counts.matching(|_| true).count(), 2);
    }

    #[test]
    fn msd_selector_groups_by_common_tag() {
        let mut r = WordFormMsdRecipe::new(MsdSelector { features: vec!["case".into()] });
        r.add_word(&tok("pes", "psa", "Ncmsg"));
        r.add_word(&tok("pes", "psov", "Ncmpg"));
        let rendered = r.render(None, None);
        assert_eq!(rendered.msd.as_deref(), Some("genitive"));
    }
}
