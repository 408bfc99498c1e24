//! Wires a structure's [`RepresentationSpec`] list into runnable recipes,
//! feeds matched tokens through them, and renders every component in the
//! two passes the agreement protocol requires (spec §5 "Representation
//! engine" / `representation_assigner.py`).

use std::collections::BTreeMap;

use syncoll_core::Token;
use syncoll_structures::RepresentationSpec;

use crate::lookup::LookupBackend;
use crate::recipe::{
    LemmaRecipe, LexisRecipe, MsdSelector, Rendered, WordFormAgreementRecipe, WordFormAllRecipe, WordFormAnyRecipe, WordFormMsdRecipe,
};

/// One configured recipe instance. All variants share `add_word`; only
/// `WordFormAgreement` needs its head's rendered tag to render.
#[derive(Debug, Clone)]
pub enum Recipe {
    Lemma(LemmaRecipe),
    Lexis(LexisRecipe),
    WordFormAll(WordFormAllRecipe),
    WordFormAny(WordFormAnyRecipe),
    WordFormMsd(WordFormMsdRecipe),
    WordFormAgreement(WordFormAgreementRecipe),
}

impl Recipe {
    pub fn add_word(&mut self, token: &Token) {
        match self {
            Recipe::Lemma(r) => r.add_word(token),
            Recipe::Lexis(r) => r.add_word(token),
            Recipe::WordFormAll(r) => r.add_word(token),
            Recipe::WordFormAny(r) => r.add_word(token),
            Recipe::WordFormMsd(r) => r.add_word(token),
            Recipe::WordFormAgreement(r) => r.add_word(token),
        }
    }

    fn is_agreement(&self) -> bool {
        matches!(self, Recipe::WordFormAgreement(_))
    }

    /// Applies the lowercase-collapse threshold (spec §9) to whichever
    /// observed-form tally this recipe variant keeps; a no-op for the
    /// variants that don't vote over observed forms.
    pub fn collapse_casing(&mut self, threshold: f64) {
        match self {
            Recipe::WordFormAny(r) => r.counts.collapse_casing(threshold),
            Recipe::WordFormMsd(r) => r.counts.collapse_casing(threshold),
            Recipe::WordFormAgreement(r) => r.counts.collapse_casing(threshold),
            Recipe::Lemma(_) | Recipe::Lexis(_) | Recipe::WordFormAll(_) => {}
        }
    }

    fn agreement_head(&self) -> Option<&str> {
        match self {
            Recipe::WordFormAgreement(r) => Some(r.head_component_id.as_str()),
            _ => None,
        }
    }

    fn render(&self, head_msd: Option<&str>, lookup: Option<&dyn LookupBackend>, fallback_lemma: Option<&str>) -> Rendered {
        match self {
            Recipe::Lemma(r) => r.render(lookup),
            Recipe::Lexis(r) => r.render(),
            Recipe::WordFormAll(r) => r.render(),
            Recipe::WordFormAny(r) => r.render(lookup, fallback_lemma),
            Recipe::WordFormMsd(r) => r.render(lookup, fallback_lemma),
            Recipe::WordFormAgreement(r) => r.render(head_msd, lookup, fallback_lemma),
        }
    }

    /// Always `None`: a component bound into a stored collocation has at
    /// least one observed token already, since the collocation key is
    /// exactly the set of bound components. `Lemma` takes `lookup` directly
    /// in its own `render` instead of going through this hook.
    fn fallback_lemma(&self) -> Option<&str> {
        None
    }
}

fn selector_from_params(params: &BTreeMap<String, String>) -> MsdSelector {
    let features = params
        .get("features")
        .map(|s| s.split(',').map(|f| f.trim().to_string()).collect())
        .unwrap_or_default();
    MsdSelector { features }
}

/// Builds one [`Recipe`] per [`RepresentationSpec`], grouped by component id.
pub fn build_recipes(specs: &[RepresentationSpec]) -> BTreeMap<String, Vec<Recipe>> {
    let mut out: BTreeMap<String, Vec<Recipe>> = BTreeMap::new();
    for spec in specs {
        let recipe = match spec.rendition.as_str() {
            "lemma" => Recipe::Lemma(LemmaRecipe::new()),
            "lexis" => {
                let text = spec.params.get("text").cloned().unwrap_or_default();
                let tag = spec.params.get("tag").cloned().unwrap_or_else(|| "Q".to_string());
                Recipe::Lexis(LexisRecipe::new(text, tag))
            }
            "word_form" => match spec.selection.as_deref() {
                Some("all") => Recipe::WordFormAll(WordFormAllRecipe::new()),
                Some("msd") => Recipe::WordFormMsd(WordFormMsdRecipe::new(selector_from_params(&spec.params))),
                Some("agreement") => {
                    let head = spec.params.get("head").cloned().unwrap_or_default();
                    Recipe::WordFormAgreement(WordFormAgreementRecipe::new(head, selector_from_params(&spec.params)))
                }
                _ => Recipe::WordFormAny(WordFormAnyRecipe::new()),
            },
            _ => continue,
        };
        out.entry(spec.component_id.clone()).or_default().push(recipe);
    }
    out
}

/// Feeds every matched token into its component's recipes.
pub fn add_words(recipes: &mut BTreeMap<String, Vec<Recipe>>, component_tokens: &BTreeMap<String, &Token>) {
    for (component_id, token) in component_tokens {
        if let Some(list) = recipes.get_mut(component_id) {
            for recipe in list {
                recipe.add_word(token);
            }
        }
    }
}

/// Applies the lowercase-collapse threshold to every recipe before
/// rendering (spec §9). Called once per structure after all of its
/// collocations' matches have been fed through [`add_words`].
pub fn collapse_casing(recipes: &mut BTreeMap<String, Vec<Recipe>>, threshold: f64) {
    for list in recipes.values_mut() {
        for recipe in list {
            recipe.collapse_casing(threshold);
        }
    }
}

/// Renders every component's recipes, non-agreement recipes first so that
/// agreement recipes can consult their head's rendered tag. Multiple
/// recipes on one component join their text/tag output with a single
/// space; if any one recipe on a component yields `(None, None)` the whole
/// component renders as `(None, None)` rather than a partial join.
pub fn render_all(recipes: &BTreeMap<String, Vec<Recipe>>, lookup: Option<&dyn LookupBackend>) -> BTreeMap<String, Rendered> {
    let mut out: BTreeMap<String, Rendered> = BTreeMap::new();

    for (component_id, list) in recipes {
        if list.iter().any(Recipe::is_agreement) {
            continue;
        }
        out.insert(component_id.clone(), render_component(list, None, lookup));
    }

    for (component_id, list) in recipes {
        if !list.iter().any(Recipe::is_agreement) {
            continue;
        }
        let head_msd = list
            .iter()
            .find_map(Recipe::agreement_head)
            .and_then(|head_id| out.get(head_id))
            .and_then(|r| r.msd.as_deref());
        out.insert(component_id.clone(), render_component(list, head_msd, lookup));
    }

    out
}

fn render_component(list: &[Recipe], head_msd: Option<&str>, lookup: Option<&dyn LookupBackend>) -> Rendered {
    let mut texts = Vec::new();
    let mut msds = Vec::new();
    for recipe in list {
        let rendered = recipe.render(head_msd, lookup, recipe.fallback_lemma());
        match (rendered.text, rendered.msd) {
            (None, None) => return Rendered::default(),
            (text, msd) => {
                if let Some(t) = text {
                    texts.push(t);
                }
                if let Some(m) = msd {
                    msds.push(m);
                }
            }
        }
    }
    Rendered {
        text: if texts.is_empty() { None } else { Some(texts.join(" ")) },
        msd: if msds.is_empty() { None } else { Some(msds.join(" ")) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncoll_core::Tag;
    use syncoll_structures::RepresentationSpec;

    fn tok(lemma: &str, text: &str, tag: &str) -> Token {
        Token::new(lemma, text, "s1", "1", 1, false, Tag::Compact(tag.to_string()))
    }

    #[test]
    fn agreement_recipe_renders_after_its_head() {
        let specs = vec![
            RepresentationSpec {
                component_id: "head".to_string(),
                rendition: "lemma".to_string(),
                selection: None,
                params: BTreeMap::new(),
            },
            RepresentationSpec {
                component_id: "dep".to_string(),
                rendition: "word_form".to_string(),
                selection: Some("agreement".to_string()),
                params: BTreeMap::from([("head".to_string(), "head".to_string()), ("features".to_string(), "case".to_string())]),
            },
        ];
        let mut recipes = build_recipes(&specs);

        let head_tok = tok("pes", "pes", "Ncmsn");
        let dep_tok = tok("lep", "lepi", "Agpmsn");
        let mapping: BTreeMap<String, &Token> =
            BTreeMap::from([("head".to_string(), &head_tok), ("dep".to_string(), &dep_tok)]);
        add_words(&mut recipes, &mapping);

        let rendered = render_all(&recipes, None);
        assert_eq!(rendered.get("head").unwrap().text.as_deref(), Some("pes"));
        assert_eq!(rendered.get("dep").unwrap().text.as_deref(), Some("lepi"));
    }
}
