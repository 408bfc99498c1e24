//! Token and sentence model.
//!
//! An immutable token carries lemma, surface text, one of two tag flavours
//! (see [`crate::tagmodel`]), glue flags and a deprel -> children map. A
//! sentence is materialized as a flat arena of tokens reachable from a
//! synthetic root token whose children are the sentence roots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Either of the two annotation flavours a corpus may carry (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tag {
    /// Compact ("xpos") tag: a fixed-grammar positional string.
    Compact(String),
    /// Featural ("udpos") tag: feature-name -> value, always containing `POS`.
    Featural(HashMap<String, String>),
}

impl Tag {
    pub fn as_compact(&self) -> Option<&str> {
        match self {
            Tag::Compact(s) => Some(s),
            Tag::Featural(_) => None,
        }
    }

    pub fn as_featural(&self) -> Option<&HashMap<String, String>> {
        match self {
            Tag::Featural(m) => Some(m),
            Tag::Compact(_) => None,
        }
    }

    pub fn is_featural(&self) -> bool {
        matches!(self, Tag::Featural(_))
    }

    /// Renders a featural tag as `KEY=value|KEY=value`, matching how the
    /// original implementation stringifies udpos dictionaries for storage
    /// and for the `word-form-all` / `word-form-any` recipes.
    pub fn render(&self) -> String {
        match self {
            Tag::Compact(s) => s.clone(),
            Tag::Featural(map) => {
                let mut pairs: Vec<(&String, &String)> = map.iter().collect();
                pairs.sort_by(|a, b| a.0.cmp(b.0));
                pairs
                    .into_iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join("|")
            }
        }
    }
}

/// Splits a dotted id such as `doc1.3.t4` into `(sentence_id, word_id,
/// int_id)`. A leading non-digit character in the final component (e.g. a
/// multi-word-token suffix letter) is stripped before parsing the integer,
/// mirroring `prepare_ids` in the original implementation.
pub fn prepare_ids(wid: &str, is_fake: bool) -> (String, String, i64) {
    let parts: Vec<&str> = wid.split('.').collect();
    let word_id = parts.last().copied().unwrap_or(wid).to_string();
    let sentence_id = if is_fake {
        wid.to_string()
    } else {
        parts[..parts.len().saturating_sub(1)].join(".")
    };

    let mut last_num = word_id.as_str();
    if let Some(c) = last_num.chars().next() {
        if !c.is_ascii_digit() {
            last_num = &last_num[c.len_utf8()..];
        }
    }
    let int_id = last_num.parse::<i64>().unwrap_or(0);
    (sentence_id, word_id, int_id)
}

/// A single token in a sentence, or the synthetic root prepended to every
/// sentence so structures with a `modra`-rooted pattern can match against
/// the dependency-tree root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub lemma: String,
    pub text: String,
    pub sentence_id: String,
    pub word_id: String,
    pub int_id: i64,
    /// No space between this token and the following one.
    pub glue: bool,
    /// No space between the previous token and this one.
    pub previous_glue: bool,
    pub fake: bool,
    pub tag: Tag,
    /// deprel label -> ordered list of child token indices into the owning
    /// [`Sentence`]'s arena.
    pub links: HashMap<String, Vec<usize>>,
}

impl Token {
    pub fn new(
        lemma: impl Into<String>,
        text: impl Into<String>,
        sentence_id: impl Into<String>,
        word_id: impl Into<String>,
        int_id: i64,
        glue: bool,
        tag: Tag,
    ) -> Self {
        Self {
            lemma: lemma.into(),
            text: text.into(),
            sentence_id: sentence_id.into(),
            word_id: word_id.into(),
            int_id,
            glue,
            previous_glue: false,
            fake: false,
            tag,
            links: HashMap::new(),
        }
    }

    /// Builds the synthetic root token for a sentence (spec §3, `Token` /
    /// `fake`).
    pub fn fake_root(sentence_id: impl Into<String>, featural: bool) -> Self {
        let sentence_id = sentence_id.into();
        let (sid, wid, iid) = prepare_ids(&sentence_id, true);
        let tag = if featural {
            Tag::Featural(HashMap::new())
        } else {
            Tag::Compact(String::new())
        };
        let mut tok = Token::new("", "", sid, wid, iid, false, tag);
        tok.fake = true;
        tok
    }

    pub fn xpos(&self) -> Option<&str> {
        self.tag.as_compact()
    }

    pub fn udpos(&self) -> Option<&HashMap<String, String>> {
        self.tag.as_featural()
    }

    pub fn add_link(&mut self, deprel: impl Into<String>, child: usize) {
        self.links.entry(deprel.into()).or_default().push(child);
    }
}

/// A sentence: an arena of tokens plus the index of its synthetic root.
/// Links are indices into `tokens`, not owning pointers, so a malformed
/// annotation that introduces a cycle cannot cause memory-management
/// trouble (see DESIGN NOTES §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    pub tokens: Vec<Token>,
    pub root: usize,
}

impl Sentence {
    pub fn token(&self, idx: usize) -> &Token {
        &self.tokens[idx]
    }

    /// Resolves a (possibly pipe-joined) deprel label to the children of
    /// `token_idx` along that label, unioning the member labels and caching
    /// nothing here — callers that need caching (the matcher) own that.
    pub fn children_along(&self, token_idx: usize, deprel_label: &str) -> Vec<usize> {
        let token = &self.tokens[token_idx];
        if let Some(children) = token.links.get(deprel_label) {
            return children.clone();
        }
        if deprel_label.contains('|') {
            let mut out = Vec::new();
            for part in deprel_label.split('|') {
                if let Some(children) = token.links.get(part) {
                    out.extend(children.iter().copied());
                }
            }
            return out;
        }
        Vec::new()
    }
}
