//! Tag-model layer: conversion between the compact ("xpos") tag string and
//! a canonical property map, content-word (`ppb`) scoring, and a
//! single-direction translation between two language variants of the
//! compact tag (spec §2 "Tag-model layer", §9 "Dynamic feature maps").
//!
//! The category table is precomputed once behind a `OnceLock` into a
//! category-char -> (feature names, per-position code table) index so that
//! decoding a tag on the matcher's hot path never walks a specification.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{SyncollError, SyncollResult};

/// A single morphological feature slot within a category: its canonical
/// name plus the English and Slovenian one-character code alphabets.
pub struct FeatureDef {
    pub name: &'static str,
    /// (english_code, slovenian_code, value_name)
    pub values: &'static [(char, char, &'static str)],
}

pub struct CategoryDef {
    pub name: &'static str,
    pub code_en: char,
    pub code_sl: char,
    pub features: &'static [FeatureDef],
}

const NOUN: CategoryDef = CategoryDef {
    name: "noun",
    code_en: 'N',
    code_sl: 'S',
    features: &[
        FeatureDef {
            name: "type",
            values: &[('c', 'o', "common"), ('p', 'l', "proper")],
        },
        FeatureDef {
            name: "gender",
            values: &[('m', 'm', "masculine"), ('f', 'z', "feminine"), ('n', 's', "neuter")],
        },
        FeatureDef {
            name: "number",
            values: &[('s', 'e', "singular"), ('d', 'd', "dual"), ('p', 'm', "plural")],
        },
        FeatureDef {
            name: "case",
            values: &[
                ('n', 'i', "nominative"),
                ('g', 'r', "genitive"),
                ('d', 'd', "dative"),
                ('a', 't', "accusative"),
                ('l', 'm', "locative"),
                ('i', 'o', "instrumental"),
            ],
        },
        FeatureDef {
            name: "animate",
            values: &[('y', 'd', "yes"), ('n', 'n', "no")],
        },
    ],
};

const VERB: CategoryDef = CategoryDef {
    name: "verb",
    code_en: 'V',
    code_sl: 'G',
    features: &[
        FeatureDef {
            name: "type",
            values: &[('m', 'g', "main"), ('a', 'p', "auxiliary"), ('o', 'n', "modal")],
        },
        FeatureDef {
            name: "aspect",
            values: &[('e', 'd', "perfective"), ('p', 'n', "progressive"), ('b', 'o', "biaspectual")],
        },
        FeatureDef {
            name: "vform",
            values: &[
                ('n', 'n', "infinitive"),
                ('u', 'u', "supine"),
                ('p', 'd', "participle"),
                ('f', 'p', "future"),
                ('s', 's', "present"),
                ('m', 'v', "imperative"),
                ('c', 'k', "conditional"),
            ],
        },
        FeatureDef {
            name: "person",
            values: &[('1', '1', "first"), ('2', '2', "second"), ('3', '3', "third")],
        },
        FeatureDef {
            name: "number",
            values: &[('s', 'e', "singular"), ('d', 'd', "dual"), ('p', 'm', "plural")],
        },
        FeatureDef {
            name: "gender",
            values: &[('m', 'm', "masculine"), ('f', 'z', "feminine"), ('n', 's', "neuter")],
        },
        FeatureDef {
            name: "negative",
            values: &[('y', 'd', "yes"), ('n', 'n', "no")],
        },
    ],
};

const ADJECTIVE: CategoryDef = CategoryDef {
    name: "adjective",
    code_en: 'A',
    code_sl: 'P',
    features: &[
        FeatureDef {
            name: "type",
            values: &[('g', 's', "general"), ('p', 'd', "possessive")],
        },
        FeatureDef {
            name: "degree",
            values: &[('p', 'o', "positive"), ('c', 'p', "comparative"), ('s', 'n', "superlative")],
        },
        FeatureDef {
            name: "gender",
            values: &[('m', 'm', "masculine"), ('f', 'z', "feminine"), ('n', 's', "neuter")],
        },
        FeatureDef {
            name: "number",
            values: &[('s', 'e', "singular"), ('d', 'd', "dual"), ('p', 'm', "plural")],
        },
        FeatureDef {
            name: "case",
            values: &[
                ('n', 'i', "nominative"),
                ('g', 'r', "genitive"),
                ('d', 'd', "dative"),
                ('a', 't', "accusative"),
                ('l', 'm', "locative"),
                ('i', 'o', "instrumental"),
            ],
        },
        FeatureDef {
            name: "definiteness",
            values: &[('y', 'd', "yes"), ('n', 'n', "no")],
        },
    ],
};

const ADVERB: CategoryDef = CategoryDef {
    name: "adverb",
    code_en: 'R',
    code_sl: 'P',
    features: &[
        FeatureDef {
            name: "type",
            values: &[('g', 's', "general"), ('p', 'd', "participle")],
        },
        FeatureDef {
            name: "degree",
            values: &[('p', 'o', "positive"), ('c', 'p', "comparative"), ('s', 'n', "superlative")],
        },
    ],
};

const PRONOUN: CategoryDef = CategoryDef {
    name: "pronoun",
    code_en: 'P',
    code_sl: 'Z',
    features: &[
        FeatureDef {
            name: "type",
            values: &[
                ('p', 'o', "personal"),
                ('d', 'k', "demonstrative"),
                ('r', 'v', "relative"),
                ('i', 'n', "indefinite"),
                ('x', 'z', "negative"),
            ],
        },
        FeatureDef {
            name: "person",
            values: &[('1', '1', "first"), ('2', '2', "second"), ('3', '3', "third")],
        },
        FeatureDef {
            name: "gender",
            values: &[('m', 'm', "masculine"), ('f', 'z', "feminine"), ('n', 's', "neuter")],
        },
        FeatureDef {
            name: "number",
            values: &[('s', 'e', "singular"), ('d', 'd', "dual"), ('p', 'm', "plural")],
        },
        FeatureDef {
            name: "case",
            values: &[
                ('n', 'i', "nominative"),
                ('g', 'r', "genitive"),
                ('d', 'd', "dative"),
                ('a', 't', "accusative"),
                ('l', 'm', "locative"),
                ('i', 'o', "instrumental"),
            ],
        },
    ],
};

const NUMERAL: CategoryDef = CategoryDef {
    name: "numeral",
    code_en: 'M',
    code_sl: 'K',
    features: &[
        FeatureDef {
            name: "gender",
            values: &[('m', 'm', "masculine"), ('f', 'z', "feminine"), ('n', 's', "neuter")],
        },
        FeatureDef {
            name: "number",
            values: &[('s', 'e', "singular"), ('d', 'd', "dual"), ('p', 'm', "plural")],
        },
        FeatureDef {
            name: "case",
            values: &[
                ('n', 'i', "nominative"),
                ('g', 'r', "genitive"),
                ('d', 'd', "dative"),
                ('a', 't', "accusative"),
                ('l', 'm', "locative"),
                ('i', 'o', "instrumental"),
            ],
        },
    ],
};

const ADPOSITION: CategoryDef = CategoryDef {
    name: "adposition",
    code_en: 'S',
    code_sl: 'D',
    features: &[FeatureDef {
        name: "case",
        values: &[
            ('g', 'r', "genitive"),
            ('d', 'd', "dative"),
            ('a', 't', "accusative"),
            ('l', 'm', "locative"),
            ('i', 'o', "instrumental"),
        ],
    }],
};

const CONJUNCTION: CategoryDef = CategoryDef {
    name: "conjunction",
    code_en: 'J',
    code_sl: 'V',
    features: &[FeatureDef {
        name: "type",
        values: &[('c', 'p', "coordinating"), ('s', 'd', "subordinating")],
    }],
};

const PARTICLE: CategoryDef = CategoryDef {
    name: "particle",
    code_en: 'Q',
    code_sl: 'L',
    features: &[],
};

const INTERJECTION: CategoryDef = CategoryDef {
    name: "interjection",
    code_en: 'I',
    code_sl: 'M',
    features: &[],
};

const ABBREVIATION: CategoryDef = CategoryDef {
    name: "abbreviation",
    code_en: 'Y',
    code_sl: 'O',
    features: &[],
};

const RESIDUAL: CategoryDef = CategoryDef {
    name: "residual",
    code_en: 'X',
    code_sl: 'N',
    features: &[],
};

const PUNCTUATION: CategoryDef = CategoryDef {
    name: "punctuation",
    code_en: 'Z',
    code_sl: 'Z',
    features: &[],
};

const CATEGORIES: &[CategoryDef] = &[
    NOUN, VERB, ADJECTIVE, ADVERB, PRONOUN, NUMERAL, ADPOSITION, CONJUNCTION, PARTICLE,
    INTERJECTION, ABBREVIATION, RESIDUAL, PUNCTUATION,
];

struct CategoryIndex {
    by_en: BTreeMap<char, &'static CategoryDef>,
    by_sl: BTreeMap<char, &'static CategoryDef>,
}

static CATEGORY_INDEX: OnceLock<CategoryIndex> = OnceLock::new();

fn category_index() -> &'static CategoryIndex {
    CATEGORY_INDEX.get_or_init(|| {
        let mut by_en = BTreeMap::new();
        let mut by_sl = BTreeMap::new();
        for cat in CATEGORIES {
            by_en.insert(cat.code_en, cat);
            by_sl.insert(cat.code_sl, cat);
        }
        CategoryIndex { by_en, by_sl }
    })
}

/// A decoded compact tag: category name plus feature-name -> value-name map.
pub type Properties = BTreeMap<String, String>;

/// Decodes an English-alphabet compact tag into a property map. The `POS`
/// (category) entry is always present under the key `pos`. Unknown category
/// letters or out-of-alphabet feature codes are reported through
/// `SyncollError::TagDecode`, which callers treat as a restriction mismatch
/// rather than a fatal error (spec §7).
pub fn msd_to_properties(tag: &str) -> SyncollResult<Properties> {
    decode_with(tag, true)
}

fn decode_with(tag: &str, english: bool) -> SyncollResult<Properties> {
    let mut chars = tag.chars();
    let cat_char = chars
        .next()
        .ok_or_else(|| SyncollError::tag_decode(tag, "empty tag"))?;

    let index = category_index();
    let table = if english { &index.by_en } else { &index.by_sl };
    let cat = table
        .get(&cat_char)
        .ok_or_else(|| SyncollError::tag_decode(tag, format!("unknown category '{cat_char}'")))?;

    let mut props = Properties::new();
    props.insert("pos".to_string(), cat.name.to_string());

    for (i, code) in chars.enumerate() {
        if code == '-' {
            continue;
        }
        let Some(feature) = cat.features.get(i) else {
            continue;
        };
        let found = feature.values.iter().find(|(en, sl, _)| {
            if english {
                *en == code
            } else {
                *sl == code
            }
        });
        match found {
            Some((_, _, value_name)) => {
                props.insert(feature.name.to_string(), value_name.to_string());
            }
            None => {
                return Err(SyncollError::tag_decode(
                    tag,
                    format!("code '{code}' not in alphabet for feature '{}'", feature.name),
                ));
            }
        }
    }

    Ok(props)
}

fn encode_with(cat: &CategoryDef, props: &Properties, english: bool) -> String {
    let mut out = String::new();
    out.push(if english { cat.code_en } else { cat.code_sl });
    for feature in cat.features {
        match props.get(feature.name) {
            Some(value_name) => {
                let code = feature
                    .values
                    .iter()
                    .find(|(_, _, v)| v == value_name)
                    .map(|(en, sl, _)| if english { *en } else { *sl });
                out.push(code.unwrap_or('-'));
            }
            None => out.push('-'),
        }
    }
    out
}

/// Translates a Slovenian-alphabet compact tag into the English alphabet
/// used internally for restriction matching. This is the single-direction
/// translation named in spec §2; there is deliberately no inverse.
pub fn translate_sl_to_en(tag: &str) -> SyncollResult<String> {
    let props = decode_with(tag, false)?;
    let cat_char = tag
        .chars()
        .next()
        .ok_or_else(|| SyncollError::tag_decode(tag, "empty tag"))?;
    let cat = category_index()
        .by_sl
        .get(&cat_char)
        .ok_or_else(|| SyncollError::tag_decode(tag, format!("unknown category '{cat_char}'")))?;
    Ok(encode_with(cat, &props, true))
}

/// Content-word priority (`ppb`, spec §4.1/§9), for the compact flavour.
/// 0 is most content-bearing, 4 least. Requires a `POS` entry; the verb
/// branch additionally looks at `type` when present.
pub fn determine_ppb(props: &Properties) -> i32 {
    match props.get("pos").map(String::as_str) {
        Some("adjective") | Some("noun") | Some("adverb") => 0,
        Some("verb") => {
            if props.len() == 1 {
                return 2;
            }
            match props.get("type").map(String::as_str) {
                Some("auxiliary") => 3,
                Some("main") => 1,
                _ => 2,
            }
        }
        _ => 4,
    }
}

/// Content-word priority for the featural (UD) flavour: driven only by the
/// `POS` value (spec §4.1).
pub fn determine_ppb_ud(pos: &str) -> i32 {
    match pos {
        "ADJ" | "NOUN" | "ADV" => 0,
        "AUX" => 3,
        "VERB" => 2,
        _ => 4,
    }
}

/// Lexeme-level vs form-level feature classification (spec GLOSSARY):
/// lexeme-level features are invariant across all forms of a lemma.
pub fn is_lexeme_level_feature(name: &str) -> bool {
    matches!(name, "pos" | "type" | "aspect" | "gender" | "animate")
}

/// English JOS deprel label -> Slovenian-depparse equivalent, for structure
/// files written against the English label set run over a Slovenian-labelled
/// corpus (spec §9 "`jos_depparse_lang` translation"). A small embedded
/// table covering the deprels this workspace's structure fixtures and worked
/// examples use, not a transcription of the full external `syn_map` table
/// (an external resource per spec §1, not shipped); see DESIGN.md.
const DEPREL_EN_TO_SL: &[(&str, &str)] = &[
    ("Sb", "Osb"),
    ("Obj", "Opr"),
    ("Atr", "Pril"),
    ("Adv", "Prisl"),
    ("Pred", "Povedek"),
    ("Aux", "Pomoz"),
    ("Coord", "Koord"),
    ("Conj", "Vez"),
];

/// Translates a deprel label between the English and Slovenian JOS
/// depparse label sets. `to_sl` selects direction; an unrecognized label is
/// a hard error rather than passed through, matching `translate_jos_depparse`.
pub fn translate_deprel(label: &str, to_sl: bool) -> SyncollResult<String> {
    if !to_sl {
        return Ok(label.to_string());
    }
    DEPREL_EN_TO_SL
        .iter()
        .find(|(en, _)| *en == label)
        .map(|(_, sl)| sl.to_string())
        .ok_or_else(|| {
            SyncollError::tag_decode(
                label,
                "deprel not recognized as a valid English JOS depparse label; set jos_depparse_lang to \"sl\" if the corpus already uses Slovenian labels",
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_noun_tag() {
        let props = msd_to_properties("Ncfsg").unwrap();
        assert_eq!(props.get("pos").unwrap(), "noun");
        assert_eq!(props.get("type").unwrap(), "common");
        assert_eq!(props.get("gender").unwrap(), "feminine");
        assert_eq!(props.get("number").unwrap(), "singular");
        assert_eq!(props.get("case").unwrap(), "genitive");
    }

    #[test]
    fn dash_means_unset() {
        let props = msd_to_properties("Vm----").unwrap();
        assert_eq!(props.get("pos").unwrap(), "verb");
        assert_eq!(props.get("type").unwrap(), "main");
        assert!(!props.contains_key("aspect"));
    }

    #[test]
    fn unknown_category_is_tag_decode_error() {
        let err = msd_to_properties("Wxyz").unwrap_err();
        assert!(matches!(err, SyncollError::TagDecode { .. }));
    }

    #[test]
    fn ppb_scores_content_words_lowest() {
        let noun = msd_to_properties("Ncfsg").unwrap();
        assert_eq!(determine_ppb(&noun), 0);

        let aux = msd_to_properties("Va-1s").unwrap();
        assert_eq!(determine_ppb(&aux), 3);

        let main_verb = msd_to_properties("Vm-3s").unwrap();
        assert_eq!(determine_ppb(&main_verb), 1);

        let mut pos_only = Properties::new();
        pos_only.insert("pos".into(), "verb".into());
        assert_eq!(determine_ppb(&pos_only), 2);
    }

    #[test]
    fn ppb_ud_scores_match_spec_table() {
        assert_eq!(determine_ppb_ud("NOUN"), 0);
        assert_eq!(determine_ppb_ud("AUX"), 3);
        assert_eq!(determine_ppb_ud("VERB"), 2);
        assert_eq!(determine_ppb_ud("SCONJ"), 4);
    }

    #[test]
    fn sl_to_en_round_trips_noun_category() {
        let en = translate_sl_to_en("Somei").unwrap();
        let props = msd_to_properties(&en).unwrap();
        assert_eq!(props.get("pos").unwrap(), "noun");
        assert_eq!(props.get("gender").unwrap(), "masculine");
        assert_eq!(props.get("number").unwrap(), "singular");
        assert_eq!(props.get("case").unwrap(), "nominative");
    }

    #[test]
    fn translate_deprel_passes_through_when_not_translating() {
        assert_eq!(translate_deprel("Sb", false).unwrap(), "Sb");
        assert_eq!(translate_deprel("NotARealDeprel", false).unwrap(), "NotARealDeprel");
    }

    #[test]
    fn translate_deprel_maps_known_english_label_to_slovenian() {
        assert_eq!(translate_deprel("Sb", true).unwrap(), "Osb");
        assert_eq!(translate_deprel("Adv", true).unwrap(), "Prisl");
    }

    #[test]
    fn translate_deprel_rejects_unrecognized_label() {
        assert!(translate_deprel("NotARealDeprel", true).is_err());
    }
}
