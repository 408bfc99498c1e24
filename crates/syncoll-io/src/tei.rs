//! TEI-XML corpus reader (spec §6 "TEI-XML contract"). Supports both link
//! forms a corpus may use: modern `<linkGrp>`/`<link>` dependency edges
//! external to the `<w>` elements, and the legacy inline `afun`/`from`
//! attributes directly on a `<w>`. Namespace prefixes on element and
//! attribute names (e.g. `xml:id`) are stripped rather than resolved, in
//! keeping with this reader's narrow, single-schema purpose.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use syncoll_core::{translate_sl_to_en, Sentence, SyncollError, SyncollResult, Tag, Token};

fn local_name(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    s.rsplit(':').next().unwrap_or(&s).to_string()
}

fn attrs_of(e: &BytesStart) -> SyncollResult<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| SyncollError::input_schema("tei", format!("bad attribute: {err}")))?;
        let key = local_name(attr.key.as_ref());
        let value = attr
            .unescape_value()
            .map_err(|err| SyncollError::input_schema("tei", format!("bad attribute value: {err}")))?
            .to_string();
        out.insert(key, value);
    }
    Ok(out)
}

struct PendingWord {
    id: String,
    text: String,
    lemma: String,
    tag: Tag,
    glue: bool,
    legacy_parent: Option<String>,
    legacy_deprel: Option<String>,
}

/// Parses every `<s>` sentence in a TEI-XML document. When `msd_translate`
/// is set, each compact (`ana`) tag is translated from the Slovenian-
/// alphabet form the corpus carries into the English-alphabet form
/// restriction matching expects (`jos_msd_lang != "en"`,
/// `original_source/cordex/words/word.py`'s `do_msd_translate`); featural
/// (`msd`) tags are already keyed by English feature/value names and are
/// never translated.
pub fn parse_str(xml: &str, featural: bool) -> SyncollResult<Vec<Sentence>> {
    parse_str_with_options(xml, featural, false)
}

/// As [`parse_str`], with explicit control over compact-tag translation.
pub fn parse_str_with_options(xml: &str, featural: bool, msd_translate: bool) -> SyncollResult<Vec<Sentence>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut sentences = Vec::new();

    let mut in_sentence = false;
    let mut sentence_id = String::new();
    let mut words: Vec<PendingWord> = Vec::new();
    let mut links: Vec<(String, String, String)> = Vec::new(); // (deprel, parent_id, child_id)

    let mut current_word: Option<(String, Option<String>, Option<Tag>, bool, Option<String>, Option<String>)> = None;
    let mut current_text = String::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| SyncollError::input_schema("tei", format!("parse error: {e}")))? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let name = local_name(e.name().as_ref());
                let attrs = attrs_of(&e)?;
                match name.as_str() {
                    "s" => {
                        in_sentence = true;
                        sentence_id = attrs.get("id").cloned().unwrap_or_else(|| format!("s{}", sentences.len() + 1));
                        words.clear();
                        links.clear();
                    }
                    "w" if in_sentence => {
                        let id = attrs.get("id").cloned().unwrap_or_default();
                        let lemma = attrs.get("lemma").cloned().unwrap_or_default();
                        let glue = attrs.get("join").map(String::as_str) == Some("right");
                        let tag = if featural {
                            attrs.get("msd").map(|msd| Tag::Featural(parse_msd_attr(msd)))
                        } else {
                            attrs.get("ana").map(|ana| {
                                let code = strip_ns_code(ana);
                                if msd_translate {
                                    match translate_sl_to_en(&code) {
                                        Ok(translated) => Tag::Compact(translated),
                                        Err(err) => {
                                            tracing::warn!(tag = %code, error = %err, "failed to translate compact tag, leaving untranslated");
                                            Tag::Compact(code)
                                        }
                                    }
                                } else {
                                    Tag::Compact(code)
                                }
                            })
                        };
                        current_word = Some((id, Some(lemma), tag, glue, attrs.get("afun").cloned(), attrs.get("from").cloned()));
                        current_text.clear();
                    }
                    "link" => {
                        let ana = attrs.get("ana").cloned().unwrap_or_default();
                        let deprel = ana.trim_start_matches('#').to_string();
                        let target = attrs.get("target").cloned().unwrap_or_default();
                        let ids: Vec<&str> = target.split_whitespace().map(|s| s.trim_start_matches('#')).collect();
                        if ids.len() == 2 {
                            links.push((deprel, ids[0].to_string(), ids[1].to_string()));
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if current_word.is_some() {
                    current_text.push_str(&t.unescape().unwrap_or_default());
                }
            }
            Event::End(e) => {
                let name = local_name(e.name().as_ref());
                match name.as_str() {
                    "w" => {
                        if let Some((id, lemma, tag, glue, afun, from)) = current_word.take() {
                            words.push(PendingWord {
                                id,
                                text: current_text.clone(),
                                lemma: lemma.unwrap_or_default(),
                                tag: tag.unwrap_or_else(|| {
                                    if featural {
                                        Tag::Featural(Default::default())
                                    } else {
                                        Tag::Compact(String::new())
                                    }
                                }),
                                glue,
                                legacy_parent: from,
                                legacy_deprel: afun,
                            });
                            current_text.clear();
                        }
                    }
                    "s" => {
                        if in_sentence {
                            match build_sentence(&sentence_id, &words, &links, featural) {
                                Ok(sentence) => sentences.push(sentence),
                                Err(err) => tracing::warn!(sentence = %sentence_id, error = %err, "skipping malformed sentence"),
                            }
                        }
                        in_sentence = false;
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(sentences)
}

fn strip_ns_code(ana: &str) -> String {
    ana.rsplit(':').next().unwrap_or(ana).trim_start_matches('#').to_string()
}

fn parse_msd_attr(msd: &str) -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    for pair in msd.split('|') {
        if let Some((k, v)) = pair.split_once('=') {
            map.insert(k.to_string(), v.to_string());
        }
    }
    map
}

fn build_sentence(sentence_id: &str, words: &[PendingWord], links: &[(String, String, String)], featural: bool) -> SyncollResult<Sentence> {
    if words.is_empty() {
        return Err(SyncollError::input_schema("tei", "sentence has no <w> elements"));
    }

    let mut id_to_idx: BTreeMap<&str, usize> = BTreeMap::new();
    let mut arena = vec![Token::fake_root(sentence_id, featural)];

    for (i, w) in words.iter().enumerate() {
        let int_id = (i + 1) as i64;
        let tok = Token::new(w.lemma.clone(), w.text.clone(), sentence_id, w.id.clone(), int_id, w.glue, w.tag.clone());
        arena.push(tok);
        id_to_idx.insert(&w.id, i + 1);
    }

    for i in 1..arena.len() {
        arena[i].previous_glue = arena[i - 1].glue;
    }

    for w in words {
        if let (Some(parent_id), Some(deprel)) = (&w.legacy_parent, &w.legacy_deprel) {
            let child_idx = *id_to_idx.get(w.id.as_str()).expect("word just inserted");
            let parent_idx = id_to_idx.get(parent_id.as_str()).copied().unwrap_or(0);
            arena[parent_idx].add_link(deprel.clone(), child_idx);
        }
    }

    for (deprel, parent_id, child_id) in links {
        let parent_idx = id_to_idx.get(parent_id.as_str()).copied().unwrap_or(0);
        let child_idx = match id_to_idx.get(child_id.as_str()) {
            Some(idx) => *idx,
            None => {
                return Err(SyncollError::input_schema("tei", format!("link target '{child_id}' has no matching <w>")));
            }
        };
        arena[parent_idx].add_link(deprel.clone(), child_idx);
    }

    Ok(Sentence { tokens: arena, root: 0 })
}
