//! Hand-rolled CoNLL-U reader (spec §6 "CoNLL-U contract"). Line-based,
//! in the manner of a treebank parser rather than a generic tabular reader:
//! sentences are blank-line-delimited blocks, comment lines starting with
//! `#` carry sentence metadata, and a synthetic root token is prepended so
//! every sentence is addressable the same way regardless of corpus format.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use syncoll_core::{Sentence, SyncollError, SyncollResult, Tag, Token};

/// Parses every sentence in a CoNLL-U file. `featural` selects whether the
/// FEATS/UPOS columns (true) or the XPOS column (false) become each
/// token's tag.
pub fn parse_file(path: &Path, featural: bool) -> SyncollResult<Vec<Sentence>> {
    let file = std::fs::File::open(path).map_err(|e| SyncollError::io(format!("opening {}", path.display()), e))?;
    let mut content = String::new();
    BufReader::new(file)
        .read_to_string(&mut content)
        .map_err(|e| SyncollError::io(format!("reading {}", path.display()), e))?;
    parse_str(&content, featural)
}

/// Parses CoNLL-U text already in memory (used by tests and by readers
/// that already hold the file contents).
pub fn parse_str(content: &str, featural: bool) -> SyncollResult<Vec<Sentence>> {
    let mut sentences = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut sentence_idx = 0;

    for line in content.lines() {
        if line.trim().is_empty() {
            if !block.is_empty() {
                sentence_idx += 1;
                match parse_block(&block, featural, sentence_idx) {
                    Ok(sentence) => sentences.push(sentence),
                    Err(e) => tracing::warn!(sentence = sentence_idx, error = %e, "skipping malformed sentence"),
                }
                block.clear();
            }
            continue;
        }
        block.push(line);
    }
    if !block.is_empty() {
        sentence_idx += 1;
        match parse_block(&block, featural, sentence_idx) {
            Ok(sentence) => sentences.push(sentence),
            Err(e) => tracing::warn!(sentence = sentence_idx, error = %e, "skipping malformed sentence"),
        }
    }

    Ok(sentences)
}

fn parse_feats(feats: &str) -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    if feats == "_" {
        return map;
    }
    for pair in feats.split('|') {
        if let Some((key, value)) = pair.split_once('=') {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}

fn parse_block(lines: &[&str], featural: bool, sentence_idx: usize) -> SyncollResult<Sentence> {
    let mut sentence_id = format!("s{sentence_idx}");
    let mut tokens: Vec<Token> = Vec::new();
    let mut heads: Vec<(usize, i64, String)> = Vec::new();

    for line in lines {
        if let Some(rest) = line.strip_prefix('#') {
            if let Some((key, value)) = rest.trim().split_once('=') {
                if key.trim() == "sent_id" {
                    sentence_id = value.trim().to_string();
                }
            }
            continue;
        }

        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 10 {
            tracing::warn!(line = %line, "skipping malformed CoNLL-U row");
            continue;
        }
        let id_field = cols[0];
        if id_field.contains('-') || id_field.contains('.') {
            // multiword token range or empty node: out of scope here, the
            // underlying simple tokens that compose it are still read.
            continue;
        }
        let int_id: i64 = id_field.parse().unwrap_or_else(|_| {
            tracing::warn!(id = id_field, "non-numeric CoNLL-U id, defaulting to 0");
            0
        });

        let lemma = cols[2];
        let form = cols[1];
        let upos = cols[3];
        let xpos = cols[4];
        let feats = cols[5];
        let head: i64 = cols[6].parse().unwrap_or(0);
        let deprel = cols[7].to_string();
        let misc = cols[9];
        let glue = misc.split('|').any(|p| p == "SpaceAfter=No");

        let tag = if featural {
            let mut map = parse_feats(feats);
            map.insert("POS".to_string(), upos.to_string());
            Tag::Featural(map)
        } else {
            Tag::Compact(xpos.to_string())
        };

        let tok = Token::new(lemma, form, sentence_id.clone(), id_field.to_string(), int_id, glue, tag);
        tokens.push(tok);
        heads.push((tokens.len() - 1, head, deprel));
    }

    if tokens.is_empty() {
        return Err(SyncollError::input_schema("conllu", "sentence block has no token rows"));
    }

    let mut arena = vec![Token::fake_root(sentence_id.clone(), featural)];
    arena.extend(tokens);

    for (tok_idx, head, deprel) in heads {
        let child_idx = tok_idx + 1;
        let parent_idx = if head == 0 { 0 } else { head as usize };
        if parent_idx >= arena.len() {
            return Err(SyncollError::input_schema("conllu", format!("HEAD {head} out of range")));
        }
        arena[parent_idx].add_link(deprel, child_idx);
    }

    for i in 1..arena.len() {
        arena[i].previous_glue = arena[i - 1].glue;
    }

    Ok(Sentence { tokens: arena, root: 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# sent_id = doc1-s1
# text = Lep pes teče.
1\tLep\tlep\tADJ\tAgpmsn\tDegree=Pos\t2\tamod\t_\t_
2\tpes\tpes\tNOUN\tNcmsn\tNumber=Sing\t3\tnsubj\t_\tSpaceAfter=No
3\tteče\tteči\tVERB\tVmpr3s\tNumber=Sing|Person=3\t0\troot\t_\t_
";

    #[test]
    fn parses_one_sentence_with_root_and_head_links() {
        let sentences = parse_str(SAMPLE, true).unwrap();
        assert_eq!(sentences.len(), 1);
        let s = &sentences[0];
        assert_eq!(s.tokens.len(), 4); // fake root + 3 tokens
        assert_eq!(s.tokens[0].sentence_id, "doc1-s1");
        let root_children = s.children_along(0, "root");
        assert_eq!(root_children, vec![3]);
        let nsubj_children = s.children_along(3, "nsubj");
        assert_eq!(nsubj_children, vec![2]);
    }

    #[test]
    fn featural_tag_carries_upos_under_pos_key() {
        let sentences = parse_str(SAMPLE, true).unwrap();
        let verb = &sentences[0].tokens[3];
        assert_eq!(verb.udpos().unwrap().get("POS").unwrap(), "VERB");
        assert_eq!(verb.udpos().unwrap().get("Person").unwrap(), "3");
    }

    #[test]
    fn compact_tag_uses_xpos_column_directly() {
        let sentences = parse_str(SAMPLE, false).unwrap();
        let adj = &sentences[0].tokens[1];
        assert_eq!(adj.xpos(), Some("Agpmsn"));
    }

    #[test]
    fn space_after_no_sets_glue() {
        let sentences = parse_str(SAMPLE, true).unwrap();
        let pes = &sentences[0].tokens[2];
        assert!(pes.glue);
        let teci = &sentences[0].tokens[3];
        assert!(teci.previous_glue);
    }
}
