//! The pipeline driver itself: discovers and loops over corpus files,
//! matches every structure against every sentence, records corpus-wide word
//! statistics, and runs the post-loop dispersion/representation/statistics/
//! output passes, grounded on `original_source/cordex/pipeline/core.py`.

use std::collections::BTreeMap;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use syncoll_core::{Sentence, SyncollResult, Tag, Token};
use syncoll_io::writer::{ComponentColumns, RowStatistics, StructureOutput};
use syncoll_io::{discover_files, load_sentences_with_options, write_rows, OutputRow, SentenceMapEntry, WriterConfig};
use syncoll_match::{match_sentence, Assignment};
use syncoll_represent::{add_words as add_words_to_recipes, build_recipes, collapse_casing, render_all, LookupBackend};
use syncoll_store::{delta_p_1_to_2, delta_p_2_to_1, distinct_forms, log_dice, log_dice_all, MatchedToken, Store};
use syncoll_structures::{SystemType, SyntacticStructure};

use crate::config::PipelineConfig;
use crate::postprocess::{apply_voicing_fix, is_fixed_restriction_order};

/// Drives one corpus run against a fixed set of compiled structures. Owns
/// the store handle so file-loop progress (`Files`/`StepsDone`) and the
/// post-loop passes share one connection.
pub struct Pipeline<'a> {
    config: PipelineConfig,
    store: Store,
    lookup: Option<&'a dyn LookupBackend>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig, store: Store) -> Self {
        Self { config, store, lookup: None }
    }

    pub fn with_lookup(mut self, lookup: &'a dyn LookupBackend) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Runs the full pipeline: file loop, dispersion pass, representation
    /// pass, statistics, and output dispatch (spec §5-§6 "Pipeline").
    pub fn run(&mut self, structures: &[SyntacticStructure]) -> SyncollResult<()> {
        let featural = self.config.corpus.pos == "upos";
        let msd_translate = !featural && self.config.corpus.jos_msd_lang != "en" && !self.config.corpus.no_msd_translate;
        let files = discover_files(&self.config.corpus.paths)?;

        let progress = ProgressBar::new(files.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for path in &files {
            progress.set_message(path.display().to_string());
            let path_key = path.display().to_string();
            if self.store.is_file_done(&path_key)? {
                progress.inc(1);
                continue;
            }
            self.process_file(path, featural, msd_translate, structures)?;
            self.store.mark_file_done(&path_key)?;
            self.store.commit()?;
            progress.inc(1);
        }
        progress.finish_and_clear();

        if self.config.output.out.is_none() && self.config.output.collocation_sentence_map_dest.is_none() {
            return Ok(());
        }

        for structure in structures {
            self.store
                .determine_collocation_dispersions(&structure.id, self.config.store.min_freq)?;
        }

        let mut structure_outputs = Vec::with_capacity(structures.len());
        for structure in structures {
            structure_outputs.push(self.build_structure_output(structure)?);
        }

        write_rows(
            self.config.output.out.as_deref(),
            &structure_outputs,
            self.config.output.collocation_sentence_map_dest.as_deref(),
            &self.writer_config(),
            false,
        )?;

        Ok(())
    }

    fn process_file(&mut self, path: &Path, featural: bool, msd_translate: bool, structures: &[SyntacticStructure]) -> SyncollResult<()> {
        let sentences = load_sentences_with_options(path, featural, msd_translate)?;
        for sentence in &sentences {
            self.record_word_stats(sentence)?;
            for structure in structures {
                self.match_sentence_into_store(structure, sentence, featural)?;
            }
        }
        Ok(())
    }

    /// Records every non-fake token's (lemma, pos) pair so a lemma's corpus-
    /// wide frequency includes occurrences outside any structural match
    /// (spec §6/§9, `WordStats.add_words`).
    fn record_word_stats(&mut self, sentence: &Sentence) -> SyncollResult<()> {
        let observations: Vec<(String, String)> =
            sentence.tokens.iter().filter(|t| !t.fake).filter_map(|t| pos_class(t).map(|pos| (t.lemma.clone(), pos))).collect();
        if observations.is_empty() {
            return Ok(());
        }
        self.store.add_words(&observations)
    }

    fn match_sentence_into_store(&mut self, structure: &SyntacticStructure, sentence: &Sentence, featural: bool) -> SyncollResult<()> {
        for assignment in match_sentence(structure, sentence) {
            if self.config.corpus.ignore_punctuations && assignment_has_punctuation(&assignment, sentence, featural) {
                continue;
            }
            self.store_match(structure, &assignment, sentence)?;
        }
        Ok(())
    }

    fn store_match(&mut self, structure: &SyntacticStructure, assignment: &Assignment, sentence: &Sentence) -> SyncollResult<()> {
        let mut tokens: BTreeMap<String, MatchedToken> =
            assignment.iter().map(|(component_id, &idx)| (component_id.clone(), to_matched_token(component_id, sentence.token(idx)))).collect();

        if !is_fixed_restriction_order(self.config.matching.fixed_restriction_order, &tokens) {
            return Ok(());
        }

        let key_pairs = apply_voicing_fix(&self.config.corpus.lang, &mut tokens);
        let key = key_pairs.iter().map(|(id, lemma)| format!("{id}:{lemma}")).collect::<Vec<_>>().join("|");
        let sentence_id = tokens.values().next().map(|t| t.sentence_id.clone()).unwrap_or_default();
        let ordered: Vec<MatchedToken> = tokens.into_values().collect();

        self.store.add_match(&structure.id, &key, &sentence_id, &ordered)?;
        Ok(())
    }

    /// Builds one structure's representation, statistics and output rows
    /// from its collocations that survived the frequency filter (spec §5-§6).
    fn build_structure_output(&mut self, structure: &SyntacticStructure) -> SyncollResult<StructureOutput> {
        let collocation_ids = self.store.frequency_filter(&structure.id, self.config.store.min_freq)?;
        let want_stats = self.config.matching.statistics && !self.config.output.no_stats;
        let corpus_size = self.store.num_words()? as f64;

        let mut rows = Vec::with_capacity(collocation_ids.len());
        let mut sentence_map = Vec::new();

        for collocation_id in collocation_ids {
            let match_groups = self.store.matches_for(collocation_id)?;
            let Some(first_group) = match_groups.first() else { continue };
            let first_by_component: BTreeMap<String, &MatchedToken> = first_group.iter().map(|t| (t.component_id.clone(), t)).collect();

            self.render_collocation(structure, collocation_id, &match_groups)?;
            let representations = self.store.get_representations(collocation_id)?;

            let freq = self.store.match_num(collocation_id)?;
            let (components, joint) = self.build_component_columns(structure, &first_by_component, &representations, want_stats)?;

            let statistics = if want_stats && structure.core_component_ids.len() == 2 {
                let forms: Vec<String> = match_groups.iter().map(|g| joined_surface_form(g)).collect();
                Some(self.compute_statistics(structure, &first_by_component, freq, corpus_size, &forms)?)
            } else {
                None
            };

            rows.push(OutputRow {
                structure_id: structure.id.clone(),
                collocation_id,
                components,
                joint_representative_form_fixed: joint.clone(),
                joint_representative_form_variable: joint,
                frequency: freq,
                statistics,
            });

            for group in &match_groups {
                let mut sorted: Vec<&MatchedToken> = group.iter().collect();
                sorted.sort_by_key(|t| t.component_id.parse::<i64>().unwrap_or(i64::MAX));
                let sentence_id = sorted.first().map(|t| t.sentence_id.clone()).unwrap_or_default();
                let token_ids = sorted.iter().map(|t| format!("{}.{}", t.sentence_id, t.word_id)).collect::<Vec<_>>().join("|");
                sentence_map.push(SentenceMapEntry { collocation_id, sentence_id, token_ids });
            }
        }

        Ok(StructureOutput { structure_id: structure.id.clone(), num_components: structure.components.len(), rows, sentence_map })
    }

    /// Feeds every match group's tokens through the structure's recipes and
    /// persists the chosen representation per component (spec §5).
    fn render_collocation(&mut self, structure: &SyntacticStructure, collocation_id: i64, match_groups: &[Vec<MatchedToken>]) -> SyncollResult<()> {
        let mut recipes = build_recipes(&structure.representations);
        for group in match_groups {
            let tokens: Vec<Token> = group.iter().map(matched_token_to_token).collect();
            let component_tokens: BTreeMap<String, &Token> = group.iter().zip(&tokens).map(|(m, t)| (m.component_id.clone(), t)).collect();
            add_words_to_recipes(&mut recipes, &component_tokens);
        }

        // Casing variants are only collapsed for the compact (JOS) flavour;
        // featural tags carry `Case` as an explicit feature already.
        if structure.system_type == SystemType::Jos {
            collapse_casing(&mut recipes, self.config.representation.lowercase_collapse_threshold);
        }

        let rendered = render_all(&recipes, self.lookup);
        for (component_id, r) in &rendered {
            self.store.set_representation(collocation_id, component_id, r.text.as_deref(), r.msd.as_deref())?;
        }
        Ok(())
    }

    /// Builds one row's per-component columns plus its joint representative
    /// form, in structure-component order (spec §6 "Output columns"). A
    /// component with no representation spec renders as a blank quadruple;
    /// one whose recipe rendered nothing falls back to its bare lemma.
    fn build_component_columns(
        &mut self,
        structure: &SyntacticStructure,
        first_by_component: &BTreeMap<String, &MatchedToken>,
        representations: &BTreeMap<String, (Option<String>, Option<String>)>,
        want_stats: bool,
    ) -> SyncollResult<(Vec<ComponentColumns>, String)> {
        let mut components = Vec::with_capacity(structure.components.len());
        let mut joint_parts = Vec::new();

        for component in &structure.components {
            let lemma = first_by_component.get(component.id.as_str()).map(|t| t.lemma.clone()).unwrap_or_default();

            let mut columns = match representations.get(&component.id) {
                None => ComponentColumns::default(),
                Some((None, _)) => {
                    joint_parts.push(lemma.clone());
                    ComponentColumns {
                        lemma: lemma.clone(),
                        representative_form: lemma.clone(),
                        rf_tag: String::new(),
                        rf_scenario: "lemma_fallback".to_string(),
                        distribution: None,
                    }
                }
                Some((Some(text), msd)) => {
                    joint_parts.push(text.clone());
                    ComponentColumns {
                        lemma: lemma.clone(),
                        representative_form: text.clone(),
                        rf_tag: msd.clone().unwrap_or_default(),
                        rf_scenario: "ok".to_string(),
                        distribution: None,
                    }
                }
            };

            if want_stats && component.is_core() && !lemma.is_empty() {
                columns.distribution = Some(self.store.load_dispersion(&structure.id, &component.id, &lemma, &self.config.corpus.lang)?);
            }

            components.push(columns);
        }

        Ok((components, joint_parts.join(" ")))
    }

    /// Core-pair statistics: Delta-P in both directions, LogDice over the
    /// core pair and over all core components, and the distinct-forms count
    /// (spec §6 "Statistics"). Only meaningful for two-core-word structures,
    /// matching the original formatter's `jppb` pair requirement.
    fn compute_statistics(
        &self,
        structure: &SyntacticStructure,
        first_by_component: &BTreeMap<String, &MatchedToken>,
        freq: i64,
        corpus_size: f64,
        forms: &[String],
    ) -> SyncollResult<RowStatistics> {
        let featural = self.config.corpus.pos == "upos";
        let id_x = &structure.core_component_ids[0];
        let id_y = &structure.core_component_ids[1];

        let fx = self.core_word_freq(first_by_component, id_x, featural)?;
        let fy = self.core_word_freq(first_by_component, id_y, featural)?;
        let f_xy = freq as f64;

        Ok(RowStatistics {
            delta_p12: delta_p_1_to_2(f_xy, fx, fy, corpus_size),
            delta_p21: delta_p_2_to_1(f_xy, fx, fy, corpus_size),
            logdice_core: log_dice(f_xy, fx, fy),
            logdice_all: log_dice_all(f_xy, &[fx, fy]),
            distinct_forms: distinct_forms(forms),
        })
    }

    fn core_word_freq(&self, first_by_component: &BTreeMap<String, &MatchedToken>, component_id: &str, featural: bool) -> SyncollResult<f64> {
        let Some(token) = first_by_component.get(component_id) else {
            return Ok(0.0);
        };
        let pos = pos_bucket(&token.tag, featural);
        Ok(self.store.word_freq(&token.lemma, &pos)? as f64)
    }

    fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            separator: self.config.output.separator.clone(),
            decimal_separator: self.config.output.decimal_separator.clone(),
            sort_by: self.config.output.sort_by,
            sort_reversed: self.config.output.sort_reversed,
            multiple_output: self.config.output.multiple_output,
            statistics: self.config.matching.statistics && !self.config.output.no_stats,
        }
    }
}

fn to_matched_token(component_id: &str, token: &Token) -> MatchedToken {
    MatchedToken {
        component_id: component_id.to_string(),
        sentence_id: token.sentence_id.clone(),
        word_id: token.word_id.clone(),
        int_id: token.int_id,
        lemma: token.lemma.clone(),
        text: token.text.clone(),
        tag: token.tag.render(),
    }
}

/// Rebuilds a `syncoll_core::Token` from a stored match so it can be fed
/// back through representation recipes. The tag is always wrapped as
/// `Tag::Compact`, which keeps `common_tag`/`agrees` (syncoll-represent)
/// working for compact-flavour corpora; featural corpora lose per-feature
/// agreement precision here (see DESIGN.md).
fn matched_token_to_token(m: &MatchedToken) -> Token {
    Token::new(m.lemma.clone(), m.text.clone(), m.sentence_id.clone(), m.word_id.clone(), m.int_id, false, Tag::Compact(m.tag.clone()))
}

fn joined_surface_form(group: &[MatchedToken]) -> String {
    let mut sorted: Vec<&MatchedToken> = group.iter().collect();
    sorted.sort_by_key(|t| t.component_id.parse::<i64>().unwrap_or(i64::MAX));
    sorted.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ")
}

/// Content-word POS bucket matching the original's `word.xpos[0]` /
/// `word.udpos['POS']` (`formatter.py::StatsFormatter.new_match`): the first
/// character of a compact tag, or the `POS` feature of a featural one.
fn pos_class(token: &Token) -> Option<String> {
    match &token.tag {
        Tag::Compact(s) => s.chars().next().map(|c| c.to_string()),
        Tag::Featural(map) => map.get("POS").cloned(),
    }
}

/// Recovers the same POS bucket from an already-rendered tag string stored
/// in `Matches.tag` (see [`to_matched_token`]): the first character for a
/// compact tag, or the value following `POS=` for a featural one rendered
/// through `Tag::render`.
fn pos_bucket(rendered_tag: &str, featural: bool) -> String {
    if featural {
        rendered_tag.split('|').find_map(|part| part.strip_prefix("POS=")).unwrap_or_default().to_string()
    } else {
        rendered_tag.chars().next().map(|c| c.to_string()).unwrap_or_default()
    }
}

fn assignment_has_punctuation(assignment: &Assignment, sentence: &Sentence, featural: bool) -> bool {
    assignment.values().any(|&idx| {
        let token = sentence.token(idx);
        match pos_class(token) {
            Some(p) if featural => p == "PUNCT",
            Some(p) => p == "Z",
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncoll_structures::build_structures;

    const STRUCTURE_XML: &str = r#"
        <syntactic_structure id="S1" type="collocation" system_type="JOS">
          <components>
            <component id="1">
              <restrictions>
                <restriction type="morphology">
                  <feature name="pos" value="noun"/>
                </restriction>
              </restrictions>
            </component>
            <component id="2">
              <restrictions>
                <restriction type="morphology">
                  <feature name="pos" value="adjective"/>
                </restriction>
              </restrictions>
            </component>
          </components>
          <dependencies>
            <dependency from="1" to="2" deprel="amod" order="00" status="required"/>
          </dependencies>
          <representations>
            <representation component="1" rendition="lemma"/>
            <representation component="2" rendition="word_form" selection="all"/>
          </representations>
        </syntactic_structure>
    "#;

    fn sentence_with_amod(noun_lemma: &str, noun_text: &str, adj_lemma: &str, adj_text: &str) -> Sentence {
        let root = Token::fake_root("doc1.s1", false);
        let mut noun = Token::new(noun_lemma, noun_text, "doc1.s1", "1", 1, false, Tag::Compact("Ncmsn".to_string()));
        let adj = Token::new(adj_lemma, adj_text, "doc1.s1", "2", 2, false, Tag::Compact("Agpmsn".to_string()));
        noun.add_link("amod", 2);
        Sentence { tokens: vec![root, noun, adj], root: 0 }
    }

    #[test]
    fn run_writes_one_row_with_the_right_frequency_for_a_repeated_collocation() {
        let structures = build_structures(&[STRUCTURE_XML.to_string()]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let corpus_path = dir.path().join("corpus.conllu");
        std::fs::write(
            &corpus_path,
            "# sent_id = s1\n\
             1\tpsa\tpes\tNOUN\tNcmsn\t_\t0\troot\t_\t_\n\
             2\tlepega\tlep\tADJ\tAgpmsn\t_\t1\tamod\t_\t_\n\
             \n\
             # sent_id = s2\n\
             1\tpes\tpes\tNOUN\tNcmsn\t_\t0\troot\t_\t_\n\
             2\tlepega\tlep\tADJ\tAgpmsn\t_\t1\tamod\t_\t_\n",
        )
        .unwrap();

        let mut config = PipelineConfig::default();
        config.corpus.paths = vec![corpus_path];
        config.corpus.pos = "xpos".to_string();
        config.matching.statistics = false;
        let out_path = dir.path().join("out.tsv");
        config.output.out = Some(out_path.clone());

        let mut pipeline = Pipeline::new(config, Store::in_memory().unwrap());
        pipeline.run(&structures).unwrap();

        let content = std::fs::read_to_string(&out_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2); // header + one surviving collocation
        let freq_idx = lines[0].split('\t').position(|c| c == "Frequency").unwrap();
        assert_eq!(lines[1].split('\t').nth(freq_idx).unwrap(), "2");
    }

    #[test]
    fn pos_bucket_reads_compact_first_char_and_featural_pos_feature() {
        assert_eq!(pos_bucket("Ncmsn", false), "N");
        assert_eq!(pos_bucket("Case=Nom|POS=NOUN", true), "NOUN");
    }

    #[test]
    fn assignment_has_punctuation_detects_compact_punctuation_category() {
        let mut assignment = Assignment::new();
        assignment.insert("1".to_string(), 1);
        let mut sentence = sentence_with_amod("pes", "pes", "lep", "lepega");
        sentence.tokens[1].tag = Tag::Compact("Z".to_string());
        assert!(assignment_has_punctuation(&assignment, &sentence, false));
    }
}
