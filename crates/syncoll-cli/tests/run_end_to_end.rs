//! End-to-end CLI test: a tiny CoNLL-U corpus and structure file on disk,
//! run through `syncoll_cli::run` exactly as the binary would, asserting
//! on the written output file (spec §8 "Single-sentence featural noun
//! phrase" scenario, adapted to the compact flavour this fixture uses).

use std::path::PathBuf;

use syncoll_cli::Cli;

fn write_fixture(dir: &std::path::Path) -> (PathBuf, PathBuf) {
    let corpus = dir.join("corpus.conllu");
    std::fs::write(
        &corpus,
        "# sent_id = s1\n\
         1\tpsa\tpes\tNOUN\tNcmsn\t_\t0\troot\t_\t_\n\
         2\tlepega\tlep\tADJ\tAgpmsn\t_\t1\tamod\t_\t_\n",
    )
    .unwrap();

    let structures = dir.join("structures.xml");
    std::fs::write(
        &structures,
        r#"<syntactic_structure id="S1" type="collocation" system_type="JOS">
          <components>
            <component id="1">
              <restrictions>
                <restriction type="morphology"><feature name="pos" value="noun"/></restriction>
              </restrictions>
            </component>
            <component id="2">
              <restrictions>
                <restriction type="morphology"><feature name="pos" value="adjective"/></restriction>
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
        </syntactic_structure>"#,
    )
    .unwrap();

    (corpus, structures)
}

#[test]
fn run_writes_the_expected_collocation_row() {
    let dir = tempfile::tempdir().unwrap();
    let (corpus, structures) = write_fixture(dir.path());
    let out = dir.path().join("out.tsv");

    let cli = Cli {
        corpus: vec![corpus],
        structures,
        db: None,
        pos: "xpos".to_string(),
        lang: "sl".to_string(),
        jos_depparse_lang: "en".to_string(),
        jos_msd_lang: "en".to_string(),
        no_statistics: true,
        min_freq: 0,
        ignore_punctuations: false,
        fixed_restriction_order: false,
        out: Some(out.clone()),
        sentence_map: None,
        separator: "\t".to_string(),
        decimal_separator: ".".to_string(),
        lookup_lexicon: None,
        lookup_api: None,
        lowercase_collapse_threshold: 0.10,
        log_level: "info".to_string(),
    };

    syncoll_cli::run(&cli).unwrap();

    let content = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2, "header plus one collocation row: {content}");
    assert!(lines[1].contains("pes"));
}

#[test]
fn run_rejects_sl_msd_lang_with_conllu_input() {
    let dir = tempfile::tempdir().unwrap();
    let (corpus, structures) = write_fixture(dir.path());

    let cli = Cli {
        corpus: vec![corpus],
        structures,
        db: None,
        pos: "xpos".to_string(),
        lang: "sl".to_string(),
        jos_depparse_lang: "en".to_string(),
        jos_msd_lang: "sl".to_string(),
        no_statistics: true,
        min_freq: 0,
        ignore_punctuations: false,
        fixed_restriction_order: false,
        out: Some(dir.path().join("out.tsv")),
        sentence_map: None,
        separator: "\t".to_string(),
        decimal_separator: ".".to_string(),
        lookup_lexicon: None,
        lookup_api: None,
        lowercase_collapse_threshold: 0.10,
        log_level: "info".to_string(),
    };

    assert!(syncoll_cli::run(&cli).is_err());
}
