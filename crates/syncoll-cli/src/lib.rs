//! Command-line entry point for syncoll (spec §6 "External interfaces",
//! out of scope for the core but wired here so the workspace produces a
//! runnable binary). Grounded on `canopy-cli`'s `run_cli`/`main_impl`
//! testable-wrapper idiom, extended with the real flags `canopy-cli` only
//! stubbed; flag defaults follow `original_source/cordex/pipeline/
//! core.py::set_default_args`.

use std::path::{Path, PathBuf};

use clap::Parser;

use syncoll_core::{translate_deprel, SyncollError, SyncollResult};
use syncoll_pipeline::{Pipeline, PipelineConfig};
use syncoll_represent::{FileLookupBackend, HttpLookupBackend, LookupBackend};
use syncoll_store::Store;
use syncoll_structures::{build_structures_with_options, SyntacticStructure};

/// Extracts syntactic collocations from a dependency-parsed corpus.
#[derive(Parser, Debug)]
#[command(name = "syncoll", version, about)]
pub struct Cli {
    /// Corpus file(s) or a single directory to walk recursively.
    #[arg(long = "corpus", required = true, num_args = 1..)]
    pub corpus: Vec<PathBuf>,

    /// Structure file, or a directory of structure files.
    #[arg(long = "structures", required = true)]
    pub structures: PathBuf,

    /// Collocation store file; omit for an in-memory (non-resumable) run.
    #[arg(long = "db")]
    pub db: Option<PathBuf>,

    /// Annotation flavour: "upos" (featural/UD) or "xpos" (compact/JOS).
    #[arg(long = "pos", default_value = "upos")]
    pub pos: String,

    /// Corpus language; only "sl" enables the voicing-assimilation postprocessor.
    #[arg(long = "lang", default_value = "sl")]
    pub lang: String,

    /// Deprel label set a structure file is written against ("en"/"sl").
    #[arg(long = "jos-depparse-lang", default_value = "en")]
    pub jos_depparse_lang: String,

    /// Compact-tag language variant ("en"/"sl"); "sl" is fatal for CoNLL-U input.
    #[arg(long = "jos-msd-lang", default_value = "en")]
    pub jos_msd_lang: String,

    /// Disable LogDice/Delta-P/dispersion computation.
    #[arg(long = "no-statistics")]
    pub no_statistics: bool,

    /// Minimum distinct-match count a collocation needs to be written out.
    #[arg(long = "min-freq", default_value_t = 0)]
    pub min_freq: i64,

    /// Drop matches whose assignment includes a punctuation token.
    #[arg(long = "ignore-punctuations")]
    pub ignore_punctuations: bool,

    /// Reject matches whose component indices are not in sentence order.
    #[arg(long = "fixed-restriction-order")]
    pub fixed_restriction_order: bool,

    /// Output path: a file, or an extensionless path for one file per structure.
    #[arg(long = "out")]
    pub out: Option<PathBuf>,

    /// Collocation-id -> sentence-id -> token-ids mapping file.
    #[arg(long = "sentence-map")]
    pub sentence_map: Option<PathBuf>,

    /// Column field separator.
    #[arg(long = "separator", default_value = "\t")]
    pub separator: String,

    /// Decimal separator for statistics columns.
    #[arg(long = "decimal-separator", default_value = ".")]
    pub decimal_separator: String,

    /// Compressed inflectional-lexicon blob (file-mode lookup backend).
    #[arg(long = "lookup-lexicon", conflicts_with = "lookup_api")]
    pub lookup_lexicon: Option<PathBuf>,

    /// Inflectional-lookup HTTP API base endpoint (API-mode lookup backend).
    #[arg(long = "lookup-api", conflicts_with = "lookup_lexicon")]
    pub lookup_api: Option<String>,

    /// Lowercase-collapse threshold for the compact flavour (spec §9 Open Question 2).
    #[arg(long = "lowercase-collapse-threshold", default_value_t = 0.10)]
    pub lowercase_collapse_threshold: f64,

    /// Tracing filter, e.g. "debug" or "syncoll_pipeline=debug,warn".
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Builds a [`PipelineConfig`] from the parsed flags.
    pub fn to_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.corpus.paths = self.corpus.clone();
        config.corpus.pos = self.pos.clone();
        config.corpus.lang = self.lang.clone();
        config.corpus.jos_depparse_lang = self.jos_depparse_lang.clone();
        config.corpus.jos_msd_lang = self.jos_msd_lang.clone();
        config.corpus.ignore_punctuations = self.ignore_punctuations;
        config.matching.structures_path = self.structures.clone();
        config.matching.statistics = !self.no_statistics;
        config.matching.fixed_restriction_order = self.fixed_restriction_order;
        config.representation.lowercase_collapse_threshold = self.lowercase_collapse_threshold;
        config.representation.lookup_lexicon = self.lookup_lexicon.clone();
        config.representation.lookup_api = self.lookup_api.clone();
        config.store.db = self.db.clone();
        config.store.min_freq = self.min_freq;
        config.output.out = self.out.clone();
        config.output.collocation_sentence_map_dest = self.sentence_map.clone();
        config.output.separator = self.separator.clone();
        config.output.decimal_separator = self.decimal_separator.clone();
        config.logging.level = self.log_level.clone();
        config
    }
}

/// Splits a structure file's contents into one string per
/// `<syntactic_structure>...</syntactic_structure>` element (spec §6
/// "Structure file": a document listing multiple entries), so each can be
/// fed independently through `SyntacticStructure::from_xml`.
fn split_structure_documents(xml: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<syntactic_structure") {
        let tail = &rest[start..];
        let Some(end) = tail.find("</syntactic_structure>") else { break };
        let end = end + "</syntactic_structure>".len();
        out.push(tail[..end].to_string());
        rest = &tail[end..];
    }
    out
}

/// Reads every structure document reachable from `path`: a single file's
/// contents are split into per-structure documents; a directory's `.xml`
/// files are each read and split the same way (spec §6 "Structure file").
fn read_structure_documents(path: &Path) -> SyncollResult<Vec<String>> {
    let mut out = Vec::new();
    if path.is_dir() {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
            .map_err(|e| SyncollError::io(format!("reading structures directory {}", path.display()), e))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("xml"))
            .collect();
        entries.sort();
        for entry in entries {
            let content = std::fs::read_to_string(&entry).map_err(|e| SyncollError::io(format!("reading {}", entry.display()), e))?;
            out.extend(split_structure_documents(&content));
        }
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| SyncollError::io(format!("reading {}", path.display()), e))?;
        out.extend(split_structure_documents(&content));
    }
    if out.is_empty() {
        return Err(SyncollError::structure_load(path.display().to_string(), "no <syntactic_structure> elements found"));
    }
    Ok(out)
}

/// Rewrites every structure's deprel labels from English to Slovenian JOS
/// depparse labels when the corpus is annotated with that label set (spec
/// §9 "`jos_depparse_lang` translation"). A pipe-joined label is translated
/// member-by-member so the union semantics of `syncoll-match` are preserved.
fn translate_structures_deprels(structures: &mut [SyntacticStructure], jos_depparse_lang: &str) -> SyncollResult<()> {
    if jos_depparse_lang != "sl" {
        return Ok(());
    }
    for structure in structures {
        for component in &mut structure.components {
            for edge in &mut component.children {
                if edge.deprel == "modra" {
                    continue;
                }
                let translated: SyncollResult<Vec<String>> = edge.deprel.split('|').map(|label| translate_deprel(label, true)).collect();
                edge.deprel = translated?.join("|");
            }
        }
    }
    Ok(())
}

/// Builds the lookup backend the representation engine should consult,
/// from whichever of `--lookup-lexicon`/`--lookup-api` was given.
fn build_lookup_backend(config: &PipelineConfig) -> SyncollResult<Option<Box<dyn LookupBackend>>> {
    if let Some(path) = &config.representation.lookup_lexicon {
        return Ok(Some(Box::new(FileLookupBackend::load(path)?)));
    }
    if let Some(endpoint) = &config.representation.lookup_api {
        return Ok(Some(Box::new(HttpLookupBackend::new(endpoint.clone()))));
    }
    Ok(None)
}

/// Runs one full pipeline invocation from parsed CLI flags (spec §5
/// "Pipeline driver"): validates configuration, loads structures, opens the
/// store, and runs the matcher/representation/output passes.
pub fn run(cli: &Cli) -> SyncollResult<()> {
    let config = cli.to_config();
    config.validate()?;

    let documents = read_structure_documents(&config.matching.structures_path)?;
    let mut structures = build_structures_with_options(&documents, config.matching.statistics)?;
    translate_structures_deprels(&mut structures, &config.corpus.jos_depparse_lang)?;

    let store = match &config.store.db {
        Some(path) => Store::open(path)?,
        None => Store::in_memory()?,
    };

    let lookup = build_lookup_backend(&config)?;
    let mut pipeline = Pipeline::new(config, store);
    if let Some(backend) = &lookup {
        pipeline = pipeline.with_lookup(backend.as_ref());
    }
    pipeline.run(&structures)
}

/// Parses `std::env::args`, installs tracing, and runs the pipeline.
/// Mirrors `canopy-cli`'s `run_cli` testable-wrapper shape.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    syncoll_core::tracing_setup::init_with_default(&cli.log_level);
    run(&cli)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_config_carries_every_flag_through() {
        let cli = Cli {
            corpus: vec![PathBuf::from("corpus.conllu")],
            structures: PathBuf::from("structures.xml"),
            db: Some(PathBuf::from("store.db")),
            pos: "xpos".to_string(),
            lang: "sl".to_string(),
            jos_depparse_lang: "sl".to_string(),
            jos_msd_lang: "en".to_string(),
            no_statistics: true,
            min_freq: 3,
            ignore_punctuations: true,
            fixed_restriction_order: true,
            out: Some(PathBuf::from("out.tsv")),
            sentence_map: Some(PathBuf::from("map.tsv")),
            separator: ";".to_string(),
            decimal_separator: ",".to_string(),
            lookup_lexicon: None,
            lookup_api: Some("https://example.test/lookup".to_string()),
            lowercase_collapse_threshold: 0.2,
            log_level: "debug".to_string(),
        };

        let config = cli.to_config();
        assert_eq!(config.corpus.paths, vec![PathBuf::from("corpus.conllu")]);
        assert_eq!(config.corpus.pos, "xpos");
        assert!(!config.matching.statistics);
        assert_eq!(config.store.min_freq, 3);
        assert!(config.output.collocation_sentence_map_dest.is_some());
        assert_eq!(config.output.separator, ";");
        assert_eq!(config.representation.lowercase_collapse_threshold, 0.2);
    }

    #[test]
    fn split_structure_documents_finds_each_element() {
        let xml = r#"
            <structures system_type="JOS">
              <syntactic_structure id="S1"><components/></syntactic_structure>
              <syntactic_structure id="S2"><components/></syntactic_structure>
            </structures>
        "#;
        let docs = split_structure_documents(xml);
        assert_eq!(docs.len(), 2);
        assert!(docs[0].contains("id=\"S1\""));
        assert!(docs[1].contains("id=\"S2\""));
    }

    #[test]
    fn split_structure_documents_empty_for_no_elements() {
        assert!(split_structure_documents("<structures></structures>").is_empty());
    }

    #[test]
    fn read_structure_documents_errors_on_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xml");
        std::fs::write(&path, "<structures></structures>").unwrap();
        assert!(read_structure_documents(&path).is_err());
    }

    #[test]
    fn read_structure_documents_reads_directory_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.xml"),
            r#"<syntactic_structure id="A" system_type="JOS"><components/></syntactic_structure>"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.xml"),
            r#"<syntactic_structure id="B" system_type="JOS"><components/></syntactic_structure>"#,
        )
        .unwrap();
        let docs = read_structure_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].contains("id=\"A\""));
        assert!(docs[1].contains("id=\"B\""));
    }

    #[test]
    fn translate_structures_deprels_is_noop_for_english_label_set() {
        let mut structures = Vec::<SyntacticStructure>::new();
        assert!(translate_structures_deprels(&mut structures, "en").is_ok());
    }
}
