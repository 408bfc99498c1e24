//! Pipeline configuration, grouped the way `canopy-pipeline::config` groups
//! its settings. Field defaults are drawn from `set_default_args` in
//! `original_source/cordex/pipeline/core.py`; the lowercase-collapse
//! threshold default is recorded as an Open Question decision in
//! DESIGN.md (no equivalent default exists in the original, which always
//! ran uncollapsed).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use syncoll_core::{SyncollError, SyncollResult};

/// Top-level pipeline configuration (spec §5 "Pipeline configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub corpus: CorpusConfig,
    pub matching: MatchingConfig,
    pub representation: RepresentationConfig,
    pub store: StoreConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            corpus: CorpusConfig::default(),
            matching: MatchingConfig::default(),
            representation: RepresentationConfig::default(),
            store: StoreConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Checks the user-configuration-inconsistency cases spec §7 names as
    /// fatal at startup, ahead of touching the corpus or the store: a
    /// `jos_msd_lang` of `"sl"` paired with any CoNLL-U input path (spec §9
    /// Open Question 3).
    pub fn validate(&self) -> SyncollResult<()> {
        if self.corpus.jos_msd_lang == "sl" {
            let has_conllu = self
                .corpus
                .paths
                .iter()
                .any(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("conllu") | Some("conllup")));
            if has_conllu {
                return Err(SyncollError::config_inconsistent(
                    "jos_msd_lang=\"sl\" is not supported for CoNLL-U input; set jos_msd_lang=\"en\" or convert the corpus to TEI-XML",
                ));
            }
        }
        Ok(())
    }
}

/// Corpus discovery and annotation-flavour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub paths: Vec<PathBuf>,
    /// Corpus language; only `"sl"` enables the postprocessor's voicing
    /// fixes (`postprocessor.py::process`).
    pub lang: String,
    /// Annotation flavour: `"upos"` selects featural (UD) tags, anything
    /// else selects the compact (JOS) flavour.
    pub pos: String,
    /// Deprel label set a structure file is written against: `"en"` (no
    /// translation) or `"sl"` (translate through `translate_deprel`).
    pub jos_depparse_lang: String,
    /// Compact-tag language variant the structure's morphology
    /// restrictions are written against: `"en"` (no translation) or `"sl"`
    /// (translate via `translate_sl_to_en` before decoding). `"sl"` is
    /// rejected for CoNLL-U corpora (spec §9 Open Question 3,
    /// `load_conllu`'s `NotImplementedError` for `jos_msd_lang == "sl"`).
    pub jos_msd_lang: String,
    /// Suppresses the `jos_msd_lang` translation pass even when
    /// `jos_msd_lang != "en"` (`syncoll_io::tei::parse_str_with_options`'s
    /// `msd_translate` argument).
    pub no_msd_translate: bool,
    pub ignore_punctuations: bool,
    /// Carried from `set_default_args` for parity with the original's own
    /// default-argument table; the original never reads it back either, so
    /// there is no corresponding branch here.
    pub new_tei: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            lang: "sl".to_string(),
            pos: "upos".to_string(),
            jos_depparse_lang: "en".to_string(),
            jos_msd_lang: "en".to_string(),
            no_msd_translate: false,
            ignore_punctuations: false,
            new_tei: false,
        }
    }
}

/// Matcher and structure-loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub structures_path: PathBuf,
    pub statistics: bool,
    pub fixed_restriction_order: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            structures_path: PathBuf::new(),
            statistics: true,
            fixed_restriction_order: false,
        }
    }
}

/// Representation-engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepresentationConfig {
    pub lowercase_collapse_threshold: f64,
    pub lookup_lexicon: Option<PathBuf>,
    pub lookup_api: Option<String>,
}

impl Default for RepresentationConfig {
    fn default() -> Self {
        Self {
            lowercase_collapse_threshold: 0.10,
            lookup_lexicon: None,
            lookup_api: None,
        }
    }
}

/// Collocation store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db: Option<PathBuf>,
    pub new_db: bool,
    pub min_freq: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db: None,
            new_db: false,
            min_freq: 0,
        }
    }
}

/// Output writer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub out: Option<PathBuf>,
    pub multiple_output: bool,
    pub sort_by: Option<usize>,
    pub sort_reversed: bool,
    pub no_stats: bool,
    pub collocation_sentence_map_dest: Option<PathBuf>,
    pub separator: String,
    pub decimal_separator: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out: None,
            multiple_output: false,
            sort_by: None,
            sort_reversed: false,
            no_stats: false,
            collocation_sentence_map_dest: None,
            separator: "\t".to_string(),
            decimal_separator: ".".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cordex_set_default_args() {
        let config = PipelineConfig::default();
        assert_eq!(config.store.min_freq, 0);
        assert!(config.matching.statistics);
        assert!(!config.output.multiple_output);
        assert_eq!(config.corpus.lang, "sl");
        assert_eq!(config.corpus.pos, "upos");
        assert_eq!(config.corpus.jos_msd_lang, "en");
    }

    #[test]
    fn validate_accepts_default_config() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_sl_msd_lang_with_conllu_input() {
        let mut config = PipelineConfig::default();
        config.corpus.jos_msd_lang = "sl".to_string();
        config.corpus.paths = vec![PathBuf::from("corpus.conllu")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_allows_sl_msd_lang_with_tei_input() {
        let mut config = PipelineConfig::default();
        config.corpus.jos_msd_lang = "sl".to_string();
        config.corpus.paths = vec![PathBuf::from("corpus.xml")];
        assert!(config.validate().is_ok());
    }
}
