//! Tabular collocation writer (spec §6 "Output"), grounded on
//! `original_source/cordex/writers/writer.py` and `formatter.py`. Owns
//! column layout, row formatting, sorting and the single-file/
//! per-structure-split/in-memory output modes; the numbers themselves
//! (representations, statistics) are computed upstream by `syncoll-store`
//! and `syncoll-represent` and handed in as already-rendered [`OutputRow`]s.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use syncoll_core::{SyncollError, SyncollResult};

/// One component's columns in a row: `C{i}_Lemma`, `_Representative_form`,
/// `_RF_tag`, `_RF_scenario`, and (statistics mode) `_Distribution`.
#[derive(Debug, Clone, Default)]
pub struct ComponentColumns {
    pub lemma: String,
    pub representative_form: String,
    pub rf_tag: String,
    /// `"ok"` when a recipe rendered a form, `"lemma_fallback"` when the
    /// component fell back to its bare lemma (spec §5, `OutNoStatFormatter`).
    pub rf_scenario: String,
    pub distribution: Option<i64>,
}

/// Per-collocation statistics, present only when the writer is configured
/// for statistics output (spec §6 "Statistics columns").
#[derive(Debug, Clone)]
pub struct RowStatistics {
    pub delta_p12: f64,
    pub delta_p21: f64,
    pub logdice_core: f64,
    pub logdice_all: f64,
    pub distinct_forms: usize,
}

/// One fully-assembled output row: one per collocation that passed the
/// frequency filter (spec §6 "Output" / §9 `write_out_worker`, which emits
/// exactly one row per collocation using its first recorded match and the
/// collocation-wide representations).
#[derive(Debug, Clone)]
pub struct OutputRow {
    pub structure_id: String,
    pub collocation_id: i64,
    pub components: Vec<ComponentColumns>,
    pub joint_representative_form_fixed: String,
    pub joint_representative_form_variable: String,
    pub frequency: i64,
    pub statistics: Option<RowStatistics>,
}

/// One row of the optional collocation-id -> sentence-id -> token-ids map
/// (spec §6 "collocation→sentence-id mapper").
#[derive(Debug, Clone)]
pub struct SentenceMapEntry {
    pub collocation_id: i64,
    pub sentence_id: String,
    pub token_ids: String,
}

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub separator: String,
    pub decimal_separator: String,
    /// Zero-based column index to sort by; `None` preserves insertion order.
    pub sort_by: Option<usize>,
    pub sort_reversed: bool,
    /// Split output into one file per structure rather than one combined file.
    pub multiple_output: bool,
    /// Whether statistics columns are included (spec §6, "no-stat" vs "stat" formatter).
    pub statistics: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            separator: "\t".to_string(),
            decimal_separator: ".".to_string(),
            sort_by: None,
            sort_reversed: false,
            multiple_output: false,
            statistics: true,
        }
    }
}

pub struct Writer {
    config: WriterConfig,
}

impl Writer {
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    fn header_repeat(&self) -> Vec<&'static str> {
        let mut cols = vec!["Lemma", "Representative_form", "RF_tag", "RF_scenario"];
        if self.config.statistics {
            cols.push("Distribution");
        }
        cols
    }

    fn header_right(&self) -> Vec<&'static str> {
        let mut cols = vec!["Joint_representative_form_fixed", "Joint_representative_form_variable", "Frequency"];
        if self.config.statistics {
            cols.extend(["Delta_p12", "Delta_p21", "LogDice_core", "LogDice_all", "Distinct_forms"]);
        }
        cols
    }

    /// Full header row for a structure with `num_components` real components.
    pub fn header(&self, num_components: usize) -> Vec<String> {
        let mut cols = vec!["Structure_ID".to_string()];
        let repeat = self.header_repeat();
        for i in 0..num_components {
            for h in &repeat {
                cols.push(format!("C{}_{}", i + 1, h));
            }
        }
        cols.push("Collocation_ID".to_string());
        cols.extend(self.header_right().into_iter().map(String::from));
        cols
    }

    fn fmt_f64(&self, value: f64) -> String {
        let s = format!("{:.5}", value);
        if self.config.decimal_separator != "." {
            s.replace('.', &self.config.decimal_separator)
        } else {
            s
        }
    }

    /// Formats one [`OutputRow`] into its column strings, padding to
    /// `num_components` slots for components the row's structure lacks a
    /// value for (spec §6, `write_out_worker`'s blank-fill behaviour).
    pub fn format_row(&self, row: &OutputRow, num_components: usize) -> Vec<String> {
        let mut cols = vec![row.structure_id.clone()];
        let blanks_per_component = self.header_repeat().len();

        for i in 0..num_components {
            match row.components.get(i) {
                Some(c) => {
                    cols.push(c.lemma.clone());
                    cols.push(c.representative_form.clone());
                    cols.push(c.rf_tag.clone());
                    cols.push(c.rf_scenario.clone());
                    if self.config.statistics {
                        cols.push(c.distribution.map(|d| d.to_string()).unwrap_or_default());
                    }
                }
                None => cols.extend(std::iter::repeat(String::new()).take(blanks_per_component)),
            }
        }

        cols.push(row.collocation_id.to_string());
        cols.push(row.joint_representative_form_fixed.clone());
        cols.push(row.joint_representative_form_variable.clone());
        cols.push(row.frequency.to_string());

        if self.config.statistics {
            match &row.statistics {
                Some(s) => {
                    cols.push(self.fmt_f64(s.delta_p12));
                    cols.push(self.fmt_f64(s.delta_p21));
                    cols.push(self.fmt_f64(s.logdice_core));
                    cols.push(self.fmt_f64(s.logdice_all));
                    cols.push(s.distinct_forms.to_string());
                }
                None => cols.extend(std::iter::repeat(String::new()).take(5)),
            }
        }

        cols
    }

    /// Sorts formatted rows by the configured column: numerically if the
    /// column's values all parse as integers, lexicographically (case
    /// folded) otherwise (spec §6, `Writer.sorted_rows`).
    pub fn sort(&self, rows: &mut [Vec<String>]) {
        let Some(col) = self.config.sort_by else { return };
        if rows.len() < 2 || rows.first().map(|r| r.len()).unwrap_or(0) <= col {
            return;
        }
        let numeric = rows.iter().all(|r| r[col].parse::<i64>().is_ok());
        if numeric {
            rows.sort_by_key(|r| r[col].parse::<i64>().unwrap_or(0));
        } else {
            rows.sort_by(|a, b| a[col].to_lowercase().cmp(&b[col].to_lowercase()));
        }
        if self.config.sort_reversed {
            rows.reverse();
        }
    }

    /// Builds the header plus every data row for one structure, sorted.
    pub fn rows_for_structure(&self, num_components: usize, rows: &[OutputRow]) -> Vec<Vec<String>> {
        let mut formatted: Vec<Vec<String>> = rows.iter().map(|r| self.format_row(r, num_components)).collect();
        self.sort(&mut formatted);
        formatted
    }
}

/// One structure's rows to write, keyed by structure id in processing order.
pub struct StructureOutput {
    pub structure_id: String,
    pub num_components: usize,
    pub rows: Vec<OutputRow>,
    pub sentence_map: Vec<SentenceMapEntry>,
}

/// Writes every structure's rows to `output`, following the writer's
/// single-file vs. one-file-per-structure mode, and (when `return_list` is
/// set) collecting rows in memory instead of touching the filesystem (spec
/// §6 "Output", `Writer.write_out`).
pub fn write_rows(
    output: Option<&Path>,
    structures: &[StructureOutput],
    sentence_map_dest: Option<&Path>,
    config: &WriterConfig,
    return_list: bool,
) -> SyncollResult<Option<Vec<Vec<String>>>> {
    let writer = Writer::new(config.clone());

    if let Some(dest) = sentence_map_dest {
        if config.multiple_output {
            std::fs::create_dir_all(dest).map_err(|e| SyncollError::io(format!("creating sentence map dir {}", dest.display()), e))?;
        } else if dest.exists() {
            if dest.is_dir() {
                std::fs::remove_dir_all(dest).map_err(|e| SyncollError::io(format!("clearing {}", dest.display()), e))?;
            } else {
                std::fs::remove_file(dest).map_err(|e| SyncollError::io(format!("clearing {}", dest.display()), e))?;
            }
        }
    }

    let mut in_memory = Vec::new();
    let single_file_header_written = std::cell::Cell::new(false);
    let mut single_file: Option<std::fs::File> = None;
    let mut single_map_entries: Vec<SentenceMapEntry> = Vec::new();

    if !config.multiple_output {
        if return_list && !structures.is_empty() {
            in_memory.push(writer.header(structures[0].num_components));
        } else if let Some(path) = output {
            let mut file = std::fs::File::create(path).map_err(|e| SyncollError::io(format!("creating {}", path.display()), e))?;
            if let Some(first) = structures.first() {
                write_tsv_row(&mut file, &writer.header(first.num_components), &config.separator)?;
            }
            single_file = Some(file);
            single_file_header_written.set(true);
        }
    }

    for structure in structures {
        let formatted = writer.rows_for_structure(structure.num_components, &structure.rows);

        if return_list {
            if config.multiple_output {
                in_memory.push(writer.header(structure.num_components));
            }
            in_memory.extend(formatted.clone());
        } else if config.multiple_output {
            if let Some(out_dir) = output {
                let path = out_dir.join(format!("{}.csv", structure.structure_id));
                let mut file = std::fs::File::create(&path).map_err(|e| SyncollError::io(format!("creating {}", path.display()), e))?;
                write_tsv_row(&mut file, &writer.header(structure.num_components), &config.separator)?;
                for row in &formatted {
                    write_tsv_row(&mut file, row, &config.separator)?;
                }
            }
        } else if let Some(file) = single_file.as_mut() {
            for row in &formatted {
                write_tsv_row(file, row, &config.separator)?;
            }
        }

        if let Some(dest) = sentence_map_dest {
            if config.multiple_output {
                let path = dest.join(format!("{}.tsv", structure.structure_id));
                write_sentence_map(&path, &structure.sentence_map)?;
            } else {
                single_map_entries.extend(structure.sentence_map.iter().cloned());
            }
        }
    }

    if !config.multiple_output {
        if let Some(dest) = sentence_map_dest {
            write_sentence_map(dest, &single_map_entries)?;
        }
    }

    if return_list {
        Ok(Some(in_memory))
    } else {
        Ok(None)
    }
}

fn write_tsv_row<W: std::io::Write>(w: &mut W, row: &[String], separator: &str) -> SyncollResult<()> {
    writeln!(w, "{}", row.join(separator)).map_err(|e| SyncollError::io("writing output row", e))
}

fn write_sentence_map(path: &Path, entries: &[SentenceMapEntry]) -> SyncollResult<()> {
    let mut file = std::fs::File::create(path).map_err(|e| SyncollError::io(format!("creating {}", path.display()), e))?;
    writeln!(file, "Collocation_id\tSentence_id\tToken_ids").map_err(|e| SyncollError::io("writing sentence map header", e))?;
    for entry in entries {
        writeln!(file, "{}\t{}\t{}", entry.collocation_id, entry.sentence_id, entry.token_ids)
            .map_err(|e| SyncollError::io("writing sentence map row", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(coll_id: i64, freq: i64) -> OutputRow {
        OutputRow {
            structure_id: "S1".to_string(),
            collocation_id: coll_id,
            components: vec![
                ComponentColumns {
                    lemma: "lep".to_string(),
                    representative_form: "lepa".to_string(),
                    rf_tag: "Agpfsn".to_string(),
                    rf_scenario: "ok".to_string(),
                    distribution: Some(3),
                },
                ComponentColumns {
                    lemma: "hiša".to_string(),
                    representative_form: "hiša".to_string(),
                    rf_tag: "Ncfsn".to_string(),
                    rf_scenario: "ok".to_string(),
                    distribution: Some(5),
                },
            ],
            joint_representative_form_fixed: "lepa hiša".to_string(),
            joint_representative_form_variable: "lepa hiša".to_string(),
            frequency: freq,
            statistics: Some(RowStatistics {
                delta_p12: 1.0,
                delta_p21: 1.0,
                logdice_core: 15.0,
                logdice_all: 15.0,
                distinct_forms: 1,
            }),
        }
    }

    #[test]
    fn header_repeats_columns_per_component() {
        let writer = Writer::new(WriterConfig::default());
        let header = writer.header(2);
        assert_eq!(header[0], "Structure_ID");
        assert_eq!(header[1], "C1_Lemma");
        assert_eq!(header[6], "C2_Lemma");
        assert!(header.contains(&"Collocation_ID".to_string()));
        assert!(header.contains(&"Delta_p12".to_string()));
    }

    #[test]
    fn logdice_15_law_round_trips_through_formatting() {
        let writer = Writer::new(WriterConfig::default());
        let row = sample_row(1, 1);
        let formatted = writer.format_row(&row, 2);
        let logdice_core_idx = writer.header(2).iter().position(|c| c == "LogDice_core").unwrap();
        assert_eq!(formatted[logdice_core_idx], "15.00000");
    }

    #[test]
    fn no_stat_mode_drops_statistics_columns() {
        let config = WriterConfig { statistics: false, ..WriterConfig::default() };
        let writer = Writer::new(config);
        let header = writer.header(1);
        assert!(!header.contains(&"Delta_p12".to_string()));
        assert!(!header.contains(&"C1_Distribution".to_string()));
    }

    #[test]
    fn sort_by_frequency_numeric() {
        let config = WriterConfig { sort_by: Some(0), ..WriterConfig::default() };
        let writer = Writer::new(config);
        let mut rows = vec![vec!["10".to_string()], vec!["2".to_string()], vec!["33".to_string()]];
        writer.sort(&mut rows);
        assert_eq!(rows, vec![vec!["2".to_string()], vec!["10".to_string()], vec!["33".to_string()]]);
    }

    #[test]
    fn write_rows_single_file_combines_structures() {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out.tsv");
        let structures = vec![StructureOutput {
            structure_id: "S1".to_string(),
            num_components: 2,
            rows: vec![sample_row(1, 2), sample_row(2, 1)],
            sentence_map: vec![SentenceMapEntry { collocation_id: 1, sentence_id: "s1".to_string(), token_ids: "s1.1|s1.2".to_string() }],
        }];
        let map_path = dir.path().join("map.tsv");
        write_rows(Some(&out_path), &structures, Some(&map_path), &WriterConfig::default(), false).unwrap();

        let content = std::fs::read_to_string(&out_path).unwrap();
        assert_eq!(content.lines().count(), 3); // header + 2 rows
        let map_content = std::fs::read_to_string(&map_path).unwrap();
        assert_eq!(map_content.lines().count(), 2); // header + 1 row
    }

    #[test]
    fn write_rows_return_list_mode_produces_no_files() {
        let structures = vec![StructureOutput {
            structure_id: "S1".to_string(),
            num_components: 2,
            rows: vec![sample_row(1, 2)],
            sentence_map: vec![],
        }];
        let rows = write_rows(None, &structures, None, &WriterConfig::default(), true).unwrap().unwrap();
        assert_eq!(rows.len(), 2); // header + 1 row
    }
}
