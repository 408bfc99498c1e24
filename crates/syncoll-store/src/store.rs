//! The collocation store itself: resume-safe SQLite connection, match
//! insertion, frequency filtering, dispersion counting and word-frequency
//! bookkeeping (spec §6/§9). Grounded on
//! `original_source/cordex/matcher/match_store.py`,
//! `original_source/cordex/statistics/word_stats.py` and
//! `original_source/cordex/database/database.py` (resume-on-existing-file
//! semantics: schema is only created when the database file did not
//! already exist).

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use syncoll_core::{SyncollError, SyncollResult};

use crate::schema::init_schema;

/// The Slovenian preposition voicing alternation (k/h, s/z) a single-letter
/// lemma may also have been recorded under, used by
/// [`Store::load_dispersion`]'s fallback lookup.
fn voicing_alternate(lemma: &str) -> Option<&'static str> {
    match lemma {
        "k" => Some("h"),
        "h" => Some("k"),
        "s" => Some("z"),
        "z" => Some("s"),
        _ => None,
    }
}

/// One component's observed token within a single structure match, ready
/// to be persisted. Deliberately decoupled from `syncoll_core::Token` so
/// this crate does not need to depend on the matcher or structures crates.
#[derive(Debug, Clone)]
pub struct MatchedToken {
    pub component_id: String,
    pub sentence_id: String,
    pub word_id: String,
    pub int_id: i64,
    pub lemma: String,
    pub text: String,
    pub tag: String,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) the collocation database at `path`. Schema
    /// creation is idempotent (`CREATE TABLE IF NOT EXISTS`), so reopening
    /// an existing database resumes rather than recreating it.
    pub fn open(path: &Path) -> SyncollResult<Self> {
        let conn = Connection::open(path).map_err(|e| SyncollError::store_with_source(format!("opening store {}", path.display()), e))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> SyncollResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| SyncollError::store_with_source("opening in-memory store", e))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn commit(&self) -> SyncollResult<()> {
        // SQLite in auto-commit mode persists each statement already; this
        // exists so callers can express the per-file commit point from the
        // pipeline driver explicitly, matching the original's structure.
        Ok(())
    }

    pub fn is_step_done(&self, step: &str) -> SyncollResult<bool> {
        self.conn
            .query_row("SELECT 1 FROM StepsDone WHERE step = ?1", params![step], |_| Ok(()))
            .optional()
            .map(|r| r.is_some())
            .map_err(|e| SyncollError::store_with_source("checking step", e))
    }

    pub fn mark_step_done(&self, step: &str) -> SyncollResult<()> {
        self.conn
            .execute("INSERT OR IGNORE INTO StepsDone (step) VALUES (?1)", params![step])
            .map(|_| ())
            .map_err(|e| SyncollError::store_with_source("marking step done", e))
    }

    pub fn is_file_done(&self, path: &str) -> SyncollResult<bool> {
        self.conn
            .query_row("SELECT 1 FROM Files WHERE path = ?1", params![path], |_| Ok(()))
            .optional()
            .map(|r| r.is_some())
            .map_err(|e| SyncollError::store_with_source("checking file", e))
    }

    pub fn mark_file_done(&self, path: &str) -> SyncollResult<()> {
        self.conn
            .execute("INSERT OR IGNORE INTO Files (path) VALUES (?1)", params![path])
            .map(|_| ())
            .map_err(|e| SyncollError::store_with_source("marking file done", e))
    }

    /// Finds or creates the collocation row for `(structure_id, key)`,
    /// inserts one `Matches` row per component token, links them through a
    /// fresh `match_group_id`, and bumps `match_num`.
    pub fn add_match(&self, structure_id: &str, key: &str, sentence_id: &str, tokens: &[MatchedToken]) -> SyncollResult<i64> {
        let collocation_id = self.find_or_create_collocation(structure_id, key)?;

        let match_group_id: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(match_group_id), 0) + 1 FROM Matches WHERE collocation_id = ?1",
                params![collocation_id],
                |row| row.get(0),
            )
            .map_err(|e| SyncollError::store_with_source("computing next match group", e))?;

        for token in tokens {
            self.conn
                .execute(
                    "INSERT INTO Matches (collocation_id, match_group_id, component_id, sentence_id, word_id, int_id, lemma, text, tag)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        collocation_id,
                        match_group_id,
                        token.component_id,
                        token.sentence_id,
                        token.word_id,
                        token.int_id,
                        token.lemma,
                        token.text,
                        token.tag,
                    ],
                )
                .map_err(|e| SyncollError::store_with_source("inserting match row", e))?;
        }

        self.conn
            .execute(
                "INSERT INTO CollocationMatches (collocation_id, match_group_id, sentence_id) VALUES (?1, ?2, ?3)",
                params![collocation_id, match_group_id, sentence_id],
            )
            .map_err(|e| SyncollError::store_with_source("linking collocation match", e))?;

        self.conn
            .execute("UPDATE Collocations SET match_num = match_num + 1 WHERE id = ?1", params![collocation_id])
            .map_err(|e| SyncollError::store_with_source("incrementing match_num", e))?;

        Ok(collocation_id)
    }

    fn find_or_create_collocation(&self, structure_id: &str, key: &str) -> SyncollResult<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM Collocations WHERE structure_id = ?1 AND coll_key = ?2",
                params![structure_id, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| SyncollError::store_with_source("looking up collocation", e))?;
        if let Some(id) = existing {
            return Ok(id);
        }
        self.conn
            .execute(
                "INSERT INTO Collocations (structure_id, coll_key, match_num) VALUES (?1, ?2, 0)",
                params![structure_id, key],
            )
            .map_err(|e| SyncollError::store_with_source("inserting collocation", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Collocation ids whose `match_num` is at least `min_freq` (spec §6
    /// "frequency filter").
    pub fn frequency_filter(&self, structure_id: &str, min_freq: i64) -> SyncollResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM Collocations WHERE structure_id = ?1 AND match_num >= ?2")
            .map_err(|e| SyncollError::store_with_source("preparing frequency filter", e))?;
        let ids = stmt
            .query_map(params![structure_id, min_freq], |row| row.get(0))
            .map_err(|e| SyncollError::store_with_source("running frequency filter", e))?
            .collect::<Result<Vec<i64>, _>>()
            .map_err(|e| SyncollError::store_with_source("reading frequency filter rows", e))?;
        Ok(ids)
    }

    pub fn match_num(&self, collocation_id: i64) -> SyncollResult<i64> {
        self.conn
            .query_row("SELECT match_num FROM Collocations WHERE id = ?1", params![collocation_id], |row| row.get(0))
            .map_err(|e| SyncollError::store_with_source("reading match_num", e))
    }

    pub fn set_representation(&self, collocation_id: i64, component_id: &str, text: Option<&str>, msd: Option<&str>) -> SyncollResult<()> {
        self.conn
            .execute(
                "INSERT INTO Representations (collocation_id, component_id, text, msd) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collocation_id, component_id) DO UPDATE SET text = excluded.text, msd = excluded.msd",
                params![collocation_id, component_id, text, msd],
            )
            .map(|_| ())
            .map_err(|e| SyncollError::store_with_source("writing representation", e))
    }

    pub fn get_representations(&self, collocation_id: i64) -> SyncollResult<BTreeMap<String, (Option<String>, Option<String>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT component_id, text, msd FROM Representations WHERE collocation_id = ?1")
            .map_err(|e| SyncollError::store_with_source("preparing representation read", e))?;
        let rows = stmt
            .query_map(params![collocation_id], |row| Ok((row.get::<_, String>(0)?, row.get(1)?, row.get(2)?)))
            .map_err(|e| SyncollError::store_with_source("reading representations", e))?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (component_id, text, msd) = row.map_err(|e| SyncollError::store_with_source("decoding representation row", e))?;
            out.insert(component_id, (text, msd));
        }
        Ok(out)
    }

    /// Component tokens recorded for every match of `collocation_id`,
    /// grouped by `match_group_id` — the input a representation pass needs
    /// to feed recipes (spec §5, §6).
    pub fn matches_for(&self, collocation_id: i64) -> SyncollResult<Vec<Vec<MatchedToken>>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT match_group_id, component_id, sentence_id, word_id, int_id, lemma, text, tag
                 FROM Matches WHERE collocation_id = ?1 ORDER BY match_group_id",
            )
            .map_err(|e| SyncollError::store_with_source("preparing matches_for", e))?;
        let rows = stmt
            .query_map(params![collocation_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    MatchedToken {
                        component_id: row.get(1)?,
                        sentence_id: row.get(2)?,
                        word_id: row.get(3)?,
                        int_id: row.get(4)?,
                        lemma: row.get(5)?,
                        text: row.get(6)?,
                        tag: row.get(7)?,
                    },
                ))
            })
            .map_err(|e| SyncollError::store_with_source("running matches_for", e))?;

        let mut groups: BTreeMap<i64, Vec<MatchedToken>> = BTreeMap::new();
        for row in rows {
            let (group_id, token) = row.map_err(|e| SyncollError::store_with_source("decoding matches_for row", e))?;
            groups.entry(group_id).or_default().push(token);
        }
        Ok(groups.into_values().collect())
    }

    /// Step-idempotent dispersion pass: counts the distinct collocations
    /// each `(structure_id, component_id, lemma)` triple occurs in, once per
    /// collocation regardless of how many sentences matched it
    /// (`determine_collocation_dispersions`'s `dispersions[(structure_id,
    /// component_id, lemma)] += 1` per collocation). Collocations below
    /// `min_freq` are excluded, matching the original's
    /// `if not self.frequency_filter(collocation_id): continue`. Skips work
    /// entirely if the step was already recorded done (spec §6 "Dispersion
    /// pass").
    pub fn determine_collocation_dispersions(&self, structure_id: &str, min_freq: i64) -> SyncollResult<()> {
        let step = format!("dispersions:{structure_id}");
        if self.is_step_done(&step)? {
            return Ok(());
        }

        self.conn
            .execute(
                "INSERT INTO Dispersions (structure_id, component_id, lemma, sentence_count)
                 SELECT ?1, m.component_id, m.lemma, COUNT(DISTINCT m.collocation_id)
                 FROM Matches m
                 JOIN Collocations c ON c.id = m.collocation_id
                 WHERE c.structure_id = ?1 AND c.match_num >= ?2
                 GROUP BY m.component_id, m.lemma
                 ON CONFLICT(structure_id, component_id, lemma) DO UPDATE SET sentence_count = excluded.sentence_count",
                params![structure_id, min_freq],
            )
            .map_err(|e| SyncollError::store_with_source("computing dispersions", e))?;

        self.mark_step_done(&step)
    }

    fn load_dispersion_exact(&self, structure_id: &str, component_id: &str, lemma: &str) -> SyncollResult<Option<i64>> {
        self.conn
            .query_row(
                "SELECT sentence_count FROM Dispersions WHERE structure_id = ?1 AND component_id = ?2 AND lemma = ?3",
                params![structure_id, component_id, lemma],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| SyncollError::store_with_source("reading dispersion", e))
    }

    /// Looks up a core word's dispersion count, falling back to the
    /// Slovenian s/z, k/h voicing alternation of `lemma` when the exact key
    /// is missing and `lang == "sl"`, and to `1` when neither key is found
    /// (`formatter.py`'s `StatsFormatter.content_repeat`).
    pub fn load_dispersion(&self, structure_id: &str, component_id: &str, lemma: &str, lang: &str) -> SyncollResult<i64> {
        if let Some(count) = self.load_dispersion_exact(structure_id, component_id, lemma)? {
            return Ok(count);
        }

        if lang == "sl" {
            if let Some(alternate) = voicing_alternate(lemma) {
                if let Some(count) = self.load_dispersion_exact(structure_id, component_id, alternate)? {
                    tracing::info!(structure_id, component_id, lemma, alternate, "dispersion fixed via voicing alternation");
                    return Ok(count);
                }
            }
        }

        tracing::info!(structure_id, component_id, lemma, "dispersion not fixed, defaulting to 1");
        Ok(1)
    }

    /// Upserts per-lemma, per-POS word counts and bumps the corpus-wide
    /// word count (spec §6, `WordStats.add_words`).
    pub fn add_words(&self, observations: &[(String, String)]) -> SyncollResult<()> {
        let mut pos_totals: BTreeMap<String, i64> = BTreeMap::new();
        for (lemma, pos) in observations {
            self.conn
                .execute(
                    "INSERT INTO UniqWords (lemma, pos, count) VALUES (?1, ?2, 1)
                     ON CONFLICT(lemma, pos) DO UPDATE SET count = count + 1",
                    params![lemma, pos],
                )
                .map_err(|e| SyncollError::store_with_source("upserting UniqWords", e))?;
            *pos_totals.entry(pos.clone()).or_insert(0) += 1;
        }
        for (pos, delta) in pos_totals {
            self.conn
                .execute(
                    "INSERT INTO WordCountByPOS (pos, count) VALUES (?1, ?2)
                     ON CONFLICT(pos) DO UPDATE SET count = count + excluded.count",
                    params![pos, delta],
                )
                .map_err(|e| SyncollError::store_with_source("upserting WordCountByPOS", e))?;
        }
        self.conn
            .execute("UPDATE NumWords SET count = count + ?1 WHERE id = 0", params![observations.len() as i64])
            .map_err(|e| SyncollError::store_with_source("updating NumWords", e))?;
        Ok(())
    }

    pub fn num_words(&self) -> SyncollResult<i64> {
        self.conn
            .query_row("SELECT count FROM NumWords WHERE id = 0", [], |row| row.get(0))
            .map_err(|e| SyncollError::store_with_source("reading NumWords", e))
    }

    /// Per-lemma, per-POS frequency (spec §9 "`num_words`/`WordCountByPOS`
    /// granularity"), the base rate a core word's LogDice/Delta-P inputs are
    /// drawn from.
    pub fn word_freq(&self, lemma: &str, pos: &str) -> SyncollResult<i64> {
        self.conn
            .query_row("SELECT count FROM UniqWords WHERE lemma = ?1 AND pos = ?2", params![lemma, pos], |row| row.get(0))
            .optional()
            .map_err(|e| SyncollError::store_with_source("reading UniqWords", e))
            .map(|v| v.unwrap_or(0))
    }

    /// Forms observed for `lemma` among tokens already seen in matches
    /// (descending by frequency), for agreement lookups that prefer a
    /// same-lemma peer over the external lookup backend (spec §9
    /// "`available_words` ordering").
    pub fn available_words(&self, lemma: &str) -> SyncollResult<Vec<(String, String, i64)>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT tag, text, COUNT(*) as n FROM Matches WHERE lemma = ?1
                 GROUP BY tag, text ORDER BY n DESC",
            )
            .map_err(|e| SyncollError::store_with_source("preparing available_words", e))?;
        let rows = stmt
            .query_map(params![lemma], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .map_err(|e| SyncollError::store_with_source("running available_words", e))?
            .collect::<Result<Vec<(String, String, i64)>, _>>()
            .map_err(|e| SyncollError::store_with_source("reading available_words rows", e))?;
        Ok(rows)
    }

    pub fn word_count_by_pos(&self, pos: &str) -> SyncollResult<i64> {
        self.conn
            .query_row("SELECT count FROM WordCountByPOS WHERE pos = ?1", params![pos], |row| row.get(0))
            .optional()
            .map_err(|e| SyncollError::store_with_source("reading WordCountByPOS", e))
            .map(|v| v.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(component_id: &str, lemma: &str, text: &str) -> MatchedToken {
        MatchedToken {
            component_id: component_id.to_string(),
            sentence_id: "s1".to_string(),
            word_id: "1".to_string(),
            int_id: 1,
            lemma: lemma.to_string(),
            text: text.to_string(),
            tag: "Ncmsn".to_string(),
        }
    }

    #[test]
    fn add_match_reuses_collocation_row_and_bumps_match_num() {
        let store = Store::in_memory().unwrap();
        let tokens = vec![token("c1", "pes", "psa")];
        let id1 = store.add_match("S1", "pes", "s1", &tokens).unwrap();
        let id2 = store.add_match("S1", "pes", "s2", &tokens).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.match_num(id1).unwrap(), 2);
    }

    #[test]
    fn frequency_filter_respects_threshold() {
        let store = Store::in_memory().unwrap();
        let tokens = vec![token("c1", "pes", "psa")];
        let id = store.add_match("S1", "pes", "s1", &tokens).unwrap();
        assert!(store.frequency_filter("S1", 2).unwrap().is_empty());
        store.add_match("S1", "pes", "s2", &tokens).unwrap();
        assert_eq!(store.frequency_filter("S1", 2).unwrap(), vec![id]);
    }

    #[test]
    fn available_words_orders_by_descending_frequency() {
        let store = Store::in_memory().unwrap();
        store.add_match("S1", "pes", "s1", &[token("c1", "pes", "psa")]).unwrap();
        store.add_match("S1", "pes", "s2", &[token("c1", "pes", "psa")]).unwrap();
        store.add_match("S1", "pes", "s3", &[token("c1", "pes", "psu")]).unwrap();
        let forms = store.available_words("pes").unwrap();
        assert_eq!(forms[0], ("Ncmsn".to_string(), "psa".to_string(), 2));
    }

    #[test]
    fn step_idempotency_skips_repeated_dispersion_runs() {
        let store = Store::in_memory().unwrap();
        let tokens = vec![token("c1", "pes", "psa")];
        store.add_match("S1", "pes", "s1", &tokens).unwrap();
        store.determine_collocation_dispersions("S1", 0).unwrap();
        assert_eq!(store.load_dispersion("S1", "c1", "pes", "en").unwrap(), 1);
        store.add_match("S1", "pes", "s2", &tokens).unwrap();
        store.determine_collocation_dispersions("S1", 0).unwrap();
        // step already marked done, so the second match (same collocation) isn't counted
        assert_eq!(store.load_dispersion("S1", "c1", "pes", "en").unwrap(), 1);
    }

    #[test]
    fn dispersion_counts_distinct_collocations_not_sentences() {
        let store = Store::in_memory().unwrap();
        let tokens = vec![token("c1", "pes", "psa")];
        store.add_match("S1", "pes", "s1", &tokens).unwrap();
        // a second match of the same collocation, in a different sentence,
        // must not bump the dispersion count a second time
        store.add_match("S1", "pes", "s2", &tokens).unwrap();
        store.determine_collocation_dispersions("S1", 0).unwrap();
        assert_eq!(store.load_dispersion("S1", "c1", "pes", "en").unwrap(), 1);
    }

    #[test]
    fn dispersion_pass_excludes_collocations_below_min_freq() {
        let store = Store::in_memory().unwrap();
        // "pes" only reaches match_num 1, below the threshold
        store.add_match("S1", "pes", "s1", &[token("c1", "pes", "psa")]).unwrap();
        // two distinct collocations, each reaching the threshold, both carrying lemma "maček"
        store.add_match("S1", "maček1", "s1", &[token("c1", "maček", "mačka")]).unwrap();
        store.add_match("S1", "maček1", "s2", &[token("c1", "maček", "mačka")]).unwrap();
        store.add_match("S1", "maček2", "s1", &[token("c1", "maček", "mačke")]).unwrap();
        store.add_match("S1", "maček2", "s2", &[token("c1", "maček", "mačke")]).unwrap();
        store.determine_collocation_dispersions("S1", 2).unwrap();
        // never entered Dispersions, so load_dispersion falls back to its unfixable default
        assert_eq!(store.load_dispersion("S1", "c1", "pes", "en").unwrap(), 1);
        assert_eq!(store.load_dispersion("S1", "c1", "maček", "en").unwrap(), 2);
    }

    #[test]
    fn load_dispersion_falls_back_to_voicing_alternate_for_slovenian() {
        let store = Store::in_memory().unwrap();
        store.add_match("S1", "k1", "s1", &[token("c1", "k", "k")]).unwrap();
        store.add_match("S1", "k2", "s2", &[token("c1", "k", "k")]).unwrap();
        store.determine_collocation_dispersions("S1", 0).unwrap();
        assert_eq!(store.load_dispersion("S1", "c1", "h", "sl").unwrap(), 2);
    }

    #[test]
    fn load_dispersion_defaults_to_one_when_unfixable() {
        let store = Store::in_memory().unwrap();
        assert_eq!(store.load_dispersion("S1", "c1", "neobstojec", "sl").unwrap(), 1);
        assert_eq!(store.load_dispersion("S1", "c1", "neobstojec", "en").unwrap(), 1);
    }
}
