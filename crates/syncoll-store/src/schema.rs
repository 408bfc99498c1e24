//! SQLite schema creation (spec §6/§9 "Collocation store"), grounded on
//! `original_source/cordex/matcher/match_store.py` and
//! `original_source/cordex/statistics/word_stats.py`.

use rusqlite::Connection;
use syncoll_core::{SyncollError, SyncollResult};

pub fn init_schema(conn: &Connection) -> SyncollResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS Collocations (
            id           INTEGER PRIMARY KEY,
            structure_id TEXT NOT NULL,
            coll_key     TEXT NOT NULL,
            match_num    INTEGER NOT NULL DEFAULT 0,
            UNIQUE(structure_id, coll_key)
        );

        CREATE TABLE IF NOT EXISTS Matches (
            id             INTEGER PRIMARY KEY,
            collocation_id INTEGER NOT NULL REFERENCES Collocations(id),
            match_group_id INTEGER NOT NULL,
            component_id   TEXT NOT NULL,
            sentence_id    TEXT NOT NULL,
            word_id        TEXT NOT NULL,
            int_id         INTEGER NOT NULL,
            lemma          TEXT NOT NULL,
            text           TEXT NOT NULL,
            tag            TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_collocation ON Matches(collocation_id);
        CREATE INDEX IF NOT EXISTS idx_matches_group ON Matches(collocation_id, match_group_id);

        CREATE TABLE IF NOT EXISTS CollocationMatches (
            collocation_id INTEGER NOT NULL REFERENCES Collocations(id),
            match_group_id INTEGER NOT NULL,
            sentence_id    TEXT NOT NULL,
            PRIMARY KEY (collocation_id, match_group_id)
        );

        CREATE TABLE IF NOT EXISTS Representations (
            collocation_id INTEGER NOT NULL REFERENCES Collocations(id),
            component_id   TEXT NOT NULL,
            text           TEXT,
            msd            TEXT,
            PRIMARY KEY (collocation_id, component_id)
        );

        CREATE TABLE IF NOT EXISTS Dispersions (
            structure_id TEXT NOT NULL,
            component_id TEXT NOT NULL,
            lemma        TEXT NOT NULL,
            sentence_count INTEGER NOT NULL,
            PRIMARY KEY (structure_id, component_id, lemma)
        );

        CREATE TABLE IF NOT EXISTS UniqWords (
            lemma TEXT NOT NULL,
            pos   TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (lemma, pos)
        );

        CREATE TABLE IF NOT EXISTS WordCountByPOS (
            pos   TEXT PRIMARY KEY,
            count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS NumWords (
            id    INTEGER PRIMARY KEY CHECK (id = 0),
            count INTEGER NOT NULL DEFAULT 0
        );
        INSERT OR IGNORE INTO NumWords (id, count) VALUES (0, 0);

        CREATE TABLE IF NOT EXISTS StepsDone (
            step TEXT PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS Files (
            path TEXT PRIMARY KEY
        );
        "#,
    )
    .map_err(|e| SyncollError::store_with_source("creating schema", e))
}
