//! SQL schema for the hoplink SQLite store.
//!
//! Executed once at connection startup. Compatible with databases created by
//! earlier deployments: every statement is `IF NOT EXISTS`, and the column
//! names and defaults of `mappings` are unchanged.

/// Full schema DDL; idempotent thanks to `CREATE … IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS mappings (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword        TEXT NOT NULL,
    src            TEXT NOT NULL,
    creative       TEXT NOT NULL,
    our_param      TEXT NOT NULL UNIQUE,
    version        INTEGER NOT NULL DEFAULT 1,
    previous_param TEXT,           -- our_param of version - 1, NULL for v1
    created_at     DATETIME DEFAULT CURRENT_TIMESTAMP
);

-- One row per (triple, version); also serves the head-of-chain lookup.
CREATE UNIQUE INDEX IF NOT EXISTS mappings_triple_version_idx
    ON mappings(keyword, src, creative, version);
CREATE INDEX IF NOT EXISTS mappings_created_idx ON mappings(created_at);

PRAGMA user_version = 1;
";
