//! SQL schema for the Boutique SQLite store.
//!
//! Executed on every connection open and whenever `ensure_schema` is called.
//! Future migrations will be gated on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `foreign_keys` is a per-connection setting, so it lives here rather than
/// in a one-off migration.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS leads (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp   INTEGER NOT NULL,        -- seconds since epoch; last touched
    name        TEXT    NOT NULL,
    email       TEXT    NOT NULL UNIQUE, -- case-sensitive natural key
    message     TEXT    NOT NULL DEFAULT ''
);

-- Feedback is strictly append-only.
CREATE TABLE IF NOT EXISTS feedback (
    lead_id     INTEGER NOT NULL,
    timestamp   INTEGER NOT NULL,        -- milliseconds since epoch
    question    TEXT    NOT NULL,
    PRIMARY KEY (lead_id, timestamp),
    FOREIGN KEY (lead_id) REFERENCES leads(id)
        ON DELETE CASCADE
        ON UPDATE CASCADE
);

PRAGMA user_version = 1;
";
