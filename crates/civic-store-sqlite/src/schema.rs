//! SQL schema for the portal's SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    phone         TEXT NOT NULL UNIQUE,
    role          TEXT NOT NULL,   -- 'citizen' | 'admin' | 'official'
    department    TEXT,
    created_at    TEXT NOT NULL,
    last_login    TEXT,
    password_hash TEXT NOT NULL    -- argon2 PHC string
);

-- `seq` gives newest-first ordering independent of clock resolution.
CREATE TABLE IF NOT EXISTS complaints (
    seq                  INTEGER PRIMARY KEY AUTOINCREMENT,
    complaint_id         TEXT NOT NULL UNIQUE,
    title                TEXT NOT NULL,
    description          TEXT NOT NULL,
    category             TEXT NOT NULL,
    subcategory          TEXT,
    location             TEXT NOT NULL,
    landmark             TEXT,
    priority             TEXT NOT NULL,
    status               TEXT NOT NULL,
    submitter_name       TEXT NOT NULL,
    submitter_phone      TEXT NOT NULL,
    submitter_email      TEXT,
    images               TEXT NOT NULL DEFAULT '[]',   -- JSON array of data URIs
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    assigned_to          TEXT,
    resolution_notes     TEXT,
    estimated_resolution TEXT
);

-- Status history is strictly append-only.
-- No UPDATE is ever issued against this table.
CREATE TABLE IF NOT EXISTS complaint_history (
    entry_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    complaint_id TEXT NOT NULL REFERENCES complaints(complaint_id) ON DELETE CASCADE,
    recorded_at  TEXT NOT NULL,
    status       TEXT NOT NULL,
    notes        TEXT NOT NULL,
    updated_by   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    notification_id TEXT NOT NULL UNIQUE,
    kind            TEXT NOT NULL,
    title           TEXT NOT NULL,
    message         TEXT NOT NULL,
    complaint_id    TEXT,            -- not a foreign key; may dangle
    user_id         TEXT NOT NULL,   -- user id, phone number or 'all'
    user_role       TEXT,
    is_read         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    priority        TEXT NOT NULL,
    action_url      TEXT
);

-- Opaque JSON values: sessions and the selected language.
CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS complaints_phone_idx    ON complaints(submitter_phone);
CREATE INDEX IF NOT EXISTS complaints_category_idx ON complaints(category);
CREATE INDEX IF NOT EXISTS complaints_created_idx  ON complaints(created_at);
CREATE INDEX IF NOT EXISTS history_complaint_idx   ON complaint_history(complaint_id);

PRAGMA user_version = 1;
";
