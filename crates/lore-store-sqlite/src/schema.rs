//! SQL schema for the Lore SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,
    full_name     TEXT,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'user',   -- 'admin' | 'editor' | 'user'
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    parent_id   TEXT REFERENCES categories(category_id),
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    tag_id TEXT PRIMARY KEY,
    name   TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS articles (
    article_id         TEXT PRIMARY KEY,
    title              TEXT NOT NULL,
    body               TEXT NOT NULL,
    status             TEXT NOT NULL DEFAULT 'draft',
    category_id        TEXT NOT NULL REFERENCES categories(category_id),
    created_by         TEXT NOT NULL REFERENCES users(user_id),
    updated_by         TEXT NOT NULL REFERENCES users(user_id),
    assigned_editor_id TEXT REFERENCES users(user_id),
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS article_tags (
    article_id TEXT NOT NULL REFERENCES articles(article_id),
    tag_id     TEXT NOT NULL REFERENCES tags(tag_id),
    PRIMARY KEY (article_id, tag_id)
);

-- Snapshots are strictly append-only and outlive their article, so neither
-- article_id nor category_id is a foreign key.
CREATE TABLE IF NOT EXISTS article_versions (
    version_id     TEXT PRIMARY KEY,
    article_id     TEXT NOT NULL,
    version_number INTEGER NOT NULL CHECK (version_number >= 1),
    title          TEXT NOT NULL,
    body           TEXT NOT NULL,
    status         TEXT NOT NULL,
    category_id    TEXT NOT NULL,
    created_by     TEXT NOT NULL REFERENCES users(user_id),
    created_at     TEXT NOT NULL,
    UNIQUE (article_id, version_number)
);

-- Append-only audit trail.
CREATE TABLE IF NOT EXISTS article_history (
    history_id  TEXT PRIMARY KEY,
    article_id  TEXT NOT NULL REFERENCES articles(article_id),
    user_id     TEXT NOT NULL REFERENCES users(user_id),
    action      TEXT NOT NULL,   -- 'create' | 'update' | 'status_change'
    old_status  TEXT,
    new_status  TEXT,
    recorded_at TEXT NOT NULL,
    version_id  TEXT REFERENCES article_versions(version_id),
    CHECK (action != 'status_change'
           OR (old_status IS NOT NULL AND new_status IS NOT NULL))
);

-- Bytes live either in `content` or at `file_path`, never both.
CREATE TABLE IF NOT EXISTS files (
    file_id           TEXT PRIMARY KEY,
    filename          TEXT NOT NULL,
    original_filename TEXT NOT NULL,
    mime_type         TEXT NOT NULL,
    size              INTEGER NOT NULL,
    description       TEXT,
    uploaded_by       TEXT NOT NULL REFERENCES users(user_id),
    uploaded_at       TEXT NOT NULL,
    stored_in_db      INTEGER NOT NULL,
    content           BLOB,
    file_path         TEXT,
    CHECK ((stored_in_db = 1 AND content IS NOT NULL AND file_path IS NULL)
        OR (stored_in_db = 0 AND content IS NULL AND file_path IS NOT NULL))
);

-- Deliberately not unique on (article_id, file_id).
CREATE TABLE IF NOT EXISTS article_files (
    link_id        TEXT PRIMARY KEY,
    article_id     TEXT NOT NULL REFERENCES articles(article_id),
    file_id        TEXT NOT NULL REFERENCES files(file_id),
    reference_text TEXT,
    added_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS articles_status_idx   ON articles(status);
CREATE INDEX IF NOT EXISTS articles_category_idx ON articles(category_id);
CREATE INDEX IF NOT EXISTS articles_updated_idx  ON articles(updated_at);
CREATE INDEX IF NOT EXISTS history_article_idx   ON article_history(article_id);
CREATE INDEX IF NOT EXISTS files_article_idx     ON article_files(article_id);

PRAGMA user_version = 1;
";

/// Creates the fallback category unless it already exists.
pub const SEED_GENERAL: &str = "
INSERT INTO categories (category_id, name, description, parent_id, created_at)
SELECT ?1, ?2, 'Fallback category for uncategorised articles', NULL, ?3
WHERE NOT EXISTS (SELECT 1 FROM categories WHERE name = ?2)
";
