//! SQL schema for the Tandem SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id            TEXT PRIMARY KEY,
    created_at         TEXT NOT NULL,
    display_name       TEXT NOT NULL,
    active             INTEGER NOT NULL DEFAULT 1,
    points             INTEGER NOT NULL DEFAULT 0,
    level              INTEGER NOT NULL DEFAULT 1,
    highest_level      INTEGER NOT NULL DEFAULT 1,
    streak_days        INTEGER NOT NULL DEFAULT 0,
    questions_answered INTEGER NOT NULL DEFAULT 0,
    interaction_count  INTEGER NOT NULL DEFAULT 0,
    stats              TEXT NOT NULL DEFAULT '{}'   -- JSON UserStats
);

-- One directional half of a relationship. Every row has a mirror with
-- user_id/partner_id swapped and the same pair_id; the transactional write
-- path never updates one side without the other.
CREATE TABLE IF NOT EXISTS partnerships (
    partnership_id        TEXT PRIMARY KEY,
    pair_id               TEXT NOT NULL,
    user_id               TEXT NOT NULL REFERENCES users(user_id),
    partner_id            TEXT NOT NULL REFERENCES users(user_id),
    status                TEXT NOT NULL,
    partnership_level     INTEGER NOT NULL DEFAULT 1,
    streak_days           INTEGER NOT NULL DEFAULT 0,
    longest_streak        INTEGER NOT NULL DEFAULT 0,
    interaction_count     INTEGER NOT NULL DEFAULT 0,
    last_interaction_date TEXT,                     -- YYYY-MM-DD
    last_milestone        INTEGER,
    achievements          TEXT NOT NULL DEFAULT '[]',
    mutual_answer_count   INTEGER NOT NULL DEFAULT 0,
    custom_settings       TEXT NOT NULL,            -- JSON PartnershipSettings
    stats                 TEXT NOT NULL DEFAULT '{}',
    created_at            TEXT NOT NULL,
    UNIQUE (user_id, partner_id),
    CHECK  (user_id != partner_id)
);

-- The interaction ledger is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS interactions (
    interaction_id   TEXT PRIMARY KEY,
    pair_id          TEXT NOT NULL,
    partnership_id   TEXT NOT NULL REFERENCES partnerships(partnership_id),
    interaction_type TEXT NOT NULL,
    content          TEXT NOT NULL,                 -- JSON payload
    metadata         TEXT,                          -- JSON or NULL
    recorded_at      TEXT NOT NULL                  -- ISO 8601 UTC
);

CREATE TABLE IF NOT EXISTS questions (
    question_id           TEXT PRIMARY KEY,
    text                  TEXT NOT NULL,
    category              TEXT NOT NULL,
    active                INTEGER NOT NULL DEFAULT 1,
    min_level             INTEGER NOT NULL DEFAULT 1,
    max_level             INTEGER NOT NULL DEFAULT 100,
    repeat_after_days     INTEGER,                  -- NULL: never repeat
    times_asked           INTEGER NOT NULL DEFAULT 0,
    times_skipped         INTEGER NOT NULL DEFAULT 0,
    times_rated           INTEGER NOT NULL DEFAULT 0,
    skip_rate             REAL NOT NULL DEFAULT 0,
    avg_response_length   REAL NOT NULL DEFAULT 0,
    avg_difficulty_rating REAL NOT NULL DEFAULT 0,
    created_at            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS answers (
    answer_id         TEXT PRIMARY KEY,
    user_id           TEXT NOT NULL REFERENCES users(user_id),
    question_id       TEXT NOT NULL REFERENCES questions(question_id),
    pair_id           TEXT,
    text              TEXT,
    skipped           INTEGER NOT NULL DEFAULT 0,
    skip_reason       TEXT,
    visibility        TEXT NOT NULL DEFAULT 'partners_only',
    reactions         TEXT NOT NULL DEFAULT '[]',   -- JSON array, append-only
    difficulty_rating INTEGER,
    metadata          TEXT NOT NULL DEFAULT '{}',   -- JSON AnswerMetadata
    answered_on       TEXT NOT NULL,                -- YYYY-MM-DD
    created_at        TEXT NOT NULL,
    UNIQUE (user_id, question_id, answered_on)
);

-- The grant ledger row is the idempotency guard: an achievement can be
-- granted to a user at most once, and a suppressed duplicate insert is a
-- successful no-op that awards no points.
CREATE TABLE IF NOT EXISTS user_achievements (
    user_id          TEXT NOT NULL REFERENCES users(user_id),
    achievement_type TEXT NOT NULL,
    granted_at       TEXT NOT NULL,
    UNIQUE (user_id, achievement_type)
);

CREATE INDEX IF NOT EXISTS partnerships_pair_idx  ON partnerships(pair_id);
CREATE INDEX IF NOT EXISTS interactions_pair_idx  ON interactions(pair_id);
CREATE INDEX IF NOT EXISTS interactions_time_idx  ON interactions(recorded_at);
CREATE INDEX IF NOT EXISTS answers_user_idx       ON answers(user_id, question_id);
CREATE INDEX IF NOT EXISTS answers_day_idx        ON answers(user_id, answered_on);

PRAGMA user_version = 1;
";
