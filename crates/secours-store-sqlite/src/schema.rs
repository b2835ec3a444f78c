//! SQL schema for the Secours SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS users (
    user_id      TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    role         TEXT NOT NULL CHECK (role IN ('ADMIN', 'RESCUE', 'CITIZEN')),
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL
);

-- Provider-side identifiers used to address push messages.
CREATE TABLE IF NOT EXISTS push_identifiers (
    user_id     TEXT NOT NULL REFERENCES users(user_id),
    external_id TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (user_id, external_id)
);

CREATE TABLE IF NOT EXISTS rescue_services (
    service_id TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    is_active  INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rescue_members (
    rescue_member_id TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL UNIQUE REFERENCES users(user_id),
    service_id       TEXT NOT NULL REFERENCES rescue_services(service_id),
    position         TEXT NOT NULL,
    badge_number     TEXT NOT NULL UNIQUE,
    is_on_duty       INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS alerts (
    alert_id    TEXT PRIMARY KEY,
    reporter_id TEXT NOT NULL REFERENCES users(user_id),
    latitude    REAL NOT NULL CHECK (latitude  BETWEEN -90  AND 90),
    longitude   REAL NOT NULL CHECK (longitude BETWEEN -180 AND 180),
    category    TEXT NOT NULL,
    description TEXT NOT NULL,
    address     TEXT,
    status      TEXT NOT NULL CHECK (status IN
                  ('PENDING', 'ACCEPTED', 'IN_PROGRESS', 'RESOLVED', 'CANCELLED')),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS interventions (
    intervention_id  TEXT PRIMARY KEY,
    alert_id         TEXT NOT NULL REFERENCES alerts(alert_id),
    rescue_member_id TEXT NOT NULL REFERENCES rescue_members(rescue_member_id),
    dispatched_by    TEXT NOT NULL REFERENCES users(user_id),
    status           TEXT NOT NULL CHECK (status IN
                       ('EN_ROUTE', 'SUR_PLACE', 'TERMINEE', 'ANNULEE')),
    start_time       TEXT NOT NULL,
    arrival_time     TEXT,
    end_time         TEXT,
    notes            TEXT
);

-- At most one non-terminal intervention per alert and per rescue member.
CREATE UNIQUE INDEX IF NOT EXISTS interventions_active_alert_idx
    ON interventions(alert_id) WHERE status IN ('EN_ROUTE', 'SUR_PLACE');
CREATE UNIQUE INDEX IF NOT EXISTS interventions_active_member_idx
    ON interventions(rescue_member_id) WHERE status IN ('EN_ROUTE', 'SUR_PLACE');
CREATE INDEX IF NOT EXISTS interventions_alert_idx
    ON interventions(alert_id, start_time);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id   TEXT PRIMARY KEY,
    sender_id         TEXT NOT NULL REFERENCES users(user_id),
    title             TEXT,
    message           TEXT NOT NULL,
    notification_type TEXT NOT NULL CHECK (notification_type IN ('UNIQUE', 'MASS')),
    recipient_id      TEXT REFERENCES users(user_id),
    target            TEXT CHECK (target IN ('RESCUE', 'CITIZEN')),
    is_read           INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    CHECK (
        (notification_type = 'UNIQUE' AND recipient_id IS NOT NULL AND target IS NULL)
     OR (notification_type = 'MASS'   AND recipient_id IS NULL AND target IS NOT NULL)
    )
);

CREATE INDEX IF NOT EXISTS notifications_recipient_idx
    ON notifications(recipient_id, is_read);
CREATE INDEX IF NOT EXISTS notifications_target_idx
    ON notifications(target, is_read);

PRAGMA user_version = 1;
";
