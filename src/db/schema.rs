//! Database schema and migrations for mailroom.
//!
//! Migrations are applied in order when the database is opened. The
//! schema_version table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password    TEXT NOT NULL,           -- Argon2 hash
    role        TEXT NOT NULL,           -- 'super_admin', 'rd_department', 'other_department'
    created_at  TEXT NOT NULL,
    last_login  TEXT
);

CREATE INDEX idx_users_role ON users(role);
"#,
    // v2: refresh tokens
    r#"
CREATE TABLE refresh_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,
    expires_at  TEXT NOT NULL,           -- 'YYYY-MM-DD HH:MM:SS', compared with datetime('now')
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    revoked_at  TEXT
);

CREATE INDEX idx_refresh_tokens_user_id ON refresh_tokens(user_id);
"#,
    // v3: departments, each optionally linked to one other_department user
    r#"
CREATE TABLE departments (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    code        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    head        TEXT NOT NULL DEFAULT '',
    contact     TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'active',
    user_id     INTEGER UNIQUE REFERENCES users(id) ON DELETE SET NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX idx_departments_status ON departments(status);
"#,
    // v4: couriers
    r#"
CREATE TABLE couriers (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    service_name    TEXT NOT NULL,
    code            TEXT NOT NULL UNIQUE COLLATE NOCASE,
    contact_person  TEXT NOT NULL DEFAULT '',
    email           TEXT NOT NULL DEFAULT '',
    phone           TEXT NOT NULL DEFAULT '',
    address         TEXT NOT NULL DEFAULT '',
    status          TEXT NOT NULL DEFAULT 'active',
    created_at      TEXT NOT NULL
);

CREATE INDEX idx_couriers_status ON couriers(status);
"#,
    // v5: incoming letters, addressed to a department
    r#"
CREATE TABLE incoming_letters (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    qr_code         TEXT NOT NULL UNIQUE,
    sender          TEXT NOT NULL,
    department_id   INTEGER NOT NULL REFERENCES departments(id),
    priority        TEXT NOT NULL DEFAULT 'medium',
    subject         TEXT,
    description     TEXT,
    filing          TEXT,
    status          TEXT NOT NULL DEFAULT 'RECEIVED',
    image           TEXT,
    received_date   TEXT NOT NULL,
    created_by      INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at      TEXT NOT NULL
);

CREATE INDEX idx_incoming_department ON incoming_letters(department_id);
CREATE INDEX idx_incoming_status ON incoming_letters(status);
CREATE INDEX idx_incoming_created_at ON incoming_letters(created_at);
"#,
    // v6: outgoing letters, sent from a department
    r#"
CREATE TABLE outgoing_letters (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    qr_code         TEXT NOT NULL UNIQUE,
    department_id   INTEGER NOT NULL REFERENCES departments(id),
    recipient       TEXT NOT NULL,
    priority        TEXT NOT NULL DEFAULT 'medium',
    subject         TEXT,
    description     TEXT,
    status          TEXT NOT NULL DEFAULT 'PENDING_DISPATCH',
    image           TEXT,
    courier_id      INTEGER REFERENCES couriers(id),
    dispatched_date TEXT,
    delivered_date  TEXT,
    created_by      INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at      TEXT NOT NULL
);

CREATE INDEX idx_outgoing_department ON outgoing_letters(department_id);
CREATE INDEX idx_outgoing_courier ON outgoing_letters(courier_id);
CREATE INDEX idx_outgoing_status ON outgoing_letters(status);
CREATE INDEX idx_outgoing_created_at ON outgoing_letters(created_at);
"#,
    // v7: notifications, one row per recipient
    r#"
CREATE TABLE notifications (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    message         TEXT NOT NULL,
    incoming_id     INTEGER REFERENCES incoming_letters(id) ON DELETE CASCADE,
    outgoing_id     INTEGER REFERENCES outgoing_letters(id) ON DELETE CASCADE,
    department_id   INTEGER REFERENCES departments(id) ON DELETE CASCADE,
    user_id         INTEGER REFERENCES users(id) ON DELETE CASCADE,
    is_read         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    CHECK (incoming_id IS NULL OR outgoing_id IS NULL)
);

CREATE INDEX idx_notifications_user ON notifications(user_id, is_read);
CREATE INDEX idx_notifications_department ON notifications(department_id);
"#,
];
