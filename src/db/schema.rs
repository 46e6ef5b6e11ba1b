pub const SCHEMA_V1: &str = r#"
CREATE TABLE users (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    role          TEXT NOT NULL CHECK (role IN ('admin', 'member')),
    password_hash TEXT NOT NULL,
    created_at    INTEGER NOT NULL
);

CREATE TABLE documents (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    description       TEXT NOT NULL DEFAULT '',
    file_url          TEXT,
    file_name         TEXT,
    created_by        TEXT NOT NULL REFERENCES users(id),
    requires_approval INTEGER NOT NULL DEFAULT 0,
    approval          TEXT NOT NULL DEFAULT 'unreviewed'
                      CHECK (approval IN ('unreviewed', 'approved', 'rejected')),
    approved_by       TEXT REFERENCES users(id) ON DELETE SET NULL,
    approved_at       INTEGER,
    status            TEXT NOT NULL DEFAULT 'pending'
                      CHECK (status IN ('pending', 'in_progress', 'completed', 'rejected')),
    created_at        INTEGER NOT NULL,
    updated_at        INTEGER NOT NULL
);

CREATE TABLE document_signatories (
    id          TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    position    TEXT,
    email       TEXT,
    phone       TEXT,
    signed      INTEGER NOT NULL DEFAULT 0,
    signed_at   INTEGER,
    notes       TEXT NOT NULL DEFAULT '',
    ordinal     INTEGER NOT NULL
);
CREATE INDEX idx_signatories_document ON document_signatories(document_id, ordinal);

CREATE TABLE document_comments (
    id          TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    text        TEXT NOT NULL,
    created_at  INTEGER NOT NULL
);
CREATE INDEX idx_comments_document ON document_comments(document_id, created_at);

CREATE TABLE document_activity (
    id          TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    actor_id    TEXT REFERENCES users(id) ON DELETE SET NULL,
    action      TEXT NOT NULL,
    description TEXT NOT NULL,
    metadata    TEXT,
    created_at  INTEGER NOT NULL
);
CREATE INDEX idx_activity_document ON document_activity(document_id, created_at);

CREATE TABLE notifications (
    id           TEXT PRIMARY KEY,
    recipient_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    document_id  TEXT REFERENCES documents(id) ON DELETE SET NULL,
    title        TEXT NOT NULL,
    message      TEXT NOT NULL,
    kind         TEXT NOT NULL CHECK (kind IN (
                     'document_created', 'document_deleted', 'status_updated',
                     'signature_added', 'admin_approval', 'comment_added')),
    payload      TEXT NOT NULL DEFAULT '{}',
    read         INTEGER NOT NULL DEFAULT 0,
    created_at   INTEGER NOT NULL,
    updated_at   INTEGER NOT NULL
);
CREATE INDEX idx_notifications_recipient ON notifications(recipient_id, created_at);

CREATE TABLE push_subscriptions (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    endpoint   TEXT NOT NULL,
    p256dh     TEXT NOT NULL,
    auth       TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (user_id, endpoint)
);
"#;
