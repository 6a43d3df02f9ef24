//! PostgreSQL schema for [`super::PgStore`]
//!
//! Enum-valued columns hold the snake_case labels from [`crate::types`].

/// Applied by `PgStore::migrate`; every statement is idempotent.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE
);

CREATE TABLE IF NOT EXISTS water_bodies (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    sensitivity_score INTEGER NOT NULL,
    risk_score INTEGER NOT NULL DEFAULT 0,
    risk_level TEXT NOT NULL DEFAULT 'low',
    risk_updated_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS risk_history (
    id UUID PRIMARY KEY,
    water_body_id UUID NOT NULL REFERENCES water_bodies(id),
    risk_score INTEGER NOT NULL,
    risk_level TEXT NOT NULL,
    complaint_density_score INTEGER NOT NULL,
    construction_score INTEGER NOT NULL,
    urban_growth_score INTEGER NOT NULL,
    shrinkage_score INTEGER NOT NULL,
    calculated_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_risk_history_body ON risk_history(water_body_id, calculated_at);

-- One row per calendar day; the upsert in next_case_sequence is the serialization point
CREATE TABLE IF NOT EXISTS case_sequences (
    day DATE PRIMARY KEY,
    last_value BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS complaints (
    id UUID PRIMARY KEY,
    case_number TEXT NOT NULL UNIQUE,
    reporter_id UUID NOT NULL,
    water_body_id UUID REFERENCES water_bodies(id),
    category TEXT NOT NULL,
    description TEXT,
    address TEXT,
    latitude DOUBLE PRECISION NOT NULL,
    longitude DOUBLE PRECISION NOT NULL,
    violation_type TEXT NOT NULL,
    confidence DOUBLE PRECISION NOT NULL,
    urgency TEXT NOT NULL,
    severity_score INTEGER NOT NULL,
    priority TEXT NOT NULL,
    status TEXT NOT NULL,
    assigned_to UUID REFERENCES users(id),
    sla_deadline TIMESTAMPTZ NOT NULL,
    resolved_at TIMESTAMPTZ,
    resolution_notes TEXT,
    escalation_tier TEXT,
    escalated_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_complaints_open_deadline ON complaints(sla_deadline)
    WHERE status NOT IN ('resolved', 'rejected');
CREATE INDEX IF NOT EXISTS idx_complaints_body_created ON complaints(water_body_id, created_at);
CREATE INDEX IF NOT EXISTS idx_complaints_assignee ON complaints(assigned_to);

CREATE TABLE IF NOT EXISTS status_log (
    id UUID PRIMARY KEY,
    complaint_id UUID NOT NULL REFERENCES complaints(id),
    from_status TEXT,
    to_status TEXT NOT NULL,
    actor UUID,
    note TEXT NOT NULL,
    at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_status_log_complaint ON status_log(complaint_id, at);

CREATE TABLE IF NOT EXISTS escalations (
    id UUID PRIMARY KEY,
    complaint_id UUID NOT NULL REFERENCES complaints(id),
    from_tier TEXT,
    to_tier TEXT NOT NULL,
    from_officer UUID,
    to_officer UUID,
    reason TEXT NOT NULL,
    at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_escalations_complaint ON escalations(complaint_id, at);

CREATE TABLE IF NOT EXISTS notifications (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    complaint_id UUID,
    subject TEXT NOT NULL,
    message TEXT NOT NULL,
    read BOOLEAN NOT NULL DEFAULT FALSE,
    sent_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, sent_at);
"#;

/// Column list shared by every complaint SELECT, in `row_to_complaint` order.
pub const COMPLAINT_COLUMNS: &str = "id, case_number, reporter_id, water_body_id, category, \
     description, address, latitude, longitude, violation_type, confidence, urgency, \
     severity_score, priority, status, assigned_to, sla_deadline, resolved_at, \
     resolution_notes, escalation_tier, escalated_at, created_at, updated_at";
