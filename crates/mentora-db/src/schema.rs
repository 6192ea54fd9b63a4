//! SQL schema definitions.

/// Complete schema for the v1 ledger database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Reference tables (owned by the account/catalog subsystems;
-- mirrored here so the ledger can enforce referential integrity)
-- ============================================================

CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL DEFAULT 'student',
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS courses (
    course_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    instructor_id INTEGER NOT NULL REFERENCES users(user_id),
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS lectures (
    lecture_id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_lectures_course ON lectures(course_id);

-- ============================================================
-- Revenue share configuration
-- ============================================================

CREATE TABLE IF NOT EXISTS revenue_splits (
    split_id INTEGER PRIMARY KEY,
    course_id INTEGER UNIQUE REFERENCES courses(course_id),
    student_pct INTEGER NOT NULL,
    instructor_pct INTEGER NOT NULL,
    platform_pct INTEGER NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    min_watch_secs INTEGER NOT NULL DEFAULT 0,
    earnings_per_minute_micros INTEGER NOT NULL DEFAULT 0,
    completion_bonus_micros INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    CHECK (student_pct + instructor_pct + platform_pct = 100),
    CHECK (student_pct >= 0 AND instructor_pct >= 0 AND platform_pct >= 0)
);

-- At most one default-flagged row, ever.
CREATE UNIQUE INDEX IF NOT EXISTS idx_splits_single_default
    ON revenue_splits(is_default) WHERE is_default = 1;

-- ============================================================
-- Ad impressions
-- ============================================================

CREATE TABLE IF NOT EXISTS ad_impressions (
    impression_id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(user_id),
    course_id INTEGER NOT NULL REFERENCES courses(course_id),
    lecture_id INTEGER REFERENCES lectures(lecture_id),
    platform TEXT NOT NULL,
    cpm_micros INTEGER NOT NULL,
    revenue_micros INTEGER NOT NULL,
    view_secs INTEGER NOT NULL DEFAULT 0,
    is_valid INTEGER NOT NULL DEFAULT 1,
    credited INTEGER NOT NULL DEFAULT 0,
    ip_address TEXT,
    user_agent TEXT,
    viewed_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_impressions_user ON ad_impressions(user_id);
CREATE INDEX IF NOT EXISTS idx_impressions_course ON ad_impressions(course_id);

-- ============================================================
-- Earnings ledger (append-only)
-- ============================================================

CREATE TABLE IF NOT EXISTS withdrawals (
    withdrawal_id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(user_id),
    amount_micros INTEGER NOT NULL CHECK (amount_micros > 0),
    fee_micros INTEGER NOT NULL DEFAULT 0 CHECK (fee_micros >= 0),
    net_micros INTEGER NOT NULL CHECK (net_micros >= 0),
    payment_method TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    requested_at INTEGER NOT NULL,
    processed_at INTEGER,
    completed_at INTEGER,
    processed_by INTEGER REFERENCES users(user_id)
);

CREATE INDEX IF NOT EXISTS idx_withdrawals_user ON withdrawals(user_id);
CREATE INDEX IF NOT EXISTS idx_withdrawals_status ON withdrawals(status);

CREATE TABLE IF NOT EXISTS earnings (
    earning_id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(user_id),
    course_id INTEGER NOT NULL REFERENCES courses(course_id),
    kind TEXT NOT NULL,
    amount_micros INTEGER NOT NULL CHECK (amount_micros >= 0),
    status TEXT NOT NULL DEFAULT 'pending',
    withdrawal_id INTEGER REFERENCES withdrawals(withdrawal_id),
    earned_at INTEGER NOT NULL,
    approved_at INTEGER,
    paid_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_earnings_user_status ON earnings(user_id, status);
CREATE INDEX IF NOT EXISTS idx_earnings_course ON earnings(course_id);

-- Which impressions contributed to an earning.
CREATE TABLE IF NOT EXISTS earning_impressions (
    earning_id INTEGER NOT NULL REFERENCES earnings(earning_id) ON DELETE CASCADE,
    impression_id INTEGER NOT NULL REFERENCES ad_impressions(impression_id),
    PRIMARY KEY (earning_id, impression_id)
);

-- ============================================================
-- Derived wallet snapshots
-- ============================================================

CREATE TABLE IF NOT EXISTS user_wallets (
    user_id INTEGER PRIMARY KEY REFERENCES users(user_id),
    available_micros INTEGER NOT NULL DEFAULT 0,
    pending_micros INTEGER NOT NULL DEFAULT 0,
    withdrawn_micros INTEGER NOT NULL DEFAULT 0,
    total_micros INTEGER NOT NULL DEFAULT 0,
    impression_count INTEGER NOT NULL DEFAULT 0,
    watch_secs INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
);
"#;
