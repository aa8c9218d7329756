//! SQLite schema of the structured symbol store.

/// Statements that create every table. Safe to run on an existing store.
pub(crate) const CREATE_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS instance (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        annotation TEXT NOT NULL DEFAULT ''
    )"#,
    r#"CREATE TABLE IF NOT EXISTS breakpoint (
        id INTEGER PRIMARY KEY,
        instance_id INTEGER NOT NULL REFERENCES instance(id),
        filename TEXT NOT NULL,
        line_num INTEGER NOT NULL,
        column_num INTEGER NOT NULL DEFAULT 0,
        "condition" TEXT NOT NULL DEFAULT '',
        "trigger" TEXT NOT NULL DEFAULT ''
    )"#,
    r#"CREATE TABLE IF NOT EXISTS variable (
        id INTEGER PRIMARY KEY,
        value TEXT NOT NULL,
        is_rtl INTEGER NOT NULL,
        indices TEXT,
        type INTEGER NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS scope (
        id INTEGER PRIMARY KEY,
        breakpoints TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS context_variable (
        name TEXT NOT NULL,
        breakpoint_id INTEGER NOT NULL REFERENCES breakpoint(id),
        variable_id INTEGER NOT NULL REFERENCES variable(id),
        type INTEGER NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS generator_variable (
        name TEXT NOT NULL,
        instance_id INTEGER NOT NULL REFERENCES instance(id),
        variable_id INTEGER NOT NULL REFERENCES variable(id),
        annotation TEXT NOT NULL DEFAULT ''
    )"#,
    r#"CREATE TABLE IF NOT EXISTS annotation (
        name TEXT NOT NULL,
        value TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS breakpoint_location ON breakpoint (filename, line_num)",
];

pub(crate) const BREAKPOINT_COLUMNS: &str =
    r#"id, instance_id, filename, line_num, column_num, "condition", "trigger""#;
