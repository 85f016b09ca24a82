//! SQL migration definitions for the relational mirror.
//!
//! Migrations are applied in order when the mirror is opened. Each migration
//! has a version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: portfolio_companies",
        sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS portfolio_companies (
    id               TEXT PRIMARY KEY,
    source_url       TEXT NOT NULL,
    investor_name    TEXT NOT NULL,
    investor_website TEXT NOT NULL,
    company_name     TEXT NOT NULL,
    company_website  TEXT NOT NULL DEFAULT '',
    article_1        TEXT NOT NULL DEFAULT '',
    article_2        TEXT NOT NULL DEFAULT '',
    article_3        TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_portfolio_companies_source
    ON portfolio_companies(source_url);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
