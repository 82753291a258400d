use anyhow::Context;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use std::path::Path;

const MIGRATION_SUFFIX: &str = ".sql";

const CREATE_TRACKING_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS schema_migrations ( \
    version VARCHAR(255) PRIMARY KEY, \
    applied_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP \
)";

/// Applies every pending migration script in `dir`, in lexical filename order.
///
/// Each applied version is recorded in `schema_migrations` and never executed
/// again. Any failure is returned to the caller, which must treat it as fatal;
/// serving traffic against an unknown schema state is worse than not serving.
///
/// There is no lock spanning apply-and-record, so concurrent first deployments
/// can race. Run one process for the initial rollout.
pub async fn run_migrations(db: &DatabaseConnection, dir: &Path) -> anyhow::Result<()> {
    db.execute(Statement::from_string(
        DbBackend::Postgres,
        CREATE_TRACKING_TABLE.to_owned(),
    ))
    .await
    .context("failed to create schema_migrations table")?;

    for filename in collect_scripts(dir)? {
        let version = version_of(&filename);

        if is_applied(db, version).await? {
            log::info!("Migration {} already applied, skipping", version);
            continue;
        }

        let sql = std::fs::read_to_string(dir.join(&filename))
            .with_context(|| format!("failed to read migration file {}", filename))?;

        log::info!("Applying migration: {}", version);
        db.execute(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .with_context(|| format!("failed to run migration {}", version))?;

        db.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO schema_migrations (version) VALUES ($1)",
            vec![version.into()],
        ))
        .await
        .with_context(|| format!("failed to record migration {}", version))?;

        log::info!("Migration {} completed successfully", version);
    }

    log::info!("All migrations completed");
    Ok(())
}

/// Lists `.sql` scripts in `dir`, sorted by filename.
///
/// Lexical order is the sole ordering mechanism, so prefixes must stay
/// sequential and zero-padded. An empty directory is not an error.
pub fn collect_scripts(dir: &Path) -> anyhow::Result<Vec<String>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read migrations directory {}", dir.display()))?;

    let mut scripts = Vec::new();
    for entry in entries {
        let entry = entry.context("failed to read migrations directory entry")?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(MIGRATION_SUFFIX) {
                scripts.push(name.to_owned());
            }
        }
    }

    scripts.sort();
    Ok(scripts)
}

/// Version identifier for a script, e.g. "001_create_posts.sql" -> "001_create_posts".
pub fn version_of(filename: &str) -> &str {
    filename.strip_suffix(MIGRATION_SUFFIX).unwrap_or(filename)
}

async fn is_applied(db: &DatabaseConnection, version: &str) -> anyhow::Result<bool> {
    let row = db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = $1) AS applied",
            vec![version.into()],
        ))
        .await
        .with_context(|| format!("failed to check migration status for {}", version))?;

    match row {
        Some(row) => row
            .try_get("", "applied")
            .with_context(|| format!("failed to read migration status for {}", version)),
        None => Ok(false),
    }
}
