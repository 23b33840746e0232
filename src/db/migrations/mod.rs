use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Embedded migrations, applied in order. Table files run before the index
/// file so the partial unique index on open checkins always finds its table.
const MIGRATIONS: &[(&str, &str)] = &[
    ("01_create_alerts", include_str!("sql/01_create_alerts.sql")),
    ("02_create_schedules", include_str!("sql/02_create_schedules.sql")),
    ("03_create_checkins", include_str!("sql/03_create_checkins.sql")),
    ("04_create_incidents", include_str!("sql/04_create_incidents.sql")),
    ("add_indexes", include_str!("sql/add_indexes.sql")),
];

/// Run all migrations against the pool
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    for (name, sql) in MIGRATIONS {
        sqlx::raw_sql(sql)
            .execute(pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration '{}' failed: {}", name, e))?;
        info!("Applied migration: {}", name);
    }

    Ok(())
}
