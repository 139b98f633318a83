use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;
    info!("database connection established");
    Ok(db)
}

/// Creates `users_table` if it is missing, optionally seeding demo accounts.
/// An existing table is left as it is.
pub async fn initialize(db: &PgPool, seed: bool) -> anyhow::Result<()> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables WHERE table_name = 'users_table'
        )
        "#,
    )
    .fetch_one(db)
    .await
    .context("check users_table")?;

    if exists {
        info!("users_table already exists, skipping initialization");
        return Ok(());
    }

    info!("creating users_table");
    sqlx::query(
        r#"
        CREATE TABLE users_table (
            human_user VARCHAR(255) PRIMARY KEY,
            create_date VARCHAR(255),
            password_changed_date VARCHAR(255),
            last_access_date VARCHAR(255),
            mfa_enabled BOOLEAN
        )
        "#,
    )
    .execute(db)
    .await
    .context("create users_table")?;

    if seed {
        info!("seeding initial users");
        sqlx::query(
            r#"
            INSERT INTO users_table (human_user, create_date, password_changed_date, last_access_date, mfa_enabled) VALUES
            ('Foo Bar1', 'Oct 1 2020', 'Oct 1 2021', 'Jan 4 2025', true),
            ('Foo1 Bar1', 'Sep 20 2019', 'Sep 22 2019', 'Feb 8 2025', false),
            ('Foo2 Bar2', 'Feb 3 2022', 'Feb 3 2022', 'Feb 12 2025', false),
            ('Foo3 Bar3', 'Mar 7 2023', 'Mar 10 2023', 'Jan 3 2022', true),
            ('Foo Bar4', 'Apr 8 2018', 'Apr 12 2020', 'Oct 4 2022', false)
            "#,
        )
        .execute(db)
        .await
        .context("seed users_table")?;
    }
    Ok(())
}
