use log::info;
use self::migration::Migrator;
use sea_orm::{DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::io;
use std::path::Path;
use tokio::fs::{create_dir_all, File};

pub mod entities;
pub mod migration;

pub type DbResult<T> = Result<T, DbErr>;

/// Connects to the sqlite database at the provided file path creating
/// the file and parent directories if they are missing, then runs any
/// outstanding migrations
pub async fn connect(database_file: &str) -> io::Result<DatabaseConnection> {
    info!("Connecting to database..");

    let file_path = Path::new(database_file);
    if let Some(parent) = file_path.parent() {
        if !parent.exists() {
            create_dir_all(parent).await?;
        }
    }

    if !file_path.exists() {
        File::create(file_path).await?;
    }

    let con_str = format!("sqlite:{database_file}");
    let connection = sea_orm::Database::connect(&con_str)
        .await
        .map_err(|err| io::Error::other(format!("Unable to create database connection: {err:?}")))?;

    info!("Connected to database: {con_str}");

    run_migrations(&connection)
        .await
        .map_err(|err| io::Error::other(format!("Unable to run database migrations: {err:?}")))?;

    Ok(connection)
}

/// Connects to an in-memory database, used by tests
#[cfg(test)]
pub async fn connect_in_memory() -> DbResult<DatabaseConnection> {
    let connection = sea_orm::Database::connect("sqlite::memory:").await?;
    run_migrations(&connection).await?;
    Ok(connection)
}

async fn run_migrations(connection: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running migrations...");
    Migrator::up(connection, None).await?;
    info!("Migrations complete.");
    Ok(())
}
