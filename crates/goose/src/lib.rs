use anyhow::{bail, Result};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs goose migrations by spawning the goose binary.
///
/// Any driver goose understands works; the DSN format is driver specific.
pub struct MigrationRunner {
    goose_binary_path: PathBuf,
    migrations_dir: PathBuf,
    driver: String,
    dsn: String,
}

impl MigrationRunner {
    pub fn new(
        goose_binary_path: impl Into<PathBuf>,
        migrations_dir: impl Into<PathBuf>,
        driver: impl Into<String>,
        dsn: impl Into<String>,
    ) -> Self {
        Self {
            goose_binary_path: goose_binary_path.into(),
            migrations_dir: migrations_dir.into(),
            driver: driver.into(),
            dsn: dsn.into(),
        }
    }

    /// Runner for the `postgres` driver
    pub fn postgres(
        goose_binary_path: impl Into<PathBuf>,
        migrations_dir: impl Into<PathBuf>,
        dsn: impl Into<String>,
    ) -> Self {
        Self::new(goose_binary_path, migrations_dir, "postgres", dsn)
    }

    /// Apply all pending migrations (`goose up`)
    pub async fn run_migrations(&self) -> Result<()> {
        info!(migrations_dir = %self.migrations_dir.display(), "running migrations");
        let stdout = self.goose("up").await?;
        debug!("migrations completed:\n{}", stdout);
        Ok(())
    }

    /// Roll back the most recent migration (`goose down`)
    pub async fn rollback_migration(&self) -> Result<()> {
        let stdout = self.goose("down").await?;
        debug!("rollback completed:\n{}", stdout);
        Ok(())
    }

    /// Report applied and pending migrations (`goose status`)
    pub async fn migration_status(&self) -> Result<String> {
        self.goose("status").await
    }

    fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(&self.goose_binary_path);
        cmd.arg("-dir")
            .arg(&self.migrations_dir)
            .arg(&self.driver)
            .arg(&self.dsn)
            .arg(subcommand)
            .kill_on_drop(true);
        cmd
    }

    async fn goose(&self, subcommand: &str) -> Result<String> {
        let output = self.command(subcommand).output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "goose {} failed ({}).\nstdout: {}\nstderr: {}",
                subcommand,
                output.status,
                stdout,
                stderr
            );
        }

        Ok(stdout)
    }
}
