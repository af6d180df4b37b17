use crate::{
    configuration::Config,
    dao::{get_path, PoolOption, PoolType},
    error::Error,
    model::{Subscription, Table},
};

#[derive(Debug)]
pub struct DatabasePool {
    pub subscription: Table<Subscription>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(database_url: &str, config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(config.max_connections)
            .connect(database_url)
            .await?;

        Ok(DatabasePool {
            subscription: Table::new(pool.clone()),
            pool,
        })
    }

    /// Runs the bootstrap SQL files. Every statement is idempotent.
    pub async fn init_migrations(&self) -> Result<(), Error> {
        let files = vec!["subscription.sql"];

        let dir = env!("CARGO_MANIFEST_DIR");

        for file in files {
            let path = get_path(dir, file);
            let data = tokio::fs::read_to_string(&path).await?;
            sqlx::query(data.as_str()).execute(&self.pool).await?;
            tracing::info!("Applied migration {}", path.display());
        }

        Ok(())
    }
}
