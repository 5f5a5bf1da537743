pub mod config;
pub mod db;
pub mod error;
pub mod load;
pub mod report;
pub mod taxonomy;

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Initialise `env_logger` once; later calls are no-ops.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info,sqlx=warn"))
            .init();
    });
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    pub use database::{TestDatabase, TestDatabaseError};

    pub mod database {
        use log::LevelFilter;
        use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use sqlx::{ConnectOptions, Connection, PgPool};
        use testcontainers::ContainerAsync;
        use testcontainers::core::error::TestcontainersError;
        use testcontainers::runners::AsyncRunner;
        use testcontainers_modules::postgres::Postgres;
        use thiserror::Error;
        use tokio::runtime::Handle;
        use uuid::Uuid;

        static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("neither TEST_DATABASE_URL nor LOADER_TEST_CONTAINERS is set")]
            MissingUrl,
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database for integration tests.
        ///
        /// Each instance creates its own uniquely named database on the server
        /// and drops it on `close` (or, best effort, on drop).
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            database_name: String,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Provision a database on `TEST_DATABASE_URL`, or in a disposable
            /// Postgres container when `LOADER_TEST_CONTAINERS=1`.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
                    let options: PgConnectOptions = url.parse()?;
                    return Self::provision(options, None).await;
                }

                let use_containers = std::env::var("LOADER_TEST_CONTAINERS")
                    .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false);
                if use_containers {
                    return Self::new_container().await;
                }

                Err(TestDatabaseError::MissingUrl)
            }

            /// Provision a database inside a fresh Postgres container.
            pub async fn new_container() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().start().await?;
                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
                let options: PgConnectOptions = url.parse()?;
                Self::provision(options, Some(container)).await
            }

            async fn provision(
                base_options: PgConnectOptions,
                container: Option<ContainerAsync<Postgres>>,
            ) -> Result<Self, TestDatabaseError> {
                let base_options = base_options.log_statements(LevelFilter::Off);
                let admin_options = base_options.clone().database("postgres");

                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await?;

                let database_name = format!("mail_loader_{}", Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", database_name);
                sqlx::query(&create_sql).execute(&admin_pool).await?;
                admin_pool.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(base_options.database(&database_name))
                    .await?;

                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    admin_options,
                    database_name,
                    container,
                })
            }

            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }
                drop_database(self.admin_options.clone(), &self.database_name).await?;
                drop(self.container.take());
                Ok(())
            }
        }

        /// `DROP DATABASE` for a generated name, terminating stray sessions.
        ///
        /// Requires PostgreSQL 13 or newer for `WITH (FORCE)`.
        fn drop_database_sql(database_name: &str) -> String {
            format!(
                "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
                database_name.replace('"', "\"\"")
            )
        }

        async fn drop_database(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let mut admin = admin_options.connect().await?;
            sqlx::query(&drop_database_sql(database_name))
                .execute(&mut admin)
                .await?;
            admin.close().await
        }

        impl Drop for TestDatabase {
            /// Best effort cleanup for tests that panic before `close`.
            fn drop(&mut self) {
                let Some(pool) = self.pool.take() else {
                    return;
                };
                let admin_options = self.admin_options.clone();
                let database_name = self.database_name.clone();
                match Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            pool.close().await;
                            if let Err(err) = drop_database(admin_options, &database_name).await {
                                log::warn!("could not drop test database {}: {}", database_name, err);
                            }
                        });
                    }
                    Err(_) => log::warn!(
                        "no runtime to drop test database {}, leaving it behind",
                        database_name
                    ),
                }
            }
        }

    }
}
