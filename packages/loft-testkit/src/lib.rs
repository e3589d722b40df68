mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

/// A throwaway Postgres database for one test. Call [`TestDatabase::drop_db`]
/// at the end of the test; orphans are named `loft_test_*` and easy to sweep.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
}
impl TestDatabase {
	pub async fn create(base_dsn: &str) -> Result<Self> {
		let base_options: PgConnectOptions = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse LOFT_PG_DSN: {err}.")))?;
		let admin_options = base_options.clone().database("postgres");
		let mut admin_conn = PgConnection::connect_with(&admin_options)
			.await
			.map_err(|err| Error::Message(format!("Failed to connect as admin: {err}.")))?;
		let name = format!("loft_test_{}", Uuid::new_v4().simple());
		let create_sql = format!(r#"CREATE DATABASE "{name}""#);

		admin_conn
			.execute(create_sql.as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create test database: {err}.")))?;
		admin_conn.close().await.ok();

		let dsn = base_options.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin_options })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// A collection name unique to this database, for Qdrant-backed tests.
	pub fn collection_name(&self, prefix: &str) -> String {
		format!("{prefix}_{}", self.name)
	}

	pub async fn drop_db(self) -> Result<()> {
		let mut admin_conn = PgConnection::connect_with(&self.admin_options)
			.await
			.map_err(|err| Error::Message(format!("Failed to connect as admin: {err}.")))?;
		let terminate_sql = format!(
			"SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
			 WHERE datname = '{}' AND pid <> pg_backend_pid()",
			self.name
		);

		admin_conn.execute(terminate_sql.as_str()).await.ok();

		let drop_sql = format!(r#"DROP DATABASE IF EXISTS "{}""#, self.name);

		admin_conn
			.execute(drop_sql.as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to drop test database: {err}.")))?;
		admin_conn.close().await.ok();

		Ok(())
	}
}

pub async fn drop_qdrant_collection(url: &str, collection: &str) -> Result<()> {
	let client = qdrant_client::Qdrant::from_url(url).build()?;

	client.delete_collection(collection).await?;

	Ok(())
}

pub fn env_dsn() -> Option<String> {
	env::var("LOFT_PG_DSN").ok()
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("LOFT_QDRANT_URL").ok()
}
