use sqlx::PgPool;
use time::OffsetDateTime;

use crate::{Result, models::TenantCredentialsRecord};

pub async fn upsert_credentials(
	pool: &PgPool,
	tenant_id: &str,
	api_base: &str,
	access_token: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO tenant_credentials (tenant_id, api_base, access_token, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (tenant_id) DO UPDATE
SET
	api_base = EXCLUDED.api_base,
	access_token = EXCLUDED.access_token,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(tenant_id)
	.bind(api_base)
	.bind(access_token)
	.bind(now)
	.bind(now)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn fetch_credentials(
	pool: &PgPool,
	tenant_id: &str,
) -> Result<Option<TenantCredentialsRecord>> {
	let record = sqlx::query_as::<_, TenantCredentialsRecord>(
		"SELECT * FROM tenant_credentials WHERE tenant_id = $1",
	)
	.bind(tenant_id)
	.fetch_optional(pool)
	.await?;

	Ok(record)
}
