pub fn render_schema() -> String {
	r#"
CREATE TABLE IF NOT EXISTS product_profiles (
	profile_id UUID PRIMARY KEY,
	tenant_id TEXT NOT NULL,
	product_id TEXT NOT NULL,
	title TEXT NOT NULL,
	body TEXT NOT NULL DEFAULT '',
	vendor TEXT NOT NULL DEFAULT '',
	product_type TEXT NOT NULL DEFAULT '',
	tags JSONB NOT NULL DEFAULT '[]'::jsonb,
	content_hash TEXT NOT NULL,
	firmness TEXT,
	height TEXT,
	material TEXT,
	certifications JSONB NOT NULL DEFAULT '[]'::jsonb,
	features JSONB NOT NULL DEFAULT '[]'::jsonb,
	support_features JSONB NOT NULL DEFAULT '[]'::jsonb,
	enrichment_method TEXT NOT NULL,
	confidence REAL NOT NULL DEFAULT 0,
	source_evidence JSONB NOT NULL DEFAULT '[]'::jsonb,
	model_version TEXT,
	locked_firmness BOOLEAN NOT NULL DEFAULT FALSE,
	locked_height BOOLEAN NOT NULL DEFAULT FALSE,
	locked_material BOOLEAN NOT NULL DEFAULT FALSE,
	locked_certifications BOOLEAN NOT NULL DEFAULT FALSE,
	locked_features BOOLEAN NOT NULL DEFAULT FALSE,
	locked_support_features BOOLEAN NOT NULL DEFAULT FALSE,
	price DOUBLE PRECISION,
	available_for_sale BOOLEAN NOT NULL DEFAULT FALSE,
	image_url TEXT,
	product_url TEXT,
	enriched_at TIMESTAMPTZ NOT NULL,
	created_at TIMESTAMPTZ NOT NULL,
	updated_at TIMESTAMPTZ NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS product_profiles_tenant_content_hash
	ON product_profiles (tenant_id, content_hash);

CREATE INDEX IF NOT EXISTS product_profiles_tenant_product
	ON product_profiles (tenant_id, product_id);

CREATE TABLE IF NOT EXISTS index_jobs (
	job_id UUID PRIMARY KEY,
	tenant_id TEXT NOT NULL,
	status TEXT NOT NULL,
	total_products INTEGER NOT NULL DEFAULT 0,
	processed_products INTEGER NOT NULL DEFAULT 0,
	failed_products INTEGER NOT NULL DEFAULT 0,
	no_matches BOOLEAN NOT NULL DEFAULT FALSE,
	use_ai_enrichment BOOLEAN NOT NULL DEFAULT TRUE,
	use_web_search BOOLEAN NOT NULL DEFAULT FALSE,
	confidence_threshold REAL NOT NULL DEFAULT 0.5,
	error_message TEXT,
	created_at TIMESTAMPTZ NOT NULL,
	started_at TIMESTAMPTZ,
	finished_at TIMESTAMPTZ
);

CREATE UNIQUE INDEX IF NOT EXISTS index_jobs_one_active_per_tenant
	ON index_jobs (tenant_id)
	WHERE status IN ('pending', 'running');

CREATE INDEX IF NOT EXISTS index_jobs_tenant_created
	ON index_jobs (tenant_id, created_at DESC);

CREATE TABLE IF NOT EXISTS tenant_credentials (
	tenant_id TEXT PRIMARY KEY,
	api_base TEXT NOT NULL,
	access_token TEXT NOT NULL,
	created_at TIMESTAMPTZ NOT NULL,
	updated_at TIMESTAMPTZ NOT NULL
);
"#
	.to_string()
}
