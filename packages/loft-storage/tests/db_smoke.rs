use time::OffsetDateTime;

use loft_domain::{AttributeProfile, Firmness};
use loft_storage::{Error, credentials, db::Db, jobs, profiles};

async fn connect(dsn: &str) -> Db {
	let cfg = loft_config::Postgres { dsn: dsn.to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("connect failed");

	db.ensure_schema().await.expect("schema failed");

	db
}

fn profile() -> AttributeProfile {
	let mut profile = AttributeProfile::default();

	profile.firmness = Some(Firmness::MediumFirm);
	profile.confidence = 1.0;
	profile.features.insert("cooling-gel".to_string());

	profile
}

fn store_args<'a>(
	profile: &'a AttributeProfile,
	now: OffsetDateTime,
) -> profiles::StoreProfileArgs<'a> {
	profiles::StoreProfileArgs {
		tenant_id: "acme.example",
		product_id: "p1",
		title: "Cloud Nine",
		body: "A mattress.",
		vendor: "Acme Sleep",
		product_type: "Mattress",
		tags: &[],
		content_hash: "hash-1",
		profile,
		price: Some(899.0),
		available_for_sale: true,
		image_url: None,
		product_url: None,
		now,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LOFT_PG_DSN to run."]
async fn schema_bootstraps_idempotently() {
	let Some(base_dsn) = loft_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstraps_idempotently; set LOFT_PG_DSN.");

		return;
	};
	let test_db =
		loft_testkit::TestDatabase::create(&base_dsn).await.expect("test database failed");
	let db = connect(test_db.dsn()).await;

	db.ensure_schema().await.expect("second bootstrap failed");

	test_db.drop_db().await.expect("cleanup failed");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LOFT_PG_DSN to run."]
async fn profile_round_trips_through_exploded_columns() {
	let Some(base_dsn) = loft_testkit::env_dsn() else {
		eprintln!("Skipping profile_round_trips_through_exploded_columns; set LOFT_PG_DSN.");

		return;
	};
	let test_db =
		loft_testkit::TestDatabase::create(&base_dsn).await.expect("test database failed");
	let db = connect(test_db.dsn()).await;
	let now = OffsetDateTime::now_utc();
	let profile = profile();
	let stored =
		profiles::upsert_profile(&db.pool, store_args(&profile, now)).await.expect("upsert failed");
	let fetched = profiles::fetch_by_content_hash(&db.pool, "acme.example", "hash-1")
		.await
		.expect("fetch failed")
		.expect("profile missing");

	assert_eq!(fetched.profile_id, stored.profile_id);

	let rebuilt = fetched.attribute_profile();

	assert_eq!(rebuilt.firmness, Some(Firmness::MediumFirm));
	assert!(rebuilt.features.contains("cooling-gel"));
	assert_eq!(rebuilt.confidence, 1.0);
	assert_eq!(fetched.price, Some(899.0));

	// Same tenant and hash: the row is replaced, not duplicated.
	let replayed =
		profiles::upsert_profile(&db.pool, store_args(&profile, now)).await.expect("replay failed");

	assert_eq!(replayed.profile_id, stored.profile_id);

	test_db.drop_db().await.expect("cleanup failed");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LOFT_PG_DSN to run."]
async fn job_state_machine_is_guarded() {
	let Some(base_dsn) = loft_testkit::env_dsn() else {
		eprintln!("Skipping job_state_machine_is_guarded; set LOFT_PG_DSN.");

		return;
	};
	let test_db =
		loft_testkit::TestDatabase::create(&base_dsn).await.expect("test database failed");
	let db = connect(test_db.dsn()).await;
	let now = OffsetDateTime::now_utc();
	let args = || jobs::NewJobArgs {
		tenant_id: "acme.example",
		use_ai_enrichment: true,
		use_web_search: false,
		confidence_threshold: 0.5,
		now,
	};
	let job = jobs::create_job(&db.pool, args()).await.expect("create failed");

	assert_eq!(job.status, "pending");

	// A second active job for the same tenant is refused at the index.
	let conflict = jobs::create_job(&db.pool, args()).await;

	assert!(matches!(conflict, Err(Error::Conflict(_))));

	let claimed =
		jobs::claim_next_job(&db.pool, now).await.expect("claim failed").expect("no job claimed");

	assert_eq!(claimed.job_id, job.job_id);
	assert_eq!(claimed.status, "running");

	jobs::set_total(&db.pool, job.job_id, 10).await.expect("set_total failed");
	jobs::update_progress(&db.pool, job.job_id, 8, 2).await.expect("progress failed");

	assert!(
		jobs::complete_job(&db.pool, job.job_id, false, now).await.expect("complete failed")
	);
	// Terminal means terminal: neither completion nor failure applies twice.
	assert!(
		!jobs::complete_job(&db.pool, job.job_id, false, now).await.expect("recomplete failed")
	);
	assert!(!jobs::fail_job(&db.pool, job.job_id, "late", now).await.expect("refail failed"));

	let finished = jobs::fetch_job(&db.pool, job.job_id)
		.await
		.expect("fetch failed")
		.expect("job missing");

	assert_eq!(finished.status, "completed");
	assert_eq!(finished.processed_products, 8);
	assert_eq!(finished.failed_products, 2);

	// With the old job terminal, a new one can start.
	jobs::create_job(&db.pool, args()).await.expect("second create failed");

	test_db.drop_db().await.expect("cleanup failed");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set LOFT_PG_DSN to run."]
async fn credentials_upsert_and_fetch() {
	let Some(base_dsn) = loft_testkit::env_dsn() else {
		eprintln!("Skipping credentials_upsert_and_fetch; set LOFT_PG_DSN.");

		return;
	};
	let test_db =
		loft_testkit::TestDatabase::create(&base_dsn).await.expect("test database failed");
	let db = connect(test_db.dsn()).await;
	let now = OffsetDateTime::now_utc();

	credentials::upsert_credentials(&db.pool, "acme.example", "https://api.acme", "tok-1", now)
		.await
		.expect("upsert failed");
	credentials::upsert_credentials(&db.pool, "acme.example", "https://api.acme", "tok-2", now)
		.await
		.expect("second upsert failed");

	let record = credentials::fetch_credentials(&db.pool, "acme.example")
		.await
		.expect("fetch failed")
		.expect("credentials missing");

	assert_eq!(record.access_token, "tok-2");

	assert!(
		credentials::fetch_credentials(&db.pool, "other.example")
			.await
			.expect("fetch failed")
			.is_none()
	);

	test_db.drop_db().await.expect("cleanup failed");
}
