use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Map;
use tower::util::ServiceExt;

use loft_api::{routes, state::AppState};
use loft_config::{
	Catalog, Config, EmbeddingProviderConfig, Enrichment, Indexing, LlmProviderConfig, Postgres,
	Qdrant, Recommend, Retry, Service, Storage,
};

fn test_config(dsn: String, qdrant_url: String, collection: String) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			postgres: Postgres { dsn, pool_max_conns: 2 },
			qdrant: Qdrant { url: qdrant_url, collection, vector_dim: 4 },
		},
		providers: loft_config::Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test-embed".to_string(),
				dimensions: 4,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			enrichment: dummy_llm_provider(),
			websearch: dummy_llm_provider(),
			classifier: dummy_llm_provider(),
		},
		catalog: Catalog {
			poll_interval_ms: 1,
			max_poll_attempts: 3,
			request_timeout_ms: 1_000,
		},
		indexing: Indexing {
			product_batch_size: 50,
			classification_batch_size: 15,
			max_uncertain_products: 200,
			batch_delay_ms: 1,
			classification_delay_ms: 1,
			stale_job_minutes: 30,
			worker_poll_interval_ms: 10,
		},
		enrichment: Enrichment {
			use_ai_enrichment: true,
			use_web_search: false,
			confidence_threshold: 0.5,
			mapping_overrides: Default::default(),
		},
		recommend: Recommend { default_top_k: 5, max_top_k: 20 },
		retry: Retry {
			max_attempts: 1,
			initial_delay_ms: 1,
			max_delay_ms: 2,
			backoff_multiplier: 2,
		},
	}
}

fn dummy_llm_provider() -> LlmProviderConfig {
	LlmProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:1".to_string(),
		api_key: "test-key".to_string(),
		path: "/v1/chat/completions".to_string(),
		model: "test-llm".to_string(),
		temperature: 0.1,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

async fn test_env() -> Option<(loft_testkit::TestDatabase, String, String)> {
	let Some(base_dsn) = loft_testkit::env_dsn() else {
		eprintln!("Skipping HTTP tests; set LOFT_PG_DSN to run this test.");

		return None;
	};
	let Some(qdrant_url) = loft_testkit::env_qdrant_url() else {
		eprintln!("Skipping HTTP tests; set LOFT_QDRANT_URL to run this test.");

		return None;
	};
	let test_db =
		loft_testkit::TestDatabase::create(&base_dsn).await.expect("test database failed");
	let collection = test_db.collection_name("loft_http");

	Some((test_db, qdrant_url, collection))
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set LOFT_PG_DSN and LOFT_QDRANT_URL to run."]
async fn health_ok() {
	let Some((test_db, qdrant_url, collection)) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string(), qdrant_url.clone(), collection.clone());
	let state = AppState::new(config).await.expect("app state failed");
	let app = routes::router(state.clone());
	let _ = routes::admin_router(state);
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request failed"))
		.await
		.expect("call failed");

	assert_eq!(response.status(), StatusCode::OK);

	loft_testkit::drop_qdrant_collection(&qdrant_url, &collection).await.ok();
	test_db.drop_db().await.expect("cleanup failed");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set LOFT_PG_DSN and LOFT_QDRANT_URL to run."]
async fn empty_intent_is_a_bad_request() {
	let Some((test_db, qdrant_url, collection)) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string(), qdrant_url.clone(), collection.clone());
	let state = AppState::new(config).await.expect("app state failed");
	let app = routes::router(state);
	let payload = serde_json::json!({
		"tenant_id": "acme.example",
		"intent": {}
	});
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/recommendations")
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("request failed"),
		)
		.await
		.expect("call failed");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("body read failed");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("body parse failed");

	assert_eq!(json["error_code"], "INVALID_REQUEST");

	loft_testkit::drop_qdrant_collection(&qdrant_url, &collection).await.ok();
	test_db.drop_db().await.expect("cleanup failed");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set LOFT_PG_DSN and LOFT_QDRANT_URL to run."]
async fn unknown_profile_is_not_found() {
	let Some((test_db, qdrant_url, collection)) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string(), qdrant_url.clone(), collection.clone());
	let state = AppState::new(config).await.expect("app state failed");
	let app = routes::router(state);
	let response = app
		.oneshot(
			Request::builder()
				.uri(format!("/v1/profiles/{}", uuid::Uuid::new_v4()))
				.body(Body::empty())
				.expect("request failed"),
		)
		.await
		.expect("call failed");

	assert_eq!(response.status(), StatusCode::NOT_FOUND);

	loft_testkit::drop_qdrant_collection(&qdrant_url, &collection).await.ok();
	test_db.drop_db().await.expect("cleanup failed");
}
