use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use loft_domain::{AttributeProfile, Firmness, Material};
use loft_storage::{
	models::ProductProfileRecord,
	profiles,
	qdrant::{RecordMetadata, VectorRecord, point_id_for},
};

use crate::{LoftService, ServiceError, ServiceResult};

/// A human edit to a stored profile. Every attribute supplied here is an
/// operator override, so it locks automatically; the explicit lock fields
/// allow locking or unlocking without changing the value.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileEditRequest {
	pub firmness: Option<Firmness>,
	pub height: Option<String>,
	pub material: Option<Material>,
	pub certifications: Option<Vec<String>>,
	pub features: Option<Vec<String>>,
	pub support_features: Option<Vec<String>>,
	pub lock_firmness: Option<bool>,
	pub lock_height: Option<bool>,
	pub lock_material: Option<bool>,
	pub lock_certifications: Option<bool>,
	pub lock_features: Option<bool>,
	pub lock_support_features: Option<bool>,
}
impl ProfileEditRequest {
	pub fn is_empty(&self) -> bool {
		self.firmness.is_none()
			&& self.height.is_none()
			&& self.material.is_none()
			&& self.certifications.is_none()
			&& self.features.is_none()
			&& self.support_features.is_none()
			&& self.lock_firmness.is_none()
			&& self.lock_height.is_none()
			&& self.lock_material.is_none()
			&& self.lock_certifications.is_none()
			&& self.lock_features.is_none()
			&& self.lock_support_features.is_none()
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct ProfileView {
	pub profile_id: Uuid,
	pub tenant_id: String,
	pub product_id: String,
	pub title: String,
	pub vendor: String,
	pub product_type: String,
	pub tags: Vec<String>,
	pub profile: AttributeProfile,
	pub content_hash: String,
	#[serde(with = "crate::time_serde")]
	pub enriched_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

impl LoftService {
	pub async fn list_profiles(
		&self,
		tenant_id: &str,
		limit: i64,
		offset: i64,
	) -> ServiceResult<Vec<ProfileView>> {
		let records =
			profiles::list(&self.db.pool, tenant_id, limit.clamp(1, 200), offset.max(0)).await?;

		Ok(records.into_iter().map(profile_view).collect())
	}

	pub async fn get_profile(&self, profile_id: Uuid) -> ServiceResult<ProfileView> {
		let record = self.fetch_profile(profile_id).await?;

		Ok(profile_view(record))
	}

	/// Applies a human edit, then re-embeds and re-upserts the vector record
	/// so index metadata stays consistent with the corrected profile.
	pub async fn edit_profile(
		&self,
		profile_id: Uuid,
		edit: ProfileEditRequest,
	) -> ServiceResult<ProfileView> {
		if edit.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "Profile edit carries no changes.".to_string(),
			});
		}

		let record = self.fetch_profile(profile_id).await?;
		let mut profile = record.attribute_profile();

		apply_edit(&mut profile, &edit);

		let now = OffsetDateTime::now_utc();
		let updated = profiles::update_attributes(&self.db.pool, profile_id, &profile, now)
			.await?
			.ok_or_else(|| ServiceError::NotFound {
				message: format!("Profile {profile_id} vanished during edit."),
			})?;

		self.reindex_profile(&updated).await?;

		tracing::info!(%profile_id, "Profile edited and re-embedded.");

		Ok(profile_view(updated))
	}

	pub async fn delete_profile(&self, profile_id: Uuid) -> ServiceResult<()> {
		let record = self.fetch_profile(profile_id).await?;
		let point_id = point_id_for(&record.tenant_id, &record.product_id);

		profiles::delete(&self.db.pool, profile_id).await?;
		self.vectors
			.delete(&[point_id])
			.await
			.map_err(|err| ServiceError::VectorStore { message: err.to_string() })?;

		tracing::info!(%profile_id, "Profile deleted.");

		Ok(())
	}

	async fn fetch_profile(&self, profile_id: Uuid) -> ServiceResult<ProductProfileRecord> {
		profiles::fetch(&self.db.pool, profile_id).await?.ok_or_else(|| ServiceError::NotFound {
			message: format!("No profile with id {profile_id}."),
		})
	}

	async fn reindex_profile(&self, record: &ProductProfileRecord) -> ServiceResult<()> {
		let profile = record.attribute_profile();
		let text = profile.embedding_text(
			&record.title,
			&record.body,
			&record.vendor,
			&record.product_type,
		);
		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &[text])
			.await?;
		let Some(vector) = embeddings.into_iter().next() else {
			return Err(ServiceError::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		let vector_record = VectorRecord {
			point_id: point_id_for(&record.tenant_id, &record.product_id),
			vector,
			metadata: RecordMetadata {
				tenant_id: record.tenant_id.clone(),
				product_id: record.product_id.clone(),
				title: record.title.clone(),
				product_type: record.product_type.clone(),
				vendor: record.vendor.clone(),
				profile,
				price: record.price,
				available_for_sale: record.available_for_sale,
				image_url: record.image_url.clone(),
				product_url: record.product_url.clone(),
				updated_at: record.updated_at,
			},
		};

		self.vectors
			.upsert(&[vector_record])
			.await
			.map_err(|err| ServiceError::VectorStore { message: err.to_string() })?;

		Ok(())
	}
}

fn profile_view(record: ProductProfileRecord) -> ProfileView {
	let profile = record.attribute_profile();
	let tags = record.tags_vec();

	ProfileView {
		profile_id: record.profile_id,
		tenant_id: record.tenant_id,
		product_id: record.product_id,
		title: record.title,
		vendor: record.vendor,
		product_type: record.product_type,
		tags,
		profile,
		content_hash: record.content_hash,
		enriched_at: record.enriched_at,
		updated_at: record.updated_at,
	}
}

/// Edited attributes lock; explicit lock fields can also lock or unlock
/// without changing the value.
pub fn apply_edit(profile: &mut AttributeProfile, edit: &ProfileEditRequest) {
	if let Some(firmness) = edit.firmness {
		profile.firmness = Some(firmness);
		profile.locks.firmness = true;
	}
	if let Some(height) = edit.height.clone() {
		profile.height = Some(height);
		profile.locks.height = true;
	}
	if let Some(material) = edit.material {
		profile.material = Some(material);
		profile.locks.material = true;
	}
	if let Some(certifications) = edit.certifications.clone() {
		profile.certifications = certifications.into_iter().collect();
		profile.locks.certifications = true;
	}
	if let Some(features) = edit.features.clone() {
		profile.features = features.into_iter().collect();
		profile.locks.features = true;
	}
	if let Some(support_features) = edit.support_features.clone() {
		profile.support_features = support_features.into_iter().collect();
		profile.locks.support_features = true;
	}
	if let Some(lock) = edit.lock_firmness {
		profile.locks.firmness = lock;
	}
	if let Some(lock) = edit.lock_height {
		profile.locks.height = lock;
	}
	if let Some(lock) = edit.lock_material {
		profile.locks.material = lock;
	}
	if let Some(lock) = edit.lock_certifications {
		profile.locks.certifications = lock;
	}
	if let Some(lock) = edit.lock_features {
		profile.locks.features = lock;
	}
	if let Some(lock) = edit.lock_support_features {
		profile.locks.support_features = lock;
	}
}
