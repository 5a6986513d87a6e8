use std::{collections::HashMap, time::Duration};

use qdrant_client::qdrant::{
	Condition, Filter as QdrantFilter, PointId, Query, QueryPointsBuilder, ScoredPoint, Value,
	point_id::PointIdOptions, value::Kind,
};

use crate::{Error, Result, models::StoreHit};
use lore_domain::{Filter, Metadata, MetadataValue};

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
	pub vector_name: Option<String>,
	pub text_field: String,
}
impl QdrantStore {
	pub fn new(cfg: &lore_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url)
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()?;

		Ok(Self {
			client,
			collection: cfg.collection.clone(),
			vector_dim: cfg.vector_dim,
			vector_name: cfg.vector_name.clone(),
			text_field: cfg.text_field.clone(),
		})
	}

	pub async fn search(
		&self,
		vector: Vec<f32>,
		filter: Option<&Filter>,
		k: u32,
		min_score: f32,
	) -> Result<Vec<StoreHit>> {
		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.limit(k as u64)
			.score_threshold(min_score)
			.with_payload(true);

		if let Some(name) = self.vector_name.as_deref() {
			search = search.using(name);
		}
		if let Some(filter) = filter {
			search = search.filter(to_qdrant_filter(filter)?);
		}

		let response = self.client.query(search).await?;

		Ok(response.result.into_iter().map(|point| self.to_hit(point)).collect())
	}

	fn to_hit(&self, point: ScoredPoint) -> StoreHit {
		let id = point.id.as_ref().map(point_id_to_string).unwrap_or_default();
		let mut payload = point.payload;
		let text = match payload.remove(&self.text_field).and_then(|value| value.kind) {
			Some(Kind::StringValue(text)) => text,
			_ => {
				tracing::warn!(point_id = %id, text_field = %self.text_field, "Point has no text payload.");

				String::new()
			},
		};

		StoreHit { metadata: payload_to_metadata(&id, payload), id, text, score: point.score }
	}
}

/// Translates a metadata filter into Qdrant conditions.
///
/// `And` maps to `must`, `Or` to `should`. `ContainsSubstring` uses a text match, which Qdrant
/// evaluates as a plain substring test when the field has no full-text index. Float equality has
/// no Qdrant counterpart and is rejected.
pub fn to_qdrant_filter(filter: &Filter) -> Result<QdrantFilter> {
	match filter {
		Filter::And(left, right) => Ok(QdrantFilter::all([to_condition(left)?, to_condition(right)?])),
		Filter::Or(left, right) => Ok(QdrantFilter::any([to_condition(left)?, to_condition(right)?])),
		leaf => Ok(QdrantFilter::all([to_condition(leaf)?])),
	}
}

fn to_condition(filter: &Filter) -> Result<Condition> {
	match filter {
		Filter::Equals { field, value } => match value {
			MetadataValue::Text(text) => Ok(Condition::matches(field.clone(), text.clone())),
			MetadataValue::Integer(number) => Ok(Condition::matches(field.clone(), *number)),
			MetadataValue::Float(number) => Err(Error::UnsupportedFilter(format!(
				"Equality on float value {number} for field {field} is not supported."
			))),
		},
		Filter::ContainsSubstring { field, substring } =>
			Ok(Condition::matches_text(field.clone(), substring.clone())),
		Filter::And(_, _) | Filter::Or(_, _) => Ok(Condition::from(to_qdrant_filter(filter)?)),
	}
}

fn point_id_to_string(point_id: &PointId) -> String {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => id.clone(),
		Some(PointIdOptions::Num(id)) => id.to_string(),
		None => String::new(),
	}
}

fn payload_to_metadata(point_id: &str, payload: HashMap<String, Value>) -> Metadata {
	let mut metadata = Metadata::new();

	for (key, value) in payload {
		let converted = match value.kind {
			Some(Kind::StringValue(text)) => MetadataValue::Text(text),
			Some(Kind::IntegerValue(number)) => MetadataValue::Integer(number),
			Some(Kind::DoubleValue(number)) => MetadataValue::Float(number),
			Some(Kind::BoolValue(flag)) => MetadataValue::Text(flag.to_string()),
			_ => {
				tracing::warn!(%point_id, field = %key, "Skipping non-scalar payload value.");

				continue;
			},
		};

		metadata.insert(key, converted);
	}

	metadata
}
