mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Overfetch, Providers, Qdrant, Rag, Service, Snapshot, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider embedding api_key must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.is_some() && cfg.storage.snapshot.is_some() {
		return Err(Error::Validation {
			message: "storage.qdrant and storage.snapshot are mutually exclusive.".to_string(),
		});
	}

	if let Some(qdrant) = cfg.storage.qdrant.as_ref() {
		if qdrant.collection.trim().is_empty() {
			return Err(Error::Validation {
				message: "storage.qdrant.collection must be non-empty.".to_string(),
			});
		}
		if cfg.providers.embedding.dimensions != qdrant.vector_dim {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
					.to_string(),
			});
		}
		if qdrant.text_field.trim().is_empty() {
			return Err(Error::Validation {
				message: "storage.qdrant.text_field must be non-empty.".to_string(),
			});
		}
	}

	if cfg.rag.max_results == 0 {
		return Err(Error::Validation {
			message: "rag.max_results must be greater than zero.".to_string(),
		});
	}
	if !cfg.rag.min_score.is_finite() {
		return Err(Error::Validation {
			message: "rag.min_score must be a finite number.".to_string(),
		});
	}
	if cfg.rag.snippet_max_chars == 0 {
		return Err(Error::Validation {
			message: "rag.snippet_max_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.rag.overfetch.multiplier == 0 {
		return Err(Error::Validation {
			message: "rag.overfetch.multiplier must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.rag.libraries.as_deref().map(|libraries| libraries.trim().is_empty()).unwrap_or(false)
	{
		cfg.rag.libraries = None;
	}
	if let Some(libraries) = cfg.rag.libraries.as_mut() {
		*libraries = libraries.trim().to_string();
	}
	if let Some(qdrant) = cfg.storage.qdrant.as_mut()
		&& qdrant.vector_name.as_deref().map(|name| name.trim().is_empty()).unwrap_or(false)
	{
		qdrant.vector_name = None;
	}
}
