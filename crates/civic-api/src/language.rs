//! Handlers for `/language` and `/i18n`.

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State},
};
use civic_core::{
  i18n::{self, Language},
  store::PortalStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguageBody {
  pub language: Language,
}

/// `GET /language`
pub async fn current<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Json<LanguageBody>, ApiError> {
  let language = state.language.current().await?;
  Ok(Json(LanguageBody { language }))
}

/// `PUT /language` with body `{"language":"te"}`
pub async fn select<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Json(body): Json<LanguageBody>,
) -> Result<Json<LanguageBody>, ApiError> {
  state.language.select(body.language).await?;
  Ok(Json(body))
}

#[derive(Debug, Serialize)]
pub struct Translations {
  pub language: Language,
  pub strings:  BTreeMap<&'static str, &'static str>,
}

/// `GET /i18n/{lang}`
pub async fn translations(Path(lang): Path<String>) -> Result<Json<Translations>, ApiError> {
  let language: Language = lang
    .parse()
    .map_err(|_| ApiError::BadRequest(format!("unsupported language {lang:?}")))?;
  Ok(Json(Translations {
    language,
    strings: i18n::table(language).into_iter().collect(),
  }))
}
