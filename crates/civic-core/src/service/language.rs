//! The persisted language selection.

use std::sync::Arc;

use crate::{Error, Result, i18n::Language, store::PortalStore};

/// Key-value slot holding the selected language code.
pub const LANGUAGE_KEY: &str = "language";

pub struct LanguageService<S> {
  store: Arc<S>,
}

impl<S: PortalStore> LanguageService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// The selected language; English when unset or unreadable.
  pub async fn current(&self) -> Result<Language> {
    let Some(raw) = self.store.get_value(LANGUAGE_KEY).await.map_err(Error::store)? else {
      return Ok(Language::default());
    };
    match serde_json::from_str::<Language>(&raw) {
      Ok(lang) => Ok(lang),
      Err(e) => {
        tracing::warn!(error = %e, stored = %raw, "discarding unreadable language selection");
        self.store.remove_value(LANGUAGE_KEY).await.map_err(Error::store)?;
        Ok(Language::default())
      }
    }
  }

  pub async fn select(&self, lang: Language) -> Result<()> {
    let json = serde_json::to_string(&lang)?;
    self
      .store
      .put_value(LANGUAGE_KEY, json)
      .await
      .map_err(Error::store)
  }
}
