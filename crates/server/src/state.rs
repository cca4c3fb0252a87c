use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pantry_core::AppConfig;
use pantry_menu::{GeminiClient, LlmClient, MenuOptions};
use pantry_ocr::{OcrBackend, ReceiptPipeline, VisionRecognizer};
use pantry_storage::{AnyStore, InventoryStore};

use crate::session::SessionStore;

/// The three external services the handlers talk to.
pub trait Backends: Send + Sync + 'static {
    type Store: InventoryStore + 'static;
    type Ocr: OcrBackend + 'static;
    type Llm: LlmClient + 'static;
}

/// Production wiring: configured datastore, Cloud Vision and Gemini.
pub struct Live;

impl Backends for Live {
    type Store = AnyStore;
    type Ocr = VisionRecognizer;
    type Llm = GeminiClient;
}

#[derive(Debug, Clone)]
pub struct MenuSettings {
    pub models: Vec<String>,
    pub default_model: Option<String>,
}

impl MenuSettings {
    pub fn options(&self) -> MenuOptions {
        MenuOptions::new(self.models.clone(), self.default_model.clone())
    }

    /// The requested model, or the default. `None` when the model is not offered.
    pub fn resolve<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        let model = requested
            .filter(|m| !m.trim().is_empty())
            .or(self.default_model.as_deref())
            .or_else(|| self.models.first().map(String::as_str))?;
        self.models.iter().any(|m| m == model).then_some(model)
    }
}

pub struct AppState<B: Backends> {
    pub store: Arc<B::Store>,
    /// `None` when no OCR key is configured.
    pub scanner: Option<Arc<ReceiptPipeline<B::Ocr>>>,
    /// `None` when no LLM key is configured.
    pub llm: Option<Arc<B::Llm>>,
    pub menu: Arc<MenuSettings>,
    pub sessions: SessionStore,
}

impl<B: Backends> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            scanner: self.scanner.clone(),
            llm: self.llm.clone(),
            menu: self.menu.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

impl<B: Backends> AppState<B> {
    pub fn new(
        store: B::Store,
        ocr: Option<B::Ocr>,
        llm: Option<B::Llm>,
        menu: MenuSettings,
    ) -> Self {
        Self {
            store: Arc::new(store),
            scanner: ocr.map(|r| Arc::new(ReceiptPipeline::new(r))),
            llm: llm.map(Arc::new),
            menu: Arc::new(menu),
            sessions: SessionStore::default(),
        }
    }
}

impl AppState<Live> {
    /// Connect the datastore and build the remote clients described by `config`.
    pub async fn from_config(config: &AppConfig, default_db_path: &Path) -> anyhow::Result<Self> {
        let store = AnyStore::connect(&config.storage, default_db_path).await?;
        tracing::info!(backend = store.backend_name(), "Inventory store ready");

        let ocr = config
            .ocr
            .api_key
            .clone()
            .map(|key| VisionRecognizer::new(key, config.ocr.endpoint.clone()));
        if ocr.is_none() {
            tracing::warn!("GOOGLE_VISION_API_KEY is not set; receipt scanning is disabled");
        }

        let llm = config
            .llm
            .api_key
            .clone()
            .map(|key| GeminiClient::new(key, config.llm.endpoint.clone()));
        if llm.is_none() {
            tracing::warn!("GOOGLE_API_KEY is not set; menu suggestions are disabled");
        }

        let menu = MenuSettings {
            models: config.llm.models.clone(),
            default_model: config.llm.default_model().map(str::to_string),
        };

        let mut state = Self::new(store, ocr, llm, menu);
        state.sessions =
            SessionStore::with_ttl(Duration::from_secs(config.server.session_ttl_secs));
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MenuSettings {
        MenuSettings {
            models: vec!["gemini-1.5-flash".into(), "gemini-2.5-flash".into()],
            default_model: Some("gemini-2.5-flash".into()),
        }
    }

    #[test]
    fn resolve_prefers_requested_model() {
        assert_eq!(settings().resolve(Some("gemini-1.5-flash")), Some("gemini-1.5-flash"));
    }

    #[test]
    fn resolve_falls_back_to_default() {
        assert_eq!(settings().resolve(None), Some("gemini-2.5-flash"));
        assert_eq!(settings().resolve(Some(" ")), Some("gemini-2.5-flash"));
        let no_default = MenuSettings {
            default_model: None,
            ..settings()
        };
        assert_eq!(no_default.resolve(None), Some("gemini-1.5-flash"));
    }

    #[test]
    fn resolve_rejects_unlisted_model() {
        assert_eq!(settings().resolve(Some("gpt-4o")), None);
    }
}
