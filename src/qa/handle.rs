use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::info;

use super::QaEngine;

type Loader = Box<dyn Fn() -> BoxFuture<'static, Result<QaEngine>> + Send + Sync>;

/// Lazily loaded, explicitly reloadable engine.
///
/// The first `get` builds the engine and later calls share it. `reset` drops
/// the shared instance so the next `get` loads a fresh one. A failed load is
/// not remembered.
pub struct EngineHandle {
    loader: Loader,
    slot: Mutex<Option<Arc<QaEngine>>>,
}

impl EngineHandle {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<QaEngine>> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            slot: Mutex::new(None),
        }
    }

    pub async fn get(&self) -> Result<Arc<QaEngine>> {
        let mut slot = self.slot.lock().await;
        if let Some(engine) = slot.as_ref() {
            return Ok(engine.clone());
        }

        info!("Loading QA engine");
        let engine = Arc::new((self.loader)().await?);
        *slot = Some(engine.clone());
        Ok(engine)
    }

    /// Drop the loaded engine. Returns whether one was loaded.
    pub async fn reset(&self) -> bool {
        let was_loaded = self.slot.lock().await.take().is_some();
        info!(was_loaded, "QA engine reset");
        was_loaded
    }

    /// Whether an engine is ready. Reports `false` while a load is in progress.
    pub fn is_loaded(&self) -> bool {
        self.slot.try_lock().is_ok_and(|slot| slot.is_some())
    }
}
