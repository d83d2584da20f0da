use std::collections::HashSet;
use std::sync::Arc;

use crate::qa::EngineHandle;
use crate::session::SessionStore;

pub struct AppState {
    pub engine: Arc<EngineHandle>,
    pub sessions: SessionStore,
    pub admin_ids: HashSet<u64>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// With no admins configured, everyone may run admin commands.
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.is_empty() || self.admin_ids.contains(&user_id)
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
