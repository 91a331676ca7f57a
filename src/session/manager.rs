use std::sync::Arc;

use tracing::debug;

use super::{Propagator, Session, SessionError, Store};
use crate::context::Context;
use crate::ids::new_session_id;

/// Store plus propagator, shared by the handlers that touch sessions.
#[derive(Clone)]
pub struct Manager {
    store: Arc<dyn Store>,
    propagator: Arc<dyn Propagator>,
}

impl Manager {
    pub fn new(store: Arc<dyn Store>, propagator: Arc<dyn Propagator>) -> Self {
        Self { store, propagator }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Session named by the request's propagated id.
    pub fn get_session(&self, ctx: &Context<'_>) -> Result<Arc<dyn Session>, SessionError> {
        let id = self.propagator.extract(ctx.request())?;
        self.store.get(&id)
    }

    /// Create a session under a fresh id and send the id to the client.
    pub fn init_session(&self, ctx: &mut Context<'_>) -> Result<Arc<dyn Session>, SessionError> {
        let id = new_session_id();
        let session = self.store.generate(&id)?;
        self.propagator.inject(&id, ctx.resp())?;
        debug!(session_id = %id, request_id = %ctx.request_id(), "session created");
        Ok(session)
    }

    /// Extend the current session's lifetime.
    pub fn refresh_session(&self, ctx: &Context<'_>) -> Result<(), SessionError> {
        let session = self.get_session(ctx)?;
        self.store.refresh(session.id())
    }

    /// End the current session: clear the client's id and drop the stored data.
    pub fn remove_session(&self, ctx: &mut Context<'_>) -> Result<(), SessionError> {
        let session = self.get_session(ctx)?;
        self.propagator.remove(ctx.resp())?;
        self.store.remove(session.id())?;
        debug!(session_id = %session.id(), "session removed");
        Ok(())
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager").finish_non_exhaustive()
    }
}
