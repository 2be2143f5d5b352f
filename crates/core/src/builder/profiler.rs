use indexmap::IndexMap;
use tracing::debug;

use super::context::{ContextBuilder, ContextState};
use crate::config::{ProfileConfig, Settings};
use crate::error::{Result, StateError};
use crate::model::{ContextId, MethodIdentity, ProfileResult, Reading, ThreadId};

/// Session facade routing an event stream that interleaves several contexts
/// to one `ContextBuilder` per context.
///
/// A failing event aborts only the context it belongs to; the others keep
/// recording.
#[derive(Debug)]
pub struct Profiler {
    settings: Settings,
    contexts: IndexMap<ContextId, ContextBuilder>,
}

impl Profiler {
    pub fn new(config: &ProfileConfig) -> Result<Self> {
        Ok(Self::with_settings(config.resolve()?))
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            contexts: IndexMap::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn begin_context(&mut self, context: ContextId, thread: ThreadId) -> Result<()> {
        if self.contexts.contains_key(&context) {
            return Err(StateError::DuplicateContext(context).into());
        }
        self.contexts.insert(
            context,
            ContextBuilder::new(context, thread, self.settings.clone()),
        );
        Ok(())
    }

    pub fn record_enter(
        &mut self,
        context: ContextId,
        identity: &MethodIdentity,
        reading: Reading,
    ) -> Result<()> {
        self.builder_mut(context)?.enter(identity, reading)
    }

    pub fn record_leave(&mut self, context: ContextId, reading: Reading) -> Result<()> {
        self.builder_mut(context)?.leave(reading)
    }

    pub fn record_suspend(&mut self, context: ContextId, reading: Reading) -> Result<()> {
        self.builder_mut(context)?.suspend(reading)
    }

    pub fn record_resume(&mut self, context: ContextId, reading: Reading) -> Result<()> {
        self.builder_mut(context)?.resume(reading)
    }

    /// Make a context read-only.
    pub fn finalize(&mut self, context: ContextId) -> Result<()> {
        self.builder_mut(context)?.finalize()
    }

    /// Finalize every context that is still recording.
    pub fn finalize_all(&mut self) -> Result<()> {
        for builder in self.contexts.values_mut() {
            builder.finalize()?;
        }
        Ok(())
    }

    pub fn state(&self, context: ContextId) -> Option<ContextState> {
        self.contexts.get(&context).map(ContextBuilder::state)
    }

    /// Contexts whose ingestion failed.
    pub fn aborted(&self) -> Vec<ContextId> {
        self.contexts
            .values()
            .filter(|b| b.state() == ContextState::Aborted)
            .map(ContextBuilder::id)
            .collect()
    }

    /// Collect every context into a result. Fails if any context is still
    /// recording.
    pub fn into_result(self) -> Result<ProfileResult> {
        if let Some(open) = self
            .contexts
            .values()
            .find(|b| b.state() == ContextState::Recording)
        {
            return Err(StateError::NotFinalized(open.id()).into());
        }
        let axes = self.settings.axes().clone();
        let contexts = self
            .contexts
            .into_values()
            .map(ContextBuilder::finish)
            .collect::<Result<Vec<_>>>()?;
        debug!(contexts = contexts.len(), "profiling session collected");
        ProfileResult::from_contexts(axes, contexts)
    }

    fn builder_mut(&mut self, context: ContextId) -> Result<&mut ContextBuilder> {
        self.contexts
            .get_mut(&context)
            .ok_or_else(|| StateError::UnknownContext(context).into())
    }
}
