use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::pipeline::{ContextCreator, ResponseActor, ResponseDecider};

type DeciderFactory =
    Box<dyn Fn(&AppConfig) -> Result<Arc<dyn ResponseDecider>, ConfigError> + Send + Sync>;
type ContextFactory =
    Box<dyn Fn(&AppConfig) -> Result<Arc<dyn ContextCreator>, ConfigError> + Send + Sync>;
type ActorFactory =
    Box<dyn Fn(&AppConfig) -> Result<Arc<dyn ResponseActor>, ConfigError> + Send + Sync>;

/// Startup-populated map from capability name to factory.
///
/// Factories validate their own credentials against the config and fail with
/// a `ConfigError` naming the missing field, so a misconfigured deployment
/// dies at bootstrap rather than on the first request. The registry is never
/// consulted after `resolve`.
#[derive(Default)]
pub struct CapabilityRegistry {
    deciders: HashMap<String, DeciderFactory>,
    context_creators: HashMap<String, ContextFactory>,
    actors: HashMap<String, ActorFactory>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_decider<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&AppConfig) -> Result<Arc<dyn ResponseDecider>, ConfigError> + Send + Sync + 'static,
    {
        self.deciders.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_context_creator<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&AppConfig) -> Result<Arc<dyn ContextCreator>, ConfigError> + Send + Sync + 'static,
    {
        self.context_creators.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_actor<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&AppConfig) -> Result<Arc<dyn ResponseActor>, ConfigError> + Send + Sync + 'static,
    {
        self.actors.insert(name.to_string(), Box::new(factory));
    }

    /// Resolve the configured capability names into a ready `Pipeline`.
    ///
    /// Exactly one decider and one context creator must be configured;
    /// actors may be zero or more. Unknown names are fatal here, not at
    /// request time.
    pub fn resolve(&self, config: &AppConfig) -> Result<Pipeline, ConfigError> {
        let pipeline = &config.pipeline;

        let [decider_name] = pipeline.deciders.as_slice() else {
            return Err(ConfigError::Validation(format!(
                "pipeline.deciders must name exactly one decider (found {})",
                pipeline.deciders.len()
            )));
        };
        let [context_name] = pipeline.context_creators.as_slice() else {
            return Err(ConfigError::Validation(format!(
                "pipeline.context_creators must name exactly one context creator (found {})",
                pipeline.context_creators.len()
            )));
        };

        let decider = self
            .deciders
            .get(decider_name)
            .ok_or_else(|| {
                ConfigError::Validation(format!("unknown response decider `{decider_name}`"))
            })?(config)?;

        let context_creator = self
            .context_creators
            .get(context_name)
            .ok_or_else(|| {
                ConfigError::Validation(format!("unknown context creator `{context_name}`"))
            })?(config)?;

        let mut actors = Vec::with_capacity(pipeline.actors.len());
        for actor_name in &pipeline.actors {
            let factory = self.actors.get(actor_name).ok_or_else(|| {
                ConfigError::Validation(format!("unknown response actor `{actor_name}`"))
            })?;
            actors.push(factory(config)?);
        }

        Ok(Pipeline { decider, context_creator, actors })
    }
}

/// The resolved, immutable set of capabilities for this deployment.
///
/// Shared read-only across concurrent requests.
pub struct Pipeline {
    pub decider: Arc<dyn ResponseDecider>,
    pub context_creator: Arc<dyn ContextCreator>,
    pub actors: Vec<Arc<dyn ResponseActor>>,
}

// Capabilities are bare trait objects, so only the shape is printable.
impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("actors", &self.actors.len()).finish_non_exhaustive()
    }
}
