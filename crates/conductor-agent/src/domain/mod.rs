//! Domain functions
//!
//! A domain function turns the text of a task's last user message into the
//! agent's reply. The worker executor owns everything else (state changes,
//! history, error capture), so implementations only compute text.
//!
//! The set of built-in functions is closed and chosen once per agent from its
//! [`AgentProfile`](crate::registry::AgentProfile) by [`from_descriptor`].

mod classifier;
mod director;
mod summarizer;

pub use classifier::Classifier;
pub use director::{
    CLASSIFICATION_FALLBACK, Director, SUMMARY_FALLBACK, render_conclusions,
};
pub use summarizer::Summarizer;

use async_trait::async_trait;
use conductor_a2a::TaskContext;
use std::sync::Arc;

use crate::config::PollPolicy;
use crate::error::{ConductorResult, DomainResult};
use crate::registry::{AgentDescriptor, AgentProfile, AgentRegistry};

/// Capability shared by every agent's processing step
#[async_trait]
pub trait DomainFunction: Send + Sync + 'static {
    /// Compute the reply for `text`.
    ///
    /// `context` is the task's side-channel; values written here are stored
    /// with the task when it finishes, whether it completes or fails.
    async fn process(&self, text: &str, context: &mut TaskContext) -> DomainResult<String>;
}

/// Build the domain function selected by an agent's profile.
///
/// Directors resolve the agents they orchestrate through `registry`.
pub fn from_descriptor(
    descriptor: &AgentDescriptor,
    registry: &AgentRegistry,
    poll: PollPolicy,
) -> ConductorResult<Arc<dyn DomainFunction>> {
    let domain: Arc<dyn DomainFunction> = match &descriptor.profile {
        AgentProfile::Summarizer { fallback_length } => {
            Arc::new(Summarizer::new(*fallback_length))
        }
        AgentProfile::Classifier {
            categories,
            fallback_keywords,
        } => Arc::new(Classifier::new(
            categories.clone(),
            fallback_keywords.clone(),
        )),
        AgentProfile::Director { orchestrates } => {
            Arc::new(Director::from_registry(orchestrates, registry, poll)?)
        }
    };
    Ok(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CLASSIFIER_AGENT, DIRECTOR_AGENT, SUMMARIZER_AGENT};

    #[tokio::test]
    async fn test_from_descriptor_selects_profile() {
        let registry = AgentRegistry::local("http://localhost:8000").unwrap();
        let mut context = TaskContext::new();

        let classifier = from_descriptor(
            registry.get(CLASSIFIER_AGENT).unwrap(),
            &registry,
            PollPolicy::default(),
        )
        .unwrap();
        assert_eq!(
            classifier.process("my heart", &mut context).await.unwrap(),
            "medical"
        );

        let summarizer = from_descriptor(
            registry.get(SUMMARIZER_AGENT).unwrap(),
            &registry,
            PollPolicy::default(),
        )
        .unwrap();
        assert_eq!(
            summarizer.process("short", &mut context).await.unwrap(),
            "short"
        );

        assert!(
            from_descriptor(
                registry.get(DIRECTOR_AGENT).unwrap(),
                &registry,
                PollPolicy::default(),
            )
            .is_ok()
        );
    }
}
