//! Orchestrating domain function.
//!
//! The director forwards its input to a summarizer and a classifier at the
//! same time, polls both until they finish, and renders their answers into a
//! fixed template. A downstream failure or timeout never fails the director's
//! own task: the branch is replaced by its fallback value.

use async_trait::async_trait;
use conductor_a2a::{A2aClient, A2aError, TaskContext, TaskState};
use serde_json::Value;
use tracing::{debug, warn};

use super::DomainFunction;
use crate::config::PollPolicy;
use crate::error::{ConductorError, ConductorResult, DomainError, DomainResult};
use crate::registry::AgentRegistry;

/// Summary used when the summarizer branch yields nothing usable
pub const SUMMARY_FALLBACK: &str = "[No summary available]";
/// Label used when the classifier branch yields nothing usable
pub const CLASSIFICATION_FALLBACK: &str = "[No classification available]";

/// Render the director's reply.
///
/// Sections always appear in this order, whatever order the downstream
/// agents finished in.
pub fn render_conclusions(summary: &str, label: &str) -> String {
    format!(
        "Our behind-the-scenes bots formed the following conclusions:\n## Summary:\n{}\n## Label:\n{}",
        summary, label
    )
    .trim()
    .to_string()
}

/// One downstream agent the director talks to
#[derive(Debug, Clone)]
struct Downstream {
    name: String,
    client: A2aClient,
}

/// What came back from one fan-out branch
#[derive(Debug)]
struct Branch {
    task_id: Option<String>,
    outcome: DomainResult<String>,
}

impl Downstream {
    fn new(name: impl Into<String>, endpoint: &str, poll: &PollPolicy) -> DomainResult<Self> {
        Ok(Self {
            name: name.into(),
            client: A2aClient::with_timeout(endpoint, poll.request_timeout)?,
        })
    }

    /// Submit `text` and poll until the downstream task is terminal
    async fn ask(&self, text: &str, poll: &PollPolicy) -> Branch {
        let submitted = match self.client.send_text(text).await {
            Ok(task) => task,
            Err(e) => {
                return Branch {
                    task_id: None,
                    outcome: Err(DomainError::downstream(&self.name, e.to_string())),
                };
            }
        };
        debug!(agent = %self.name, task_id = %submitted.id, "Downstream task submitted");

        let outcome = match self
            .client
            .wait_for_task(&submitted.id, poll.interval, poll.timeout)
            .await
        {
            Ok(task) if task.state == TaskState::Completed => {
                Ok(task.last_agent_text().unwrap_or_default())
            }
            Ok(task) => Err(DomainError::downstream(
                &self.name,
                task.last_agent_text()
                    .unwrap_or_else(|| format!("task ended {}", task.state)),
            )),
            Err(A2aError::Timeout { timeout_ms }) => Err(DomainError::Timeout(
                format!("{} did not finish within {}ms", self.name, timeout_ms),
            )),
            Err(e) => Err(DomainError::downstream(&self.name, e.to_string())),
        };

        Branch {
            task_id: Some(submitted.id),
            outcome,
        }
    }
}

/// Fan-out/fan-in orchestrator over a summarizer and a classifier
#[derive(Debug, Clone)]
pub struct Director {
    summarizer: Downstream,
    classifier: Downstream,
    poll: PollPolicy,
}

impl Director {
    /// Director over explicit endpoints
    pub fn new(
        summarizer_endpoint: &str,
        classifier_endpoint: &str,
        poll: PollPolicy,
    ) -> DomainResult<Self> {
        Ok(Self {
            summarizer: Downstream::new("summarizer", summarizer_endpoint, &poll)?,
            classifier: Downstream::new("classifier", classifier_endpoint, &poll)?,
            poll,
        })
    }

    /// Director over the orchestrated agents named in its profile.
    ///
    /// The summarizer and classifier are picked by their profile kind, so the
    /// order of `orchestrates` does not matter.
    pub fn from_registry(
        orchestrates: &[String],
        registry: &AgentRegistry,
        poll: PollPolicy,
    ) -> ConductorResult<Self> {
        let find = |kind: &str| -> ConductorResult<Downstream> {
            let agent = orchestrates
                .iter()
                .filter_map(|name| registry.get(name))
                .find(|agent| agent.profile.kind() == kind)
                .ok_or_else(|| {
                    ConductorError::Registry(format!("director orchestrates no {} agent", kind))
                })?;
            Downstream::new(&agent.name, &agent.endpoint, &poll).map_err(|e| match e {
                DomainError::A2a(e) => ConductorError::A2a(e),
                other => ConductorError::Registry(other.to_string()),
            })
        };

        let summarizer = find("summarizer")?;
        let classifier = find("classifier")?;
        Ok(Self {
            summarizer,
            classifier,
            poll,
        })
    }
}

/// Keep a usable downstream answer or substitute the fallback
fn settle(agent: &str, branch: &Branch, fallback: &str) -> String {
    match &branch.outcome {
        Ok(text) if !text.trim().is_empty() => text.clone(),
        Ok(_) => {
            warn!(agent = %agent, task_id = ?branch.task_id, "Downstream returned an empty result");
            fallback.to_string()
        }
        Err(e) => {
            warn!(agent = %agent, task_id = ?branch.task_id, error = %e, "Downstream failed, using fallback");
            fallback.to_string()
        }
    }
}

#[async_trait]
impl DomainFunction for Director {
    async fn process(&self, text: &str, context: &mut TaskContext) -> DomainResult<String> {
        let (summary_branch, label_branch) = tokio::join!(
            self.summarizer.ask(text, &self.poll),
            self.classifier.ask(text, &self.poll),
        );

        let summary = settle(&self.summarizer.name, &summary_branch, SUMMARY_FALLBACK);
        let label = settle(&self.classifier.name, &label_branch, CLASSIFICATION_FALLBACK);

        if let Some(id) = summary_branch.task_id {
            context.insert("summarizer_task_id".to_string(), Value::String(id));
        }
        if let Some(id) = label_branch.task_id {
            context.insert("classifier_task_id".to_string(), Value::String(id));
        }
        context.insert("summary".to_string(), Value::String(summary.clone()));
        context.insert("label".to_string(), Value::String(label.clone()));

        Ok(render_conclusions(&summary, &label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_poll() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(10),
            timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_render_order_and_trim() {
        let rendered = render_conclusions("A summary", "insurance");
        assert_eq!(
            rendered,
            "Our behind-the-scenes bots formed the following conclusions:\n\
             ## Summary:\nA summary\n## Label:\ninsurance"
        );
        assert!(rendered.find("## Summary:") < rendered.find("## Label:"));
    }

    #[test]
    fn test_render_trims_trailing_whitespace() {
        assert!(render_conclusions("s", "label \n").ends_with("label"));
    }

    #[test]
    fn test_settle() {
        let ok = Branch {
            task_id: Some("t".into()),
            outcome: Ok("real".into()),
        };
        assert_eq!(settle("s", &ok, SUMMARY_FALLBACK), "real");

        let blank = Branch {
            task_id: Some("t".into()),
            outcome: Ok("  ".into()),
        };
        assert_eq!(settle("s", &blank, SUMMARY_FALLBACK), SUMMARY_FALLBACK);

        let failed = Branch {
            task_id: None,
            outcome: Err(DomainError::Timeout("slow".into())),
        };
        assert_eq!(
            settle("c", &failed, CLASSIFICATION_FALLBACK),
            CLASSIFICATION_FALLBACK
        );
    }

    #[tokio::test]
    async fn test_unreachable_downstreams_fall_back() {
        // Nothing listens on port 9
        let director =
            Director::new("http://127.0.0.1:9/s/", "http://127.0.0.1:9/c/", fast_poll()).unwrap();
        let mut context = TaskContext::new();

        let reply = director.process("hello", &mut context).await.unwrap();

        assert_eq!(
            reply,
            render_conclusions(SUMMARY_FALLBACK, CLASSIFICATION_FALLBACK)
        );
        assert_eq!(context["summary"], SUMMARY_FALLBACK);
        assert!(!context.contains_key("summarizer_task_id"));
    }

    #[test]
    fn test_from_registry_picks_by_kind() {
        let registry = AgentRegistry::local("http://localhost:8000").unwrap();
        let reversed = vec![
            crate::registry::CLASSIFIER_AGENT.to_string(),
            crate::registry::SUMMARIZER_AGENT.to_string(),
        ];

        let director = Director::from_registry(&reversed, &registry, fast_poll()).unwrap();
        assert_eq!(
            director.summarizer.client.endpoint().as_str(),
            "http://localhost:8000/summarizer/"
        );
        assert_eq!(
            director.classifier.client.endpoint().as_str(),
            "http://localhost:8000/classifier/"
        );
    }

    #[test]
    fn test_from_registry_requires_both_kinds() {
        let registry = AgentRegistry::local("http://localhost:8000").unwrap();
        let only_one = vec![crate::registry::SUMMARIZER_AGENT.to_string()];
        assert!(Director::from_registry(&only_one, &registry, fast_poll()).is_err());
    }
}
