//! Agent Registry
//!
//! Static catalogue of the agents a Conductor host knows about: their names,
//! endpoints and the profile that selects their domain function. The registry
//! is consulted once at startup; nothing looks agents up per request.
//!
//! # Example
//!
//! ```rust
//! use conductor_agent::registry::{AgentRegistry, CLASSIFIER_AGENT};
//!
//! let registry = AgentRegistry::local("http://localhost:8000").unwrap();
//! assert_eq!(
//!     registry.resolve(CLASSIFIER_AGENT).unwrap(),
//!     "http://localhost:8000/classifier/"
//! );
//! ```

use conductor_a2a::AgentCard;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};
use url::Url;

use crate::error::{ConductorError, ConductorResult};

pub const SUMMARIZER_AGENT: &str = "Summarizer Agent";
pub const CLASSIFIER_AGENT: &str = "Classifier Agent";
pub const DIRECTOR_AGENT: &str = "Director Agent";

/// Lifecycle status of a registered agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
    Deprecated,
}

/// One keyword rule of a classifier: any keyword hit yields `label`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(label: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            label: label.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Which domain function an agent runs, with its settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AgentProfile {
    Summarizer {
        #[serde(default = "default_fallback_length")]
        fallback_length: usize,
    },
    Classifier {
        categories: Vec<String>,
        #[serde(default)]
        fallback_keywords: Vec<KeywordRule>,
    },
    Director {
        orchestrates: Vec<String>,
    },
}

fn default_fallback_length() -> usize {
    100
}

impl AgentProfile {
    /// Short name of the profile kind
    pub fn kind(&self) -> &'static str {
        match self {
            AgentProfile::Summarizer { .. } => "summarizer",
            AgentProfile::Classifier { .. } => "classifier",
            AgentProfile::Director { .. } => "director",
        }
    }
}

/// Registry entry for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub status: AgentStatus,
    /// JSON-RPC endpoint URL
    pub endpoint: String,
    pub profile: AgentProfile,
}

fn default_version() -> String {
    "0.0.1".to_string()
}

impl AgentDescriptor {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        profile: AgentProfile,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: default_version(),
            status: AgentStatus::Active,
            endpoint: endpoint.into(),
            profile,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Path this agent is mounted at on the host.
    ///
    /// The endpoint URL's path when it has one, otherwise a slug of the name.
    pub fn mount_path(&self) -> String {
        match Url::parse(&self.endpoint) {
            Ok(url) if url.path() != "/" => url.path().trim_end_matches('/').to_string(),
            _ => format!("/{}", slug(&self.name)),
        }
    }

    /// Discovery card for this agent
    pub fn card(&self) -> AgentCard {
        let card = AgentCard::new(&self.name, &self.endpoint).with_version(&self.version);
        if self.description.is_empty() {
            card
        } else {
            card.with_description(&self.description)
        }
    }
}

/// `"Summarizer Agent"` -> `"summarizer-agent"`
fn slug(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Ordered, validated set of agent descriptors
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRegistry {
    agents: Vec<AgentDescriptor>,
}

impl AgentRegistry {
    /// Build a registry, rejecting duplicate names, bad endpoints and
    /// directors that orchestrate unknown agents.
    pub fn new(agents: Vec<AgentDescriptor>) -> ConductorResult<Self> {
        let mut names = HashSet::new();
        for agent in &agents {
            if !names.insert(agent.name.as_str()) {
                return Err(ConductorError::Registry(format!(
                    "duplicate agent name '{}'",
                    agent.name
                )));
            }
            Url::parse(&agent.endpoint).map_err(|e| {
                ConductorError::Registry(format!(
                    "agent '{}' has invalid endpoint '{}': {}",
                    agent.name, agent.endpoint, e
                ))
            })?;
        }

        for agent in &agents {
            if let AgentProfile::Director { orchestrates } = &agent.profile
                && let Some(missing) = orchestrates.iter().find(|n| !names.contains(n.as_str()))
            {
                return Err(ConductorError::Registry(format!(
                    "director '{}' orchestrates unknown agent '{}'",
                    agent.name, missing
                )));
            }
        }

        Ok(Self { agents })
    }

    /// The three built-in agents, all served under `base_url`
    pub fn local(base_url: &str) -> ConductorResult<Self> {
        let base = base_url.trim_end_matches('/');
        Self::new(vec![
            AgentDescriptor::new(
                SUMMARIZER_AGENT,
                format!("{}/summarizer/", base),
                AgentProfile::Summarizer {
                    fallback_length: default_fallback_length(),
                },
            )
            .with_description("Summarizes input text, falling back to truncation"),
            AgentDescriptor::new(
                CLASSIFIER_AGENT,
                format!("{}/classifier/", base),
                AgentProfile::Classifier {
                    categories: vec![
                        "insurance".to_string(),
                        "medical".to_string(),
                        "general".to_string(),
                    ],
                    fallback_keywords: vec![
                        KeywordRule::new("insurance", &["claim", "insurance"]),
                        KeywordRule::new("medical", &["heart", "medical", "condition"]),
                    ],
                },
            )
            .with_description("Classifies input text by keyword matching"),
            AgentDescriptor::new(
                DIRECTOR_AGENT,
                format!("{}/director/", base),
                AgentProfile::Director {
                    orchestrates: vec![SUMMARIZER_AGENT.to_string(), CLASSIFIER_AGENT.to_string()],
                },
            )
            .with_description(
                "Central orchestrator that fans out to the summarizer and classifier",
            ),
        ])
    }

    /// Parse a JSON array of descriptors
    pub fn from_json_str(json: &str) -> ConductorResult<Self> {
        let agents: Vec<AgentDescriptor> = serde_json::from_str(json)?;
        Self::new(agents)
    }

    /// Load a JSON array of descriptors from a file
    pub fn from_json_file(path: impl AsRef<Path>) -> ConductorResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConductorError::Registry(format!("cannot read {}: {}", path.display(), e))
        })?;
        let registry = Self::from_json_str(&content)?;
        info!(path = %path.display(), agents = registry.len(), "Loaded agent registry");
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Endpoint URL of an agent
    pub fn resolve(&self, name: &str) -> ConductorResult<&str> {
        self.get(name)
            .map(|a| a.endpoint.as_str())
            .ok_or_else(|| ConductorError::AgentNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Descriptors to load, in the order given.
    ///
    /// Unknown names are an error; agents that are not active are skipped.
    pub fn select(&self, names: &[String]) -> ConductorResult<Vec<AgentDescriptor>> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let agent = self
                .get(name)
                .ok_or_else(|| ConductorError::AgentNotFound(name.clone()))?;
            if agent.status != AgentStatus::Active {
                warn!(agent = %agent.name, status = ?agent.status, "Skipping agent that is not active");
                continue;
            }
            selected.push(agent.clone());
        }
        Ok(selected)
    }
}
