//! Model catalog: descriptors for the selectable generation backends and
//! the registry that validates and serves them.
//!
//! The catalog is loaded once at process start and never mutated. Listing
//! order is registry-insertion order so the frontend renders a stable menu.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Classifiers
// ---------------------------------------------------------------------------

/// Subscription tier a model (or an account plan) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    Enterprise,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Tier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "enterprise" => Ok(Tier::Enterprise),
            other => Err(CoreError::Validation(format!(
                "Invalid tier '{other}'. Must be one of: free, pro, enterprise"
            ))),
        }
    }
}

/// Relative generation speed classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    Fast,
    Medium,
    Slow,
}

/// Relative output quality classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    High,
    Medium,
    Low,
}

// ---------------------------------------------------------------------------
// ModelDescriptor
// ---------------------------------------------------------------------------

/// Immutable description of one selectable generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Stable identifier, e.g. `"vizcode-1-free"`.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// One-line marketing description shown in the model picker.
    pub description: String,
    pub tier: Tier,
    pub speed: Speed,
    pub quality: Quality,
    /// Credits debited per generation request. Always positive.
    pub credit_cost: u32,
    /// Free-form capability tags, e.g. `"Responsive design"`.
    pub capabilities: Vec<String>,
}

// ---------------------------------------------------------------------------
// ModelRegistry
// ---------------------------------------------------------------------------

/// Static catalog of selectable models.
///
/// Built once from configuration via [`ModelRegistry::new`], which rejects
/// duplicate ids and non-positive credit costs so the rest of the system
/// can rely on every descriptor being well-formed.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    /// Build a registry, validating every descriptor.
    pub fn new(models: Vec<ModelDescriptor>) -> Result<Self, CoreError> {
        let mut seen = std::collections::HashSet::with_capacity(models.len());
        for model in &models {
            if model.credit_cost == 0 {
                return Err(CoreError::Validation(format!(
                    "Model '{}' must have a positive credit cost",
                    model.id
                )));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Duplicate model id '{}'",
                    model.id
                )));
            }
        }
        Ok(Self { models })
    }

    /// Build a registry from the built-in catalog.
    ///
    /// The built-in catalog upholds the registry invariants (unique ids,
    /// positive costs); a test below re-validates it through [`Self::new`].
    pub fn with_default_catalog() -> Self {
        Self {
            models: default_catalog(),
        }
    }

    /// All models in insertion order.
    pub fn list(&self) -> &[ModelDescriptor] {
        &self.models
    }

    /// Look up a model by id.
    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }
}

/// The built-in model catalog.
pub fn default_catalog() -> Vec<ModelDescriptor> {
    fn caps(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    vec![
        ModelDescriptor {
            id: "vizcode-1-free".into(),
            name: "VizCode 1 Free".into(),
            description: "Fast and efficient for basic UI components".into(),
            tier: Tier::Free,
            speed: Speed::Fast,
            quality: Quality::Medium,
            credit_cost: 1,
            capabilities: caps(&["Basic UI components", "Simple layouts", "Standard styling"]),
        },
        ModelDescriptor {
            id: "vizcode-1.5-booster".into(),
            name: "VizCode 1.5 Booster".into(),
            description: "Enhanced model with better UI generation capabilities".into(),
            tier: Tier::Pro,
            speed: Speed::Medium,
            quality: Quality::High,
            credit_cost: 3,
            capabilities: caps(&[
                "Advanced UI components",
                "Complex layouts",
                "Custom animations",
                "Responsive design",
            ]),
        },
        ModelDescriptor {
            id: "chatgpt-4".into(),
            name: "ChatGPT 4".into(),
            description: "Most capable model for complex UI generation".into(),
            tier: Tier::Pro,
            speed: Speed::Medium,
            quality: Quality::High,
            credit_cost: 5,
            capabilities: caps(&[
                "Advanced UI components",
                "Complex layouts",
                "Custom animations",
                "Responsive design",
                "Accessibility features",
            ]),
        },
        ModelDescriptor {
            id: "claude-3.5-sonnet".into(),
            name: "Claude 3.5 Sonnet".into(),
            description: "Excellent for detailed UI specifications".into(),
            tier: Tier::Pro,
            speed: Speed::Medium,
            quality: Quality::High,
            credit_cost: 4,
            capabilities: caps(&[
                "Advanced UI components",
                "Complex layouts",
                "Custom animations",
                "Responsive design",
                "Accessibility features",
            ]),
        },
        ModelDescriptor {
            id: "claude-4-opus".into(),
            name: "Claude 4 Opus".into(),
            description: "Premium model for sophisticated UI designs".into(),
            tier: Tier::Enterprise,
            speed: Speed::Slow,
            quality: Quality::High,
            credit_cost: 8,
            capabilities: caps(&[
                "Advanced UI components",
                "Complex layouts",
                "Custom animations",
                "Responsive design",
                "Accessibility features",
                "Advanced interactions",
                "State management",
            ]),
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
