//! Graph configuration: models, thresholds and prompt templates
//!
//! Loaded once with the rest of the settings and shared read-only. Lookups
//! are total over closed enums, so there is no "unknown key" failure.

use serde::{Deserialize, Serialize};

use crate::constants::llm;
use crate::prompts;

/// Model role within the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRole {
    IntentClassifier,
    ResponseGenerator,
    InterestDetector,
}

/// Named threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Threshold {
    /// Interest fraction from which a lead is treated as hot
    HighInterest,
    /// Interest fraction from which data collection starts
    DataCollection,
    /// Minimum confidence for an intent to drive routing
    IntentConfidence,
}

/// Prompt role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptRole {
    IntentClassification,
    ResponseGeneration,
    DataCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_model")]
    pub intent_classifier: String,
    #[serde(default = "default_model")]
    pub response_generator: String,
    #[serde(default = "default_model")]
    pub interest_detector: String,
}

fn default_model() -> String {
    llm::DEFAULT_MODEL.to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            intent_classifier: default_model(),
            response_generator: default_model(),
            interest_detector: default_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_high_interest")]
    pub high_interest: f32,
    #[serde(default = "default_data_collection")]
    pub data_collection: f32,
    #[serde(default = "default_intent_confidence")]
    pub intent_confidence: f32,
}

fn default_high_interest() -> f32 {
    0.75
}

fn default_data_collection() -> f32 {
    0.6
}

fn default_intent_confidence() -> f32 {
    0.8
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            high_interest: default_high_interest(),
            data_collection: default_data_collection(),
            intent_confidence: default_intent_confidence(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptsConfig {
    #[serde(default = "default_intent_prompt")]
    pub intent_classification: String,
    #[serde(default = "default_response_prompt")]
    pub response_generation: String,
    #[serde(default = "default_collection_prompt")]
    pub data_collection: String,
}

fn default_intent_prompt() -> String {
    prompts::INTENT_CLASSIFICATION.to_string()
}

fn default_response_prompt() -> String {
    prompts::RESPONSE_GENERATION.to_string()
}

fn default_collection_prompt() -> String {
    prompts::DATA_COLLECTION.to_string()
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            intent_classification: default_intent_prompt(),
            response_generation: default_response_prompt(),
            data_collection: default_collection_prompt(),
        }
    }
}

/// Models, thresholds and prompts used by the processing graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

impl GraphConfig {
    pub fn model_for(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::IntentClassifier => &self.models.intent_classifier,
            ModelRole::ResponseGenerator => &self.models.response_generator,
            ModelRole::InterestDetector => &self.models.interest_detector,
        }
    }

    pub fn threshold_for(&self, threshold: Threshold) -> f32 {
        match threshold {
            Threshold::HighInterest => self.thresholds.high_interest,
            Threshold::DataCollection => self.thresholds.data_collection,
            Threshold::IntentConfidence => self.thresholds.intent_confidence,
        }
    }

    pub fn prompt_for(&self, role: PromptRole) -> &str {
        match role {
            PromptRole::IntentClassification => &self.prompts.intent_classification,
            PromptRole::ResponseGeneration => &self.prompts.response_generation,
            PromptRole::DataCollection => &self.prompts.data_collection,
        }
    }

    /// Thresholds as `(field, value)` pairs, for validation
    pub(crate) fn threshold_fields(&self) -> [(&'static str, f32); 3] {
        [
            ("graph_config.thresholds.high_interest", self.thresholds.high_interest),
            ("graph_config.thresholds.data_collection", self.thresholds.data_collection),
            ("graph_config.thresholds.intent_confidence", self.thresholds.intent_confidence),
        ]
    }
}

/// Substitute `{name}` placeholders in `template`
///
/// Placeholders without a matching variable are left as they are, and
/// substituted values are never scanned again.
pub fn render_prompt(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match replacement {
            Some((value, close)) => {
                rendered.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }
    rendered.push_str(rest);
    rendered
}
