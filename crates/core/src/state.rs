//! Graph state for one conversation turn
//!
//! `GraphState` is the record threaded through every processing node. The
//! mandatory parts (`message`, `user_context`, `metadata`) are set at
//! construction; everything else is filled in by the node that owns it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// In-flight state for a single turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    /// Raw user text
    pub message: String,
    /// Conversation correlation id (absent on the first turn)
    pub conversation_id: Option<String>,
    pub user_context: UserContext,
    /// Set by intent classification
    pub intent: Option<IntentClassification>,
    /// Set by knowledge search
    pub knowledge_context: Option<KnowledgeContext>,
    /// Set by interest scoring
    pub interest_level: Option<InterestLevel>,
    /// Filled incrementally by data collection
    pub collected_data: Option<CollectedData>,
    pub data_collection_stage: Option<DataCollectionProgress>,
    /// Final response text
    pub response: Option<String>,
    /// Audit trail, append-only
    pub metadata: ExecutionMetadata,
    pub next_actions: Option<NextActions>,
}

impl GraphState {
    /// Intent, but only when its confidence clears `min_confidence`
    pub fn trusted_intent(&self, min_confidence: f32) -> Option<&IntentClassification> {
        self.intent
            .as_ref()
            .filter(|intent| intent.confidence >= min_confidence)
    }

    /// Current data collection stage, if collection has started
    pub fn collection_stage(&self) -> Option<CollectionStage> {
        self.data_collection_stage
            .as_ref()
            .map(|progress| progress.current_stage)
    }

    /// Number of node executions recorded so far
    pub fn execution_count(&self) -> usize {
        self.metadata.node_executions.len()
    }

    /// Number of errors recorded so far
    pub fn error_count(&self) -> usize {
        self.metadata.errors.as_ref().map_or(0, Vec::len)
    }
}

/// Context captured once at turn start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub ip: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Intent types the classifier can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    LandingPage,
    InstitutionalSite,
    Ecommerce,
    Blog,
    ChatbotAi,
    Automation,
    Consultation,
    PricingInquiry,
    TechnicalSupport,
    PortfolioRequest,
    GeneralInquiry,
}

impl IntentType {
    pub const ALL: [IntentType; 11] = [
        IntentType::LandingPage,
        IntentType::InstitutionalSite,
        IntentType::Ecommerce,
        IntentType::Blog,
        IntentType::ChatbotAi,
        IntentType::Automation,
        IntentType::Consultation,
        IntentType::PricingInquiry,
        IntentType::TechnicalSupport,
        IntentType::PortfolioRequest,
        IntentType::GeneralInquiry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::LandingPage => "landing_page",
            IntentType::InstitutionalSite => "institutional_site",
            IntentType::Ecommerce => "ecommerce",
            IntentType::Blog => "blog",
            IntentType::ChatbotAi => "chatbot_ai",
            IntentType::Automation => "automation",
            IntentType::Consultation => "consultation",
            IntentType::PricingInquiry => "pricing_inquiry",
            IntentType::TechnicalSupport => "technical_support",
            IntentType::PortfolioRequest => "portfolio_request",
            IntentType::GeneralInquiry => "general_inquiry",
        }
    }

    /// Category the intent belongs to
    ///
    /// Service intents are sales; pricing and consultation qualify the lead;
    /// portfolio and general questions are informational.
    pub fn category(&self) -> IntentCategory {
        match self {
            IntentType::LandingPage
            | IntentType::InstitutionalSite
            | IntentType::Ecommerce
            | IntentType::Blog
            | IntentType::ChatbotAi
            | IntentType::Automation => IntentCategory::Sales,
            IntentType::Consultation | IntentType::PricingInquiry => IntentCategory::Qualification,
            IntentType::TechnicalSupport => IntentCategory::Support,
            IntentType::PortfolioRequest | IntentType::GeneralInquiry => IntentCategory::Information,
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        IntentType::ALL
            .iter()
            .copied()
            .find(|intent| intent.as_str() == normalized)
            .ok_or_else(|| crate::Error::Validation(format!("unknown intent type: {}", s)))
    }
}

/// Broad intent category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Sales,
    Support,
    Information,
    Qualification,
}

impl IntentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::Sales => "sales",
            IntentCategory::Support => "support",
            IntentCategory::Information => "information",
            IntentCategory::Qualification => "qualification",
        }
    }
}

/// Classified intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassification {
    #[serde(rename = "type")]
    pub intent_type: IntentType,
    /// 0.0 - 1.0
    pub confidence: f32,
    pub category: IntentCategory,
}

impl IntentClassification {
    /// Build from type and confidence; category is derived, confidence clamped
    pub fn new(intent_type: IntentType, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            intent_type,
            confidence,
            category: intent_type.category(),
        }
    }
}

/// Retrieved knowledge for the turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeContext {
    /// Ordered by descending similarity
    pub relevant_docs: Vec<RelevantDoc>,
    pub search_query: String,
}

impl KnowledgeContext {
    pub fn is_empty(&self) -> bool {
        self.relevant_docs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantDoc {
    pub title: String,
    pub content: String,
    pub similarity: f32,
}

/// Textual cue of commercial interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestSignal {
    MentionedBudget,
    AskedTimeline,
    SpecificRequirements,
    DecisionMaker,
    UrgencyIndicators,
    BusinessDetails,
}

impl InterestSignal {
    pub const ALL: [InterestSignal; 6] = [
        InterestSignal::MentionedBudget,
        InterestSignal::AskedTimeline,
        InterestSignal::SpecificRequirements,
        InterestSignal::DecisionMaker,
        InterestSignal::UrgencyIndicators,
        InterestSignal::BusinessDetails,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterestSignal::MentionedBudget => "mentioned_budget",
            InterestSignal::AskedTimeline => "asked_timeline",
            InterestSignal::SpecificRequirements => "specific_requirements",
            InterestSignal::DecisionMaker => "decision_maker",
            InterestSignal::UrgencyIndicators => "urgency_indicators",
            InterestSignal::BusinessDetails => "business_details",
        }
    }
}

impl fmt::Display for InterestSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative interest tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestTier {
    Low,
    Medium,
    High,
}

impl InterestTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestTier::Low => "low",
            InterestTier::Medium => "medium",
            InterestTier::High => "high",
        }
    }
}

impl fmt::Display for InterestTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interest assessment for the turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestLevel {
    /// 0 - 100
    pub score: f32,
    pub level: InterestTier,
    pub signals: BTreeSet<InterestSignal>,
}

impl InterestLevel {
    /// Score rounded to the integer lead score that gets persisted
    pub fn lead_score(&self) -> i32 {
        self.score.round().clamp(0.0, 100.0) as i32
    }
}

/// Data collected from the user, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedData {
    pub email: Option<String>,
    pub business_name: Option<String>,
    pub business_type: Option<String>,
    pub timeline: Option<String>,
    pub current_website: Option<String>,
    pub inspiration_sites: Option<Vec<String>>,
    pub desired_features: Option<Vec<String>>,
    pub essential_features: Option<Vec<String>>,
    pub industry: Option<String>,
    pub target_audience: Option<String>,
}

impl CollectedData {
    pub fn is_empty(&self) -> bool {
        *self == CollectedData::default()
    }

    /// Compact `key: value` summary of the fields present, for prompts
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let scalars = [
            ("email", &self.email),
            ("businessName", &self.business_name),
            ("businessType", &self.business_type),
            ("timeline", &self.timeline),
            ("currentWebsite", &self.current_website),
            ("industry", &self.industry),
            ("targetAudience", &self.target_audience),
        ];
        for (key, value) in scalars {
            if let Some(value) = value {
                parts.push(format!("{}: {}", key, value));
            }
        }
        let lists = [
            ("inspirationSites", &self.inspiration_sites),
            ("desiredFeatures", &self.desired_features),
            ("essentialFeatures", &self.essential_features),
        ];
        for (key, value) in lists {
            if let Some(values) = value.as_ref().filter(|v| !v.is_empty()) {
                parts.push(format!("{}: {}", key, values.join(", ")));
            }
        }
        if parts.is_empty() {
            "ninguno".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Data collection stages, in the only order they may be visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStage {
    Email,
    BusinessInfo,
    Requirements,
    Preferences,
    Complete,
}

impl CollectionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStage::Email => "email",
            CollectionStage::BusinessInfo => "business_info",
            CollectionStage::Requirements => "requirements",
            CollectionStage::Preferences => "preferences",
            CollectionStage::Complete => "complete",
        }
    }

    /// The following stage; `Complete` is terminal
    pub fn next(&self) -> CollectionStage {
        match self {
            CollectionStage::Email => CollectionStage::BusinessInfo,
            CollectionStage::BusinessInfo => CollectionStage::Requirements,
            CollectionStage::Requirements => CollectionStage::Preferences,
            CollectionStage::Preferences | CollectionStage::Complete => CollectionStage::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, CollectionStage::Complete)
    }

    /// Stages still to visit after this one, excluding `Complete`
    pub fn remaining_after(&self) -> Vec<CollectionStage> {
        let mut stages = Vec::new();
        let mut stage = self.next();
        while !stage.is_complete() {
            stages.push(stage);
            stage = stage.next();
        }
        stages
    }
}

impl fmt::Display for CollectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionStage {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "email" => Ok(CollectionStage::Email),
            "business_info" => Ok(CollectionStage::BusinessInfo),
            "requirements" => Ok(CollectionStage::Requirements),
            "preferences" => Ok(CollectionStage::Preferences),
            "complete" => Ok(CollectionStage::Complete),
            other => Err(crate::Error::Validation(format!(
                "unknown collection stage: {}",
                other
            ))),
        }
    }
}

/// Progress through data collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCollectionProgress {
    pub current_stage: CollectionStage,
    pub questions_asked: Vec<String>,
    pub pending_questions: Vec<String>,
}

/// Append-only audit trail of the turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub execution_id: String,
    pub node_executions: Vec<NodeExecution>,
    pub errors: Option<Vec<NodeError>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExecution {
    pub node_name: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: Option<u64>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeError {
    pub node_name: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Action tags suggested for after the turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTag {
    AskEmail,
    ProvidePortfolio,
    ShowExamples,
    ScheduleCall,
    SendPricing,
    SendCaseStudies,
    UpdateLeadScore,
    AssignToSales,
    TagHighPriority,
}

impl ActionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTag::AskEmail => "ask_email",
            ActionTag::ProvidePortfolio => "provide_portfolio",
            ActionTag::ShowExamples => "show_examples",
            ActionTag::ScheduleCall => "schedule_call",
            ActionTag::SendPricing => "send_pricing",
            ActionTag::SendCaseStudies => "send_case_studies",
            ActionTag::UpdateLeadScore => "update_lead_score",
            ActionTag::AssignToSales => "assign_to_sales",
            ActionTag::TagHighPriority => "tag_high_priority",
        }
    }
}

/// Suggested next actions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextActions {
    pub immediate: BTreeSet<ActionTag>,
    pub follow_up: BTreeSet<ActionTag>,
    pub crm_actions: BTreeSet<ActionTag>,
}

impl NextActions {
    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.follow_up.is_empty() && self.crm_actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_round_trips_through_str() {
        for intent in IntentType::ALL {
            assert_eq!(intent.as_str().parse::<IntentType>().unwrap(), intent);
        }
        assert_eq!(" Ecommerce ".parse::<IntentType>().unwrap(), IntentType::Ecommerce);
        assert!("web_scraping".parse::<IntentType>().is_err());
    }

    #[test]
    fn test_intent_categories() {
        assert_eq!(IntentType::LandingPage.category(), IntentCategory::Sales);
        assert_eq!(IntentType::PricingInquiry.category(), IntentCategory::Qualification);
        assert_eq!(IntentType::TechnicalSupport.category(), IntentCategory::Support);
        assert_eq!(IntentType::GeneralInquiry.category(), IntentCategory::Information);
    }

    #[test]
    fn test_classification_clamps_confidence() {
        assert_eq!(IntentClassification::new(IntentType::Blog, 1.7).confidence, 1.0);
        assert_eq!(IntentClassification::new(IntentType::Blog, -0.2).confidence, 0.0);
        assert_eq!(IntentClassification::new(IntentType::Blog, f32::NAN).confidence, 0.0);
    }

    #[test]
    fn test_collection_stage_order() {
        let mut stage = CollectionStage::Email;
        let mut visited = vec![stage];
        while !stage.is_complete() {
            let next = stage.next();
            assert!(next > stage);
            stage = next;
            visited.push(stage);
        }
        assert_eq!(
            visited,
            vec![
                CollectionStage::Email,
                CollectionStage::BusinessInfo,
                CollectionStage::Requirements,
                CollectionStage::Preferences,
                CollectionStage::Complete,
            ]
        );
        assert_eq!(CollectionStage::Complete.next(), CollectionStage::Complete);
    }

    #[test]
    fn test_remaining_stages() {
        assert_eq!(
            CollectionStage::BusinessInfo.remaining_after(),
            vec![CollectionStage::Requirements, CollectionStage::Preferences]
        );
        assert!(CollectionStage::Preferences.remaining_after().is_empty());
    }

    #[test]
    fn test_collected_data_summary() {
        assert_eq!(CollectedData::default().summary(), "ninguno");

        let data = CollectedData {
            email: Some("ana@tienda.com".into()),
            desired_features: Some(vec!["blog".into(), "online_payments".into()]),
            ..Default::default()
        };
        assert_eq!(
            data.summary(),
            "email: ana@tienda.com; desiredFeatures: blog, online_payments"
        );
    }

    #[test]
    fn test_signal_serializes_as_tag() {
        let json = serde_json::to_string(&InterestSignal::MentionedBudget).unwrap();
        assert_eq!(json, "\"mentioned_budget\"");
    }

    #[test]
    fn test_lead_score_rounding() {
        let level = InterestLevel {
            score: 81.8,
            level: InterestTier::High,
            signals: BTreeSet::new(),
        };
        assert_eq!(level.lead_score(), 82);
    }
}
