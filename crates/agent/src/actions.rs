//! Next-action derivation

use hermes_config::{GraphConfig, Threshold};
use hermes_core::{ActionTag, CollectionStage, GraphState, IntentType, InterestTier, NextActions};

/// Suggested actions for the state as it stands after scoring and collection
pub fn derive_next_actions(state: &GraphState, config: &GraphConfig) -> NextActions {
    let mut actions = NextActions::default();

    if let Some(interest) = &state.interest_level {
        let high = interest.score / 100.0 >= config.threshold_for(Threshold::HighInterest);
        if high {
            actions.immediate.insert(ActionTag::ScheduleCall);
            actions.follow_up.insert(ActionTag::SendPricing);
            actions.crm_actions.extend([
                ActionTag::UpdateLeadScore,
                ActionTag::AssignToSales,
                ActionTag::TagHighPriority,
            ]);
        } else if interest.level == InterestTier::Medium {
            actions.follow_up.insert(ActionTag::SendCaseStudies);
            actions.crm_actions.insert(ActionTag::UpdateLeadScore);
        }
    }

    // Only when the email question was asked this turn, not for a stage
    // carried over from an earlier one
    let asking_email = state.data_collection_stage.as_ref().map_or(false, |progress| {
        progress.current_stage == CollectionStage::Email && !progress.questions_asked.is_empty()
    });
    let email_missing = state
        .collected_data
        .as_ref()
        .map_or(true, |data| data.email.is_none());
    if asking_email && email_missing {
        actions.immediate.insert(ActionTag::AskEmail);
    }

    let min_confidence = config.threshold_for(Threshold::IntentConfidence);
    match state.trusted_intent(min_confidence).map(|i| i.intent_type) {
        Some(IntentType::PortfolioRequest) => {
            actions.immediate.insert(ActionTag::ProvidePortfolio);
            actions.follow_up.insert(ActionTag::ShowExamples);
        }
        Some(IntentType::PricingInquiry) => {
            actions.follow_up.insert(ActionTag::SendPricing);
        }
        _ => {}
    }

    actions
}
