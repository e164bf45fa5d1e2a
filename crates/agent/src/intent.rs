//! Intent classifier output parsing

use serde::Deserialize;

use hermes_core::{IntentClassification, IntentType};

use crate::AgentError;

#[derive(Debug, Deserialize)]
struct RawIntent {
    intent: String,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    #[allow(dead_code)]
    reasoning: Option<String>,
}

/// Parse the classifier's `{"intent", "confidence", "reasoning"}` reply
///
/// Models often wrap the object in a code fence or add a sentence around it,
/// so the outermost `{ ... }` span is parsed. An unknown intent tag is an
/// error; a missing confidence counts as 0.
pub fn parse_intent_response(raw: &str) -> Result<IntentClassification, AgentError> {
    let start = raw
        .find('{')
        .ok_or_else(|| AgentError::IntentParse("no JSON object in reply".to_string()))?;
    let end = raw
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| AgentError::IntentParse("unterminated JSON object".to_string()))?;

    let parsed: RawIntent = serde_json::from_str(&raw[start..=end])
        .map_err(|e| AgentError::IntentParse(e.to_string()))?;

    let intent_type: IntentType = parsed
        .intent
        .parse()
        .map_err(|e: hermes_core::Error| AgentError::IntentParse(e.to_string()))?;

    Ok(IntentClassification::new(intent_type, parsed.confidence))
}

/// Extra search terms for a trusted intent
pub fn intent_search_terms(intent: IntentType) -> &'static str {
    match intent {
        IntentType::LandingPage => "landing page",
        IntentType::InstitutionalSite => "sitio institucional",
        IntentType::Ecommerce => "ecommerce tienda online",
        IntentType::Blog => "blog contenido",
        IntentType::ChatbotAi => "chatbot agente ia",
        IntentType::Automation => "automatizacion procesos",
        IntentType::Consultation => "consultoria tecnica",
        IntentType::PricingInquiry => "precios",
        IntentType::TechnicalSupport => "soporte tecnico",
        IntentType::PortfolioRequest => "portfolio proyectos",
        IntentType::GeneralInquiry => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::IntentCategory;

    #[test]
    fn test_plain_json() {
        let parsed = parse_intent_response(
            r#"{"intent": "ecommerce", "confidence": 0.92, "reasoning": "quiere vender online"}"#,
        )
        .unwrap();
        assert_eq!(parsed.intent_type, IntentType::Ecommerce);
        assert_eq!(parsed.category, IntentCategory::Sales);
        assert!((parsed.confidence - 0.92).abs() < 1e-6);
    }

    #[test]
    fn test_code_fence_and_prose() {
        let raw = "Claro, acá va:\n```json\n{\n  \"intent\": \"pricing_inquiry\",\n  \"confidence\": 0.85\n}\n```";
        let parsed = parse_intent_response(raw).unwrap();
        assert_eq!(parsed.intent_type, IntentType::PricingInquiry);
        assert_eq!(parsed.category, IntentCategory::Qualification);
    }

    #[test]
    fn test_missing_confidence_is_zero() {
        let parsed = parse_intent_response(r#"{"intent":"blog"}"#).unwrap();
        assert_eq!(parsed.confidence, 0.0);
    }

    #[test]
    fn test_out_of_range_confidence_clamped() {
        let parsed = parse_intent_response(r#"{"intent":"blog","confidence":3}"#).unwrap();
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_intent_response("no sé").is_err());
        assert!(parse_intent_response("} {").is_err());
        assert!(parse_intent_response(r#"{"intent":"web_scraping","confidence":0.9}"#).is_err());
        assert!(parse_intent_response(r#"{"confidence":0.9}"#).is_err());
    }

    #[test]
    fn test_every_intent_parses() {
        for intent in IntentType::ALL {
            let raw = format!(r#"{{"intent":"{}","confidence":0.9}}"#, intent);
            assert_eq!(parse_intent_response(&raw).unwrap().intent_type, intent);
        }
    }
}
