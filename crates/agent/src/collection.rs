//! Data collection helpers
//!
//! Stages are visited strictly in order, one per turn. The message of a turn
//! usually answers the question asked on the previous turn, so extraction
//! looks at the stage being answered as well as the message.

use once_cell::sync::Lazy;
use regex::Regex;

use hermes_core::{CollectedData, CollectionStage, InterestSignal};

use crate::interest::derive_signals;

const MAX_BUSINESS_NAME_CHARS: usize = 60;

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").ok());

static URL_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:https?://)?(?:www\.)?[a-z0-9-]+(?:\.[a-z0-9-]+)*\.(?:com|ar|net|org|io|dev|app|co|store|shop)(?:\.[a-z]{2})?(?:/[^\s,;]*)?")
        .ok()
});

/// Business keyword → business type tag
const BUSINESS_TYPES: &[(&str, &str)] = &[
    ("restaurant", "restaurant"),
    ("resto", "restaurant"),
    ("tienda", "retail"),
    ("consultorio", "health"),
    ("clinica", "health"),
    ("clínica", "health"),
    ("estudio", "professional_services"),
    ("oficina", "professional_services"),
    ("inmobiliaria", "real_estate"),
    ("gimnasio", "fitness"),
];

/// Feature keyword → feature tag
const FEATURES: &[(&str, &str)] = &[
    ("blog", "blog"),
    ("pagos", "online_payments"),
    ("mercado pago", "online_payments"),
    ("carrito", "shopping_cart"),
    ("catálogo", "catalog"),
    ("catalogo", "catalog"),
    ("reservas", "bookings"),
    ("turnos", "bookings"),
    ("whatsapp", "whatsapp"),
    ("formulario", "contact_form"),
    ("chatbot", "chatbot"),
    ("idiomas", "multilanguage"),
    ("login", "user_accounts"),
];

/// The stage reached this turn: absent starts at `Email`, otherwise one step
pub fn advance_stage(current: Option<CollectionStage>) -> CollectionStage {
    match current {
        None => CollectionStage::Email,
        Some(stage) => stage.next(),
    }
}

/// Canned question for a stage; `Complete` asks nothing
pub fn fallback_question(stage: CollectionStage) -> Option<&'static str> {
    match stage {
        CollectionStage::Email => {
            Some("Para enviarte información detallada, ¿podrías compartir tu email?")
        }
        CollectionStage::BusinessInfo => Some("¿Cómo se llama tu negocio y a qué se dedica?"),
        CollectionStage::Requirements => {
            Some("¿Qué funcionalidades específicas necesitás en tu sitio?")
        }
        CollectionStage::Preferences => {
            Some("¿Hay algún sitio web que te guste como referencia?")
        }
        CollectionStage::Complete => None,
    }
}

/// The message with email addresses blanked out, so their domains are not
/// read as websites or business keywords
fn strip_emails(message: &str) -> String {
    match EMAIL_RE.as_ref() {
        Some(email_re) => email_re.replace_all(message, " ").into_owned(),
        None => message.to_string(),
    }
}

fn find_urls(text: &str) -> Vec<String> {
    let Some(url_re) = URL_RE.as_ref() else {
        return Vec::new();
    };
    url_re
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ')']).to_string())
        .collect()
}

fn tags_in(message: &str, table: &[(&str, &'static str)]) -> Vec<String> {
    let lower = message.to_lowercase();
    let mut tags: Vec<String> = Vec::new();
    for (keyword, tag) in table {
        if lower.contains(keyword) && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Business name from an answer to the business question: the first clause,
/// unless the message reads as a request rather than an answer
fn business_name_from(message: &str) -> Option<String> {
    let pitch = derive_signals(message)
        .into_iter()
        .any(|signal| signal != InterestSignal::BusinessDetails);
    if pitch {
        return None;
    }

    let clause = message
        .split([',', '.', ';', '!', '?', '\n'])
        .map(str::trim)
        .find(|clause| !clause.is_empty())?;
    Some(clause.chars().take(MAX_BUSINESS_NAME_CHARS).collect())
}

fn merge_list(existing: Option<Vec<String>>, new: Vec<String>) -> Option<Vec<String>> {
    if new.is_empty() {
        return existing;
    }
    let mut merged = existing.unwrap_or_default();
    for item in new {
        if !merged.contains(&item) {
            merged.push(item);
        }
    }
    Some(merged)
}

/// Fold whatever the message reveals into `data`
///
/// `answering` is the stage whose question the message replies to. Values
/// already collected are kept; lists are merged.
pub fn extract_collected_data(
    message: &str,
    answering: Option<CollectionStage>,
    mut data: CollectedData,
) -> CollectedData {
    if data.email.is_none() {
        data.email = EMAIL_RE
            .as_ref()
            .and_then(|re| re.find(message))
            .map(|m| m.as_str().to_lowercase());
    }

    let text = strip_emails(message);

    if data.business_type.is_none() {
        data.business_type = tags_in(&text, BUSINESS_TYPES).into_iter().next();
    }

    let urls = find_urls(&text);
    match answering {
        Some(CollectionStage::Preferences) => {
            data.inspiration_sites = merge_list(data.inspiration_sites, urls);
        }
        _ => {
            if data.current_website.is_none() {
                data.current_website = urls.into_iter().next();
            }
        }
    }

    let features = tags_in(&text, FEATURES);
    data.desired_features = merge_list(data.desired_features, features);

    if answering == Some(CollectionStage::BusinessInfo) && data.business_name.is_none() {
        data.business_name = business_name_from(&text);
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_stage_one_step() {
        assert_eq!(advance_stage(None), CollectionStage::Email);
        assert_eq!(
            advance_stage(Some(CollectionStage::Email)),
            CollectionStage::BusinessInfo
        );
        assert_eq!(
            advance_stage(Some(CollectionStage::Preferences)),
            CollectionStage::Complete
        );
        assert_eq!(
            advance_stage(Some(CollectionStage::Complete)),
            CollectionStage::Complete
        );
    }

    #[test]
    fn test_fallback_questions() {
        assert!(fallback_question(CollectionStage::Email)
            .unwrap()
            .contains("email"));
        assert!(fallback_question(CollectionStage::Complete).is_none());
    }

    #[test]
    fn test_extract_email() {
        let data = extract_collected_data(
            "Mi mail es Ana.Perez@Tienda.com.ar, gracias",
            Some(CollectionStage::Email),
            CollectedData::default(),
        );
        assert_eq!(data.email.as_deref(), Some("ana.perez@tienda.com.ar"));
        // The email domain is not taken for a website or a business keyword
        assert!(data.current_website.is_none());
        assert!(data.business_type.is_none());
    }

    #[test]
    fn test_existing_email_kept() {
        let data = CollectedData {
            email: Some("primero@hermes.dev".into()),
            ..Default::default()
        };
        let data = extract_collected_data("otro@correo.com", None, data);
        assert_eq!(data.email.as_deref(), Some("primero@hermes.dev"));
    }

    #[test]
    fn test_extract_website_and_inspiration() {
        let data = extract_collected_data(
            "hoy tenemos www.mirestaurant.com.ar",
            None,
            CollectedData::default(),
        );
        assert_eq!(data.current_website.as_deref(), Some("www.mirestaurant.com.ar"));
        assert_eq!(data.business_type.as_deref(), Some("restaurant"));

        let data = extract_collected_data(
            "me gustan https://stripe.com y linear.app",
            Some(CollectionStage::Preferences),
            data,
        );
        assert_eq!(
            data.inspiration_sites,
            Some(vec!["https://stripe.com".to_string(), "linear.app".to_string()])
        );
        assert_eq!(data.current_website.as_deref(), Some("www.mirestaurant.com.ar"));
    }

    #[test]
    fn test_features_merge_without_duplicates() {
        let data = extract_collected_data(
            "quiero blog y pagos con mercado pago",
            Some(CollectionStage::Requirements),
            CollectedData::default(),
        );
        assert_eq!(
            data.desired_features,
            Some(vec!["blog".to_string(), "online_payments".to_string()])
        );

        let data = extract_collected_data("y un blog con reservas", None, data);
        assert_eq!(
            data.desired_features,
            Some(vec![
                "blog".to_string(),
                "online_payments".to_string(),
                "bookings".to_string()
            ])
        );
    }

    #[test]
    fn test_business_answer() {
        let data = extract_collected_data(
            "  La Esquina, un restaurant de barrio ",
            Some(CollectionStage::BusinessInfo),
            CollectedData::default(),
        );
        assert_eq!(data.business_name.as_deref(), Some("La Esquina"));
        assert_eq!(data.business_type.as_deref(), Some("restaurant"));
    }

    #[test]
    fn test_sales_pitch_is_not_a_business_name() {
        let data = extract_collected_data(
            "Necesito una landing page urgente, mi presupuesto es de 200000 pesos",
            Some(CollectionStage::BusinessInfo),
            CollectedData::default(),
        );
        assert!(data.business_name.is_none());
    }

    #[test]
    fn test_nothing_to_extract() {
        let data = extract_collected_data("hola", None, CollectedData::default());
        assert!(data.is_empty());
    }
}
