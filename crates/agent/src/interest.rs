//! Interest scoring
//!
//! Scores a single message for commercial interest from keyword signals and
//! message length. Pure and deterministic: the same message always yields the
//! same signals, score and level.
//!
//! Score = min(chars / 10, 20) + sum of signal weights, capped at 100.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use hermes_core::{InterestLevel, InterestSignal, InterestTier};

/// Length contribution cap
const MAX_LENGTH_POINTS: f32 = 20.0;
const MAX_SCORE: f32 = 100.0;

const HIGH_LEVEL_MIN: f32 = 75.0;
const MEDIUM_LEVEL_MIN: f32 = 50.0;

// `ya` is matched as a whole word so "ayuda" or "playa" don't count
static SIGNAL_PATTERNS: Lazy<Vec<(InterestSignal, Regex)>> = Lazy::new(|| {
    let patterns = [
        (
            InterestSignal::MentionedBudget,
            r"(?i)\$|peso|precio|costo|presupuesto|cu[aá]nto|cotiz",
        ),
        (
            InterestSignal::AskedTimeline,
            r"(?i)urgente|\bya\b|r[aá]pido|pronto|cu[aá]ndo|tiempo|fecha|deadline",
        ),
        (
            InterestSignal::SpecificRequirements,
            r"(?i)necesito|quiero|requiero|busco|debo",
        ),
        (
            InterestSignal::DecisionMaker,
            r"(?i)mi empresa|mi negocio|soy el|tengo que decidir|mi emprendimiento",
        ),
        (
            InterestSignal::UrgencyIndicators,
            r"(?i)urgente|\bya\b|inmediato|asap|lo antes posible",
        ),
        (
            InterestSignal::BusinessDetails,
            r"(?i)restaurant|tienda|empresa|negocio|consultorio|oficina",
        ),
    ];

    patterns
        .into_iter()
        .filter_map(|(signal, pattern)| match Regex::new(pattern) {
            Ok(regex) => Some((signal, regex)),
            Err(e) => {
                tracing::error!(signal = %signal, error = %e, "Invalid interest pattern");
                None
            }
        })
        .collect()
});

/// Points contributed by a signal
pub fn signal_weight(signal: InterestSignal) -> f32 {
    match signal {
        InterestSignal::MentionedBudget => 25.0,
        InterestSignal::AskedTimeline => 20.0,
        InterestSignal::SpecificRequirements => 15.0,
        InterestSignal::DecisionMaker => 20.0,
        InterestSignal::UrgencyIndicators => 15.0,
        InterestSignal::BusinessDetails => 10.0,
    }
}

/// Detect interest signals in a message
///
/// Each pattern class is independent and contributes at most one signal.
pub fn derive_signals(message: &str) -> BTreeSet<InterestSignal> {
    SIGNAL_PATTERNS
        .iter()
        .filter(|(_, regex)| regex.is_match(message))
        .map(|(signal, _)| *signal)
        .collect()
}

/// Score a message from its length and detected signals, in [0, 100]
pub fn compute_score(message: &str, signals: &BTreeSet<InterestSignal>) -> f32 {
    let length_points = (message.chars().count() as f32 / 10.0).min(MAX_LENGTH_POINTS);
    let signal_points: f32 = signals.iter().map(|s| signal_weight(*s)).sum();
    (length_points + signal_points).clamp(0.0, MAX_SCORE)
}

/// Map a score to its tier: >= 75 high, >= 50 medium, else low
pub fn classify_level(score: f32) -> InterestTier {
    if score >= HIGH_LEVEL_MIN {
        InterestTier::High
    } else if score >= MEDIUM_LEVEL_MIN {
        InterestTier::Medium
    } else {
        InterestTier::Low
    }
}

/// Signals, score and tier for a message
pub fn assess_interest(message: &str) -> InterestLevel {
    let signals = derive_signals(message);
    let score = compute_score(message, &signals);
    InterestLevel {
        score,
        level: classify_level(score),
        signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(signals: &[InterestSignal]) -> BTreeSet<InterestSignal> {
        signals.iter().copied().collect()
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(SIGNAL_PATTERNS.len(), InterestSignal::ALL.len());
    }

    #[test]
    fn test_high_interest_example() {
        let message = "Necesito una landing page urgente, mi presupuesto es de 200000 pesos";
        let level = assess_interest(message);

        assert_eq!(
            level.signals,
            set(&[
                InterestSignal::MentionedBudget,
                InterestSignal::AskedTimeline,
                InterestSignal::SpecificRequirements,
                InterestSignal::UrgencyIndicators,
            ])
        );
        assert!((level.score - 81.8).abs() < 1e-3, "score was {}", level.score);
        assert_eq!(level.level, InterestTier::High);
        assert_eq!(level.lead_score(), 82);
    }

    #[test]
    fn test_greeting_example() {
        let level = assess_interest("hola");
        assert!(level.signals.is_empty());
        assert!((level.score - 0.4).abs() < 1e-6);
        assert_eq!(level.level, InterestTier::Low);
    }

    #[test]
    fn test_case_insensitive() {
        assert!(derive_signals("PRESUPUESTO").contains(&InterestSignal::MentionedBudget));
        assert!(derive_signals("Mi Empresa").contains(&InterestSignal::DecisionMaker));
    }

    #[test]
    fn test_accented_variants() {
        assert!(derive_signals("¿Cuánto sale?").contains(&InterestSignal::MentionedBudget));
        assert!(derive_signals("¿Cuándo estaría?").contains(&InterestSignal::AskedTimeline));
        assert!(derive_signals("lo necesito rápido").contains(&InterestSignal::AskedTimeline));
    }

    #[test]
    fn test_ya_is_a_whole_word() {
        assert!(derive_signals("lo quiero ya").contains(&InterestSignal::UrgencyIndicators));
        assert!(derive_signals("Ya!").contains(&InterestSignal::AskedTimeline));
        let signals = derive_signals("ayuda con la playa");
        assert!(!signals.contains(&InterestSignal::UrgencyIndicators));
        assert!(!signals.contains(&InterestSignal::AskedTimeline));
    }

    #[test]
    fn test_each_class_contributes_once() {
        let signals = derive_signals("precio precio precio costo $$$");
        assert_eq!(signals, set(&[InterestSignal::MentionedBudget]));
        let message = "precio precio precio costo $$$";
        let expected = message.chars().count() as f32 / 10.0 + 25.0;
        assert!((compute_score(message, &signals) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_length_points_capped() {
        let message = "a".repeat(1000);
        assert_eq!(compute_score(&message, &BTreeSet::new()), 20.0);
    }

    #[test]
    fn test_score_capped_at_100() {
        let all: BTreeSet<_> = InterestSignal::ALL.iter().copied().collect();
        let message = "a".repeat(500);
        assert_eq!(compute_score(&message, &all), 100.0);
    }

    #[test]
    fn test_score_monotonic_in_signals() {
        let message = "quiero saber más sobre sus servicios";
        let mut signals = BTreeSet::new();
        let mut previous = compute_score(message, &signals);
        for signal in InterestSignal::ALL {
            signals.insert(signal);
            let score = compute_score(message, &signals);
            assert!(score >= previous);
            previous = score;
        }
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(classify_level(0.0), InterestTier::Low);
        assert_eq!(classify_level(49.0), InterestTier::Low);
        assert_eq!(classify_level(49.99), InterestTier::Low);
        assert_eq!(classify_level(50.0), InterestTier::Medium);
        assert_eq!(classify_level(74.0), InterestTier::Medium);
        assert_eq!(classify_level(74.99), InterestTier::Medium);
        assert_eq!(classify_level(75.0), InterestTier::High);
        assert_eq!(classify_level(100.0), InterestTier::High);
    }

    #[test]
    fn test_deterministic() {
        let message = "Tengo un restaurant y busco una web, ¿cuánto cuesta?";
        assert_eq!(assess_interest(message), assess_interest(message));
    }
}
