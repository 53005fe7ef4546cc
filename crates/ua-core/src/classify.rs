//! Inference marker classification.
//!
//! Clients log inference markers inconsistently, so there is no dedicated
//! event type to rely on. Instead, event names are matched case-insensitively
//! against English and Spanish marker substrings:
//!
//! - start: contains an inference marker and `start` or `inicio`
//! - response: contains an inference marker and `response`, `respuesta`, `end` or `fin`
//!
//! A name can satisfy both predicates (e.g. `inference_start_end`); such an
//! event becomes both a start and a response candidate.

use crate::event::TrackedEvent;

const INFERENCE_MARKERS: &[&str] = &["inference", "inferencia"];
const START_MARKERS: &[&str] = &["start", "inicio"];
const RESPONSE_MARKERS: &[&str] = &["response", "respuesta", "end", "fin"];

/// Decides which event names mark the start and the response of an inference.
pub trait CandidateClassifier {
    /// Returns true if an event with this name may start an inference.
    fn is_start(&self, event_name: &str) -> bool;

    /// Returns true if an event with this name may answer an inference.
    fn is_response(&self, event_name: &str) -> bool;
}

/// Substring heuristic over event names.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameHeuristic;

impl CandidateClassifier for NameHeuristic {
    fn is_start(&self, event_name: &str) -> bool {
        is_start_candidate(event_name)
    }

    fn is_response(&self, event_name: &str) -> bool {
        is_response_candidate(event_name)
    }
}

/// Returns true if the lower-cased name carries an inference marker and a start marker.
pub fn is_start_candidate(event_name: &str) -> bool {
    let name = event_name.to_lowercase();
    contains_any(&name, INFERENCE_MARKERS) && contains_any(&name, START_MARKERS)
}

/// Returns true if the lower-cased name carries an inference marker and a response marker.
pub fn is_response_candidate(event_name: &str) -> bool {
    let name = event_name.to_lowercase();
    contains_any(&name, INFERENCE_MARKERS) && contains_any(&name, RESPONSE_MARKERS)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Start and response candidates, each in input order.
#[derive(Debug)]
pub struct Candidates<'a, E> {
    pub starts: Vec<&'a E>,
    pub responses: Vec<&'a E>,
}

impl<E> Candidates<'_, E> {
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty() && self.responses.is_empty()
    }
}

/// Partitions events into start and response candidates.
///
/// Relative input order is preserved in both lists. Events matching neither
/// predicate are dropped.
pub fn classify<'a, E, C>(events: &'a [E], classifier: &C) -> Candidates<'a, E>
where
    E: TrackedEvent,
    C: CandidateClassifier + ?Sized,
{
    let mut starts = Vec::new();
    let mut responses = Vec::new();

    for event in events {
        let name = event.event_name();
        if classifier.is_start(name) {
            starts.push(event);
        }
        if classifier.is_response(name) {
            responses.push(event);
        }
    }

    tracing::trace!(
        events = events.len(),
        starts = starts.len(),
        responses = responses.len(),
        "classified inference candidates"
    );

    Candidates { starts, responses }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ev;

    #[test]
    fn start_predicate() {
        assert!(is_start_candidate("inference_start"));
        assert!(is_start_candidate("Inference Started"));
        assert!(is_start_candidate("INFERENCE_INICIO"));
        assert!(is_start_candidate("inicio_inferencia"));
        assert!(!is_start_candidate("session_start"));
        assert!(!is_start_candidate("inference_response"));
    }

    #[test]
    fn response_predicate() {
        assert!(is_response_candidate("inference_response"));
        assert!(is_response_candidate("respuesta_inferencia"));
        assert!(is_response_candidate("fin_inferencia"));
        assert!(is_response_candidate("InferenceEnd"));
        assert!(!is_response_candidate("response_received"));
        assert!(!is_response_candidate("inference_start"));
    }

    #[test]
    fn name_matching_both_predicates_lands_in_both_sets() {
        let events = vec![ev("e1", "s1", "inference_start_end", 0)];
        let candidates = classify(&events, &NameHeuristic);
        assert_eq!(candidates.starts.len(), 1);
        assert_eq!(candidates.responses.len(), 1);
    }

    #[test]
    fn classify_preserves_input_order() {
        let events = vec![
            ev("r2", "s1", "inference_response", 30),
            ev("x", "s1", "button_click", 5),
            ev("s2", "s1", "inference_start", 20),
            ev("r1", "s1", "fin_inferencia", 10),
            ev("s1", "s1", "inicio_inferencia", 0),
        ];
        let candidates = classify(&events, &NameHeuristic);

        let starts: Vec<_> = candidates.starts.iter().map(|e| e.event_id()).collect();
        let responses: Vec<_> = candidates.responses.iter().map(|e| e.event_id()).collect();
        assert_eq!(starts, vec!["s2", "s1"]);
        assert_eq!(responses, vec!["r2", "r1"]);
    }

    #[test]
    fn classify_without_markers_is_empty() {
        let events = vec![ev("a", "s1", "page_view", 0), ev("b", "s1", "logout", 1)];
        assert!(classify(&events, &NameHeuristic).is_empty());
    }

    #[test]
    fn custom_classifier_can_replace_heuristic() {
        struct ExactNames;
        impl CandidateClassifier for ExactNames {
            fn is_start(&self, event_name: &str) -> bool {
                event_name == "llm.request"
            }
            fn is_response(&self, event_name: &str) -> bool {
                event_name == "llm.reply"
            }
        }

        let events = vec![
            ev("a", "s1", "llm.request", 0),
            ev("b", "s1", "inference_start", 1),
            ev("c", "s1", "llm.reply", 2),
        ];
        let candidates = classify(&events, &ExactNames);
        assert_eq!(candidates.starts.len(), 1);
        assert_eq!(candidates.responses[0].event_id(), "c");
    }
}
