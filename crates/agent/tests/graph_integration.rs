//! Integration tests for the processing graph
//!
//! Collaborators are scripted in-process mocks, so every path through the
//! graph (success, failure, timeout) is deterministic.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use hermes_agent::{
    format_history, ExecutionLogger, GraphOptions, HermesGraph, Collaborators, NodeOutput,
};
use hermes_config::constants::llm::APOLOGY_RESPONSE;
use hermes_config::prompts::HISTORY_SECTION;
use hermes_config::GraphConfig;
use hermes_core::{
    create_initial_state, ActionTag, CollectionStage, CompletionGenerator, CompletionRequest,
    DataCollectionProgress, Embedder, Error, GraphState, IntentType, KnowledgeDocument,
    KnowledgeSearch, Result,
};

const HOT_LEAD: &str = "Necesito una landing page urgente, mi presupuesto es de 200000 pesos";

/// Replies chosen by which prompt the request carries
#[derive(Default)]
struct ScriptedCompletion {
    intent: Option<String>,
    response: Option<String>,
    question: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    fn working() -> Self {
        Self {
            intent: Some(r#"{"intent":"landing_page","confidence":0.92}"#.to_string()),
            response: Some("¡Claro! Hacemos landing pages.".to_string()),
            question: Some("¿Me dejás tu email?".to_string()),
            ..Default::default()
        }
    }

    fn failing() -> Self {
        Self::default()
    }

    fn response_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.system_prompt.contains("asistente comercial"))
            .map(|r| r.system_prompt.clone())
            .collect()
    }
}

#[async_trait]
impl CompletionGenerator for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().push(request.clone());
        let reply = if request.system_prompt.contains("clasificador de intenciones") {
            &self.intent
        } else if request.system_prompt.contains("ETAPA ACTUAL") {
            &self.question
        } else {
            &self.response
        };
        reply
            .clone()
            .ok_or_else(|| Error::Llm("model unavailable".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct RecordingEmbedder {
    delay: Option<Duration>,
    texts: Mutex<Vec<String>>,
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.lock().push(text.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn dim(&self) -> usize {
        3
    }
}

#[derive(Default)]
struct FixedSearch {
    documents: Vec<KnowledgeDocument>,
}

#[async_trait]
impl KnowledgeSearch for FixedSearch {
    async fn search(
        &self,
        _query_embedding: &[f32],
        similarity_threshold: f32,
        max_results: usize,
    ) -> Result<Vec<KnowledgeDocument>> {
        Ok(self
            .documents
            .iter()
            .filter(|doc| doc.similarity >= similarity_threshold)
            .take(max_results)
            .cloned()
            .collect())
    }
}

struct Harness {
    graph: HermesGraph,
    completion: Arc<ScriptedCompletion>,
    embedder: Arc<RecordingEmbedder>,
    logger: Arc<ExecutionLogger>,
}

fn harness(
    completion: ScriptedCompletion,
    embedder: RecordingEmbedder,
    search: FixedSearch,
) -> Harness {
    let completion = Arc::new(completion);
    let embedder = Arc::new(embedder);
    let logger = Arc::new(ExecutionLogger::new());
    let options = GraphOptions {
        collaborator_timeout: Duration::from_millis(50),
        ..GraphOptions::default()
    };
    let graph = HermesGraph::new(
        Collaborators {
            completion: completion.clone(),
            embedder: embedder.clone(),
            search: Arc::new(search),
        },
        Arc::new(GraphConfig::default()),
        options,
        logger.clone(),
    );
    Harness {
        graph,
        completion,
        embedder,
        logger,
    }
}

fn seeded(message: &str, stage: Option<CollectionStage>) -> GraphState {
    let mut state = create_initial_state(message, Some("conv-1".to_string()), None);
    state.data_collection_stage = stage.map(|current_stage| DataCollectionProgress {
        current_stage,
        questions_asked: Vec::new(),
        pending_questions: Vec::new(),
    });
    state
}

fn node_names(state: &GraphState) -> Vec<&str> {
    state
        .metadata
        .node_executions
        .iter()
        .map(|n| n.node_name.as_str())
        .collect()
}

fn landing_doc() -> KnowledgeDocument {
    KnowledgeDocument {
        id: "landing".to_string(),
        title: "Landing Pages".to_string(),
        content: "Desde $120.000, entrega en 2 semanas".to_string(),
        category: "servicios".to_string(),
        similarity: 0.91,
    }
}

#[tokio::test]
async fn test_hot_lead_full_path() {
    let h = harness(
        ScriptedCompletion::working(),
        RecordingEmbedder::default(),
        FixedSearch {
            documents: vec![landing_doc()],
        },
    );

    let state = h.graph.run(seeded(HOT_LEAD, None), "").await.unwrap();

    assert_eq!(
        node_names(&state),
        vec![
            "classify_intent",
            "search_knowledge",
            "score_interest",
            "collect_data",
            "generate_response"
        ]
    );
    assert!(state.metadata.node_executions.iter().all(|n| n.success));
    assert_eq!(state.error_count(), 0);

    assert_eq!(
        state.intent.as_ref().map(|i| i.intent_type),
        Some(IntentType::LandingPage)
    );
    assert_eq!(state.knowledge_context.as_ref().unwrap().relevant_docs.len(), 1);
    assert_eq!(state.collection_stage(), Some(CollectionStage::Email));
    assert_eq!(
        state.response.as_deref(),
        Some("¡Claro! Hacemos landing pages.\n\n¿Me dejás tu email?")
    );

    let actions = state.next_actions.as_ref().unwrap();
    assert!(actions.immediate.contains(&ActionTag::ScheduleCall));
    assert!(actions.immediate.contains(&ActionTag::AskEmail));

    // Knowledge and scoring reach the response prompt
    let prompts = h.completion.response_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Landing Pages: Desde $120.000"));
    assert!(prompts[0].contains("INTENT DETECTADO: landing_page"));
    assert!(prompts[0].contains("NIVEL DE INTERÉS: high"));

    // Trusted intent terms extend the search query
    let texts = h.embedder.texts.lock().clone();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].ends_with("landing page"));

    assert_eq!(h.logger.len(), 5);
}

#[tokio::test]
async fn test_failing_completion_yields_apology() {
    let h = harness(
        ScriptedCompletion::failing(),
        RecordingEmbedder::default(),
        FixedSearch::default(),
    );

    let state = h.graph.run(seeded("hola", None), "").await.unwrap();

    assert_eq!(state.response.as_deref(), Some(APOLOGY_RESPONSE));
    assert!(state.intent.is_none());

    let errors = state.metadata.errors.as_ref().unwrap();
    assert!(errors.iter().any(|e| e.node_name == "classify_intent"));
    assert!(errors.iter().any(|e| e.node_name == "generate_response"));

    // One classification attempt plus the response attempt and its retry
    assert_eq!(h.completion.requests.lock().len(), 3);

    let failed: Vec<_> = h
        .logger
        .history()
        .into_iter()
        .filter(|r| !r.success)
        .map(|r| r.node_name)
        .collect();
    assert_eq!(failed, vec!["classify_intent", "generate_response"]);
}

#[tokio::test]
async fn test_collection_advances_one_stage_per_turn() {
    let h = harness(
        ScriptedCompletion::working(),
        RecordingEmbedder::default(),
        FixedSearch::default(),
    );

    let expected = [
        CollectionStage::Email,
        CollectionStage::BusinessInfo,
        CollectionStage::Requirements,
        CollectionStage::Preferences,
        CollectionStage::Complete,
    ];

    let mut stage = None;
    for want in expected {
        let state = h.graph.run(seeded(HOT_LEAD, stage), "").await.unwrap();
        assert_eq!(state.collection_stage(), Some(want));
        assert!(state.response.is_some());
        stage = state.collection_stage();
    }

    // Complete is terminal: the node is no longer entered
    let state = h.graph.run(seeded(HOT_LEAD, stage), "").await.unwrap();
    assert!(!node_names(&state).contains(&"collect_data"));
    assert_eq!(state.collection_stage(), Some(CollectionStage::Complete));
}

#[tokio::test]
async fn test_complete_stage_asks_no_question() {
    let h = harness(
        ScriptedCompletion::working(),
        RecordingEmbedder::default(),
        FixedSearch::default(),
    );

    let state = h
        .graph
        .run(seeded(HOT_LEAD, Some(CollectionStage::Preferences)), "")
        .await
        .unwrap();

    let progress = state.data_collection_stage.as_ref().unwrap();
    assert_eq!(progress.current_stage, CollectionStage::Complete);
    assert!(progress.questions_asked.is_empty());
    // No question, so the call CTA of a hot lead is appended instead
    let response = state.response.unwrap();
    assert!(response.starts_with("¡Claro! Hacemos landing pages."));
    assert!(response.contains("videollamada"));
}

#[tokio::test]
async fn test_collection_question_falls_back_to_canned() {
    let completion = ScriptedCompletion {
        question: None,
        ..ScriptedCompletion::working()
    };
    let h = harness(completion, RecordingEmbedder::default(), FixedSearch::default());

    let state = h.graph.run(seeded(HOT_LEAD, None), "").await.unwrap();

    let progress = state.data_collection_stage.as_ref().unwrap();
    assert_eq!(
        progress.questions_asked,
        vec!["Para enviarte información detallada, ¿podrías compartir tu email?".to_string()]
    );
    assert_eq!(progress.pending_questions.len(), 3);
    assert!(state
        .metadata
        .errors
        .as_ref()
        .unwrap()
        .iter()
        .any(|e| e.node_name == "collect_data"));
}

#[tokio::test]
async fn test_email_answer_is_collected() {
    let h = harness(
        ScriptedCompletion::working(),
        RecordingEmbedder::default(),
        FixedSearch::default(),
    );
    let message = "Necesito la web urgente para mi negocio, presupuesto cerrado: ana@tienda.com";

    let state = h
        .graph
        .run(seeded(message, Some(CollectionStage::Email)), "")
        .await
        .unwrap();

    assert_eq!(state.collection_stage(), Some(CollectionStage::BusinessInfo));
    assert_eq!(
        state.collected_data.as_ref().and_then(|d| d.email.as_deref()),
        Some("ana@tienda.com")
    );
}

#[tokio::test]
async fn test_low_confidence_intent_is_not_trusted() {
    let completion = ScriptedCompletion {
        intent: Some(r#"{"intent":"portfolio_request","confidence":0.5}"#.to_string()),
        ..ScriptedCompletion::working()
    };
    let h = harness(completion, RecordingEmbedder::default(), FixedSearch::default());

    let state = h.graph.run(seeded("hola", None), "").await.unwrap();

    // Recorded, but neither routing nor search uses it
    assert_eq!(
        state.intent.as_ref().map(|i| i.intent_type),
        Some(IntentType::PortfolioRequest)
    );
    assert!(state.next_actions.as_ref().unwrap().is_empty());
    assert_eq!(h.embedder.texts.lock().clone(), vec!["hola".to_string()]);
    assert!(h.completion.response_prompts()[0].contains("INTENT DETECTADO: general_inquiry"));
}

#[tokio::test(start_paused = true)]
async fn test_search_timeout_is_recorded() {
    let embedder = RecordingEmbedder {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let h = harness(ScriptedCompletion::working(), embedder, FixedSearch::default());

    let state = h.graph.run(seeded("hola", None), "").await.unwrap();

    assert!(state.knowledge_context.is_none());
    let errors = state.metadata.errors.as_ref().unwrap();
    let search_error = errors
        .iter()
        .find(|e| e.node_name == "search_knowledge")
        .unwrap();
    assert_eq!(search_error.error, "Timed out after 50ms");
    // First attempt plus one retry
    assert_eq!(h.embedder.texts.lock().len(), 2);

    // The turn still answers, with no knowledge in the prompt
    assert_eq!(state.response.as_deref(), Some("¡Claro! Hacemos landing pages."));
    assert!(h.completion.response_prompts()[0].contains("No hay información específica"));
}

#[tokio::test]
async fn test_history_reaches_response_prompt() {
    let h = harness(
        ScriptedCompletion::working(),
        RecordingEmbedder::default(),
        FixedSearch::default(),
    );
    let history = format_history([("hola", "¡Hola! ¿En qué te ayudo?")]);

    h.graph.run(seeded("¿y el precio?", None), &history).await.unwrap();

    let prompt = &h.completion.response_prompts()[0];
    assert!(prompt.contains(HISTORY_SECTION));
    assert!(prompt.ends_with("Usuario: hola\nAsistente: ¡Hola! ¿En qué te ayudo?"));
}

#[tokio::test]
async fn test_invalid_state_rejected_before_collaborators() {
    let h = harness(
        ScriptedCompletion::working(),
        RecordingEmbedder::default(),
        FixedSearch::default(),
    );

    let result = h.graph.run(seeded("   ", None), "").await;

    assert!(matches!(result, Err(hermes_agent::AgentError::InvalidState(_))));
    assert!(h.completion.requests.lock().is_empty());
    assert!(h.embedder.texts.lock().is_empty());
    assert!(h.logger.is_empty());
}

#[tokio::test]
async fn test_logger_outputs_are_typed() {
    let h = harness(
        ScriptedCompletion::working(),
        RecordingEmbedder::default(),
        FixedSearch {
            documents: vec![landing_doc()],
        },
    );

    h.graph.run(seeded("hola", None), "").await.unwrap();

    let outputs: Vec<_> = h.logger.history().into_iter().filter_map(|r| r.output).collect();
    assert!(matches!(
        outputs[1],
        NodeOutput::KnowledgeRetrieved { documents: 1, .. }
    ));
    assert!(matches!(
        outputs.last(),
        Some(NodeOutput::ResponseGenerated { chars }) if *chars > 0
    ));
}
