//! Processing graph
//!
//! A turn walks an explicit state machine:
//!
//! ```text
//! Start → ClassifyIntent → SearchKnowledge → ScoreInterest
//!       → (CollectData) → GenerateResponse → Done
//! ```
//!
//! Any node can divert to `Failed`. Collaborator failures (LLM, embedding,
//! search) are not node failures: they are recorded on the state and the turn
//! carries on with whatever it has. The returned state always has a response.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hermes_config::constants::llm::APOLOGY_RESPONSE;
use hermes_config::prompts::{HISTORY_SECTION, NO_CONTEXT};
use hermes_config::{
    render_prompt, GraphConfig, ModelRole, PromptRole, Settings, Threshold,
};
use hermes_core::{
    format_final_response, prepare_text_for_embedding, record_error, record_node_execution,
    validate_state, CollectionStage, CompletionGenerator, CompletionRequest,
    DataCollectionProgress, Embedder, Error, GraphState, IntentType, InterestTier,
    KnowledgeContext, KnowledgeSearch, RelevantDoc,
};

use crate::actions::derive_next_actions;
use crate::collection::{advance_stage, extract_collected_data, fallback_question};
use crate::execution_log::{ExecutionLogger, NodeOutput};
use crate::intent::{intent_search_terms, parse_intent_response};
use crate::interest::assess_interest;
use crate::AgentError;

const INTENT_TEMPERATURE: f32 = 0.1;
const INTENT_MAX_TOKENS: usize = 150;
const QUESTION_MAX_TOKENS: usize = 120;

/// Graph nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphNode {
    Start,
    ClassifyIntent,
    SearchKnowledge,
    ScoreInterest,
    CollectData,
    GenerateResponse,
    Done,
    Failed,
}

impl GraphNode {
    /// Name used in execution records and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphNode::Start => "start",
            GraphNode::ClassifyIntent => "classify_intent",
            GraphNode::SearchKnowledge => "search_knowledge",
            GraphNode::ScoreInterest => "score_interest",
            GraphNode::CollectData => "collect_data",
            GraphNode::GenerateResponse => "generate_response",
            GraphNode::Done => "done",
            GraphNode::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GraphNode::Done)
    }
}

impl std::fmt::Display for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the turn should advance data collection
fn should_collect(state: &GraphState, config: &GraphConfig) -> bool {
    let Some(interest) = &state.interest_level else {
        return false;
    };
    let ready = interest.score / 100.0 >= config.threshold_for(Threshold::DataCollection);
    let complete = state
        .collection_stage()
        .map_or(false, |stage| stage.is_complete());
    ready && !complete
}

/// Pure transition function
pub fn next_node(current: GraphNode, state: &GraphState, config: &GraphConfig) -> GraphNode {
    match current {
        GraphNode::Start => GraphNode::ClassifyIntent,
        GraphNode::ClassifyIntent => GraphNode::SearchKnowledge,
        GraphNode::SearchKnowledge => GraphNode::ScoreInterest,
        GraphNode::ScoreInterest => {
            if should_collect(state, config) {
                GraphNode::CollectData
            } else {
                GraphNode::GenerateResponse
            }
        }
        GraphNode::CollectData => GraphNode::GenerateResponse,
        GraphNode::GenerateResponse | GraphNode::Failed | GraphNode::Done => GraphNode::Done,
    }
}

/// External collaborators of the graph
#[derive(Clone)]
pub struct Collaborators {
    pub completion: Arc<dyn CompletionGenerator>,
    pub embedder: Arc<dyn Embedder>,
    pub search: Arc<dyn KnowledgeSearch>,
}

/// Execution parameters that do not belong to [`GraphConfig`]
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOptions {
    /// Budget for a single collaborator call
    pub collaborator_timeout: Duration,
    /// Extra attempts for search and response generation
    pub retries: u32,
    pub similarity_threshold: f32,
    pub max_results: usize,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl GraphOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            collaborator_timeout: Duration::from_millis(settings.graph.collaborator_timeout_ms),
            retries: settings.graph.retries,
            similarity_threshold: settings.rag.similarity_threshold,
            max_results: settings.rag.max_results,
            temperature: settings.llm.temperature,
            max_tokens: settings.llm.max_tokens,
        }
    }
}

/// Outcome of a node that could not complete
struct NodeFailure {
    state: GraphState,
    error: AgentError,
}

type NodeResult = Result<GraphState, NodeFailure>;

/// Turn orchestrator
pub struct HermesGraph {
    collaborators: Collaborators,
    config: Arc<GraphConfig>,
    options: GraphOptions,
    logger: Arc<ExecutionLogger>,
}

impl HermesGraph {
    pub fn new(
        collaborators: Collaborators,
        config: Arc<GraphConfig>,
        options: GraphOptions,
        logger: Arc<ExecutionLogger>,
    ) -> Self {
        Self {
            collaborators,
            config,
            options,
            logger,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn logger(&self) -> &Arc<ExecutionLogger> {
        &self.logger
    }

    /// Process one turn
    ///
    /// `history_context` is the formatted prior exchanges (see
    /// [`format_history`]), empty for a new conversation. An invalid state is
    /// rejected before any collaborator is called.
    pub async fn run(
        &self,
        state: GraphState,
        history_context: &str,
    ) -> Result<GraphState, AgentError> {
        if !validate_state(&state) {
            return Err(AgentError::InvalidState(
                "message and execution id are required".to_string(),
            ));
        }

        let started = Instant::now();
        let execution_id = state.metadata.execution_id.clone();
        tracing::debug!(execution_id = %execution_id, "Graph run started");

        let mut state = state;
        let mut node = GraphNode::Start;
        loop {
            node = next_node(node, &state, &self.config);
            if node.is_terminal() {
                break;
            }

            let result = match node {
                GraphNode::ClassifyIntent => Ok(self.classify_intent(state).await),
                GraphNode::SearchKnowledge => Ok(self.search_knowledge(state).await),
                GraphNode::ScoreInterest => Ok(self.score_interest(state)),
                GraphNode::CollectData => self.collect_data(state).await,
                GraphNode::GenerateResponse => {
                    Ok(self.generate_response(state, history_context).await)
                }
                GraphNode::Start | GraphNode::Done | GraphNode::Failed => Ok(state),
            };

            (node, state) = self.settle(node, result);
        }

        if state.response.is_none() {
            state.response = Some(APOLOGY_RESPONSE.to_string());
        }

        metrics::histogram!("hermes_graph_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            execution_id = %execution_id,
            nodes = state.execution_count(),
            errors = state.error_count(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Graph run completed"
        );

        Ok(state)
    }

    /// Accept a node's result, or divert to `Failed` when the node errored or
    /// left the state invalid
    fn settle(&self, node: GraphNode, result: NodeResult) -> (GraphNode, GraphState) {
        match result {
            Ok(next) if validate_state(&next) => (node, next),
            Ok(next) => {
                let error =
                    AgentError::InvalidState("state lost its message or execution id".to_string());
                (GraphNode::Failed, self.fail(next, node, error))
            }
            Err(failure) => (GraphNode::Failed, self.fail(failure.state, node, failure.error)),
        }
    }

    /// The `Failed` node: record the failure and answer with the apology
    fn fail(&self, state: GraphState, node: GraphNode, error: AgentError) -> GraphState {
        let token = self.logger.begin(GraphNode::Failed.as_str());
        let message = AgentError::Node {
            node: node.as_str().to_string(),
            message: error.to_string(),
        }
        .to_string();
        tracing::error!(node = %node, error = %message, "Node failed unexpectedly");
        node_failed(node);

        let mut state = record_error(state, node.as_str(), message.as_str());
        state.response = Some(APOLOGY_RESPONSE.to_string());
        self.logger.fail(token, &message);
        record_node_execution(state, GraphNode::Failed.as_str(), false, None)
    }

    async fn classify_intent(&self, state: GraphState) -> GraphState {
        let node = GraphNode::ClassifyIntent;
        let token = self.logger.begin(node.as_str());
        let started = Instant::now();

        let request = CompletionRequest::new(
            self.config.model_for(ModelRole::IntentClassifier),
            self.config.prompt_for(PromptRole::IntentClassification),
            state.message.as_str(),
        )
        .with_temperature(INTENT_TEMPERATURE)
        .with_max_tokens(INTENT_MAX_TOKENS);

        let completion = &*self.collaborators.completion;
        let outcome = match self.call(completion.complete(request)).await {
            Ok(raw) => parse_intent_response(&raw),
            Err(e) => Err(AgentError::Core(e)),
        };

        match outcome {
            Ok(intent) => {
                let trusted =
                    intent.confidence >= self.config.threshold_for(Threshold::IntentConfidence);
                tracing::debug!(
                    intent = %intent.intent_type,
                    confidence = intent.confidence,
                    trusted,
                    "Intent classified"
                );
                self.logger.end(
                    token,
                    NodeOutput::IntentClassified {
                        intent: Some(intent.intent_type),
                        confidence: intent.confidence,
                    },
                );
                let mut state = state;
                state.intent = Some(intent);
                record_node_execution(state, node.as_str(), true, Some(started.elapsed()))
            }
            Err(e) => {
                let message = e.to_string();
                self.logger.fail(token, &message);
                node_failed(node);
                let state = record_error(state, node.as_str(), message);
                record_node_execution(state, node.as_str(), false, Some(started.elapsed()))
            }
        }
    }

    async fn search_knowledge(&self, state: GraphState) -> GraphState {
        let node = GraphNode::SearchKnowledge;
        let token = self.logger.begin(node.as_str());
        let started = Instant::now();

        let query = self.search_query(&state);
        let embedder = &*self.collaborators.embedder;
        let search = &*self.collaborators.search;
        let query_text = query.as_str();
        let threshold = self.options.similarity_threshold;
        let max_results = self.options.max_results;

        let outcome = self
            .with_retries(node, move || async move {
                let embedding = embedder.embed(query_text).await?;
                search.search(&embedding, threshold, max_results).await
            })
            .await;

        match outcome {
            Ok(documents) => {
                self.logger.end(
                    token,
                    NodeOutput::KnowledgeRetrieved {
                        documents: documents.len(),
                        query: query.clone(),
                    },
                );
                let mut state = state;
                state.knowledge_context = Some(KnowledgeContext {
                    relevant_docs: documents
                        .into_iter()
                        .map(|doc| RelevantDoc {
                            title: doc.title,
                            content: doc.content,
                            similarity: doc.similarity,
                        })
                        .collect(),
                    search_query: query,
                });
                record_node_execution(state, node.as_str(), true, Some(started.elapsed()))
            }
            Err(e) => {
                let message = e.to_string();
                self.logger.fail(token, &message);
                node_failed(node);
                let state = record_error(state, node.as_str(), message);
                record_node_execution(state, node.as_str(), false, Some(started.elapsed()))
            }
        }
    }

    /// Normalized message plus the trusted intent's search terms
    fn search_query(&self, state: &GraphState) -> String {
        let mut query = prepare_text_for_embedding(&state.message);
        if query.is_empty() {
            query = state.message.trim().to_string();
        }
        let min_confidence = self.config.threshold_for(Threshold::IntentConfidence);
        if let Some(intent) = state.trusted_intent(min_confidence) {
            let terms = intent_search_terms(intent.intent_type);
            if !terms.is_empty() {
                query.push(' ');
                query.push_str(terms);
            }
        }
        query
    }

    fn score_interest(&self, state: GraphState) -> GraphState {
        let node = GraphNode::ScoreInterest;
        let token = self.logger.begin(node.as_str());
        let started = Instant::now();

        let interest = assess_interest(&state.message);
        self.logger.end(
            token,
            NodeOutput::InterestScored {
                score: interest.score,
                level: interest.level,
            },
        );

        let mut state = state;
        state.interest_level = Some(interest);
        record_node_execution(state, node.as_str(), true, Some(started.elapsed()))
    }

    async fn collect_data(&self, state: GraphState) -> NodeResult {
        let node = GraphNode::CollectData;
        let token = self.logger.begin(node.as_str());
        let started = Instant::now();

        let previous = state.collection_stage();
        if previous.map_or(false, |stage| stage.is_complete()) {
            self.logger.fail(token, "collection already complete");
            return Err(NodeFailure {
                state: record_node_execution(state, node.as_str(), false, Some(started.elapsed())),
                error: AgentError::InvalidState("collection already complete".to_string()),
            });
        }
        let stage = advance_stage(previous);

        let mut state = state;
        let collected = extract_collected_data(
            &state.message,
            previous,
            state.collected_data.take().unwrap_or_default(),
        );
        state.collected_data = (!collected.is_empty()).then_some(collected);

        let question = if stage.is_complete() {
            None
        } else {
            match self.collection_question(&state, stage).await {
                Ok(question) => Some(question),
                Err(e) => {
                    tracing::warn!(stage = %stage, error = %e, "Using canned collection question");
                    state = record_error(state, node.as_str(), e.to_string());
                    fallback_question(stage).map(str::to_string)
                }
            }
        };

        state.data_collection_stage = Some(DataCollectionProgress {
            current_stage: stage,
            questions_asked: question.iter().cloned().collect(),
            pending_questions: stage
                .remaining_after()
                .into_iter()
                .filter_map(fallback_question)
                .map(str::to_string)
                .collect(),
        });

        self.logger.end(token, NodeOutput::DataCollectionAdvanced { stage, question });
        Ok(record_node_execution(state, node.as_str(), true, Some(started.elapsed())))
    }

    async fn collection_question(
        &self,
        state: &GraphState,
        stage: CollectionStage,
    ) -> Result<String, Error> {
        let collected = state
            .collected_data
            .as_ref()
            .map(|data| data.summary())
            .unwrap_or_else(|| "ninguno".to_string());
        let system = render_prompt(
            self.config.prompt_for(PromptRole::DataCollection),
            &[("currentStage", stage.as_str()), ("collectedData", &collected)],
        );
        let request = CompletionRequest::new(
            self.config.model_for(ModelRole::ResponseGenerator),
            system,
            state.message.as_str(),
        )
        .with_temperature(self.options.temperature)
        .with_max_tokens(QUESTION_MAX_TOKENS);

        let question = self.call(self.collaborators.completion.complete(request)).await?;
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::Llm("empty collection question".to_string()));
        }
        Ok(question.to_string())
    }

    async fn generate_response(&self, state: GraphState, history_context: &str) -> GraphState {
        let node = GraphNode::GenerateResponse;
        let token = self.logger.begin(node.as_str());
        let started = Instant::now();

        let mut state = state;
        let actions = derive_next_actions(&state, &self.config);

        let request = CompletionRequest::new(
            self.config.model_for(ModelRole::ResponseGenerator),
            self.response_system_prompt(&state, history_context),
            state.message.as_str(),
        )
        .with_temperature(self.options.temperature)
        .with_max_tokens(self.options.max_tokens);

        let completion = &*self.collaborators.completion;
        let outcome = self
            .with_retries(node, move || {
                let request = request.clone();
                async move {
                    let text = completion.complete(request).await?;
                    if text.trim().is_empty() {
                        return Err(Error::Llm("empty completion".to_string()));
                    }
                    Ok(text)
                }
            })
            .await;

        let question = state
            .data_collection_stage
            .as_ref()
            .and_then(|progress| progress.questions_asked.last().cloned());

        let (response, success) = match outcome {
            Ok(text) => {
                let response = match &question {
                    Some(question) => format!("{}\n\n{}", text.trim(), question),
                    None => {
                        let immediate: Vec<_> = actions.immediate.iter().copied().collect();
                        format_final_response(&text, &immediate)
                    }
                };
                self.logger.end(
                    token,
                    NodeOutput::ResponseGenerated {
                        chars: response.chars().count(),
                    },
                );
                (response, true)
            }
            Err(e) => {
                let message = e.to_string();
                self.logger.fail(token, &message);
                node_failed(node);
                state = record_error(state, node.as_str(), message);
                (APOLOGY_RESPONSE.to_string(), false)
            }
        };

        state.response = Some(response);
        state.next_actions = Some(actions);
        record_node_execution(state, node.as_str(), success, Some(started.elapsed()))
    }

    fn response_system_prompt(&self, state: &GraphState, history_context: &str) -> String {
        let context = state
            .knowledge_context
            .as_ref()
            .filter(|ctx| !ctx.is_empty())
            .map(|ctx| {
                ctx.relevant_docs
                    .iter()
                    .map(|doc| format!("{}: {}", doc.title, doc.content))
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })
            .unwrap_or_else(|| NO_CONTEXT.to_string());

        let min_confidence = self.config.threshold_for(Threshold::IntentConfidence);
        let intent = state
            .trusted_intent(min_confidence)
            .map_or(IntentType::GeneralInquiry, |intent| intent.intent_type);
        let interest = state
            .interest_level
            .as_ref()
            .map_or(InterestTier::Low, |interest| interest.level);

        let mut prompt = render_prompt(
            self.config.prompt_for(PromptRole::ResponseGeneration),
            &[
                ("context", &context),
                ("intent", intent.as_str()),
                ("interestLevel", interest.as_str()),
            ],
        );

        let history = history_context.trim();
        if !history.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(HISTORY_SECTION);
            prompt.push('\n');
            prompt.push_str(history);
        }
        prompt
    }

    /// Bound a collaborator call by the configured timeout
    async fn call<T, F>(&self, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        let budget = self.options.collaborator_timeout;
        match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(budget.as_millis() as u64)),
        }
    }

    /// Run `op` with the timeout, retrying up to `options.retries` times
    async fn with_retries<T, F, Fut>(&self, node: GraphNode, mut op: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let attempts = self.options.retries + 1;
        let mut last_error = Error::Llm(format!("{} made no attempt", node));
        for attempt in 1..=attempts {
            match self.call(op()).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(node = %node, attempt, attempts, error = %e, "Collaborator call failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

fn node_failed(node: GraphNode) {
    metrics::counter!("hermes_graph_node_failures_total", "node" => node.as_str()).increment(1);
}

/// Format prior exchanges for the response prompt, oldest first
pub fn format_history<'a, I>(exchanges: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    exchanges
        .into_iter()
        .map(|(user, bot)| format!("Usuario: {}\nAsistente: {}", user, bot))
        .collect::<Vec<_>>()
        .join("\n\n")
}
