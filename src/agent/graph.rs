use super::state::{AgentState, StateField, StateUpdate};
use super::AgentError;
use crate::fhir::FhirStore;
use crate::pipeline::llm::{LlmClient, LlmGateway};
use crate::pipeline::rag::{VectorSearch, DEFAULT_SCORE_THRESHOLD};
use crate::pipeline::storage::EmbeddingModel;

/// Workflow nodes.
///
/// ```text
/// parse_note → decide_retrieval → [needs_retrieval? retrieve_guidelines : fetch_patient_data]
/// retrieve_guidelines → fetch_patient_data → generate_report → evaluate_report → end
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    ParseNote,
    DecideRetrieval,
    RetrieveGuidelines,
    FetchPatientData,
    GenerateReport,
    EvaluateReport,
}

impl NodeId {
    pub const ENTRY: NodeId = NodeId::ParseNote;

    pub fn as_str(self) -> &'static str {
        match self {
            NodeId::ParseNote => "parse_note",
            NodeId::DecideRetrieval => "decide_retrieval",
            NodeId::RetrieveGuidelines => "retrieve_guidelines",
            NodeId::FetchPatientData => "fetch_patient_data",
            NodeId::GenerateReport => "generate_report",
            NodeId::EvaluateReport => "evaluate_report",
        }
    }

    /// Node to run after `self`, given the state it produced. `None` ends the run.
    pub fn next(self, state: &AgentState) -> Option<NodeId> {
        match self {
            NodeId::ParseNote => Some(NodeId::DecideRetrieval),
            NodeId::DecideRetrieval if state.wants_retrieval() => Some(NodeId::RetrieveGuidelines),
            NodeId::DecideRetrieval => Some(NodeId::FetchPatientData),
            NodeId::RetrieveGuidelines => Some(NodeId::FetchPatientData),
            NodeId::FetchPatientData => Some(NodeId::GenerateReport),
            NodeId::GenerateReport => Some(NodeId::EvaluateReport),
            NodeId::EvaluateReport => None,
        }
    }

    /// State fields this node is allowed to set.
    pub fn writes(self) -> &'static [StateField] {
        match self {
            NodeId::ParseNote => &[StateField::ExtractedEntities, StateField::PatientId],
            NodeId::DecideRetrieval => &[StateField::NeedsRetrieval, StateField::RetrievalQueries],
            NodeId::RetrieveGuidelines => &[StateField::Guidelines],
            NodeId::FetchPatientData => &[StateField::PatientData],
            NodeId::GenerateReport => &[StateField::Report],
            NodeId::EvaluateReport => &[StateField::Evaluation],
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs the clinical workflow over borrowed collaborators: the model gateway,
/// the guideline index with its embedder, and the loaded record store.
pub struct ClinicalAgent<'a, C: LlmClient> {
    gateway: &'a LlmGateway<C>,
    embedder: &'a dyn EmbeddingModel,
    index: &'a dyn VectorSearch,
    store: &'a FhirStore,
    score_threshold: f32,
}

impl<'a, C: LlmClient> ClinicalAgent<'a, C> {
    pub fn new(
        gateway: &'a LlmGateway<C>,
        embedder: &'a dyn EmbeddingModel,
        index: &'a dyn VectorSearch,
        store: &'a FhirStore,
    ) -> Self {
        Self {
            gateway,
            embedder,
            index,
            store,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    pub fn with_score_threshold(mut self, score_threshold: f32) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    pub fn gateway(&self) -> &'a LlmGateway<C> {
        self.gateway
    }

    pub fn embedder(&self) -> &'a dyn EmbeddingModel {
        self.embedder
    }

    pub fn index(&self) -> &'a dyn VectorSearch {
        self.index
    }

    pub fn store(&self) -> &'a FhirStore {
        self.store
    }

    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    /// Run one node against the current state.
    pub fn step(&self, node: NodeId, state: &AgentState) -> Result<StateUpdate, AgentError> {
        match node {
            NodeId::ParseNote => self.parse_note(state),
            NodeId::DecideRetrieval => self.decide_retrieval(state),
            NodeId::RetrieveGuidelines => self.retrieve_guidelines(state),
            NodeId::FetchPatientData => self.fetch_patient_data(state),
            NodeId::GenerateReport => self.generate_report(state),
            NodeId::EvaluateReport => self.evaluate_report(state),
        }
    }

    /// Process a note to completion and return the terminal state.
    pub fn run(&self, patient_note: &str) -> Result<AgentState, AgentError> {
        self.run_with_trace(patient_note).map(|(state, _)| state)
    }

    /// Like [`run`](Self::run), also returning the nodes visited in order.
    /// Any node failure aborts the run.
    pub fn run_with_trace(
        &self,
        patient_note: &str,
    ) -> Result<(AgentState, Vec<NodeId>), AgentError> {
        let mut state = AgentState::new(patient_note);
        let mut trace = Vec::new();
        let mut current = Some(NodeId::ENTRY);

        while let Some(node) = current {
            tracing::debug!(node = %node, "Entering node");
            let update = self.step(node, &state)?;
            debug_assert!(
                update.fields().iter().all(|f| node.writes().contains(f)),
                "{node} wrote fields outside its write set"
            );
            state.apply(update);
            trace.push(node);
            current = node.next(&state);
        }

        tracing::info!(nodes = trace.len(), "Workflow complete");
        Ok((state, trace))
    }
}
