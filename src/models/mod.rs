// Core data model: per-backend response records, query runs, and debate rounds.
// All mutation of a record goes through `ResponseRecord::transition`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Maximum number of debate participants when the config does not override it
pub const DEFAULT_MAX_DEBATE_PARTICIPANTS: usize = 4;

/// Maximum number of debate rounds when the config does not override it
pub const DEFAULT_MAX_DEBATE_ROUNDS: u32 = 5;

/// Hint carried with an invocation; backends may adjust behavior but are
/// free to ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    General,
    Coding,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::General => "general",
            QuestionType::Coding => "coding",
        }
    }

    /// Lenient parse for the HTTP boundary: anything unrecognized is a
    /// general question (hint, not constraint).
    pub fn from_wire(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "coding" => QuestionType::Coding,
            _ => QuestionType::General,
        }
    }
}

impl Default for QuestionType {
    fn default() -> Self {
        QuestionType::General
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" => Ok(QuestionType::General),
            "coding" => Ok(QuestionType::Coding),
            _ => Err(format!(
                "Invalid question type: '{}'. Expected 'general' or 'coding'",
                s
            )),
        }
    }
}

/// Status of a single backend invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Pending,
    Processing,
    Completed,
    Error,
    Cancelled,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Pending => "pending",
            ResponseStatus::Processing => "processing",
            ResponseStatus::Completed => "completed",
            ResponseStatus::Error => "error",
            ResponseStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResponseStatus::Completed | ResponseStatus::Error | ResponseStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One backend's record within a run (or within one debate round).
///
/// The only legal transition path is `pending -> processing -> terminal`;
/// terminal statuses are immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub model: String,
    pub status: ResponseStatus,
    /// Result text, present iff completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Elapsed seconds, present iff completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    /// Error detail, present iff errored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseRecord {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            status: ResponseStatus::Pending,
            content: None,
            time: None,
            error: None,
        }
    }

    /// Attempt a status transition. Returns false (and leaves the record
    /// untouched) if the transition is not legal; callers treat a false
    /// return as a stale event and discard it.
    pub fn transition(&mut self, to: ResponseStatus) -> bool {
        let legal = match (self.status, to) {
            (ResponseStatus::Pending, ResponseStatus::Processing) => true,
            // pending -> cancelled happens when a run is cancelled before a
            // worker ever marked its record processing
            (ResponseStatus::Pending, ResponseStatus::Cancelled) => true,
            (ResponseStatus::Processing, t) if t.is_terminal() => true,
            _ => false,
        };
        if legal {
            self.status = to;
        }
        legal
    }

    /// Transition to completed, recording the result text and elapsed time
    pub fn complete(&mut self, content: String, time: f64) -> bool {
        if self.transition(ResponseStatus::Completed) {
            self.content = Some(content);
            self.time = Some(time);
            true
        } else {
            false
        }
    }

    /// Transition to error, recording the message
    pub fn fail(&mut self, error: String) -> bool {
        if self.transition(ResponseStatus::Error) {
            self.error = Some(error);
            true
        } else {
            false
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// An in-flight Q&A fan-out: one record per selected backend
#[derive(Debug, Clone, Serialize)]
pub struct QueryRun {
    pub question: String,
    pub hint: QuestionType,
    pub records: HashMap<String, ResponseRecord>,
    /// Set exactly once, when the run-level completion event is emitted
    pub completed: bool,
}

impl QueryRun {
    pub fn new(question: &str, hint: QuestionType, models: &[String]) -> Self {
        Self {
            question: question.to_string(),
            hint,
            records: models
                .iter()
                .map(|m| (m.clone(), ResponseRecord::new(m)))
                .collect(),
            completed: false,
        }
    }

    pub fn all_terminal(&self) -> bool {
        self.records.values().all(|r| r.is_terminal())
    }

    pub fn successful_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.status == ResponseStatus::Completed)
            .count()
    }

    pub fn failed(&self) -> Vec<&ResponseRecord> {
        self.records
            .values()
            .filter(|r| r.status == ResponseStatus::Error)
            .collect()
    }
}

/// One debate round: 1-indexed, append-only once every record is terminal
#[derive(Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub round: u32,
    pub records: HashMap<String, ResponseRecord>,
}

impl RoundRecord {
    pub fn new(round: u32, models: &[String]) -> Self {
        Self {
            round,
            records: models
                .iter()
                .map(|m| (m.clone(), ResponseRecord::new(m)))
                .collect(),
        }
    }

    /// The barrier predicate: round r+1 may not dispatch until this is true
    pub fn is_terminal(&self) -> bool {
        self.records.values().all(|r| r.is_terminal())
    }
}

/// A statement recorded in a completed round, used for prompt composition
#[derive(Debug, Clone)]
pub struct Statement {
    pub round: u32,
    pub model: String,
    pub content: String,
}

/// An in-flight debate run
#[derive(Debug, Clone, Serialize)]
pub struct DebateRun {
    pub topic: String,
    pub total_rounds: u32,
    pub current_round: u32,
    /// Ordered for display; order-irrelevant for execution
    pub participants: Vec<String>,
    pub rounds: Vec<RoundRecord>,
    pub completed: bool,
}

impl DebateRun {
    pub fn new(topic: &str, participants: Vec<String>, total_rounds: u32) -> Self {
        Self {
            topic: topic.to_string(),
            total_rounds,
            current_round: 0,
            participants,
            rounds: Vec::new(),
            completed: false,
        }
    }

    /// Completed statements from every round strictly before `round`,
    /// ordered by round then by participant order.
    pub fn transcript_before(&self, round: u32) -> Vec<Statement> {
        let mut transcript = Vec::new();
        for rec in self.rounds.iter().filter(|r| r.round < round) {
            for model in &self.participants {
                if let Some(r) = rec.records.get(model) {
                    if let Some(content) = &r.content {
                        transcript.push(Statement {
                            round: rec.round,
                            model: model.clone(),
                            content: content.clone(),
                        });
                    }
                }
            }
        }
        transcript
    }

    pub fn rounds_completed(&self) -> u32 {
        self.rounds.iter().filter(|r| r.is_terminal()).count() as u32
    }
}

/// Deduplicate a selection while preserving first-seen order; a backend
/// appears in a dispatch set at most once per round.
pub fn dedup_models(selected: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    selected
        .iter()
        .filter(|m| seen.insert(m.as_str()))
        .cloned()
        .collect()
}
