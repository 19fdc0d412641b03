//! Query engine: answers natural-language questions about an indexed
//! codebase by classifying intent, resolving targets, retrieving
//! candidates structurally and semantically, scoring them per perspective,
//! and synthesizing a cited answer.

pub mod architecture;
pub mod error;
pub mod feedback;
pub mod intent;
pub mod planning;
pub mod query;
pub mod retrieval;
pub mod scoring;
pub mod session;
pub mod staleness;
pub mod synthesis;
pub mod target;

pub use error::{QueryError, Result};
pub use feedback::{submit_outcome, submit_relevance_rating, Adjustment, SubmitFeedbackResult};
pub use intent::{classify, Direction, Intent};
pub use planning::{plan_task, Complexity, TaskClassification, TaskPlan};
pub use query::{Depth, Query, QueryEngine, QueryResult};
pub use retrieval::Candidate;
pub use scoring::{Perspective, Signal, SignalVector};
pub use session::{ContextAssemblySession, SessionManager, SessionTurn};
pub use staleness::apply as apply_staleness;
pub use synthesis::{Citation, Synthesis};
pub use target::ResolvedTarget;
