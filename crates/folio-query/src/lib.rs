//! Query side of folio: the retrieval contract and the two orchestrators
//! (gap analysis, cited chat) built on top of it.

pub mod chat;
pub mod error;
pub mod evidence;
pub mod gap;
pub mod parse;
pub mod prompt;
pub mod retriever;
mod retry;

pub use chat::{ChatConfig, ChatTurn, CitedChat, Conversation};
pub use error::QueryError;
pub use evidence::{CitationRef, Evidence};
pub use gap::{GapAnalysis, GapAnalysisConfig, GapReport};
pub use parse::{GapCategory, GapFinding};
pub use retriever::{MAX_TOP_K, Retriever, RetrieverConfig};
pub use retry::RetryPolicy;
