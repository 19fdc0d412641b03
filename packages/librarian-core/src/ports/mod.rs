//! Driven ports the generator and query engine depend on. Infrastructure
//! (a tree-sitter grammar, an LLM SDK, an embedding API) implements these
//! traits; the core crate never depends on a concrete provider.

mod chat;
mod embed;
mod git_history;
mod parser;

pub use chat::{ChatMessage, ChatPort, ChatRequest, ChatResponse, EchoChatPort, UnavailableChatPort};
pub use embed::{EmbedPort, EmbedRequest, EmbedResponse, HashEmbedPort};
pub use git_history::{AuthorContribution, ChurnMetrics, Git2History, GitHistory};
pub use parser::{Language, ParsedFile, ParserRegistry, StaticParserRegistry};
