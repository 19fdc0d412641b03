//! Synthesis: sends the top-K packs to the chat port under a fixed
//! system role and validates every citation it returns.

use regex::Regex;
use std::sync::OnceLock;

use librarian_core::model::ContextPack;
use librarian_core::ports::{ChatMessage, ChatPort, ChatRequest};

const SYSTEM_ROLE: &str = "Answer strictly from the provided context packs. Cite every \
fact you use by wrapping its pack id in square brackets, e.g. [pack_id]. Never state a \
fact that isn't backed by a pack.";

#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
    pub pack_id: String,
    pub relevance: f64,
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub answer: String,
    pub confidence: f64,
    pub citations: Vec<Citation>,
}

fn citation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([A-Za-z0-9_\-]+)\]").unwrap())
}

fn build_prompt(intent_text: &str, packs: &[ContextPack]) -> String {
    let mut prompt = format!("Question: {intent_text}\n\nContext packs:\n");
    for pack in packs {
        prompt.push_str(&format!("[{}] {}\n", pack.pack_id, pack.summary));
    }
    prompt
}

/// Runs synthesis against `chat`, dropping any citation whose pack id isn't
/// in `packs`. Returns `None` when the chat port is unavailable — the
/// caller still has `packs` to work with, just no synthesized answer.
pub async fn synthesize(chat: &dyn ChatPort, intent_text: &str, packs: &[ContextPack]) -> Option<Synthesis> {
    if packs.is_empty() {
        return None;
    }

    let request = ChatRequest {
        provider: "query-synthesis".to_string(),
        model_id: "default".to_string(),
        messages: vec![ChatMessage::system(SYSTEM_ROLE), ChatMessage::user(build_prompt(intent_text, packs))],
        max_tokens: 1024,
    };

    let response = chat.chat(request).await.ok()?;

    let known_ids: std::collections::HashSet<&str> = packs.iter().map(|p| p.pack_id.as_str()).collect();
    let mut seen = std::collections::HashSet::new();
    let mut citations = Vec::new();
    for (index, capture) in citation_pattern().captures_iter(&response.content).enumerate() {
        let pack_id = capture[1].to_string();
        if known_ids.contains(pack_id.as_str()) && seen.insert(pack_id.clone()) {
            let relevance = (1.0 - index as f64 * 0.05).max(0.5);
            citations.push(Citation { pack_id, relevance, file: None });
        }
    }

    let confidence = if citations.is_empty() {
        0.0
    } else {
        packs.iter().map(|p| p.confidence).sum::<f64>() / packs.len() as f64
    };

    Some(Synthesis { answer: response.content, confidence, citations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::ports::EchoChatPort;

    fn pack(id: &str) -> ContextPack {
        ContextPack::new(id, "function_summary", "fn1", "does x")
    }

    #[tokio::test]
    async fn citations_outside_the_pack_set_are_dropped() {
        let packs = vec![pack("p1")];
        let chat = EchoChatPort;
        // EchoChatPort echoes the last user message, which embeds [p1] from
        // build_prompt and nothing else.
        let synthesis = synthesize(&chat, "what does it do", &packs).await.unwrap();
        assert_eq!(synthesis.citations.len(), 1);
        assert_eq!(synthesis.citations[0].pack_id, "p1");
    }

    #[tokio::test]
    async fn empty_pack_set_skips_synthesis_entirely() {
        let chat = EchoChatPort;
        assert!(synthesize(&chat, "anything", &[]).await.is_none());
    }

    #[tokio::test]
    async fn unavailable_chat_port_yields_no_synthesis() {
        use librarian_core::ports::UnavailableChatPort;
        let packs = vec![pack("p1")];
        let chat = UnavailableChatPort;
        assert!(synthesize(&chat, "anything", &packs).await.is_none());
    }
}
