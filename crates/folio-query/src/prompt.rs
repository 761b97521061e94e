//! Prompt assembly: labeled source context plus the instructions that make
//! synthesis output machine-parseable.

use std::fmt::Write as _;

use folio_llm::provider::Message;

use crate::evidence::Evidence;

#[must_use]
pub fn source_label(index: usize) -> String {
    format!("S{}", index + 1)
}

/// Render evidence as labeled sources the model can cite back.
#[must_use]
pub fn build_context(evidence: &[Evidence]) -> String {
    let mut out = String::new();
    for (i, ev) in evidence.iter().enumerate() {
        let title = if ev.title.is_empty() {
            "untitled"
        } else {
            ev.title.as_str()
        };
        let _ = write!(out, "Source {} ({title}", source_label(i));
        if !ev.authors.is_empty() {
            let _ = write!(out, "; {}", ev.authors.join(", "));
        }
        if let Some(year) = ev.year {
            let _ = write!(out, "; {year}");
        }
        let _ = writeln!(out, "; chunk {}):", ev.chunk_index);
        let _ = writeln!(out, "{}", ev.text);
        out.push('\n');
    }
    out
}

#[must_use]
pub fn gap_messages(topic: &str, context: &str) -> Vec<Message> {
    let system = "You are a research analyst expert in identifying research gaps \
        in scientific literature. Ground every claim in the provided sources.";
    let user = format!(
        "Analyze the following excerpts from the literature on \"{topic}\" and \
         identify research gaps: methodological limitations, unexplored areas, \
         and conflicting findings.\n\n\
         {context}\
         Report each gap on its own line, in exactly one of these forms:\n\
         LIMITATION: <description> [S1, S3]\n\
         UNEXPLORED: <description> [S2]\n\
         CONFLICT: <description> [S1, S4]\n\
         Cite the supporting sources for every gap using their labels. Do not \
         invent sources."
    );
    vec![Message::system(system), Message::user(user)]
}

/// Build the chat request: system prompt, prior turns, then the cited
/// question. With no evidence the request says so instead of fabricating
/// sources.
#[must_use]
pub fn chat_messages(question: &str, evidence: &[Evidence], history: &[Message]) -> Vec<Message> {
    let system = "You are a research assistant answering questions about a \
        literature collection. Answer strictly from the provided sources and \
        cite them inline with their labels, like [S1] or [S2, S3]. If the \
        sources do not answer the question, say so.";

    let user = if evidence.is_empty() {
        format!(
            "No supporting evidence was found in the collection for this \
             question. Say that the collection does not cover it; do not \
             invent sources.\n\nQuestion: {question}"
        )
    } else {
        format!(
            "Sources:\n\n{}Question: {question}",
            build_context(evidence)
        )
    };

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system));
    messages.extend_from_slice(history);
    messages.push(Message::user(user));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(label_hint: &str) -> Evidence {
        Evidence {
            document_id: "doc-1".into(),
            title: format!("Title {label_hint}"),
            authors: vec!["Jane Doe".into()],
            year: Some(2021),
            chunk_index: 0,
            text: format!("text {label_hint}"),
            score: 0.9,
        }
    }

    #[test]
    fn labels_are_one_based() {
        assert_eq!(source_label(0), "S1");
        assert_eq!(source_label(9), "S10");
    }

    #[test]
    fn context_lists_sources_in_order() {
        let ctx = build_context(&[evidence("a"), evidence("b")]);
        let a = ctx.find("Source S1 (Title a; Jane Doe; 2021; chunk 0):").unwrap();
        let b = ctx.find("Source S2 (Title b; Jane Doe; 2021; chunk 0):").unwrap();
        assert!(a < b);
        assert!(ctx.contains("text a"));
    }

    #[test]
    fn context_handles_sparse_metadata() {
        let ev = Evidence {
            document_id: "doc-1".into(),
            title: String::new(),
            authors: vec![],
            year: None,
            chunk_index: 3,
            text: "body".into(),
            score: 0.5,
        };
        let ctx = build_context(&[ev]);
        assert!(ctx.contains("Source S1 (untitled; chunk 3):"));
    }

    #[test]
    fn gap_messages_carry_marker_instructions() {
        let messages = gap_messages("protein folding", "Source S1 (t; chunk 0):\nx\n\n");
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("LIMITATION:"));
        assert!(messages[1].content.contains("protein folding"));
    }

    #[test]
    fn chat_messages_without_evidence_state_absence() {
        let messages = chat_messages("what about X?", &[], &[]);
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("No supporting evidence"));
    }

    #[test]
    fn chat_messages_splice_history_before_question() {
        let history = vec![Message::user("earlier q"), Message::assistant("earlier a")];
        let messages = chat_messages("follow-up?", &[evidence("a")], &history);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "earlier q");
        assert!(messages[3].content.contains("follow-up?"));
    }
}
