//! Parsing of synthesis output: structured gap findings and inline source
//! citations, both keyed to the labeled sources sent in the prompt.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::evidence::{CitationRef, Evidence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GapCategory {
    MethodologicalLimitation,
    UnexploredArea,
    ConflictingFinding,
}

impl std::fmt::Display for GapCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MethodologicalLimitation => "methodological limitation",
            Self::UnexploredArea => "unexplored area",
            Self::ConflictingFinding => "conflicting finding",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GapFinding {
    pub category: GapCategory,
    pub description: String,
    pub sources: Vec<CitationRef>,
}

static FINDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(LIMITATION|UNEXPLORED|CONFLICT):\s*(.+)$")
        .unwrap_or_else(|e| unreachable!("invalid finding regex: {e}"))
});

static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]").unwrap_or_else(|e| unreachable!("invalid bracket regex: {e}"))
});

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^S(\d+)$").unwrap_or_else(|e| unreachable!("invalid label regex: {e}"))
});

static TRAILING_CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\[[^\]]*\]\s*$")
        .unwrap_or_else(|e| unreachable!("invalid trailing citation regex: {e}"))
});

/// Extract marker-formatted gap findings from a synthesis response,
/// resolving `[S…]` tags against the labeled evidence. Lines without a
/// recognized marker are ignored; an unknown label is dropped with a
/// warning, not an error.
#[must_use]
pub fn parse_findings(raw: &str, evidence: &[Evidence]) -> Vec<GapFinding> {
    FINDING_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let category = match &caps[1] {
                "LIMITATION" => GapCategory::MethodologicalLimitation,
                "UNEXPLORED" => GapCategory::UnexploredArea,
                "CONFLICT" => GapCategory::ConflictingFinding,
                _ => return None,
            };
            let body = caps[2].trim();
            let description = TRAILING_CITATION_RE.replace(body, "").trim().to_owned();
            if description.is_empty() {
                return None;
            }
            Some(GapFinding {
                category,
                description,
                sources: extract_citations(body, evidence),
            })
        })
        .collect()
}

/// Map `[S1]` / `[S1, S3]` markers in a response to the evidence they
/// label. Order of first appearance, duplicates collapsed.
#[must_use]
pub fn extract_citations(text: &str, evidence: &[Evidence]) -> Vec<CitationRef> {
    let mut citations: Vec<CitationRef> = Vec::new();
    for group in BRACKET_RE.captures_iter(text) {
        for label in group[1].split(',') {
            let label = label.trim();
            let Some(caps) = LABEL_RE.captures(label) else {
                continue;
            };
            let Ok(number) = caps[1].parse::<usize>() else {
                continue;
            };
            let Some(ev) = number.checked_sub(1).and_then(|i| evidence.get(i)) else {
                tracing::warn!(label, "citation label out of range");
                continue;
            };
            let citation = ev.citation();
            if !citations.contains(&citation) {
                citations.push(citation);
            }
        }
    }
    citations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(document_id: &str, chunk_index: usize) -> Evidence {
        Evidence {
            document_id: document_id.into(),
            title: "T".into(),
            authors: vec![],
            year: None,
            chunk_index,
            text: "t".into(),
            score: 0.9,
        }
    }

    fn sources() -> Vec<Evidence> {
        vec![
            evidence("doc-1", 0),
            evidence("doc-1", 4),
            evidence("doc-2", 1),
        ]
    }

    #[test]
    fn parses_all_three_categories() {
        let raw = "LIMITATION: small sample sizes [S1]\n\
                   UNEXPLORED: longitudinal effects [S2]\n\
                   CONFLICT: accuracy results disagree [S1, S3]";
        let findings = parse_findings(raw, &sources());
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].category, GapCategory::MethodologicalLimitation);
        assert_eq!(findings[0].description, "small sample sizes");
        assert_eq!(findings[1].category, GapCategory::UnexploredArea);
        assert_eq!(findings[2].category, GapCategory::ConflictingFinding);
        assert_eq!(findings[2].sources.len(), 2);
        assert_eq!(findings[2].sources[1].document_id, "doc-2");
    }

    #[test]
    fn surrounding_prose_ignored() {
        let raw = "Here is my analysis of the literature.\n\n\
                   LIMITATION: no control groups [S2]\n\n\
                   I hope this helps.";
        let findings = parse_findings(raw, &sources());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].description, "no control groups");
        assert_eq!(findings[0].sources[0].chunk_index, 4);
    }

    #[test]
    fn unmarked_response_yields_nothing() {
        let findings = parse_findings("The literature looks complete to me.", &sources());
        assert!(findings.is_empty());
    }

    #[test]
    fn finding_without_citation_kept_with_empty_sources() {
        let findings = parse_findings("UNEXPLORED: cross-domain transfer", &sources());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].sources.is_empty());
    }

    #[test]
    fn out_of_range_label_dropped() {
        let findings = parse_findings("LIMITATION: something [S9]", &sources());
        assert_eq!(findings.len(), 1);
        assert!(findings[0].sources.is_empty());
    }

    #[test]
    fn citations_deduplicated_in_order() {
        let cites = extract_citations("see [S2] and [S1, S2]", &sources());
        assert_eq!(cites.len(), 2);
        assert_eq!(cites[0].chunk_index, 4);
        assert_eq!(cites[1].chunk_index, 0);
    }

    #[test]
    fn non_label_brackets_ignored() {
        let cites = extract_citations("as shown in [12] and [Smith 2020]", &sources());
        assert!(cites.is_empty());
    }

    #[test]
    fn no_markers_no_citations() {
        let cites = extract_citations("plain prose answer", &sources());
        assert!(cites.is_empty());
    }
}
