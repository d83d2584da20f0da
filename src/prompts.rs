use crate::rlm::Evidence;

/// Ask for a better-phrased answer built only on the extracted span.
pub fn refine(question: &str, extracted: &str) -> String {
    format!(
        r#"System: You are an AI assistant helping to refine answers extracted from a document.
Context snippet from document: {extracted}

Question: {question}

Based on the context snippet, provide a more comprehensive, natural, and well-phrased answer.
If the context doesn't contain enough info, just improve the phrasing of the existing answer.
Be concise but thorough."#
    )
}

/// Break a complex question into independent sub-questions, one per line.
pub fn decompose(question: &str) -> String {
    format!(
        r#"Break down this complex question into 2-4 simple, independent sub-questions that can be answered using a document.
Return ONLY the questions, one per line.

Complex Question: {question}"#
    )
}

/// Combine collected evidence into one answer, with no outside knowledge.
pub fn synthesize(question: &str, evidence: &[Evidence]) -> String {
    let evidence_text = evidence
        .iter()
        .map(|e| format!("Q: {}\nFound: {}", e.sub_question, e.found))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"System: Synthesize a comprehensive answer to the user's question based ONLY on the evidence provided below.

User Question: {question}

Evidence Collected:
{evidence_text}

Final Answer:"#
    )
}
