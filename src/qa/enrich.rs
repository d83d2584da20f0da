use crate::config::ENRICH_MAX_WORDS;

/// Expand a short extracted span to the `.`-delimited sentence containing it.
///
/// Only `.` counts as a sentence boundary, so abbreviations and decimals
/// ("Dr.", "3.5") split sentences too. Answers that are empty, longer than
/// [`ENRICH_MAX_WORDS`] words, or not found verbatim come back unchanged.
pub fn enrich_answer(answer: &str, context: &str) -> String {
    if answer.is_empty() || answer.split_whitespace().count() > ENRICH_MAX_WORDS {
        return answer.to_string();
    }

    let Some(idx) = context.find(answer) else {
        return answer.to_string();
    };

    let start = context[..idx].rfind('.').map(|dot| dot + 1).unwrap_or(0);

    // Search from the last char of the match so a span that already ends
    // with its full stop keeps it.
    let last_char = answer.chars().next_back().map(char::len_utf8).unwrap_or(0);
    let search_from = idx + answer.len() - last_char;
    let end = context[search_from..]
        .find('.')
        .map(|dot| search_from + dot + 1)
        .unwrap_or(context.len());

    let enriched = context[start..end].trim();
    if enriched.chars().count() < answer.chars().count() {
        return answer.to_string();
    }
    enriched.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTEXT: &str =
        "The sky is blue. Paris is the capital of France. It has a population of 2 million.";

    #[test]
    fn expands_to_containing_sentence() {
        assert_eq!(enrich_answer("Paris", CONTEXT), "Paris is the capital of France.");
        assert_eq!(enrich_answer("2 million", CONTEXT), "It has a population of 2 million.");
    }

    #[test]
    fn first_sentence_starts_at_zero() {
        assert_eq!(enrich_answer("blue", CONTEXT), "The sky is blue.");
    }

    #[test]
    fn enriching_a_full_sentence_is_idempotent() {
        let once = enrich_answer("capital", CONTEXT);
        assert_eq!(once, "Paris is the capital of France.");
        assert_eq!(enrich_answer(&once, CONTEXT), once);
    }

    #[test]
    fn missing_answer_is_returned_unchanged() {
        assert_eq!(enrich_answer("Berlin", CONTEXT), "Berlin");
        assert_eq!(enrich_answer("", CONTEXT), "");
    }

    #[test]
    fn long_answers_are_left_alone() {
        let long = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen";
        let context = format!("Intro. {} and more.", long);
        assert_eq!(enrich_answer(long, &context), long);
    }

    #[test]
    fn no_trailing_period_runs_to_end_of_text() {
        assert_eq!(
            enrich_answer("Google", "Intro here. BERT was made by Google in 2018"),
            "BERT was made by Google in 2018"
        );
    }

    #[test]
    fn decimal_points_split_sentences() {
        // Known limitation of the `.`-only boundary rule.
        assert_eq!(enrich_answer("5 percent", "Growth was 3.5 percent last year."), "5 percent last year.");
    }
}
