/// Split a decomposition reply into sub-questions: one per non-empty line,
/// with list markers (`-`, `*`, `•`, `1.`, `2)`) and surrounding whitespace
/// removed.
pub fn sub_questions(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(strip_marker)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_marker(line: &str) -> &str {
    let line = line
        .trim()
        .trim_start_matches(['-', '*', '•'])
        .trim_start();

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(after) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            if after.is_empty() || after.starts_with(char::is_whitespace) {
                return after.trim();
            }
        }
    }
    line.trim_end()
}
