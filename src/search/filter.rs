/// Delimiter between category tokens in a raw filter parameter.
pub const CATEGORY_DELIMITER: char = ';';

/// Builds a conjunctive equality filter from a `;`-separated token list.
///
/// `build_filter("categories", "math;physics")` yields
/// `categories:math AND categories:physics`. Tokens are copied verbatim:
/// empty tokens are kept and nothing is escaped.
pub fn build_filter(field_name: &str, raw_value: &str) -> String {
    raw_value
        .split(CATEGORY_DELIMITER)
        .map(|token| format!("{}:{}", field_name, token))
        .collect::<Vec<_>>()
        .join(" AND ")
}
