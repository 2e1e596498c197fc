use crate::model::Rule;

/// Order matched rules by ascending priority.
///
/// `sort_by_key` is stable, so rules with equal priority keep the order in
/// which they were matched.
pub fn schedule(mut matched: Vec<Rule>) -> Vec<Rule> {
    matched.sort_by_key(|rule| rule.priority);
    matched
}
