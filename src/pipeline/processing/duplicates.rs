use std::collections::HashMap;

/// Find duplicate values within a single column.
///
/// Values are keyed by their trimmed, lower-cased form; blank values are
/// never duplicates of each other. Only groups with two or more occurrences
/// survive. Single pass over the input.
pub fn find_duplicates(values: &[String]) -> HashMap<String, Vec<usize>> {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();

    for (index, value) in values.iter().enumerate() {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            continue;
        }
        groups.entry(normalized).or_default().push(index);
    }

    groups.retain(|_, indices| indices.len() >= 2);
    groups
}
