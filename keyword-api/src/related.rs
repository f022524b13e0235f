/// Builds `"{seed} {suffix}"` candidates in suffix order, at most `max` of them.
pub fn candidates(seed: &str, suffixes: &[String], max: usize) -> Vec<String> {
    suffixes
        .iter()
        .take(max)
        .map(|suffix| format!("{seed} {suffix}"))
        .collect()
}
