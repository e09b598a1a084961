//! MQTT-style topic filters.

/// Returns `true` if `topic` matches the subscription `pattern`.
///
/// Levels are separated by `/`. `+` matches exactly one level, `#`
/// matches the remaining levels (including none), so `a/#` matches `a`.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_levels = pattern.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (pattern_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(p), Some(t)) if p == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
