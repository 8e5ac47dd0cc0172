use crate::error::{ForgeError, Result};
use std::collections::BTreeMap;

/// Picks the next topic to ask about.
///
/// With recorded levels, the weakest topic wins unless it was the one just
/// asked, in which case the next weakest is used. Ties are broken by topic
/// name. A single known topic is returned even if it was just asked.
///
/// Without levels the fallback vocabulary is cycled by the number of topics
/// already asked.
pub fn select_next(
    levels: &BTreeMap<String, f64>,
    previous_topics: &[String],
    fallback_topics: &[String],
) -> Result<String> {
    if levels.is_empty() {
        if fallback_topics.is_empty() {
            return Err(ForgeError::NoTopicsAvailable);
        }
        let idx = previous_topics.len() % fallback_topics.len();
        return Ok(fallback_topics[idx].clone());
    }

    let mut ranked: Vec<(&String, f64)> = levels.iter().map(|(t, l)| (t, *l)).collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let last = previous_topics.last();
    let pick = ranked
        .iter()
        .find(|(topic, _)| Some(*topic) != last)
        .unwrap_or(&ranked[0]);

    Ok(pick.0.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(t, l)| (t.to_string(), *l)).collect()
    }

    fn topics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn skips_the_weakest_topic_when_it_was_just_asked() {
        let levels = levels(&[("leadership", 0.3), ("algorithms", 0.2)]);
        let next = select_next(&levels, &topics(&["algorithms"]), &[]).unwrap();
        assert_eq!(next, "leadership");
    }

    #[test]
    fn picks_the_weakest_topic() {
        let levels = levels(&[("leadership", 0.3), ("algorithms", 0.2), ("behavioral", 0.9)]);
        let next = select_next(&levels, &topics(&["leadership"]), &[]).unwrap();
        assert_eq!(next, "algorithms");
    }

    #[test]
    fn ties_break_by_topic_name() {
        let levels = levels(&[("system_design", 0.5), ("algorithms", 0.5), ("leadership", 0.5)]);
        assert_eq!(select_next(&levels, &[], &[]).unwrap(), "algorithms");
        assert_eq!(
            select_next(&levels, &topics(&["algorithms"]), &[]).unwrap(),
            "leadership"
        );
    }

    #[test]
    fn single_topic_is_repeated() {
        let levels = levels(&[("algorithms", 0.9)]);
        let next = select_next(&levels, &topics(&["algorithms"]), &[]).unwrap();
        assert_eq!(next, "algorithms");
    }

    #[test]
    fn never_repeats_the_last_topic_with_two_or_more_levels() {
        let levels = levels(&[("a", 0.1), ("b", 0.4), ("c", 0.4), ("d", 0.8)]);
        for last in ["a", "b", "c", "d"] {
            let next = select_next(&levels, &topics(&["d", last]), &[]).unwrap();
            assert_ne!(next, last);
            assert!(levels.contains_key(&next));
        }
    }

    #[test]
    fn cycles_fallback_topics_for_new_users() {
        let fallback = topics(&["A", "B", "C", "D"]);
        let previous = topics(&["x", "x", "x", "x", "x"]);
        let next = select_next(&BTreeMap::new(), &previous, &fallback).unwrap();
        assert_eq!(next, "B");
        assert_eq!(select_next(&BTreeMap::new(), &[], &fallback).unwrap(), "A");
    }

    #[test]
    fn fails_without_any_topics() {
        let result = select_next(&BTreeMap::new(), &topics(&["x"]), &[]);
        assert!(matches!(result, Err(ForgeError::NoTopicsAvailable)));
    }
}
