use verbo_srs::{ItemId, Mood, Tense, TopicKey};

use crate::error::ApiError;

pub const MAX_ITEM_ID_LEN: usize = 128;
pub const MAX_VERB_LEN: usize = 64;
/// Most candidate items one due-set request may offer.
pub const MAX_CANDIDATES: usize = 500;

/// Validate an item id taken from a path or query
///
/// # Examples
/// ```
/// use verbo_api::validation::validate_item_id;
///
/// assert!(validate_item_id("hablar:preterite:1s").is_ok());
/// assert!(validate_item_id("").is_err());
/// ```
pub fn validate_item_id(id: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::Validation("Item id cannot be empty".to_string()));
    }
    if id.chars().count() > MAX_ITEM_ID_LEN {
        return Err(ApiError::Validation(format!(
            "Item id is longer than {MAX_ITEM_ID_LEN} characters"
        )));
    }
    if id.chars().any(char::is_control) {
        return Err(ApiError::Validation(
            "Item id cannot contain control characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_verb(verb: &str) -> Result<(), ApiError> {
    if verb.trim().is_empty() || verb.chars().count() > MAX_VERB_LEN {
        return Err(ApiError::Validation(format!(
            "Verb must be 1 to {MAX_VERB_LEN} characters"
        )));
    }
    if verb.contains('/') {
        return Err(ApiError::Validation("Verb cannot contain '/'".to_string()));
    }
    Ok(())
}

/// Parse a topic from its path segments, e.g. `ser`, `present`, `indicative`.
pub fn parse_topic(verb: &str, tense: &str, mood: &str) -> Result<TopicKey, ApiError> {
    validate_verb(verb)?;
    let tense = tense
        .parse::<Tense>()
        .map_err(|err| ApiError::Validation(err.to_string()))?;
    let mood = mood
        .parse::<Mood>()
        .map_err(|err| ApiError::Validation(err.to_string()))?;
    Ok(TopicKey::new(verb, tense, mood))
}

/// Parse a comma separated list of candidate item ids. Empty entries are skipped.
pub fn parse_candidates(raw: &str) -> Result<Vec<ItemId>, ApiError> {
    let ids: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();

    if ids.len() > MAX_CANDIDATES {
        return Err(ApiError::Validation(format!(
            "At most {MAX_CANDIDATES} candidates per request"
        )));
    }

    ids.into_iter()
        .map(|id| validate_item_id(id).map(|()| ItemId::from(id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_item_id() {
        assert!(validate_item_id("ser:present:1s").is_ok());
        assert!(validate_item_id("  ").is_err());
        assert!(validate_item_id(&"x".repeat(MAX_ITEM_ID_LEN + 1)).is_err());
        assert!(validate_item_id("a\u{0}b").is_err());
    }

    #[test]
    fn test_parse_topic() {
        let topic = parse_topic("ir", "conditional_perfect", "indicative").unwrap();
        assert_eq!(topic.tense, Tense::ConditionalPerfect);
        assert_eq!(topic.mood, Mood::Indicative);

        assert!(parse_topic("ir", "pluperfect", "indicative").is_err());
        assert!(parse_topic("ir", "present", "optative").is_err());
        assert!(parse_topic("", "present", "indicative").is_err());
        assert!(parse_topic("a/b", "present", "indicative").is_err());
    }

    #[test]
    fn test_parse_candidates() {
        let ids = parse_candidates("b, a,,c ").unwrap();
        assert_eq!(ids, vec![ItemId::from("b"), ItemId::from("a"), ItemId::from("c")]);

        assert!(parse_candidates("").unwrap().is_empty());

        let too_many = vec!["x"; MAX_CANDIDATES + 1].join(",");
        assert!(parse_candidates(&too_many).is_err());
    }
}
