use rand::Rng;
use uuid::Uuid;

/// Random bytes behind every shop order id (80 bits).
const SUFFIX_BYTES: usize = 10;

/// Generate a shop order id: `crs-{course fragment}-{random suffix}`.
///
/// The course fragment keeps ids traceable in gateway back-offices; the
/// suffix alone carries the uniqueness.
pub fn generate(course_id: Uuid) -> String {
    let mut suffix = [0u8; SUFFIX_BYTES];
    rand::rng().fill(&mut suffix);
    let course = course_id.simple().to_string();
    format!(
        "crs-{}-{}",
        &course[..8],
        fast32::base32::CROCKFORD.encode(&suffix).to_ascii_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_format() {
        let course = Uuid::parse_str("0d5c2e8a-4f1b-4c8e-9a7d-1234567890ab").unwrap();
        let id = generate(course);
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "crs");
        assert_eq!(parts[1], "0d5c2e8a");
        assert_eq!(parts[2].len(), 16);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_ids_do_not_repeat() {
        let course = Uuid::new_v4();
        let ids: HashSet<String> = (0..10_000).map(|_| generate(course)).collect();
        assert_eq!(ids.len(), 10_000);
    }
}
