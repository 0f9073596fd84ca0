//! Deterministic event sampling.

use rand::Rng;
use rand_pcg::Pcg32;
use uuid::Uuid;

/// Decides whether an event is kept at the given sample rate.
///
/// `rate` is a percentage from 0 to 100. When a stable identifier is
/// present, the decision is deterministic: the identifier is hashed into a
/// UUID whose bits seed the random number generator, so the same identifier
/// always yields the same decision at a given rate. Events without a stable
/// identifier are decided by an independent draw.
pub fn is_sampled(stable_id: Option<&str>, rate: u32) -> bool {
    if rate == 0 {
        return false;
    }
    if rate >= 100 {
        return true;
    }

    let roll = match stable_id {
        Some(id) => pseudo_random_from_uuid(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes())),
        None => rand::random(),
    };

    if roll >= f64::from(rate) / 100.0 {
        beacon_log::trace!(
            "dropping event at sample rate {rate} (roll {roll}, id {stable_id:?})"
        );
        false
    } else {
        beacon_log::trace!("keeping event at sample rate {rate} (roll {roll}, id {stable_id:?})");
        true
    }
}

/// Maps an id to a number in `[0, 1)`.
///
/// The generator is seeded from the id's bits, so the same id always maps
/// to the same number.
fn pseudo_random_from_uuid(id: Uuid) -> f64 {
    let seed = id.as_u128();
    let mut generator = Pcg32::new((seed >> 64) as u64, seed as u64);
    generator.random()
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_repeatable_seed() {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, b"req-42");
        assert_eq!(pseudo_random_from_uuid(id), pseudo_random_from_uuid(id));
    }

    #[test]
    fn test_roll_within_unit_interval() {
        for id in ["a", "b", "request-123", ""] {
            let roll = pseudo_random_from_uuid(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()));
            assert!((0.0..1.0).contains(&roll), "roll {roll} for id {id:?}");
        }
    }

    #[test]
    fn test_decision_is_deterministic() {
        for rate in [1, 25, 50, 75, 99] {
            let first = is_sampled(Some("X"), rate);
            for _ in 0..4 {
                assert_eq!(is_sampled(Some("X"), rate), first);
            }
        }
    }

    #[test]
    fn test_rate_zero_drops_everything() {
        assert!(!is_sampled(Some("X"), 0));
        assert!(!is_sampled(None, 0));
    }

    #[test]
    fn test_rate_hundred_keeps_everything() {
        assert!(is_sampled(Some("X"), 100));
        assert!(is_sampled(None, 100));
    }

    #[test]
    fn test_distinct_ids_disagree_eventually() {
        // With a 50% rate, 64 distinct ids settling on the same decision
        // would mean the hash is degenerate.
        let decisions: Vec<bool> = (0..64)
            .map(|i| is_sampled(Some(&format!("request-{i}")), 50))
            .collect();

        assert!(decisions.iter().any(|&kept| kept));
        assert!(decisions.iter().any(|&kept| !kept));
    }
}
