//! Property tests for the byte matcher algebra and sequence views.
//!
//! # Invariants
//! - A matcher's enumeration, cardinality, and predicate always agree.
//! - Inversion complements the matching set exactly.
//! - Sequence views obey the reverse/subsequence algebra without copying
//!   semantics into question.

use proptest::prelude::*;

use byteseek::matcher::bytes::ByteMatcher;
use byteseek::matcher::sequence::{ByteSequence, MatcherSequence};
use byteseek::SequenceMatcher;

/// Generates one arbitrary matcher from the closed variant set.
fn matcher_strategy() -> impl Strategy<Value = ByteMatcher> {
    prop_oneof![
        Just(ByteMatcher::Any),
        any::<u8>().prop_map(ByteMatcher::one),
        (any::<u8>(), any::<u8>(), any::<bool>())
            .prop_map(|(a, b, inv)| ByteMatcher::range(a, b, inv)),
        (proptest::collection::vec(any::<u8>(), 1..20), any::<bool>())
            .prop_map(|(bytes, inv)| ByteMatcher::set_of(&bytes, inv)),
        (any::<u8>(), any::<bool>()).prop_map(|(m, inv)| ByteMatcher::all_bitmask(m, inv)),
        (any::<u8>(), any::<bool>()).prop_map(|(m, inv)| ByteMatcher::any_bitmask(m, inv)),
        (any::<u8>(), any::<u8>(), any::<bool>())
            .prop_map(|(v, m, inv)| ByteMatcher::wild_bit_all(v, m, inv)),
        (any::<u8>(), any::<u8>(), any::<bool>())
            .prop_map(|(v, m, inv)| ByteMatcher::wild_bit_any(v, m, inv)),
    ]
}

proptest! {
    #[test]
    fn enumeration_cardinality_and_predicate_agree(matcher in matcher_strategy()) {
        let enumerated = matcher.matching_bytes();
        prop_assert_eq!(enumerated.len() as u32, matcher.num_matching_bytes());
        for b in 0..=255u8 {
            prop_assert_eq!(matcher.matches_byte(b), enumerated.binary_search(&b).is_ok());
        }
    }

    #[test]
    fn inversion_complements_the_set(matcher in matcher_strategy()) {
        let inverted = matcher.invert();
        prop_assert_eq!(
            matcher.num_matching_bytes() + inverted.num_matching_bytes(),
            256
        );
        for b in 0..=255u8 {
            prop_assert_ne!(matcher.matches_byte(b), inverted.matches_byte(b));
        }
    }

    #[test]
    fn range_argument_order_is_irrelevant(a in any::<u8>(), b in any::<u8>(), inv in any::<bool>()) {
        prop_assert_eq!(ByteMatcher::range(a, b, inv), ByteMatcher::range(b, a, inv));
    }

    #[test]
    fn sequence_matches_iff_every_position_matches(
        matchers in proptest::collection::vec(matcher_strategy(), 1..8),
        hay in proptest::collection::vec(any::<u8>(), 0..32),
        position in 0usize..32,
    ) {
        let sequence = MatcherSequence::new(matchers.clone());
        let expected = position + matchers.len() <= hay.len()
            && matchers
                .iter()
                .enumerate()
                .all(|(i, m)| m.matches_byte(hay[position + i]));
        prop_assert_eq!(sequence.matches(&hay, position), expected);
    }

    #[test]
    fn reverse_is_an_involution(bytes in proptest::collection::vec(any::<u8>(), 1..32)) {
        let sequence = ByteSequence::new(bytes);
        prop_assert_eq!(sequence.reverse().reverse(), sequence);
    }

    #[test]
    fn full_subsequence_is_identity(bytes in proptest::collection::vec(any::<u8>(), 1..32)) {
        let sequence = ByteSequence::new(bytes);
        prop_assert_eq!(sequence.subsequence(0, sequence.len()), sequence);
    }

    #[test]
    fn nested_subsequences_compose(
        bytes in proptest::collection::vec(any::<u8>(), 4..32),
        splits in any::<(usize, usize, usize, usize)>(),
    ) {
        let sequence = ByteSequence::new(bytes.clone());
        let n = bytes.len();
        // Derive a valid nested split from arbitrary input.
        let a = splits.0 % (n - 1);
        let b = a + 2 + splits.1 % (n - a - 1);
        let b = b.min(n);
        let inner_len = b - a;
        let c = splits.2 % inner_len;
        let d = c + 1 + splits.3 % (inner_len - c);
        let d = d.min(inner_len);

        prop_assert_eq!(
            sequence.subsequence(a, b).subsequence(c, d),
            sequence.subsequence(a + c, a + d)
        );
    }

    #[test]
    fn reversed_views_read_backwards(bytes in proptest::collection::vec(any::<u8>(), 1..32)) {
        let sequence = ByteSequence::new(bytes.clone());
        let reversed = sequence.reverse();
        for (i, &b) in bytes.iter().rev().enumerate() {
            prop_assert_eq!(reversed.byte_at(i), b);
        }
        let mut backwards: Vec<u8> = bytes;
        backwards.reverse();
        prop_assert!(reversed.matches(&backwards, 0));
    }
}
