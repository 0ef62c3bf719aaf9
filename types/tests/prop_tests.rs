use proptest::prelude::*;

use fundrelay_types::amount::UNIT;
use fundrelay_types::{Address, Amount, Timestamp};

proptest! {
    /// Address text roundtrip: display -> parse yields the same bytes.
    #[test]
    fn address_text_roundtrip(bytes in prop::array::uniform20(0u8..)) {
        let addr = Address::new(bytes);
        let parsed: Address = addr.to_string().parse().unwrap();
        prop_assert_eq!(parsed, addr);
    }

    /// Amount display -> parse is lossless for every raw value.
    #[test]
    fn amount_display_parse_lossless(raw in any::<u128>()) {
        let amount = Amount::from_raw(raw);
        let parsed: Amount = amount.to_string().parse().unwrap();
        prop_assert_eq!(parsed, amount);
    }

    /// Whole-token constructor matches the decimal parser.
    #[test]
    fn whole_matches_parser(tokens in 0u64..1_000_000_000) {
        let parsed: Amount = tokens.to_string().parse().unwrap();
        prop_assert_eq!(parsed, Amount::whole(tokens));
        prop_assert_eq!(parsed.raw(), tokens as u128 * UNIT);
    }

    /// Amount ordering follows raw ordering.
    #[test]
    fn amount_ordering(a in any::<u128>(), b in any::<u128>()) {
        prop_assert_eq!(Amount::from_raw(a) <= Amount::from_raw(b), a <= b);
    }

    /// checked_add agrees with u128::checked_add.
    #[test]
    fn amount_checked_add(a in any::<u128>(), b in any::<u128>()) {
        let sum = Amount::from_raw(a).checked_add(Amount::from_raw(b));
        prop_assert_eq!(sum.map(|s| s.raw()), a.checked_add(b));
    }

    /// has_expired and remaining agree: expired iff nothing remains.
    #[test]
    fn expiry_and_remaining_agree(start in 0u64..1_000_000, dur in 0u64..100_000, now in 0u64..2_000_000) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(now);
        prop_assert_eq!(t.has_expired(dur, now), t.remaining(dur, now) == 0);
    }

    /// Strictly older than a window means expired one second past it.
    #[test]
    fn older_than_is_expiry_shifted_by_one(start in 0u64..1_000_000, dur in 0u64..100_000, now in 0u64..2_000_000) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(now);
        prop_assert_eq!(t.is_older_than(dur, now), t.has_expired(dur + 1, now));
    }
}
