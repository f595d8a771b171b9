//! Property tests for spec §8's "Hash determinism" invariant: `hash(f)` is a
//! pure function of `f`'s canonicalization, and structurally equal facts
//! hash identically regardless of field insertion order.

use chronicle_facts::{Fact, Scalar};
use proptest::prelude::*;

fn arb_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        any::<String>().prop_map(Scalar::String),
        (-1.0e12..1.0e12f64).prop_map(Scalar::Number),
        any::<bool>().prop_map(Scalar::Bool),
    ]
}

proptest! {
    #[test]
    fn hash_is_deterministic_across_recomputation(
        fact_type in "[A-Za-z]{1,12}",
        field_name in "[a-z]{1,8}",
        value in arb_scalar(),
    ) {
        let fact = Fact::new(fact_type).with_field(field_name, value);
        let first = fact.hash().unwrap();
        let second = fact.hash().unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn field_order_does_not_affect_hash(
        fact_type in "[A-Za-z]{1,12}",
        a_name in "[a-z]{1,8}",
        a_value in arb_scalar(),
        b_name in "[a-z]{1,8}",
        b_value in arb_scalar(),
    ) {
        prop_assume!(a_name != b_name);

        let forward = Fact::new(fact_type.clone())
            .with_field(a_name.clone(), a_value.clone())
            .with_field(b_name.clone(), b_value.clone());
        let backward = Fact::new(fact_type)
            .with_field(b_name, b_value)
            .with_field(a_name, a_value);

        prop_assert_eq!(forward.hash().unwrap(), backward.hash().unwrap());
    }

    #[test]
    fn distinct_field_values_hash_differently(
        fact_type in "[A-Za-z]{1,12}",
        field_name in "[a-z]{1,8}",
        a in any::<String>(),
        b in any::<String>(),
    ) {
        prop_assume!(a != b);
        let fact_a = Fact::new(fact_type.clone()).with_field(field_name.clone(), a);
        let fact_b = Fact::new(fact_type).with_field(field_name, b);
        prop_assert_ne!(fact_a.hash().unwrap(), fact_b.hash().unwrap());
    }
}
