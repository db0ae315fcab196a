use mesosphere_core::paging::page;
use mesosphere_core::{Metadata, Where};
use proptest::prelude::*;
use serde_json::Value;

fn metadata_strategy() -> impl Strategy<Value = Metadata> {
    proptest::collection::hash_map(
        prop_oneof![Just("tag"), Just("age"), Just("score")],
        prop_oneof![
            (-50i64..50).prop_map(Value::from),
            prop_oneof![Just("a"), Just("b"), Just("c")].prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            Just(Value::Null),
        ],
        0..3,
    )
    .prop_map(|fields| fields.into_iter().collect())
}

fn leaf_strategy() -> impl Strategy<Value = Where> {
    prop_oneof![
        prop_oneof![Just("a"), Just("b")].prop_map(|v| Where::field("tag").eq(v)),
        (-50i64..50).prop_map(|v| Where::field("age").gt(v)),
        (-50i64..50).prop_map(|v| Where::field("age").lte(v)),
        Just(Where::field("score").ne(Value::Null)),
    ]
}

fn where_strategy() -> impl Strategy<Value = Where> {
    leaf_strategy().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Where::all),
            proptest::collection::vec(inner, 0..4).prop_map(Where::any),
        ]
    })
}

proptest! {
    #[test]
    fn test_page_is_a_contiguous_window(
        items in proptest::collection::vec(any::<u8>(), 0..40),
        limit in proptest::option::of(-5i64..50),
        offset in proptest::option::of(-5i64..50),
    ) {
        let out = page(&items, limit, offset);
        let start = offset.unwrap_or(0).max(0) as usize;

        if let Some(limit) = limit {
            prop_assert!(out.len() <= limit.max(0) as usize);
        }
        if start < items.len() {
            prop_assert_eq!(&out[..], &items[start..start + out.len()]);
        } else {
            prop_assert!(out.is_empty());
        }
        if limit.is_none() {
            prop_assert_eq!(out.len(), items.len().saturating_sub(start));
        }
    }

    #[test]
    fn test_filter_evaluation_is_deterministic(
        filter in where_strategy(),
        metadata in metadata_strategy(),
    ) {
        let first = filter.matches(Some(&metadata));
        prop_assert_eq!(first, filter.matches(Some(&metadata)));
        prop_assert_eq!(first, filter.clone().matches(Some(&metadata.clone())));
    }

    #[test]
    fn test_wire_form_preserves_meaning(
        filter in where_strategy(),
        metadata in metadata_strategy(),
    ) {
        let reparsed = Where::from_value(&filter.to_value()).unwrap();
        prop_assert_eq!(reparsed.matches(Some(&metadata)), filter.matches(Some(&metadata)));
    }

    #[test]
    fn test_single_child_logical_matches_child(
        filter in where_strategy(),
        metadata in metadata_strategy(),
    ) {
        let expected = filter.matches(Some(&metadata));
        prop_assert_eq!(Where::all(vec![filter.clone()]).matches(Some(&metadata)), expected);
        prop_assert_eq!(Where::any(vec![filter]).matches(Some(&metadata)), expected);
    }

    #[test]
    fn test_empty_logical_identities(metadata in metadata_strategy()) {
        prop_assert!(Where::all(vec![]).matches(Some(&metadata)));
        prop_assert!(!Where::any(vec![]).matches(Some(&metadata)));
    }
}
