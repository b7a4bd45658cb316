//! Property tests for the selector engine.

use offkit_selector::{collate, field_value, sort_rows, Selector, SortDirection};
use offkit_testkit::prelude::*;
use proptest::prelude::*;
use std::cmp::Ordering;

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn compiled_selector_agrees_with_reference(
        selector in selector_strategy(),
        docs in prop::collection::vec(document_strategy(), 1..8),
    ) {
        let compiled = Selector::parse(&selector).unwrap();
        for doc in &docs {
            prop_assert_eq!(
                compiled.matches(doc),
                reference_satisfy(&selector, doc),
                "selector {} on {}", selector, doc
            );
        }
    }

    #[test]
    fn ne_is_the_negation_of_eq(field in field_strategy(), operand in scalar_strategy(), doc in document_strategy()) {
        let eq = Selector::parse(&serde_json::json!({ field.clone(): { "$eq": operand.clone() } })).unwrap();
        let ne = Selector::parse(&serde_json::json!({ field: { "$ne": operand } })).unwrap();
        prop_assert_ne!(eq.matches(&doc), ne.matches(&doc));
    }

    #[test]
    fn sort_is_idempotent(
        mut rows in prop::collection::vec(document_strategy(), 0..12),
        criteria in sort_criteria_strategy(),
    ) {
        sort_rows(&mut rows, &criteria);
        let once = rows.clone();
        sort_rows(&mut rows, &criteria);
        prop_assert_eq!(rows, once);
    }

    #[test]
    fn sorted_rows_follow_the_first_criterion(
        mut rows in prop::collection::vec(document_strategy(), 0..12),
        criteria in sort_criteria_strategy(),
    ) {
        sort_rows(&mut rows, &criteria);
        let first = &criteria[0];
        for pair in rows.windows(2) {
            let ord = collate(field_value(&pair[0], &first.field), field_value(&pair[1], &first.field));
            let ord = match first.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            prop_assert_ne!(ord, Ordering::Greater);
        }
    }
}
