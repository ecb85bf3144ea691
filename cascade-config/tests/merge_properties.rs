//! Property tests for deep merging and asset-list sigils

use cascade_config::{resolve_asset_list, ConfigValue, Mapping};
use proptest::prelude::*;

fn scalar() -> impl Strategy<Value = ConfigValue> {
    prop_oneof![
        any::<bool>().prop_map(ConfigValue::Bool),
        any::<i64>().prop_map(ConfigValue::Integer),
        "[a-z]{0,6}".prop_map(ConfigValue::String),
    ]
}

/// A configuration file: categories of directives with scalar values.
///
/// Shapes agree at every path; a scalar replacing a collection and then a
/// collection merging over it is order-dependent.
fn config_file() -> impl Strategy<Value = ConfigValue> {
    let category = prop::collection::vec(("[a-c]", scalar()), 0..4)
        .prop_map(|pairs| ConfigValue::Mapping(pairs.into_iter().collect::<Mapping>()));
    prop::collection::vec(("[a-c]", category), 0..4)
        .prop_map(|pairs| ConfigValue::Mapping(pairs.into_iter().collect::<Mapping>()))
}

fn merged(mut base: ConfigValue, overlay: ConfigValue) -> ConfigValue {
    base.deep_merge(overlay);
    base
}

fn asset_name() -> impl Strategy<Value = String> {
    "[a-d]{1,3}"
}

proptest! {
    #[test]
    fn prop_merge_is_associative(a in config_file(), b in config_file(), c in config_file()) {
        let left = merged(merged(a.clone(), b.clone()), c.clone());
        let right = merged(a, merged(b, c));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_empty_mapping_overlay_is_identity(a in config_file()) {
        let result = merged(a.clone(), ConfigValue::Mapping(Mapping::new()));
        prop_assert_eq!(result, a);
    }

    #[test]
    fn prop_later_scalar_wins(a in config_file(), value in scalar()) {
        let mut category = Mapping::new();
        category.insert("key".to_string(), value.clone());
        let mut overlay = Mapping::new();
        overlay.insert("all".to_string(), ConfigValue::Mapping(category));

        let result = merged(a, ConfigValue::Mapping(overlay));
        prop_assert_eq!(result.get("all").and_then(|c| c.get("key")), Some(&value));
    }

    #[test]
    fn prop_null_keeps_collections(items in prop::collection::vec(scalar(), 0..5)) {
        let base = ConfigValue::Sequence(items);
        prop_assert_eq!(merged(base.clone(), ConfigValue::Null), base);
    }

    #[test]
    fn prop_sequences_concatenate(
        first in prop::collection::vec(scalar(), 0..5),
        second in prop::collection::vec(scalar(), 0..5),
    ) {
        let expected: Vec<ConfigValue> = first.iter().chain(second.iter()).cloned().collect();
        let result = merged(ConfigValue::Sequence(first), ConfigValue::Sequence(second));
        prop_assert_eq!(result, ConfigValue::Sequence(expected));
    }

    #[test]
    fn prop_clear_sigil_discards_earlier_entries(
        before in prop::collection::vec(asset_name(), 0..5),
        after in prop::collection::vec(asset_name(), 0..5),
    ) {
        let values: Vec<ConfigValue> = before
            .iter()
            .cloned()
            .chain(std::iter::once("-*".to_string()))
            .chain(after.iter().cloned())
            .map(ConfigValue::String)
            .collect();
        let names: Vec<String> = resolve_asset_list(&values).into_iter().map(|e| e.name).collect();
        prop_assert_eq!(names, after);
    }

    #[test]
    fn prop_removal_sigil_drops_every_match(
        names in prop::collection::vec(asset_name(), 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let removed = pick.get(&names).clone();
        let values: Vec<ConfigValue> = names
            .iter()
            .cloned()
            .chain(std::iter::once(format!("-{removed}")))
            .map(ConfigValue::String)
            .collect();
        let resolved = resolve_asset_list(&values);
        prop_assert!(resolved.iter().all(|e| e.name != removed));
        prop_assert_eq!(
            resolved.len(),
            names.iter().filter(|n| **n != removed).count()
        );
    }
}
