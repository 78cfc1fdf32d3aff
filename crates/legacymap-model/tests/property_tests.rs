//! Property tests for id derivation and confidence handling.

use legacymap_model::*;
use proptest::prelude::*;

fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,8}", 0..5).prop_map(|segments| segments.join("/"))
}

fn verb_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GET".to_string()),
        Just("POST".to_string()),
        Just("PUT".to_string()),
        Just("DELETE".to_string()),
    ]
}

proptest! {
    #[test]
    fn route_id_is_pure(path in path_strategy(), verb in verb_strategy()) {
        prop_assert_eq!(route_id(&path, &verb), route_id(&path, &verb));
    }

    #[test]
    fn route_id_ignores_slash_noise(path in path_strategy(), verb in verb_strategy()) {
        let noisy = format!("//{}/", path.replace('/', "//"));
        prop_assert_eq!(route_id(&noisy, &verb), route_id(&path, &verb));
    }

    #[test]
    fn normalization_is_idempotent(path in path_strategy()) {
        let once = normalize_path(&path);
        prop_assert_eq!(normalize_path(&once), once);
    }

    #[test]
    fn confidence_always_in_unit_interval(value in proptest::num::f64::ANY) {
        let c = Confidence::new(value).value();
        prop_assert!((0.0..=1.0).contains(&c));
    }

    #[test]
    fn slug_never_contains_separators(s in ".{0,40}") {
        let slugged = slug(&s);
        prop_assert!(slugged.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }
}
