// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Property-based tests for plan handling.

use proptest::prelude::*;
use statebridge_conformance::config::substitute_env;
use statebridge_conformance::steps::{matches_expected, value_bytes};

proptest! {
    /// Text without `${{` is never altered.
    #[test]
    fn substitute_env_leaves_plain_text(s in "[a-zA-Z0-9 _./:-]{0,40}") {
        prop_assert_eq!(substitute_env(&s, |_| None).unwrap(), s);
    }

    /// Every reference is replaced by its value.
    #[test]
    fn substitute_env_replaces_reference(
        prefix in "[a-z]{0,8}",
        name in "[A-Z][A-Z0-9_]{0,10}",
        value in "[a-z0-9]{0,12}",
    ) {
        let input = format!("{}${{{{{}}}}}", prefix, name);
        let out = substitute_env(&input, |n| (n == name).then(|| value.clone())).unwrap();
        prop_assert_eq!(out, format!("{}{}", prefix, value));
    }

    /// A value written by a step always matches itself when read back.
    #[test]
    fn step_values_match_themselves(n in any::<i64>(), s in "[a-z ]{0,20}") {
        let mapping: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(&format!("{{ n: {}, s: \"{}\" }}", n, s)).unwrap();
        let bytes = value_bytes(&mapping).unwrap();
        prop_assert!(matches_expected(&mapping, &bytes).is_ok());

        let text = serde_yaml_ng::Value::String(s.clone());
        prop_assert_eq!(value_bytes(&text).unwrap(), s.as_bytes().to_vec());
    }
}
