//! Property tests for the formula and comparison layers.
//!
//! Covers the contracts that hold for all inputs rather than for picked
//! examples: name composition stays within AWS limits and keeps a valid
//! charset, budget thresholds never exceed the budget, scaled production
//! capacity strictly exceeds the test value, /16 networks with distinct
//! second octets never overlap, ordering rules agree with plain integer
//! comparison, extraction picks exactly the blocks of the requested type,
//! and locals merging is last-write-wins.

use proptest::prelude::*;

use crate::cidr::Cidr;
use crate::loader::parse_document;
use crate::naming::{
    bucket_name, compose_name, fits_limit, is_valid_name_component, production_scaled,
    threshold_amount, AwsNameKind,
};
use crate::rules::{eval_differential_rule, Comparison, DifferentialRule};
use crate::tfvars::TfVars;
use crate::types::{AttributeMap, Outcome, Value};

fn tfvars_with(key: &str, value: i64) -> TfVars {
    let mut map = AttributeMap::new();
    map.insert(key.to_string(), Value::Int(value));
    TfVars::new(map)
}

proptest! {
    #[test]
    fn composed_names_stay_valid_and_within_limits(
        project in "[a-z][a-z0-9]{0,8}",
        environment in prop_oneof![Just("test".to_string()), Just("production".to_string())],
        suffix in "[a-z][a-z0-9]{0,8}(-[a-z0-9]{1,4}){0,2}",
    ) {
        let name = compose_name(&project, &environment, &suffix);
        prop_assert!(is_valid_name_component(&name));
        prop_assert!(fits_limit(&name, AwsNameKind::LambdaFunction));
        prop_assert!(name.contains(&environment));
        prop_assert!(name.ends_with(&suffix));
    }

    #[test]
    fn bucket_names_fit_with_account_id(
        project in "[a-z][a-z0-9]{0,8}",
        environment in prop_oneof![Just("test".to_string()), Just("production".to_string())],
        purpose in "[a-z][a-z0-9]{0,8}",
        account_id in "[0-9]{12}",
    ) {
        let name = bucket_name(&project, &environment, &purpose, &account_id);
        prop_assert!(fits_limit(&name, AwsNameKind::S3Bucket));
        prop_assert!(name.ends_with(&account_id));
    }

    #[test]
    fn threshold_never_exceeds_budget(budget in 0u64..=1_000_000, percent in 0u8..=100) {
        let threshold = threshold_amount(budget, percent);
        prop_assert!(threshold >= 0.0);
        prop_assert!(threshold <= budget as f64);
    }

    #[test]
    fn scaled_production_exceeds_test(test in 1u64..=u32::MAX as u64, multiplier in 2u64..=100) {
        prop_assert!(production_scaled(test, multiplier) > test);
    }

    #[test]
    fn distinct_second_octets_never_overlap(a in 0u8..=255, b in 0u8..=255) {
        prop_assume!(a != b);
        let left: Cidr = format!("10.{a}.0.0/16").parse().unwrap();
        let right: Cidr = format!("10.{b}.0.0/16").parse().unwrap();
        prop_assert!(!left.overlaps(&right));
        prop_assert!(!right.overlaps(&left));
    }

    #[test]
    fn network_contains_all_its_hosts(octet in 0u8..=255, x in 0u8..=255, y in 0u8..=255) {
        let network: Cidr = format!("10.{octet}.0.0/16").parse().unwrap();
        let host = format!("10.{octet}.{x}.{y}");
        prop_assert!(network.contains(host.parse().unwrap()));
    }

    #[test]
    fn ordering_rule_agrees_with_integer_comparison(
        test in -1_000_000i64..=1_000_000,
        production in -1_000_000i64..=1_000_000,
    ) {
        let rule = DifferentialRule {
            id: "retention-ordering".to_string(),
            key: "log_retention_days".to_string(),
            other_key: None,
            cmp: Comparison::Lt,
            enforce: true,
        };
        let outcome = eval_differential_rule(
            &rule,
            &tfvars_with("log_retention_days", test),
            &tfvars_with("log_retention_days", production),
        );
        prop_assert_eq!(outcome == Outcome::Pass, test < production);
    }

    #[test]
    fn extraction_selects_exactly_the_requested_type(n in 0usize..6, m in 0usize..6) {
        let mut text = String::new();
        for i in 0..n {
            text.push_str(&format!(
                "resource \"aws_dynamodb_table\" \"t{i}\" {{\n  billing_mode = \"PAY_PER_REQUEST\"\n}}\n"
            ));
        }
        for j in 0..m {
            text.push_str(&format!(
                "resource \"aws_sns_topic\" \"o{j}\" {{\n  name = \"topic-{j}\"\n}}\n"
            ));
        }
        let document = parse_document(&text).unwrap();

        let tables = document.resources("aws_dynamodb_table");
        let topics = document.resources("aws_sns_topic");
        prop_assert_eq!(tables.len(), n);
        prop_assert_eq!(topics.len(), m);
        for i in 0..n {
            let name = format!("t{i}");
            prop_assert!(tables.contains_key(&name));
        }
        prop_assert!(topics.keys().all(|name| name.starts_with('o')));
        prop_assert!(document.resources("aws_lambda_function").is_empty());
    }

    #[test]
    fn locals_merge_is_last_write_wins(
        pairs in proptest::collection::vec(("[a-z][a-z0-9_]{0,5}", -1000i64..1000), 1..8),
    ) {
        let mut text = String::new();
        for (key, value) in &pairs {
            text.push_str(&format!("locals {{\n  {key} = {value}\n}}\n"));
        }
        let document = parse_document(&text).unwrap();
        let locals = document.locals();

        let mut expected = AttributeMap::new();
        for (key, value) in &pairs {
            expected.insert(key.clone(), Value::Int(*value));
        }
        prop_assert_eq!(locals, expected);
    }
}
