//! Naming-convention and threshold formulas.
//!
//! These pin down the contracts of the naming and alarm-threshold formulas
//! used across the infrastructure (`{project}-{environment}-{suffix}`,
//! budget thresholds, production scaling), independent of any specific file
//! content.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// AWS resource families with a published name length limit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AwsNameKind {
    LambdaFunction,
    S3Bucket,
    IamRole,
    SnsTopic,
    DynamodbTable,
    LogGroup,
    CloudwatchAlarm,
    CloudwatchDashboard,
}

impl AwsNameKind {
    /// The published maximum name length for this resource family.
    pub fn max_len(&self) -> usize {
        match self {
            AwsNameKind::LambdaFunction | AwsNameKind::IamRole => 64,
            AwsNameKind::S3Bucket => 63,
            AwsNameKind::SnsTopic => 256,
            AwsNameKind::CloudwatchAlarm
            | AwsNameKind::CloudwatchDashboard
            | AwsNameKind::DynamodbTable => 255,
            AwsNameKind::LogGroup => 512,
        }
    }
}

static NAME_COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").unwrap());

/// Whether a project/environment/suffix component is well-formed: lowercase
/// alphanumerics and single hyphens, no leading/trailing hyphen, no `--`.
pub fn is_valid_name_component(component: &str) -> bool {
    NAME_COMPONENT.is_match(component)
}

/// The shared resource naming formula: `{project}-{environment}-{suffix}`.
pub fn compose_name(project: &str, environment: &str, suffix: &str) -> String {
    format!("{project}-{environment}-{suffix}")
}

/// S3 bucket names additionally carry the 12-digit account id for global
/// uniqueness: `{project}-{environment}-{purpose}-{account_id}`.
pub fn bucket_name(project: &str, environment: &str, purpose: &str, account_id: &str) -> String {
    format!("{project}-{environment}-{purpose}-{account_id}")
}

/// Lambda log groups live under the fixed `/aws/lambda/` prefix.
pub fn log_group_name(function_name: &str) -> String {
    format!("/aws/lambda/{function_name}")
}

/// Whether a composed name fits the resource family's published limit.
pub fn fits_limit(name: &str, kind: AwsNameKind) -> bool {
    name.len() <= kind.max_len()
}

/// Budget alert threshold: `budget * percent / 100`.
///
/// For any budget >= 0 and percent in 0..=100, the result is between 0 and
/// the budget amount.
pub fn threshold_amount(budget: u64, percent: u8) -> f64 {
    budget as f64 * f64::from(percent) / 100.0
}

/// Production capacity derived from the test value by a scaling multiplier.
///
/// Saturating: with multiplier >= 2 and 0 < test <= u64::MAX / multiplier,
/// the result is strictly greater than the test value; past that bound it
/// pins at `u64::MAX`.
pub fn production_scaled(test: u64, multiplier: u64) -> u64 {
    test.saturating_mul(multiplier)
}
