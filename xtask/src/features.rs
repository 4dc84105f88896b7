use std::process::Command;

use anyhow::{Context, Result};

/// Feature sets of `metricsink-common` that downstream crates rely on
const COMMON_FEATURE_SETS: &[&[&str]] = &[
    &[], // default
    &["foundation"],
    &["observability"],
    &["runtime"],
    &["test-utils"],
];

/// Check that every `metricsink-common` feature tier compiles on its own.
pub fn test_feature_matrix() -> Result<()> {
    println!("Checking {} metricsink-common feature sets...", COMMON_FEATURE_SETS.len());

    for (index, features) in COMMON_FEATURE_SETS.iter().enumerate() {
        let label = if features.is_empty() { "default".to_string() } else { features.join(",") };

        println!(
            "\n[{}/{}] cargo check -p metricsink-common ({label})",
            index + 1,
            COMMON_FEATURE_SETS.len()
        );

        let mut command = Command::new("cargo");
        command.args(["check", "-p", "metricsink-common", "--all-targets"]);
        if !features.is_empty() {
            command.arg("--features").arg(features.join(","));
        }

        let status =
            command.status().with_context(|| format!("Failed to run cargo check for '{label}'"))?;
        if !status.success() {
            anyhow::bail!("Feature set '{label}' failed to compile");
        }
    }

    println!("\n✓ All {} feature sets compile", COMMON_FEATURE_SETS.len());
    Ok(())
}
