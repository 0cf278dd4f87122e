//! `clawmeter doctor` — Diagnose configuration and compatibility.

use std::time::Duration;

use clawmeter_anthropic::compat::{MAX_TESTED_SDK, MIN_SUPPORTED_SDK, SupportLevel};
use clawmeter_anthropic::compatibility_info;
use clawmeter_config::{ResolvedConfig, user_config_path};

pub async fn run(sdk_version: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Clawmeter Doctor — Diagnostics");
    println!("=================================\n");

    let mut issues = 0;

    // Check config resolution
    let config = ResolvedConfig::load();
    if let Some(source) = config.key_source {
        println!("  ✅ API key configured (from {source})");
    } else {
        println!("  ❌ No API key — run `clawmeter setup`");
        issues += 1;
    }

    let user_path = user_config_path();
    if user_path.exists() {
        println!("  ✅ User config file exists: {}", user_path.display());
    } else {
        println!("  ⚠️  No user config file at {}", user_path.display());
    }

    // Check the usage API is reachable
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to create HTTP client");
    match http.get(format!("{}/health", config.api_url)).send().await {
        Ok(response) if response.status().is_success() => {
            println!("  ✅ Usage API reachable: {}", config.api_url);
        }
        Ok(response) => {
            println!(
                "  ⚠️  Usage API responded with {}: {}",
                response.status(),
                config.api_url
            );
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Usage API unreachable ({}): {e}", config.api_url);
            issues += 1;
        }
    }

    // Vendor SDK compatibility
    match sdk_version {
        Some(version) => {
            let info = compatibility_info(&version);
            match info.level {
                SupportLevel::Supported => {
                    println!("  ✅ Vendor SDK {version} is within the tested range");
                }
                SupportLevel::UntestedNewer => {
                    println!(
                        "  ⚠️  Vendor SDK {version} is newer than tested (max {})",
                        info.max_tested
                    );
                }
                SupportLevel::Unsupported => {
                    println!(
                        "  ❌ Vendor SDK {version} is unsupported (min {})",
                        info.min_supported
                    );
                    issues += 1;
                }
            }
        }
        None => {
            println!("  Tested vendor SDK range: {MIN_SUPPORTED_SDK} – {MAX_TESTED_SDK}");
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
