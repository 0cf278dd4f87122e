//! `clawmeter status` — Show the resolved configuration.

use clawmeter_config::{ResolvedConfig, user_config_path};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ResolvedConfig::load();

    println!("🦀 Clawmeter Status");
    println!("===================");
    println!("  Config file:  {}", user_config_path().display());
    println!("  API URL:      {}", config.api_url);

    match (&config.api_key, config.key_source) {
        (Some(key), Some(source)) => {
            println!("  API key:      {} (from {})", redact_key(key), source);
            println!("\n  ✅ Tracking is configured");
        }
        _ => {
            println!("  API key:      not set");
            println!("\n  ⚠️  No API key — run `clawmeter setup` first");
        }
    }

    Ok(())
}

/// Show just enough of the key to recognize it. Counts characters, not
/// bytes, so a multibyte key cannot split a char boundary.
fn redact_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        "****".to_string()
    } else {
        let prefix: String = chars[..4].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{prefix}…{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_keys_are_fully_masked() {
        assert_eq!(redact_key("abc"), "****");
        assert_eq!(redact_key("12345678"), "****");
    }

    #[test]
    fn long_keys_show_prefix_and_suffix() {
        let shown = redact_key("cm-live-0123456789abcdef");
        assert!(shown.starts_with("cm-l"));
        assert!(shown.ends_with("cdef"));
        assert!(!shown.contains("0123456789"));
    }

    #[test]
    fn multibyte_keys_do_not_panic() {
        let shown = redact_key("ключ-живой-0123456789");
        assert!(shown.starts_with("ключ"));
        assert!(shown.ends_with("6789"));
        assert_eq!(redact_key("ключ"), "****");
    }
}
