//! `clawmeter setup` — Interactive account setup wizard.
//!
//! Registers (or logs into) a Clawmeter account, provisions an SDK API key,
//! and writes it to `~/.clawmeter/config.toml`.

use dialoguer::{Confirm, Input, Password, Select};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use clawmeter_config::{
    DEFAULT_API_URL, ENV_API_URL, FileConfig, save_user_config, user_config_path,
};

const DASHBOARD_URL: &str = "https://app.clawmeter.dev";
const LOCAL_API_URL: &str = "http://127.0.0.1:8000";

#[derive(Deserialize)]
struct AuthResponse {
    access_token: String,
    #[serde(default)]
    user: Option<UserInfo>,
}

#[derive(Deserialize)]
struct UserInfo {
    email: Option<String>,
}

#[derive(Deserialize)]
struct ApiKeyList {
    #[serde(default)]
    api_keys: Vec<ApiKeyInfo>,
}

#[derive(Deserialize)]
struct ApiKeyInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_active: bool,
}

#[derive(Deserialize)]
struct CreatedKey {
    key: String,
}

pub async fn run(local: bool) -> Result<(), Box<dyn std::error::Error>> {
    let api_url = if local {
        println!("  Using local server: {LOCAL_API_URL}");
        LOCAL_API_URL.to_string()
    } else {
        std::env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string())
    };

    println!("🦀 Clawmeter — Setup");
    println!("====================");
    println!("Track every AI call with per-customer usage records.\n");

    // Offer to keep an existing configuration
    let existing = clawmeter_config::ResolvedConfig::load();
    if existing.is_configured() {
        println!("  Existing configuration found ({})", user_config_path().display());
        let keep = Confirm::new()
            .with_prompt("Use existing configuration?")
            .default(true)
            .interact()?;
        if keep {
            println!("\n🎉 Keeping existing configuration.");
            return Ok(());
        }
    }

    let choice = Select::new()
        .with_prompt("Choose an option")
        .items(&[
            "Create new account (recommended)",
            "Login with existing account",
            "Enter API key manually",
            "Skip setup",
        ])
        .default(0)
        .interact()?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client");

    let (api_key, email) = match choice {
        0 => {
            let Some(auth) = register(&http, &api_url).await? else {
                println!("\n❌ Setup failed. Please try again.");
                return Ok(());
            };
            let Some(key) = provision_key(&http, &api_url, &auth.access_token).await? else {
                println!("\n❌ Setup failed. Please try again.");
                return Ok(());
            };
            (key, auth.user.and_then(|u| u.email))
        }
        1 => {
            let Some(auth) = login(&http, &api_url).await? else {
                println!("\n❌ Setup failed. Please try again.");
                return Ok(());
            };
            let Some(key) = provision_key(&http, &api_url, &auth.access_token).await? else {
                println!("\n❌ Setup failed. Please try again.");
                return Ok(());
            };
            (key, auth.user.and_then(|u| u.email))
        }
        2 => {
            let key: String = Input::new()
                .with_prompt("Enter your Clawmeter API key")
                .interact_text()?;
            if key.trim().is_empty() {
                println!("\n❌ Setup failed. Please try again.");
                return Ok(());
            }
            (key.trim().to_string(), None)
        }
        _ => {
            println!("\n  Setup skipped. You can run this again anytime.");
            return Ok(());
        }
    };

    let config = FileConfig {
        api_key: Some(api_key),
        api_url: Some(api_url),
        email,
    };
    let path = save_user_config(&config)?;

    println!("\n====================");
    println!("✅ Clawmeter is configured");
    println!("   Config:    {}", path.display());
    println!("   Dashboard: {DASHBOARD_URL}");
    println!("\n🎉 Setup complete! Wrap your client with TrackedAnthropic to start tracking.\n");

    Ok(())
}

/// Create a new account, then log in for an access token.
async fn register(
    http: &reqwest::Client,
    api_url: &str,
) -> Result<Option<AuthResponse>, Box<dyn std::error::Error>> {
    println!("\n=== Account Registration ===");

    let email: String = Input::new().with_prompt("Email address").interact_text()?;
    let name: String = Input::new().with_prompt("Your name").interact_text()?;
    let password = Password::new()
        .with_prompt("Password (min 8 chars)")
        .with_confirmation("Confirm password", "Passwords don't match")
        .validate_with(|p: &String| {
            if p.len() >= 8 {
                Ok(())
            } else {
                Err("Password must be at least 8 characters")
            }
        })
        .interact()?;

    let response = http
        .post(format!("{api_url}/auth/register"))
        .json(&serde_json::json!({
            "email": email,
            "password": password,
            "name": name,
        }))
        .send()
        .await;

    let response = match response {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Registration request failed");
            println!("\n❌ Network error: {e}");
            return Ok(None);
        }
    };

    if response.status() == reqwest::StatusCode::BAD_REQUEST {
        let body = response.text().await.unwrap_or_default();
        if body.contains("already exists") {
            println!("\n  Account already exists. Please login instead.");
            return Ok(None);
        }
        println!("\n❌ Registration failed: {body}");
        return Ok(None);
    }
    if !response.status().is_success() {
        println!(
            "\n❌ Registration failed: {}",
            response.text().await.unwrap_or_default()
        );
        return Ok(None);
    }

    println!("\n✅ Account created successfully!");

    // Log in to obtain an access token
    let login_response = http
        .post(format!("{api_url}/auth/login"))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await;

    match login_response {
        Ok(r) if r.status().is_success() => Ok(Some(r.json().await?)),
        Ok(r) => {
            println!(
                "\n❌ Login failed after registration: {}",
                r.text().await.unwrap_or_default()
            );
            Ok(None)
        }
        Err(e) => {
            warn!(error = %e, "Login request failed after registration");
            println!("\n❌ Network error: {e}");
            Ok(None)
        }
    }
}

/// Log in with an existing account.
async fn login(
    http: &reqwest::Client,
    api_url: &str,
) -> Result<Option<AuthResponse>, Box<dyn std::error::Error>> {
    println!("\n=== Login ===");

    let email: String = Input::new().with_prompt("Email address").interact_text()?;
    let password = Password::new().with_prompt("Password").interact()?;

    let response = http
        .post(format!("{api_url}/auth/login"))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await;

    match response {
        Ok(r) if r.status().is_success() => {
            println!("\n✅ Logged in successfully!");
            Ok(Some(r.json().await?))
        }
        Ok(_) => {
            println!("\n❌ Login failed: invalid credentials");
            Ok(None)
        }
        Err(e) => {
            warn!(error = %e, "Login request failed");
            println!("\n❌ Network error: {e}");
            Ok(None)
        }
    }
}

/// Create an SDK API key, or fall back to manual entry when one already
/// exists (the raw key cannot be retrieved again).
async fn provision_key(
    http: &reqwest::Client,
    api_url: &str,
    access_token: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    // Check for an existing active SDK key first
    let existing = match http
        .get(format!("{api_url}/user/api-keys"))
        .bearer_auth(access_token)
        .send()
        .await
    {
        Ok(r) => Some(r),
        Err(e) => {
            warn!(error = %e, "Could not list existing API keys, creating a new one");
            None
        }
    };

    if let Some(response) = existing
        && response.status().is_success()
        && let Ok(list) = response.json::<ApiKeyList>().await
        && list
            .api_keys
            .iter()
            .any(|k| k.is_active && k.name.contains("SDK"))
    {
        println!("\n⚠️  You already have an SDK API key, but it cannot be retrieved.");
        println!("   Get it from: {DASHBOARD_URL}/dashboard/api-keys");
        let manual: String = Input::new()
            .with_prompt("Enter your API key")
            .allow_empty(true)
            .interact_text()?;
        let manual = manual.trim();
        if manual.is_empty() {
            return Ok(None);
        }
        return Ok(Some(manual.to_string()));
    }

    let response = http
        .post(format!("{api_url}/user/api-keys"))
        .bearer_auth(access_token)
        .json(&serde_json::json!({
            "name": "SDK Auto-Generated Key",
            "permissions": ["read", "write"],
        }))
        .send()
        .await;

    match response {
        Ok(r) if r.status().is_success() => {
            let created: CreatedKey = r.json().await?;
            println!("\n✅ API key created successfully");
            Ok(Some(created.key))
        }
        Ok(r) => {
            println!(
                "\n❌ Failed to create API key: {}",
                r.text().await.unwrap_or_default()
            );
            Ok(None)
        }
        Err(e) => {
            warn!(error = %e, "API key creation request failed");
            println!("\n❌ Network error: {e}");
            Ok(None)
        }
    }
}
