//! CLI Doctor Command
//!
//! Checks everything `run` needs before it needs it.

use std::path::Path;
use std::process::Stdio;

use anyhow::Result;
use mango_config::{collect_referenced_vars, redact_config, validate, MangoConfig};
use mango_logging::mask_secret;
use serde_json::Value;
use tokio::process::Command;

use crate::config;

/// Executes the full doctor diagnosis.
pub async fn run(path: &Path, token_flag: Option<&str>) -> Result<()> {
    println!("\n🔍 Running rocket-mango doctor...\n");

    let env_ok = check_env(path).await;
    let cfg = match check_config(path).await {
        Some(cfg) => cfg,
        None => {
            println!("\n❌ Fix the config before anything else.");
            return Ok(());
        }
    };

    println!("Effective Config:");
    for line in render_config(&cfg).lines() {
        println!("  {line}");
    }

    let results = [
        env_ok,
        check_token(&cfg, token_flag),
        check_tools(&cfg).await,
        check_dirs(&cfg).await,
        check_voice(),
    ];

    println!();
    if results.iter().all(|ok| *ok) {
        println!("✅ All checks passed! rocket-mango is ready.");
    } else {
        println!("❌ Some checks failed! Please fix the errors above.");
    }
    Ok(())
}

async fn check_env(path: &Path) -> bool {
    println!("Checking Environment References:");
    let raw = match mango_config::load_raw_config(path).await {
        Ok(raw) => raw,
        Err(e) => {
            println!("  🔴 {e:#}");
            return false;
        }
    };
    let (set, unset) = split_env_refs(&raw, |name| std::env::var_os(name).is_some());
    if set.is_empty() && unset.is_empty() {
        println!("  🟢 none referenced");
    }
    for name in &set {
        println!("  🟢 ${{{name}}} is set");
    }
    for name in &unset {
        println!("  🔴 ${{{name}}} is not set");
    }
    unset.is_empty()
}

/// Split the `${VAR}` names a raw config references into set and unset.
fn split_env_refs(raw: &Value, is_set: impl Fn(&str) -> bool) -> (Vec<String>, Vec<String>) {
    collect_referenced_vars(raw).into_iter().partition(|name| is_set(name))
}

/// Pretty JSON of the loaded config with the bot token masked.
fn render_config(cfg: &MangoConfig) -> String {
    let redacted = redact_config(cfg);
    serde_json::to_string_pretty(&redacted).unwrap_or_else(|_| redacted.to_string())
}

async fn check_config(path: &Path) -> Option<MangoConfig> {
    println!("Checking Config ({}):", path.display());
    if !path.exists() {
        println!("  🟡 not found; using defaults (create one with `rocket-mango init`)");
    }
    match mango_config::load_and_prepare(path).await {
        Ok(cfg) => {
            for warning in validate(&cfg).warnings {
                println!("  🟡 {warning}");
            }
            println!("  🟢 valid");
            Some(cfg)
        }
        Err(e) => {
            println!("  🔴 {e:#}");
            None
        }
    }
}

fn check_token(cfg: &MangoConfig, flag: Option<&str>) -> bool {
    println!("Checking Bot Token:");
    match mango_config::resolve_token(flag, cfg.token(), &cfg.secret_file()) {
        Ok(token) => {
            println!("  🟢 {} from {}", mask_secret(&token.token), token.source);
            true
        }
        Err(e) => {
            println!("  🔴 {e}");
            false
        }
    }
}

async fn check_tools(cfg: &MangoConfig) -> bool {
    println!("Checking Encoders:");
    let pipeline = config::pipeline_config(cfg);
    let mut all_good = true;
    // `dca` has no version flag; a usage error still proves it runs.
    for (bin, arg) in [(pipeline.ffmpeg_bin.as_str(), "-version"), (pipeline.dca_bin.as_str(), "-h")] {
        let spawned = Command::new(bin)
            .arg(arg)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match spawned {
            Ok(_) => println!("  🟢 {bin} runs"),
            Err(e) => {
                println!("  🔴 {bin}: {e} (uploads and staged files cannot be converted)");
                all_good = false;
            }
        }
    }
    all_good
}

async fn check_dirs(cfg: &MangoConfig) -> bool {
    println!("Checking Sound Directories:");
    let mut all_good = true;
    for dir in [cfg.staging_dir(), cfg.output_dir()] {
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => println!("  🟢 {}", dir.display()),
            Ok(_) => {
                println!("  🔴 {} is not a directory", dir.display());
                all_good = false;
            }
            Err(_) => println!("  🟡 {} is missing (created on start)", dir.display()),
        }
    }
    all_good
}

fn check_voice() -> bool {
    println!("Checking Voice Transport:");
    if cfg!(feature = "voice-songbird") {
        println!("  🟢 songbird");
    } else {
        println!("  🟡 not compiled in; rebuild with --features voice-songbird to play sounds");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use mango_config::schema::BotConfig;
    use serde_json::json;

    #[test]
    fn env_refs_are_split_by_presence() {
        let raw = json!({
            "bot": { "token": "${MANGO_TOKEN}" },
            "paths": { "stagingDir": "${SOUNDS}/staging", "outputDir": "$${LITERAL}/out" }
        });
        let (set, unset) = split_env_refs(&raw, |name| name == "SOUNDS");
        assert_eq!(set, vec!["SOUNDS"]);
        assert_eq!(unset, vec!["MANGO_TOKEN"]);
    }

    #[test]
    fn rendered_config_masks_the_token() {
        let cfg = MangoConfig {
            bot: Some(BotConfig {
                token: Some("MTA5ODc2NTQzMjEwOTg3NjU0.GaBcDe.secretpart".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let out = render_config(&cfg);
        assert!(out.contains("MTA5***"));
        assert!(!out.contains("secretpart"));
    }
}
