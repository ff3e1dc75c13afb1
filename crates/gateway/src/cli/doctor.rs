use lb_directory::create_directory;
use lb_domain::config::{Config, ConfigSeverity, ProviderSecrets};

use crate::oauth::{DiscordProvider, PrimaryProvider};

/// Run every diagnostic check and print a summary.
///
/// Returns `Ok(true)` when every check passes.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("linkbridge doctor");
    println!("=================\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);

    match ProviderSecrets::from_env() {
        Ok(secrets) => {
            print_check("Environment", true, "all required variables set".into());
            check_provider_urls(config, &secrets, &mut all_passed);
            check_webhook(&secrets);
            check_account_service(config, &secrets, &mut all_passed).await;
        }
        Err(e) => {
            print_check("Environment", false, e.to_string());
            all_passed = false;
        }
    }

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }
    Ok(all_passed)
}

// ── Individual checks ─────────────────────────────────────────────────

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    let detail = if exists {
        config_path.to_owned()
    } else {
        format!("{config_path} not found (using defaults)")
    };
    print_check("Config file exists", exists, detail);
    *all_passed &= exists;
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();

    let detail = if issues.is_empty() {
        "no issues".to_owned()
    } else {
        format!("{} issue(s) ({error_count} error(s))", issues.len())
    };
    print_check("Config validation", error_count == 0, detail);
    for issue in &issues {
        println!("      {issue}");
    }
    *all_passed &= error_count == 0;
}

fn check_provider_urls(config: &Config, secrets: &ProviderSecrets, all_passed: &mut bool) {
    let primary = PrimaryProvider::from_secrets(secrets).map(|_| ());
    let discord = DiscordProvider::new(&config.discord, secrets).map(|_| ());
    match primary.and(discord) {
        Ok(()) => print_check("Provider URLs", true, "parsed".into()),
        Err(e) => {
            print_check("Provider URLs", false, e.to_string());
            *all_passed = false;
        }
    }
}

fn check_webhook(secrets: &ProviderSecrets) {
    if secrets.webhook_url.is_some() {
        print_check("Webhook", true, "configured".into());
    } else {
        println!("  [WARN] Webhook: DISCORD_WEBHOOK unset, notifications disabled");
    }
}

/// Look up an id that should not exist. `Ok(None)` proves the service is
/// reachable and accepts our token.
async fn check_account_service(config: &Config, secrets: &ProviderSecrets, all_passed: &mut bool) {
    let directory = match create_directory(&config.directory, secrets) {
        Ok(d) => d,
        Err(e) => {
            print_check("Account service", false, e.to_string());
            *all_passed = false;
            return;
        }
    };

    let probe = format!("linkbridge-doctor-{}", uuid::Uuid::new_v4());
    match directory.lookup.find_by_internal_id(&probe).await {
        Ok(_) => print_check(
            "Account service",
            true,
            format!("{} ({})", config.directory.graphql_url, config.directory.backend),
        ),
        Err(e) => {
            print_check(
                "Account service",
                false,
                format!("{}: {e}", config.directory.graphql_url),
            );
            *all_passed = false;
        }
    }
}

// ── Formatting helper ─────────────────────────────────────────────────

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
