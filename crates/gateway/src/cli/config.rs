use lb_domain::config::{
    Config, ConfigSeverity, ENV_AUTH_ACCESS_TOKEN_URL, ENV_AUTH_API_BASE_URL,
    ENV_AUTH_AUTHORIZE_URL, ENV_AUTH_CLIENT_ID, ENV_AUTH_CLIENT_SECRET, ENV_AUTH_DOMAIN,
    ENV_CALLBACK_URL, ENV_DISCORD_CLIENT_ID, ENV_DISCORD_CLIENT_SECRET, ENV_DISCORD_REDIRECT_URI,
    ENV_DISCORD_WEBHOOK, ENV_GQL_ACCOUNT_SECRET, ENV_SECRET_KEY,
};

/// Every variable the server reads, and whether it is required.
pub const ENV_VARS: &[(&str, bool)] = &[
    (ENV_AUTH_CLIENT_ID, true),
    (ENV_AUTH_CLIENT_SECRET, true),
    (ENV_AUTH_DOMAIN, true),
    (ENV_AUTH_API_BASE_URL, true),
    (ENV_AUTH_ACCESS_TOKEN_URL, true),
    (ENV_AUTH_AUTHORIZE_URL, true),
    (ENV_CALLBACK_URL, true),
    (ENV_DISCORD_CLIENT_ID, true),
    (ENV_DISCORD_CLIENT_SECRET, true),
    (ENV_DISCORD_REDIRECT_URI, true),
    (ENV_SECRET_KEY, true),
    (ENV_GQL_ACCOUNT_SECRET, true),
    (ENV_DISCORD_WEBHOOK, false),
];

/// Print config issues. Returns `false` when any is an error.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let (errors, warnings): (Vec<_>, Vec<_>) = issues
        .iter()
        .partition(|i| i.severity == ConfigSeverity::Error);
    for issue in errors.iter().chain(warnings.iter()) {
        println!("{issue}");
    }
    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        errors.len(),
        warnings.len()
    );
    errors.is_empty()
}

/// Dump the resolved config (defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}

/// Print set/unset for each variable. Values are never shown.
pub fn env(lookup: impl Fn(&str) -> Option<String>) -> bool {
    let mut ok = true;
    for &(name, required) in ENV_VARS {
        let set = lookup(name).is_some_and(|v| !v.trim().is_empty());
        let note = match (set, required) {
            (true, _) => "set",
            (false, true) => {
                ok = false;
                "MISSING"
            }
            (false, false) => "unset (optional)",
        };
        println!("{name:<24} {note}");
    }
    ok
}
