//! `exportdesk config` subcommands.

use xd_domain::config::Config;

/// Check the parsed config for operational problems. Returns `false` when
/// any hard error was found (parse errors are caught earlier, in
/// `load_config`).
pub fn validate(config: &Config, config_path: &str) -> bool {
    let mut ok = true;
    println!("config: {config_path}");

    if config.llm.base_url.is_empty() {
        println!("  ERROR: llm.base_url is empty");
        ok = false;
    }
    if config.llm.model.is_empty() {
        println!("  ERROR: llm.model is empty");
        ok = false;
    }
    if std::env::var(&config.llm.api_key_env).is_err() {
        println!(
            "  WARNING: environment variable {} is not set; the model call will fail at startup",
            config.llm.api_key_env
        );
    }

    if config.leads.endpoint.is_empty() {
        println!("  note: leads.endpoint is empty, lead persistence disabled");
    } else if std::env::var(&config.leads.api_key_env).is_err() {
        println!(
            "  WARNING: leads.endpoint is set but {} is not; lead persistence will be disabled",
            config.leads.api_key_env
        );
    }

    if config.intake.scheduling_marker.is_empty() {
        println!("  ERROR: intake.scheduling_marker is empty; leads would never persist");
        ok = false;
    }

    if ok {
        println!("  OK");
    }
    ok
}

/// Print the resolved configuration (defaults filled in) as TOML. Secrets
/// never live in the config, so nothing needs masking.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to render config: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate(&Config::default(), "config.toml"));
    }

    #[test]
    fn empty_marker_fails_validation() {
        let mut config = Config::default();
        config.intake.scheduling_marker.clear();
        assert!(!validate(&config, "config.toml"));
    }
}
