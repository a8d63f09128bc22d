//! CLI configuration: thin wrapper around `autelis_config` shared types.
//!
//! Adds the flag-aware resolution that lets `--host`, `--username`,
//! `--password` and `--timeout` override whatever the profile says.

use autelis_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use autelis_config::{Config, Profile, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.active_profile_name().to_owned())
}

/// Apply CLI flag overrides on top of a profile.
fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if let Some(ref password) = global.password {
        profile.password = Some(password.clone());
        profile.password_env = None;
    }
    if let Some(timeout) = global.timeout {
        profile.timeout_ms = Some(timeout);
    }
    profile
}

/// Build a `ControllerConfig` from the config file, profile, and CLI overrides.
///
/// With no matching profile the flags alone must name a host.
pub fn build_controller_config(
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<ControllerConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let base = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.host.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    let profile = apply_overrides(base, global);
    tracing::debug!(profile = %profile_name, host = %profile.host, "resolved controller profile");

    Ok(autelis_config::profile_to_controller_config(
        &profile,
        &profile_name,
        &cfg.defaults,
    )?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["autelis"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_profile() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                host: "10.0.0.9".into(),
                username: Some("admin".into()),
                password: Some("stored".into()),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn flags_override_profile_values() {
        let cfg = config_with_profile();
        let controller = build_controller_config(
            &global(&["--host", "10.0.0.20", "--password", "typed", "--timeout", "900"]),
            &cfg,
        )
        .unwrap();

        assert_eq!(controller.host, "10.0.0.20");
        assert_eq!(controller.username, "admin");
        assert_eq!(controller.password.expose_secret(), "typed");
        assert_eq!(controller.http_timeout.as_millis(), 900);
    }

    #[test]
    fn flags_alone_are_enough_without_a_profile() {
        let controller = build_controller_config(
            &global(&["--host", "pool.lan", "-u", "admin", "--password", "pw"]),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(controller.host, "pool.lan");
    }

    #[test]
    fn missing_profile_and_host_is_no_config() {
        let err = build_controller_config(&global(&[]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }

    #[test]
    fn named_profile_must_exist() {
        let err =
            build_controller_config(&global(&["--profile", "cabin"]), &config_with_profile())
                .unwrap_err();
        assert!(
            matches!(err, CliError::ProfileNotFound { ref available, .. } if available == "default")
        );
    }
}
