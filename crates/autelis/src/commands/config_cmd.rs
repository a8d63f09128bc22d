//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "timeout_ms = {}", cfg.defaults.timeout_ms);
    let _ = writeln!(out, "poll_interval = {}", cfg.defaults.poll_interval);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "host = \"{}\"", p.host);
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(timeout) = p.timeout_ms {
            let _ = writeln!(out, "timeout_ms = {timeout}");
        }
        if let Some(port) = p.tcp_port {
            let _ = writeln!(out, "tcp_port = {port}");
        }
        if let Some(interval) = p.poll_interval {
            let _ = writeln!(out, "poll_interval = {interval}");
        }
        if let Some(push) = p.push_updates {
            let _ = writeln!(out, "push_updates = {push}");
        }
    }

    out
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init(init) => init_profile(&init, global),
    }
}

/// Write a profile built from the global flags into the config file.
fn init_profile(args: &ConfigInitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let host = global.host.clone().ok_or_else(|| CliError::Validation {
        field: "host".into(),
        reason: "config init needs --host".into(),
    })?;

    let mut cfg = config::load_config()?;
    let name = global
        .profile
        .clone()
        .unwrap_or_else(|| "default".into());

    let mut profile = Profile {
        host,
        username: Some(global.username.clone().unwrap_or_else(|| "admin".into())),
        tcp_port: args.tcp_port,
        poll_interval: args.poll_interval,
        push_updates: args.no_push.then_some(false),
        ..Profile::default()
    };

    if let Some(ref password) = global.password {
        if args.plaintext {
            profile.password = Some(password.clone());
        } else {
            autelis_config::store_password(&name, password)?;
        }
    }

    cfg.profiles.insert(name.clone(), profile);
    if !cfg.profiles.contains_key(cfg.active_profile_name()) {
        cfg.default_profile = Some(name.clone());
    }
    config::save_config(&cfg)?;

    if !global.quiet {
        eprintln!(
            "Saved profile '{name}' to {}",
            config::config_path().display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_config_masks_passwords() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                host: "10.0.0.9".into(),
                password: Some("hunter2".into()),
                tcp_port: Some(6001),
                ..Profile::default()
            },
        );

        let text = format_config_redacted(&cfg);
        assert!(text.contains("password = \"****\""));
        assert!(!text.contains("hunter2"));
        assert!(text.contains("tcp_port = 6001"));
    }
}
