use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use shellexpand::tilde;
use sshelper_lib::render::SshConfigTemplate;
use sshelper_lib::tld::TldFormat;
use std::time::Duration;

const RUNTIME_DIR_ENV: &str = "SSHELPER_RUNTIME_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Error | LogLevel::Critical => LevelFilter::Error,
        }
    }
}

#[derive(Debug, Parser)]
#[clap(name = "sshelper", version, about = "Generate SSH certificate and config for cloud instances")]
pub struct Opts {
    #[clap(
        short = 'i',
        long,
        help = "SSH identity file (private key)",
        env = "SSHELPER_IDENTITY_FILE",
        default_value = "~/.ssh/id_rsa",
        value_name = "IDENTITY_FILE"
    )]
    identity_file: String,
    #[clap(
        long,
        help = "SSH signed certificate [default: <runtime dir>/id_rsa.cert]",
        env = "SSHELPER_CERT_FILE",
        value_name = "CERT_FILE"
    )]
    cert_file: Option<String>,
    #[clap(
        long,
        value_enum,
        ignore_case = true,
        help = "Logging level, RUST_LOG takes precedence",
        env = "SSHELPER_LOG_LEVEL",
        default_value = "info"
    )]
    pub log_level: LogLevel,
    #[clap(
        long,
        help = "TLD format string",
        env = "SSHELPER_TLD_FORMAT",
        default_value = sshelper_lib::tld::DEFAULT_TLD_FORMAT,
        value_name = "TLD_FORMAT"
    )]
    tld_format: TldFormat,
    #[clap(
        long,
        help = "SSH config template file [default: built-in]",
        env = "SSHELPER_SSH_CONFIG_TEMPLATE",
        value_name = "SSH_CONFIG_TEMPLATE"
    )]
    ssh_config_template: Option<String>,
    #[clap(
        long,
        help = "SSH config output file [default: <runtime dir>/ssh_config]",
        env = "SSHELPER_SSH_CONFIG",
        value_name = "SSH_CONFIG"
    )]
    ssh_config: Option<String>,
    #[clap(
        long = "loop",
        help = "Periodically regenerate SSH certificate and config",
        overrides_with = "once"
    )]
    run_loop: bool,
    #[clap(long, help = "Run a single time (default)", overrides_with = "run_loop")]
    once: bool,
    #[clap(
        long,
        help = "Duration in seconds between consecutive runs",
        env = "SSHELPER_LOOP_DELAY",
        default_value = "300",
        value_name = "LOOP_DELAY"
    )]
    loop_delay: u64,
    #[clap(long, help = "gcloud executable", env = "SSHELPER_GCLOUD_BIN", default_value = "gcloud")]
    gcloud_bin: String,
    #[clap(long, help = "vault executable", env = "SSHELPER_VAULT_BIN", default_value = "vault")]
    vault_bin: String,
}

/// Resolved settings for a run, derived from [`Opts`] and the environment.
#[derive(Debug)]
pub struct Settings {
    pub runtime_dir: PathBuf,
    pub private_key: PathBuf,
    pub public_key: PathBuf,
    pub signed_cert: PathBuf,
    pub tld_format: TldFormat,
    pub template: SshConfigTemplate,
    pub ssh_config: PathBuf,
    pub every: Option<Duration>,
    pub gcloud_bin: String,
    pub vault_bin: String,
}

pub fn runtime_dir() -> PathBuf {
    match env::var_os(RUNTIME_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("sshelper"),
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(tilde(path).into_owned())
}

impl Settings {
    pub fn from_opts(opts: Opts) -> Result<Self> {
        let runtime_dir = runtime_dir();

        let private_key = expand(&opts.identity_file);
        if !private_key.is_file() {
            bail!("identity file {} does not exist", private_key.display());
        }
        let public_key = private_key.with_extension("pub");

        let signed_cert = opts
            .cert_file
            .as_deref()
            .map(expand)
            .unwrap_or_else(|| runtime_dir.join("id_rsa.cert"));
        let ssh_config = opts
            .ssh_config
            .as_deref()
            .map(expand)
            .unwrap_or_else(|| runtime_dir.join("ssh_config"));

        let template = match opts.ssh_config_template.as_deref().map(expand) {
            Some(path) => SshConfigTemplate::from_file(&path)
                .with_context(|| format!("loading SSH config template {}", path.display()))?,
            None => SshConfigTemplate::default(),
        };

        Ok(Settings {
            runtime_dir,
            private_key,
            public_key,
            signed_cert,
            tld_format: opts.tld_format,
            template,
            ssh_config,
            every: if opts.run_loop && !opts.once {
                Some(Duration::from_secs(opts.loop_delay))
            } else {
                None
            },
            gcloud_bin: opts.gcloud_bin,
            vault_bin: opts.vault_bin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Opts::try_parse_from(&["sshelper"]).unwrap();
        assert_eq!(opts.log_level, LogLevel::Info);
        assert_eq!(opts.tld_format, TldFormat::default());
        assert_eq!(opts.loop_delay, 300);
        assert!(!opts.run_loop);
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let opts = Opts::try_parse_from(&["sshelper", "--log-level", "WARNING"]).unwrap();
        assert_eq!(LevelFilter::from(opts.log_level), LevelFilter::Warn);
    }

    #[test]
    fn test_once_overrides_loop() {
        let opts = Opts::try_parse_from(&["sshelper", "--loop", "--once"]).unwrap();
        assert!(opts.once);
        let opts = Opts::try_parse_from(&["sshelper", "--once", "--loop"]).unwrap();
        assert!(opts.run_loop && !opts.once);
    }

    #[test]
    fn test_bad_tld_format_is_rejected() {
        assert!(Opts::try_parse_from(&["sshelper", "--tld-format", ".{region}"]).is_err());
    }
}
