use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use log::*;
use sshelper_lib::certs::Vault;
use sshelper_lib::gcloud::GCloud;
use sshelper_lib::ssh::SshConfigDumper;

use crate::opts::Settings;

pub(crate) fn init_logger(level: LevelFilter) {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

/// Runs once, or forever every `settings.every`.
pub(crate) async fn run(settings: Settings) -> Result<()> {
    fs::create_dir_all(&settings.runtime_dir).with_context(|| {
        format!("creating runtime dir {}", settings.runtime_dir.display())
    })?;
    let dumper = dumper_for(&settings);
    run_iterations(&settings, &dumper, None).await
}

fn dumper_for(settings: &Settings) -> SshConfigDumper {
    SshConfigDumper::new(
        settings.private_key.clone(),
        settings.signed_cert.clone(),
        settings.runtime_dir.clone(),
        settings.tld_format.clone(),
        settings.template.clone(),
    )
}

/// In loop mode a failed run is logged and the next one still happens; stops
/// after `limit` runs when given. Without `settings.every` this is a single
/// run whose error is returned.
pub(crate) async fn run_iterations(
    settings: &Settings,
    dumper: &SshConfigDumper,
    limit: Option<usize>,
) -> Result<()> {
    let mut runs = 0;
    loop {
        let start = Instant::now();
        let result = run_once(settings, dumper).await;
        runs += 1;

        let every = match settings.every {
            Some(every) => every,
            None => return result,
        };
        if let Err(err) = result {
            error!("{:#}", err);
        }
        if limit.map_or(false, |limit| runs >= limit) {
            return Ok(());
        }
        let delay = every.saturating_sub(start.elapsed());
        info!("Next run in {:.2} sec", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }
}

pub(crate) async fn run_once(settings: &Settings, dumper: &SshConfigDumper) -> Result<()> {
    tokio::try_join!(
        create_signed_cert(settings),
        create_ssh_config(settings, dumper)
    )?;
    Ok(())
}

async fn create_signed_cert(settings: &Settings) -> Result<()> {
    Vault::new(settings.vault_bin.as_str())
        .sign_key(&settings.public_key, &settings.signed_cert)
        .await
        .with_context(|| format!("signing {} with vault", settings.public_key.display()))
}

async fn create_ssh_config(settings: &Settings, dumper: &SshConfigDumper) -> Result<()> {
    let (account, inventory) = GCloud::new(settings.gcloud_bin.as_str())
        .get_inventory()
        .await
        .context("fetching gcloud inventory")?;
    let config = dumper
        .dump(&account, &inventory)
        .context("generating SSH config")?;
    write_replace(&settings.ssh_config, config.as_bytes())?;
    info!("Created SSH config file {:?}", settings.ssh_config.display().to_string());
    Ok(())
}

/// Writes a sibling file first so readers never see a half-written config.
fn write_replace(path: &Path, data: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("{} is not a file path", path.display()))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
