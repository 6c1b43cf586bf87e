use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use log::info;

use crate::{run_cmd, Result};

const SIGNER_PATH: &str = "ssh-client-signer/sign/admin";

/// Signs SSH public keys through Vault's SSH secrets engine.
#[derive(Debug, Clone)]
pub struct Vault {
    pub vault_bin: String,
    pub vault_opts: Vec<String>,
}

impl Default for Vault {
    fn default() -> Self {
        Vault {
            vault_bin: "vault".to_string(),
            vault_opts: Vec::new(),
        }
    }
}

impl Vault {
    pub fn new(vault_bin: impl Into<String>) -> Self {
        Vault {
            vault_bin: vault_bin.into(),
            ..Default::default()
        }
    }

    /// Writes the signed certificate for `public_key` to `signed_cert`.
    pub async fn sign_key(&self, public_key: &Path, signed_cert: &Path) -> Result<()> {
        let mut args = self.vault_opts.clone();
        args.extend(vec![
            "write".to_string(),
            "-field=signed_key".to_string(),
            SIGNER_PATH.to_string(),
            format!("public_key=@{}", public_key.display()),
        ]);
        let cert = run_cmd(&self.vault_bin, &args).await?;

        let signed_cert: PathBuf = signed_cert.to_path_buf();
        tokio::task::spawn_blocking(move || write_private(&signed_cert, &cert)).await??;
        Ok(())
    }
}

/// Creates or truncates `path`, readable by the owner only.
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    file.write_all(data)?;
    info!("Created signed certificate {:?}", path.display().to_string());
    Ok(())
}
