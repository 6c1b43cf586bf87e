pub mod alias;
pub mod cache;
pub mod certs;
pub mod error;
pub mod gcloud;
pub mod jumphost;
pub mod render;
pub mod ssh;
pub mod tld;
pub mod types;

use std::process::Stdio;

use log::debug;
use tokio::process::Command;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Runs `program` to completion and returns its stdout. A non-zero exit is
/// an error carrying the trimmed stderr.
pub(crate) async fn run_cmd(program: &str, args: &[String]) -> Result<Vec<u8>> {
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    debug!("run: {:?}", cmd);

    let output = cmd.output().await?;
    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(Error::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
