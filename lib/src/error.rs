use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no jump host for instance {instance} in project {project}")]
    UnresolvableJumphost { project: String, instance: String },
    #[error("jump host {jumphost} of instance {instance} in project {project} routes through another jump host")]
    JumphostChain {
        project: String,
        instance: String,
        jumphost: String,
    },
    #[error("duplicate instance name {name} in project {project}")]
    DuplicateInstance { project: String, name: String },
    #[error("unknown key {key:?} in TLD format {format:?}")]
    UnknownTldKey { format: String, key: String },
    #[error("invalid TLD format {format:?}: {reason}")]
    InvalidTldFormat { format: String, reason: &'static str },
    #[error("no active gcloud account")]
    NoActiveAccount,
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("background task failed")]
    Join(#[from] tokio::task::JoinError),
    #[error("i/o failed")]
    Io(#[from] std::io::Error),
    #[error("error parsing json")]
    Serde(#[from] serde_json::Error),
    #[error("template error")]
    Template(#[from] minijinja::Error),
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn test_unresolvable_jumphost_names_both_sides() {
        let err = Error::UnresolvableJumphost {
            project: "Infra".into(),
            instance: "db-1".into(),
        };
        assert_eq!(
            err.to_string(),
            "no jump host for instance db-1 in project Infra"
        );
    }
}
