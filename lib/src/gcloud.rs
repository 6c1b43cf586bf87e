//! Inventory source backed by the `gcloud` CLI.

use std::net::Ipv4Addr;

use log::{debug, info};
use serde::Deserialize;

use crate::error::Error;
use crate::types::{Account, Instance, Project, Zone};
use crate::{run_cmd, Result};

const INSTANCE_FIELDS: &[&str] = &[
    "name",
    "zone.scope()",
    "networkInterfaces[0].networkIP",
    "networkInterfaces[0].accessConfigs[0].natIP",
];

#[derive(Deserialize)]
struct RawAccount {
    account: String,
}

#[derive(Deserialize)]
struct RawProject {
    #[serde(rename = "projectId")]
    project_id: String,
    name: String,
}

#[derive(Deserialize)]
struct RawInstance {
    name: String,
    zone: String,
    #[serde(rename = "networkInterfaces")]
    network_interfaces: Option<Vec<RawNetworkInterface>>,
}

#[derive(Deserialize)]
struct RawNetworkInterface {
    #[serde(rename = "networkIP")]
    network_ip: Ipv4Addr,
    #[serde(rename = "accessConfigs")]
    access_configs: Option<Vec<RawAccessConfig>>,
}

#[derive(Deserialize)]
struct RawAccessConfig {
    #[serde(rename = "natIP")]
    nat_ip: Option<Ipv4Addr>,
}

pub fn parse_account(json: &[u8]) -> Result<Account> {
    let accounts: Vec<RawAccount> = serde_json::from_slice(json)?;
    accounts
        .into_iter()
        .next()
        .map(|raw| Account(raw.account))
        .ok_or(Error::NoActiveAccount)
}

pub fn parse_projects(json: &[u8]) -> Result<Vec<Project>> {
    let projects: Vec<RawProject> = serde_json::from_slice(json)?;
    Ok(projects
        .into_iter()
        .map(|raw| Project::new(raw.project_id, raw.name))
        .collect())
}

/// Instances without a network interface are not reachable and are skipped.
pub fn parse_instances(json: &[u8]) -> Result<Vec<Instance>> {
    let instances: Vec<RawInstance> = serde_json::from_slice(json)?;
    Ok(instances
        .into_iter()
        .filter_map(|raw| {
            let nic = raw.network_interfaces?.into_iter().next()?;
            let external_ip = nic
                .access_configs
                .and_then(|configs| configs.into_iter().next())
                .and_then(|config| config.nat_ip);
            Some(Instance {
                name: raw.name,
                zone: Zone(raw.zone),
                internal_ip: nic.network_ip,
                external_ip,
            })
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct GCloud {
    pub gcloud_bin: String,
    pub gcloud_opts: Vec<String>,
}

impl Default for GCloud {
    fn default() -> Self {
        GCloud {
            gcloud_bin: "gcloud".to_string(),
            gcloud_opts: Vec::new(),
        }
    }
}

impl GCloud {
    pub fn new(gcloud_bin: impl Into<String>) -> Self {
        GCloud {
            gcloud_bin: gcloud_bin.into(),
            ..Default::default()
        }
    }

    async fn run(&self, args: &[String]) -> Result<Vec<u8>> {
        let mut full = self.gcloud_opts.clone();
        full.extend_from_slice(args);
        run_cmd(&self.gcloud_bin, &full).await
    }

    pub async fn get_account(&self) -> Result<Account> {
        let output = self
            .run(&[
                "--format=json(account)".to_string(),
                "auth".to_string(),
                "list".to_string(),
                "--filter=status:ACTIVE".to_string(),
            ])
            .await?;
        parse_account(&output)
    }

    pub async fn get_projects(&self) -> Result<Vec<Project>> {
        let output = self
            .run(&[
                "--format=json(projectId, name)".to_string(),
                "projects".to_string(),
                "list".to_string(),
            ])
            .await?;
        parse_projects(&output)
    }

    pub async fn get_project_instances(&self, project: &Project) -> Result<Vec<Instance>> {
        let output = self
            .run(&[
                format!("--project={}", project.id),
                format!("--format=json({})", INSTANCE_FIELDS.join(", ")),
                "compute".to_string(),
                "instances".to_string(),
                "list".to_string(),
            ])
            .await?;
        let instances = parse_instances(&output)?;
        debug!("project {}: {} instances", project.name, instances.len());
        Ok(instances)
    }

    /// Fetches the account and every project's instances. Projects are
    /// queried concurrently; the result keeps the project list order.
    pub async fn get_inventory(&self) -> Result<(Account, Vec<(Project, Vec<Instance>)>)> {
        let (account, projects) = tokio::try_join!(self.get_account(), self.get_projects())?;
        info!("Found GCS account {:?}", account.0);
        info!(
            "Found GCS projects {:?}",
            projects.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
        );

        let handles: Vec<_> = projects
            .into_iter()
            .map(|project| {
                let gcloud = self.clone();
                tokio::spawn(async move {
                    let instances = gcloud.get_project_instances(&project).await?;
                    Ok::<_, Error>((project, instances))
                })
            })
            .collect();

        let mut inventory = Vec::with_capacity(handles.len());
        for handle in handles {
            inventory.push(handle.await??);
        }
        Ok((account, inventory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_account() {
        let json = br#"[{"account": "j.doe@example.com"}]"#;
        assert_eq!(parse_account(json).unwrap(), Account("j.doe@example.com".into()));
        assert!(matches!(parse_account(b"[]"), Err(Error::NoActiveAccount)));
    }

    #[test]
    fn test_parse_projects() {
        let json = br#"[
            {"projectId": "acme-prod-4711", "name": "Acme-Prod"},
            {"projectId": "acme-dev-17", "name": "Acme-Dev"}
        ]"#;
        assert_eq!(
            parse_projects(json).unwrap(),
            vec![
                Project::new("acme-prod-4711", "Acme-Prod"),
                Project::new("acme-dev-17", "Acme-Dev"),
            ]
        );
    }

    #[test]
    fn test_parse_instances() {
        let json = br#"[
            {
                "name": "prod-jumphost-a",
                "zone": "europe-west1-b",
                "networkInterfaces": [
                    {"networkIP": "10.0.0.2", "accessConfigs": [{"natIP": "34.76.1.2"}]}
                ]
            },
            {
                "name": "prod-db-1",
                "zone": "europe-west1-c",
                "networkInterfaces": [{"networkIP": "10.0.0.3"}]
            },
            {"name": "prod-terminated", "zone": "europe-west1-c"}
        ]"#;
        assert_eq!(
            parse_instances(json).unwrap(),
            vec![
                Instance::new(
                    "prod-jumphost-a",
                    "europe-west1-b",
                    Ipv4Addr::new(10, 0, 0, 2),
                    Some(Ipv4Addr::new(34, 76, 1, 2)),
                ),
                Instance::new("prod-db-1", "europe-west1-c", Ipv4Addr::new(10, 0, 0, 3), None),
            ]
        );
    }

    #[test]
    fn test_parse_instances_rejects_bad_ip() {
        let json = br#"[{"name": "x", "zone": "z", "networkInterfaces": [{"networkIP": "nope"}]}]"#;
        assert!(matches!(parse_instances(json), Err(Error::Serde(_))));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let gcloud = GCloud::new("/nonexistent/gcloud");
        assert!(matches!(gcloud.get_account().await, Err(Error::Io(_))));
    }
}
