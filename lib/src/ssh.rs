//! Template-ready view of the whole fleet.
//!
//! The aggregate built here is the only thing handed to the template: per
//! project, one record per instance in inventory order, each carrying its
//! host name, aliases, addresses and (when it is not its own jump host) a
//! nested record for the jump host it connects through.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use log::debug;
use serde::Serialize;

use crate::alias::{resolve_aliases, AliasMap};
use crate::cache::Memo;
use crate::error::Error;
use crate::jumphost::resolve_jumphosts;
use crate::render::SshConfigTemplate;
use crate::tld::TldFormat;
use crate::types::{Account, Instance, Project, Zone};
use crate::Result;

const NOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NOW_FORMAT_MICROS: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Microseconds are only shown when non-zero.
fn format_now(now: &DateTime<Local>) -> String {
    if now.timestamp_subsec_micros() == 0 {
        now.format(NOW_FORMAT).to_string()
    } else {
        now.format(NOW_FORMAT_MICROS).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceView {
    pub is_jumphost: bool,
    pub host: String,
    pub host_aliases: Vec<String>,
    pub internal_ip: Ipv4Addr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ip: Option<Ipv4Addr>,
    /// Only present when the instance connects through another host. Never
    /// nested deeper than one level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jumphost: Option<Box<InstanceView>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectView {
    pub name: String,
    pub id: String,
    pub instances: Vec<InstanceView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountView {
    pub name: String,
    pub ssh_user: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigView {
    pub now: String,
    pub runtime_dir: String,
    pub projects: Vec<ProjectView>,
    pub account: AccountView,
    pub private_key: String,
    pub signed_cert: String,
}

pub struct SshConfigDumper {
    pub private_key: PathBuf,
    pub signed_cert: PathBuf,
    pub runtime_dir: PathBuf,
    tld_format: TldFormat,
    template: SshConfigTemplate,
    tlds: Memo<(Project, Zone), String>,
    ssh_users: Memo<Account, String>,
}

impl SshConfigDumper {
    pub fn new(
        private_key: PathBuf,
        signed_cert: PathBuf,
        runtime_dir: PathBuf,
        tld_format: TldFormat,
        template: SshConfigTemplate,
    ) -> Self {
        SshConfigDumper {
            private_key,
            signed_cert,
            runtime_dir,
            tld_format,
            template,
            tlds: Memo::new(),
            ssh_users: Memo::new(),
        }
    }

    pub fn get_tld(&self, project: &Project, zone: &Zone) -> String {
        self.tlds
            .get_or_insert_with((project.clone(), zone.clone()), |(project, zone)| {
                self.tld_format.format(project, zone)
            })
    }

    pub fn jumphost_user(&self, account: &Account) -> String {
        self.ssh_users
            .get_or_insert_with(account.clone(), Account::jumphost_user)
    }

    fn instance_view(
        &self,
        project: &Project,
        aliases: &AliasMap,
        instance: &Instance,
        jumphost: &Instance,
    ) -> InstanceView {
        let tld = self.get_tld(project, &instance.zone);
        let is_jumphost = jumphost == instance;
        let host_aliases = aliases
            .get(instance.name.as_str())
            .map(|names| names.iter().map(|alias| format!("{}{}", alias, tld)).collect())
            .unwrap_or_default();

        InstanceView {
            is_jumphost,
            host: format!("{}{}", instance.name, tld),
            host_aliases,
            internal_ip: instance.internal_ip,
            external_ip: instance.external_ip,
            jumphost: if is_jumphost {
                None
            } else {
                Some(Box::new(
                    self.instance_view(project, aliases, jumphost, jumphost),
                ))
            },
        }
    }

    pub fn project_view(&self, project: &Project, instances: &[Instance]) -> Result<ProjectView> {
        let mut names = HashSet::new();
        for instance in instances {
            if !names.insert(instance.name.as_str()) {
                return Err(Error::DuplicateInstance {
                    project: project.name.clone(),
                    name: instance.name.clone(),
                });
            }
        }

        let aliases = resolve_aliases(instances);
        let jumphosts = resolve_jumphosts(project, instances)?;
        debug!(
            "project {}: {} instances, {} jump hosts",
            project.name,
            instances.len(),
            jumphosts
                .iter()
                .filter(|(name, jumphost)| **name == jumphost.name)
                .count()
        );

        let instances = instances
            .iter()
            .map(|instance| {
                let jumphost = jumphosts[instance.name.as_str()];
                self.instance_view(project, &aliases, instance, jumphost)
            })
            .collect();

        Ok(ProjectView {
            name: project.name.clone(),
            id: project.id.clone(),
            instances,
        })
    }

    pub fn build_at(
        &self,
        account: &Account,
        projects: &[(Project, Vec<Instance>)],
        now: DateTime<Local>,
    ) -> Result<ConfigView> {
        let projects = projects
            .iter()
            .map(|(project, instances)| self.project_view(project, instances))
            .collect::<Result<Vec<_>>>()?;

        Ok(ConfigView {
            now: format_now(&now),
            runtime_dir: self.runtime_dir.display().to_string(),
            projects,
            account: AccountView {
                name: account.0.clone(),
                ssh_user: self.jumphost_user(account),
            },
            private_key: self.private_key.display().to_string(),
            signed_cert: self.signed_cert.display().to_string(),
        })
    }

    pub fn build(&self, account: &Account, projects: &[(Project, Vec<Instance>)]) -> Result<ConfigView> {
        self.build_at(account, projects, Local::now())
    }

    /// Renders the SSH config for every project. Nothing is rendered if any
    /// project fails to resolve.
    pub fn dump(&self, account: &Account, projects: &[(Project, Vec<Instance>)]) -> Result<String> {
        let view = self.build(account, projects)?;
        self.template.render(&view)
    }
}
