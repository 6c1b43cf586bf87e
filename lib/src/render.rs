use std::fs;
use std::path::Path;

use minijinja::Environment;
use serde::Serialize;

use crate::Result;

pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/ssh_config.jinja");

/// Jinja-style template producing the final SSH config text.
#[derive(Debug, Clone)]
pub struct SshConfigTemplate {
    source: String,
}

impl SshConfigTemplate {
    /// Fails early on syntax errors rather than on the first render.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        Environment::new().template_from_str(&source)?;
        Ok(SshConfigTemplate { source })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::new(fs::read_to_string(path)?)
    }

    pub fn render<S: Serialize>(&self, vars: &S) -> Result<String> {
        let env = Environment::new();
        let template = env.template_from_str(&self.source)?;
        Ok(template.render(vars)?)
    }
}

impl Default for SshConfigTemplate {
    fn default() -> Self {
        SshConfigTemplate {
            source: DEFAULT_TEMPLATE.to_string(),
        }
    }
}
