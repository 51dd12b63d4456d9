//! Service descriptor (`serverless.yml`) parsing and validation

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use yaml_rust2::{Yaml, YamlLoader};

use crate::constants::tool;

#[cfg(test)]
mod tests;

/// Functions keyed by their descriptor key
pub type Functions = BTreeMap<String, FunctionSpec>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    pub name: String,
    pub handler: String,
    pub description: String,
    pub runtime: String,
    pub memory_size: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provider {
    pub name: String,
    pub project: String,
    pub stage: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    /// Stack identifier, possibly containing the suffix placeholder
    pub service: String,
    pub provider: Provider,
    pub functions: Functions,
}

/// Human-facing view of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub stack_id: String,
    pub provider: String,
    pub project: String,
    pub stage: String,
    pub functions: Functions,
}

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read service descriptor {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid service descriptor: {0}")]
    Format(String),

    #[error("expected provider {expected}, found provider: {found}")]
    ProviderMismatch { expected: String, found: String },
}

impl ServiceDescriptor {
    /// Read `serverless.yml` from `dir` and check it targets `expected_provider`
    pub fn load(dir: impl AsRef<Path>, expected_provider: &str) -> Result<Self, DescriptorError> {
        let path = dir.as_ref().join(tool::DESCRIPTOR_FILE);
        debug!("Loading service descriptor from {}", path.display());

        let content = std::fs::read_to_string(&path).map_err(|source| DescriptorError::Read {
            path: path.clone(),
            source,
        })?;

        let descriptor = Self::parse(&content)?;
        descriptor.check_provider(expected_provider)?;
        Ok(descriptor)
    }

    /// Parse descriptor YAML without validating the provider
    pub fn parse(content: &str) -> Result<Self, DescriptorError> {
        let docs = YamlLoader::load_from_str(content)
            .map_err(|e| DescriptorError::Format(e.to_string()))?;

        let doc = match docs.into_iter().next() {
            Some(doc) => doc,
            None => return Ok(Self::default()),
        };
        match doc {
            Yaml::Hash(_) => {}
            Yaml::Null => return Ok(Self::default()),
            _ => return Err(format_error("top level must be a mapping")),
        }

        let provider = &doc["provider"];
        expect_mapping(provider, "provider")?;

        Ok(Self {
            service: scalar(&doc["service"], "service")?,
            provider: Provider {
                name: scalar(&provider["name"], "provider.name")?,
                project: scalar(&provider["project"], "provider.project")?,
                stage: scalar(&provider["stage"], "provider.stage")?,
            },
            functions: parse_functions(&doc["functions"])?,
        })
    }

    pub fn check_provider(&self, expected: &str) -> Result<(), DescriptorError> {
        if self.provider.name != expected {
            return Err(DescriptorError::ProviderMismatch {
                expected: expected.to_string(),
                found: self.provider.name.clone(),
            });
        }
        Ok(())
    }

    /// Stack identifier with the suffix placeholder (and a dash before it) removed
    pub fn stack_id(&self) -> String {
        self.service
            .replace(&format!("-{}", tool::SUFFIX_PLACEHOLDER), "")
            .replace(tool::SUFFIX_PLACEHOLDER, "")
    }

    /// Substitute `suffix` for the placeholder in every function name
    pub fn apply_suffix(&mut self, suffix: &str) {
        for function in self.functions.values_mut() {
            function.name = function.name.replace(tool::SUFFIX_PLACEHOLDER, suffix);
        }
    }

    pub fn summary(&self) -> ServiceSummary {
        ServiceSummary {
            stack_id: self.stack_id(),
            provider: self.provider.name.clone(),
            project: self.provider.project.clone(),
            stage: self.provider.stage.clone(),
            functions: self.functions.clone(),
        }
    }
}

fn parse_functions(value: &Yaml) -> Result<Functions, DescriptorError> {
    let mut functions = Functions::new();
    let map = match value {
        Yaml::Hash(map) => map,
        Yaml::Null | Yaml::BadValue => return Ok(functions),
        _ => return Err(format_error("`functions` must be a mapping")),
    };

    for (key, spec) in map {
        let key = scalar(key, "function key")?;
        let field = |name: &str| scalar(&spec[name], &format!("functions.{}.{}", key, name));
        expect_mapping(spec, &format!("functions.{}", key))?;

        let function = FunctionSpec {
            name: field("name")?,
            handler: field("handler")?,
            description: field("description")?,
            runtime: field("runtime")?,
            memory_size: field("memorySize")?,
        };
        functions.insert(key, function);
    }
    Ok(functions)
}

/// Accept a mapping, or nothing at all
fn expect_mapping(value: &Yaml, field: &str) -> Result<(), DescriptorError> {
    match value {
        Yaml::Hash(_) | Yaml::Null | Yaml::BadValue => Ok(()),
        _ => Err(format_error(&format!("`{}` must be a mapping", field))),
    }
}

/// Scalars of any YAML type are kept in their textual form
fn scalar(value: &Yaml, field: &str) -> Result<String, DescriptorError> {
    match value {
        Yaml::String(s) | Yaml::Real(s) => Ok(s.clone()),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Boolean(b) => Ok(b.to_string()),
        Yaml::Null | Yaml::BadValue => Ok(String::new()),
        _ => Err(format_error(&format!("`{}` must be a scalar", field))),
    }
}

fn format_error(message: &str) -> DescriptorError {
    DescriptorError::Format(message.to_string())
}
