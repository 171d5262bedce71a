use crate::{
    Config,
    error::ConfigError,
    templating::{LiquidResolver, TemplateContext, TemplateResolver},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

/// Decides which filesystem paths a service may write to.
pub trait PathPolicy: Send + Sync {
    fn is_allowed_path(&self, path: &Path) -> bool;
}

/// Allows paths that live inside one of a fixed set of directories.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    directories: Vec<PathBuf>,
}

impl AllowList {
    pub fn new(directories: impl IntoIterator<Item = PathBuf>) -> Self {
        let directories = directories
            .into_iter()
            .map(|dir| dir.canonicalize().unwrap_or(dir))
            .collect();
        Self { directories }
    }
}

impl PathPolicy for AllowList {
    fn is_allowed_path(&self, path: &Path) -> bool {
        // The file itself need not exist yet, but its parent must.
        let resolved = if path.exists() {
            path.canonicalize()
        } else {
            match path.parent() {
                // a bare file name lives in the working directory
                Some(parent) if parent.as_os_str().is_empty() => Path::new(".").canonicalize(),
                Some(parent) => parent.canonicalize(),
                None => return false,
            }
        };

        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("Unable to resolve {:?}: {}", path, e);
                return false;
            }
        };

        self.directories.iter().any(|dir| resolved.starts_with(dir))
    }
}

impl<F> PathPolicy for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn is_allowed_path(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Everything a service borrows from its host, passed in explicitly.
#[derive(Clone)]
pub struct Host {
    pub policy: Arc<dyn PathPolicy>,
    pub resolver: Arc<dyn TemplateResolver>,
    pub context: TemplateContext,
}

impl Host {
    pub fn new(
        policy: Arc<dyn PathPolicy>,
        resolver: Arc<dyn TemplateResolver>,
        context: TemplateContext,
    ) -> Self {
        Self {
            policy,
            resolver,
            context,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let policy = AllowList::new(config.paths.allowlist_external_dirs.iter().cloned());
        let resolver = LiquidResolver::new()?;
        let context = TemplateContext::from_variables(&config.templates.variables);

        Ok(Self::new(Arc::new(policy), Arc::new(resolver), context))
    }
}
