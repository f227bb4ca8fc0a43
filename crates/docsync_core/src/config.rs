use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::page::{DEFAULT_SOURCE_SERVER, SourceLink};

pub const ENV_WORKSPACE: &str = "GITHUB_WORKSPACE";
pub const ENV_CONFLUENCE_URL: &str = "INPUT_CONFLUENCE_URL";
pub const ENV_CONFLUENCE_USERNAME: &str = "INPUT_CONFLUENCE_USERNAME";
pub const ENV_CONFLUENCE_TOKEN: &str = "INPUT_CONFLUENCE_TOKEN";
pub const ENV_CONFLUENCE_SPACE: &str = "INPUT_CONFLUENCE_SPACE";
pub const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const ENV_BRANCH: &str = "GITHUB_REF_NAME";
pub const ENV_SERVER_URL: &str = "GITHUB_SERVER_URL";
pub const ENV_EXECUTABLE: &str = "MARK_EXECUTABLE";
pub const ENV_CONFIG: &str = "DOCSYNC_CONFIG";

pub const DEFAULT_CONFIG_FILENAME: &str = ".docsync.toml";
pub const DEFAULT_EXECUTABLE: &str = "mark";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    File,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::File => "file",
            Self::Default => "default",
        }
    }
}

/// Optional on-disk settings. The token is deliberately not representable here.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default)]
    pub confluence: ConfluenceSection,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub publisher: PublisherSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ConfluenceSection {
    pub url: Option<String>,
    pub username: Option<String>,
    pub space: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SourceSection {
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub server_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct PublisherSection {
    pub executable: Option<String>,
}

/// Load a `FileConfig` from TOML. A missing file yields the default.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = fs::read_to_string(path).map_err(|error| SyncError::ConfigFile {
        path: path.to_path_buf(),
        detail: error.to_string(),
    })?;
    toml::from_str(&content).map_err(|error| SyncError::ConfigFile {
        path: path.to_path_buf(),
        detail: format!("failed to parse: {error}"),
    })
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub space: Option<String>,
    pub executable: Option<PathBuf>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ConfluenceCredentials {
    pub url: String,
    pub username: String,
    pub token: String,
}

impl fmt::Debug for ConfluenceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfluenceCredentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub workspace_root: PathBuf,
    pub config_path: PathBuf,
    pub confluence_url: Option<String>,
    pub username: Option<String>,
    pub token: Option<String>,
    pub space: Option<String>,
    pub source_link: Option<SourceLink>,
    pub executable: PathBuf,
    pub sources: BTreeMap<&'static str, ValueSource>,
}

impl SyncConfig {
    pub fn require_space(&self) -> Result<&str> {
        self.space
            .as_deref()
            .ok_or_else(|| missing(ENV_CONFLUENCE_SPACE, "confluence.space"))
    }

    pub fn require_credentials(&self) -> Result<ConfluenceCredentials> {
        let url = self
            .confluence_url
            .clone()
            .ok_or_else(|| missing(ENV_CONFLUENCE_URL, "confluence.url"))?;
        let username = self
            .username
            .clone()
            .ok_or_else(|| missing(ENV_CONFLUENCE_USERNAME, "confluence.username"))?;
        let token = self.token.clone().ok_or_else(|| {
            SyncError::configuration(ENV_CONFLUENCE_TOKEN, "not set (environment only)")
        })?;
        Ok(ConfluenceCredentials {
            url,
            username,
            token,
        })
    }

    pub fn source_of(&self, key: &str) -> ValueSource {
        self.sources.get(key).copied().unwrap_or(ValueSource::Default)
    }

    pub fn diagnostics(&self) -> String {
        let mut lines = vec![
            format!(
                "workspace_root={} ({})",
                normalize_for_display(&self.workspace_root),
                self.source_of("workspace").as_str()
            ),
            format!(
                "config_path={} ({})",
                normalize_for_display(&self.config_path),
                self.source_of("config").as_str()
            ),
            format!(
                "confluence_url={} ({})",
                self.confluence_url.as_deref().unwrap_or("<unset>"),
                self.source_of("url").as_str()
            ),
            format!(
                "username={} ({})",
                self.username.as_deref().unwrap_or("<unset>"),
                self.source_of("username").as_str()
            ),
            format!(
                "token={}",
                if self.token.is_some() { "<set>" } else { "<unset>" }
            ),
            format!(
                "space={} ({})",
                self.space.as_deref().unwrap_or("<unset>"),
                self.source_of("space").as_str()
            ),
            format!(
                "executable={} ({})",
                normalize_for_display(&self.executable),
                self.source_of("executable").as_str()
            ),
        ];
        lines.push(match &self.source_link {
            Some(link) => format!(
                "source_link={}/{}@{}",
                link.server_url.trim_end_matches('/'),
                link.repository,
                link.branch
            ),
            None => "source_link=<disabled>".to_string(),
        });
        lines.join("\n")
    }
}

pub fn resolve_config(overrides: &ConfigOverrides) -> Result<SyncConfig> {
    let cwd = env::current_dir().map_err(|error| SyncError::filesystem(Path::new("."), error))?;
    resolve_config_with_lookup(&cwd, overrides, |key| env::var(key).ok())
}

pub fn resolve_config_with_lookup<F>(
    cwd: &Path,
    overrides: &ConfigOverrides,
    lookup_env: F,
) -> Result<SyncConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| {
        lookup_env(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    let mut sources = BTreeMap::new();

    let (workspace_root, workspace_source) = if let Some(path) = overrides.workspace.as_deref() {
        (absolutize(path, cwd), ValueSource::Flag)
    } else if let Some(value) = lookup(ENV_WORKSPACE) {
        (absolutize(Path::new(&value), cwd), ValueSource::Env)
    } else {
        return Err(SyncError::configuration(
            ENV_WORKSPACE,
            "workspace root not set; pass --workspace or set GITHUB_WORKSPACE",
        ));
    };
    sources.insert("workspace", workspace_source);

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &workspace_root), ValueSource::Flag)
    } else if let Some(value) = lookup(ENV_CONFIG) {
        (absolutize(Path::new(&value), &workspace_root), ValueSource::Env)
    } else {
        (
            workspace_root.join(DEFAULT_CONFIG_FILENAME),
            ValueSource::Default,
        )
    };
    sources.insert("config", config_source);
    if config_source != ValueSource::Default && !config_path.exists() {
        return Err(SyncError::ConfigFile {
            path: config_path,
            detail: "file does not exist".to_string(),
        });
    }
    let file = load_file_config(&config_path)?;

    let mut layered = |key: &'static str, flag: Option<String>, env_key: &str, from_file: Option<String>| {
        let resolved = if let Some(value) = flag {
            Some((value, ValueSource::Flag))
        } else if let Some(value) = lookup(env_key) {
            Some((value, ValueSource::Env))
        } else {
            from_file
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| (value, ValueSource::File))
        };
        resolved.map(|(value, source)| {
            sources.insert(key, source);
            value
        })
    };

    let confluence_url = layered("url", None, ENV_CONFLUENCE_URL, file.confluence.url.clone());
    let username = layered(
        "username",
        None,
        ENV_CONFLUENCE_USERNAME,
        file.confluence.username.clone(),
    );
    let space = layered(
        "space",
        overrides.space.clone(),
        ENV_CONFLUENCE_SPACE,
        file.confluence.space.clone(),
    );
    let repository = layered("repository", None, ENV_REPOSITORY, file.source.repository.clone());
    let branch = layered("branch", None, ENV_BRANCH, file.source.branch.clone());
    let server_url = layered("server_url", None, ENV_SERVER_URL, file.source.server_url.clone());
    let executable = layered(
        "executable",
        overrides
            .executable
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned()),
        ENV_EXECUTABLE,
        file.publisher.executable.clone(),
    )
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from(DEFAULT_EXECUTABLE));
    let token = lookup(ENV_CONFLUENCE_TOKEN);

    let source_link = match (repository, branch) {
        (Some(repository), Some(branch)) => Some(SourceLink {
            server_url: server_url.unwrap_or_else(|| DEFAULT_SOURCE_SERVER.to_string()),
            repository,
            branch,
        }),
        _ => None,
    };

    Ok(SyncConfig {
        workspace_root,
        config_path,
        confluence_url,
        username,
        token,
        space,
        source_link,
        executable,
        sources,
    })
}

fn missing(env_key: &str, file_key: &str) -> SyncError {
    SyncError::configuration(
        env_key,
        format!("not set (environment or `{file_key}` in {DEFAULT_CONFIG_FILENAME})"),
    )
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
