use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const DEFAULT_SOURCE_SERVER: &str = "https://github.com";

static IMAGE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+(?:"[^"]*"|'[^']*'))?\s*\)"#)
        .expect("image reference regex")
});

/// Where published content links back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLink {
    pub server_url: String,
    pub repository: String,
    pub branch: String,
}

impl SourceLink {
    pub fn file_url(&self, relative_path: &str) -> String {
        format!(
            "{}/{}/blob/{}/{}",
            self.server_url.trim_end_matches('/'),
            self.repository.trim_matches('/'),
            self.branch,
            relative_path.trim_start_matches('/')
        )
    }
}

/// Fully prepared page, ready for a publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedPage {
    pub title: String,
    pub body: String,
    pub parent_title: Option<String>,
    pub space: Option<String>,
    pub attachments: Vec<String>,
    /// Document the body came from; `None` for synthesized folder pages.
    pub source_path: Option<PathBuf>,
    /// Directory relative attachment references resolve against.
    pub folder: PathBuf,
}

impl PreparedPage {
    /// Body prefixed with the publisher's header directives.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(parent) = &self.parent_title {
            out.push_str(&format!("<!-- Parent: {parent} -->\n"));
        }
        for attachment in &self.attachments {
            out.push_str(&format!("<!-- Attachment: {attachment} -->\n"));
        }
        if let Some(space) = &self.space {
            out.push_str(&format!("<!-- Space: {space} -->\n"));
        }
        out.push_str(&format!("<!-- Title: {} -->\n", self.title));
        out.push_str(&self.body);
        if !self.body.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct PageBuilder {
    workspace_root: PathBuf,
    space: Option<String>,
    source_link: Option<SourceLink>,
}

impl PageBuilder {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        space: Option<String>,
        source_link: Option<SourceLink>,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            space,
            source_link,
        }
    }

    pub fn build(
        &self,
        content: String,
        title: String,
        parent_title: Option<&str>,
        source_path: Option<&Path>,
        folder: &Path,
    ) -> PreparedPage {
        let attachments = scan_image_references(&content);
        let mut body = content;
        if let (Some(link), Some(path)) = (&self.source_link, source_path) {
            let relative = self.relative_display(path);
            body.push_str(&format!(
                "\n\n---\n[View source]({})\n",
                link.file_url(&relative)
            ));
        }
        PreparedPage {
            title,
            body,
            parent_title: parent_title.map(ToString::to_string),
            space: self.space.clone(),
            attachments,
            source_path: source_path.map(Path::to_path_buf),
            folder: folder.to_path_buf(),
        }
    }

    fn relative_display(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.workspace_root).unwrap_or(path);
        relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Local image targets referenced by `![alt](target "caption")`, first occurrence order.
pub fn scan_image_references(body: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for captures in IMAGE_REFERENCE.captures_iter(body) {
        let Some(target) = captures.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if is_remote_reference(target) || out.iter().any(|seen| seen == target) {
            continue;
        }
        out.push(target.to_string());
    }
    out
}

fn is_remote_reference(target: &str) -> bool {
    target.contains("://") || target.to_ascii_lowercase().starts_with("data:")
}
