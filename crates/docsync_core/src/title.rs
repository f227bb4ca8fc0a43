//! Page title derivation.
//!
//! Wiki pages are addressed by title across the whole space, so every title
//! below the forest roots carries a short digest of its ancestor chain:
//! `Usage [Xy3_]`. The digest depends only on the chain, which makes titles
//! stable between runs and distinct between subtrees that share a heading.

use std::path::{Component, Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Replaces path separators in folder titles; `/` is structural downstream.
pub const FOLDER_DELIMITER: &str = " \u{2013} ";
pub const CHAIN_DELIMITER: &str = "-";
pub const DIGEST_LEN: usize = 4;

const FALLBACK_ROOT_TITLE: &str = "Documentation";

#[derive(Debug, Clone, Copy)]
pub enum TitleSource<'a> {
    /// Document content, plus the path to title from when no line qualifies.
    Document {
        content: &'a str,
        fallback_path: &'a Path,
    },
    Folder(&'a Path),
}

#[derive(Debug, Clone)]
pub struct TitleResolver {
    workspace_root: PathBuf,
}

impl TitleResolver {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    pub fn resolve(&self, source: TitleSource<'_>, ancestors: &[String]) -> String {
        let base = match source {
            TitleSource::Document {
                content,
                fallback_path,
            } => leading_line(content).unwrap_or_else(|| self.path_label(fallback_path)),
            TitleSource::Folder(folder) => self.path_label(folder),
        };
        append_chain_digest(&base, ancestors)
    }

    /// `docs/guide` renders as `docs – guide`; the workspace root itself renders as its own name.
    pub fn path_label(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.workspace_root).unwrap_or(path);
        let parts: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if !parts.is_empty() {
            return parts.join(FOLDER_DELIMITER);
        }
        self.workspace_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_ROOT_TITLE.to_string())
    }
}

/// First line carrying text, with comment markup skipped and one heading marker removed.
pub fn leading_line(content: &str) -> Option<String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut in_comment = false;
    for raw in content.lines() {
        let mut line = raw.trim();
        loop {
            if in_comment {
                match line.find("-->") {
                    Some(end) => {
                        in_comment = false;
                        line = line[end + 3..].trim();
                    }
                    None => {
                        line = "";
                        break;
                    }
                }
            } else if let Some(rest) = line.strip_prefix("<!--") {
                in_comment = true;
                line = rest;
            } else {
                break;
            }
        }

        let text = line.strip_prefix('#').unwrap_or(line).trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    None
}

pub fn chain_digest(ancestors: &[String]) -> String {
    let digest = Sha256::digest(ancestors.join(CHAIN_DELIMITER).as_bytes());
    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(DIGEST_LEN);
    encoded
}

pub fn append_chain_digest(title: &str, ancestors: &[String]) -> String {
    if ancestors.is_empty() {
        return title.to_string();
    }
    format!("{title} [{}]", chain_digest(ancestors))
}
