use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::config::ConfluenceCredentials;
use crate::error::{Result, SyncError};
use crate::page::PreparedPage;

/// Written next to the source so relative attachment paths resolve.
pub const TEMP_FILENAME: &str = "_docsync_tmp.md";

/// Delivers one prepared page to the wiki. Any `Err` aborts the run.
pub trait Publisher {
    fn publish(&mut self, page: &PreparedPage) -> Result<()>;
}

/// Publishes through the `mark` executable.
#[derive(Debug, Clone)]
pub struct MarkPublisher {
    executable: PathBuf,
    credentials: ConfluenceCredentials,
}

impl MarkPublisher {
    pub fn new(executable: impl Into<PathBuf>, credentials: ConfluenceCredentials) -> Self {
        Self {
            executable: executable.into(),
            credentials,
        }
    }

    fn run(&self, page_file: &Path, title: &str) -> Result<()> {
        debug!(
            executable = %self.executable.display(),
            base_url = %self.credentials.url,
            file = %page_file.display(),
            "running publisher"
        );
        let output = Command::new(&self.executable)
            .arg("-u")
            .arg(&self.credentials.username)
            .arg("-p")
            .arg(&self.credentials.token)
            .arg("-b")
            .arg(&self.credentials.url)
            .arg("-f")
            .arg(page_file)
            .output()
            .map_err(|error| {
                SyncError::publish(
                    title,
                    format!("failed to execute {}: {error}", self.executable.display()),
                )
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        warn!(title, status = %output.status, "publisher reported failure");
        Err(SyncError::publish(
            title,
            format!(
                "{} exited with {}: {}",
                self.executable.display(),
                output.status,
                if message.is_empty() { "<no output>" } else { message }
            ),
        ))
    }
}

impl Publisher for MarkPublisher {
    fn publish(&mut self, page: &PreparedPage) -> Result<()> {
        let page_file = page.folder.join(TEMP_FILENAME);
        fs::write(&page_file, page.render())
            .map_err(|error| SyncError::filesystem(&page_file, error))?;
        let outcome = self.run(&page_file, &page.title);
        if let Err(error) = fs::remove_file(&page_file) {
            warn!(file = %page_file.display(), %error, "failed to remove temporary page file");
        }
        outcome
    }
}

/// Records pages instead of sending them anywhere.
#[derive(Debug, Clone, Default)]
pub struct DryRunPublisher {
    pages: Vec<PreparedPage>,
}

impl DryRunPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[PreparedPage] {
        &self.pages
    }
}

impl Publisher for DryRunPublisher {
    fn publish(&mut self, page: &PreparedPage) -> Result<()> {
        info!(
            title = %page.title,
            parent = page.parent_title.as_deref().unwrap_or("<root>"),
            attachments = page.attachments.len(),
            "dry run: would publish"
        );
        self.pages.push(page.clone());
        Ok(())
    }
}
