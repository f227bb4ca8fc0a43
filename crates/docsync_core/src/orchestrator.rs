use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::page::PageBuilder;
use crate::publisher::Publisher;
use crate::title::{TitleResolver, TitleSource};
use crate::tree::{PublishNode, SourceTree};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedPage {
    pub title: String,
    pub parent_title: Option<String>,
    pub source_path: Option<PathBuf>,
    pub attachments: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    pub pages: Vec<PublishedPage>,
    pub duplicate_titles: Vec<String>,
}

impl PublishReport {
    pub fn published(&self) -> usize {
        self.pages.len()
    }
}

/// Walks the forest depth-first, publishing each node before its siblings and children.
pub struct Orchestrator<'a, T: SourceTree + ?Sized, P: Publisher + ?Sized> {
    tree: &'a T,
    publisher: &'a mut P,
    titles: TitleResolver,
    pages: PageBuilder,
    seen_titles: HashSet<String>,
    report: PublishReport,
}

impl<'a, T: SourceTree + ?Sized, P: Publisher + ?Sized> Orchestrator<'a, T, P> {
    pub fn new(
        tree: &'a T,
        publisher: &'a mut P,
        titles: TitleResolver,
        pages: PageBuilder,
    ) -> Self {
        Self {
            tree,
            publisher,
            titles,
            pages,
            seen_titles: HashSet::new(),
            report: PublishReport::default(),
        }
    }

    /// Stops at the first failure; pages already published stay published.
    pub fn publish(mut self, forest: &[PublishNode]) -> Result<PublishReport> {
        for root in forest {
            self.publish_node(root, &[])?;
        }
        Ok(self.report)
    }

    pub fn publish_node(&mut self, node: &PublishNode, ancestors: &[String]) -> Result<()> {
        info!(folder = %node.folder_path.display(), "publishing");
        let parent_title = ancestors.last().map(String::as_str);

        let this_title = match &node.main_document {
            Some(document) => {
                let content = self.tree.read_document(document)?;
                let title = self.titles.resolve(
                    TitleSource::Document {
                        content: &content,
                        fallback_path: &node.folder_path,
                    },
                    ancestors,
                );
                self.emit(
                    content,
                    &title,
                    parent_title,
                    Some(document.as_path()),
                    &node.folder_path,
                )?;
                title
            }
            None => {
                let title = self
                    .titles
                    .resolve(TitleSource::Folder(&node.folder_path), ancestors);
                self.emit(String::new(), &title, parent_title, None, &node.folder_path)?;
                title
            }
        };

        let mut chain = ancestors.to_vec();
        chain.push(this_title.clone());

        for sibling in &node.sibling_documents {
            let content = self.tree.read_document(sibling)?;
            let title = self.titles.resolve(
                TitleSource::Document {
                    content: &content,
                    fallback_path: sibling,
                },
                &chain,
            );
            let folder = sibling.parent().unwrap_or(&node.folder_path);
            self.emit(
                content,
                &title,
                Some(this_title.as_str()),
                Some(sibling.as_path()),
                folder,
            )?;
        }

        for child in &node.children {
            self.publish_node(child, &chain)?;
        }
        Ok(())
    }

    fn emit(
        &mut self,
        content: String,
        title: &str,
        parent_title: Option<&str>,
        source_path: Option<&Path>,
        folder: &Path,
    ) -> Result<()> {
        if !self.seen_titles.insert(title.to_string()) {
            warn!(title, "title already published in this run; the later page replaces it");
            self.report.duplicate_titles.push(title.to_string());
        }
        let page = self
            .pages
            .build(content, title.to_string(), parent_title, source_path, folder);
        self.publisher.publish(&page)?;
        debug!(title, parent = parent_title.unwrap_or("<root>"), "published");
        self.report.pages.push(PublishedPage {
            title: page.title,
            parent_title: page.parent_title,
            source_path: page.source_path,
            attachments: page.attachments.len(),
        });
        Ok(())
    }
}
