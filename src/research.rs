//! Read-only viewer over a directory of markdown research projects.
//!
//! Layout: `<root>/<project>/*.md`, with an optional `INDEX.md` per project
//! used as its overview.

use crate::config::ResearchConfig;
use pulldown_cmark::{Options, Parser, html};
use serde::Serialize;
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};
use thiserror::Error;

const INDEX_FILE: &str = "INDEX.md";
const MARKDOWN_SUFFIX: &str = ".md";

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("access denied")]
    Forbidden,
    #[error("failed to read research library: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocRef {
    pub name: String,
    pub file: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub overview: String,
    pub doc_count: usize,
    pub docs: Vec<DocRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub id: String,
    pub name: String,
    pub overview: String,
    pub docs: Vec<DocRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub name: String,
    pub content: String,
    pub raw: String,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct ResearchLibrary {
    root: PathBuf,
    preview_lines: usize,
}

impl ResearchLibrary {
    pub fn new(root: impl Into<PathBuf>, preview_lines: usize) -> Self {
        Self {
            root: root.into(),
            preview_lines,
        }
    }

    pub fn from_config(config: &ResearchConfig) -> Self {
        Self::new(config.root_dir.clone(), config.preview_lines)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every project directory, by name. A missing root is an empty library.
    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>, ResearchError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
        ids.sort();

        ids.into_iter()
            .map(|id| {
                let dir = self.root.join(&id);
                let overview = read_index(&dir)?
                    .map(|markdown| render_markdown(&first_lines(&markdown, self.preview_lines)))
                    .unwrap_or_default();
                let docs = list_docs(&id, &dir)?;
                Ok(ProjectSummary {
                    name: display_name(&id),
                    overview,
                    doc_count: docs.len(),
                    docs,
                    id,
                })
            })
            .collect()
    }

    pub fn project(&self, id: &str) -> Result<ProjectDetail, ResearchError> {
        let relative = normalize_relative(Path::new(id)).ok_or(ResearchError::Forbidden)?;
        let dir = self.root.join(&relative);
        if relative.as_os_str().is_empty() || !dir.is_dir() {
            return Err(ResearchError::NotFound("Project"));
        }

        let overview = read_index(&dir)?.unwrap_or_default();
        Ok(ProjectDetail {
            id: id.to_string(),
            name: id.replace('-', " "),
            overview: render_markdown(&overview),
            docs: list_docs(id, &dir)?,
        })
    }

    pub fn document(&self, project: &str, doc: &str) -> Result<Document, ResearchError> {
        let (relative, full) = self.resolve_document(project, doc)?;
        let raw = fs::read_to_string(&full)?;
        Ok(Document {
            name: file_stem(&full),
            content: render_markdown(&raw),
            raw,
            path: slash_path(&relative),
        })
    }

    pub fn download(&self, project: &str, doc: &str) -> Result<Download, ResearchError> {
        let (_, full) = self.resolve_document(project, doc)?;
        let body = fs::read_to_string(&full)?;
        let file_name = full
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}{MARKDOWN_SUFFIX}", file_stem(&full)));
        Ok(Download { file_name, body })
    }

    /// Maps `<project>/<doc>` to `<root>/<project>/<doc>.md`, refusing anything
    /// that would leave the root.
    fn resolve_document(
        &self,
        project: &str,
        doc: &str,
    ) -> Result<(PathBuf, PathBuf), ResearchError> {
        let requested = Path::new(project).join(format!("{doc}{MARKDOWN_SUFFIX}"));
        let relative = normalize_relative(&requested).ok_or(ResearchError::Forbidden)?;
        let full = self.root.join(&relative);
        if !full.is_file() {
            return Err(ResearchError::NotFound("Document"));
        }
        Ok((relative, full))
    }
}

pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

fn read_index(dir: &Path) -> Result<Option<String>, ResearchError> {
    let index = dir.join(INDEX_FILE);
    if !index.is_file() {
        return Ok(None);
    }
    Ok(Some(fs::read_to_string(index)?))
}

fn list_docs(project: &str, dir: &Path) -> Result<Vec<DocRef>, ResearchError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(file) = entry.file_name().to_str() {
            if file.ends_with(MARKDOWN_SUFFIX) {
                files.push(file.to_string());
            }
        }
    }
    files.sort();

    Ok(files
        .into_iter()
        .map(|file| DocRef {
            name: file
                .strip_suffix(MARKDOWN_SUFFIX)
                .unwrap_or(&file)
                .to_string(),
            path: format!("{project}/{file}"),
            file,
        })
        .collect())
}

fn first_lines(text: &str, count: usize) -> String {
    text.lines().take(count).collect::<Vec<_>>().join("\n")
}

/// `deep-learning-notes` -> `Deep learning notes`.
fn display_name(id: &str) -> String {
    let spaced = id.replace('-', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

/// Lexically resolves `.` and `..`; `None` if the path climbs above its start
/// or is absolute.
fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
