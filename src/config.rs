//! Loads the site [`Config`] from a `folha.yaml` project file and the
//! `theme/theme.yaml` next to it.

use crate::date::{DatePolicy, Locale};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// The name of the project file that [`Config::from_directory`] looks for.
pub const PROJECT_FILE: &str = "folha.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
struct TimeoutSecs(u64);
impl Default for TimeoutSecs {
    fn default() -> Self {
        TimeoutSecs(10)
    }
}

fn default_document_type() -> String {
    String::from("po")
}

#[derive(Deserialize)]
struct Project {
    pub site_root: Url,

    #[serde(default)]
    pub home_page: Option<String>,

    #[serde(default)]
    pub locale: Locale,

    #[serde(default)]
    pub date_policy: DatePolicy,

    pub content: Content,
}

#[derive(Deserialize)]
struct Content {
    pub endpoint: Url,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_document_type")]
    pub document_type: String,

    #[serde(default)]
    pub page_size: PageSize,

    #[serde(default)]
    pub timeout_secs: TimeoutSecs,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    post_template: Vec<PathBuf>,
}

/// Where and how to query the content API.
#[derive(Clone, Debug)]
pub struct ContentConfig {
    /// The API root, e.g. `https://my-blog.cdn.prismic.io/api/v2`.
    pub endpoint: Url,
    pub access_token: Option<String>,

    /// The document type that holds articles.
    pub document_type: String,

    /// The number of articles per listing page.
    pub page_size: usize,

    /// The limit for each request to the API.
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct Config {
    pub content: ContentConfig,
    pub locale: Locale,
    pub date_policy: DatePolicy,

    pub home_page: Url,
    pub index_url: Url,
    pub posts_url: Url,
    pub static_url: Url,

    pub index_template: Vec<PathBuf>,
    pub post_template: Vec<PathBuf>,

    pub static_source_directory: PathBuf,
    pub root_output_directory: PathBuf,
    pub index_output_directory: PathBuf,
    pub posts_output_directory: PathBuf,
    pub static_output_directory: PathBuf,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for a `folha.yaml`
    /// and loads the first one found. A relative `dir` is resolved against
    /// the current directory first.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let dir = dir
            .canonicalize()
            .with_context(|| format!("Resolving project directory `{}`", dir.display()))?;
        Config::search(&dir, output_directory)
    }

    fn search(dir: &Path, output_directory: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory)
                .with_context(|| format!("Loading configuration from `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::search(parent, output_directory),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;

        let theme_dir = project_root.join("theme");
        let theme: Theme =
            serde_yaml::from_reader(open(&theme_dir.join("theme.yaml"), "theme")?)?;

        // `Url::join` treats the last segment of a URL without a trailing
        // slash as a file name and replaces it.
        let mut site_root = project.site_root;
        if !site_root.path().ends_with('/') {
            let path = format!("{}/", site_root.path());
            site_root.set_path(&path);
        }

        Ok(Config {
            content: ContentConfig {
                endpoint: project.content.endpoint,
                access_token: project.content.access_token,
                document_type: project.content.document_type,
                page_size: project.content.page_size.0.max(1),
                timeout: Duration::from_secs(project.content.timeout_secs.0.max(1)),
            },
            locale: project.locale,
            date_policy: project.date_policy,
            home_page: site_root.join(project.home_page.as_deref().unwrap_or("index.html"))?,
            index_url: site_root.join("pages/")?,
            posts_url: site_root.join("post/")?,
            static_url: site_root.join("static/")?,
            index_template: theme
                .index_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            post_template: theme
                .post_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            static_source_directory: theme_dir.join("static"),
            root_output_directory: output_directory.to_owned(),
            index_output_directory: output_directory.join("pages"),
            posts_output_directory: output_directory.join("post"),
            static_output_directory: output_directory.join("static"),
        })
    }
}

fn open(path: &Path, kind: &str) -> Result<File> {
    File::open(path).with_context(|| format!("Opening {} file `{}`", kind, path.display()))
}
