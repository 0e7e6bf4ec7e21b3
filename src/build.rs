//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: walking the article listing
//! ([`crate::listing`]), fetching and rendering every article
//! ([`crate::write`]), and copying the theme's static assets into the output
//! directory.

use crate::config::Config;
use crate::content::{ContentSource, Error as ContentError};
use crate::listing::{Error as ListingError, ListAccumulator};
use crate::write::{Error as WriteError, Writer};
use gtmpl::Template;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The page size used to enumerate every article slug. This is the largest
/// page the content API serves.
const ALL_UIDS_PAGE_SIZE: usize = 100;

/// What a build produced.
#[derive(Debug, Default, PartialEq)]
pub struct Summary {
    /// The number of listing pages written.
    pub listing_pages: usize,

    /// The number of articles on the last listing page.
    pub listed_articles: usize,

    /// The number of article pages written.
    pub articles: usize,
}

/// Builds the site described by `config` from the articles in `source`.
///
/// The listing is rendered one page per [`ListAccumulator`] state: page 0
/// holds the first batch, and each following page holds everything loaded so
/// far plus the next batch, until the content API reports no further page.
/// Every article of the configured type gets its own page.
pub fn build_site<S: ContentSource + ?Sized>(config: &Config, source: &S) -> Result<Summary> {
    // Parse the template files.
    let index_template = parse_template(config.index_template.iter())?;
    let post_template = parse_template(config.post_template.iter())?;

    // Only the directories we own are deleted; the output root may hold
    // other files.
    rmdir(&config.index_output_directory)?;
    rmdir(&config.posts_output_directory)?;
    rmdir(&config.static_output_directory)?;
    std::fs::create_dir_all(&config.index_output_directory)?;
    std::fs::create_dir_all(&config.posts_output_directory)?;

    let writer = Writer {
        index_template: &index_template,
        post_template: &post_template,
        index_base_url: &config.index_url,
        index_output_directory: &config.index_output_directory,
        posts_base_url: &config.posts_url,
        posts_output_directory: &config.posts_output_directory,
        root_output_directory: &config.root_output_directory,
        home_page: &config.home_page,
        static_url: &config.static_url,
        locale: config.locale,
        date_policy: config.date_policy,
    };

    let mut summary = Summary::default();

    // write the listing pages
    let content = &config.content;
    let first = source.query_by_type(&content.document_type, content.page_size)?;
    let mut list = ListAccumulator::initialize(first, config.locale, config.date_policy)?;
    loop {
        writer.write_listing(summary.listing_pages, &list)?;
        debug!(
            "Wrote listing page {} ({} articles)",
            summary.listing_pages,
            list.len()
        );
        summary.listing_pages += 1;
        if !list.can_load_more() {
            break;
        }
        list = list.load_more(source)?;
    }
    summary.listed_articles = list.len();
    info!(
        "Wrote {} listing pages with {} articles",
        summary.listing_pages, summary.listed_articles
    );

    // write the article pages
    for uid in source.all_uids(&content.document_type, ALL_UIDS_PAGE_SIZE)? {
        let article = source.get_by_uid(&content.document_type, &uid)?;
        let minutes = writer.write_article(&uid, &article)?;
        debug!("Wrote article '{}' ({} min)", uid, minutes);
        summary.articles += 1;
    }
    info!("Wrote {} article pages", summary.articles);

    // copy static directory
    if config.static_source_directory.is_dir() {
        copy_dir(
            &config.static_source_directory,
            &config.static_output_directory,
        )?;
    } else {
        warn!(
            "No static directory at '{}'; skipping",
            config.static_source_directory.display()
        );
    }

    Ok(summary)
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    use walkdir::WalkDir;
    for result in WalkDir::new(src) {
        let entry = result?;
        // strip_prefix shouldn't fail since `src` is always an ancestor of
        // `entry.path()`
        let target = match entry.path().strip_prefix(src) {
            Ok(relative) => dst.join(relative),
            Err(_) => continue,
        };
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for (i, template_file) in template_files.enumerate() {
        use std::io::Read;
        let template_file = template_file.as_ref();
        if i > 0 {
            contents.push(' ');
        }
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can come from the content API,
/// the listing, writing pages, cleaning output directories, parsing template
/// files, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned when an article query fails.
    Content(ContentError),

    /// Returned when the listing can't be built or extended.
    Listing(ListingError),

    /// Returned for errors writing pages to disk as HTML files.
    Write(WriteError),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for errors walking the static directory.
    WalkDir(walkdir::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Content(err) => write!(f, "{}", err),
            Error::Listing(err) => write!(f, "{}", err),
            Error::Write(err) => write!(f, "{}", err),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => write!(f, "{}", err),
            Error::WalkDir(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Content(err) => Some(err),
            Error::Listing(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::WalkDir(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ContentError> for Error {
    /// Converts [`ContentError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: ContentError) -> Error {
        Error::Content(err)
    }
}

impl From<ListingError> for Error {
    /// Converts [`ListingError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: ListingError) -> Error {
        Error::Listing(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}
