//! Templates listing and article pages and writes them to disk. See
//! [`Writer::write_listing`] and [`Writer::write_article`] for the values each
//! template receives.

use crate::article::{Article, DisplayArticle};
use crate::date::{self, DatePolicy, Locale};
use crate::listing::ListAccumulator;
use crate::{reading_time, richtext};
use gtmpl::{Template, Value};
use pulldown_cmark::escape::{escape_href, escape_html};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Responsible for templating and writing HTML pages.
pub struct Writer<'a> {
    /// The template for listing pages.
    pub index_template: &'a Template,

    /// The template for article pages.
    pub post_template: &'a Template,

    /// The base URL for listing pages. Listing state `n` is located at
    /// `{index_base_url}{n}.html`.
    pub index_base_url: &'a Url,

    /// The directory in which listing pages are written.
    pub index_output_directory: &'a Path,

    /// The base URL for article pages. The article with slug `uid` is located
    /// at `{posts_base_url}{uid}.html`.
    pub posts_base_url: &'a Url,

    /// The directory in which article pages are written.
    pub posts_output_directory: &'a Path,

    /// The site's output root. The first listing page is also written here
    /// as `index.html`.
    pub root_output_directory: &'a Path,

    /// The URL for the site's home page, made available to both templates.
    pub home_page: &'a Url,

    /// The URL for the static assets, made available to both templates.
    pub static_url: &'a Url,

    pub locale: Locale,
    pub date_policy: DatePolicy,
}

impl Writer<'_> {
    /// Writes listing state `n` (the state after `n` loads). The template
    /// receives:
    ///
    /// * `articles`: the loaded articles, each with `id`, `uid`, `url`,
    ///   `title`, `subtitle`, `author` and `published_at`
    /// * `prev`, `next`: the neighbouring listing pages, or nil
    /// * `cursor`: the content API URL of the next batch, or nil
    /// * `home_page`, `static_url`
    pub fn write_listing(&self, n: usize, list: &ListAccumulator) -> Result<()> {
        let mut m = self.common();
        m.insert(
            "articles".to_owned(),
            Value::Array(
                list.articles()
                    .iter()
                    .map(|a| self.display_article_value(a))
                    .collect::<Result<_>>()?,
            ),
        );
        m.insert(
            "prev".to_owned(),
            match n {
                0 => Value::Nil,
                _ => Value::String(self.listing_url(n - 1)?.to_string()),
            },
        );
        m.insert(
            "next".to_owned(),
            match list.can_load_more() {
                false => Value::Nil,
                true => Value::String(self.listing_url(n + 1)?.to_string()),
            },
        );
        m.insert(
            "cursor".to_owned(),
            match list.cursor() {
                None => Value::Nil,
                Some(cursor) => href(cursor.as_str())?,
            },
        );

        let value = Value::Object(m);
        let file_path = self.index_output_directory.join(format!("{}.html", n));
        render(self.index_template, &value, &file_path)?;
        if n == 0 {
            render(
                self.index_template,
                &value,
                &self.root_output_directory.join("index.html"),
            )?;
        }
        Ok(())
    }

    /// Writes the page for `article` to `{posts_output_directory}/{uid}.html`
    /// and returns its estimated reading time in minutes. The template
    /// receives `title`, `subtitle`, `author`, `published_at`, `banner_url`,
    /// `reading_time` (e.g. `4 min`), `sections` (each with `heading` and the
    /// rendered `html` of its body), `home_page` and `static_url`.
    pub fn write_article(&self, uid: &str, article: &Article) -> Result<usize> {
        let minutes = reading_time::estimate(&article.content);

        let mut m = self.common();
        m.insert("url".to_owned(), Value::String(self.article_url(uid)?.to_string()));
        m.insert("title".to_owned(), text(&article.title)?);
        m.insert("subtitle".to_owned(), text(&article.subtitle)?);
        m.insert("author".to_owned(), text(&article.author)?);
        m.insert(
            "published_at".to_owned(),
            text(&date::format_or_placeholder(
                article.published_at.as_deref(),
                self.locale,
                self.date_policy,
            )?)?,
        );
        m.insert("banner_url".to_owned(), href(&article.banner.url)?);
        m.insert(
            "reading_time".to_owned(),
            Value::String(format!("{} min", minutes)),
        );
        m.insert(
            "sections".to_owned(),
            Value::Array(
                article
                    .content
                    .iter()
                    .map(|section| -> Result<Value> {
                        let mut s = HashMap::new();
                        s.insert("heading".to_owned(), text(&section.heading)?);
                        s.insert(
                            "html".to_owned(),
                            Value::String(richtext::as_html(&section.body)?),
                        );
                        Ok(Value::Object(s))
                    })
                    .collect::<Result<_>>()?,
            ),
        );

        render(
            self.post_template,
            &Value::Object(m),
            &self.posts_output_directory.join(format!("{}.html", uid)),
        )?;
        Ok(minutes)
    }

    fn common(&self) -> HashMap<String, Value> {
        let mut m = HashMap::new();
        m.insert(
            "home_page".to_owned(),
            Value::String(self.home_page.to_string()),
        );
        m.insert(
            "static_url".to_owned(),
            Value::String(self.static_url.to_string()),
        );
        m
    }

    fn display_article_value(&self, article: &DisplayArticle) -> Result<Value> {
        let mut m = HashMap::new();
        m.insert("id".to_owned(), text(&article.id)?);
        m.insert("title".to_owned(), text(&article.title)?);
        m.insert("subtitle".to_owned(), text(&article.subtitle)?);
        m.insert("author".to_owned(), text(&article.author)?);
        m.insert("published_at".to_owned(), text(&article.published_at)?);
        match &article.uid {
            Some(uid) => {
                m.insert("uid".to_owned(), text(uid)?);
                m.insert(
                    "url".to_owned(),
                    Value::String(self.article_url(uid)?.to_string()),
                );
            }
            None => {
                m.insert("uid".to_owned(), Value::Nil);
                m.insert("url".to_owned(), Value::Nil);
            }
        }
        Ok(Value::Object(m))
    }

    fn listing_url(&self, n: usize) -> Result<Url> {
        Ok(self.index_base_url.join(&format!("{}.html", n))?)
    }

    fn article_url(&self, uid: &str) -> Result<Url> {
        Ok(self.posts_base_url.join(&format!("{}.html", uid))?)
    }
}

/// Applies `template` to `value` and writes the result to `file_path`.
fn render(template: &Template, value: &Value, file_path: &Path) -> Result<()> {
    template
        .execute(
            &mut std::fs::File::create(file_path).map_err(|err| Error::Create {
                path: file_path.to_owned(),
                err,
            })?,
            &gtmpl::Context::from(value.clone())?,
        )
        .map_err(Error::Template)
}

/// HTML-escapes plain text for templating.
fn text(s: &str) -> Result<Value> {
    let mut escaped = String::with_capacity(s.len());
    escape_html(&mut escaped, s)?;
    Ok(Value::String(escaped))
}

/// Escapes a URL for use in an attribute.
fn href(s: &str) -> Result<Value> {
    let mut escaped = String::with_capacity(s.len());
    escape_href(&mut escaped, s)?;
    Ok(Value::String(escaped))
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error creating an output file.
    Create { path: PathBuf, err: io::Error },

    /// An article's date couldn't be displayed.
    Date(date::Error),

    /// A page URL couldn't be built.
    Url(url::ParseError),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<date::Error> for Error {
    fn from(err: date::Error) -> Error {
        Error::Date(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => write!(f, "{}", err),
            Error::Create { path, err } => {
                write!(f, "Creating '{}': {}", path.display(), err)
            }
            Error::Date(err) => write!(f, "{}", err),
            Error::Url(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Create { path: _, err } => Some(err),
            Error::Date(err) => Some(err),
            Error::Url(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}
