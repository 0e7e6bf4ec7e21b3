//! Defines [`ListAccumulator`], the state behind the listing pages: the
//! articles loaded so far plus the cursor for the next batch.
//!
//! A [`ListAccumulator`] is never modified. [`ListAccumulator::load_more`]
//! borrows the current state and returns the next one, so a failed fetch
//! leaves the caller holding the state it started with, and a state can't be
//! extended twice at once.

use crate::article::{DisplayArticle, Page};
use crate::content::{self, PageSource};
use crate::date::{self, DatePolicy, Locale};
use std::fmt;
use tracing::debug;
use url::Url;

#[derive(Clone, Debug, PartialEq)]
pub struct ListAccumulator {
    articles: Vec<DisplayArticle>,
    cursor: Option<Url>,
    locale: Locale,
    policy: DatePolicy,
}

impl ListAccumulator {
    /// Builds the first state from the initial `page`. Each article's date
    /// is formatted with `locale`; the page's cursor is kept as-is.
    pub fn initialize(
        page: Page,
        locale: Locale,
        policy: DatePolicy,
    ) -> Result<ListAccumulator> {
        Ok(ListAccumulator {
            articles: display(&page, locale, policy)?,
            cursor: page.next_cursor,
            locale,
            policy,
        })
    }

    /// Fetches the page at the current cursor and returns a new state with
    /// its articles appended, in order, after the ones already loaded.
    /// Articles that appear on more than one page are kept every time they
    /// appear.
    ///
    /// Fails with [`Error::NoMorePages`] once the last page has been loaded,
    /// and with [`Error::Fetch`] if the page can't be fetched. `self` is left
    /// as it was in either case.
    pub fn load_more<S: PageSource + ?Sized>(&self, source: &S) -> Result<ListAccumulator> {
        let cursor = self.cursor.as_ref().ok_or(Error::NoMorePages)?;
        let page = source.fetch_page(cursor)?;
        let batch = display(&page, self.locale, self.policy)?;
        debug!(
            "Loaded {} more articles from {} (next: {:?})",
            batch.len(),
            cursor,
            page.next_cursor.as_ref().map(Url::as_str),
        );

        let mut articles = Vec::with_capacity(self.articles.len() + batch.len());
        articles.extend(self.articles.iter().cloned());
        articles.extend(batch);
        Ok(ListAccumulator {
            articles,
            cursor: page.next_cursor,
            locale: self.locale,
            policy: self.policy,
        })
    }

    /// Whether there is a further page to load.
    pub fn can_load_more(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn articles(&self) -> &[DisplayArticle] {
        &self.articles
    }

    pub fn cursor(&self) -> Option<&Url> {
        self.cursor.as_ref()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

fn display(
    page: &Page,
    locale: Locale,
    policy: DatePolicy,
) -> Result<Vec<DisplayArticle>> {
    page.articles
        .iter()
        .map(|article| DisplayArticle::new(article, locale, policy))
        .collect::<std::result::Result<_, _>>()
        .map_err(Error::Date)
}

/// The result of a [`ListAccumulator`] operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to build or extend a [`ListAccumulator`].
#[derive(Debug)]
pub enum Error {
    /// Returned by [`ListAccumulator::load_more`] after the last page.
    NoMorePages,

    /// Returned when the next page couldn't be fetched or wasn't a
    /// well-formed page. Check [`content::Error::is_timeout`] to tell a
    /// timeout from other failures.
    Fetch(content::Error),

    /// Returned when an article's date can't be displayed under
    /// [`DatePolicy::Strict`].
    Date(date::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoMorePages => write!(f, "There are no more articles to load"),
            Error::Fetch(err) => write!(f, "Loading more articles: {}", err),
            Error::Date(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NoMorePages => None,
            Error::Fetch(err) => Some(err),
            Error::Date(err) => Some(err),
        }
    }
}

impl From<content::Error> for Error {
    /// Converts [`content::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator on fetches.
    fn from(err: content::Error) -> Error {
        Error::Fetch(err)
    }
}
