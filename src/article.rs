//! Defines the [`Article`] model and its parts ([`Section`], [`TextBlock`],
//! [`Banner`]), the [`Page`] of articles returned by the content API, and the
//! [`DisplayArticle`] projection used by listing pages.
//!
//! The content API speaks in "documents" whose fields live under a `data`
//! object. The wire types in this module mirror that layout and are converted
//! into the flatter [`Article`] on deserialization.

use crate::date::{self, DatePolicy, Locale};
use serde::Deserialize;
use url::Url;

/// An article as fetched from the content API. Articles are never modified
/// after they are fetched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "Document")]
pub struct Article {
    /// The content API's opaque identifier for the document.
    pub id: String,

    /// The article's slug. Listing entries link to `post/{uid}.html`.
    pub uid: Option<String>,

    /// The first publication timestamp (ISO-8601). Drafts that were never
    /// published don't have one.
    pub published_at: Option<String>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner: Banner,

    /// The article body. Listing queries usually carry it too, but only the
    /// article page reads it.
    pub content: Vec<Section>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Banner {
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
}

/// A titled block of article content.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "nullable")]
    pub heading: String,

    #[serde(default)]
    pub body: Vec<TextBlock>,
}

/// A single block of structured text. `text` is the plain text that the
/// reading-time estimate counts; `kind` and `spans` carry the formatting that
/// [`crate::richtext`] turns into markup.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TextBlock {
    #[serde(default, deserialize_with = "nullable")]
    pub text: String,

    /// The block type, e.g. `paragraph`, `heading2` or `list-item`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Source and alt text of an `image` block.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,

    /// The provider's markup for an `embed` block.
    #[serde(default)]
    pub oembed: Option<Embed>,
}

impl TextBlock {
    /// Creates an unformatted paragraph block.
    pub fn plain(text: &str) -> TextBlock {
        TextBlock {
            text: text.to_owned(),
            ..TextBlock::default()
        }
    }
}

/// oEmbed data attached to an `embed` block.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
}

/// Inline formatting over the character range `start..end` of a
/// [`TextBlock`]'s text.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,

    /// `strong`, `em`, `hyperlink` or `label`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SpanData {
    /// Target of a `hyperlink` span.
    #[serde(default)]
    pub url: Option<String>,

    /// Set to `_blank` on hyperlinks that open in a new window.
    #[serde(default)]
    pub target: Option<String>,

    /// Class name of a `label` span.
    #[serde(default)]
    pub label: Option<String>,
}

/// One page of a paginated article query. `next_cursor` is `None` on the
/// last page.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Page {
    #[serde(rename = "results")]
    pub articles: Vec<Article>,

    #[serde(rename = "next_page", default)]
    pub next_cursor: Option<Url>,
}

/// The listing projection of an [`Article`], with the publication date
/// already formatted for display.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayArticle {
    pub id: String,
    pub uid: Option<String>,
    pub published_at: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl DisplayArticle {
    /// Projects `article`, formatting its publication date with `locale`.
    /// Under [`DatePolicy::Lenient`] a missing or unparsable date becomes an
    /// empty string.
    pub fn new(
        article: &Article,
        locale: Locale,
        policy: DatePolicy,
    ) -> Result<DisplayArticle, date::Error> {
        Ok(DisplayArticle {
            id: article.id.clone(),
            uid: article.uid.clone(),
            published_at: date::format_or_placeholder(
                article.published_at.as_deref(),
                locale,
                policy,
            )?,
            title: article.title.clone(),
            subtitle: article.subtitle.clone(),
            author: article.author.clone(),
        })
    }
}

// The content API returns `null` for empty text fields, which serde's
// `default` doesn't cover.
fn nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    id: String,

    #[serde(default)]
    uid: Option<String>,

    #[serde(default)]
    first_publication_date: Option<String>,

    #[serde(default)]
    data: DocumentData,
}

#[derive(Deserialize, Default)]
struct DocumentData {
    #[serde(default, deserialize_with = "nullable")]
    title: String,

    #[serde(default, deserialize_with = "nullable")]
    subtitle: String,

    #[serde(default, deserialize_with = "nullable")]
    author: String,

    #[serde(default)]
    banner: Option<Banner>,

    #[serde(default)]
    content: Option<Vec<Section>>,
}

impl From<Document> for Article {
    fn from(doc: Document) -> Article {
        Article {
            id: doc.id,
            uid: doc.uid,
            published_at: doc.first_publication_date,
            title: doc.data.title,
            subtitle: doc.data.subtitle,
            author: doc.data.author,
            banner: doc.data.banner.unwrap_or_default(),
            content: doc.data.content.unwrap_or_default(),
        }
    }
}
