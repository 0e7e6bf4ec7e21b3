//! The boundary to the headless content API. [`PageSource`] and
//! [`ContentSource`] describe the queries the rest of the crate needs;
//! [`PrismicClient`] implements them over HTTP against a Prismic-style REST
//! API.

use crate::article::{Article, Page};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::cell::RefCell;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Anything that can resolve a pagination cursor into the [`Page`] it points
/// to.
pub trait PageSource {
    /// Fetches the page at `cursor`. Fails if the request fails or the
    /// response isn't shaped like a [`Page`].
    fn fetch_page(&self, cursor: &Url) -> Result<Page>;
}

/// The queries the site build needs from the content API.
pub trait ContentSource: PageSource {
    /// Returns the first page of documents of `document_type`, `page_size`
    /// documents per page.
    fn query_by_type(&self, document_type: &str, page_size: usize) -> Result<Page>;

    /// Returns the single document of `document_type` whose slug is `uid`.
    fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Article>;

    /// Walks every page of `document_type` and collects the slugs of all
    /// documents in API order. Each slug appears once.
    fn all_uids(&self, document_type: &str, page_size: usize) -> Result<Vec<String>> {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        let mut uids = Vec::new();
        let mut page = self.query_by_type(document_type, page_size)?;
        loop {
            for uid in page.articles.into_iter().filter_map(|a| a.uid) {
                if seen.insert(uid.clone()) {
                    uids.push(uid);
                }
            }
            match page.next_cursor {
                Some(cursor) => page = self.fetch_page(&cursor)?,
                None => return Ok(uids),
            }
        }
    }
}

/// A blocking client for a Prismic-style REST API (`{endpoint}` is the API
/// root, e.g. `https://my-blog.cdn.prismic.io/api/v2`).
pub struct PrismicClient {
    endpoint: Url,
    access_token: Option<String>,
    http: Client,

    /// The master ref, looked up on first use.
    master_ref: RefCell<Option<String>>,
}

impl PrismicClient {
    /// Builds a client. Every request it makes is abandoned after `timeout`.
    pub fn new(
        endpoint: Url,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<PrismicClient> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Http {
                url: endpoint.to_string(),
                err,
            })?;
        Ok(PrismicClient {
            endpoint,
            access_token,
            http,
            master_ref: RefCell::new(None),
        })
    }

    /// Looks up the ref of the currently published content release. Search
    /// queries must name a ref.
    fn master_ref(&self) -> Result<String> {
        if let Some(master_ref) = self.master_ref.borrow().as_ref() {
            return Ok(master_ref.clone());
        }

        #[derive(Deserialize)]
        struct ApiRoot {
            refs: Vec<Ref>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Ref {
            #[serde(rename = "ref")]
            id: String,

            #[serde(default)]
            is_master_ref: bool,
        }

        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        let root: ApiRoot = self.get_json(&url)?;
        let master_ref = root
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.id)
            .ok_or(Error::NoMasterRef)?;
        debug!("Using master ref {}", master_ref);
        *self.master_ref.borrow_mut() = Some(master_ref.clone());
        Ok(master_ref)
    }

    /// The search for the first page of `document_type` documents, in the
    /// API's own order.
    fn type_query(&self, document_type: &str, page_size: usize) -> Result<Url> {
        self.search_url(
            &format!(r#"[at(document.type,"{}")]"#, query_value(document_type)?),
            page_size,
        )
    }

    /// The search for the `document_type` document whose slug is `uid`.
    fn uid_query(&self, document_type: &str, uid: &str) -> Result<Url> {
        self.search_url(
            &format!(
                r#"[at(my.{}.uid,"{}")]"#,
                query_value(document_type)?,
                query_value(uid)?
            ),
            1,
        )
    }

    /// Builds a `documents/search` URL for `predicate` against the master
    /// ref.
    fn search_url(&self, predicate: &str, page_size: usize) -> Result<Url> {
        let master_ref = self.master_ref()?;
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(&["documents", "search"]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("ref", &master_ref)
                .append_pair("q", &format!("[{}]", predicate))
                .append_pair("pageSize", &page_size.to_string());
            if let Some(token) = &self.access_token {
                query.append_pair("access_token", token);
            }
        }
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.http.get(url.clone()).send().map_err(|err| {
            warn!("Request to {} failed: {}", url, err);
            Error::from_reqwest(url, err)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned status {}", url, status);
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response
            .text()
            .map_err(|err| Error::from_reqwest(url, err))?;
        serde_json::from_str(&body).map_err(|err| {
            warn!("Malformed response from {}: {}", url, err);
            Error::Malformed {
                url: url.to_string(),
                err,
            }
        })
    }
}

impl PageSource for PrismicClient {
    fn fetch_page(&self, cursor: &Url) -> Result<Page> {
        self.get_json(cursor)
    }
}

impl ContentSource for PrismicClient {
    fn query_by_type(&self, document_type: &str, page_size: usize) -> Result<Page> {
        let url = self.type_query(document_type, page_size)?;
        self.get_json(&url)
    }

    fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Article> {
        let url = self.uid_query(document_type, uid)?;
        let page: Page = self.get_json(&url)?;
        page.articles
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(uid.to_owned()))
    }
}

// Predicate arguments are quoted strings with no escape syntax, so values
// that could close the string or the predicate are refused.
fn query_value(value: &str) -> Result<&str> {
    let unsafe_char = |c: char| matches!(c, '"' | '\\' | '[' | ']' | '(' | ')');
    if value.is_empty() || value.contains(unsafe_char) {
        Err(Error::InvalidQueryValue(value.to_owned()))
    } else {
        Ok(value)
    }
}

/// The result of a content API request.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed content API request.
#[derive(Debug)]
pub enum Error {
    /// Returned when the request couldn't be sent or its body couldn't be
    /// read.
    Http { url: String, err: reqwest::Error },

    /// Returned when the request didn't complete within the configured
    /// timeout.
    Timeout { url: String },

    /// Returned when the API answered with a non-success status.
    Status { url: String, status: StatusCode },

    /// Returned when the response body isn't the expected JSON shape.
    Malformed {
        url: String,
        err: serde_json::Error,
    },

    /// Returned when no document has the requested slug.
    NotFound(String),

    /// Returned when the API root lists no master ref.
    NoMasterRef,

    /// Returned when the configured endpoint can't have a path appended.
    InvalidEndpoint(String),

    /// Returned when a slug or document type contains characters that can't
    /// appear in a query predicate (`"`, `\`, brackets or parentheses).
    InvalidQueryValue(String),
}

impl Error {
    fn from_reqwest(url: &Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                url: url.to_string(),
            }
        } else {
            Error::Http {
                url: url.to_string(),
                err,
            }
        }
    }

    /// Whether the request was abandoned because it took too long.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Http { url, err } => write!(f, "Fetching '{}': {}", url, err),
            Error::Timeout { url } => write!(f, "Fetching '{}': timed out", url),
            Error::Status { url, status } => {
                write!(f, "Fetching '{}': server returned {}", url, status)
            }
            Error::Malformed { url, err } => {
                write!(f, "Fetching '{}': malformed response: {}", url, err)
            }
            Error::NotFound(uid) => write!(f, "No article with slug '{}'", uid),
            Error::NoMasterRef => write!(f, "Content API has no master ref"),
            Error::InvalidEndpoint(endpoint) => {
                write!(f, "Invalid content API endpoint '{}'", endpoint)
            }
            Error::InvalidQueryValue(value) => {
                write!(f, "'{}' can't be used in a content query", value)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http { url: _, err } => Some(err),
            Error::Malformed { url: _, err } => Some(err),
            _ => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeSource;
    use super::*;

    fn article(uid: &str) -> Article {
        Article {
            id: uid.to_uppercase(),
            uid: Some(uid.to_owned()),
            ..Article::default()
        }
    }

    fn cursor(n: usize) -> Url {
        Url::parse(&format!("https://cms.example.org/search?page={}", n)).unwrap()
    }

    #[test]
    fn test_all_uids_walks_every_page() -> Result<()> {
        let mut source = FakeSource::default();
        source.first = Page {
            articles: vec![article("a"), article("b")],
            next_cursor: Some(cursor(2)),
        };
        source.pages.insert(
            cursor(2).to_string(),
            Page {
                articles: vec![article("b"), Article::default(), article("c")],
                next_cursor: None,
            },
        );
        assert_eq!(vec!["a", "b", "c"], source.all_uids("po", 2)?);
        Ok(())
    }

    #[test]
    fn test_all_uids_propagates_failures() {
        let mut source = FakeSource::default();
        source.first.next_cursor = Some(cursor(2));
        assert!(matches!(
            source.all_uids("po", 2),
            Err(Error::Status { .. })
        ));
    }

    #[test]
    fn test_timeout_is_distinguished() {
        let err = Error::Timeout {
            url: cursor(3).to_string(),
        };
        assert!(err.is_timeout());
        assert!(!Error::NoMasterRef.is_timeout());
        assert_eq!(
            "Fetching 'https://cms.example.org/search?page=3': timed out",
            err.to_string()
        );
    }

    fn client(token: Option<&str>) -> Result<PrismicClient> {
        let client = PrismicClient::new(
            Url::parse("https://folha.cdn.prismic.io/api/v2").unwrap(),
            token.map(str::to_owned),
            Duration::from_secs(1),
        )?;
        *client.master_ref.borrow_mut() = Some("REF".to_owned());
        Ok(client)
    }

    fn pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_owned(), v.to_owned())
    }

    #[test]
    fn test_type_query() -> Result<()> {
        let url = client(None)?.type_query("po", 1)?;
        assert_eq!("/api/v2/documents/search", url.path());
        assert_eq!(
            vec![
                pair("ref", "REF"),
                pair("q", r#"[[at(document.type,"po")]]"#),
                pair("pageSize", "1"),
            ],
            pairs(&url)
        );
        Ok(())
    }

    #[test]
    fn test_uid_query_with_token() -> Result<()> {
        let url = client(Some("secret"))?.uid_query("po", "como-utilizar-hooks")?;
        assert_eq!(
            vec![
                pair("ref", "REF"),
                pair("q", r#"[[at(my.po.uid,"como-utilizar-hooks")]]"#),
                pair("pageSize", "1"),
                pair("access_token", "secret"),
            ],
            pairs(&url)
        );
        Ok(())
    }

    #[test]
    fn test_unsafe_query_values_are_refused() -> Result<()> {
        let client = client(None)?;
        for uid in &["", r#"a"b"#, "a)b", "a]b", r"a\b"] {
            assert!(matches!(
                client.uid_query("po", uid),
                Err(Error::InvalidQueryValue(_))
            ));
        }
        assert!(matches!(
            client.type_query("p\"o", 1),
            Err(Error::InvalidQueryValue(_))
        ));
        assert!(client.uid_query("po", "post-ção-2").is_ok());
        Ok(())
    }

    /// Serves `responses` (status line, JSON body) to one connection each and
    /// returns the request targets it saw.
    fn serve(
        responses: Vec<(&'static str, &'static str)>,
    ) -> std::io::Result<(Url, std::thread::JoinHandle<Vec<String>>)> {
        use std::io::{BufRead, BufReader, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let endpoint = Url::parse(&format!("http://{}/api/v2", listener.local_addr()?)).unwrap();
        let handle = std::thread::spawn(move || {
            let mut targets = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                targets.push(line.split(' ').nth(1).unwrap_or_default().to_owned());
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header.trim().is_empty() {
                        break;
                    }
                }
                write!(
                    stream,
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                )
                .unwrap();
            }
            targets
        });
        Ok((endpoint, handle))
    }

    const API_ROOT: &str = r#"{"refs": [
        {"id": "preview", "ref": "OTHER", "isMasterRef": false},
        {"id": "master", "ref": "REF", "isMasterRef": true}
    ]}"#;

    #[test]
    fn test_get_by_uid_over_http() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let (endpoint, server) = serve(vec![
            ("200 OK", API_ROOT),
            (
                "200 OK",
                r#"{"results": [{"id": "X", "uid": "hooks", "data": {"title": "Hooks"}}], "next_page": null}"#,
            ),
        ])?;
        let client = PrismicClient::new(endpoint.clone(), None, Duration::from_secs(5))?;

        let article = client.get_by_uid("po", "hooks")?;
        assert_eq!("Hooks", article.title);
        assert_eq!(Some("hooks"), article.uid.as_deref());

        let targets = server.join().map_err(|_| "server panicked")?;
        assert_eq!("/api/v2", targets[0]);
        let search = endpoint.join(&targets[1])?;
        assert_eq!("/api/v2/documents/search", search.path());
        assert!(pairs(&search).contains(&pair("ref", "REF")));
        assert!(pairs(&search).contains(&pair("q", r#"[[at(my.po.uid,"hooks")]]"#)));
        Ok(())
    }

    #[test]
    fn test_missing_article_over_http() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let (endpoint, server) = serve(vec![
            ("200 OK", API_ROOT),
            ("200 OK", r#"{"results": [], "next_page": null}"#),
        ])?;
        let client = PrismicClient::new(endpoint, None, Duration::from_secs(5))?;
        assert!(matches!(
            client.get_by_uid("po", "nope"),
            Err(Error::NotFound(uid)) if uid == "nope"
        ));
        server.join().map_err(|_| "server panicked")?;
        Ok(())
    }

    #[test]
    fn test_error_status() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let (endpoint, server) = serve(vec![("404 Not Found", "{}")])?;
        let client = PrismicClient::new(endpoint, None, Duration::from_secs(5))?;
        match client.query_by_type("po", 1) {
            Err(Error::Status { status, .. }) => assert_eq!(StatusCode::NOT_FOUND, status),
            other => panic!("wanted a status error, got {:?}", other),
        }
        server.join().map_err(|_| "server panicked")?;
        Ok(())
    }

    #[test]
    fn test_malformed_response() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let (endpoint, server) = serve(vec![("200 OK", "<html>")])?;
        let client = PrismicClient::new(endpoint.clone(), None, Duration::from_secs(5))?;
        let cursor = endpoint.join("documents/search?page=2")?;
        assert!(matches!(
            client.fetch_page(&cursor),
            Err(Error::Malformed { .. })
        ));
        server.join().map_err(|_| "server panicked")?;
        Ok(())
    }

    #[test]
    fn test_no_master_ref() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let (endpoint, server) = serve(vec![("200 OK", r#"{"refs": []}"#)])?;
        let client = PrismicClient::new(endpoint, None, Duration::from_secs(5))?;
        assert!(matches!(client.query_by_type("po", 1), Err(Error::NoMasterRef)));
        server.join().map_err(|_| "server panicked")?;
        Ok(())
    }
}
