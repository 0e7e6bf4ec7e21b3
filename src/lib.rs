//! The library code for the `folha` static blog generator. Articles live in a
//! headless content API; a build pulls them down and renders two kinds of
//! page:
//!
//! 1. Listing pages ([`crate::listing`]). The content API pages its results
//!    and hands out a cursor for the next batch. Each listing page shows
//!    every article loaded so far and links to the page that loads one more
//!    batch, until the cursor runs out.
//! 2. Article pages, with the body rendered from structured text
//!    ([`crate::richtext`]) and an estimated reading time
//!    ([`crate::reading_time`]).
//!
//! [`crate::build::build_site`] ties these together and [`crate::write`]
//! applies the theme's templates. Publication dates are formatted for display
//! by [`crate::date`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod article;
pub mod build;
pub mod config;
pub mod content;
pub mod date;
pub mod listing;
pub mod reading_time;
pub mod richtext;
pub mod write;
