//! Company directory: a directory of companies plus curated, ordered lists
//! of them, served over HTTP with an embeddable HTML rendering of any list.
//!
//! The [`db`] module is the record store (SQLite); [`curation`] holds the
//! admin-facing operations with explicit actor checks; [`render`] turns a
//! list into an HTML fragment; [`import`] ingests loosely-typed company
//! rows from JSON documents.

pub mod api;
pub mod curation;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod render;
pub mod sanitize;
