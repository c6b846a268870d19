#![doc = "repo-indexer-core: crawl, filter, index and reconcile logic for repo-indexer."]

//! This crate contains all business logic for mirroring remote repository trees into a local
//! staging area and keeping a search index in step with them.
//! Concrete index transport is not included here: it is consumed through
//! [`contract::IndexClient`].
//!
//! # Usage
//! Build a [`config::CrawlConfig`], a [`synchronise::RunContext`], a fetcher and an index
//! client, then call [`synchronise::synchronise`].

pub mod config;
pub mod contract;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod probe;
pub mod reconcile;
pub mod stage;
pub mod synchronise;
pub mod walk;
