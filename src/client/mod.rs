// src/client/mod.rs

//! GitHub GraphQL API client layer.
//!
//! The transport executes one query/response exchange at a time, rotating
//! credentials and backing off as the decision table in `graphql` dictates.

mod graphql;
mod queries;
mod rotator;

pub use graphql::{CallOutcome, GraphQlClient, SearchOutcome};
pub use queries::{SortMode, build_search_query, readme_request, search_request};
pub use rotator::{QuotaObservation, TokenRotator};
