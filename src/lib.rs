//! Civic information aggregation pipeline.
//!
//! Work flows through these modules in order:
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | load and validate the source catalog, keyword tables and run profiles |
//! | [`queries`] | expand topic templates into dated, qualified search queries |
//! | [`fetch`] | fast HTTP fetch with a headless-render fallback |
//! | [`extract`] | turn markup into candidates via tiered strategies |
//! | [`score`] | keyword-class relevance scoring and the admission gate |
//! | [`dedup`] | collapse duplicates to one highest-scored survivor |
//! | [`window`] | recency window, ranking and truncation |
//! | [`pipeline`] | bounded, rate-limited fan-out tying it all together |
//! | [`outputs`] | sinks for the finished records |

pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod queries;
pub mod score;
pub mod utils;
pub mod window;
