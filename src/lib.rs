//! # devrank
//!
//! Collects public GitHub profiles per location, enriches them with profile
//! details and contribution counts, and ranks them three ways: by followers,
//! by public contributions, and by total contributions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │  Search  │──▶│  Enrich  │──▶│   Rank   │──▶│  Store   │
//! │ (paged)  │   │ (5 wide) │   │ (3 views)│   │  (JSON)  │
//! └──────────┘   └──────────┘   └──────────┘   └────┬─────┘
//!       ▲                                           │
//!       │ GitHubClient (delay + cooldown)           ▼
//!                                             ┌──────────┐
//!                                             │   HTTP   │
//!                                             │ (serve)  │
//!                                             └──────────┘
//! ```
//!
//! Locations run one after another; a checkpoint saved after each one lets
//! an interrupted run resume where it stopped.
//!
//! ## Quick Start
//!
//! ```bash
//! export GITHUB_TOKEN=ghp_...
//! devrank locations          # list configured locations
//! devrank collect            # run (or resume) a collection
//! devrank status             # checkpoint and summary
//! devrank serve              # read-only HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credentials |
//! | [`error`] | API error taxonomy |
//! | [`models`] | Core data types |
//! | [`client`] | Rate-limited GitHub client |
//! | [`search`] | Paginated user search |
//! | [`enrich`] | Profile enrichment with bounded concurrency |
//! | [`rank`] | Ranked views |
//! | [`checkpoint`] | Resumable run state |
//! | [`store`] | Output files |
//! | [`pipeline`] | Collection orchestration |
//! | [`progress`] | Progress reporting |
//! | [`logging`] | Tracing setup |
//! | [`status`] | `locations` and `status` commands |
//! | [`server`] | Read-only HTTP server |

pub mod checkpoint;
pub mod client;
pub mod config;
pub mod enrich;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod rank;
pub mod search;
pub mod server;
pub mod status;
pub mod store;
