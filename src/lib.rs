//! # rwlc - Wireless LAN Controller Inventory over CLI Sessions
//!
//! `rwlc` polls a wireless LAN controller over its SSH command line to build
//! an inventory of the attached access points and to push configuration
//! changes to them. Controller output is screen-scraped into typed records.
//!
//! ## Features
//!
//! - **Pooled Harvest**: AP detail is fetched over a small pool of concurrent
//!   sessions, reassembled in discovery order
//! - **Screen-Scrape Parsing**: Whitespace-tolerant extraction of AP detail,
//!   CDP neighbors, Ethernet counters and LAN port state
//! - **Prompt Detection**: Regex state machine for the controller shell,
//!   including pagination, in-shell login and yes/no questions
//! - **Mutations**: Rename, group change, reboot, factory reset, LAN port
//!   changes and save, with settle delay and configurable confirmation
//! - **Offline Replay**: Record sessions to JSONL and replay them in tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rwlc::config::ControllerConfig;
//! use rwlc::controller::Controller;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ControllerConfig::new("10.0.0.5", "admin", "password");
//!     let mut wlc = Controller::ssh(config)?;
//!     wlc.connect().await?;
//!
//!     let aps = wlc.harvest_inventory().await?;
//!     println!("{}", rwlc::model::inventory_to_json(&aps)?);
//!
//!     wlc.logout().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`controller::Controller`] - Controller session, queries and mutations
//! - [`pool::SessionPool`] - Bounded pool of connected sessions
//! - [`harvest`] - Discover, fan out, fan in
//! - [`parse`] - Screen-scrape parsers
//! - [`session::DeviceSession`] - Session capability, SSH and replay implementations
//! - [`error::WlcError`] - Error types for sessions, pools and AP operations

pub mod api;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod harvest;
pub mod model;
pub mod mutation;
pub mod parse;
pub mod pool;
pub mod session;
pub mod templates;
