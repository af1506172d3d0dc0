//! # rmq-api
//!
//! A client for the RabbitMQ HTTP management API, built on [`rmq_web`].
//!
//! ## Features
//!
//! - **Config**: scheme, host, port, credentials and the list options sent
//!   with every call
//! - **Paging**: [`PageFilter`] for the queue, exchange, connection and
//!   channel lists
//! - **Endpoints**: overview, nodes, definitions, connections, queues,
//!   virtual hosts, users, parameters, federation links and health checks
//! - **Status errors**: responses outside 2xx become [`ApiError::Status`]
//!   with the password redacted from the URL
//! - **Output**: [`print_json`] and Graphviz topology via [`topology::to_dot`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rmq_api::{Client, Config, PageFilter, print_json};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rmq_api::ApiError> {
//!     let client = Client::new(Config::default());
//!     let page = PageFilter::new_page_filter(1, 50, "orders.*", true);
//!     let queues = client.vhost_queues("/", Some(&page)).await?;
//!     print_json(&mut std::io::stdout(), &queues, true)?;
//!     Ok(())
//! }
//! ```

mod client;
mod endpoints;
mod error;
mod print;

pub mod config;
pub mod dto;
pub mod page;
pub mod topology;

pub use client::Client;
pub use config::Config;
pub use endpoints::TimeUnit;
pub use error::{ApiError, Result};
pub use page::PageFilter;
pub use print::print_json;
