//! Kubernetes API Client
//!
//! A Rust client library for the Kubernetes REST API.
//! Provides typed resource models, generic CRUD executors, and a typed
//! list/watch adapter that turns the API server's change stream into
//! per-kind event channels.
//!
//! # Example
//!
//! ```no_run
//! use k8s_client::{KubeClient, ClientConfig, LabelSelector, WatchOptions, WatchEventType};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClient::new(ClientConfig::from_env()?)?;
//!
//! // List pods carrying app=web
//! let selector: LabelSelector = "app=web".parse()?;
//! let opts = k8s_client::ListOptions::default().with_label_selector(selector.clone());
//! let pods = client.pods().list("default", Some(&opts)).await?;
//!
//! // Watch for changes newer than the list
//! let opts = WatchOptions::default()
//!     .with_label_selector(selector)
//!     .with_resource_version(pods.metadata.resource_version.clone());
//! let (tx, mut rx) = mpsc::channel(32);
//! let handle = client.pods().watch("default", Some(&opts), Some(tx)).await?;
//!
//! while let Some(event) = rx.recv().await {
//!     match event.object() {
//!         Ok(pod) => println!("{} {}", event.event_type(), pod.metadata.name),
//!         Err(e) if event.event_type() == WatchEventType::Error => println!("watch error: {e}"),
//!         Err(e) => println!("undecodable event: {e}"),
//!     }
//! }
//! handle.join().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Generic executors**: one `Api<K>` per resource kind (get, list, create, update, delete, watch)
//! - **Typed watch**: lazily decoded, memoized events delivered in stream order
//! - **Selectors**: deterministic label/field selector encoding
//! - **Pagination**: `list_all` follows continue tokens
//! - **Mocking**: `HttpExecutor` trait with an in-memory `MockExecutor` (feature `test-util`)

pub mod api;
pub mod client;
pub mod common;
pub mod config;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod executor_trait;
pub mod watch;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use api::Api;
pub use client::{KubeClient, ServerVersion};
pub use common::query::{FieldSelector, ListOptions, WatchOptions};
pub use common::HttpClient;
pub use config::ClientConfig;
pub use error::{is_not_found, ClientError, ErrorKind};
pub use executor_trait::{ApiResponse, FrameSender, HttpExecutor, ResponseMeta};
pub use models::*;
pub use reqwest::{Method, StatusCode};
pub use watch::{RawWatchFrame, WatchEvent, WatchEventType, WatchHandle};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockExecutor, RecordedRequest};
