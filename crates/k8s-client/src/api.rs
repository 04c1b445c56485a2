//! Generic resource executors
//!
//! One [`Api<K>`] serves every resource kind: paths, kind tags and decode
//! targets all come from the [`Resource`] descriptor. Each operation wraps
//! its failure with the operation name and kind, e.g.
//! `failed to get Pod: Not found: pods "web-0" not found`.

use crate::common::path::{resource_path, with_query};
use crate::common::query::{list_query, watch_query, ListOptions, WatchOptions};
use crate::error::ClientError;
use crate::executor_trait::HttpExecutor;
use crate::models::{ObjectList, Resource};
use crate::watch::relay::spawn_relay;
use crate::watch::{WatchEvent, WatchHandle, FRAME_BUFFER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Typed executor set for resource kind `K`
pub struct Api<K> {
    executor: Arc<dyn HttpExecutor>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for Api<K> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            _kind: PhantomData,
        }
    }
}

impl<K: Resource> fmt::Debug for Api<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("kind", &K::KIND)
            .field("base_url", &self.executor.base_url())
            .finish()
    }
}

impl<K: Resource> Api<K> {
    /// Executors for `K` over the given transport
    pub fn new(executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            executor,
            _kind: PhantomData,
        }
    }

    /// Fetch one object
    pub async fn get(&self, namespace: &str, name: &str) -> Result<K, ClientError> {
        self.get_inner(namespace, name)
            .await
            .map_err(|e| e.wrap("get", K::KIND))
    }

    /// Fetch one object, mapping "not found" to `None`
    pub async fn get_opt(&self, namespace: &str, name: &str) -> Result<Option<K>, ClientError> {
        match self.get(namespace, name).await {
            Ok(object) => Ok(Some(object)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List one page. An empty namespace lists across all namespaces.
    pub async fn list(&self, namespace: &str, opts: Option<&ListOptions>) -> Result<ObjectList<K>, ClientError> {
        self.list_inner(namespace, opts)
            .await
            .map_err(|e| e.wrap("list", K::KIND))
    }

    /// List every page, following continue tokens
    pub async fn list_all(&self, namespace: &str, opts: Option<&ListOptions>) -> Result<ObjectList<K>, ClientError> {
        self.list_all_inner(namespace, opts)
            .await
            .map_err(|e| e.wrap("list", K::KIND))
    }

    /// Create `object` in `namespace`.
    ///
    /// Kind, API version and (for namespaced kinds) namespace are stamped
    /// onto `object` first.
    pub async fn create(&self, namespace: &str, object: &mut K) -> Result<K, ClientError> {
        self.create_inner(namespace, object)
            .await
            .map_err(|e| e.wrap("create", K::KIND))
    }

    /// Replace the object named by `object.metadata.name`
    pub async fn update(&self, namespace: &str, object: &mut K) -> Result<K, ClientError> {
        self.update_inner(namespace, object)
            .await
            .map_err(|e| e.wrap("update", K::KIND))
    }

    /// Delete the named object
    pub async fn delete(&self, namespace: &str, name: &str) -> Result<(), ClientError> {
        self.delete_inner(namespace, name)
            .await
            .map_err(|e| e.wrap("delete", K::KIND))
    }

    /// Watch for changes, delivering typed events on `events`.
    ///
    /// Returns once the stream is established. Events arrive in stream order;
    /// the channel closes when the stream ends or the watch is cancelled.
    /// A missing or already-closed `events` channel is rejected before any
    /// request is made.
    pub async fn watch(
        &self,
        namespace: &str,
        opts: Option<&WatchOptions>,
        events: Option<mpsc::Sender<WatchEvent<K>>>,
    ) -> Result<WatchHandle, ClientError> {
        self.watch_with_cancel(namespace, opts, events, CancellationToken::new())
            .await
    }

    /// Like [`watch`](Self::watch), stopping when `cancel` fires
    pub async fn watch_with_cancel(
        &self,
        namespace: &str,
        opts: Option<&WatchOptions>,
        events: Option<mpsc::Sender<WatchEvent<K>>>,
        cancel: CancellationToken,
    ) -> Result<WatchHandle, ClientError> {
        self.watch_inner(namespace, opts, events, cancel)
            .await
            .map_err(|e| e.wrap("watch", K::KIND))
    }

    async fn get_inner(&self, namespace: &str, name: &str) -> Result<K, ClientError> {
        require_name(name)?;
        require_namespace::<K>(namespace)?;
        let path = resource_path::<K>(namespace, Some(name));
        let response = self
            .executor
            .execute(Method::GET, &path, None, &[StatusCode::OK])
            .await?;
        decode_body(K::KIND, &response.body)
    }

    async fn list_inner(&self, namespace: &str, opts: Option<&ListOptions>) -> Result<ObjectList<K>, ClientError> {
        let path = with_query(resource_path::<K>(namespace, None), &list_query(opts));
        let response = self
            .executor
            .execute(Method::GET, &path, None, &[StatusCode::OK])
            .await?;
        decode_body(&format!("{}List", K::KIND), &response.body)
    }

    async fn list_all_inner(&self, namespace: &str, opts: Option<&ListOptions>) -> Result<ObjectList<K>, ClientError> {
        let mut page_opts = opts.cloned().unwrap_or_default();
        let mut all: Option<ObjectList<K>> = None;

        loop {
            debug!("Fetching {} page (continue: {:?})", K::PLURAL, page_opts.continue_token);
            let page = self.list_inner(namespace, Some(&page_opts)).await?;
            let next = page.metadata.continue_token.clone();

            match all.as_mut() {
                None => all = Some(page),
                Some(all) => all.items.extend(page.items),
            }

            if next.is_empty() {
                break;
            }
            page_opts.continue_token = Some(next);
        }

        let mut all = all.unwrap_or_else(|| ObjectList {
            type_meta: Default::default(),
            metadata: Default::default(),
            items: Vec::new(),
        });
        all.metadata.continue_token.clear();
        all.metadata.remaining_item_count = None;
        Ok(all)
    }

    async fn create_inner(&self, namespace: &str, object: &mut K) -> Result<K, ClientError> {
        require_namespace::<K>(namespace)?;
        object.stamp(namespace);
        let body = to_body(object)?;
        let path = resource_path::<K>(namespace, None);
        let response = self
            .executor
            .execute(
                Method::POST,
                &path,
                Some(&body),
                &[StatusCode::CREATED, StatusCode::OK, StatusCode::ACCEPTED],
            )
            .await?;
        decode_body(K::KIND, &response.body)
    }

    async fn update_inner(&self, namespace: &str, object: &mut K) -> Result<K, ClientError> {
        require_namespace::<K>(namespace)?;
        let name = object.metadata().name.clone();
        require_name(&name)?;
        object.stamp(namespace);
        let body = to_body(object)?;
        let path = resource_path::<K>(namespace, Some(&name));
        let response = self
            .executor
            .execute(Method::PUT, &path, Some(&body), &[StatusCode::OK, StatusCode::CREATED])
            .await?;
        decode_body(K::KIND, &response.body)
    }

    async fn delete_inner(&self, namespace: &str, name: &str) -> Result<(), ClientError> {
        require_name(name)?;
        require_namespace::<K>(namespace)?;
        let path = resource_path::<K>(namespace, Some(name));
        self.executor
            .execute(Method::DELETE, &path, None, &[StatusCode::OK, StatusCode::ACCEPTED])
            .await?;
        Ok(())
    }

    async fn watch_inner(
        &self,
        namespace: &str,
        opts: Option<&WatchOptions>,
        events: Option<mpsc::Sender<WatchEvent<K>>>,
        cancel: CancellationToken,
    ) -> Result<WatchHandle, ClientError> {
        let events = match events {
            Some(events) if events.is_closed() => {
                return Err(ClientError::InvalidArgument(
                    "watch event receiver is already closed".to_string(),
                ));
            }
            Some(events) => events,
            None => {
                return Err(ClientError::InvalidArgument(
                    "a channel for watch events is required".to_string(),
                ));
            }
        };

        let path = with_query(resource_path::<K>(namespace, None), &watch_query(opts));
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let relay = spawn_relay(frame_rx, events, cancel.clone());

        info!("Watching {} at {}", K::PLURAL, path);
        // On failure the frame sender is dropped, so the relay exits and closes `events`
        self.executor
            .execute_streaming(Method::GET, &path, None, frame_tx, cancel.clone())
            .await?;

        Ok(WatchHandle::new(cancel, relay))
    }
}

fn require_name(name: &str) -> Result<(), ClientError> {
    if name.is_empty() {
        return Err(ClientError::InvalidArgument("name must not be empty".to_string()));
    }
    Ok(())
}

fn require_namespace<K: Resource>(namespace: &str) -> Result<(), ClientError> {
    if K::NAMESPACED && namespace.is_empty() {
        return Err(ClientError::InvalidArgument(format!(
            "namespace must not be empty for {}",
            K::KIND
        )));
    }
    Ok(())
}

fn to_body<K: Resource>(object: &K) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(object)
        .map_err(|e| ClientError::InvalidArgument(format!("failed to serialize {}: {}", K::KIND, e)))
}

fn decode_body<T: DeserializeOwned>(shape: &str, body: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|e| ClientError::decode(shape, e))
}
