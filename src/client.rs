//! HTTP client for the five PokeAPI resources the loaders read.
//!
//! Every call is exactly one GET. Nothing is cached or retried; a failure is
//! reported to the observer and handed back to the caller as is.

use crate::config::PokemonConfig;
use crate::error::AppError;
use crate::pokemon::{EvolutionChain, ListPage, Pokemon, PokemonSpecies, TypeInfo};
use crate::trace::{FetchObserver, TracingObserver};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Lookup key for pokemon and species. The API accepts either form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOrId {
    Name(String),
    Id(u32),
}

impl From<&str> for NameOrId {
    fn from(name: &str) -> Self {
        NameOrId::Name(name.to_string())
    }
}

impl From<String> for NameOrId {
    fn from(name: String) -> Self {
        NameOrId::Name(name)
    }
}

impl From<&String> for NameOrId {
    fn from(name: &String) -> Self {
        NameOrId::Name(name.clone())
    }
}

impl From<u32> for NameOrId {
    fn from(id: u32) -> Self {
        NameOrId::Id(id)
    }
}

impl fmt::Display for NameOrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameOrId::Name(name) => write!(f, "{}", name),
            NameOrId::Id(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Clone)]
pub struct PokeClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
    observer: Arc<dyn FetchObserver>,
}

impl fmt::Debug for PokeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PokeClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl PokeClient {
    pub fn new(config: &PokemonConfig) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if config.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout as u64));
        }
        let http = builder.build().map_err(|e| {
            let error_msg = format!("Failed to build HTTP client: {}", e);
            tracing::error!("{}", error_msg);
            AppError::Internal(error_msg)
        })?;
        Self::with_http(http, &config.api_url)
    }

    /// Wraps an existing `reqwest::Client`. Events go to `TracingObserver`
    /// until `with_observer` replaces it.
    pub fn with_http(http: reqwest::Client, base_url: &str) -> Result<Self, AppError> {
        let base_url = reqwest::Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            let error_msg = format!("Invalid API base URL {}: {}", base_url, e);
            tracing::error!("{}", error_msg);
            AppError::Config(error_msg)
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "API base URL {} cannot hold a path",
                base_url
            )));
        }
        Ok(Self {
            http,
            base_url,
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    // each segment is percent-encoded, so a key can never leave its resource
    fn resource_url(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn list_url(&self, limit: u32, offset: u32) -> String {
        let mut url = self.resource_url(&["pokemon"]);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        url.into()
    }

    pub fn pokemon_url(&self, key: &NameOrId) -> String {
        self.resource_url(&["pokemon", &key.to_string()]).into()
    }

    pub fn species_url(&self, key: &NameOrId) -> String {
        self.resource_url(&["pokemon-species", &key.to_string()]).into()
    }

    pub fn evolution_chain_url(&self, id: u32) -> String {
        self.resource_url(&["evolution-chain", &id.to_string()]).into()
    }

    pub fn type_url(&self, name: &str) -> String {
        self.resource_url(&["type", name]).into()
    }

    pub async fn list_pokemon(&self, limit: u32, offset: u32) -> Result<ListPage, AppError> {
        let url = self.list_url(limit, offset);
        let args = format!("limit={}, offset={}", limit, offset);
        self.traced("list_pokemon", &args, self.fetch_json(&url, None))
            .await
    }

    pub async fn get_pokemon(&self, name_or_id: impl Into<NameOrId>) -> Result<Pokemon, AppError> {
        let key = name_or_id.into();
        let url = self.pokemon_url(&key);
        let not_found = format!("Pokemon {}", key);
        self.traced("get_pokemon", &key.to_string(), self.fetch_json(&url, Some(not_found)))
            .await
    }

    pub async fn get_species(
        &self,
        name_or_id: impl Into<NameOrId>,
    ) -> Result<PokemonSpecies, AppError> {
        let key = name_or_id.into();
        let url = self.species_url(&key);
        let not_found = format!("Pokemon species {}", key);
        self.traced("get_species", &key.to_string(), self.fetch_json(&url, Some(not_found)))
            .await
    }

    pub async fn get_evolution_chain(&self, id: u32) -> Result<EvolutionChain, AppError> {
        let url = self.evolution_chain_url(id);
        self.traced("get_evolution_chain", &id.to_string(), self.fetch_json(&url, None))
            .await
    }

    /// `name` is forwarded as given; unknown types fail upstream.
    pub async fn get_type(&self, name: &str) -> Result<TypeInfo, AppError> {
        let url = self.type_url(name);
        self.traced("get_type", name, self.fetch_json(&url, None)).await
    }

    pub async fn pokemon_id(&self, name: &str) -> Result<u32, AppError> {
        Ok(self.get_pokemon(name).await?.id)
    }

    /// Species lookup followed by the chain it references.
    pub async fn evolution_chain_for(
        &self,
        name_or_id: impl Into<NameOrId>,
    ) -> Result<EvolutionChain, AppError> {
        let species = self.get_species(name_or_id).await?;
        let chain_id = species.evolution_chain_id();
        if chain_id == 0 {
            tracing::warn!("Species {} has no evolution chain reference", species.name);
        }
        self.get_evolution_chain(chain_id).await
    }

    async fn traced<T>(
        &self,
        operation: &str,
        args: &str,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        self.observer.on_start(operation, args);
        let started = Instant::now();
        let result = call.await;
        match &result {
            Ok(_) => self.observer.on_finish(operation, started.elapsed()),
            Err(e) => self.observer.on_error(operation, started.elapsed(), e),
        }
        result
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        not_found: Option<String>,
    ) -> Result<T, AppError> {
        tracing::debug!("Fetching {}", url);

        let response = self.http.get(url).send().await.map_err(|e| {
            tracing::error!("Failed to make HTTP request to {}: {}", url, e);
            AppError::from(e)
        })?;

        check_status(response.status().as_u16(), url, not_found)?;

        response.json::<T>().await.map_err(|e| {
            tracing::error!("Failed to parse JSON response from {}: {}", url, e);
            AppError::Parse(format!("JSON parsing failed: {}", e))
        })
    }
}

/// Maps a response status onto the error taxonomy. `not_found` names the
/// resource for lookups where a 404 is reported as `AppError::NotFound`;
/// everywhere else a 404 is just another failed status.
pub fn check_status(status: u16, url: &str, not_found: Option<String>) -> Result<(), AppError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    if status == 404 {
        if let Some(what) = not_found {
            return Err(AppError::NotFound(what));
        }
    }
    Err(AppError::Http {
        status,
        url: url.to_string(),
    })
}

/// Runs a batch of independent calls concurrently and waits for all of them.
/// The first failure fails the whole batch.
pub async fn fetch_all<I, F, T>(calls: I) -> Result<Vec<T>, AppError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, AppError>>,
{
    futures::future::try_join_all(calls).await
}

/// Starts `call` on the runtime now and returns a handle to await later.
pub fn defer<F, T>(call: F) -> Pending<T>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    Pending {
        handle: tokio::spawn(call),
    }
}

/// A call already in flight whose result has not been awaited yet.
///
/// Dropping it aborts the call, e.g. when a streamed response is abandoned
/// before the deferred part arrives.
#[derive(Debug)]
pub struct Pending<T> {
    handle: JoinHandle<Result<T, AppError>>,
}

impl<T> Pending<T> {
    pub async fn wait(mut self) -> Result<T, AppError> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) => {
                let error_msg = format!("Deferred fetch did not complete: {}", e);
                tracing::error!("{}", error_msg);
                Err(AppError::Internal(error_msg))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Drop for Pending<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
