//! In-process stand-in for the PokeAPI, serving a handful of fixtures.
#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use pokedex_loaders::{
    Config, FetchObserver, KNOWN_TYPES, PaginationConfig, PokeClient, PokemonConfig, AppError,
    ServerConfig, StreamingConfig,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CATALOG_SIZE: u32 = 45;
pub const SLOW_MS: u64 = 300;

struct Fixture {
    id: u32,
    name: &'static str,
    types: &'static [&'static str],
    chain: u32,
}

const FIXTURES: &[Fixture] = &[
    Fixture { id: 1, name: "bulbasaur", types: &["grass", "poison"], chain: 1 },
    Fixture { id: 2, name: "ivysaur", types: &["grass", "poison"], chain: 1 },
    Fixture { id: 3, name: "venusaur", types: &["grass", "poison"], chain: 1 },
    Fixture { id: 25, name: "pikachu", types: &["electric"], chain: 10 },
    Fixture { id: 79, name: "slowpoke", types: &["water", "psychic"], chain: 33 },
    Fixture { id: 132, name: "ditto", types: &["normal"], chain: 66 },
    Fixture { id: 133, name: "eevee", types: &["normal"], chain: 67 },
];

fn find(key: &str) -> Option<&'static Fixture> {
    FIXTURES
        .iter()
        .find(|f| f.name == key || f.id.to_string() == key)
}

fn resource(kind: &str, name: &str, id: u32) -> Value {
    json!({ "name": name, "url": format!("https://pokeapi.co/api/v2/{}/{}/", kind, id) })
}

fn pokemon_json(f: &Fixture) -> Value {
    let types: Vec<Value> = f
        .types
        .iter()
        .enumerate()
        .map(|(i, t)| json!({ "slot": i + 1, "type": { "name": t, "url": "" } }))
        .collect();
    let stats: Vec<Value> = [
        ("hp", 45),
        ("attack", 49),
        ("defense", 49),
        ("special-attack", 65),
        ("special-defense", 65),
        ("speed", 45),
    ]
    .iter()
    .map(|(name, base)| json!({ "base_stat": base, "effort": 0, "stat": { "name": name, "url": "" } }))
    .collect();
    json!({
        "id": f.id,
        "name": f.name,
        "height": 7,
        "weight": 69,
        "base_experience": 64,
        "types": types,
        "stats": stats,
        "abilities": [
            { "ability": { "name": "overgrow", "url": "" }, "is_hidden": false, "slot": 1 },
            { "ability": { "name": "chlorophyll", "url": "" }, "is_hidden": true, "slot": 3 }
        ],
        "sprites": {
            "front_default": format!("https://sprites.example/{}.png", f.id),
            "other": { "official-artwork": { "front_default": format!("https://art.example/{}.png", f.id) } }
        },
        "species": resource("pokemon-species", f.name, f.id)
    })
}

fn species_json(f: &Fixture) -> Value {
    json!({
        "id": f.id,
        "name": f.name,
        "capture_rate": 45,
        "base_happiness": 50,
        "is_baby": false,
        "is_legendary": false,
        "is_mythical": false,
        "hatch_counter": 20,
        "evolution_chain": { "url": format!("https://pokeapi.co/api/v2/evolution-chain/{}/", f.chain) },
        "flavor_text_entries": [
            { "flavor_text": format!("Entrée de {}", f.name), "language": { "name": "fr", "url": "" } },
            { "flavor_text": format!("The {}\u{c}entry.", f.name), "language": { "name": "en", "url": "" } }
        ],
        "genera": [
            { "genus": "Test Pokémon", "language": { "name": "en", "url": "" } }
        ]
    })
}

fn link(name: &str, children: Vec<Value>) -> Value {
    json!({ "is_baby": false, "species": { "name": name, "url": "" }, "evolution_details": [], "evolves_to": children })
}

fn chain_json(id: u32) -> Option<Value> {
    let root = match id {
        1 => link("bulbasaur", vec![link("ivysaur", vec![link("venusaur", vec![])])]),
        10 => link("pichu", vec![link("pikachu", vec![link("raichu", vec![])])]),
        33 => link("slowpoke", vec![link("slowbro", vec![]), link("slowking", vec![])]),
        66 => link("ditto", vec![]),
        67 => link(
            "eevee",
            vec![link("vaporeon", vec![]), link("jolteon", vec![]), link("flareon", vec![])],
        ),
        _ => return None,
    };
    Some(json!({ "id": id, "baby_trigger_item": null, "chain": root }))
}

async fn list(Query(params): Query<HashMap<String, String>>) -> Response {
    let limit: u32 = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    let offset: u32 = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    if offset >= 1000 {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let end = (offset + limit).min(CATALOG_SIZE);
    let results: Vec<Value> = (offset..end)
        .map(|i| resource("pokemon", &format!("pokemon-{}", i + 1), i + 1))
        .collect();
    let next = (end < CATALOG_SIZE).then(|| format!("/pokemon?offset={}&limit={}", end, limit));
    let previous = (offset > 0).then(|| format!("/pokemon?offset={}&limit={}", offset.saturating_sub(limit), limit));
    Json(json!({ "count": CATALOG_SIZE, "next": next, "previous": previous, "results": results }))
        .into_response()
}

async fn pokemon(Path(key): Path<String>) -> Response {
    match key.as_str() {
        "boom" => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "garbled" => return (StatusCode::OK, "not json").into_response(),
        "slowpoke" => tokio::time::sleep(Duration::from_millis(SLOW_MS)).await,
        _ => {}
    }
    match find(&key) {
        Some(f) => Json(pokemon_json(f)).into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn species(Path(key): Path<String>) -> Response {
    match key.as_str() {
        "boom" => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "slowpoke" => tokio::time::sleep(Duration::from_millis(SLOW_MS)).await,
        _ => {}
    }
    match find(&key) {
        Some(f) => Json(species_json(f)).into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn evolution_chain(Path(id): Path<u32>) -> Response {
    match chain_json(id) {
        Some(chain) => Json(chain).into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn type_info(Path(name): Path<String>) -> Response {
    if name == "broken" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let Some(index) = KNOWN_TYPES.iter().position(|t| *t == name) else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };
    let strong_against = KNOWN_TYPES[(index + 1) % KNOWN_TYPES.len()];
    Json(json!({
        "id": index + 1,
        "name": name,
        "damage_relations": {
            "double_damage_to": [resource("type", strong_against, 0)],
            "half_damage_to": [],
            "no_damage_to": [],
            "double_damage_from": [],
            "half_damage_from": [resource("type", &name, 0)],
            "no_damage_from": []
        },
        "pokemon": [
            { "slot": 1, "pokemon": resource("pokemon", "bulbasaur", 1) },
            { "slot": 2, "pokemon": resource("pokemon", "ivysaur", 2) }
        ]
    }))
    .into_response()
}

pub fn upstream() -> Router {
    Router::new()
        .route("/api/v2/pokemon", get(list))
        .route("/api/v2/pokemon/{key}", get(pokemon))
        .route("/api/v2/pokemon-species/{key}", get(species))
        .route("/api/v2/evolution-chain/{id}", get(evolution_chain))
        .route("/api/v2/type/{name}", get(type_info))
}

/// Serves `upstream()` on a random local port and returns its base URL.
pub async fn spawn_upstream() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream()).await.unwrap();
    });
    format!("http://{}/api/v2", addr)
}

pub fn client(base_url: &str) -> PokeClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    PokeClient::with_http(http, base_url).unwrap()
}

pub fn config(base_url: &str) -> Config {
    Config {
        pokemon: PokemonConfig {
            api_url: base_url.to_string(),
            sprite_base_url: "https://art.example".to_string(),
            timeout: 5,
        },
        server: ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
        },
        pagination: PaginationConfig {
            page_size: 20,
            window_size: 5,
        },
        streaming: StreamingConfig {
            description_delay_ms: 50,
        },
    }
}

/// Keeps every observer event as a line of text.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl FetchObserver for RecordingObserver {
    fn on_start(&self, operation: &str, args: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("start {} {}", operation, args));
    }

    fn on_finish(&self, operation: &str, _elapsed: Duration) {
        self.events.lock().unwrap().push(format!("finish {}", operation));
    }

    fn on_error(&self, operation: &str, _elapsed: Duration, error: &AppError) {
        let kind = if error.is_not_found() { "not-found" } else { "failed" };
        self.events
            .lock()
            .unwrap()
            .push(format!("error {} {}", operation, kind));
    }
}
