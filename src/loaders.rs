//! Page loaders: each one gathers everything a single page needs.
//!
//! Independent calls are fanned out and awaited together; calls that need an
//! id from an earlier response are awaited in sequence.

use crate::client::{PokeClient, Pending, defer, fetch_all};
use crate::config::Config;
use crate::error::AppError;
use crate::helpers::{
    artwork_url, dex_number, extract_id, flatten_chain, pagination_window, stat_percentage,
    title_case, total_pages,
};
use crate::pokemon::{ENGLISH, KNOWN_TYPES, NamedAPIResource, Pokemon, PokemonSpecies};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Serialize, Clone)]
pub struct CatalogEntry {
    pub name: String,
    pub id: u32,
    pub display_name: String,
    pub dex_number: String,
    pub artwork_url: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct CatalogPage {
    pub pokemon: Vec<CatalogEntry>,
    pub count: u32,
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
    pub pages: Vec<u32>,
}

/// One page of the catalog. Pages are 1-based; anything lower is page 1.
pub async fn catalog_page(
    client: &PokeClient,
    config: &Config,
    page: u32,
) -> Result<CatalogPage, AppError> {
    let started = Instant::now();
    let current_page = page.max(1);
    let limit = config.pagination.page_size;
    let offset = (current_page - 1).saturating_mul(limit);
    tracing::info!(page = current_page, "Catalog loader started");

    let list = client.list_pokemon(limit, offset).await?;

    let pokemon = list
        .results
        .iter()
        .map(|entry| catalog_entry(entry, &config.pokemon.sprite_base_url))
        .collect();
    let total = total_pages(list.count, limit);
    let page = CatalogPage {
        pokemon,
        count: list.count,
        current_page,
        total_pages: total,
        has_next: list.has_next(),
        has_previous: list.has_previous(),
        pages: pagination_window(current_page, total, config.pagination.window_size),
    };

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Catalog loader finished"
    );
    Ok(page)
}

fn catalog_entry(entry: &NamedAPIResource, sprite_base_url: &str) -> CatalogEntry {
    let id = extract_id(&entry.url);
    CatalogEntry {
        name: entry.name.clone(),
        id,
        display_name: title_case(&entry.name),
        dex_number: dex_number(id),
        artwork_url: artwork_url(sprite_base_url, id),
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct PokemonDetail {
    pub pokemon: Pokemon,
    pub species: PokemonSpecies,
    pub evolution: Vec<String>,
    pub flavor_text: Option<String>,
    pub genus: Option<String>,
    pub height_m: f64,
    pub weight_kg: f64,
}

/// Pokemon and species in parallel, then the evolution chain the species
/// points at.
pub async fn pokemon_detail(client: &PokeClient, name: &str) -> Result<PokemonDetail, AppError> {
    let started = Instant::now();
    tracing::info!(pokemon = name, "Detail loader started");

    let (pokemon, species) = tokio::try_join!(client.get_pokemon(name), client.get_species(name))?;
    let chain = client
        .get_evolution_chain(species.evolution_chain_id())
        .await?;

    let detail = PokemonDetail {
        evolution: flatten_chain(&chain.chain),
        flavor_text: species.flavor_text(ENGLISH),
        genus: species.genus(ENGLISH).map(str::to_string),
        height_m: pokemon.height_m(),
        weight_kg: pokemon.weight_kg(),
        pokemon,
        species,
    };

    tracing::info!(
        pokemon = name,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Detail loader finished"
    );
    Ok(detail)
}

#[derive(Debug, Serialize, Clone)]
pub struct StreamingHead {
    pub pokemon: Pokemon,
    pub evolution: Vec<String>,
}

/// The part of a streamed page that is ready when the loader returns, plus
/// the description that is still being fetched.
#[derive(Debug)]
pub struct StreamingDetail {
    pub head: StreamingHead,
    pub description: Pending<Option<String>>,
}

pub async fn streaming_detail(
    client: &PokeClient,
    config: &Config,
    name: &str,
) -> Result<StreamingDetail, AppError> {
    let started = Instant::now();
    tracing::info!(pokemon = name, "Streaming loader started");

    let pokemon = client.get_pokemon(name).await?;
    let chain = client.evolution_chain_for(name).await?;

    let deferred_client = client.clone();
    let key = name.to_string();
    let delay = Duration::from_millis(config.streaming.description_delay_ms);
    let description = defer(async move {
        tokio::time::sleep(delay).await;
        let species = deferred_client.get_species(key).await?;
        tracing::info!(species = %species.name, "Species description streamed in");
        Ok(species.flavor_text(ENGLISH))
    });

    tracing::info!(
        pokemon = name,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Streaming loader returned, description still pending"
    );
    Ok(StreamingDetail {
        head: StreamingHead {
            evolution: flatten_chain(&chain.chain),
            pokemon,
        },
        description,
    })
}

#[derive(Debug, Serialize, Clone)]
pub struct PokemonSummary {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub dex_number: String,
    pub types: Vec<String>,
    pub sprite: Option<String>,
}

impl From<&Pokemon> for PokemonSummary {
    fn from(pokemon: &Pokemon) -> Self {
        Self {
            id: pokemon.id,
            name: pokemon.name.clone(),
            display_name: title_case(&pokemon.name),
            dex_number: dex_number(pokemon.id),
            types: pokemon.types.iter().map(|t| t.r#type.name.clone()).collect(),
            sprite: pokemon.primary_sprite().map(str::to_string),
        }
    }
}

/// Parent loader shared by every modular tab.
pub async fn modular_overview(client: &PokeClient, name: &str) -> Result<PokemonSummary, AppError> {
    tracing::info!(pokemon = name, "Modular parent loader started");
    let pokemon = client.get_pokemon(name).await?;
    Ok(PokemonSummary::from(&pokemon))
}

#[derive(Debug, Serialize, Clone)]
pub struct StatLine {
    pub name: String,
    pub label: String,
    pub base_stat: u32,
    pub effort: u32,
    pub percentage: f64,
}

#[derive(Debug, Serialize, Clone)]
pub struct StatsTab {
    pub loaded_at: DateTime<Utc>,
    pub stats: Vec<StatLine>,
}

pub async fn modular_stats(client: &PokeClient, name: &str) -> Result<StatsTab, AppError> {
    tracing::info!(pokemon = name, "Modular stats loader started");
    let pokemon = client.get_pokemon(name).await?;
    let stats = pokemon
        .stats
        .iter()
        .map(|s| StatLine {
            name: s.stat.name.clone(),
            label: title_case(&s.stat.name),
            base_stat: s.base_stat,
            effort: s.effort,
            percentage: stat_percentage(s.base_stat),
        })
        .collect();
    Ok(StatsTab {
        loaded_at: Utc::now(),
        stats,
    })
}

#[derive(Debug, Serialize, Clone)]
pub struct AbilityLine {
    pub name: String,
    pub label: String,
    pub is_hidden: bool,
    pub slot: u32,
}

#[derive(Debug, Serialize, Clone)]
pub struct AbilitiesTab {
    pub loaded_at: DateTime<Utc>,
    pub abilities: Vec<AbilityLine>,
}

pub async fn modular_abilities(client: &PokeClient, name: &str) -> Result<AbilitiesTab, AppError> {
    tracing::info!(pokemon = name, "Modular abilities loader started");
    let pokemon = client.get_pokemon(name).await?;
    let abilities = pokemon
        .abilities
        .iter()
        .map(|a| AbilityLine {
            name: a.ability.name.clone(),
            label: title_case(&a.ability.name),
            is_hidden: a.is_hidden,
            slot: a.slot,
        })
        .collect();
    Ok(AbilitiesTab {
        loaded_at: Utc::now(),
        abilities,
    })
}

#[derive(Debug, Serialize, Clone)]
pub struct EvolutionStage {
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct EvolutionTab {
    pub loaded_at: DateTime<Utc>,
    pub chain_id: u32,
    pub stages: Vec<EvolutionStage>,
    pub has_evolution: bool,
}

pub async fn modular_evolution(client: &PokeClient, name: &str) -> Result<EvolutionTab, AppError> {
    tracing::info!(pokemon = name, "Modular evolution loader started");
    let species = client.get_species(name).await?;
    let chain = client
        .get_evolution_chain(species.evolution_chain_id())
        .await?;
    let stages: Vec<EvolutionStage> = flatten_chain(&chain.chain)
        .into_iter()
        .map(|name| EvolutionStage {
            display_name: title_case(&name),
            name,
        })
        .collect();
    Ok(EvolutionTab {
        loaded_at: Utc::now(),
        chain_id: chain.id,
        has_evolution: stages.len() > 1,
        stages,
    })
}

/// A modular tab rendered together with its parent's data.
#[derive(Debug, Serialize, Clone)]
pub struct ModularPage<T> {
    pub pokemon: PokemonSummary,
    pub tab: T,
}

#[derive(Debug, Serialize, Clone)]
pub struct TypeCard {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub double_damage_to: Vec<String>,
    pub half_damage_to: Vec<String>,
    pub no_damage_to: Vec<String>,
    pub double_damage_from: Vec<String>,
    pub half_damage_from: Vec<String>,
    pub no_damage_from: Vec<String>,
    pub pokemon_count: usize,
}

fn names(resources: &[NamedAPIResource]) -> Vec<String> {
    resources.iter().map(|r| r.name.clone()).collect()
}

/// Every known type, fetched in one concurrent batch.
pub async fn all_types(client: &PokeClient) -> Result<Vec<TypeCard>, AppError> {
    let started = Instant::now();
    tracing::info!(count = KNOWN_TYPES.len(), "Types loader started");

    let types = fetch_all(KNOWN_TYPES.iter().map(|name| client.get_type(name))).await?;
    let cards = types
        .iter()
        .map(|t| {
            let relations = &t.damage_relations;
            TypeCard {
                id: t.id,
                name: t.name.clone(),
                display_name: title_case(&t.name),
                double_damage_to: names(&relations.double_damage_to),
                half_damage_to: names(&relations.half_damage_to),
                no_damage_to: names(&relations.no_damage_to),
                double_damage_from: names(&relations.double_damage_from),
                half_damage_from: names(&relations.half_damage_from),
                no_damage_from: names(&relations.no_damage_from),
                pokemon_count: t.pokemon.len(),
            }
        })
        .collect();

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Types loader finished"
    );
    Ok(cards)
}

pub const DEMO_POKEMON: &str = "pikachu";

#[derive(Debug, Serialize, Clone)]
pub struct DemoPage {
    pub pokemon: PokemonSummary,
    pub loaded_on: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub async fn demo(client: &PokeClient) -> Result<DemoPage, AppError> {
    tracing::info!("Demo loader running on the server");
    let pokemon = client.get_pokemon(DEMO_POKEMON).await?;
    Ok(DemoPage {
        pokemon: PokemonSummary::from(&pokemon),
        loaded_on: "server",
        timestamp: Utc::now(),
    })
}
