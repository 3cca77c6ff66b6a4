// pokemon.rs
// Response shapes for the PokeAPI resources this crate reads.

use crate::helpers::extract_id;
use serde::{Deserialize, Serialize};

/// The 18 elemental types, in the order the type chart lists them.
pub const KNOWN_TYPES: [&str; 18] = [
    "normal", "fire", "water", "electric", "grass", "ice", "fighting", "poison", "ground",
    "flying", "psychic", "bug", "rock", "ghost", "dragon", "dark", "steel", "fairy",
];

pub const ENGLISH: &str = "en";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NamedAPIResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct APIResource {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListPage {
    pub count: u32,
    pub next: Option<String>,
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<NamedAPIResource>,
}

impl ListPage {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub base_experience: Option<u32>,
    #[serde(default)]
    pub types: Vec<PokemonType>,
    #[serde(default)]
    pub stats: Vec<PokemonStat>,
    #[serde(default)]
    pub abilities: Vec<PokemonAbility>,
    #[serde(default)]
    pub sprites: PokemonSprites,
    pub species: NamedAPIResource,
}

impl Pokemon {
    /// Official artwork when the API has it, otherwise the plain front sprite.
    pub fn primary_sprite(&self) -> Option<&str> {
        self.sprites
            .other
            .as_ref()
            .and_then(|other| other.official_artwork.as_ref())
            .and_then(|artwork| artwork.front_default.as_deref())
            .or(self.sprites.front_default.as_deref())
    }

    // height is reported in decimetres
    pub fn height_m(&self) -> f64 {
        self.height as f64 / 10.0
    }

    // weight is reported in hectograms
    pub fn weight_kg(&self) -> f64 {
        self.weight as f64 / 10.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonType {
    pub slot: u32,
    pub r#type: NamedAPIResource,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonStat {
    pub base_stat: u32,
    pub effort: u32,
    pub stat: NamedAPIResource,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonAbility {
    pub ability: NamedAPIResource,
    pub is_hidden: bool,
    pub slot: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PokemonSprites {
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
    pub front_female: Option<String>,
    pub front_shiny_female: Option<String>,
    pub back_default: Option<String>,
    pub back_shiny: Option<String>,
    pub back_female: Option<String>,
    pub back_shiny_female: Option<String>,
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork")]
    pub official_artwork: Option<ArtworkSprites>,
    pub home: Option<HomeSprites>,
    pub dream_world: Option<DreamWorldSprites>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ArtworkSprites {
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HomeSprites {
    pub front_default: Option<String>,
    pub front_female: Option<String>,
    pub front_shiny: Option<String>,
    pub front_shiny_female: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DreamWorldSprites {
    pub front_default: Option<String>,
    pub front_female: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonSpecies {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub gender_rate: i32,
    #[serde(default)]
    pub capture_rate: u8,
    #[serde(default)]
    pub base_happiness: Option<u8>,
    #[serde(default)]
    pub is_baby: bool,
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub is_mythical: bool,
    #[serde(default)]
    pub hatch_counter: Option<u32>,
    #[serde(default)]
    pub has_gender_differences: bool,
    #[serde(default)]
    pub forms_switchable: bool,
    #[serde(default)]
    pub growth_rate: Option<NamedAPIResource>,
    #[serde(default)]
    pub evolution_chain: Option<APIResource>,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorTextEntry>,
    #[serde(default)]
    pub generation: Option<NamedAPIResource>,
    #[serde(default)]
    pub genera: Vec<Genus>,
}

impl PokemonSpecies {
    /// First flavor text written in `language`, with the form feeds the
    /// game text carries turned into spaces.
    pub fn flavor_text(&self, language: &str) -> Option<String> {
        self.flavor_text_entries
            .iter()
            .find(|entry| entry.language.name == language)
            .map(|entry| entry.flavor_text.replace('\u{c}', " "))
    }

    pub fn genus(&self, language: &str) -> Option<&str> {
        self.genera
            .iter()
            .find(|g| g.language.name == language)
            .map(|g| g.genus.as_str())
    }

    /// Id of the evolution chain this species belongs to, 0 when the
    /// reference is missing or unparseable.
    pub fn evolution_chain_id(&self) -> u32 {
        self.evolution_chain
            .as_ref()
            .map(|chain| extract_id(&chain.url))
            .unwrap_or(0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FlavorTextEntry {
    pub flavor_text: String,
    pub language: NamedAPIResource,
    #[serde(default)]
    pub version: Option<NamedAPIResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Genus {
    pub genus: String,
    pub language: NamedAPIResource,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EvolutionChain {
    pub id: u32,
    #[serde(default)]
    pub baby_trigger_item: Option<NamedAPIResource>,
    pub chain: ChainLink,
}

/// One stage of an evolution tree. Children are the stages this one
/// evolves into, in the order the API lists them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainLink {
    #[serde(default)]
    pub is_baby: bool,
    pub species: NamedAPIResource,
    #[serde(default)]
    pub evolution_details: Vec<EvolutionDetail>,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EvolutionDetail {
    pub min_level: Option<u32>,
    pub trigger: Option<NamedAPIResource>,
    pub item: Option<NamedAPIResource>,
    pub gender: Option<i32>,
    pub held_item: Option<NamedAPIResource>,
    pub known_move: Option<NamedAPIResource>,
    pub known_move_type: Option<NamedAPIResource>,
    pub location: Option<NamedAPIResource>,
    pub min_happiness: Option<u32>,
    pub min_beauty: Option<u32>,
    pub min_affection: Option<u32>,
    pub needs_overworld_rain: bool,
    pub party_species: Option<NamedAPIResource>,
    pub party_type: Option<NamedAPIResource>,
    pub relative_physical_stats: Option<i32>,
    pub time_of_day: String,
    pub trade_species: Option<NamedAPIResource>,
    pub turn_upside_down: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TypeInfo {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub damage_relations: TypeRelations,
    #[serde(default)]
    pub pokemon: Vec<TypePokemon>,
    #[serde(default)]
    pub generation: Option<NamedAPIResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TypeRelations {
    pub no_damage_to: Vec<NamedAPIResource>,
    pub half_damage_to: Vec<NamedAPIResource>,
    pub double_damage_to: Vec<NamedAPIResource>,
    pub no_damage_from: Vec<NamedAPIResource>,
    pub half_damage_from: Vec<NamedAPIResource>,
    pub double_damage_from: Vec<NamedAPIResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TypePokemon {
    pub slot: u32,
    pub pokemon: NamedAPIResource,
}
