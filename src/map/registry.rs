use geojson::JsonObject;
use rand::Rng;
use std::collections::HashMap;

use crate::color::Rgb;

/// Country colours, indexed by [`color_index`]
pub const PALETTE: [Rgb; 12] = [
    Rgb::from_hex(0x4fc3f7),
    Rgb::from_hex(0x81c784),
    Rgb::from_hex(0xffb74d),
    Rgb::from_hex(0xe57373),
    Rgb::from_hex(0xba68c8),
    Rgb::from_hex(0x4db6ac),
    Rgb::from_hex(0xfff176),
    Rgb::from_hex(0x7986cb),
    Rgb::from_hex(0xf06292),
    Rgb::from_hex(0xa1887f),
    Rgb::from_hex(0x90a4ae),
    Rgb::from_hex(0xaed581),
];

/// Property keys tried, in order, when deriving a country's identity
const IDENTITY_KEYS: [&str; 5] = ["ISO_A3", "ISO_A2", "NAME", "name", "ADMIN"];

/// Maximum number of matches returned by [`CountryRegistry::search`]
pub const SEARCH_LIMIT: usize = 10;

/// A registered country. Never mutated after registration.
#[derive(Clone, Debug)]
pub struct Country {
    pub id: String,
    pub name: String,
    pub code: String,
    pub region: String,
    pub subregion: String,
    /// Placeholder, regenerated on every load
    pub population: u64,
    /// Placeholder in billions of USD, regenerated on every load
    pub gdp_billions: f64,
    pub color: Rgb,
}

fn prop<'a>(props: &'a JsonObject, key: &str) -> Option<&'a str> {
    props
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Normalised best-available identifier:
/// ISO_A3 → ISO_A2 → NAME → name → ADMIN → feature id → "".
pub fn country_identity(props: &JsonObject, feature_id: Option<&str>) -> String {
    IDENTITY_KEYS
        .iter()
        .find_map(|key| prop(props, key))
        .or_else(|| feature_id.map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or("")
        .to_lowercase()
}

/// Rolling `hash = c + ((hash << 5) - hash)` over UTF-16 code units with
/// 32-bit wrap-around, folded into `[0, palette_len)`.
pub fn color_index(identity: &str, palette_len: usize) -> usize {
    if palette_len == 0 {
        return 0;
    }
    let hash = identity.encode_utf16().fold(0i32, |hash, unit| {
        (unit as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    });
    hash.unsigned_abs() as usize % palette_len
}

/// Write-once store of every country seen in the border data
#[derive(Default)]
pub struct CountryRegistry {
    countries: HashMap<String, Country>,
    order: Vec<String>,
}

impl CountryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the country described by a feature's property bag and return
    /// its identity. An identity seen before keeps its original entry.
    pub fn register(&mut self, props: &JsonObject, feature_id: Option<&str>, rng: &mut impl Rng) -> String {
        let id = country_identity(props, feature_id);
        if self.countries.contains_key(&id) {
            return id;
        }

        let code = prop(props, "ISO_A3")
            .or_else(|| prop(props, "ISO_A2"))
            .unwrap_or("")
            .to_string();
        let name = ["NAME", "name", "ADMIN"]
            .iter()
            .find_map(|key| prop(props, key))
            .map(str::to_string)
            .unwrap_or_else(|| if code.is_empty() { "Unknown".to_string() } else { code.clone() });

        let country = Country {
            name,
            code,
            region: prop(props, "REGION_UN").unwrap_or("").to_string(),
            subregion: prop(props, "SUBREGION").unwrap_or("").to_string(),
            population: rng.random_range(1_000_000..=1_500_000_000),
            gdp_billions: rng.random_range(1.0..25_000.0),
            color: PALETTE[color_index(&id, PALETTE.len())],
            id: id.clone(),
        };

        self.order.push(id.clone());
        self.countries.insert(id.clone(), country);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Country> {
        self.countries.get(id)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Countries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Country> {
        self.order.iter().filter_map(|id| self.countries.get(id))
    }

    /// Case-insensitive substring match on name or code, at most [`SEARCH_LIMIT`] hits
    pub fn search(&self, query: &str) -> Vec<&Country> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.iter()
            .filter(|c| c.name.to_lowercase().contains(&needle) || c.code.to_lowercase().contains(&needle))
            .take(SEARCH_LIMIT)
            .collect()
    }
}
