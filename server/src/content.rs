//! Read-only content catalogs, keyed for lookup and immutable once loaded.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use log::{info, warn};

use mud_shared::{
    default_content, ContentPack, EntityTemplate, EquipmentTable, ItemTemplate, LootTable, RaceDef,
    RoomDef, RoomId,
};

/// Environment variable naming the content file
pub const CONTENT_PATH_ENV: &str = "MUD_CONTENT";

/// Problems reading a content file
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read content file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse content file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// All static definitions the simulation reads
#[derive(Debug, Default)]
pub struct ContentCatalog {
    items: HashMap<String, ItemTemplate>,
    entities: HashMap<String, EntityTemplate>,
    rooms: BTreeMap<RoomId, RoomDef>,
    loot_tables: HashMap<String, LootTable>,
    equipment_tables: HashMap<String, EquipmentTable>,
    races: HashMap<String, RaceDef>,
}

impl ContentCatalog {
    /// Key a content pack and report dangling references
    pub fn from_pack(pack: ContentPack) -> Self {
        let catalog = Self {
            items: pack.items.into_iter().map(|i| (i.id.clone(), i)).collect(),
            entities: pack.entities.into_iter().map(|e| (e.key.clone(), e)).collect(),
            rooms: pack.rooms.into_iter().map(|r| (r.id, r)).collect(),
            loot_tables: pack.loot_tables,
            equipment_tables: pack.equipment_tables,
            races: pack.races.into_iter().map(|r| (r.id.clone(), r)).collect(),
        };
        catalog.report_dangling_references();
        catalog
    }

    /// Load a content file
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: display.clone(),
            source,
        })?;
        let pack: ContentPack = serde_json::from_str(&content).map_err(|source| ContentError::Parse {
            path: display,
            source,
        })?;
        Ok(Self::from_pack(pack))
    }

    /// Load the configured content file, or the built-in set if there is none
    pub fn load(path: Option<&str>) -> Self {
        if let Some(path) = path {
            match Self::load_from_json(path) {
                Ok(catalog) => {
                    info!("Loaded content from {}", path);
                    return catalog;
                }
                Err(e) => {
                    warn!("{}", e);
                    warn!("Using built-in content");
                }
            }
        }
        Self::from_pack(default_content())
    }

    pub fn with_defaults() -> Self {
        Self::from_pack(default_content())
    }

    pub fn item(&self, id: &str) -> Option<&ItemTemplate> {
        self.items.get(id)
    }

    pub fn entity(&self, key: &str) -> Option<&EntityTemplate> {
        self.entities.get(key)
    }

    pub fn room(&self, id: RoomId) -> Option<&RoomDef> {
        self.rooms.get(&id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomDef> {
        self.rooms.values()
    }

    pub fn loot_table(&self, id: &str) -> Option<&LootTable> {
        self.loot_tables.get(id)
    }

    pub fn equipment_table(&self, id: &str) -> Option<&EquipmentTable> {
        self.equipment_tables.get(id)
    }

    pub fn race(&self, id: &str) -> Option<&RaceDef> {
        self.races.get(id)
    }

    pub fn item_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.items.get(id).map(|i| i.name.as_str()).unwrap_or(id)
    }

    /// Insert or replace definitions; used to build test fixtures
    pub fn insert_item(&mut self, item: ItemTemplate) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn insert_entity(&mut self, template: EntityTemplate) {
        self.entities.insert(template.key.clone(), template);
    }

    pub fn insert_room(&mut self, room: RoomDef) {
        self.rooms.insert(room.id, room);
    }

    pub fn insert_loot_table(&mut self, id: &str, table: LootTable) {
        self.loot_tables.insert(id.to_string(), table);
    }

    pub fn insert_equipment_table(&mut self, id: &str, table: EquipmentTable) {
        self.equipment_tables.insert(id.to_string(), table);
    }

    pub fn insert_race(&mut self, race: RaceDef) {
        self.races.insert(race.id.clone(), race);
    }

    /// Warn about references that will resolve to nothing at runtime
    fn report_dangling_references(&self) {
        for room in self.rooms.values() {
            for key in room.monsters.iter().chain(room.npcs.iter()) {
                if !self.entities.contains_key(key) {
                    warn!("Room {} references unknown entity template '{}'", room.id, key);
                }
            }
            for (direction, target) in &room.exits {
                if !self.rooms.contains_key(target) {
                    warn!("Room {} exit '{}' leads to unknown room {}", room.id, direction, target);
                }
            }
        }

        for (table_id, table) in &self.loot_tables {
            for entry in table {
                if !self.items.contains_key(&entry.item_id) {
                    warn!("Loot table '{}' references unknown item '{}'", table_id, entry.item_id);
                }
            }
        }

        for template in self.entities.values() {
            if let Some(id) = &template.loot_table_id {
                if !self.loot_tables.contains_key(id) {
                    warn!("Template '{}' references unknown loot table '{}'", template.key, id);
                }
            }
            if let Some(id) = &template.equipment_table_id {
                if !self.equipment_tables.contains_key(id) {
                    warn!("Template '{}' references unknown equipment table '{}'", template.key, id);
                }
            }
        }

        info!(
            "Content catalog: {} items, {} templates, {} rooms, {} loot tables, {} equipment tables, {} races",
            self.items.len(),
            self.entities.len(),
            self.rooms.len(),
            self.loot_tables.len(),
            self.equipment_tables.len(),
            self.races.len()
        );
    }
}
