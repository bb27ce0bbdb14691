//! Equipped-slot bookkeeping, the equip/unequip rules, and gear loading for
//! spawned entities.

use std::collections::BTreeMap;
use log::warn;
use serde::{Deserialize, Serialize};

use mud_shared::{EquipSlot, EquipmentTable, ItemTemplate, ItemType, UNARMORED};

use crate::content::ContentCatalog;
use super::player::Player;

/// Reasons an equip or unequip request is refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EquipError {
    #[error("You don't have that.")]
    NotOwned(String),
    #[error("You can't figure out how to use that.")]
    UnknownItem(String),
    #[error("'{0}' is not somewhere you can equip things.")]
    InvalidSlot(String),
    #[error("You can't equip {item} on your {slot}.")]
    SlotNotAllowed { item: String, slot: String },
    #[error("Your pack is too full to hold anything else.")]
    InventoryFull,
    #[error("You have nothing equipped on your {0}.")]
    SlotEmpty(String),
}

/// Items worn or held, by slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Equipment {
    slots: BTreeMap<EquipSlot, Vec<String>>,
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items_in(&self, slot: EquipSlot) -> &[String] {
        self.slots.get(&slot).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn first_in(&self, slot: EquipSlot) -> Option<&str> {
        self.items_in(slot).first().map(|s| s.as_str())
    }

    pub fn is_empty_slot(&self, slot: EquipSlot) -> bool {
        self.items_in(slot).is_empty()
    }

    pub fn is_full(&self, slot: EquipSlot) -> bool {
        self.items_in(slot).len() >= slot.capacity()
    }

    pub fn insert(&mut self, slot: EquipSlot, item_id: &str) {
        self.slots.entry(slot).or_default().push(item_id.to_string());
    }

    /// Remove one instance of `item_id` from a slot
    pub fn remove_item(&mut self, slot: EquipSlot, item_id: &str) -> bool {
        let Some(items) = self.slots.get_mut(&slot) else {
            return false;
        };
        let Some(pos) = items.iter().position(|i| i == item_id) else {
            return false;
        };
        items.remove(pos);
        if items.is_empty() {
            self.slots.remove(&slot);
        }
        true
    }

    /// Every `(slot, item)` pair, in slot order
    pub fn iter(&self) -> impl Iterator<Item = (EquipSlot, &str)> {
        self.slots
            .iter()
            .flat_map(|(slot, items)| items.iter().map(move |i| (*slot, i.as_str())))
    }

    /// Distinct worn items; a two-handed weapon is listed once
    pub fn item_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for (slot, item) in self.iter() {
            let paired_dup = slot == EquipSlot::Offhand
                && self.items_in(EquipSlot::Mainhand).iter().any(|m| m == item);
            if !paired_dup {
                ids.push(item.to_string());
            }
        }
        ids
    }

    /// Find which slot holds an item
    pub fn slot_of(&self, item_id: &str) -> Option<EquipSlot> {
        self.iter().find(|(_, i)| *i == item_id).map(|(s, _)| s)
    }

    /// Build an entity's gear from an equipment table.
    ///
    /// Entries naming unknown slots or items, or slots the item does not
    /// allow, are logged and skipped.
    pub fn from_table(table: &EquipmentTable, catalog: &ContentCatalog, owner: &str) -> Self {
        let mut equipment = Self::new();

        for (slot_name, item_id) in &table.slots {
            let Some(slot) = EquipSlot::from_name(slot_name) else {
                warn!("{}: equipment table names unknown slot '{}'", owner, slot_name);
                continue;
            };
            let Some(item) = catalog.item(item_id) else {
                warn!("{}: equipment table names unknown item '{}'", owner, item_id);
                continue;
            };
            if !item.allows_slot(slot) {
                warn!("{}: item '{}' cannot be equipped on {}", owner, item_id, slot.name());
                continue;
            }

            let targets = occupied_slots(item, slot);
            if targets.iter().any(|s| equipment.is_full(*s)) {
                warn!("{}: slot {} already filled, skipping '{}'", owner, slot.name(), item_id);
                continue;
            }
            for target in targets {
                equipment.insert(target, item_id);
            }
        }

        equipment
    }
}

/// Slots an item fills when equipped to `slot`
fn occupied_slots(item: &ItemTemplate, slot: EquipSlot) -> Vec<EquipSlot> {
    match (item.two_handed, slot.paired_hand()) {
        (true, Some(_)) => vec![EquipSlot::Mainhand, EquipSlot::Offhand],
        _ => vec![slot],
    }
}

/// Anything that wears gear: players and spawned entities
pub trait EquipmentHolder {
    fn equipment(&self) -> &Equipment;

    /// Armor type used when no torso armor is worn
    fn innate_armor_type(&self) -> Option<&str> {
        None
    }

    fn equipped_in(&self, slot: EquipSlot) -> Option<&str> {
        self.equipment().first_in(slot)
    }

    /// Main-hand item, if it has a weapon profile
    fn weapon<'c>(&self, catalog: &'c ContentCatalog) -> Option<&'c ItemTemplate> {
        self.equipped_in(EquipSlot::Mainhand)
            .and_then(|id| catalog.item(id))
            .filter(|item| item.is_weapon())
    }

    /// Off-hand item, if it is a shield
    fn shield<'c>(&self, catalog: &'c ContentCatalog) -> Option<&'c ItemTemplate> {
        self.equipped_in(EquipSlot::Offhand)
            .and_then(|id| catalog.item(id))
            .filter(|item| item.item_type == ItemType::Shield)
    }

    /// Torso item, if it is armor
    fn body_armor<'c>(&self, catalog: &'c ContentCatalog) -> Option<&'c ItemTemplate> {
        self.equipped_in(EquipSlot::Torso)
            .and_then(|id| catalog.item(id))
            .filter(|item| item.item_type == ItemType::Armor)
    }

    /// Torso armor type, then innate type, then unarmored
    fn armor_type(&self, catalog: &ContentCatalog) -> String {
        self.body_armor(catalog)
            .and_then(|item| item.armor_type.clone())
            .or_else(|| self.innate_armor_type().map(|s| s.to_string()))
            .unwrap_or_else(|| UNARMORED.to_string())
    }
}

/// What happened during a successful equip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipOutcome {
    pub item_id: String,
    pub slots: Vec<EquipSlot>,
    /// Side effects to narrate, in order
    pub narration: Vec<String>,
}

/// Equip an owned item.
///
/// Anything already in the way is returned to the pack first; if the pack
/// cannot take it the whole request fails and nothing changes.
pub fn equip(
    player: &mut Player,
    item_id: &str,
    slot: EquipSlot,
    catalog: &ContentCatalog,
) -> Result<EquipOutcome, EquipError> {
    if !player.has_item(item_id) {
        return Err(EquipError::NotOwned(item_id.to_string()));
    }
    let Some(item) = catalog.item(item_id) else {
        warn!("Player {} holds item '{}' with no template", player.id, item_id);
        return Err(EquipError::UnknownItem(item_id.to_string()));
    };
    if !item.allows_slot(slot) {
        return Err(EquipError::SlotNotAllowed {
            item: item.name.clone(),
            slot: slot.name().to_string(),
        });
    }

    let targets = occupied_slots(item, slot);

    // Work out what must come off before anything is touched
    let mut displaced: Vec<(String, Vec<EquipSlot>)> = Vec::new();
    for target in &targets {
        let must_clear = item.two_handed || player.equipment.is_full(*target);
        if !must_clear {
            continue;
        }
        let Some(current) = player.equipment.first_in(*target).map(|s| s.to_string()) else {
            continue;
        };
        if displaced.iter().any(|(id, _)| *id == current) {
            continue;
        }
        displaced.push((current.clone(), held_slots(player, &current, *target, catalog)));
    }

    if player.inventory.len() + displaced.len() > player.inventory_capacity {
        return Err(EquipError::InventoryFull);
    }

    let mut narration = Vec::new();
    for (displaced_id, held) in &displaced {
        for held_slot in held {
            player.equipment.remove_item(*held_slot, displaced_id);
        }
        player.inventory.push(displaced_id.clone());

        let name = catalog.item_name(displaced_id);
        if item.two_handed && !held.contains(&slot) {
            narration.push(format!("Your {} is unequipped for the two-handed weapon.", name));
        } else {
            narration.push(format!("You remove your {}.", name));
        }
    }

    player.remove_item(item_id);
    for target in &targets {
        player.equipment.insert(*target, item_id);
    }
    player.recompute_derived(catalog);

    Ok(EquipOutcome {
        item_id: item_id.to_string(),
        slots: targets,
        narration,
    })
}

/// Remove the most recently equipped item in a slot and return it to the pack
pub fn unequip(player: &mut Player, slot: EquipSlot, catalog: &ContentCatalog) -> Result<String, EquipError> {
    let Some(item_id) = player.equipment.items_in(slot).last().cloned() else {
        return Err(EquipError::SlotEmpty(slot.name().to_string()));
    };
    if player.inventory_full() {
        return Err(EquipError::InventoryFull);
    }

    for held in held_slots(player, &item_id, slot, catalog) {
        player.equipment.remove_item(held, &item_id);
    }
    player.inventory.push(item_id.clone());
    player.recompute_derived(catalog);

    Ok(item_id)
}

/// Slots a worn item fills, starting from the one it was found in
fn held_slots(player: &Player, item_id: &str, slot: EquipSlot, catalog: &ContentCatalog) -> Vec<EquipSlot> {
    let mut held = vec![slot];
    let two_handed = catalog.item(item_id).map(|i| i.two_handed).unwrap_or(false);
    if let (true, Some(paired)) = (two_handed, slot.paired_hand()) {
        if player.equipment.items_in(paired).iter().any(|i| i == item_id) {
            held.push(paired);
        }
    }
    held
}
