//! Corpses left behind by defeated entities.

pub type CorpseId = u64;

/// Frozen loot snapshot taken at the moment of defeat
#[derive(Debug, Clone, PartialEq)]
pub struct Corpse {
    pub id: CorpseId,
    pub name: String,
    pub template_key: String,
    pub keywords: Vec<String>,
    pub inventory: Vec<String>,
    pub gold: u32,
    pub skinnable: bool,
    pub skinned: bool,
    pub searched: bool,
    pub created_at: f64,
    pub decay_at: f64,
}

impl Corpse {
    pub fn is_decayed(&self, now: f64) -> bool {
        now >= self.decay_at
    }

    /// Nothing left to take: searched, and skinned or not skinnable
    pub fn is_exhausted(&self) -> bool {
        self.searched && self.inventory.is_empty() && self.gold == 0 && (!self.skinnable || self.skinned)
    }

    pub fn matches(&self, word: &str) -> bool {
        let word = word.trim().to_ascii_lowercase();
        if word.is_empty() {
            return false;
        }
        word == "corpse"
            || self.name.to_ascii_lowercase() == word
            || self.keywords.iter().any(|k| k.eq_ignore_ascii_case(&word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpse() -> Corpse {
        Corpse {
            id: 1,
            name: "corpse of a Giant Rat".into(),
            template_key: "giant_rat".into(),
            keywords: vec!["rat".into()],
            inventory: vec!["rat_tail".into()],
            gold: 0,
            skinnable: true,
            skinned: false,
            searched: false,
            created_at: 10.0,
            decay_at: 310.0,
        }
    }

    #[test]
    fn test_decay_boundary() {
        let c = corpse();
        assert!(!c.is_decayed(309.9));
        assert!(c.is_decayed(310.0));
    }

    #[test]
    fn test_exhausted_needs_search_and_skin() {
        let mut c = corpse();
        c.searched = true;
        c.inventory.clear();
        assert!(!c.is_exhausted());
        c.skinned = true;
        assert!(c.is_exhausted());
    }

    #[test]
    fn test_matches_keywords() {
        let c = corpse();
        assert!(c.matches("corpse"));
        assert!(c.matches("RAT"));
        assert!(!c.matches("goblin"));
    }
}
