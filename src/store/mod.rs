//! In-memory item records behind the mock API

use crate::models::{Item, ItemPatch};
use rand::Rng;
use tokio::sync::RwLock;
use tracing::debug;

const CATEGORIES: [&str; 4] = ["alpha", "beta", "gamma", "delta"];
const SEED_COUNT: usize = 40;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct ItemStore {
    items: RwLock<Vec<Item>>,
}

impl ItemStore {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// 40 items cycling through the four categories, touched within the last hour
    pub fn seeded() -> Self {
        let mut rng = rand::rng();
        let now = now_millis();
        let items = (0..SEED_COUNT)
            .map(|i| Item {
                id: (i + 1).to_string(),
                name: format!("Item {}", i + 1),
                category: CATEGORIES[i % CATEGORIES.len()].to_string(),
                updated_at: now - rng.random_range(0..60 * 60 * 1000_i64),
            })
            .collect();
        Self::new(items)
    }

    /// Items whose name or category contains `filter`, ignoring case.
    /// A missing or empty filter matches everything.
    pub async fn list(&self, filter: Option<&str>) -> Vec<Item> {
        let items = self.items.read().await;
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());
        let Some(filter) = filter else {
            return items.clone();
        };

        let needle = filter.to_lowercase();
        items
            .iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&needle)
                    || item.category.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Apply `patch` to the item with `id`, creating it if unknown
    pub async fn upsert(&self, id: &str, patch: ItemPatch) -> Item {
        let mut items = self.items.write().await;
        let now = now_millis();

        if let Some(item) = items.iter_mut().find(|item| item.id == id) {
            if let Some(name) = patch.name {
                item.name = name;
            }
            if let Some(category) = patch.category {
                item.category = category;
            }
            item.updated_at = now;
            debug!("Updated item {}", id);
            return item.clone();
        }

        let item = Item {
            id: id.to_string(),
            name: patch.name.unwrap_or_else(|| format!("Item {}", id)),
            category: patch.category.unwrap_or_else(|| CATEGORIES[0].to_string()),
            updated_at: now,
        };
        items.push(item.clone());
        debug!("Created item {}", id);
        item
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::seeded()
    }
}
