//! Layout repository: CRUD over the versioned document with read-time
//! migration.
//!
//! Name uniqueness is NOT enforced here. `save` and `update` accept any
//! name; workflows call [`LayoutRepository::name_exists`] first.

use chrono::{DateTime, Duration, Utc};

use crate::error::{LayoutError, StorageError};
use crate::migrate::LayoutDocument;
use crate::store::KeyValueStore;
use crate::types::{LayoutPatch, TerminalLayout};

/// Key under which the layout document is persisted.
pub const STORE_KEY: &str = "laymux.layouts";

type Clock = Box<dyn Fn() -> DateTime<Utc>>;

pub struct LayoutRepository<S> {
    store: S,
    clock: Clock,
}

impl<S: KeyValueStore> LayoutRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Box::new(Utc::now),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current time from the repository clock.
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn load(&self) -> Result<LayoutDocument, StorageError> {
        match self.store.read(STORE_KEY)? {
            Some(value) => LayoutDocument::from_value(STORE_KEY, value),
            None => Ok(LayoutDocument::default()),
        }
    }

    fn persist(&mut self, doc: &LayoutDocument) -> Result<(), StorageError> {
        let value = doc.to_value()?;
        self.store.write(STORE_KEY, &value)
    }

    /// Every layout, migrated, oldest first. A missing document is empty.
    pub fn get_all(&self) -> Result<Vec<TerminalLayout>, StorageError> {
        let mut layouts = self.load()?.all_layouts()?;
        layouts.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(layouts)
    }

    pub fn get(&self, id: &str) -> Result<Option<TerminalLayout>, StorageError> {
        self.load()?.layout(id)
    }

    /// Oldest layout with exactly this name.
    pub fn find_by_name(&self, name: &str) -> Result<Option<TerminalLayout>, StorageError> {
        Ok(self.get_all()?.into_iter().find(|l| l.name == name))
    }

    /// Look up by id first, then by exact name.
    pub fn resolve(&self, name_or_id: &str) -> Result<Option<TerminalLayout>, StorageError> {
        match self.get(name_or_id)? {
            Some(layout) => Ok(Some(layout)),
            None => self.find_by_name(name_or_id),
        }
    }

    /// Insert or overwrite by `layout.id`.
    pub fn save(&mut self, layout: &TerminalLayout) -> Result<(), StorageError> {
        let mut doc = self.load()?;
        doc.insert(layout)?;
        self.persist(&doc)?;
        tracing::info!(id = %layout.id, name = %layout.name, "saved layout");
        Ok(())
    }

    /// Merge `patch` over the stored layout and persist it.
    ///
    /// `id` never changes. `updated_at` is set to now, bumped past the
    /// previous value if the clock has not advanced.
    pub fn update(&mut self, id: &str, patch: LayoutPatch) -> Result<TerminalLayout, LayoutError> {
        let mut doc = self.load()?;
        let mut layout = doc
            .layout(id)?
            .ok_or_else(|| LayoutError::NotFound(id.to_string()))?;

        let mut now = self.now();
        if now <= layout.updated_at {
            now = layout.updated_at + Duration::nanoseconds(1);
        }
        layout.apply_patch(patch, now);

        doc.insert(&layout)?;
        self.persist(&doc)?;
        tracing::info!(id = %layout.id, name = %layout.name, "updated layout");
        Ok(layout)
    }

    /// `true` if a record existed and was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        let mut doc = self.load()?;
        if !doc.remove(id) {
            return Ok(false);
        }
        self.persist(&doc)?;
        tracing::info!(id, "deleted layout");
        Ok(true)
    }

    /// Exact, case-sensitive name match over every layout except
    /// `exclude_id`. Does not assume at most one record matches.
    pub fn name_exists(&self, name: &str, exclude_id: Option<&str>) -> Result<bool, StorageError> {
        Ok(self
            .get_all()?
            .iter()
            .any(|l| l.name == name && Some(l.id.as_str()) != exclude_id))
    }
}
