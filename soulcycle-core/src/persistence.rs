//! Two-slot profile persistence over a key-value backend.
//!
//! The profile is one JSON document in a primary slot; the previous document
//! is kept in a single backup slot. With the SQLite backend the slots are rows
//! of one table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS kv_store (
//!     key        TEXT PRIMARY KEY,
//!     value      TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! ```
//!
//! Loading never fails. Missing, unreadable, unparseable or non-object data
//! yields a fresh default profile; anything older than the current schema is
//! migrated and written back with the pre-migration document as backup.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::content::Content;
use crate::error::{ProfileError, Result};
use crate::migration;
use crate::profile::{CURRENT_SCHEMA_VERSION, Profile, now_iso};

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// A string key-value store holding the profile slots.
pub trait ProfileStorage {
    /// Read a slot. `Ok(None)` when the key was never written.
    ///
    /// # Errors
    /// Backend-specific read failures.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a slot, replacing any previous value.
    ///
    /// # Errors
    /// Backend-specific write failures.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

const KV_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv_store (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);";

/// SQLite-backed slots.
pub struct SqliteStorage {
    conn: Connection,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns [`ProfileError::Storage`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(KV_SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Profile storage opened"
        );
        Ok(Self { conn, db_path })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns [`ProfileError::Storage`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(KV_SCHEMA)?;
        Ok(Self {
            conn,
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path of the database file, `:memory:` for in-memory databases.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl ProfileStorage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM kv_store WHERE key = ?1")?;
        Ok(stmt.query_row(params![key], |row| row.get(0)).optional()?)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Process-local slots, for tests and headless tools.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ProfileStore
// ---------------------------------------------------------------------------

/// Options for [`ProfileStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Copy the current primary document into the backup slot first.
    pub backup_previous: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            backup_previous: true,
        }
    }
}

/// Loads, migrates and saves the player profile.
#[derive(Debug)]
pub struct ProfileStore<S> {
    storage: S,
    content: Content,
    primary_key: String,
    backup_key: String,
}

impl<S: ProfileStorage> ProfileStore<S> {
    /// A store using the keys in `config`.
    #[must_use]
    pub fn new(storage: S, config: &PersistenceConfig, content: Content) -> Self {
        Self {
            storage,
            content,
            primary_key: config.primary_key.clone(),
            backup_key: config.backup_key.clone(),
        }
    }

    /// The content tables migrations run against.
    #[must_use]
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// The underlying backend.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give the backend back.
    #[must_use]
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Read the primary slot and produce a current-schema profile.
    ///
    /// When the stored document was older than the current schema, the
    /// migrated profile is saved with backup so the pre-migration document
    /// survives in the backup slot. A failure of that write is logged and
    /// the migrated profile is still returned.
    pub fn load(&self) -> Profile {
        let start = Instant::now();
        let Some(raw) = self.read_slot(&self.primary_key) else {
            debug!("No stored profile; starting fresh");
            return Profile::new();
        };

        let stated = migration::schema_version(&raw);
        let migrated = migration::migrate(raw, &self.content);
        let Some(mut profile) = Profile::from_value(migrated) else {
            warn!("Stored profile is not an object; starting fresh");
            return Profile::new();
        };

        if stated < CURRENT_SCHEMA_VERSION {
            info!(
                from = stated,
                to = CURRENT_SCHEMA_VERSION,
                "Migrated stored profile"
            );
            if let Err(e) = self.save(&mut profile, SaveOptions::default()) {
                warn!(error = %e, "Could not persist migrated profile");
            }
        }

        debug!(
            version = profile.schema_version,
            runs = profile.history.recent_runs.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded profile"
        );
        profile
    }

    /// Read the backup slot, migrated in memory only. Nothing is written.
    #[must_use]
    pub fn load_backup(&self) -> Option<Profile> {
        let raw = self.read_slot(&self.backup_key)?;
        Profile::from_value(migration::migrate(raw, &self.content))
    }

    /// Stamp `profile` with the current schema version and time, then write
    /// it to the primary slot.
    ///
    /// A profile loaded from a newer build keeps its newer version, so that
    /// build does not migrate its own fields a second time. With
    /// `backup_previous`, a non-empty primary document is first copied into
    /// the backup slot.
    ///
    /// # Errors
    /// Returns [`ProfileError::Serialization`] if the profile cannot be
    /// encoded, or the backend's error if a read or write fails.
    pub fn save(&self, profile: &mut Profile, opts: SaveOptions) -> Result<()> {
        let start = Instant::now();
        profile.schema_version = profile.schema_version.max(CURRENT_SCHEMA_VERSION);
        profile.updated_at = now_iso();

        let json = serde_json::to_string(profile).map_err(|e| ProfileError::Serialization(e.to_string()))?;

        if opts.backup_previous {
            if let Some(previous) = self.storage.get(&self.primary_key)? {
                if !previous.is_empty() {
                    self.storage.set(&self.backup_key, &previous)?;
                }
            }
        }
        self.storage.set(&self.primary_key, &json)?;

        debug!(
            bytes = json.len(),
            backup = opts.backup_previous,
            elapsed_us = start.elapsed().as_micros(),
            "Saved profile"
        );
        Ok(())
    }

    /// Read and parse a slot. Read errors and bad JSON are logged and read as
    /// absent.
    fn read_slot(&self, key: &str) -> Option<Value> {
        let text = match self.storage.get(key) {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => return None,
            Err(e) => {
                warn!(key, error = %e, "Could not read profile slot");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Profile slot holds invalid JSON");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeId, WeaponId};
    use serde_json::json;

    const PRIMARY: &str = "soulcycle:profile";
    const BACKUP: &str = "soulcycle:profile:backup";

    fn store() -> ProfileStore<MemoryStorage> {
        ProfileStore::new(MemoryStorage::new(), &PersistenceConfig::default(), Content::builtin())
    }

    /// Reads succeed, writes fail.
    #[derive(Default)]
    struct ReadOnlyStorage(MemoryStorage);

    impl ProfileStorage for ReadOnlyStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(ProfileError::Backend("quota exceeded".into()))
        }
    }

    struct BrokenStorage;

    impl ProfileStorage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(ProfileError::Backend("unavailable".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(ProfileError::Backend("unavailable".into()))
        }
    }

    #[test]
    fn empty_storage_loads_default_without_writing() {
        let store = store();
        let profile = store.load();
        assert_eq!(profile.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(store.storage().get(PRIMARY).expect("get").is_none());
    }

    #[test]
    fn garbage_loads_default() {
        for raw in ["not json", "", "   ", "[1,2]", "42", "null"] {
            let store = store();
            store.storage().set(PRIMARY, raw).expect("seed");
            let profile = store.load();
            assert_eq!(profile.schema_version, CURRENT_SCHEMA_VERSION);
            assert!(profile.history.recent_runs.is_empty());
        }
    }

    #[test]
    fn unreadable_storage_loads_default() {
        let store = ProfileStore::new(BrokenStorage, &PersistenceConfig::default(), Content::builtin());
        assert_eq!(store.load().schema_version, CURRENT_SCHEMA_VERSION);
        assert!(store.load_backup().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = store();
        let mut profile = Profile::new();
        profile.wallet.souls = 120.0;
        profile.armory.attunement = Some(AttributeId::Will);
        profile.attribute_track_mut(AttributeId::Will).xp = 33;
        profile.extra.insert("futureThing".into(), json!({"a": 1}));
        store.save(&mut profile, SaveOptions::default()).expect("save");

        let loaded = store.load();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn save_rotates_previous_into_backup() {
        let store = store();
        let mut first = Profile::new();
        first.wallet.souls = 1.0;
        store.save(&mut first, SaveOptions::default()).expect("save");
        assert!(store.storage().get(BACKUP).expect("get").is_none());

        let mut second = first.clone();
        second.wallet.souls = 2.0;
        store.save(&mut second, SaveOptions::default()).expect("save");

        let backup = store.load_backup().expect("backup present");
        assert!((backup.wallet.souls - 1.0).abs() < f64::EPSILON);
        assert!((store.load().wallet.souls - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn save_without_backup_leaves_backup_slot() {
        let store = store();
        store.storage().set(BACKUP, "keep").expect("seed");
        let mut profile = Profile::new();
        store.save(&mut profile, SaveOptions::default()).expect("save");
        store
            .save(&mut profile, SaveOptions { backup_previous: false })
            .expect("save");
        assert_eq!(store.storage().get(BACKUP).expect("get").as_deref(), Some("keep"));
    }

    #[test]
    fn save_stamps_version_and_time() {
        let store = store();
        let mut profile = Profile::new();
        profile.schema_version = 2;
        profile.updated_at = "then".into();
        store.save(&mut profile, SaveOptions::default()).expect("save");
        assert_eq!(profile.schema_version, CURRENT_SCHEMA_VERSION);
        assert_ne!(profile.updated_at, "then");
    }

    #[test]
    fn legacy_profile_is_migrated_and_backed_up() {
        let store = store();
        let legacy = json!({
            "armory": {"loadout": {"weaponCls": "pistol"}},
            "mastery": {"weapons": {"Repeater": {"xp": 40, "level": 0, "unlocks": []}}}
        })
        .to_string();
        store.storage().set(PRIMARY, &legacy).expect("seed");

        let profile = store.load();
        assert_eq!(profile.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(profile.armory.loadout.weapon_cls.as_deref(), Some("repeater"));
        assert_eq!(profile.armory.attunement, Some(AttributeId::Alacrity));
        assert_eq!(profile.mastery.weapons[&WeaponId::Repeater].xp, 40);

        assert_eq!(store.storage().get(BACKUP).expect("get"), Some(legacy));
        let stored: Value = serde_json::from_str(&store.storage().get(PRIMARY).expect("get").expect("primary"))
            .expect("json");
        assert_eq!(stored["schemaVersion"], 5);
    }

    #[test]
    fn migration_write_failure_still_returns_profile() {
        let storage = ReadOnlyStorage::default();
        storage
            .0
            .set(PRIMARY, &json!({"schemaVersion": 3, "wallet": {"souls": -4}}).to_string())
            .expect("seed");
        let store = ProfileStore::new(storage, &PersistenceConfig::default(), Content::builtin());
        let profile = store.load();
        assert_eq!(profile.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(profile.wallet.souls.abs() < f64::EPSILON);
    }

    #[test]
    fn write_failure_surfaces_from_save() {
        let store = ProfileStore::new(
            ReadOnlyStorage::default(),
            &PersistenceConfig::default(),
            Content::builtin(),
        );
        let err = store.save(&mut Profile::new(), SaveOptions::default());
        assert!(matches!(err, Err(ProfileError::Backend(_))));
    }

    #[test]
    fn future_profile_is_not_rewritten() {
        let store = store();
        let future = json!({"schemaVersion": 8, "wallet": {"souls": 9}}).to_string();
        store.storage().set(PRIMARY, &future).expect("seed");
        let profile = store.load();
        assert_eq!(profile.schema_version, 8);
        assert!((profile.wallet.souls - 9.0).abs() < f64::EPSILON);
        assert_eq!(store.storage().get(PRIMARY).expect("get"), Some(future));
        assert!(store.storage().get(BACKUP).expect("get").is_none());
    }

    #[test]
    fn newer_build_fields_survive_save() {
        let store = store();
        let future = json!({
            "schemaVersion": 7,
            "armory": {"relicSlots": [1, 2], "loadout": {"weaponCls": "hammer", "skin": "gold"}},
            "wallet": {"souls": 3, "embers": 99},
            "mastery": {
                "prestige": 3,
                "weapons": {"Hammer": {"xp": 4, "level": 1, "unlocks": [], "stars": 2}},
                "attributeTrees": {"Might": {"unlocked": ["m_root"], "respecs": 1}}
            },
            "history": {"season": 4, "recentRuns": [{"runId": 9, "kills": 3, "masteryXp": 5, "modifiers": ["hard"]}]}
        });
        store.storage().set(PRIMARY, &future.to_string()).expect("seed");

        let mut profile = store.load();
        profile.wallet.souls += 1.0;
        store.save(&mut profile, SaveOptions::default()).expect("save");
        assert_eq!(profile.schema_version, 7);

        let stored: Value = serde_json::from_str(&store.storage().get(PRIMARY).expect("get").expect("primary"))
            .expect("json");
        assert_eq!(stored["schemaVersion"], 7);
        assert_eq!(stored["armory"]["relicSlots"], json!([1, 2]));
        assert_eq!(stored["armory"]["loadout"]["skin"], "gold");
        assert_eq!(stored["wallet"]["embers"], 99);
        assert_eq!(stored["wallet"]["souls"], 4.0);
        assert_eq!(stored["mastery"]["prestige"], 3);
        assert_eq!(stored["mastery"]["weapons"]["Hammer"]["stars"], 2);
        assert_eq!(stored["mastery"]["attributeTrees"]["Might"]["respecs"], 1);
        assert_eq!(stored["history"]["season"], 4);
        let run = &stored["history"]["recentRuns"][0];
        assert_eq!(run["modifiers"], json!(["hard"]));
        assert_eq!(run["runId"], 9);
        assert_eq!(run["masteryXp"], 5);
    }

    #[test]
    fn sqlite_slots_upsert() {
        let db = SqliteStorage::open_in_memory().expect("open");
        assert!(db.get("k").expect("get").is_none());
        db.set("k", "one").expect("set");
        db.set("k", "two").expect("set");
        assert_eq!(db.get("k").expect("get").as_deref(), Some("two"));
    }

    #[test]
    fn sqlite_profile_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profile.db");
        let config = PersistenceConfig::default();

        {
            let storage = SqliteStorage::open(&path, &config).expect("open");
            let store = ProfileStore::new(storage, &config, Content::builtin());
            let mut profile = Profile::new();
            profile.weapon_track_mut(WeaponId::Scythe).level = 3;
            store.save(&mut profile, SaveOptions::default()).expect("save");
        }

        let storage = SqliteStorage::open(&path, &config).expect("reopen");
        assert_eq!(storage.db_path(), path.as_path());
        let store = ProfileStore::new(storage, &config, Content::builtin());
        assert_eq!(store.load().mastery.weapons[&WeaponId::Scythe].level, 3);
    }
}
