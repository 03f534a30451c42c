use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::{StoredEntry, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

/// Durable store for the task collection. `todos.json` holds the single
/// `todos` key as a JSON array; an absent file is an empty collection.
/// `theme.data` holds the display preference and `seq.data` the id counter.
#[derive(Debug)]
pub struct TodoStore {
    pub data_dir: PathBuf,
    pub todos_path: PathBuf,
    pub theme_path: PathBuf,
    pub seq_path: PathBuf,
}

impl TodoStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let todos_path = data_dir.join("todos.json");
        let theme_path = data_dir.join("theme.data");
        let seq_path = data_dir.join("seq.data");

        info!(
            data_dir = %data_dir.display(),
            todos = %todos_path.display(),
            "opened todo store"
        );

        Ok(Self {
            data_dir,
            todos_path,
            theme_path,
            seq_path,
        })
    }

    /// Loads the collection. Fails soft: a missing key is an empty
    /// collection, and malformed data is reset to empty rather than raised.
    /// Legacy entries (bare strings, records without ids) are upgraded and
    /// the normalized collection is written back, so the repair happens at
    /// most once.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Vec<Task>> {
        let raw = match fs::read_to_string(&self.todos_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no persisted todos, starting empty");
                return Ok(Vec::new());
            }
            Err(err) => {
                warn!(error = %err, file = %self.todos_path.display(), "unreadable todos, treating as empty");
                return Ok(Vec::new());
            }
        };

        let entries: Vec<StoredEntry> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "malformed todos, resetting to empty");
                self.save(&[])?;
                return Ok(Vec::new());
            }
        };

        let (tasks, upgraded) = self.normalize(entries)?;
        if upgraded {
            info!(count = tasks.len(), "normalized legacy todo entries");
            self.save(&tasks)?;
        }

        debug!(count = tasks.len(), "loaded todos");
        Ok(tasks)
    }

    /// Full-collection overwrite, atomic from the caller's point of view:
    /// either the whole new collection is visible or the old one is.
    #[tracing::instrument(skip(self, tasks))]
    pub fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        debug!(count = tasks.len(), "saving todos atomically");

        let dir = self
            .todos_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        let serialized = serde_json::to_string(tasks)?;
        temp.write_all(serialized.as_bytes())?;
        temp.flush()?;

        temp.persist(&self.todos_path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.todos_path.display(), err))?;

        Ok(())
    }

    /// Removes the persisted key entirely. A later `load` sees an empty
    /// collection.
    #[tracing::instrument(skip(self))]
    pub fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.todos_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove {}", self.todos_path.display())),
        }
    }

    /// Allocates a fresh id from the persisted counter. The counter is
    /// clamped up to `max(id) + 1` over the current collection first, so an
    /// externally edited todos file can never cause a collision.
    #[tracing::instrument(skip(self, tasks))]
    pub fn next_id(&self, tasks: &[Task]) -> anyhow::Result<u64> {
        let persisted = match fs::read_to_string(&self.seq_path) {
            Ok(raw) => raw.trim().parse::<u64>().unwrap_or(1),
            Err(_) => 1,
        };
        let floor = tasks.iter().map(|t| t.id).max().map_or(1, |max| max + 1);
        let id = persisted.max(floor);

        fs::write(&self.seq_path, (id + 1).to_string())
            .with_context(|| format!("failed writing {}", self.seq_path.display()))?;

        debug!(id, "allocated task id");
        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    pub fn load_theme(&self) -> anyhow::Result<Option<Theme>> {
        match fs::read_to_string(&self.theme_path) {
            Ok(raw) => Ok(Theme::parse(&raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("failed reading {}", self.theme_path.display())),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn save_theme(&self, theme: Theme) -> anyhow::Result<()> {
        fs::write(&self.theme_path, theme.as_str())
            .with_context(|| format!("failed writing {}", self.theme_path.display()))?;
        Ok(())
    }

    fn normalize(&self, entries: Vec<StoredEntry>) -> anyhow::Result<(Vec<Task>, bool)> {
        let mut upgraded = false;

        let mut known: Vec<Task> = Vec::with_capacity(entries.len());
        for entry in &entries {
            if let StoredEntry::Record {
                id: Some(id),
                text,
                completed,
                priority,
            } = entry
            {
                known.push(Task {
                    id: *id,
                    text: text.clone(),
                    completed: *completed,
                    priority: *priority,
                });
            }
        }

        let mut tasks = Vec::with_capacity(entries.len());
        for entry in entries {
            let task = match entry {
                StoredEntry::Legacy(text) => {
                    upgraded = true;
                    let id = self.next_id(&known)?;
                    Task::new(id, text, Default::default())
                }
                StoredEntry::Record {
                    id: None,
                    text,
                    completed,
                    priority,
                } => {
                    upgraded = true;
                    let id = self.next_id(&known)?;
                    Task {
                        id,
                        text,
                        completed,
                        priority,
                    }
                }
                StoredEntry::Record {
                    id: Some(id),
                    text,
                    completed,
                    priority,
                } => Task {
                    id,
                    text,
                    completed,
                    priority,
                },
            };
            known.push(task.clone());
            tasks.push(task);
        }

        Ok((tasks, upgraded))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{Theme, TodoStore};
    use crate::task::{Priority, Task};

    #[test]
    fn absent_key_loads_as_empty() {
        let temp = tempdir().expect("tempdir");
        let store = TodoStore::open(temp.path()).expect("open store");
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn save_load_round_trip() {
        let temp = tempdir().expect("tempdir");
        let store = TodoStore::open(temp.path()).expect("open store");

        let tasks = vec![
            Task::new(1, "Buy milk".to_string(), Priority::Low),
            Task {
                id: 2,
                text: "File taxes".to_string(),
                completed: true,
                priority: Priority::High,
            },
        ];
        store.save(&tasks).expect("save");
        assert_eq!(store.load().expect("load"), tasks);
    }

    #[test]
    fn malformed_data_resets_to_empty() {
        let temp = tempdir().expect("tempdir");
        let store = TodoStore::open(temp.path()).expect("open store");

        fs::write(&store.todos_path, "{not json").expect("write garbage");
        assert!(store.load().expect("load").is_empty());

        // self-healed: the file now holds a valid empty array
        let raw = fs::read_to_string(&store.todos_path).expect("read back");
        assert_eq!(raw, "[]");
    }

    #[test]
    fn legacy_strings_are_upgraded_once() {
        let temp = tempdir().expect("tempdir");
        let store = TodoStore::open(temp.path()).expect("open store");

        fs::write(&store.todos_path, r#"["wash car"]"#).expect("write legacy");

        let tasks = store.load().expect("load");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "wash car");
        assert!(!tasks[0].completed);

        // the store was rewritten in structured form
        let raw = fs::read_to_string(&store.todos_path).expect("read back");
        assert!(raw.contains("\"id\""));

        // idempotent: a second load yields the same collection
        assert_eq!(store.load().expect("reload"), tasks);
    }

    #[test]
    fn record_missing_id_gets_a_distinct_one() {
        let temp = tempdir().expect("tempdir");
        let store = TodoStore::open(temp.path()).expect("open store");

        fs::write(
            &store.todos_path,
            r#"[{"id": 7, "text": "a"}, {"text": "b", "completed": true}]"#,
        )
        .expect("write mixed");

        let tasks = store.load().expect("load");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, 7);
        assert!(tasks[1].id > 7);
        assert!(tasks[1].completed);
    }

    #[test]
    fn next_id_never_collides_with_existing_tasks() {
        let temp = tempdir().expect("tempdir");
        let store = TodoStore::open(temp.path()).expect("open store");

        let tasks = vec![Task::new(40, "manual edit".to_string(), Priority::Low)];
        let id = store.next_id(&tasks).expect("next id");
        assert_eq!(id, 41);

        // counter advances monotonically even as the collection shrinks
        let id = store.next_id(&[]).expect("next id");
        assert_eq!(id, 42);
    }

    #[test]
    fn clear_removes_the_key() {
        let temp = tempdir().expect("tempdir");
        let store = TodoStore::open(temp.path()).expect("open store");

        store
            .save(&[Task::new(1, "x".to_string(), Priority::Low)])
            .expect("save");
        store.clear().expect("clear");
        assert!(!store.todos_path.exists());
        assert!(store.load().expect("load").is_empty());

        // clearing an already-absent key is a no-op
        store.clear().expect("clear again");
    }

    #[test]
    fn theme_preference_round_trips() {
        let temp = tempdir().expect("tempdir");
        let store = TodoStore::open(temp.path()).expect("open store");

        assert_eq!(store.load_theme().expect("load"), None);
        store.save_theme(Theme::Light).expect("save");
        assert_eq!(store.load_theme().expect("load"), Some(Theme::Light));
    }
}
