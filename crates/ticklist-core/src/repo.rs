use tracing::{debug, info};

use crate::store::TodoStore;
use crate::task::{Priority, Task};

/// The only component allowed to touch the store. Every operation is
/// load-mutate-save: a failed save drops the mutated copy, so memory and
/// storage never diverge.
#[derive(Debug)]
pub struct TaskRepository {
    store: TodoStore,
}

impl TaskRepository {
    pub fn new(store: TodoStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TodoStore {
        &self.store
    }

    #[tracing::instrument(skip(self))]
    pub fn tasks(&self) -> anyhow::Result<Vec<Task>> {
        self.store.load()
    }

    /// Appends a new task. Whitespace-only text is rejected as a no-op.
    /// Returns the stored task, id included, so the caller can render it
    /// without a second read.
    #[tracing::instrument(skip(self, text))]
    pub fn create(&self, text: &str, priority: Priority) -> anyhow::Result<Option<Task>> {
        let text = text.trim();
        if text.is_empty() {
            debug!("rejected empty task text");
            return Ok(None);
        }

        let mut tasks = self.store.load()?;
        let id = self.store.next_id(&tasks)?;
        let task = Task::new(id, text.to_string(), priority);
        tasks.push(task.clone());
        self.store.save(&tasks)?;

        info!(id, "created task");
        Ok(Some(task))
    }

    /// Deletes by id. An absent id is a benign no-op (double-delete race).
    #[tracing::instrument(skip(self))]
    pub fn remove(&self, id: u64) -> anyhow::Result<bool> {
        let mut tasks = self.store.load()?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            debug!(id, "remove: id not present");
            return Ok(false);
        }
        self.store.save(&tasks)?;
        info!(id, "removed task");
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub fn set_completed(&self, id: u64, completed: bool) -> anyhow::Result<bool> {
        let mut tasks = self.store.load()?;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "set_completed: id not present");
            return Ok(false);
        };
        task.completed = completed;
        self.store.save(&tasks)?;
        Ok(true)
    }

    /// Overwrites a task's text. Whitespace-only text cancels the edit and
    /// the original is retained.
    #[tracing::instrument(skip(self, text))]
    pub fn set_text(&self, id: u64, text: &str) -> anyhow::Result<bool> {
        let text = text.trim();
        if text.is_empty() {
            debug!(id, "rejected empty edit");
            return Ok(false);
        }

        let mut tasks = self.store.load()?;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "set_text: id not present");
            return Ok(false);
        };
        task.text = text.to_string();
        self.store.save(&tasks)?;
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub fn mark_all_completed(&self) -> anyhow::Result<usize> {
        let mut tasks = self.store.load()?;
        let mut changed = 0;
        for task in &mut tasks {
            if !task.completed {
                task.completed = true;
                changed += 1;
            }
        }
        if changed > 0 {
            self.store.save(&tasks)?;
        }
        info!(changed, "marked all completed");
        Ok(changed)
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&self) -> anyhow::Result<usize> {
        let mut tasks = self.store.load()?;
        let before = tasks.len();
        tasks.retain(|t| !t.completed);
        let removed = before - tasks.len();
        if removed > 0 {
            self.store.save(&tasks)?;
        }
        info!(removed, "cleared completed tasks");
        Ok(removed)
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_all(&self) -> anyhow::Result<()> {
        self.store.clear()?;
        info!("cleared all tasks");
        Ok(())
    }

    /// Rewrites the collection order to match `id_order` (typically the
    /// final displayed order after a drag). Ids present in storage but
    /// missing from the sequence are appended at the end in their prior
    /// relative order, so a race with a concurrent deletion never loses a
    /// task. Unknown ids in the sequence are ignored.
    #[tracing::instrument(skip(self, id_order))]
    pub fn reorder(&self, id_order: &[u64]) -> anyhow::Result<()> {
        let tasks = self.store.load()?;

        let mut remaining: Vec<Option<Task>> = tasks.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(remaining.len());

        for &id in id_order {
            if let Some(slot) = remaining.iter_mut().find(|s| {
                s.as_ref().map(|t| t.id) == Some(id)
            }) {
                if let Some(task) = slot.take() {
                    ordered.push(task);
                }
            }
        }

        // data-loss guard: anything not named in the new order keeps its
        // prior relative position at the tail
        ordered.extend(remaining.into_iter().flatten());

        self.store.save(&ordered)?;
        debug!(count = ordered.len(), "persisted new order");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::TaskRepository;
    use crate::store::TodoStore;
    use crate::task::Priority;

    fn repo(dir: &std::path::Path) -> TaskRepository {
        TaskRepository::new(TodoStore::open(dir).expect("open store"))
    }

    #[test]
    fn create_assigns_distinct_ids() {
        let temp = tempdir().expect("tempdir");
        let repo = repo(temp.path());

        let mut ids = Vec::new();
        for i in 0..20 {
            let task = repo
                .create(&format!("task {i}"), Priority::Low)
                .expect("create")
                .expect("accepted");
            ids.push(task.id);
        }

        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn empty_text_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let repo = repo(temp.path());

        assert!(repo.create("", Priority::Low).expect("create").is_none());
        assert!(repo.create("   ", Priority::Low).expect("create").is_none());
        assert!(repo.tasks().expect("tasks").is_empty());
    }

    #[test]
    fn create_trims_text() {
        let temp = tempdir().expect("tempdir");
        let repo = repo(temp.path());

        let task = repo
            .create("  Buy milk  ", Priority::Medium)
            .expect("create")
            .expect("accepted");
        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
    }

    #[test]
    fn remove_absent_id_is_a_noop() {
        let temp = tempdir().expect("tempdir");
        let repo = repo(temp.path());

        repo.create("keep me", Priority::Low).expect("create");
        assert!(!repo.remove(9999).expect("remove"));
        assert_eq!(repo.tasks().expect("tasks").len(), 1);
    }

    #[test]
    fn set_text_empty_retains_original() {
        let temp = tempdir().expect("tempdir");
        let repo = repo(temp.path());

        let task = repo
            .create("original", Priority::Low)
            .expect("create")
            .expect("accepted");

        assert!(!repo.set_text(task.id, "   ").expect("set_text"));
        assert_eq!(repo.tasks().expect("tasks")[0].text, "original");

        assert!(repo.set_text(task.id, "edited").expect("set_text"));
        assert_eq!(repo.tasks().expect("tasks")[0].text, "edited");
    }

    #[test]
    fn reorder_matches_requested_sequence() {
        let temp = tempdir().expect("tempdir");
        let repo = repo(temp.path());

        let a = repo.create("A", Priority::Low).expect("create").expect("a");
        let b = repo.create("B", Priority::Low).expect("create").expect("b");
        let c = repo.create("C", Priority::Low).expect("create").expect("c");

        repo.reorder(&[c.id, a.id, b.id]).expect("reorder");

        let texts: Vec<String> = repo
            .tasks()
            .expect("tasks")
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["C", "A", "B"]);
    }

    #[test]
    fn reorder_with_partial_list_retains_omitted_tasks() {
        let temp = tempdir().expect("tempdir");
        let repo = repo(temp.path());

        let a = repo.create("A", Priority::Low).expect("create").expect("a");
        let _b = repo.create("B", Priority::Low).expect("create").expect("b");
        let c = repo.create("C", Priority::Low).expect("create").expect("c");
        let _d = repo.create("D", Priority::Low).expect("create").expect("d");

        // B and D omitted, e.g. a concurrent deletion raced the drag
        repo.reorder(&[c.id, a.id]).expect("reorder");

        let texts: Vec<String> = repo
            .tasks()
            .expect("tasks")
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["C", "A", "B", "D"]);
    }

    #[test]
    fn reorder_ignores_unknown_ids() {
        let temp = tempdir().expect("tempdir");
        let repo = repo(temp.path());

        let a = repo.create("A", Priority::Low).expect("create").expect("a");
        let b = repo.create("B", Priority::Low).expect("create").expect("b");

        repo.reorder(&[777, b.id, a.id]).expect("reorder");

        let ids: Vec<u64> = repo
            .tasks()
            .expect("tasks")
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn bulk_operations() {
        let temp = tempdir().expect("tempdir");
        let repo = repo(temp.path());

        let a = repo.create("A", Priority::Low).expect("create").expect("a");
        repo.create("B", Priority::Low).expect("create").expect("b");

        assert_eq!(repo.mark_all_completed().expect("mark all"), 2);
        assert!(repo.tasks().expect("tasks").iter().all(|t| t.completed));

        repo.set_completed(a.id, false).expect("uncomplete");
        assert_eq!(repo.clear_completed().expect("clear completed"), 1);

        let tasks = repo.tasks().expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, a.id);

        repo.clear_all().expect("clear all");
        assert!(repo.tasks().expect("tasks").is_empty());
    }
}
