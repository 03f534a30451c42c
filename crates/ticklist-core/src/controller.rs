use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::repo::TaskRepository;
use crate::task::{Priority, Task};
use crate::view::{DisplayTask, ViewMode, filtered};

/// Which derived state a gesture invalidated. Single-task operations
/// refresh only what they touched; bulk operations reload everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Refresh {
    pub list: bool,
    pub count: bool,
    pub empty: bool,
    pub progress: bool,
}

impl Refresh {
    pub fn full() -> Self {
        Self {
            list: true,
            count: true,
            empty: true,
            progress: true,
        }
    }

    pub fn progress_only() -> Self {
        Self {
            progress: true,
            ..Self::default()
        }
    }

    pub fn nothing() -> Self {
        Self::default()
    }
}

/// Deferred, purely cosmetic work drained by `poll`. Neither variant
/// touches the store; the authoritative writes happen synchronously in the
/// gesture that queued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    RemoveFromDisplay(u64),
    Relayout,
}

/// Where a pointer gesture originated on a task row. Drags are honored only
/// from the handle, so clicks and edits on the body never start one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripZone {
    Handle,
    Body,
}

/// On-screen geometry of one task row, in display order, as reported by the
/// UI layer during a drag.
#[derive(Debug, Clone, Copy)]
pub struct RowBox {
    pub id: u64,
    pub top: f64,
    pub height: f64,
}

#[derive(Debug)]
struct EditSession {
    id: u64,
    original: String,
}

#[derive(Debug)]
struct DragSession {
    dragged: u64,
    /// Live displayed id order; authoritative once the drop lands.
    order: Vec<u64>,
}

/// Translates user gestures into repository calls and reports what to
/// re-render. Single-threaded and gesture-driven: every mutation runs to
/// completion before the next gesture is seen.
#[derive(Debug)]
pub struct Controller {
    repo: TaskRepository,
    mode: ViewMode,
    edit: Option<EditSession>,
    drag: Option<DragSession>,
    pending_removals: Vec<(u64, Instant)>,
    delete_feedback: Duration,
    resize_quiet: Duration,
    resize_deadline: Option<Instant>,
}

impl Controller {
    pub fn new(repo: TaskRepository, delete_feedback: Duration, resize_quiet: Duration) -> Self {
        Self {
            repo,
            mode: ViewMode::All,
            edit: None,
            drag: None,
            pending_removals: Vec::new(),
            delete_feedback,
            resize_quiet,
            resize_deadline: None,
        }
    }

    pub fn repo(&self) -> &TaskRepository {
        &self.repo
    }

    pub fn view_mode(&self) -> ViewMode {
        self.mode
    }

    /// The display tasks visible under the current filter mode.
    pub fn visible(&self) -> anyhow::Result<Vec<DisplayTask>> {
        let tasks = self.repo.tasks()?;
        Ok(filtered(&tasks, self.mode))
    }

    #[tracing::instrument(skip(self, text))]
    pub fn submit(&mut self, text: &str, priority: Priority) -> anyhow::Result<(Option<Task>, Refresh)> {
        let created = self.repo.create(text, priority)?;
        let refresh = if created.is_some() {
            Refresh::full()
        } else {
            Refresh::nothing()
        };
        Ok((created, refresh))
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_completed(&mut self, id: u64) -> anyhow::Result<Refresh> {
        let tasks = self.repo.tasks()?;
        let Some(current) = tasks.iter().find(|t| t.id == id) else {
            debug!(id, "toggle on absent id");
            return Ok(Refresh::nothing());
        };
        self.repo.set_completed(id, !current.completed)?;
        Ok(Refresh::progress_only())
    }

    /// Optimistic delete: the store write is authoritative and happens now;
    /// the display keeps the row until the visual-feedback delay elapses.
    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: u64, now: Instant) -> anyhow::Result<Refresh> {
        if !self.repo.remove(id)? {
            return Ok(Refresh::nothing());
        }
        self.pending_removals.push((id, now + self.delete_feedback));
        Ok(Refresh {
            count: true,
            empty: true,
            progress: true,
            ..Refresh::default()
        })
    }

    /// Pure display filter; the store is never touched.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> Refresh {
        self.mode = mode;
        Refresh {
            list: true,
            ..Refresh::default()
        }
    }

    /// Starts editing `id`, seeding the session with the current text.
    /// Unknown ids are ignored.
    #[tracing::instrument(skip(self))]
    pub fn begin_edit(&mut self, id: u64) -> anyhow::Result<Option<String>> {
        let tasks = self.repo.tasks()?;
        let Some(task) = tasks.iter().find(|t| t.id == id) else {
            debug!(id, "edit on absent id");
            return Ok(None);
        };
        let original = task.text.clone();
        self.edit = Some(EditSession {
            id,
            original: original.clone(),
        });
        Ok(Some(original))
    }

    /// Commits the in-flight edit. Empty text cancels it and the original
    /// is retained, matching the repository's rejection rule.
    #[tracing::instrument(skip(self, text))]
    pub fn commit_edit(&mut self, text: &str) -> anyhow::Result<Refresh> {
        let Some(session) = self.edit.take() else {
            return Ok(Refresh::nothing());
        };
        if self.repo.set_text(session.id, text)? {
            info!(id = session.id, "edit committed");
            Ok(Refresh {
                list: true,
                ..Refresh::default()
            })
        } else {
            debug!(id = session.id, original = %session.original, "edit cancelled, original retained");
            Ok(Refresh::nothing())
        }
    }

    /// Discards the in-flight edit without touching the repository.
    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    pub fn editing(&self) -> Option<u64> {
        self.edit.as_ref().map(|s| s.id)
    }

    /// Starts a drag, but only when the gesture originated on the handle
    /// region. The session snapshots the current persisted order.
    #[tracing::instrument(skip(self))]
    pub fn begin_drag(&mut self, id: u64, zone: GripZone) -> anyhow::Result<bool> {
        if zone != GripZone::Handle {
            debug!(id, "drag refused: gesture not on handle");
            return Ok(false);
        }
        let order: Vec<u64> = self.repo.tasks()?.iter().map(|t| t.id).collect();
        if !order.contains(&id) {
            return Ok(false);
        }
        self.drag = Some(DragSession { dragged: id, order });
        Ok(true)
    }

    /// Recomputes the dragged item's landing slot for the pointer's
    /// vertical position and reorders the live display order. `rows` are
    /// the rows other than the dragged one, in current display order.
    pub fn drag_over(&mut self, rows: &[RowBox], pointer_y: f64) -> Option<&[u64]> {
        let drag = self.drag.as_mut()?;

        let target = drop_target(rows, pointer_y);
        let mut order: Vec<u64> = rows.iter().map(|r| r.id).collect();
        match target {
            Some(before) => {
                let idx = order.iter().position(|&id| id == before)?;
                order.insert(idx, drag.dragged);
            }
            None => order.push(drag.dragged),
        }
        drag.order = order;
        Some(&drag.order)
    }

    /// Ends the drag and persists the final displayed order.
    #[tracing::instrument(skip(self))]
    pub fn finish_drag(&mut self) -> anyhow::Result<Refresh> {
        let Some(drag) = self.drag.take() else {
            return Ok(Refresh::nothing());
        };
        self.repo.reorder(&drag.order)?;
        info!(id = drag.dragged, "drag persisted");
        Ok(Refresh {
            list: true,
            ..Refresh::default()
        })
    }

    pub fn dragging(&self) -> Option<u64> {
        self.drag.as_ref().map(|d| d.dragged)
    }

    #[tracing::instrument(skip(self))]
    pub fn mark_all(&mut self) -> anyhow::Result<Refresh> {
        self.repo.mark_all_completed()?;
        Ok(Refresh::full())
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&mut self) -> anyhow::Result<Refresh> {
        self.repo.clear_completed()?;
        Ok(Refresh::full())
    }

    #[tracing::instrument(skip(self))]
    pub fn clear_all(&mut self) -> anyhow::Result<Refresh> {
        self.repo.clear_all()?;
        Ok(Refresh::full())
    }

    /// Coalesces a burst of resize events into one relayout once the input
    /// stream has been quiet for the configured period.
    pub fn notice_resize(&mut self, now: Instant) {
        self.resize_deadline = Some(now + self.resize_quiet);
    }

    /// Drains deferred cosmetic effects that have come due.
    pub fn poll(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        let mut still_pending = Vec::new();
        for (id, due) in self.pending_removals.drain(..) {
            if due <= now {
                effects.push(Effect::RemoveFromDisplay(id));
            } else {
                still_pending.push((id, due));
            }
        }
        self.pending_removals = still_pending;

        if let Some(deadline) = self.resize_deadline
            && deadline <= now
        {
            self.resize_deadline = None;
            effects.push(Effect::Relayout);
        }

        effects
    }
}

/// The task the dragged item should land before: the first row in display
/// order whose vertical midpoint lies below the pointer. `None` means
/// append at the end. Equal midpoints resolve to the first row encountered.
fn drop_target(rows: &[RowBox], pointer_y: f64) -> Option<u64> {
    rows.iter()
        .find(|row| pointer_y < row.top + row.height / 2.0)
        .map(|row| row.id)
}
