use time::OffsetDateTime;

use crate::types::notebook::{Notebook, Page, Point, Stroke};

/// Flush a whole-page snapshot after this many accumulated strokes rather
/// than per-stroke, to bound write amplification.
pub const AUTO_SAVE_STROKES: usize = 5;

/// One open drawing-board session: the notebook a client is editing, the page
/// it is viewing, and the stroke count since the last flush.
///
/// A flush is always a full snapshot of the notebook, never a delta, so a
/// failed or repeated flush needs no rollback: the next snapshot carries the
/// cumulative state. Callers persist the returned snapshot to the store and
/// hand it to the relay; this type never does I/O itself.
pub struct BoardSession {
    notebook: Option<Notebook>,
    page_index: usize,
    pending_strokes: usize,
}

impl BoardSession {
    pub fn new() -> Self {
        Self {
            notebook: None,
            page_index: 0,
            pending_strokes: 0,
        }
    }

    pub fn notebook(&self) -> Option<&Notebook> {
        self.notebook.as_ref()
    }

    /// Zero-based index of the viewed page; `None` with no notebook open.
    pub fn page_index(&self) -> Option<usize> {
        self.notebook.as_ref().map(|_| self.page_index)
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.notebook.as_ref().and_then(|nb| nb.pages.get(self.page_index))
    }

    /// Opens `notebook` at its first page. Unsaved strokes on the previously
    /// open notebook are flushed first.
    pub fn select_notebook(&mut self, notebook: Notebook) -> Option<Notebook> {
        let flushed = self.take_pending();
        self.notebook = Some(notebook);
        self.page_index = 0;
        flushed
    }

    /// Closes the notebook, flushing unsaved strokes first.
    pub fn close_notebook(&mut self) -> Option<Notebook> {
        let flushed = self.take_pending();
        self.notebook = None;
        self.page_index = 0;
        flushed
    }

    /// Appends a stroke to the viewed page, then auto-saves if due. Ignored
    /// with no notebook open.
    pub fn record_stroke(&mut self, points: Vec<Point>, at: OffsetDateTime) -> Option<Notebook> {
        let page_index = self.page_index;
        let page = self.notebook.as_mut()?.pages.get_mut(page_index)?;
        page.drawings.push(Stroke {
            points,
            timestamp: at,
        });
        self.pending_strokes += 1;
        self.maybe_flush()
    }

    /// A snapshot of the notebook when the viewed page has accumulated a
    /// multiple of [`AUTO_SAVE_STROKES`] strokes, `None` otherwise.
    pub fn maybe_flush(&mut self) -> Option<Notebook> {
        let stroke_count = self.current_page()?.drawings.len();
        if stroke_count == 0 || stroke_count % AUTO_SAVE_STROKES != 0 {
            return None;
        }
        self.pending_strokes = 0;
        self.notebook.clone()
    }

    /// Unconditional snapshot, the "save" button. Clears the pending count.
    pub fn flush(&mut self) -> Option<Notebook> {
        self.pending_strokes = 0;
        self.notebook.clone()
    }

    pub fn next_page(&mut self) -> Option<Notebook> {
        self.change_page(1)
    }

    pub fn prev_page(&mut self) -> Option<Notebook> {
        self.change_page(-1)
    }

    fn change_page(&mut self, direction: isize) -> Option<Notebook> {
        let page_count = self.notebook.as_ref()?.pages.len();
        let target = self.page_index as isize + direction;
        if target < 0 || target >= page_count as isize {
            return None;
        }
        let flushed = self.take_pending();
        self.page_index = target as usize;
        flushed
    }

    /// Appends a blank page and moves onto it.
    pub fn add_page(&mut self) -> Option<Notebook> {
        self.notebook.as_ref()?;
        let flushed = self.take_pending();
        let notebook = self.notebook.as_mut().expect("checked above");
        let next_number = notebook.pages.len() as u32 + 1;
        notebook.pages.push(Page::blank(next_number));
        self.page_index = notebook.pages.len() - 1;
        flushed
    }

    /// Replaces the viewed page with a blank one, staying put. The cleared
    /// state rides along with the next flush.
    pub fn clear_page(&mut self) {
        let page_index = self.page_index;
        if let Some(page) = self
            .notebook
            .as_mut()
            .and_then(|nb| nb.pages.get_mut(page_index))
        {
            *page = Page::blank(page.page_number);
        }
    }

    /// Every transition away from a viewed page first flushes whatever
    /// strokes have not been saved yet.
    fn take_pending(&mut self) -> Option<Notebook> {
        if self.pending_strokes == 0 {
            return None;
        }
        self.pending_strokes = 0;
        self.notebook.clone()
    }
}

impl Default for BoardSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn notebook_with_pages(count: u32) -> Notebook {
        Notebook {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Physics".to_string(),
            pages: (1..=count).map(Page::blank).collect(),
            texts: Vec::new(),
            is_shared: false,
            shared_with: Vec::new(),
            last_modified: OffsetDateTime::UNIX_EPOCH,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn stroke_points() -> Vec<Point> {
        vec![Point { x: 1.0, y: 2.0 }, Point { x: 3.0, y: 4.0 }]
    }

    fn record(session: &mut BoardSession) -> Option<Notebook> {
        session.record_stroke(stroke_points(), OffsetDateTime::UNIX_EPOCH)
    }

    #[test]
    fn record_stroke__should_flush_on_every_fifth_stroke() {
        // Given
        let mut session = BoardSession::new();
        session.select_notebook(notebook_with_pages(1));

        // When / Then
        for _ in 0..4 {
            assert!(record(&mut session).is_none());
        }
        let snapshot = record(&mut session).expect("flush at fifth stroke");
        assert_eq!(snapshot.pages[0].drawings.len(), 5);

        for _ in 0..4 {
            assert!(record(&mut session).is_none());
        }
        let snapshot = record(&mut session).expect("flush at tenth stroke");
        assert_eq!(snapshot.pages[0].drawings.len(), 10);
    }

    #[test]
    fn maybe_flush__should_be_idempotent_for_the_same_buffer() {
        // Given
        let mut session = BoardSession::new();
        session.select_notebook(notebook_with_pages(1));
        let mut first = None;
        for _ in 0..AUTO_SAVE_STROKES {
            first = record(&mut session);
        }

        // When: a retried client flushes the same accumulated buffer again
        let second = session.maybe_flush();

        // Then: full replacement, so the stored page state is identical
        assert_eq!(first.expect("first flush"), second.expect("second flush"));
    }

    #[test]
    fn maybe_flush__should_not_fire_on_an_empty_page() {
        // Given
        let mut session = BoardSession::new();
        session.select_notebook(notebook_with_pages(1));

        // Then
        assert!(session.maybe_flush().is_none());
    }

    #[test]
    fn add_page__should_append_blank_page_and_move_to_it() {
        // Given
        let mut session = BoardSession::new();
        session.select_notebook(notebook_with_pages(3));

        // When
        session.add_page();

        // Then
        let notebook = session.notebook().expect("notebook open");
        assert_eq!(notebook.page_count(), 4);
        assert_eq!(notebook.pages[3], Page::blank(4));
        assert_eq!(session.page_index(), Some(3));
    }

    #[test]
    fn prev_page__should_be_a_no_op_at_the_first_page() {
        // Given
        let mut session = BoardSession::new();
        session.select_notebook(notebook_with_pages(3));

        // When
        let flushed = session.prev_page();

        // Then
        assert!(flushed.is_none());
        assert_eq!(session.page_index(), Some(0));
    }

    #[test]
    fn next_page__should_clamp_at_the_last_page() {
        // Given
        let mut session = BoardSession::new();
        session.select_notebook(notebook_with_pages(2));
        session.next_page();
        assert_eq!(session.page_index(), Some(1));

        // When
        session.next_page();

        // Then
        assert_eq!(session.page_index(), Some(1));
    }

    #[test]
    fn change_page__should_flush_unsaved_strokes_before_moving() {
        // Given
        let mut session = BoardSession::new();
        session.select_notebook(notebook_with_pages(2));
        record(&mut session);
        record(&mut session);

        // When
        let flushed = session.next_page().expect("flush before transition");

        // Then: the snapshot carries the strokes drawn on the page we left
        assert_eq!(flushed.pages[0].drawings.len(), 2);
        assert_eq!(session.page_index(), Some(1));

        // And the pending buffer was reset by the transition
        assert!(session.prev_page().is_none());
    }

    #[test]
    fn add_page__should_flush_before_appending() {
        // Given
        let mut session = BoardSession::new();
        session.select_notebook(notebook_with_pages(1));
        record(&mut session);

        // When
        let flushed = session.add_page().expect("flush before transition");

        // Then: the flushed snapshot does not yet contain the new page
        assert_eq!(flushed.page_count(), 1);
        assert_eq!(session.notebook().expect("open").page_count(), 2);
    }

    #[test]
    fn select_notebook__should_flush_the_previous_notebook() {
        // Given
        let mut session = BoardSession::new();
        let first = notebook_with_pages(1);
        let first_id = first.id;
        session.select_notebook(first);
        record(&mut session);

        // When
        let flushed = session.select_notebook(notebook_with_pages(1));

        // Then
        assert_eq!(flushed.expect("flush of previous notebook").id, first_id);
        assert_eq!(session.page_index(), Some(0));
    }

    #[test]
    fn clear_page__should_replace_content_and_stay_put() {
        // Given
        let mut session = BoardSession::new();
        session.select_notebook(notebook_with_pages(2));
        session.next_page();
        record(&mut session);

        // When
        session.clear_page();

        // Then
        assert_eq!(session.page_index(), Some(1));
        let page = session.current_page().expect("page");
        assert!(page.drawings.is_empty());
        assert_eq!(page.page_number, 2);
    }

    #[test]
    fn navigation__should_be_inert_with_no_notebook_selected() {
        // Given
        let mut session = BoardSession::new();

        // Then
        assert!(session.next_page().is_none());
        assert!(session.prev_page().is_none());
        assert!(session.add_page().is_none());
        assert!(record(&mut session).is_none());
        assert!(session.page_index().is_none());
        session.clear_page();
        assert!(session.notebook().is_none());
    }
}
