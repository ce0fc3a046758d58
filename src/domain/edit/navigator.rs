use crate::domain::entities::edit::{CursorPosition, EditMode};
use crate::domain::entities::record::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    ArrowUp,
    ArrowDown,
    Tab,
    ShiftTab,
    Enter,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Move(CursorPosition),
    /// Commit the focused field and keep the cursor where it is.
    Commit(CursorPosition),
    /// Leave spreadsheet mode; the caller still applies the unsaved-changes prompt.
    Exit,
    None,
}

/// Cursor over the rows as currently displayed. Indices shift whenever
/// sorting or filtering changes, so callers resolve them through `row_id_at`.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetNavigator {
    cursor: Option<CursorPosition>,
    row_count: usize,
    column_count: usize,
}

impl SpreadsheetNavigator {
    pub fn new(row_count: usize, column_count: usize) -> Self {
        Self {
            cursor: None,
            row_count,
            column_count,
        }
    }

    pub fn cursor(&self) -> Option<CursorPosition> {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.cursor = None;
    }

    /// Called whenever the visible rows change; keeps the cursor on the grid.
    pub fn set_grid(&mut self, row_count: usize, column_count: usize) {
        self.row_count = row_count;
        self.column_count = column_count;
        if row_count == 0 || column_count == 0 {
            self.cursor = None;
            return;
        }
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.row = cursor.row.min(row_count - 1);
            cursor.col = cursor.col.min(column_count - 1);
        }
    }

    pub fn handle_cell_click(&mut self, row: usize, col: usize) -> Option<CursorPosition> {
        if row >= self.row_count || col >= self.column_count {
            return None;
        }
        let position = CursorPosition::new(row, col);
        self.cursor = Some(position);
        Some(position)
    }

    pub fn handle_key(&mut self, key: NavKey, mode: &EditMode) -> NavAction {
        if mode.is_viewing() {
            return NavAction::None;
        }
        if key == NavKey::Escape {
            return NavAction::Exit;
        }
        if self.row_count == 0 || self.column_count == 0 {
            return NavAction::None;
        }

        let Some(current) = self.cursor else {
            return self.move_to(CursorPosition::new(0, 0));
        };
        let last_row = self.row_count - 1;
        let last_col = self.column_count - 1;

        match key {
            NavKey::ArrowUp if current.row == 0 => NavAction::Exit,
            NavKey::ArrowUp => self.move_to(CursorPosition::new(current.row - 1, current.col)),
            NavKey::ArrowDown if current.row >= last_row => NavAction::Exit,
            NavKey::ArrowDown => self.move_to(CursorPosition::new(current.row + 1, current.col)),
            NavKey::Tab if current.col < last_col => {
                self.move_to(CursorPosition::new(current.row, current.col + 1))
            }
            NavKey::Tab if current.row < last_row => {
                self.move_to(CursorPosition::new(current.row + 1, 0))
            }
            NavKey::ShiftTab if current.col > 0 => {
                self.move_to(CursorPosition::new(current.row, current.col - 1))
            }
            NavKey::ShiftTab if current.row > 0 => {
                self.move_to(CursorPosition::new(current.row - 1, last_col))
            }
            NavKey::Tab | NavKey::ShiftTab => NavAction::None,
            NavKey::Enter => NavAction::Commit(current),
            NavKey::Escape => NavAction::Exit,
        }
    }

    fn move_to(&mut self, position: CursorPosition) -> NavAction {
        self.cursor = Some(position);
        NavAction::Move(position)
    }

    pub fn row_id_at<'a>(&self, visible_rows: &'a [RowId]) -> Option<&'a RowId> {
        self.cursor
            .and_then(|cursor| visible_rows.get(cursor.row))
    }

    /// Keeps the cursor on the same record when the visible rows are
    /// re-sorted or re-filtered. Falls back to clamping when it is gone.
    pub fn follow_rows(&mut self, before: &[RowId], after: &[RowId], column_count: usize) {
        let focused = self.row_id_at(before).cloned();
        self.set_grid(after.len(), column_count);
        let (Some(id), Some(cursor)) = (focused, self.cursor) else {
            return;
        };
        if let Some(row) = after.iter().position(|candidate| *candidate == id) {
            self.cursor = Some(CursorPosition::new(row, cursor.col));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editing() -> EditMode {
        EditMode::BulkEdit
    }

    #[test]
    fn keys_are_ignored_while_viewing() {
        let mut nav = SpreadsheetNavigator::new(3, 3);
        nav.handle_cell_click(1, 1);
        assert_eq!(nav.handle_key(NavKey::ArrowDown, &EditMode::Viewing), NavAction::None);
        assert_eq!(nav.handle_key(NavKey::Escape, &EditMode::Viewing), NavAction::None);
        assert_eq!(nav.cursor(), Some(CursorPosition::new(1, 1)));
    }

    #[test]
    fn vertical_moves_exit_past_the_edges() {
        let mut nav = SpreadsheetNavigator::new(2, 3);
        nav.handle_cell_click(0, 2);

        assert_eq!(nav.handle_key(NavKey::ArrowUp, &editing()), NavAction::Exit);
        assert_eq!(
            nav.handle_key(NavKey::ArrowDown, &editing()),
            NavAction::Move(CursorPosition::new(1, 2))
        );
        assert_eq!(nav.handle_key(NavKey::ArrowDown, &editing()), NavAction::Exit);
        assert_eq!(nav.cursor(), Some(CursorPosition::new(1, 2)));
    }

    #[test]
    fn tab_wraps_between_rows() {
        let mut nav = SpreadsheetNavigator::new(2, 2);
        nav.handle_cell_click(0, 1);

        assert_eq!(
            nav.handle_key(NavKey::Tab, &editing()),
            NavAction::Move(CursorPosition::new(1, 0))
        );
        assert_eq!(
            nav.handle_key(NavKey::ShiftTab, &editing()),
            NavAction::Move(CursorPosition::new(0, 1))
        );
        nav.handle_cell_click(1, 1);
        assert_eq!(nav.handle_key(NavKey::Tab, &editing()), NavAction::None);
        nav.handle_cell_click(0, 0);
        assert_eq!(nav.handle_key(NavKey::ShiftTab, &editing()), NavAction::None);
    }

    #[test]
    fn enter_commits_without_moving_and_escape_exits() {
        let mut nav = SpreadsheetNavigator::new(2, 2);
        nav.handle_cell_click(1, 0);
        let quick = EditMode::QuickEdit(RowId::from("S1"));

        assert_eq!(
            nav.handle_key(NavKey::Enter, &quick),
            NavAction::Commit(CursorPosition::new(1, 0))
        );
        assert_eq!(nav.cursor(), Some(CursorPosition::new(1, 0)));
        assert_eq!(nav.handle_key(NavKey::Escape, &quick), NavAction::Exit);
    }

    #[test]
    fn shrinking_the_grid_clamps_the_cursor() {
        let mut nav = SpreadsheetNavigator::new(10, 4);
        nav.handle_cell_click(8, 3);

        nav.set_grid(3, 2);
        assert_eq!(nav.cursor(), Some(CursorPosition::new(2, 1)));

        nav.set_grid(0, 2);
        assert_eq!(nav.cursor(), None);
        assert_eq!(nav.handle_cell_click(0, 0), None);
    }

    #[test]
    fn cursor_maps_back_to_row_identity() {
        let visible = vec![RowId::from("S3"), RowId::from("S1"), RowId::from("S2")];
        let mut nav = SpreadsheetNavigator::new(visible.len(), 2);
        assert_eq!(nav.row_id_at(&visible), None);

        nav.handle_cell_click(1, 0);
        assert_eq!(nav.row_id_at(&visible), Some(&RowId::from("S1")));
    }

    #[test]
    fn cursor_follows_its_row_after_a_resort() {
        let before = vec![RowId::from("S1"), RowId::from("S2"), RowId::from("S3")];
        let mut nav = SpreadsheetNavigator::new(before.len(), 4);
        nav.handle_cell_click(2, 3);

        let after = vec![RowId::from("S3"), RowId::from("S1"), RowId::from("S2")];
        nav.follow_rows(&before, &after, 4);
        assert_eq!(nav.cursor(), Some(CursorPosition::new(0, 3)));

        let filtered = vec![RowId::from("S1")];
        nav.follow_rows(&after, &filtered, 4);
        assert_eq!(nav.cursor(), Some(CursorPosition::new(0, 3)));
        assert_eq!(nav.row_id_at(&filtered), Some(&RowId::from("S1")));
    }
}
