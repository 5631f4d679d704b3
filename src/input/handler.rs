use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};

/// What the plot viewer should do in response to a terminal event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerAction {
    /// Pointer moved to a terminal cell
    Hover { column: u16, row: u16 },
    /// Pointer left the view
    ClearHover,
    Redraw,
    Quit,
    None,
}

pub struct InputHandler;

impl InputHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_event(&self, event: &Event) -> ViewerAction {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key_event(*key),
            Event::Mouse(mouse) => self.handle_mouse_event(*mouse),
            Event::FocusLost => ViewerAction::ClearHover,
            Event::Resize(_, _) => ViewerAction::Redraw,
            _ => ViewerAction::None,
        }
    }

    pub fn handle_key_event(&self, key: KeyEvent) -> ViewerAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return ViewerAction::Quit;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => ViewerAction::Quit,
            _ => ViewerAction::None,
        }
    }

    pub fn handle_mouse_event(&self, mouse: MouseEvent) -> ViewerAction {
        match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) | MouseEventKind::Down(_) => {
                ViewerAction::Hover {
                    column: mouse.column,
                    row: mouse.row,
                }
            }
            _ => ViewerAction::None,
        }
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::MouseButton;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_quit_keys() {
        let handler = InputHandler::new();

        let q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(handler.handle_key_event(q), ViewerAction::Quit);

        let q_upper = KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT);
        assert_eq!(handler.handle_key_event(q_upper), ViewerAction::Quit);

        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(handler.handle_key_event(esc), ViewerAction::Quit);
    }

    #[test]
    fn test_ctrl_c() {
        let handler = InputHandler::new();

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handler.handle_key_event(ctrl_c), ViewerAction::Quit);

        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(handler.handle_key_event(plain_c), ViewerAction::None);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let handler = InputHandler::new();

        let mut release = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(handler.handle_event(&Event::Key(release)), ViewerAction::None);
    }

    #[test]
    fn test_mouse_motion_hovers() {
        let handler = InputHandler::new();

        assert_eq!(
            handler.handle_event(&Event::Mouse(mouse(MouseEventKind::Moved, 12, 4))),
            ViewerAction::Hover { column: 12, row: 4 }
        );
        assert_eq!(
            handler.handle_mouse_event(mouse(MouseEventKind::Drag(MouseButton::Left), 1, 2)),
            ViewerAction::Hover { column: 1, row: 2 }
        );
        assert_eq!(
            handler.handle_mouse_event(mouse(MouseEventKind::ScrollUp, 1, 2)),
            ViewerAction::None
        );
    }

    #[test]
    fn test_focus_and_resize() {
        let handler = InputHandler::new();

        assert_eq!(handler.handle_event(&Event::FocusLost), ViewerAction::ClearHover);
        assert_eq!(handler.handle_event(&Event::Resize(80, 24)), ViewerAction::Redraw);
    }
}
