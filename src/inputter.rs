use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// Single line prompt used while editing a filter or a search.
#[derive(Debug, Default)]
pub struct Inputter {
    current_input: String,
    cursor_pos: usize,
    finished: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    /// True if the text differs from before the key press.
    pub changed: bool,
    pub cursor_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        let before = self.current_input.len();
        let mut changed = false;
        match key.code {
            // Every way of leaving the prompt commits what was typed.
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab | KeyCode::BackTab => {
                self.finished = true
            }
            KeyCode::Backspace => changed = self.backspace(),
            KeyCode::Delete => changed = self.delete(),
            KeyCode::Left => self.cursor_pos = self.cursor_pos.saturating_sub(1),
            KeyCode::Right => {
                if self.cursor_pos < self.current_input.chars().count() {
                    self.cursor_pos += 1;
                }
            }
            KeyCode::Home => self.cursor_pos = 0,
            KeyCode::End => self.cursor_pos = self.current_input.chars().count(),
            KeyCode::Char(chr)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.current_input.insert(self.byte_pos(), chr);
                self.cursor_pos += 1;
                changed = true;
            }
            _ => {}
        }
        trace!(
            "Input {:?} ({} -> {} bytes)",
            self.current_input,
            before,
            self.current_input.len()
        );
        InputResult {
            changed,
            ..self.get()
        }
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.current_input.clone(),
            finished: self.finished,
            changed: false,
            cursor_pos: self.cursor_pos,
        }
    }

    pub fn text(&self) -> &str {
        &self.current_input
    }

    pub fn cursor_pos(&self) -> usize {
        self.cursor_pos
    }

    pub fn clear(&mut self) {
        self.finished = false;
        self.current_input.clear();
        self.cursor_pos = 0;
    }

    fn backspace(&mut self) -> bool {
        if self.cursor_pos == 0 {
            return false;
        }
        self.cursor_pos -= 1;
        let at = self.byte_pos();
        self.current_input.remove(at);
        true
    }

    fn delete(&mut self) -> bool {
        if self.cursor_pos >= self.current_input.chars().count() {
            return false;
        }
        let at = self.byte_pos();
        self.current_input.remove(at);
        true
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.cursor_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut Inputter, code: KeyCode) -> InputResult {
        input.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(input: &mut Inputter, s: &str) {
        for c in s.chars() {
            press(input, KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_and_editing() {
        let mut input = Inputter::default();
        type_str(&mut input, "bb");
        press(&mut input, KeyCode::Left);
        let res = press(&mut input, KeyCode::Char('o'));
        assert!(res.changed);
        assert_eq!(res.input, "bob");
        assert_eq!(res.cursor_pos, 2);

        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.text(), "bb");
        press(&mut input, KeyCode::Home);
        press(&mut input, KeyCode::Delete);
        assert_eq!(input.text(), "b");
        let res = press(&mut input, KeyCode::Left);
        assert!(!res.changed);
    }

    #[test]
    fn multibyte_chars() {
        let mut input = Inputter::default();
        type_str(&mut input, "aé");
        press(&mut input, KeyCode::Left);
        type_str(&mut input, "ü");
        assert_eq!(input.text(), "aüé");
        press(&mut input, KeyCode::End);
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.text(), "aü");
    }

    #[test]
    fn every_exit_key_commits() {
        for code in [KeyCode::Enter, KeyCode::Esc, KeyCode::Tab] {
            let mut input = Inputter::default();
            type_str(&mut input, "x");
            let res = press(&mut input, code);
            assert!(res.finished);
            assert_eq!(res.input, "x");
        }
    }

    #[test]
    fn control_chords_are_ignored() {
        let mut input = Inputter::default();
        let res = input.read(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!res.changed);
        assert_eq!(input.text(), "");
        let res = input.read(KeyEvent::new(KeyCode::Char('C'), KeyModifiers::SHIFT));
        assert!(res.changed);
        assert_eq!(input.text(), "C");
    }
}
