/// Single-line draft behind the input field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptInput {
    draft: String,
}

impl PromptInput {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn insert(&mut self, c: char) {
        // Single line only.
        if c != '\n' && c != '\r' {
            self.draft.push(c);
        }
    }

    pub fn backspace(&mut self) {
        self.draft.pop();
    }

    pub fn clear(&mut self) {
        self.draft.clear();
    }

    /// Take the draft for sending, unmodified, leaving the field empty.
    pub fn send(&mut self) -> String {
        std::mem::take(&mut self.draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_returns_draft_verbatim_and_clears() {
        let mut input = PromptInput::default();
        for c in " Hi  there ".chars() {
            input.insert(c);
        }
        assert_eq!(input.send(), " Hi  there ");
        assert_eq!(input.draft(), "");
    }

    #[test]
    fn empty_draft_sends_empty_string() {
        let mut input = PromptInput::default();
        assert_eq!(input.send(), "");
    }

    #[test]
    fn newlines_are_ignored_and_backspace_removes_a_char() {
        let mut input = PromptInput::default();
        for c in "ab\ncé".chars() {
            input.insert(c);
        }
        assert_eq!(input.draft(), "abcé");
        input.backspace();
        assert_eq!(input.draft(), "abc");
        input.clear();
        input.backspace();
        assert_eq!(input.draft(), "");
    }
}
