use ggez::input::keyboard::KeyCode;

/// What the typed text will be used for
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PromptKind {
    ProfileName,
    PhotoPath,
}

impl PromptKind {
    pub fn label(self) -> &'static str {
        match self {
            PromptKind::ProfileName => "Welcome, warrior! What's your name?",
            PromptKind::PhotoPath => "Path to a photo proving you're up:",
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum PromptEvent {
    Submitted(PromptKind, String),
    Cancelled(PromptKind),
}

/// A single line of text input
#[derive(Clone, Debug)]
pub struct Prompt {
    kind: PromptKind,
    input: String,
}

impl Prompt {
    const MAX_LEN: usize = 256;

    pub fn new(kind: PromptKind) -> Self {
        Self { kind, input: String::new() }
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn type_char(&mut self, c: char) {
        if !c.is_control() && self.input.chars().count() < Self::MAX_LEN {
            self.input.push(c);
        }
    }

    pub fn key(&mut self, keycode: KeyCode) -> Option<PromptEvent> {
        match keycode {
            KeyCode::Back => {
                self.input.pop();
                None
            }
            KeyCode::Return | KeyCode::NumpadEnter => {
                let text = self.input.trim();
                if text.is_empty() {
                    None
                } else {
                    Some(PromptEvent::Submitted(self.kind, text.to_string()))
                }
            }
            KeyCode::Escape => Some(PromptEvent::Cancelled(self.kind)),
            _ => None,
        }
    }
}

#[test]
fn test_prompt_editing() {
    let mut prompt = Prompt::new(PromptKind::ProfileName);
    for c in " Al\tix\u{8}".chars() {
        prompt.type_char(c);
    }
    assert_eq!(prompt.input(), " Alix");
    assert_eq!(prompt.key(KeyCode::Back), None);
    prompt.type_char('c');
    prompt.type_char('e');
    assert_eq!(prompt.key(KeyCode::Left), None);
    assert_eq!(
        prompt.key(KeyCode::Return),
        Some(PromptEvent::Submitted(PromptKind::ProfileName, "Alice".to_string()))
    );
}

#[test]
fn test_empty_prompt_is_not_submitted() {
    let mut prompt = Prompt::new(PromptKind::PhotoPath);
    prompt.type_char(' ');
    assert_eq!(prompt.key(KeyCode::Return), None);
    assert_eq!(prompt.key(KeyCode::Escape), Some(PromptEvent::Cancelled(PromptKind::PhotoPath)));
}
