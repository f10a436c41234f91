use crate::format::prompting::{ChatMlFormat, Phi3Format, PlainFormat, PromptStrategy};

/// Generic, model-agnostic prompt kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    Phi3 { system: Option<String> },
    ChatMl { system: Option<String> },
    Plain,
}

/// Factory: select a prompt strategy from a `PromptKind`.
pub fn select_prompt(kind: PromptKind) -> Box<dyn PromptStrategy> {
    match kind {
        PromptKind::Phi3 { system } => Box::new(Phi3Format::new(system)),
        PromptKind::ChatMl { system } => Box::new(ChatMlFormat::new(system)),
        PromptKind::Plain => Box::new(PlainFormat),
    }
}
