//! Model-agnostic single-turn prompt templates.

/// Wrap raw user input in a model's chat markup.
pub trait PromptStrategy: Send + Sync {
    fn format(&self, user_input: &str) -> String;
}

/// Phi-3 style: `<|user|>…<|end|><|assistant|>`.
#[derive(Debug, Clone, Default)]
pub struct Phi3Format {
    system: Option<String>,
}

impl Phi3Format {
    pub fn new(system: Option<String>) -> Self {
        Self { system }
    }
}

impl PromptStrategy for Phi3Format {
    fn format(&self, user_input: &str) -> String {
        let mut out = String::with_capacity(user_input.len() + 48);
        if let Some(sys) = self.system.as_deref() {
            out.push_str("<|system|>");
            out.push_str(sys);
            out.push_str("<|end|>");
        }
        out.push_str("<|user|>");
        out.push_str(user_input);
        out.push_str("<|end|><|assistant|>");
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatMlFormat {
    system: Option<String>,
}

impl ChatMlFormat {
    pub fn new(system: Option<String>) -> Self {
        Self { system }
    }
}

impl PromptStrategy for ChatMlFormat {
    fn format(&self, user_input: &str) -> String {
        let mut out = String::with_capacity(user_input.len() + 96);
        if let Some(sys) = self.system.as_deref() {
            out.push_str("<|im_start|>system\n");
            out.push_str(sys);
            out.push_str("<|im_end|>\n");
        }
        out.push_str("<|im_start|>user\n");
        out.push_str(user_input);
        out.push_str("<|im_end|>\n<|im_start|>assistant\n");
        out
    }
}

/// No markup at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormat;

impl PromptStrategy for PlainFormat {
    fn format(&self, user_input: &str) -> String {
        user_input.to_string()
    }
}
