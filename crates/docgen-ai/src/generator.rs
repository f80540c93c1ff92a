use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{AdapterError, Result};

/// Free-form text generation, the only capability the conversion core uses.
pub trait TextGenerator {
    fn generate_text(&self, prompt: &str, system_prompt: &str, max_tokens: u32) -> Result<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate_text(&self, prompt: &str, system_prompt: &str, max_tokens: u32) -> Result<String> {
        (**self).generate_text(prompt, system_prompt, max_tokens)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn generate_text(&self, prompt: &str, system_prompt: &str, max_tokens: u32) -> Result<String> {
        (**self).generate_text(prompt, system_prompt, max_tokens)
    }
}

/// A recorded call to a [`ScriptedGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub prompt: String,
    pub system_prompt: String,
    pub max_tokens: u32,
}

/// In-memory generator that replays queued responses in order.
///
/// Used for dry runs and tests; an exhausted script answers with a
/// remote-service error.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    pub fn new(responses: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate_text(&self, prompt: &str, system_prompt: &str, max_tokens: u32) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                prompt: prompt.to_string(),
                system_prompt: system_prompt.to_string(),
                max_tokens,
            });
        }
        self.responses
            .lock()
            .map_err(|_| AdapterError::remote("scripted generator lock poisoned"))?
            .pop_front()
            .unwrap_or_else(|| Err(AdapterError::remote("no scripted response left")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_responses_then_fails() {
        let generator = ScriptedGenerator::new([
            Ok("first".to_string()),
            Err(AdapterError::Authentication("denied".to_string())),
        ]);
        let boxed: Box<dyn TextGenerator + '_> = Box::new(&generator);
        assert_eq!(boxed.generate_text("p", "s", 64).expect("first"), "first");
        assert!(boxed.generate_text("p", "s", 64).unwrap_err().is_authentication());
        assert!(matches!(
            generator.generate_text("p", "s", 64),
            Err(AdapterError::RemoteService { .. })
        ));
        let calls = generator.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].max_tokens, 64);
    }
}
