use crate::error::{AppError, Result};
use log;
use once_cell::sync::Lazy;
use tiktoken_rs::CoreBPE;

pub trait TokenCounter {
    fn count(&self, text: &str) -> usize;

    fn name(&self) -> &'static str;
}

static CL100K: Lazy<Option<CoreBPE>> = Lazy::new(|| match tiktoken_rs::cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        log::warn!("cl100k_base unavailable, estimating tokens from length: {}", e);
        None
    }
});

// Roughly four characters per token when no BPE is loaded.
fn fallback_count(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TiktokenCounter;

impl TiktokenCounter {
    pub fn new() -> Self {
        TiktokenCounter
    }

    // Fails instead of degrading to the length estimate.
    pub fn try_new() -> Result<Self> {
        match CL100K.as_ref() {
            Some(_) => Ok(TiktokenCounter),
            None => Err(AppError::TikToken(
                "failed to load cl100k_base encoding".to_string(),
            )),
        }
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        match CL100K.as_ref() {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => fallback_count(text),
        }
    }

    fn name(&self) -> &'static str {
        "cl100k_base"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn name(&self) -> &'static str {
        "words"
    }
}
