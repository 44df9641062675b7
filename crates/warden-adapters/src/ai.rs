//! AI provider adapter implementations
//!
//! Contains the Gemini API adapter implementing the AIProviderPort trait.

mod gemini;

pub use gemini::{GeminiAdapter, DEFAULT_GEMINI_MODEL, GEMINI_API_BASE};

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ports::ai::AIProviderPort;

    #[test]
    fn test_gemini_adapter_implements_trait() {
        fn _assert_trait<T: AIProviderPort>() {}
        _assert_trait::<GeminiAdapter>();
    }
}
