use crate::{Generator, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stubby_core::ShortToken;
use tracing::trace;

/// First value handed out by [`SeqGenerator::new`].
///
/// Starting at one billion keeps early tokens six characters long.
pub const DEFAULT_START: u64 = 1_000_000_000;

/// A single-process token generator backed by an atomic counter.
///
/// Clones share one counter, so tokens stay unique across every handle of a
/// generator. They are not unique across processes; use it for local
/// development or tests where a node-partitioned allocator is not needed.
#[derive(Debug, Clone)]
pub struct SeqGenerator {
    counter: Arc<AtomicU64>,
}

impl Default for SeqGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SeqGenerator {
    pub fn new() -> Self {
        Self::with_offset(DEFAULT_START)
    }

    /// Creates a generator whose first value is `offset`.
    ///
    /// Useful for resuming from a known state or distributing
    /// counter ranges across processes.
    pub fn with_offset(offset: u64) -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(offset)),
        }
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> Result<ShortToken> {
        let number = self.counter.fetch_add(1, Ordering::SeqCst);
        trace!(number, "generated sequential number");
        Ok(ShortToken::from_id(number)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenerateError;
    use stubby_core::CoreError;

    #[test]
    fn seq_generator_produces_sequential_tokens() {
        let generator = SeqGenerator::new();

        let token1 = generator.generate().unwrap();
        let token2 = generator.generate().unwrap();
        let token3 = generator.generate().unwrap();

        assert_eq!(token1.as_str(), "gGTF51");
        assert_eq!(token2.as_str(), "hGTF51");
        assert_eq!(token3.as_str(), "iGTF51");
    }

    #[test]
    fn seq_generator_with_offset() {
        let generator = SeqGenerator::with_offset(61);

        assert_eq!(generator.generate().unwrap().as_str(), "Z");
        assert_eq!(generator.generate().unwrap().as_str(), "01");
    }

    #[test]
    fn zero_offset_fails_first_then_recovers() {
        let generator = SeqGenerator::with_offset(0);

        assert!(matches!(
            generator.generate(),
            Err(GenerateError::Encoding(CoreError::InvalidArgument(_)))
        ));
        assert_eq!(generator.generate().unwrap().as_str(), "1");
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SeqGenerator>();
    }

    #[test]
    fn clones_share_the_counter() {
        let generator = SeqGenerator::with_offset(1);
        generator.generate().unwrap();
        generator.generate().unwrap();

        let cloned = generator.clone();

        assert_eq!(generator.generate().unwrap().as_str(), "3");
        assert_eq!(cloned.generate().unwrap().as_str(), "4");
        assert_eq!(generator.generate().unwrap().as_str(), "5");
    }

    #[test]
    fn clones_never_mint_the_same_token() {
        let generator = SeqGenerator::new();
        let cloned = generator.clone();

        let tokens: std::collections::HashSet<_> = (0..1_000)
            .flat_map(|_| [generator.generate().unwrap(), cloned.generate().unwrap()])
            .collect();

        assert_eq!(tokens.len(), 2_000);
    }
}
