pub mod error;
pub mod seq;

pub use error::{GenerateError, Result};
pub use seq::SeqGenerator;

use stubby_core::ShortToken;
use stubby_snowflake::{Clock, Snowflake};

/// Trait for generating short tokens.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness of the produced tokens is the generator's responsibility.
pub trait Generator: Send + Sync + 'static {
    /// Generates a globally unique short token.
    fn generate(&self) -> Result<ShortToken>;
}

impl<C: Clock + 'static> Generator for Snowflake<C> {
    fn generate(&self) -> Result<ShortToken> {
        let id = self.allocate()?;
        Ok(ShortToken::from_id(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::Generator;
    use std::collections::HashSet;
    use stubby_snowflake::{Snowflake, SnowflakeSettings};

    #[test]
    fn snowflake_implements_generator_trait() {
        let settings = SnowflakeSettings::builder().node_id(0).build();
        let snowflake = Snowflake::new(settings).unwrap();

        let first = snowflake.generate().unwrap();
        let second = snowflake.generate().unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn snowflake_tokens_are_unique() {
        let settings = SnowflakeSettings::builder().node_id(12).build();
        let snowflake = Snowflake::new(settings).unwrap();

        let tokens: HashSet<_> = (0..10_000)
            .map(|_| snowflake.generate().unwrap())
            .collect();

        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn snowflake_token_encodes_allocated_id() {
        let epoch = jiff::Timestamp::now() - jiff::SignedDuration::from_hours(1);
        let settings = SnowflakeSettings::builder().node_id(5).epoch(epoch).build();
        let snowflake = Snowflake::new(settings).unwrap();

        let token = snowflake.generate().unwrap();

        // an hour of milliseconds shifted past 22 bits needs 7 or 8 digits
        assert!((7..=8).contains(&token.len()), "unexpected token {token}");
    }

    #[test]
    fn generator_is_object_safe() {
        let settings = SnowflakeSettings::builder().node_id(0).build();
        let generator: Box<dyn Generator> = Box::new(Snowflake::new(settings).unwrap());
        assert!(generator.generate().is_ok());
    }
}
