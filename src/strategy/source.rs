use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The choice budget of one example ran out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overrun;

/// The choice sequence behind one generated example.
///
/// Every random decision a strategy makes is a bounded integer drawn from
/// here. Choices come from a fixed prefix first, then from the random
/// generator (random mode) or as zeros (replay mode). The record of what
/// was drawn is what the shrinker works on: a smaller record means a
/// simpler example.
pub struct DataSource {
    prefix: Vec<u64>,
    rng: Option<StdRng>,
    record: Vec<u64>,
    max_draws: usize,
}

impl DataSource {
    pub const DEFAULT_MAX_DRAWS: usize = 8 * 1024;

    /// Fresh random choices.
    pub fn random(seed: u64) -> Self {
        Self {
            prefix: Vec::new(),
            rng: Some(StdRng::seed_from_u64(seed)),
            record: Vec::new(),
            max_draws: Self::DEFAULT_MAX_DRAWS,
        }
    }

    /// Replay `choices` exactly, then draw zeros.
    pub fn replay(choices: &[u64]) -> Self {
        Self {
            prefix: choices.to_vec(),
            rng: None,
            record: Vec::new(),
            max_draws: Self::DEFAULT_MAX_DRAWS.max(choices.len()),
        }
    }

    /// Draw an integer in `0..=max`. Zero is always the simplest choice.
    pub fn draw(&mut self, max: u64) -> Result<u64, Overrun> {
        let i = self.record.len();
        if i >= self.max_draws {
            return Err(Overrun);
        }
        let raw = match (self.prefix.get(i), self.rng.as_mut()) {
            (Some(&forced), _) => forced,
            (None, Some(rng)) => rng.gen_range(0..=max),
            (None, None) => 0,
        };
        let choice = raw.min(max);
        self.record.push(choice);
        Ok(choice)
    }

    /// Choices drawn so far.
    pub fn choices(&self) -> &[u64] {
        &self.record
    }

    pub fn into_choices(self) -> Vec<u64> {
        self.record
    }
}
