use serde::{Deserialize, Serialize};

/// Source of fresh node ids for the factories in [`super::generator`].
pub trait IdGenerator {
    /// Return an id that has not been handed out before
    fn next_id(&mut self, prefix: &str) -> String;
}

/// Deterministic ids (`scope-1`, `repeater-2`, ...)
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    counter: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue numbering after ids already present in a loaded workflow
    pub fn starting_after(counter: u64) -> Self {
        Self { counter }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}-{}", prefix, self.counter)
    }
}

/// UUID v4 ids for long-lived editing sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self, prefix: &str) -> String {
        format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
    }
}

/// Configurable choice of id generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    Sequential,
    #[default]
    Random,
}

impl IdStrategy {
    pub fn generator(&self) -> Box<dyn IdGenerator> {
        match self {
            IdStrategy::Sequential => Box::new(SequentialIds::new()),
            IdStrategy::Random => Box::new(RandomIds),
        }
    }
}

impl std::str::FromStr for IdStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(IdStrategy::Sequential),
            "random" | "uuid" => Ok(IdStrategy::Random),
            _ => Err(anyhow::anyhow!("Invalid id strategy: {}", s)),
        }
    }
}
