//! Execution context tags
//!
//! A context is handed to each unit of work by whoever dispatches it, so
//! code can report where it runs without asking the runtime about the
//! current thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Concurrency primitive backing a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// One OS thread per unit
    Heavyweight,
    /// Cooperatively scheduled tasks multiplexed on a small OS thread pool
    Lightweight,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heavyweight => "heavyweight",
            Self::Lightweight => "lightweight",
        }
    }
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised for strategy selectors that name no known primitive
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown execution strategy '{0}', expected 'platform' or 'virtual'")]
pub struct UnknownStrategy(pub String);

impl FromStr for ExecutionStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "platform" | "heavyweight" | "os" | "thread" => Ok(Self::Heavyweight),
            "virtual" | "lightweight" | "task" => Ok(Self::Lightweight),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// Tag describing the context a piece of work was dispatched into
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionContext {
    strategy: ExecutionStrategy,
    label: String,
    ordinal: Option<usize>,
}

impl ExecutionContext {
    pub fn new(strategy: ExecutionStrategy, label: impl Into<String>) -> Self {
        Self {
            strategy,
            label: label.into(),
            ordinal: None,
        }
    }

    pub fn lightweight(label: impl Into<String>) -> Self {
        Self::new(ExecutionStrategy::Lightweight, label)
    }

    pub fn heavyweight(label: impl Into<String>) -> Self {
        Self::new(ExecutionStrategy::Heavyweight, label)
    }

    /// Context for the `ordinal`-th child dispatched from this one
    pub fn child(&self, label: impl Into<String>, ordinal: usize) -> Self {
        Self {
            strategy: self.strategy,
            label: format!("{}/{}", self.label, label.into()),
            ordinal: Some(ordinal),
        }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn ordinal(&self) -> Option<usize> {
        self.ordinal
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ordinal {
            Some(n) => write!(f, "{} {}#{}", self.strategy, self.label, n),
            None => write!(f, "{} {}", self.strategy, self.label),
        }
    }
}
