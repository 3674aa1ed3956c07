//! Ordered, named, first-success strategy chains.
//!
//! Region location, record enumeration and field extraction all reduce to
//! "try these in priority order, stop at the first one that produces an
//! accepted value". [`Chain::run`] does exactly that and reports every
//! attempt as a [`TrailEntry`].

use std::borrow::Cow;

use certscrape_shared::{Outcome, Stage, TrailEntry};
use tracing::debug;

/// Result of a single strategy probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// Produced an accepted value.
    Hit(T),
    /// Nothing matched.
    Miss,
    /// Something matched but was refused; carries the refused text.
    Rejected(String),
}

impl<T> Attempt<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attempt<U> {
        match self {
            Self::Hit(value) => Attempt::Hit(f(value)),
            Self::Miss => Attempt::Miss,
            Self::Rejected(value) => Attempt::Rejected(value),
        }
    }
}

type Probe<'s, I, T> = Box<dyn Fn(I) -> Attempt<T> + Send + Sync + 's>;

/// A named probe. Inputs are cheap `Copy` handles (tree references, strings).
pub struct Strategy<'s, I, T> {
    name: Cow<'static, str>,
    probe: Probe<'s, I, T>,
}

impl<'s, I, T> Strategy<'s, I, T> {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        probe: impl Fn(I) -> Attempt<T> + Send + Sync + 's,
    ) -> Self {
        Self {
            name: name.into(),
            probe: Box::new(probe),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn probe(&self, input: I) -> Attempt<T> {
        (self.probe)(input)
    }
}

impl<I, T> std::fmt::Debug for Strategy<'_, I, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// The winning strategy and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit<T> {
    pub strategy: String,
    pub value: T,
}

/// Outcome of running a whole chain.
#[derive(Debug, Clone)]
pub struct ChainRun<T> {
    pub hit: Option<Hit<T>>,
    /// One entry per strategy actually tried, in order.
    pub attempts: Vec<TrailEntry>,
}

impl<T> ChainRun<T> {
    pub fn strategy(&self) -> Option<&str> {
        self.hit.as_ref().map(|h| h.strategy.as_str())
    }

    pub fn into_value(self) -> Option<T> {
        self.hit.map(|h| h.value)
    }
}

/// An ordered list of strategies for one stage.
pub struct Chain<'s, I, T> {
    stage: Stage,
    strategies: Vec<Strategy<'s, I, T>>,
}

impl<'s, I: Copy, T> Chain<'s, I, T> {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy at the lowest priority so far.
    pub fn then(
        mut self,
        name: impl Into<Cow<'static, str>>,
        probe: impl Fn(I) -> Attempt<T> + Send + Sync + 's,
    ) -> Self {
        self.strategies.push(Strategy::new(name, probe));
        self
    }

    /// Try every strategy in order and stop at the first hit.
    pub fn run(&self, input: I) -> ChainRun<T> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let attempt = strategy.probe(input);
            let outcome = match &attempt {
                Attempt::Hit(_) => Outcome::Hit,
                Attempt::Miss => Outcome::Miss,
                Attempt::Rejected(value) => Outcome::Rejected {
                    value: value.clone(),
                },
            };
            debug!(stage = %self.stage, strategy = strategy.name(), %outcome, "strategy attempt");
            attempts.push(TrailEntry {
                stage: self.stage,
                strategy: strategy.name().to_string(),
                outcome,
            });

            if let Attempt::Hit(value) = attempt {
                return ChainRun {
                    hit: Some(Hit {
                        strategy: strategy.name().to_string(),
                        value,
                    }),
                    attempts,
                };
            }
        }

        ChainRun {
            hit: None,
            attempts,
        }
    }
}

/// Fold "matched but refused" into an attempt: the first accepted candidate
/// wins, otherwise the first refused one is reported.
pub fn first_accepted<T>(
    candidates: impl IntoIterator<Item = T>,
    accept: impl Fn(&T) -> Result<(), String>,
) -> Attempt<T> {
    let mut refused = None;
    for candidate in candidates {
        match accept(&candidate) {
            Ok(()) => return Attempt::Hit(candidate),
            Err(value) => {
                refused.get_or_insert(value);
            }
        }
    }
    match refused {
        Some(value) => Attempt::Rejected(value),
        None => Attempt::Miss,
    }
}
