//! Ordered fallback across conversion strategies.
//!
//! A routine lists the strategies able to perform it, most preferred first.
//! Each attempt is classified: success ends the chain, an absent engine
//! moves on to the next strategy, and any other failure is final.

use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::info;

use super::error::ConverterError;
use crate::metrics::STRATEGY_FALLBACKS;

/// Outcome of one strategy attempt.
#[derive(Debug)]
pub enum Attempt<T = PathBuf> {
    /// The engine produced its result.
    Succeeded(T),
    /// The engine is not installed or not usable on this host.
    Absent { engine: String, reason: String },
    /// The engine ran and the conversion failed.
    Failed(ConverterError),
}

impl<T> Attempt<T> {
    /// Chains a fallible step onto a success.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, ConverterError>) -> Attempt<U> {
        match self {
            Self::Succeeded(value) => match f(value) {
                Ok(u) => Attempt::Succeeded(u),
                Err(e) => Attempt::Failed(e),
            },
            Self::Absent { engine, reason } => Attempt::Absent { engine, reason },
            Self::Failed(e) => Attempt::Failed(e),
        }
    }
}

impl<T> From<ConverterError> for Attempt<T> {
    fn from(e: ConverterError) -> Self {
        Self::Failed(e)
    }
}

/// Confirms an engine that exited cleanly left a file at `path`.
pub fn expect_output(engine: &str, path: &Path) -> Result<PathBuf, ConverterError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(ConverterError::engine_failed(
            engine,
            "reported success but produced no output",
            None,
        ))
    }
}

/// A strategy that can appear in a fallback chain.
pub trait Strategy {
    /// Human-readable engine name.
    fn engine(&self) -> &'static str;

    /// What to install to make this strategy available.
    fn install_hint(&self) -> &'static str;
}

/// Runs `strategies` in order until one succeeds or fails for real.
///
/// Returns [`ConverterError::EngineNotInstalled`] when every strategy
/// reported its engine absent.
pub async fn run_chain<S, F, Fut>(
    routine: &str,
    strategies: &[S],
    mut attempt: F,
) -> Result<PathBuf, ConverterError>
where
    S: Strategy + Copy,
    F: FnMut(S) -> Fut,
    Fut: Future<Output = Attempt>,
{
    let mut engines = Vec::with_capacity(strategies.len());
    let mut hints: Vec<&str> = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        match attempt(*strategy).await {
            Attempt::Succeeded(path) => {
                if !engines.is_empty() {
                    info!(routine, engine = strategy.engine(), "Converted with fallback engine");
                }
                return Ok(path);
            }
            Attempt::Absent { engine, reason } => {
                info!(routine, engine = %engine, reason = %reason, "Engine unavailable, trying next strategy");
                STRATEGY_FALLBACKS
                    .with_label_values(&[routine, strategy.engine()])
                    .inc();
                engines.push(strategy.engine().to_string());
                if !hints.contains(&strategy.install_hint()) {
                    hints.push(strategy.install_hint());
                }
            }
            Attempt::Failed(e) => return Err(e),
        }
    }

    Err(ConverterError::EngineNotInstalled {
        routine: routine.to_string(),
        engines,
        hint: hints.join(" "),
    })
}
