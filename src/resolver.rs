//! First-hit-wins orchestration of preprocessing and decoding
//!
//! The resolver walks a declarative list of strategies, each naming a
//! preprocessing stage, the symbologies worth trying on it and the decode
//! effort to spend. The first strategy that yields anything ends the search.

use tracing::{debug, trace};

use crate::config::ScanConfig;
use crate::decoder::{BuiltinDecoder, DecodeOptions, SymbologyDecoder};
use crate::models::{DecodeHit, Frame, Stage, SymbologySet};
use crate::preprocess::Preprocessor;

/// One (transform, symbologies, effort) step of the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    /// Candidate the strategy decodes
    pub stage: Stage,
    /// Intersected with the symbologies requested at resolve time
    pub symbologies: SymbologySet,
    /// Effort spent on the candidate
    pub options: DecodeOptions,
}

impl Strategy {
    /// Strategy over every symbology
    pub fn new(stage: Stage, options: DecodeOptions) -> Self {
        Self {
            stage,
            symbologies: SymbologySet::ALL,
            options,
        }
    }
}

/// Quick passes on the untouched stages, `later` effort on the rest
pub fn default_strategies(later: DecodeOptions) -> Vec<Strategy> {
    Stage::ALL
        .into_iter()
        .map(|stage| match stage {
            Stage::Original | Stage::Grayscale => Strategy::new(stage, DecodeOptions::QUICK),
            _ => Strategy::new(stage, later),
        })
        .collect()
}

/// The accepted hit and the stage that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Bounding box already mapped back to source-frame pixels
    pub hit: DecodeHit,
    /// Stage whose candidate produced the hit
    pub stage: Stage,
}

/// Runs strategies in order and keeps the first hit
pub struct MultiStrategyResolver<D = BuiltinDecoder> {
    decoder: D,
    preprocessor: Preprocessor,
    strategies: Vec<Strategy>,
}

impl MultiStrategyResolver<BuiltinDecoder> {
    /// Builtin decoders, configured from `config`
    pub fn builtin(config: &ScanConfig) -> Self {
        Self::from_config(BuiltinDecoder, config)
    }
}

impl<D: SymbologyDecoder> MultiStrategyResolver<D> {
    /// Default strategies with thorough later stages
    pub fn new(decoder: D, preprocessor: Preprocessor) -> Self {
        Self {
            decoder,
            preprocessor,
            strategies: default_strategies(DecodeOptions::THOROUGH),
        }
    }

    /// Default strategies with the effort and upscale settings of `config`
    pub fn from_config(decoder: D, config: &ScanConfig) -> Self {
        let later = DecodeOptions {
            try_harder: config.try_harder,
            try_rotate: config.try_rotate,
        };
        Self {
            decoder,
            preprocessor: Preprocessor::from_config(config),
            strategies: default_strategies(later),
        }
    }

    /// Replace the strategy list
    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Strategies in the order they are tried
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// The wrapped decoder
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// First hit of the first strategy that finds anything
    ///
    /// Candidates are built only when their strategy comes up, so a frame
    /// that reads on the original stage never gets thresholded.
    pub fn resolve(&self, frame: &Frame, symbologies: SymbologySet) -> Option<Resolution> {
        let mut candidates = self.preprocessor.candidates(frame);

        for strategy in &self.strategies {
            let wanted = symbologies.intersection(strategy.symbologies);
            if wanted.is_empty() {
                continue;
            }
            let Some(candidate) = candidates.stage(strategy.stage) else {
                continue;
            };

            let hit = self
                .decoder
                .decode(&candidate, wanted, strategy.options)
                .into_iter()
                .find(|hit| wanted.contains(hit.symbology));
            let Some(mut hit) = hit else {
                trace!(stage = %strategy.stage, "no hits");
                continue;
            };

            hit.bounding_box = hit.bounding_box.map(|b| b.unscale(candidate.scale));
            debug!(
                stage = %strategy.stage,
                symbology = %hit.symbology,
                bytes = hit.payload.len(),
                "resolved"
            );
            return Some(Resolution {
                hit,
                stage: strategy.stage,
            });
        }
        None
    }
}
