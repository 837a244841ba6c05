//! Word-level Markov chain model.
//!
//! This module provides:
//! - The sliding token window used as lookup key (`Prefix`)
//! - Weighted successor counts (`FrequencyCounter`)
//! - The chain itself and its construction (`Chain`)
//! - Sentence and word generators (`Generate` strategies)
//! - The recursive next-word prediction engine

/// Markov chain: serialized prefix to successor counts.
///
/// Handles token stream ingestion, merging and cached parallel loading
/// from text files.
pub mod chain;

/// Weighted multiset of successor tokens.
///
/// Supports counting, union, ranking and weighted random sampling.
pub mod frequency;

/// Text generation strategies (word count or sentence count).
pub mod generator;

/// Depth and breadth bounded search for likely continuations.
pub mod prediction;

/// Fixed-length token window with sentence-aware shifting and reduction.
pub mod prefix;
