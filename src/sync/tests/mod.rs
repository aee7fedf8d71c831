//! Tests for the synchronization engine's submodules.

mod indexer;
