//! Cross-module tests for the QALY-loss model
//!
//! Tests are organized by topic:
//! - `tree_engine` - Expected-value evaluation and graph integrity
//! - `life_table` - Survival, background utility and long-term loss integration
//! - `recurrence` - Declining recurrence sequences and recurrent-period losses
//! - `correlation` - Rank-correlation induction on ordered utilities
//! - `builders` - HSV-1, HSV-2 and neonatal tree assembly
//! - `psa` - Seeded PSA runs and their summaries

mod builders;
mod life_table;
mod tree_engine;
