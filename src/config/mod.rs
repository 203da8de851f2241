//! Declarative YAML configuration
//!
//! Describes a pattern's networks, objectives and loss weights.
//!
//! # Example
//!
//! ```yaml
//! name: rotations
//! pattern: pairwise_predict_transformation
//! input_dim: 16
//!
//! phi:
//!   layers:
//!     - units: 32
//!       activation: relu
//!     - units: 4
//!
//! psi:
//!   layers:
//!     - units: 10
//!       activation: softmax
//!
//! beta:
//!   layers:
//!     - units: 1
//!
//! training:
//!   target_weight: 0.7
//!   context_weight: 0.3
//! ```

mod builder;
mod cli;
mod load;
mod schema;
mod validate;


pub use builder::{build_network, build_pattern, BuiltPattern};
pub use cli::{parse_args, Cli, Command, ConfigArgs};
pub use load::{load_config, parse_config};
pub use schema::{LayerSpec, NetworkSpec, PatternSpec, PatternType, TrainingWeights};
pub use validate::{validate_config, ValidationError};
