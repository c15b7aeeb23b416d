//! # gatesuite-compose
//!
//! Generation engine for the Herald / Warden / Stargate compose files.
//!
//! Handles:
//! - **Document**: Loading a compose file into a loosely typed YAML tree.
//! - **Variables**: Scanning `${NAME:-default}` references into a table.
//! - **Env file**: Synthesizing a grouped, ordered `.env` from that table.
//! - **Topology**: Splitting the canonical file into the full stack and its slices.
//! - **Features / Apply / Volumes**: Applying generation options to a topology.
//! - **Render**: Serializing with headers and inline environment comments.
//! - **Generate**: The end-to-end pipeline tying the passes together.

pub mod addressing;
pub mod apply;
pub mod catalog;
pub mod document;
pub mod env_file;
pub mod features;
pub mod generate;
pub mod options;
pub mod render;
pub mod topology;
pub mod variables;
pub mod volumes;

pub use document::ComposeDocument;
pub use generate::{GeneratedArtifacts, generate, generate_one};
pub use options::{Feature, GenerationOptions, OptionsRequest, RedisStorage};
