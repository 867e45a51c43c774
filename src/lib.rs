//! Real-time sign language → text.
//!
//! ```text
//! LandmarkFrame ─▶ landmarks::Normalizer ─▶ classifier::ClassifierAdapter
//!               ─▶ stabilizer::TemporalStabilizer ─▶ commit::CommitMachine ─▶ text
//! ```
//!
//! [`session::SessionManager`] owns the camera/detector lifecycle and the
//! auto-commit ticker; [`replay`] provides a file-backed camera and detector.

pub mod classifier;
pub mod commit;
pub mod config;
pub mod landmarks;
pub mod replay;
pub mod session;
pub mod stabilizer;
