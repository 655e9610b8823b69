//! Produce freshness analysis
//!
//! Pure building blocks of the analysis pipeline: image decoding, the local
//! heuristic estimator, normalization of untrusted model output, batch
//! assembly and the glossary translator. Nothing in this crate performs I/O.

pub mod types;
pub mod codec;
pub mod heuristic;
pub mod normalize;
pub mod batch;
pub mod translate;

pub use types::*;
pub use codec::{decode_image, to_data_url, CodecError, Pixels, MAX_DIMENSION};
pub use heuristic::{estimate, ColorStats};
pub use normalize::{normalize, NormalizeError};
pub use batch::{assemble, synthesize_position, verify, InvariantError};
pub use translate::{GlossaryTranslator, TranslateError, Translator};
