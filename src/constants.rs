//! Core compile-time constants for voxgate.
//!
//!  * All values are `pub` unless they're strictly an implementation detail
//!    (then they stay `pub(crate)`).
//!  * "Magic numbers" are grouped logically with doc comments.

/* --------------------------------------------------------------------- */
/*  Canonical audio layout                                               */

/// Canonical mono PCM sample-rate (Hz) every clip is resampled to.
pub const CANONICAL_SAMPLE_RATE: u32 = 22_050;

/// Absolute-amplitude gate below which a sample counts as silence.
pub const SILENCE_THRESHOLD: f32 = 0.01;

/* --------------------------------------------------------------------- */
/*  Spectral front-end                                                   */

/// FFT window length (samples) for the short-time analysis.
pub const FEATURE_N_FFT: usize = 2_048;

/// Hop length (samples) between analysis frames.
pub const FEATURE_HOP_LENGTH: usize = 512;

/// Mel bands in the spectrogram feature mode.
pub const MEL_BANDS: usize = 128;

/// Cepstral coefficients in the mfcc feature mode.
pub const CEPSTRAL_COEFFS: usize = 13;

/// Fixed time dimension of every `FeatureEncoding`.
pub const CANONICAL_FRAME_COUNT: usize = 100;

/// Shortest clip (samples, post-normalization) the spectral step accepts.
pub(crate) const MIN_EXTRACT_SAMPLES: usize = FEATURE_N_FFT / 4;

/// Power floor before any log scaling.
pub(crate) const POWER_FLOOR: f32 = 1e-10;

/// Dynamic range (dB) kept below the clip's own peak power.
pub(crate) const DB_TOP: f32 = 80.0;

/* --------------------------------------------------------------------- */
/*  Verification policy defaults                                         */

/// Closed-set accept threshold (claimed identity).
pub const VERIFY_ACCEPT_THRESHOLD: f32 = 0.8;

/// Open-set accept threshold (speaker identification).
pub const IDENTIFY_ACCEPT_THRESHOLD: f32 = 0.75;

/// Open-set lower tier: scores in `[possible, accept)` surface a tentative
/// match without granting access.
pub const IDENTIFY_POSSIBLE_THRESHOLD: f32 = 0.5;

/// Softmax-max gate for a classifier prediction to count as confident.
pub const CLASSIFIER_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Sentinel identity used when an open-set attempt matches nobody.
pub const UNKNOWN_IDENTITY: &str = "unknown";
