use thiserror::Error;

/// Construction-time misconfiguration.
///
/// These are programmer errors and are rejected before anything enters the
/// render plane; render-plane calls never return errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter range whose lower and upper bounds coincide cannot map
    /// control values to anything meaningful.
    #[error("parameter range [{min}, {max}) has zero length")]
    ZeroLengthRange { min: f32, max: f32 },

    /// Composite oscillators need at least one source to delegate to.
    #[error("{kind} requires at least one source oscillator")]
    NoSources { kind: &'static str },

    /// A mixer must have exactly one weight per source.
    #[error("mixer has {sources} sources but {weights} weights")]
    WeightCountMismatch { sources: usize, weights: usize },

    /// An enumerated parameter with no variants cannot select anything.
    #[error("enumerated parameter `{id}` has zero variants")]
    EmptyEnumeration { id: String },

    /// A voice pool must own at least one voice.
    #[error("voice pool requires at least one voice")]
    EmptyVoicePool,

    /// A wavetable must hold at least two entries to interpolate between.
    #[error("wavetable size {size} is too small to interpolate")]
    TableTooSmall { size: usize },
}
