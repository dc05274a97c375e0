//! Error types shared by the codec and the typed option accessors.

/// The error type returned by `Packet::from_bytes`.
#[derive(Fail, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer is shorter than the fixed header plus the magic cookie.
    #[fail(display = "packet is truncated at {} bytes", _0)]
    Truncated(usize),
    /// The four octets before the options area are not `63 82 53 63`.
    #[fail(display = "magic cookie mismatch")]
    BadMagic,
    /// An option's length octet points past the end of the buffer.
    #[fail(display = "option {} overruns the buffer", _0)]
    BadOptionLength(u8),
    /// An option appeared more than once. The decoder tolerates this by
    /// keeping the first occurrence; the variant exists for strict callers.
    #[fail(display = "option {} appears more than once", _0)]
    DuplicateOption(u8),
}

/// The error type returned by the typed option getters.
#[derive(Fail, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionError {
    #[fail(display = "option {} is not present", _0)]
    NoSuchOption(u8),
    /// The stored bytes do not match the registry's payload type.
    #[fail(display = "option {} does not match its registered type", _0)]
    WrongType(u8),
}

/// The error type returned by `Packet::validate`.
#[derive(Fail, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[fail(display = "validation error: {}", _0)]
    Validation(&'static str),
}
