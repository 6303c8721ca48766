//! # Object Tokens

use core::fmt;

/// Opaque handle minted once per object accepted by the repository.
///
/// Tokens are a secondary key on top of [`ObjectId`](crate::ObjectId): many
/// objects share an identifier, but each has its own token. [`Token::NULL`] is
/// never handed out and stands for "no token".
#[repr(transparent)]
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

impl Token {
    /// The sentinel "no token" value.
    pub const NULL: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `None` for [`Token::NULL`], `Some(self)` otherwise.
    #[inline]
    #[must_use]
    pub const fn non_null(self) -> Option<Self> {
        if self.is_null() { None } else { Some(self) }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(0x{:X})", self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl From<u64> for Token {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Monotonic token source.
///
/// The counter is owned by whoever issues tokens (the repository), not a
/// process-wide global. The first token is `1`; every call returns a value
/// distinct from all earlier ones.
#[derive(Debug, Default)]
pub struct TokenGenerator {
    last: u64,
}

impl TokenGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Mint the next token.
    pub const fn generate(&mut self) -> Token {
        // A 64-bit counter does not wrap within one boot.
        self.last += 1;
        Token(self.last)
    }
}
