//! Security limits and configuration

/// Limits applied while encoding and decoding.
///
/// Decode cost is linear in the buffer size and recursion depth equals the
/// nesting depth of the input, so both are capped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum container nesting depth (default: 128)
    pub max_depth: usize,
    /// Maximum encoded buffer accepted by the decoder (default: 256 MiB)
    pub max_input_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_input_len: 256 * 1024 * 1024,
        }
    }
}

impl Limits {
    /// Limits with a custom depth and the default input cap.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Check an input length against `max_input_len`.
    pub fn check_input_len(&self, len: usize) -> Result<(), crate::error::KspackError> {
        if len > self.max_input_len {
            return Err(crate::error::KspackError::LimitExceeded(format!(
                "Input length {} exceeds limit {}",
                len, self.max_input_len
            )));
        }
        Ok(())
    }

    /// Check a nesting depth against `max_depth`.
    pub fn check_depth(&self, depth: usize) -> Result<(), crate::error::KspackError> {
        if depth > self.max_depth {
            return Err(crate::error::KspackError::DepthLimitExceeded(self.max_depth));
        }
        Ok(())
    }
}
