//! Utility macros shared by the codec, WebSocket and handshake code.

/// Returns early with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking.
///
/// # Arguments
///
/// * `$predicate` - A boolean expression that should evaluate to true
/// * `$error` - The error value to return if the predicate is false; only evaluated on failure
///
/// # Example
///
/// ```text
/// ensure!(header_count <= MAX_HEADER_NUM, ParseError::too_many_headers(header_count));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
