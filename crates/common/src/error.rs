/// Fallback text when a failure carries no message of its own.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Render any failure as a human-readable line for display.
///
/// Uses the failure's own message; blank messages become [`UNKNOWN_ERROR`].
pub fn describe_error(error: &dyn std::fmt::Display) -> String {
    let text = error.to_string();
    if text.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        text
    }
}

// ── Shared context trait ────────────────────────────────────────────────────

/// Trait for error types that can be constructed from a plain message string.
///
/// Implement this for your crate's error type, then invoke [`impl_context!`]
/// in your error module to get `.context()` and `.with_context()` on `Result`
/// and `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait with `.context()` and `.with_context()`
/// methods on `Result` and `Option`.
///
/// Invoke inside a module that defines `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// wizard_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx = context.into();
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let ctx = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Error {
        Message(String),
    }

    impl std::fmt::Display for Error {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Message(message) => f.write_str(message),
            }
        }
    }

    impl FromMessage for Error {
        fn from_message(message: String) -> Self {
            Self::Message(message)
        }
    }

    type Result<T> = std::result::Result<T, Error>;

    crate::impl_context!();

    #[test]
    fn describe_uses_message() {
        assert_eq!(describe_error(&"boom"), "boom");
    }

    #[test]
    fn describe_blank_falls_back() {
        assert_eq!(describe_error(&"  "), UNKNOWN_ERROR);
        assert_eq!(describe_error(&""), UNKNOWN_ERROR);
    }

    #[test]
    fn io_errors_keep_their_text() {
        let err = std::io::Error::other("disk gone");
        assert_eq!(describe_error(&err), "disk gone");
    }

    #[test]
    fn context_prefixes_the_source() {
        let failed: std::result::Result<(), &str> = Err("refused");
        let Err(Error::Message(message)) = failed.context("connect") else {
            panic!("expected a message error");
        };
        assert_eq!(message, "connect: refused");

        let missing: Option<u8> = None;
        let Err(Error::Message(message)) = missing.with_context(|| "no port") else {
            panic!("expected a message error");
        };
        assert_eq!(message, "no port");
    }
}
