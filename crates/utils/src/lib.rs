#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

pub mod time;

use std::fmt::Display;

use error_stack::{Context, Report, Result, ResultExt};

pub use time::current_unix_time;

pub trait IntoReportFromString {
    type Ok;
    type Err: Display;

    #[track_caller]
    fn into_error_string<C: Context>(self, context: C) -> Result<Self::Ok, C>;
}

impl<Ok, Err: Display> IntoReportFromString for std::result::Result<Ok, Err> {
    type Ok = Ok;
    type Err = Err;

    fn into_error_string<C: Context>(
        self,
        context: C,
    ) -> Result<<Self as IntoReportFromString>::Ok, C> {
        match self {
            Ok(ok) => Ok(ok),
            Err(err) => Err(context.report()).attach_printable(err.to_string()),
        }
    }
}

pub trait ContextExt: Context + Sized {
    #[track_caller]
    fn report(self) -> Report<Self> {
        error_stack::report!(self)
    }
}

impl<E: Context + Sized> ContextExt for E {}

/// Error type which is owned by a single component of the backend.
/// The name is added to error reports crossing component boundaries.
pub trait ComponentError: Context {
    const COMPONENT_NAME: &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestError;

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("test error")
        }
    }

    impl std::error::Error for TestError {}

    #[test]
    fn into_error_string_keeps_message_as_attachment() {
        let result: std::result::Result<(), &str> = Err("value out of range");
        let report = result.into_error_string(TestError).unwrap_err();
        let formatted = format!("{report:?}");
        assert!(formatted.contains("value out of range"));
        assert!(formatted.contains("test error"));
    }

    #[test]
    fn into_error_string_passes_ok_value() {
        let result: std::result::Result<u8, &str> = Ok(3);
        assert_eq!(result.into_error_string(TestError).unwrap(), 3);
    }
}
