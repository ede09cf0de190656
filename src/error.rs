use std::{error, fmt, result};

/// Short form to compose Error values.
///
/// Here are few possible ways:
///
/// ```ignore
/// use crate::Error;
/// err_at!(DecodeFail, msg: "dangling node {}", id);
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(FailJson, serde_json::to_string(&graph));
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(FailJson, serde_json::from_str(text), "node-graph");
/// ```
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err($crate::Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err($crate::Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err($crate::Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

/// Error enumerates over all possible errors that this package
/// shall return.
///
/// Each variant carry a pair of strings, first one is the `file:line`
/// prefix where the error was raised and the second one is the message.
/// Missing keys are not errors, they are reported as `None` or `false`
/// by the index API.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Fatal case, tree breaks one of its invariants. Returned by
    /// validate(), should never happen with a correct implementation.
    Fatal(String, String),
    /// Snapshot is malformed, dangling reference, missing root, or
    /// counts that do not add up.
    DecodeFail(String, String),
    /// Error from cbordata, while encoding or decoding binary image.
    FailCbor(String, String),
    /// Error from serde_json, while encoding or decoding node-graph.
    FailJson(String, String),
    /// Configuration could not be parsed or carry invalid values.
    InvalidConfig(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, msg) => write!(f, "{} Fatal: {}", p, msg),
            DecodeFail(p, msg) => write!(f, "{} DecodeFail: {}", p, msg),
            FailCbor(p, msg) => write!(f, "{} FailCbor: {}", p, msg),
            FailJson(p, msg) => write!(f, "{} FailJson: {}", p, msg),
            InvalidConfig(p, msg) => write!(f, "{} InvalidConfig: {}", p, msg),
        }
    }
}

impl error::Error for Error {}

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;
