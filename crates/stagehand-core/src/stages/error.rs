use thiserror::Error;

use crate::syntax::ParseError;

/// Errors that can occur during stage extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The second argument of a `t.Run` call is neither an identifier naming
    /// a same-package function nor a function literal.
    #[error("could not find test function body from t.Run call")]
    SubTestBodyNotFound,
}
