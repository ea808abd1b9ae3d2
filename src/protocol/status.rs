//! CLI response status codes.

use std::fmt;

/// Status code carried in the first field of every response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    /// Syntax error in the request.
    Syntax,
    /// Command name not known (or not lower-case).
    Unknown,
    /// Command recognised but not implemented by the bridge.
    Unimplemented,
    /// Too few arguments.
    TooFew,
    /// Too many arguments.
    TooMany,
    /// Bad parameter value.
    Param,
    /// Authentication challenge / authentication required.
    Auth,
    /// Success.
    Ok,
    /// Success, body truncated.
    Truncated,
    /// Local failure ("can't").
    Cant,
    /// Communication error.
    Comms,
    /// Connection is closing.
    Close,
}

impl ResponseStatus {
    /// Numeric wire code.
    pub fn code(self) -> u16 {
        match self {
            ResponseStatus::Syntax => 100,
            ResponseStatus::Unknown => 101,
            ResponseStatus::Unimplemented => 102,
            ResponseStatus::TooFew => 104,
            ResponseStatus::TooMany => 105,
            ResponseStatus::Param => 106,
            ResponseStatus::Auth => 107,
            ResponseStatus::Ok => 200,
            ResponseStatus::Truncated => 201,
            ResponseStatus::Cant => 300,
            ResponseStatus::Comms => 400,
            ResponseStatus::Close => 500,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseStatus::Syntax => "syntax",
            ResponseStatus::Unknown => "unknown",
            ResponseStatus::Unimplemented => "unimpl",
            ResponseStatus::TooFew => "toofew",
            ResponseStatus::TooMany => "toomany",
            ResponseStatus::Param => "param",
            ResponseStatus::Auth => "auth",
            ResponseStatus::Ok => "ok",
            ResponseStatus::Truncated => "truncated",
            ResponseStatus::Cant => "cant",
            ResponseStatus::Comms => "comms",
            ResponseStatus::Close => "close",
        }
    }
}

impl From<ResponseStatus> for u16 {
    fn from(status: ResponseStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
