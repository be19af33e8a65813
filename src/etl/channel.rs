//! Channel tags and tagged output rows

use crate::row::Row;
use std::borrow::Cow;
use std::fmt;

/// Named logical wire between two nodes
///
/// Rows that are not explicitly tagged travel on [`Channel::MAIN`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(Cow<'static, str>);

impl Channel {
    pub const MAIN: &'static str = "main";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn main() -> Self {
        Self(Cow::Borrowed(Self::MAIN))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_main(&self) -> bool {
        self.0 == Self::MAIN
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::main()
    }
}

impl From<&'static str> for Channel {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A produced row together with the channel it leaves on
#[derive(Clone, Debug, PartialEq)]
pub struct Emit {
    pub row: Row,
    pub channel: Channel,
}

impl Emit {
    pub fn new(row: Row, channel: impl Into<Channel>) -> Self {
        Self {
            row,
            channel: channel.into(),
        }
    }

    /// Emit on the default channel
    pub fn main(row: Row) -> Self {
        Self {
            row,
            channel: Channel::main(),
        }
    }
}

impl From<Row> for Emit {
    fn from(row: Row) -> Self {
        Self::main(row)
    }
}
