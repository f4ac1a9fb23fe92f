//! Everything that talks to the X-Server

pub(crate) mod event;
pub(crate) mod grab;
pub(crate) mod input;
#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod property;
pub(crate) mod xconnection;

pub(crate) use event::{EventFilter, XEvent};
pub(crate) use xconnection::{XConn, XConnection};
