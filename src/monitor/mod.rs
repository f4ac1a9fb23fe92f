//! Screens of the display and the clients managed on them

pub(crate) mod client;
pub(crate) mod screen;

pub(crate) use client::{Client, ClientList};
pub(crate) use screen::ScreenInfo;
