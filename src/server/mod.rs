//! Transport glue: accepts TCP sockets and runs one connection task
//! per peer.

pub mod listener;

pub use listener::run;
