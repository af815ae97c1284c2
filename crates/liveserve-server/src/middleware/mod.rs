//! Request middleware.

pub(crate) mod access_log;
