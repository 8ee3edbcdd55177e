//! Output generation: rendering digests and handing them to a mail transport.
//!
//! # Submodules
//!
//! - [`digest`]: subject line and HTML body for one recipient
//! - [`mail`]: MIME message building and SMTP / dry-run transports

pub mod digest;
pub mod mail;
