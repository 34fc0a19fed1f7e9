//! Local-user authentication (JWT). Issuance of user credentials lives
//! outside this system; only validation of presented tokens is here.

pub mod jwt;
