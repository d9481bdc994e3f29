use lazy_static::lazy_static;

/// Time-related utilities.
pub mod time;

lazy_static! {
    /// The version of the custody binary.
    pub static ref CUSTODY_VERSION: String =
        format!("v{}-{}", env!("CARGO_PKG_VERSION"), crate::built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown"));
}
