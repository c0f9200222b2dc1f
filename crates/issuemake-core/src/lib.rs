//! Core domain types for issuemake: the issue file-state machine, filename
//! codec, id allocation, frontmatter codec, and the collaborator brief
//! reconciler.

pub mod brief;
pub mod config;
pub mod frontmatter;
pub mod ids;
pub mod issue;
pub mod slug;
pub mod store;
pub mod titlegen;

#[cfg(test)]
mod test_env;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
