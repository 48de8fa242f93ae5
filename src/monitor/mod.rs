//! Filesystem monitoring: free-space reading and band classification.

pub mod space;
