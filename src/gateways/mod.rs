//! Outbound HTTP collaborators: the transactional email provider and the
//! object store for event images.

pub mod email;
pub mod storage;
