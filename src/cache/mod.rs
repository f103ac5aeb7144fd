//! Build artifact cache
//!
//! Artifacts are keyed by commit identity, not content: an artifact built at
//! commit C for a given platform and profile is reusable by any checkout
//! whose lineage reaches C.
//!
//! | Piece | Role |
//! |-------|------|
//! | `key` | Descriptor type and the on-the-wire artifact name |
//! | `backend` | Store contract (setup, upload, download, lookup, list) |
//! | `local` | Directory-tree store |
//! | `memory` | In-memory store for tests and dry runs |

pub mod backend;
pub mod key;
pub mod local;
pub mod memory;

pub use backend::{CacheBackend, UploadMetadata};
pub use key::{Architecture, BuildProfile, CacheDescriptor, OperatingSystem, Platform};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
