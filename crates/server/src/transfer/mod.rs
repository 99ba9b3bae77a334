//! The transfer core: ingest and egress pipelines, the progress channel and
//! version reservations. Nothing here knows about HTTP.

pub mod egress;
pub mod error;
pub mod ingest;
pub mod locks;
pub mod progress;

pub use egress::{Download, Egress, ServeResult};
pub use error::{TransferError, TransferResult};
pub use ingest::{ArtifactSource, Ingest, UploadRequest};
pub use locks::{Reservation, VersionLocks};
pub use progress::{ConsumerGone, ProgressReceiver, ProgressSender};
