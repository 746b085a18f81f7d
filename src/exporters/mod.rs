pub mod remote;

pub use remote::{RemoteEmitter, RemotePayload};
