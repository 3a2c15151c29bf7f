pub mod open;
pub mod seal;
pub mod unseal_bytes;
pub mod unseal_device;
pub mod version;

pub use open::Open;
pub use seal::Seal;
pub use unseal_bytes::UnsealBytes;
pub use unseal_device::UnsealDevice;
pub use version::Version;
