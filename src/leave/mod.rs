pub mod accrual;
pub mod locks;
pub mod policy;
pub mod snapshot;
pub mod sync;
