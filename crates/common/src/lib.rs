pub mod cameras;
pub mod features;
pub mod grants;
pub mod ids;
pub mod leases;
pub mod validation;
