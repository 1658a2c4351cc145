pub mod attributor;
pub mod references;
