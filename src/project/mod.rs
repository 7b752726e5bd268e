//! Host-side glue for pulling source files off disk.

pub mod package_loader;

pub use package_loader::PackageLoader;
