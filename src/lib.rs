// Library exports for poetry-monorepo-deps
pub mod classify;
pub mod config;
pub mod dependency;
pub mod file_lock;
pub mod io;
pub mod lockfile;
pub mod plugin;
pub mod project;
pub mod repository;
pub mod rewrite;
pub mod version;
