pub mod install;
pub mod profile;
pub mod sites;
pub mod uninstall;
pub mod watch;
