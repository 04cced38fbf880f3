extern crate clap;
extern crate flexi_logger;
extern crate nbackup_lib;

pub mod app;
pub mod logging;
