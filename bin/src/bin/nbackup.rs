extern crate clap;
extern crate nbackup_lib;
#[macro_use]
extern crate log;
extern crate colored;
extern crate nbackup_bin;

use std::path::PathBuf;

use clap::ArgMatches;
use colored::Colorize;
use nbackup_bin::app::{backup_options, gen_app};
use nbackup_bin::logging::init_logging;
use nbackup_lib::converter::EnmlConverter;
use nbackup_lib::error::Result;
use nbackup_lib::profile;
use nbackup_lib::source::HttpNoteSource;
use nbackup_lib::sync::BackupReport;
use nbackup_lib::NoteBackup;

pub fn main() {
    dotenv::dotenv().ok();

    let matches = gen_app().get_matches();

    let log_path = matches.value_of("logpath")
        .map(PathBuf::from)
        .or_else(|| profile::get_log_path().ok());

    let _logger = match init_logging(log_path.as_deref()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Could not set up logging: {}", e);
            None
        }
    };

    match run(&matches) {
        Ok(_) => {}
        Err(e) => {
            error!("Error: {}\n{} - ({})", e.human_readable_error_message(), e.to_string(), e.error_code().to_string());
            std::process::exit(e.error_code());
        }
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let profile = profile::load_profile()?;
    let options = backup_options(matches, profile.max_notes())?;
    let path = PathBuf::from(matches.value_of("path").unwrap_or_default());

    let backup = NoteBackup::new(
        Box::new(HttpNoteSource::new(profile)),
        Box::new(EnmlConverter::new()?),
        options,
    );

    if matches.is_present("all") {
        for (notebook, result) in backup.backup_all(&path)? {
            match result {
                Ok(report) => print_report(&notebook, &report),
                Err(e) => println!("{}", format!("{}: {}", notebook, e).red()),
            }
        }
    } else {
        let notebook = matches.value_of("notebook");
        let report = backup.backup(notebook, &path)?;
        print_report(notebook.unwrap_or_else(|| path.to_str().unwrap_or_default()), &report);
    }

    Ok(())
}

fn print_report(notebook: &str, report: &BackupReport) {
    let line = format!("{}: {}", notebook, report);
    if report.failed > 0 {
        println!("{}", line.yellow());
    } else {
        println!("{}", line.green());
    }
}
