use clap::{Arg, ArgMatches, Command};

use nbackup_lib::error::{BackupError, Result};
use nbackup_lib::model::{BackupOptions, ImageOptions, OutputFormat};

pub fn gen_app() -> Command<'static> {
    Command::new("nbackup")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Philipp Hentschel <philipp@f1ndus.de>")
        .about("Backs up the notebooks of a note service into local files")
        .arg(Arg::new("path")
            .long("path")
            .short('p')
            .takes_value(true)
            .value_name("DIR")
            .required(true)
            .help("Path to backup directory, gets created if missing"))
        .arg(Arg::new("format")
            .long("format")
            .short('f')
            .takes_value(true)
            .possible_values(["plain", "markdown", "html"])
            .default_value("plain")
            .help("The format of the file contents"))
        .arg(Arg::new("notebook")
            .long("notebook")
            .short('n')
            .takes_value(true)
            .conflicts_with("all")
            .help("Notebook to back up, defaults to the name of the backup directory"))
        .arg(Arg::new("all")
            .long("all")
            .short('a')
            .help("Back up all notebooks, each into its own subdirectory"))
        .arg(Arg::new("delete")
            .long("delete")
            .help("Delete extraneous files from backup directory"))
        .arg(Arg::new("logpath")
            .long("logpath")
            .short('l')
            .takes_value(true)
            .value_name("FILE")
            .help("Path to log file"))
        .arg(Arg::new("save-images")
            .long("save-images")
            .help("Save images along with text"))
        .arg(Arg::new("images-in-subdir")
            .long("images-in-subdir")
            .help("Save images in a subdirectory instead of next to the note"))
}

pub fn backup_options(matches: &ArgMatches, max_notes: usize) -> Result<BackupOptions> {
    let format = matches.value_of("format")
        .unwrap_or("plain")
        .parse::<OutputFormat>()
        .map_err(BackupError::Configuration)?;

    Ok(BackupOptions {
        format,
        delete: matches.is_present("delete"),
        images: ImageOptions {
            save_images: matches.is_present("save-images"),
            images_in_subdir: matches.is_present("images-in-subdir"),
        },
        max_notes,
    })
}
