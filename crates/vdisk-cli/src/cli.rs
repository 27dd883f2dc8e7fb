use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use vdisk_rs::constants::{DEFAULT_BLOCK_SIZE, DEFAULT_CAPACITY};

#[derive(Parser, Debug)]
#[command(name = "vdisk-cli", author, version, about = "Format and drive block-device disk images")]
pub struct Cli {
    /// Directory holding the disk images.
    #[arg(long, env = "VDISK_DIR", default_value = "DiskUnits", global = true)]
    pub disk_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create and format a new disk image.
    Format(FormatArgs),
    /// Delete a disk image.
    Destroy(DiskArg),
    /// Print geometry and free-list accounting.
    Info(DiskArg),
    /// List a directory.
    Ls(OptionalPathArgs),
    /// Create an empty directory.
    Mkdir(PathArgs),
    /// Create a file, or replace the contents of an existing one.
    Write(TextArgs),
    /// Add text to the end of an existing file.
    Append(TextArgs),
    /// Print a file.
    Cat(PathArgs),
    /// Remove a file or an empty directory.
    Rm(PathArgs),
    /// Copy a file to a new name inside the same disk.
    Cp(CopyArgs),
    /// Remove a directory and everything below it.
    Drmdir(PathArgs),
    /// Print every path whose final name contains a pattern.
    Find(FindArgs),
    /// List the disk images in the disk directory.
    Showdisks,
}

#[derive(Args, Debug)]
pub struct DiskArg {
    pub disk: String,
}

#[derive(Args, Debug)]
pub struct FormatArgs {
    pub disk: String,

    #[arg(long, env = "VDISK_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub capacity: u32,

    #[arg(long, env = "VDISK_BLOCK_SIZE", default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: u32,
}

#[derive(Args, Debug)]
pub struct OptionalPathArgs {
    pub disk: String,

    #[arg(default_value = "/")]
    pub path: String,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    pub disk: String,
    pub path: String,
}

#[derive(Args, Debug)]
pub struct TextArgs {
    pub disk: String,
    pub path: String,
    pub text: String,
}

#[derive(Args, Debug)]
pub struct CopyArgs {
    pub disk: String,
    pub from: String,
    pub to: String,
}

#[derive(Args, Debug)]
pub struct FindArgs {
    pub disk: String,
    pub pattern: String,
}
