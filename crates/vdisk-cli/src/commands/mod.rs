#[cfg(test)]
mod commands_tests;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};

use vdisk_rs::content::directory::validate_name;
use vdisk_rs::{Directory, File, InodeKind, VirtualDisk};

use crate::cli::{Cli, Command};

/// Runs one command against the disk directory and writes its output to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let dir = cli.disk_dir.as_path();
    match &cli.command {
        Command::Format(args) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create disk directory {}", dir.display()))?;
            let path = disk_path(dir, &args.disk)?;
            VirtualDisk::format(&path, args.capacity, args.block_size)
                .with_context(|| format!("failed to format disk {}", args.disk))?;
            writeln!(
                out,
                "formatted {}: {} blocks of {} bytes",
                args.disk, args.capacity, args.block_size
            )?;
        }
        Command::Destroy(args) => {
            VirtualDisk::destroy(disk_path(dir, &args.disk)?)
                .with_context(|| format!("failed to destroy disk {}", args.disk))?;
            writeln!(out, "destroyed {}", args.disk)?;
        }
        Command::Info(args) => {
            let disk = open(dir, &args.disk)?;
            info_report(&disk, out)?;
            disk.close()?;
        }
        Command::Ls(args) => {
            let disk = open(dir, &args.disk)?;
            let target = resolve_dir(&disk, &args.path)?;
            let mut entries = target.entries(&disk)?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries {
                let marker = match disk.read_inode(entry.inode)?.kind {
                    InodeKind::Directory => 'd',
                    InodeKind::File => '-',
                };
                writeln!(out, "{marker} {}", entry.name)?;
            }
            disk.close()?;
        }
        Command::Mkdir(args) => {
            let mut disk = open(dir, &args.disk)?;
            let (mut parent, name) = resolve_new(&disk, &args.path)?;
            let created = Directory::create(&mut disk)?;
            if let Err(err) = parent.add_entry(&mut disk, name, created.inode().index) {
                created.delete(&mut disk)?;
                return Err(err).with_context(|| format!("failed to link {}", args.path));
            }
            info!("mkdir: {} -> inode {}", args.path, created.inode().index);
            disk.close()?;
        }
        Command::Write(args) => {
            let mut disk = open(dir, &args.disk)?;
            let (mut parent, name) = resolve_parent(&disk, &args.path)?;
            validate_name(name).with_context(|| format!("invalid path {}", args.path))?;
            match parent.lookup(&disk, name)? {
                Some(inode) if inode.is_directory() => bail!("{} is a directory", args.path),
                Some(inode) => File::open(&disk, inode.index)?
                    .overwrite(&mut disk, &args.text)
                    .with_context(|| format!("failed to write {}", args.path))?,
                None => {
                    let file = File::create(&mut disk, &args.text)
                        .with_context(|| format!("failed to create {}", args.path))?;
                    if let Err(err) = parent.add_entry(&mut disk, name, file.inode().index) {
                        file.delete(&mut disk)?;
                        return Err(err).with_context(|| format!("failed to link {}", args.path));
                    }
                }
            }
            disk.close()?;
        }
        Command::Append(args) => {
            let mut disk = open(dir, &args.disk)?;
            let mut file = resolve_file(&disk, &args.path)?;
            file.append(&mut disk, &args.text)
                .with_context(|| format!("failed to append to {}", args.path))?;
            disk.close()?;
        }
        Command::Cat(args) => {
            let disk = open(dir, &args.disk)?;
            let file = resolve_file(&disk, &args.path)?;
            writeln!(out, "{}", file.read(&disk)?)?;
            disk.close()?;
        }
        Command::Rm(args) => {
            let mut disk = open(dir, &args.disk)?;
            let (mut parent, name) = resolve_parent(&disk, &args.path)?;
            let inode = parent
                .lookup(&disk, name)?
                .ok_or_else(|| anyhow!("{} not found", args.path))?;
            if inode.is_directory() {
                Directory::open(&disk, inode.index)?
                    .delete(&mut disk)
                    .with_context(|| format!("failed to remove {}", args.path))?;
            } else {
                File::open(&disk, inode.index)?.delete(&mut disk)?;
            }
            parent.remove_entry(&mut disk, name)?;
            disk.close()?;
        }
        Command::Cp(args) => {
            let mut disk = open(dir, &args.disk)?;
            let text = resolve_file(&disk, &args.from)?.read(&disk)?;
            let (mut parent, name) = resolve_new(&disk, &args.to)?;
            let copy = File::create(&mut disk, &text)
                .with_context(|| format!("failed to copy {} to {}", args.from, args.to))?;
            if let Err(err) = parent.add_entry(&mut disk, name, copy.inode().index) {
                copy.delete(&mut disk)?;
                return Err(err).with_context(|| format!("failed to link {}", args.to));
            }
            disk.close()?;
        }
        Command::Drmdir(args) => {
            let mut disk = open(dir, &args.disk)?;
            let (mut parent, name) = resolve_parent(&disk, &args.path)?;
            let inode = parent
                .lookup(&disk, name)?
                .ok_or_else(|| anyhow!("{} not found", args.path))?;
            if !inode.is_directory() {
                bail!("{} is not a directory", args.path);
            }
            let target = Directory::open(&disk, inode.index)?;
            remove_tree(&mut disk, target)
                .with_context(|| format!("failed to remove {}", args.path))?;
            parent.remove_entry(&mut disk, name)?;
            disk.close()?;
        }
        Command::Find(args) => {
            let disk = open(dir, &args.disk)?;
            let mut hits = Vec::new();
            find_matches(&disk, &Directory::open_root(&disk)?, "", &args.pattern, &mut hits)?;
            for hit in hits {
                writeln!(out, "{hit}")?;
            }
            disk.close()?;
        }
        Command::Showdisks => {
            let disks = list_disks(dir)?;
            if disks.is_empty() {
                writeln!(out, "no disks in {}", dir.display())?;
            }
            for (name, capacity, block_size) in disks {
                writeln!(out, "{name} {capacity} {block_size}")?;
            }
        }
    }
    Ok(())
}

/// Deletes `dir` after removing every file and subdirectory below it.
fn remove_tree(disk: &mut VirtualDisk, mut dir: Directory) -> Result<()> {
    for entry in dir.entries(disk)? {
        let inode = disk.read_inode(entry.inode)?;
        if inode.is_directory() {
            let child = Directory::open(disk, inode.index)?;
            remove_tree(disk, child)?;
        } else {
            File::open(disk, inode.index)?.delete(disk)?;
        }
        dir.remove_entry(disk, &entry.name)?;
    }
    dir.delete(disk)?;
    Ok(())
}

fn find_matches(
    disk: &VirtualDisk,
    dir: &Directory,
    prefix: &str,
    pattern: &str,
    hits: &mut Vec<String>,
) -> Result<()> {
    let mut entries = dir.entries(disk)?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    for entry in entries {
        let path = format!("{prefix}/{}", entry.name);
        if entry.name.contains(pattern) {
            hits.push(path.clone());
        }
        let inode = disk.read_inode(entry.inode)?;
        if inode.is_directory() {
            find_matches(disk, &Directory::open(disk, inode.index)?, &path, pattern, hits)?;
        }
    }
    Ok(())
}

/// Returns `(name, capacity, block size)` for every readable disk image in `dir`.
fn list_disks(dir: &Path) -> Result<Vec<(String, u32, usize)>> {
    let mut disks = Vec::new();
    if !dir.is_dir() {
        return Ok(disks);
    }
    let listing = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read disk directory {}", dir.display()))?;
    for entry in listing {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        match VirtualDisk::open(entry.path()) {
            Ok(disk) => {
                disks.push((name, disk.capacity(), disk.block_size()));
                disk.close()?;
            }
            Err(err) => debug!("showdisks: skipping {name}: {err}"),
        }
    }
    disks.sort();
    Ok(disks)
}

fn disk_path(dir: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        bail!("invalid disk name {name:?}");
    }
    Ok(dir.join(name))
}

fn open(dir: &Path, name: &str) -> Result<VirtualDisk> {
    let path = disk_path(dir, name)?;
    VirtualDisk::open(&path).with_context(|| format!("failed to open disk {name}"))
}

fn info_report(disk: &VirtualDisk, out: &mut impl Write) -> Result<()> {
    writeln!(out, "capacity:         {} blocks", disk.capacity())?;
    writeln!(out, "block size:       {} bytes", disk.block_size())?;
    writeln!(out, "inodes:           {}", disk.inode_count())?;
    writeln!(out, "first data block: {}", disk.first_data_block())?;
    writeln!(out, "free blocks:      {}", disk.free_block_count()?)?;
    writeln!(out, "free inodes:      {}", disk.free_inode_count()?)?;
    writeln!(out, "max file size:    {} bytes", disk.geometry().max_payload())?;
    Ok(())
}

fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

fn walk(disk: &VirtualDisk, parts: &[&str], shown: &str) -> Result<Directory> {
    let mut current = Directory::open_root(disk)?;
    for part in parts {
        let inode = current
            .lookup(disk, part)?
            .ok_or_else(|| anyhow!("{shown}: {part} not found"))?;
        if !inode.is_directory() {
            bail!("{shown}: {part} is not a directory");
        }
        current = Directory::open(disk, inode.index)?;
    }
    Ok(current)
}

fn resolve_dir(disk: &VirtualDisk, path: &str) -> Result<Directory> {
    walk(disk, &components(path), path)
}

/// Splits `path` into its parent directory and final name.
fn resolve_parent<'a>(disk: &VirtualDisk, path: &'a str) -> Result<(Directory, &'a str)> {
    let parts = components(path);
    let Some((name, parents)) = parts.split_last() else {
        bail!("{path:?} names the root directory");
    };
    Ok((walk(disk, parents, path)?, *name))
}

/// Resolves the parent of a path that is about to be created and checks
/// that its final name is valid and unused.
fn resolve_new<'a>(disk: &VirtualDisk, path: &'a str) -> Result<(Directory, &'a str)> {
    let (parent, name) = resolve_parent(disk, path)?;
    validate_name(name).with_context(|| format!("invalid path {path}"))?;
    if parent.lookup(disk, name)?.is_some() {
        bail!("{path} already exists");
    }
    Ok((parent, name))
}

fn resolve_file(disk: &VirtualDisk, path: &str) -> Result<File> {
    let (parent, name) = resolve_parent(disk, path)?;
    let inode = parent
        .lookup(disk, name)?
        .ok_or_else(|| anyhow!("{path} not found"))?;
    if inode.is_directory() {
        bail!("{path} is a directory");
    }
    Ok(File::open(disk, inode.index)?)
}
