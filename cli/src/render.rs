// Text and JSON views of entries, files and geometry

use anyhow::{bail, Result};
use fatscope_fs::{Entry, EntryHandle, FatDateTime, Geometry, Image};
use std::io::{Read, Write};

const INDENT: &str = "    ";
const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";

/// Decode the children of a directory and close their handles again
pub fn child_entries(image: &mut Image, directory: EntryHandle) -> Result<Vec<Entry>> {
    let handles = image.list_children(directory)?;
    let mut entries = Vec::with_capacity(handles.len());
    for handle in handles {
        entries.push(image.entry(handle)?.clone());
        image.close_entry(handle)?;
    }
    Ok(entries)
}

fn is_dot_entry(entry: &Entry) -> bool {
    entry.name == "." || entry.name == ".."
}

pub fn print_children(
    image: &mut Image,
    directory: EntryHandle,
    json: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let entries = child_entries(image, directory)?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }

    for entry in &entries {
        let kind = if entry.is_directory() { 'd' } else { 'f' };
        writeln!(out, "{} {}", kind, entry.name)?;
    }
    Ok(())
}

/// Print the hierarchy below `entry`, depth first in directory order
pub fn print_tree(image: &mut Image, entry: EntryHandle, out: &mut dyn Write) -> Result<()> {
    let top = image.entry(entry)?.clone();
    writeln!(out, "{}", top.display_name())?;
    if top.is_directory() {
        print_subtree(image, entry, 1, out)?;
    }
    Ok(())
}

fn print_subtree(
    image: &mut Image,
    directory: EntryHandle,
    depth: usize,
    out: &mut dyn Write,
) -> Result<()> {
    let handles = image.list_children(directory)?;
    let mut visible = Vec::with_capacity(handles.len());
    for handle in handles {
        if is_dot_entry(image.entry(handle)?) {
            image.close_entry(handle)?;
        } else {
            visible.push(handle);
        }
    }

    let count = visible.len();
    let mut result = Ok(());
    for (i, &child) in visible.iter().enumerate() {
        if result.is_ok() {
            result = print_node(image, child, depth, i + 1 == count, out);
        }
        image.close_entry(child)?;
    }
    result
}

fn print_node(
    image: &mut Image,
    child: EntryHandle,
    depth: usize,
    last: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let entry = image.entry(child)?;
    let connector = if last { LAST_BRANCH } else { BRANCH };
    writeln!(out, "{}{}{}", INDENT.repeat(depth - 1), connector, entry.name)?;

    if entry.is_directory() {
        print_subtree(image, child, depth + 1, out)?;
    }
    Ok(())
}

pub fn format_datetime(dt: &FatDateTime) -> String {
    format!(
        "{:04}/{:02}/{:02} {:02}:{:02}:{:02}.{:04}",
        dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second, dt.millisecond
    )
}

pub fn print_info(entry: &Entry, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, entry)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Name: {}", entry.name)?;
    write!(out, "Attribute(s):")?;
    for name in entry.attributes.names() {
        write!(out, " {}", name)?;
    }
    writeln!(out)?;
    writeln!(out, "Create: {}", format_datetime(&entry.created))?;
    writeln!(out, "Modify: {}", format_datetime(&entry.modified))?;
    writeln!(out, "Access: {}", format_datetime(&entry.accessed))?;
    writeln!(out, "Size: {}B", entry.size)?;
    Ok(())
}

/// Split a name at its last `.`; names without one have no extension
pub fn split_name(name: &str) -> (&str, &str) {
    name.rsplit_once('.').unwrap_or((name, ""))
}

pub fn meta_line(entry: &Entry) -> String {
    let (base, ext) = split_name(&entry.name);
    let c = &entry.created;
    format!(
        "name={} ext={} cTime={}:{}:{} cDate={}/{}/{} clusLow={} size={}",
        base,
        ext,
        c.hour,
        c.minute,
        c.second,
        c.year,
        c.month,
        c.day,
        entry.cluster & 0xFFF,
        entry.size
    )
}

/// Copy a file's content to `out`
pub fn print_data(image: &mut Image, entry: EntryHandle, out: &mut dyn Write) -> Result<()> {
    let name = image.entry(entry)?.display_name().to_string();
    if !image.entry(entry)?.is_file() {
        bail!("Not file: {}", name);
    }

    let file = image.open_file(entry)?;
    let mut buf = [0u8; 4096];
    let copied = (|| -> Result<()> {
        let mut stream = image.stream(file)?;
        loop {
            let n = stream.read(&mut buf)?;
            if n == 0 {
                return Ok(());
            }
            out.write_all(&buf[..n])?;
        }
    })();
    image.close_file(file)?;
    copied
}

pub fn print_geometry(geometry: &Geometry, json: bool, out: &mut dyn Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, geometry)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Type:              {}", geometry.fat_type)?;
    writeln!(out, "Sector size:       {}", geometry.sector_size)?;
    writeln!(out, "Cluster size:      {}", geometry.cluster_size)?;
    writeln!(out, "FATs:              {} x {} sectors", geometry.fat_count, geometry.fat_sectors)?;
    writeln!(out, "Total sectors:     {}", geometry.total_sectors)?;
    writeln!(out, "Data clusters:     {}", geometry.data_clusters)?;
    writeln!(out, "FAT offset:        {:#x}", geometry.fat_offset)?;
    writeln!(out, "Root offset:       {:#x}", geometry.root_offset)?;
    writeln!(out, "Data offset:       {:#x}", geometry.data_offset)?;
    writeln!(out, "Root cluster:      {}", geometry.root_cluster)?;
    writeln!(out, "Root entries:      {}", geometry.max_root_entries)?;
    writeln!(out, "Cluster entries:   {}", geometry.max_cluster_entries)?;
    writeln!(out, "End of chain:      {:#x}", geometry.cluster_end)?;
    Ok(())
}
