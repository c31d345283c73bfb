use std::collections::HashMap;
use std::io::{Cursor, Write};

use anyhow::{Context, Result, bail};
use tracing::info;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use super::RenderedAttachment;

/// Bundle rendered attachment files into an in-memory zip archive.
///
/// Entry names must be unique: two commands resolving to the same file
/// name is an error, nothing is overwritten.
pub fn build_zip(attachments: &[RenderedAttachment]) -> Result<Vec<u8>> {
    let mut seen: HashMap<&str, &str> = HashMap::with_capacity(attachments.len());
    for attachment in attachments {
        if let Some(previous) = seen.insert(&attachment.file_name, &attachment.label) {
            bail!(
                "Attachment file name '{}' is produced by both '{}' and '{}'",
                attachment.file_name,
                previous,
                attachment.label
            );
        }
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for attachment in attachments {
        info!("Creating and adding {}", attachment.file_name);
        zip.start_file(attachment.file_name.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", attachment.file_name))?;
        zip.write_all(attachment.content.as_bytes())
            .with_context(|| format!("Failed to write {} to archive", attachment.file_name))?;
    }

    let cursor = zip.finish().context("Failed to finish zip archive")?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn attachment(label: &str, file_name: &str, content: &str) -> RenderedAttachment {
        RenderedAttachment {
            label: label.to_string(),
            file_name: file_name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_archive_contains_every_attachment() {
        let bytes = build_zip(&[
            attachment("Uptime", "uptime.txt", "up 3 days"),
            attachment("Disk", "disk.txt", "/dev/sda1 42%"),
        ])
        .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive.by_name("disk.txt").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "/dev/sda1 42%");

        let names: Vec<_> = archive.file_names().collect();
        assert!(names.contains(&"uptime.txt"));
    }

    #[test]
    fn test_colliding_names_are_rejected() {
        let err = build_zip(&[
            attachment("Disk usage", "disk.txt", "a"),
            attachment("Disk-usage", "disk.txt", "b"),
        ])
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("disk.txt"));
        assert!(message.contains("'Disk usage'"));
        assert!(message.contains("'Disk-usage'"));
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let bytes = build_zip(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
