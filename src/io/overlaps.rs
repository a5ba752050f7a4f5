//! Overlap-list persistence.
//!
//! One block per record, blocks separated by a blank line:
//!
//! ```text
//! MULTIPOLYGON(((0 0,0.5 0,0.5 1,0 1,0 0)))
//! A
//!
//! MULTIPOLYGON(((0.5 0,1 0,1 1,0.5 1,0.5 0)))
//! A
//! B
//! ```
//!
//! Lines are trimmed on reading, so ids must be non-empty single lines
//! without surrounding whitespace.
//!
//! Paths ending in `.gz` are gzip-compressed.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::info;

use super::atomic::open_for_write;
use super::wkt::{multipolygon_to_wkt, parse_multipolygon};
use crate::overlap::{ErrorLogEntry, OverlapOptions, OverlapRecord, OverlapSet};
use crate::types::{IdSet, ImageId};

#[inline]
fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Whether `id` reads back unchanged from its own line.
#[inline]
fn is_line_safe(id: &ImageId) -> bool {
    let id = id.as_str();
    !id.is_empty() && id.trim() == id && !id.contains(['\n', '\r'])
}

/// Write records in block form.
///
/// Fails before writing anything if an id would not read back unchanged.
pub fn write_overlaps<W: Write>(records: &[OverlapRecord], mut out: W) -> Result<()> {
    if let Some(id) = records.iter().flat_map(|r| &r.ids).find(|id| !is_line_safe(id)) {
        bail!("[io::overlaps] Image id {:?} is empty, spans lines or has surrounding whitespace", id.as_str());
    }

    for (i, record) in records.iter().enumerate() {
        if i > 0 { writeln!(out)?; }
        writeln!(out, "{}", multipolygon_to_wkt(&record.polygon)?)?;
        for id in &record.ids {
            writeln!(out, "{id}")?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Read records in block form.
pub fn read_overlaps<R: BufRead>(input: R) -> Result<Vec<OverlapRecord>> {
    fn flush_block(block: &mut Vec<(usize, String)>, records: &mut Vec<OverlapRecord>) -> Result<()> {
        let mut lines = block.drain(..);
        let Some((line_no, wkt)) = lines.next() else { return Ok(()) };
        let polygon = parse_multipolygon(&wkt)
            .with_context(|| format!("[io::overlaps] Bad geometry on line {line_no}"))?;
        let ids: IdSet = lines.map(|(_, id)| ImageId::from(id)).collect();
        if ids.is_empty() {
            bail!("[io::overlaps] Record starting on line {line_no} has no image ids");
        }
        records.push(OverlapRecord::with_ids(polygon, ids));
        Ok(())
    }

    let mut records = Vec::new();
    let mut block = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.context("[io::overlaps] Failed to read line")?;
        let line = line.trim();
        if line.is_empty() {
            flush_block(&mut block, &mut records)?;
        } else {
            block.push((i + 1, line.to_string()));
        }
    }
    flush_block(&mut block, &mut records)?;
    Ok(records)
}

/// Save a set's records to `path`.
pub fn persist_overlaps(set: &OverlapSet, path: &Path, force: bool) -> Result<()> {
    let pending = open_for_write(path, force)?;
    let pending = if is_gzip(path) {
        let mut encoder = GzEncoder::new(pending, Compression::default());
        write_overlaps(set.records(), &mut encoder)?;
        encoder.finish().context("[io::overlaps] Failed to finish gzip stream")?
    } else {
        let mut pending = pending;
        write_overlaps(set.records(), &mut pending)?;
        pending
    };
    pending.finalize()?;

    info!(records = set.len(), path = %path.display(), "wrote overlap list");
    Ok(())
}

/// Load an overlap list saved by [`persist_overlaps`].
pub fn load_overlaps(path: &Path, options: OverlapOptions) -> Result<OverlapSet> {
    let file = File::open(path)
        .with_context(|| format!("[io::overlaps] Failed to open {}", path.display()))?;
    let reader: Box<dyn Read> = if is_gzip(path) { Box::new(GzDecoder::new(file)) } else { Box::new(file) };
    let records = read_overlaps(BufReader::new(reader))
        .with_context(|| format!("[io::overlaps] Failed to read {}", path.display()))?;

    info!(records = records.len(), path = %path.display(), "loaded overlap list");
    Ok(OverlapSet::from_records(records, options))
}

/// Export an error log as a JSON array.
pub fn write_error_log(log: &[ErrorLogEntry], path: &Path, force: bool) -> Result<()> {
    let mut pending = open_for_write(path, force)?;
    serde_json::to_writer_pretty(&mut pending, log)
        .context("[io::overlaps] Failed to serialize error log")?;
    writeln!(pending)?;
    pending.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, Rect};
    use std::io::Cursor;

    fn square(x0: f64, x1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Rect::new((x0, 0.0), (x1, 1.0)).to_polygon()])
    }

    #[test]
    fn block_format() {
        let records = vec![
            OverlapRecord::new(square(0.0, 1.0), "A".into()),
            OverlapRecord::with_ids(MultiPolygon::new(vec![]), ["B", "C"].into_iter().map(ImageId::from).collect()),
        ];
        let mut out = Vec::new();
        write_overlaps(&records, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("\n\nMULTIPOLYGON EMPTY\nB\nC\n"));

        let back = read_overlaps(Cursor::new(text)).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn extra_blank_lines_are_ignored() {
        let text = "\n\nPOLYGON ((0 0, 1 0, 1 1, 0 0))\nA\n\n\n\nPOLYGON ((2 0, 3 0, 3 1, 2 0))\r\nB\n";
        let records = read_overlaps(Cursor::new(text)).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[1].contains_id("B"));
    }

    #[test]
    fn ids_that_would_not_read_back_are_rejected() {
        for bad in [" A", "B\t", "C\nD", "E\r", ""] {
            let records = vec![OverlapRecord::new(square(0.0, 1.0), bad.into())];
            let mut out = Vec::new();
            assert!(write_overlaps(&records, &mut out).is_err(), "{bad:?}");
            assert!(out.is_empty());
        }

        let records = vec![OverlapRecord::new(square(0.0, 1.0), "img 7.cub".into())];
        let mut out = Vec::new();
        write_overlaps(&records, &mut out).unwrap();
        assert_eq!(read_overlaps(Cursor::new(out)).unwrap(), records);
    }

    #[test]
    fn block_without_ids_is_an_error() {
        let text = "POLYGON ((0 0, 1 0, 1 1, 0 0))\n\nPOLYGON ((2 0, 3 0, 3 1, 2 0))\nB\n";
        assert!(read_overlaps(Cursor::new(text)).is_err());
    }
}
