/*!
 * File-level tools that stream TMX straight from reader to writer.
 *
 * Neither tool builds a store: units go from one document to another one at
 * a time, so they work on corpora of any size.
 */

use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::errors::{Result, TmxError};
use crate::model::{ALL_LANGUAGES, Header, TranslationUnit};
use crate::xml::{TmxEvent, TmxReader, TmxWriter};

/// Header and units of a document, read lazily
fn open_document(path: &Path) -> Result<(Header, impl Iterator<Item = Result<TranslationUnit>>)> {
    let mut reader = TmxReader::from_path(path)?;
    let mut header = None;
    let mut first_unit = None;
    while let Some(event) = reader.next_event()? {
        match event {
            TmxEvent::Header(h) => {
                header = Some(h);
                break;
            }
            TmxEvent::Unit(unit) => {
                warn!("{:?} has no header before its body", path);
                first_unit = Some(unit);
                break;
            }
        }
    }
    let units = first_unit.map(Ok).into_iter().chain(reader.filter_map(|event| match event {
        Ok(TmxEvent::Unit(unit)) => Some(Ok(unit)),
        Ok(TmxEvent::Header(_)) => None,
        Err(e) => Some(Err(e)),
    }));
    Ok((header.unwrap_or_default(), units))
}

/// Output path `<dir>/<stem>_<index>.tmx`
fn part_path(path: &Path, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "part".to_string());
    path.with_file_name(format!("{}_{}.tmx", stem, index))
}

/// Split a TMX file into `parts` files of nearly equal unit counts.
///
/// Units without variants are not copied. Returns the files written.
pub fn split_file<P: AsRef<Path>>(path: P, parts: usize, indentation: usize) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    if parts < 2 {
        return Err(TmxError::Malformed(format!(
            "cannot split into {} parts",
            parts
        )));
    }

    let (_, units) = open_document(path)?;
    let mut total: usize = 0;
    for unit in units {
        if !unit?.variants.is_empty() {
            total += 1;
        }
    }
    let per_part = total.div_ceil(parts).max(1);
    debug!("Splitting {} units into parts of {}", total, per_part);

    let (header, units) = open_document(path)?;
    let mut outputs = Vec::new();
    let mut writer: Option<TmxWriter<_>> = None;
    for unit in units {
        let unit = unit?;
        if unit.variants.is_empty() {
            continue;
        }
        if writer.as_ref().is_none_or(|w| w.units_written() >= per_part) {
            if let Some(done) = writer.take() {
                done.finish()?;
            }
            let output = part_path(path, outputs.len() + 1);
            let mut next = TmxWriter::create(&output, indentation)?;
            next.begin(&header)?;
            outputs.push(output);
            writer = Some(next);
        }
        if let Some(current) = writer.as_mut() {
            current.write_unit(&unit)?;
        }
    }
    if let Some(done) = writer.take() {
        done.finish()?;
    }
    info!("Split {:?} into {} files", path, outputs.len());
    Ok(outputs)
}

/// Merge TMX files into one, in input order.
///
/// The header of the first input is kept; `srclang` becomes `*all*` when the
/// inputs disagree. Repeated `tuid`s are dropped so ids stay unique. Returns
/// the number of units written.
pub fn merge_files<P: AsRef<Path>>(inputs: &[P], output: &Path, indentation: usize) -> Result<usize> {
    let mut header: Option<Header> = None;
    for input in inputs {
        let (next, _) = open_document(input.as_ref())?;
        header = Some(match header {
            None => next,
            Some(mut merged) => {
                if merged.srclang() != next.srclang() {
                    merged.set_srclang(ALL_LANGUAGES);
                }
                merged
            }
        });
    }
    let header = header.ok_or_else(|| TmxError::Malformed("nothing to merge".to_string()))?;

    let mut writer = TmxWriter::create(output, indentation)?;
    writer.begin(&header)?;
    let mut seen = HashSet::new();
    for input in inputs {
        let (_, units) = open_document(input.as_ref())?;
        for unit in units {
            let mut unit = unit?;
            if !unit.id.is_empty() && !seen.insert(unit.id.clone()) {
                unit.id.clear();
            }
            writer.write_unit(&unit)?;
        }
    }
    let written = writer.units_written();
    writer.finish()?;
    info!("Merged {} files into {:?} ({} units)", inputs.len(), output, written);
    Ok(written)
}
