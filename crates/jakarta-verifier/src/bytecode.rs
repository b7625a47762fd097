//! Bytecode pre-scan: walk a JAR's class entries and enumerate
//! `javax.*` / `jakarta.*` references without executing any code.
//!
//! References are harvested from each class's constant pool (class entries
//! plus `L...;` descriptors in UTF-8 constants). A class whose references
//! span both namespaces is flagged as mixed, the strongest static signal
//! of a half-migrated compilation unit.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::types::{ErrorType, VerificationError};

/// Ceiling on scanned class entries; pathological JARs get one warning
/// instead of an unbounded walk.
pub const DEFAULT_MAX_CLASSES: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to open JAR: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read JAR archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Findings of one pre-scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BytecodeScanResult {
    /// Distinct `javax.*` classes referenced anywhere in the JAR
    pub javax_classes: BTreeSet<String>,
    /// Distinct `jakarta.*` classes referenced anywhere in the JAR
    pub jakarta_classes: BTreeSet<String>,
    /// Classes whose own references span both namespaces
    pub mixed_namespace_classes: BTreeSet<String>,
    pub potential_errors: Vec<VerificationError>,
    pub warnings: Vec<String>,
    pub analysis_time_ms: u64,
    pub classes_analyzed: usize,
}

impl BytecodeScanResult {
    /// Whether anything namespace-relevant turned up
    pub fn has_issues(&self) -> bool {
        !self.javax_classes.is_empty()
            || !self.jakarta_classes.is_empty()
            || !self.mixed_namespace_classes.is_empty()
            || !self.potential_errors.is_empty()
    }
}

/// Scan a JAR on disk.
pub fn scan_jar(path: &Path, max_classes: usize) -> Result<BytecodeScanResult, ScanError> {
    let file = File::open(path)?;
    scan_reader(file, max_classes)
}

/// Scan any seekable archive. Split from [`scan_jar`] so tests can feed
/// in-memory JARs.
pub fn scan_reader<R: Read + Seek>(
    reader: R,
    max_classes: usize,
) -> Result<BytecodeScanResult, ScanError> {
    let started = Instant::now();
    let mut archive = ZipArchive::new(reader)?;
    let mut result = BytecodeScanResult::default();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if !entry.name().ends_with(".class") {
            continue;
        }
        if result.classes_analyzed >= max_classes {
            result.warnings.push(format!(
                "bytecode scan truncated after {} class entries",
                max_classes
            ));
            break;
        }

        let class_name = entry
            .name()
            .trim_end_matches(".class")
            .replace('/', ".");
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        result.classes_analyzed += 1;

        let refs = match constant_pool_references(&bytes) {
            Ok(refs) => refs,
            Err(err) => {
                warn!(class = %class_name, error = %err, "unparseable class entry");
                result
                    .warnings
                    .push(format!("unparseable class entry: {}", class_name));
                continue;
            }
        };

        let mut saw_javax = false;
        let mut saw_jakarta = false;
        for referenced in refs {
            if let Some(rest) = referenced.strip_prefix("javax/") {
                saw_javax = true;
                result
                    .javax_classes
                    .insert(format!("javax.{}", rest.replace('/', ".")));
            } else if let Some(rest) = referenced.strip_prefix("jakarta/") {
                saw_jakarta = true;
                result
                    .jakarta_classes
                    .insert(format!("jakarta.{}", rest.replace('/', ".")));
            }
        }
        if saw_javax && saw_jakarta {
            result.mixed_namespace_classes.insert(class_name.clone());
            result.potential_errors.push(VerificationError::new(
                ErrorType::LinkageError,
                format!(
                    "class {} references both javax.* and jakarta.* types",
                    class_name
                ),
                0.7,
            ));
        }
    }

    result.analysis_time_ms = started.elapsed().as_millis() as u64;
    debug!(
        classes = result.classes_analyzed,
        javax = result.javax_classes.len(),
        jakarta = result.jakarta_classes.len(),
        mixed = result.mixed_namespace_classes.len(),
        "bytecode scan complete"
    );
    Ok(result)
}

#[derive(Debug, thiserror::Error)]
enum ClassFormatError {
    #[error("truncated class file")]
    Truncated,

    #[error("bad magic number")]
    BadMagic,

    #[error("unknown constant pool tag {0}")]
    UnknownTag(u8),
}

/// Harvest every internal class name referenced by a class file's
/// constant pool: `CONSTANT_Class` entries plus `L...;` object types
/// inside UTF-8 descriptors and signatures.
fn constant_pool_references(bytes: &[u8]) -> Result<BTreeSet<String>, ClassFormatError> {
    let mut cursor = Cursor { bytes, pos: 0 };
    if cursor.u32()? != 0xCAFE_BABE {
        return Err(ClassFormatError::BadMagic);
    }
    cursor.skip(4)?; // minor + major version

    let pool_count = cursor.u16()? as usize;
    let mut utf8_entries: Vec<Option<String>> = vec![None; pool_count];
    let mut class_name_indices = Vec::new();

    let mut index = 1;
    while index < pool_count {
        let tag = cursor.u8()?;
        match tag {
            // CONSTANT_Utf8
            1 => {
                let length = cursor.u16()? as usize;
                let raw = cursor.take(length)?;
                utf8_entries[index] = Some(String::from_utf8_lossy(raw).into_owned());
            }
            // CONSTANT_Integer / CONSTANT_Float
            3 | 4 => cursor.skip(4)?,
            // CONSTANT_Long / CONSTANT_Double occupy two pool slots
            5 | 6 => {
                cursor.skip(8)?;
                index += 1;
            }
            // CONSTANT_Class
            7 => class_name_indices.push(cursor.u16()? as usize),
            // CONSTANT_String / CONSTANT_MethodType / CONSTANT_Module / CONSTANT_Package
            8 | 16 | 19 | 20 => cursor.skip(2)?,
            // Refs, NameAndType, Dynamic, InvokeDynamic
            9 | 10 | 11 | 12 | 17 | 18 => cursor.skip(4)?,
            // CONSTANT_MethodHandle
            15 => cursor.skip(3)?,
            other => return Err(ClassFormatError::UnknownTag(other)),
        }
        index += 1;
    }

    let mut references = BTreeSet::new();
    for name_index in class_name_indices {
        if let Some(Some(name)) = utf8_entries.get(name_index) {
            // Array classes encode element types as descriptors.
            if name.starts_with('[') {
                collect_descriptor_types(name, &mut references);
            } else {
                references.insert(name.clone());
            }
        }
    }
    for entry in utf8_entries.into_iter().flatten() {
        collect_descriptor_types(&entry, &mut references);
    }
    Ok(references)
}

/// Pull `L<internal-name>;` object types out of a descriptor or signature
/// string.
fn collect_descriptor_types(descriptor: &str, out: &mut BTreeSet<String>) {
    let mut rest = descriptor;
    while let Some(start) = rest.find('L') {
        let tail = &rest[start + 1..];
        if let Some(end) = tail.find(';') {
            // Generic signatures embed type arguments; strip them.
            let name = tail[..end].split('<').next().unwrap_or("");
            if name.starts_with("javax/") || name.starts_with("jakarta/") {
                out.insert(name.to_string());
            }
        }
        // Advance one character, not past the ';', so nested object types
        // inside generic signatures are still visited.
        rest = &rest[start + 1..];
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFormatError> {
        let end = self.pos.checked_add(n).ok_or(ClassFormatError::Truncated)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(ClassFormatError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<(), ClassFormatError> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8, ClassFormatError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClassFormatError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFormatError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
