use anyhow::{anyhow, Context};
use rusqlite::Connection;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/records.sqlite3";
pub const BUNDLE_FORMAT_V1: &str = "recordsd-bundle-v1";
pub const LEGACY_SQLITE_FORMAT: &str = "legacy-sqlite3";

const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const SQLITE_SIGNATURE: &[u8; 16] = b"SQLite format 3\0";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub db_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

fn sha256_file(path: &Path) -> anyhow::Result<String> {
    let mut f =
        File::open(path).with_context(|| format!("failed to open {}", path.to_string_lossy()))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut f, &mut hasher)
        .with_context(|| format!("failed to hash {}", path.to_string_lossy()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Writes a zip bundle holding a consistent snapshot of the database.
///
/// The snapshot is taken with `VACUUM INTO`, so it is safe to run while the
/// server has the database open.
pub fn export_bundle(db_path: &Path, out_path: &Path) -> anyhow::Result<ExportSummary> {
    if !db_path.is_file() {
        return Err(anyhow!(
            "records database not found: {}",
            db_path.to_string_lossy()
        ));
    }
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let snapshot = with_suffix(out_path, ".snapshot");
    if snapshot.exists() {
        std::fs::remove_file(&snapshot).with_context(|| {
            format!("failed to remove stale snapshot {}", snapshot.to_string_lossy())
        })?;
    }
    {
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;
        let target = snapshot.to_string_lossy().to_string();
        conn.execute("VACUUM INTO ?", [&target])
            .context("failed to snapshot database")?;
    }

    let result = write_bundle(&snapshot, out_path);
    let _ = std::fs::remove_file(&snapshot);
    result
}

fn write_bundle(snapshot: &Path, out_path: &Path) -> anyhow::Result<ExportSummary> {
    let db_sha256 = sha256_file(snapshot)?;

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "dbSha256": db_sha256,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DB_ENTRY, opts)
        .context("failed to start database entry")?;
    let mut db_file = File::open(snapshot).context("failed to open database snapshot")?;
    std::io::copy(&mut db_file, &mut zip).context("failed to write database entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        db_sha256,
    })
}

/// Restores a bundle (or a bare SQLite file) to `db_path`.
///
/// The database is extracted next to the target, checked against the
/// manifest digest, and only then renamed into place.
pub fn import_bundle(in_path: &Path, db_path: &Path) -> anyhow::Result<ImportSummary> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let tmp_dst = with_suffix(db_path, ".importing");
    if tmp_dst.exists() {
        let _ = std::fs::remove_file(&tmp_dst);
    }

    let format = match stage_import(in_path, &tmp_dst) {
        Ok(format) => format,
        Err(e) => {
            discard(&tmp_dst);
            return Err(e);
        }
    };

    // A leftover WAL from the previous database must not be replayed onto
    // the restored one.
    for suffix in ["-wal", "-shm"] {
        let side = with_suffix(db_path, suffix);
        if side.exists() {
            if let Err(e) = std::fs::remove_file(&side) {
                discard(&tmp_dst);
                return Err(e)
                    .with_context(|| format!("failed to remove {}", side.to_string_lossy()));
            }
        }
    }
    if let Err(e) = std::fs::rename(&tmp_dst, db_path) {
        discard(&tmp_dst);
        return Err(e).with_context(|| {
            format!(
                "failed to move restored database to {}",
                db_path.to_string_lossy()
            )
        });
    }

    Ok(ImportSummary {
        bundle_format_detected: format.to_string(),
    })
}

/// Writes the database held by `in_path` to `tmp_dst` and names the format.
fn stage_import(in_path: &Path, tmp_dst: &Path) -> anyhow::Result<&'static str> {
    match read_signature(in_path)? {
        Signature::Zip => {
            extract_bundle(in_path, tmp_dst)?;
            Ok(BUNDLE_FORMAT_V1)
        }
        Signature::Sqlite => {
            std::fs::copy(in_path, tmp_dst).with_context(|| {
                format!(
                    "failed to copy legacy sqlite backup from {}",
                    in_path.to_string_lossy()
                )
            })?;
            Ok(LEGACY_SQLITE_FORMAT)
        }
        Signature::Unknown => Err(anyhow!(
            "unrecognized backup file: {}",
            in_path.to_string_lossy()
        )),
    }
}

fn discard(tmp_dst: &Path) {
    if tmp_dst.exists() {
        let _ = std::fs::remove_file(tmp_dst);
    }
}

fn extract_bundle(in_path: &Path, tmp_dst: &Path) -> anyhow::Result<()> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }
    let expected_sha = manifest
        .get("dbSha256")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("manifest.json missing dbSha256"))?
        .to_string();

    extract_db_entry(&mut archive, tmp_dst, &expected_sha)
}

fn extract_db_entry(
    archive: &mut ZipArchive<File>,
    tmp_dst: &Path,
    expected_sha: &str,
) -> anyhow::Result<()> {
    let mut db_entry = archive
        .by_name(DB_ENTRY)
        .context("bundle missing db/records.sqlite3")?;
    let mut db_out = File::create(tmp_dst).with_context(|| {
        format!(
            "failed to create temp database {}",
            tmp_dst.to_string_lossy()
        )
    })?;
    std::io::copy(&mut db_entry, &mut db_out).context("failed to extract database entry")?;
    db_out
        .flush()
        .context("failed to flush extracted database")?;
    drop(db_out);

    let actual_sha = sha256_file(tmp_dst)?;
    if actual_sha != expected_sha {
        return Err(anyhow!(
            "database checksum mismatch: manifest {}, bundle {}",
            expected_sha,
            actual_sha
        ));
    }
    Ok(())
}

enum Signature {
    Zip,
    Sqlite,
    Unknown,
}

fn read_signature(path: &Path) -> anyhow::Result<Signature> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 16];
    let mut filled = 0;
    while filled < sig.len() {
        let n = f
            .read(&mut sig[filled..])
            .context("failed to read file signature")?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled >= 4 && sig[..4] == ZIP_SIGNATURE {
        return Ok(Signature::Zip);
    }
    if filled == sig.len() && &sig == SQLITE_SIGNATURE {
        return Ok(Signature::Sqlite);
    }
    Ok(Signature::Unknown)
}
