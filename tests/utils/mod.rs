// Integration test utilities
//
// Builders for on-disk message corpora and helpers for reading reports back.

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const ADT_A01: &str = "MSH|^~\\&|REG|HOSP|||20240101120000||ADT^A01|1001|P|2.5\r\
EVN|A01|20240101120000\r\
PID|1||100^^^HOSP^MR~200^^^SSA^SS||Doe^John||19800101|M\r\
PV1|1|I|W1^101^A||||1234^Welby^Marcus";

pub const ADT_A01_NO_EVN: &str = "MSH|^~\\&|REG|HOSP|||20240101130000||ADT^A01|1002|P|2.5\r\
PID|1||101^^^HOSP^MR||Roe^Jane||19750505|F\r\
PV1|1|O";

pub const ORU_R01: &str = "MSH|^~\\&|LAB|HOSP|||20240102080000||ORU^R01|2001|P|2.5\r\
PID|1||102^^^HOSP^MR||Poe^Ann||19900909|F\r\
OBR|1|ORD1|FIL1|CBC^Complete Blood Count\r\
OBX|1|NM|GLU^Glucose||105|mg/dL\r\
OBX|2|NM|HGB^Hemoglobin||13.5|g/dL";

/// A temporary input directory populated with message files
pub struct Corpus {
    pub dir: TempDir,
}

impl Corpus {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("Failed to create temp dir")?,
        })
    }

    /// Write `content` to `name` (relative, nested directories allowed)
    pub fn add(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a report under a separate output directory
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.dir.path().join("out").join(name)
    }
}

/// The standard three-message corpus used across tests
pub fn standard_corpus() -> Result<Corpus> {
    let corpus = Corpus::new()?;
    corpus.add("adt/a01_1.hl7", ADT_A01)?;
    corpus.add("adt/a01_2.hl7", ADT_A01_NO_EVN)?;
    corpus.add("lab/oru_1.hl7", ORU_R01)?;
    Ok(corpus)
}

pub fn read_report(path: &Path) -> Result<serde_json::Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    serde_json::from_str(&text).context("Report is not valid JSON")
}
