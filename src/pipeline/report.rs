//! Conversion report types.
//!
//! One conversion call produces one report: which outputs were written with
//! how many bands, plus notes about what the pipeline did along the way
//! (dead bands dropped at read, overlap bands removed by fusion, unmapped
//! GLT cells, the unverified-accuracy caveat on 2D pass-through).

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A report generated by one conversion call.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionReport {
    /// Product identifier the outputs are named after.
    pub product_id: String,
    /// Processing level token ("2B", "2C", "2D").
    pub level: String,
    /// Output format name.
    pub format: String,
    /// Files written, in write order.
    pub written: Vec<WrittenFile>,
    /// Issues discovered during conversion.
    pub issues: Vec<ConversionIssue>,
}

impl ConversionReport {
    pub fn new(
        product_id: impl Into<String>,
        level: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            level: level.into(),
            format: format.into(),
            ..Default::default()
        }
    }

    /// Record a written raster or side-car.
    pub fn record(&mut self, path: PathBuf, bands: usize) {
        self.written.push(WrittenFile { path, bands });
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ConversionIssue) {
        self.issues.push(issue);
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Warning)
            .count()
    }

    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Info)
            .count()
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} (L{}) -> {}: {} file(s) written",
            self.product_id,
            self.level,
            self.format,
            self.written.len()
        )?;
        for file in &self.written {
            if file.bands > 0 {
                writeln!(f, "  {} ({} band(s))", file.path.display(), file.bands)?;
            } else {
                writeln!(f, "  {}", file.path.display())?;
            }
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", warnings)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ConversionSeverity::Warning)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }
        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ConversionSeverity::Info)
            {
                writeln!(f, "  - {}", issue.message)?;
            }
        }
        Ok(())
    }
}

/// One output file with its band count (zero for side-car tables).
#[derive(Clone, Debug, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bands: usize,
}

/// A single issue discovered during conversion.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionIssue {
    pub severity: ConversionSeverity,
    pub code: ConversionIssueCode,
    pub message: String,
}

impl ConversionIssue {
    pub fn warning(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn info(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Info,
            code,
            message: message.into(),
        }
    }
}

/// Severity level for conversion issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSeverity {
    Warning,
    Info,
}

/// Stable issue codes for programmatic consumption.
///
/// These codes are part of the JSON schema and should remain stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionIssueCode {
    /// Bands with a zero center wavelength were dropped at read time.
    DeadBandsDropped,
    /// Fusion removed overlap bands from the non-prioritized spectrometer.
    OverlapBandsDropped,
    /// The GLT left cells with no source pixel.
    UnmappedCells,
    /// 2D grids are passed through unchanged; their accuracy is unverified.
    PassThroughProjectionUnverified,
    /// Scene written without georeferencing (base_georef disabled).
    UngeoreferencedOutput,
}
