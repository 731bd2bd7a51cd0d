//! `quayscan scan` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use quayscan_core::config::QuayscanConfig;
use quayscan_core::types::Severity;
use quayscan_scanner::{
    ImageScanResult, ImageScannerBuilder, QuayClient, QuayClientConfig, ResultSet, ScannerConfig,
    VulnerabilityReport,
};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::input;
use crate::output::{OutputWriter, Render};

const TABLE_HEADERS: [&str; 6] = ["CVE", "Severity", "Package", "Version", "Fixed By", "Link"];
const COLUMN_GAP: usize = 2;

/// Execute the `scan` command.
pub async fn execute(
    args: ScanArgs,
    config: QuayscanConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let images = input::load_image_refs(&args).await?;

    let mut client_config = QuayClientConfig::from_core(&config.quay);
    if let Some(token) = args.token.as_deref() {
        client_config = client_config.with_token(token);
    }
    let client = QuayClient::new(client_config)?;

    let mut scanner_config = ScannerConfig::from_core(&config.scan);
    if let Some(workers) = args.workers {
        scanner_config.workers = workers;
    }

    let scanner = ImageScannerBuilder::new(Arc::new(client))
        .config(scanner_config)
        .build()?;

    info!(
        images = images.len(),
        workers = scanner.config().workers,
        "starting vulnerability scan"
    );
    let results = scanner.run(images).await;
    info!(
        succeeded = results.success_count(),
        failed = results.failure_count(),
        "vulnerability scan finished"
    );

    let report = ScanReport::new(results);
    writer.render(&report)?;

    let found = report.vulnerability_count();
    if args.fail_on_vulns && found > 0 {
        return Err(CliError::Scan(format!("found {found} vulnerabilities")));
    }

    Ok(())
}

/// Batch scan output.
///
/// Serialises as the result set itself: an object keyed by image reference.
#[derive(Serialize)]
#[serde(transparent)]
pub struct ScanReport {
    results: ResultSet,
}

impl ScanReport {
    pub fn new(results: ResultSet) -> Self {
        Self { results }
    }

    pub fn vulnerability_count(&self) -> usize {
        self.results.vulnerability_count()
    }
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for (index, result) in self.results.sorted().into_iter().enumerate() {
            if index > 0 {
                writeln!(w)?;
                writeln!(w, "{}", "=".repeat(80))?;
            }
            render_result(result, w)?;
        }
        Ok(())
    }
}

fn render_result(result: &ImageScanResult, w: &mut dyn Write) -> std::io::Result<()> {
    use colored::Colorize;

    writeln!(w, "Scan Report for: {}", result.image_url.bold())?;
    writeln!(w, "{}", "-".repeat(result.image_url.len() + 17))?;

    if let Some(ref error) = result.error {
        writeln!(w, "  Error: {}", error.red())?;
        return Ok(());
    }

    let Some(ref report) = result.report else {
        writeln!(w, "  Error: {}", "no report data available".red())?;
        return Ok(());
    };

    writeln!(w, "  Scan Status: {}", report.status)?;

    if !report.is_scanned() {
        writeln!(
            w,
            "  No detailed vulnerability data available (scan may be queued or failed)."
        )?;
        return Ok(());
    }

    if report.features().is_empty() {
        writeln!(w, "  No features with vulnerabilities found in the scan data.")?;
        return Ok(());
    }

    if report.vulnerability_count() == 0 {
        writeln!(w)?;
        writeln!(w, "  {}", "No vulnerabilities found for this image.".green())?;
        return Ok(());
    }

    let counts = report.severity_counts();
    writeln!(
        w,
        "  Vulnerabilities: {}",
        format!(
            "{} total (C:{} H:{} M:{} L:{} I:{} ?:{})",
            counts.total(),
            counts.critical,
            counts.high,
            counts.medium,
            counts.low,
            counts.info,
            counts.unknown
        )
        .red()
        .bold()
    )?;

    render_table(report, w)
}

fn render_table(report: &VulnerabilityReport, w: &mut dyn Write) -> std::io::Result<()> {
    let rows: Vec<[&str; 6]> = report
        .vulnerabilities()
        .map(|(feature, vuln)| {
            [
                vuln.name.as_str(),
                vuln.severity.as_str(),
                feature.name.as_str(),
                feature.version.as_str(),
                vuln.fixed_by.as_deref().unwrap_or("N/A"),
                vuln.link.as_str(),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let underline = TABLE_HEADERS.map(|h| "-".repeat(h.len()));
    write_row(w, &TABLE_HEADERS, &widths, None)?;
    write_row(w, &underline.each_ref().map(String::as_str), &widths, None)?;
    for row in &rows {
        write_row(w, row, &widths, Severity::from_str_loose(row[1]))?;
    }
    writeln!(w)?;
    Ok(())
}

/// Writes one indented table row. The last column is not padded.
fn write_row(
    w: &mut dyn Write,
    cells: &[&str; 6],
    widths: &[usize; 6],
    severity: Option<Severity>,
) -> std::io::Result<()> {
    let mut line = String::from("  ");
    let last = cells.len() - 1;
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i == last {
            line.push_str(cell);
            break;
        }
        let padded = format!("{cell:<pad$}", pad = width + COLUMN_GAP);
        if i == 1 {
            line.push_str(&paint_severity(&padded, severity));
        } else {
            line.push_str(&padded);
        }
    }
    writeln!(w, "{}", line.trim_end())
}

fn paint_severity(text: &str, severity: Option<Severity>) -> String {
    use colored::Colorize;

    match severity {
        Some(Severity::Critical) => text.red().bold().to_string(),
        Some(Severity::High) => text.red().to_string(),
        Some(Severity::Medium) => text.yellow().to_string(),
        Some(Severity::Info) => text.dimmed().to_string(),
        Some(Severity::Low) | None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quayscan_scanner::{Feature, Layer, ScanStatus, SecurityData, Vulnerability};

    fn report(features: Vec<Feature>) -> VulnerabilityReport {
        VulnerabilityReport {
            status: ScanStatus::Scanned,
            data: Some(SecurityData {
                layer: Layer {
                    features,
                    ..Default::default()
                },
            }),
        }
    }

    fn openssl_feature() -> Feature {
        Feature {
            name: "openssl".to_owned(),
            version: "3.0.11".to_owned(),
            vulnerabilities: vec![
                Vulnerability {
                    name: "CVE-2023-0001".to_owned(),
                    severity: "High".to_owned(),
                    link: "https://example.com/CVE-2023-0001".to_owned(),
                    fixed_by: Some("3.0.12".to_owned()),
                    ..Default::default()
                },
                Vulnerability {
                    name: "CVE-2023-0002".to_owned(),
                    severity: "Low".to_owned(),
                    link: "https://example.com/CVE-2023-0002".to_owned(),
                    fixed_by: None,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    fn render(report: &ScanReport) -> String {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    fn result_set(results: Vec<ImageScanResult>) -> ScanReport {
        ScanReport::new(results.into_iter().collect())
    }

    #[test]
    fn test_render_vulnerability_table() {
        let scan = result_set(vec![ImageScanResult::success(
            "quay.io/org/app:v1",
            report(vec![openssl_feature()]),
        )]);

        let output = render(&scan);

        assert!(output.starts_with("Scan Report for: quay.io/org/app:v1\n"));
        assert!(output.contains(&format!("\n{}\n", "-".repeat("quay.io/org/app:v1".len() + 17))));
        assert!(output.contains("  Scan Status: scanned"));
        assert!(output.contains("2 total (C:0 H:1 M:0 L:1 I:0 ?:0)"));
        assert!(output.contains("  CVE            Severity  Package  Version  Fixed By  Link\n"));
        assert!(output.contains(
            "  CVE-2023-0001  High      openssl  3.0.11   3.0.12    https://example.com/CVE-2023-0001\n"
        ));
        assert!(
            output.contains("  CVE-2023-0002  Low       openssl  3.0.11   N/A       https://example.com/CVE-2023-0002\n"),
            "missing fix should render as N/A:\n{output}"
        );
    }

    #[test]
    fn test_render_sorted_with_separators() {
        let scan = result_set(vec![
            ImageScanResult::failure("quay.io/org/zeta:v1", "resolving image id failed: boom"),
            ImageScanResult::success("quay.io/org/alpha:v1", report(Vec::new())),
        ]);

        let output = render(&scan);

        let alpha = output.find("quay.io/org/alpha:v1").expect("alpha rendered");
        let zeta = output.find("quay.io/org/zeta:v1").expect("zeta rendered");
        assert!(alpha < zeta, "results should be sorted by reference");
        assert_eq!(output.matches(&"=".repeat(80)).count(), 1);
        assert!(output.contains("  Error: resolving image id failed: boom"));
        assert!(output.contains("No features with vulnerabilities found"));
    }

    #[test]
    fn test_render_no_vulnerabilities() {
        let clean = Feature {
            name: "zlib".to_owned(),
            version: "1.3".to_owned(),
            ..Default::default()
        };
        let scan = result_set(vec![ImageScanResult::success(
            "quay.io/org/app:v1",
            report(vec![clean]),
        )]);

        let output = render(&scan);

        assert!(output.contains("No vulnerabilities found for this image."));
        assert!(!output.contains("Fixed By"));
    }

    #[test]
    fn test_render_not_scanned_status() {
        let scan = result_set(vec![ImageScanResult::success(
            "quay.io/org/app:v1",
            VulnerabilityReport::with_status(ScanStatus::Queued),
        )]);

        let output = render(&scan);

        assert!(output.contains("  Scan Status: queued"));
        assert!(output.contains("scan may be queued or failed"));
    }

    #[test]
    fn test_json_is_keyed_by_reference() {
        let scan = result_set(vec![
            ImageScanResult::success("quay.io/org/b:v1", report(vec![openssl_feature()])),
            ImageScanResult::failure("quay.io/org/a:v1", "parsing failed: bad"),
        ]);

        let json = serde_json::to_string_pretty(&scan).expect("json serialization");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        assert!(json.find("quay.io/org/a:v1") < json.find("quay.io/org/b:v1"));
        assert_eq!(
            parsed["quay.io/org/a:v1"]["error"].as_str(),
            Some("parsing failed: bad")
        );
        assert_eq!(
            parsed["quay.io/org/b:v1"]["imageUrl"].as_str(),
            Some("quay.io/org/b:v1")
        );
        assert_eq!(
            parsed["quay.io/org/b:v1"]["report"]["data"]["Layer"]["Features"][0]["Name"].as_str(),
            Some("openssl")
        );
    }

    #[test]
    fn test_vulnerability_count_includes_all_images() {
        let scan = result_set(vec![
            ImageScanResult::success("quay.io/org/a:v1", report(vec![openssl_feature()])),
            ImageScanResult::success("quay.io/org/b:v1", report(vec![openssl_feature()])),
        ]);

        assert_eq!(scan.vulnerability_count(), 4);
    }
}
