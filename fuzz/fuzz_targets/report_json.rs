#![no_main]

use libfuzzer_sys::fuzz_target;
use quayscan_scanner::VulnerabilityReport;

fuzz_target!(|data: &[u8]| {
    if let Ok(report) = serde_json::from_slice::<VulnerabilityReport>(data) {
        let counts = report.severity_counts();
        assert_eq!(counts.total(), report.vulnerability_count());

        // 디코딩된 보고서는 다시 직렬화할 수 있어야 함
        let _ = serde_json::to_vec(&report).expect("decoded report must serialize");
    }
});
