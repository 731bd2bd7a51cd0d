//! 보고서 데이터 모델
//!
//! Quay 보안 스캔 API의 응답 구조와 이미지별 결과, 배치 결과 집합을 정의합니다.
//! 와이어 필드명은 제공자의 PascalCase(`Layer`, `Features`, `Vulnerabilities`, ...)를
//! 따르며, 누락된 필드는 기본값으로 채워집니다.

use std::collections::HashMap;
use std::fmt;

use quayscan_core::types::Severity;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 보안 스캔 상태
///
/// 와이어에서는 일반 문자열(`"scanned"`, `"queued"`, ...)이며,
/// 알 수 없는 값은 [`ScanStatus::Other`]로 보존됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScanStatus {
    /// 스캔 완료. 피처 데이터가 유효함
    Scanned,
    /// 스캔 대기 중
    Queued,
    /// 스캔 실패
    Failed,
    /// 지원하지 않는 이미지
    Unsupported,
    /// 제공자가 정의한 그 밖의 상태
    Other(String),
}

impl ScanStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Scanned => "scanned",
            Self::Queued => "queued",
            Self::Failed => "failed",
            Self::Unsupported => "unsupported",
            Self::Other(s) => s,
        }
    }
}

impl Default for ScanStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for ScanStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "scanned" => Self::Scanned,
            "queued" => Self::Queued,
            "failed" => Self::Failed,
            "unsupported" => Self::Unsupported,
            _ => Self::Other(s),
        }
    }
}

impl From<ScanStatus> for String {
    fn from(status: ScanStatus) -> Self {
        match status {
            ScanStatus::Other(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 보안 스캔 보고서
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityReport {
    #[serde(default)]
    pub status: ScanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SecurityData>,
}

impl VulnerabilityReport {
    /// 데이터 없이 상태만 가진 보고서를 생성합니다.
    pub fn with_status(status: ScanStatus) -> Self {
        Self { status, data: None }
    }

    /// 스캔이 완료되어 피처 데이터를 신뢰할 수 있는지 여부
    pub fn is_scanned(&self) -> bool {
        self.status == ScanStatus::Scanned
    }

    /// 레이어의 피처 목록. 데이터가 없으면 빈 슬라이스입니다.
    pub fn features(&self) -> &[Feature] {
        self.data
            .as_ref()
            .map(|data| data.layer.features.as_slice())
            .unwrap_or_default()
    }

    /// (피처, 취약점) 쌍을 순회합니다.
    pub fn vulnerabilities(&self) -> impl Iterator<Item = (&Feature, &Vulnerability)> {
        self.features()
            .iter()
            .flat_map(|feature| feature.vulnerabilities.iter().map(move |v| (feature, v)))
    }

    pub fn vulnerability_count(&self) -> usize {
        self.features()
            .iter()
            .map(|feature| feature.vulnerabilities.len())
            .sum()
    }

    /// 심각도별 취약점 수를 집계합니다.
    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for (_, vuln) in self.vulnerabilities() {
            counts.record(vuln.severity_level());
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityData {
    #[serde(rename = "Layer", default)]
    pub layer: Layer,
}

/// 스캔된 이미지 레이어
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Layer {
    pub name: String,
    pub namespace_name: String,
    pub indexed_by_version: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub features: Vec<Feature>,
}

/// 이미지에 설치된 패키지
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Feature {
    pub name: String,
    pub version: String,
    pub version_format: String,
    pub namespace_name: String,
    pub added_by: String,
    #[serde(deserialize_with = "null_as_default")]
    pub vulnerabilities: Vec<Vulnerability>,
}

/// 패키지에 영향을 주는 취약점
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Vulnerability {
    pub name: String,
    pub namespace_name: String,
    pub description: String,
    pub link: String,
    pub severity: String,
    /// 수정 버전. 제공자가 빈 문자열을 보내면 `None`입니다.
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub fixed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Vulnerability {
    /// 제공자 심각도 문자열을 [`Severity`]로 변환합니다.
    pub fn severity_level(&self) -> Option<Severity> {
        Severity::from_str_loose(&self.severity)
    }
}

/// 심각도별 취약점 수
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    /// 알 수 없는 심각도
    pub unknown: usize,
}

impl SeverityCounts {
    fn record(&mut self, severity: Option<Severity>) {
        match severity {
            Some(Severity::Critical) => self.critical += 1,
            Some(Severity::High) => self.high += 1,
            Some(Severity::Medium) => self.medium += 1,
            Some(Severity::Low) => self.low += 1,
            Some(Severity::Info) => self.info += 1,
            None => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.info + self.unknown
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// 이미지 하나의 처리 결과
///
/// 정상 결과는 `report`와 `error` 중 정확히 하나를 가집니다.
/// 보고서 디코딩이 부분적으로만 성공한 경우 둘 다 존재할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageScanResult {
    /// 요청된 원본 참조 문자열
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<VulnerabilityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageScanResult {
    pub fn success(image_url: impl Into<String>, report: VulnerabilityReport) -> Self {
        Self {
            image_url: image_url.into(),
            report: Some(report),
            error: None,
        }
    }

    pub fn failure(image_url: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            image_url: image_url.into(),
            report: None,
            error: Some(error.to_string()),
        }
    }

    /// 부분 보고서가 있으면 함께 첨부한 실패 결과를 생성합니다.
    pub fn failure_with_partial(
        image_url: impl Into<String>,
        error: impl fmt::Display,
        partial: Option<VulnerabilityReport>,
    ) -> Self {
        Self {
            report: partial,
            ..Self::failure(image_url, error)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// 보고된 취약점 수 (실패 결과에 첨부된 부분 보고서 포함)
    pub fn vulnerability_count(&self) -> usize {
        self.report
            .as_ref()
            .map(VulnerabilityReport::vulnerability_count)
            .unwrap_or(0)
    }
}

/// 배치 결과 집합
///
/// 원본 참조 문자열을 키로 하는 맵입니다. 중복 입력은 하나의 항목으로 합쳐집니다.
/// JSON으로는 키가 정렬된 객체로 직렬화됩니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    results: HashMap<String, ImageScanResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: HashMap::with_capacity(capacity),
        }
    }

    /// 결과를 기록합니다. 같은 키가 있으면 덮어씁니다.
    pub fn insert(&mut self, result: ImageScanResult) {
        self.results.insert(result.image_url.clone(), result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, image_url: &str) -> Option<&ImageScanResult> {
        self.results.get(image_url)
    }

    pub fn contains(&self, image_url: &str) -> bool {
        self.results.contains_key(image_url)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImageScanResult)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 참조 문자열 순으로 정렬된 결과의 참조를 반환합니다.
    pub fn sorted(&self) -> Vec<&ImageScanResult> {
        let mut results: Vec<&ImageScanResult> = self.results.values().collect();
        results.sort_by(|a, b| a.image_url.cmp(&b.image_url));
        results
    }

    /// [`sorted`](Self::sorted)와 같은 순서로 결과를 소유권째 반환합니다.
    pub fn into_sorted(self) -> Vec<ImageScanResult> {
        let mut results: Vec<_> = self.results.into_values().collect();
        results.sort_by(|a, b| a.image_url.cmp(&b.image_url));
        results
    }

    pub fn success_count(&self) -> usize {
        self.results.values().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// 성공한 결과의 취약점 총합
    pub fn vulnerability_count(&self) -> usize {
        self.results
            .values()
            .filter(|r| r.is_success())
            .map(ImageScanResult::vulnerability_count)
            .sum()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut keys: Vec<&String> = self.results.keys().collect();
        keys.sort();
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for key in keys {
            map.serialize_entry(key, &self.results[key])?;
        }
        map.end()
    }
}

impl FromIterator<ImageScanResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = ImageScanResult>>(iter: I) -> Self {
        let mut set = Self::new();
        for result in iter {
            set.insert(result);
        }
        set
    }
}
