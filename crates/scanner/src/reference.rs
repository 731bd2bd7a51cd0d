//! 이미지 참조 파싱
//!
//! `quay.io/<repository>:<tag>` 형식의 문자열을 [`ImageReference`]로 분해합니다.
//! 파싱은 순수 함수이며 네트워크에 접근하지 않습니다.
//!
//! # 규칙
//!
//! - 반드시 `quay.io/`로 시작해야 합니다.
//! - 나머지는 **첫 번째** `:`에서 저장소와 태그로 나뉘며, 둘 다 비어 있으면 안 됩니다.
//! - 저장소와 태그에 `..`가 포함되면 안 되고, 태그에 `/`가 포함되면 안 됩니다.
//!
//! # 사용 예시
//!
//! ```
//! use quayscan_scanner::ImageReference;
//!
//! let image: ImageReference = "quay.io/coreos/etcd:v3.5.0".parse().unwrap();
//! assert_eq!(image.repository(), "coreos/etcd");
//! assert_eq!(image.tag(), "v3.5.0");
//! assert_eq!(image.to_string(), "quay.io/coreos/etcd:v3.5.0");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ReferenceError;

/// 지원하는 레지스트리 호스트 접두어
pub const REGISTRY_PREFIX: &str = "quay.io/";

const DIGEST_SCHEME_PREFIX: &str = "sha256:";

/// 파싱된 이미지 참조
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    repository: String,
    tag: String,
}

impl ImageReference {
    /// 참조 문자열을 파싱합니다.
    ///
    /// # Errors
    ///
    /// - [`ReferenceError::BadPrefix`]: `quay.io/` 접두어 없음
    /// - [`ReferenceError::BadFormat`]: `:` 구분자가 없거나 저장소/태그가 비어 있음
    /// - [`ReferenceError::InvalidChars`]: `..` 또는 태그 내 `/`
    pub fn parse(raw: &str) -> Result<Self, ReferenceError> {
        let rest = raw
            .strip_prefix(REGISTRY_PREFIX)
            .ok_or_else(|| ReferenceError::BadPrefix {
                input: raw.to_owned(),
            })?;

        let (repository, tag) = rest
            .split_once(':')
            .filter(|(repository, tag)| !repository.is_empty() && !tag.is_empty())
            .ok_or_else(|| ReferenceError::BadFormat {
                input: raw.to_owned(),
            })?;

        if repository.contains("..") || tag.contains("..") || tag.contains('/') {
            return Err(ReferenceError::InvalidChars {
                input: raw.to_owned(),
            });
        }

        Ok(Self {
            repository: repository.to_owned(),
            tag: tag.to_owned(),
        })
    }

    /// 저장소 경로 (`namespace/name`, 중첩 가능)
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// 태그
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl FromStr for ImageReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REGISTRY_PREFIX}{}:{}", self.repository, self.tag)
    }
}

/// 이미지 콘텐츠 다이제스트
///
/// `sha256:` 접두어가 제거된 상태로 저장되며, 생성 시 비어 있지 않음이 보장됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageDigest(String);

impl ImageDigest {
    /// 원시 다이제스트 문자열에서 생성합니다.
    ///
    /// 접두어 제거 후 비어 있으면 `None`을 반환합니다.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.strip_prefix(DIGEST_SCHEME_PREFIX).unwrap_or(raw);
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
