#![no_main]

use libfuzzer_sys::fuzz_target;
use quayscan_scanner::ImageReference;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(image) = ImageReference::parse(input) {
            // 파싱에 성공한 참조는 항상 불변식을 만족해야 함
            assert!(!image.repository().is_empty());
            assert!(!image.tag().is_empty());
            assert!(!image.repository().contains(".."));
            assert!(!image.tag().contains(".."));
            assert!(!image.tag().contains('/'));
        }
    }
});
