#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use quayscan_scanner::ImageReference;

/// 저장소/태그 쌍으로 구성한 참조 입력
#[derive(Arbitrary, Debug)]
struct FuzzReference {
    repository: String,
    tag: String,
}

fuzz_target!(|input: FuzzReference| {
    let raw = format!("quay.io/{}:{}", input.repository, input.tag);
    let Ok(image) = ImageReference::parse(&raw) else {
        return;
    };

    // Display 결과를 다시 파싱하면 같은 참조가 나와야 함
    let reparsed = ImageReference::parse(&image.to_string())
        .expect("displayed reference must parse again");
    assert_eq!(reparsed, image);
});
