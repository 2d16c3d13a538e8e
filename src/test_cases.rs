use crate::Segmenter;

/// Run a segmenter against the built-in test cases
///
/// The expected segmentations assume the bundled `dict.txt` frequencies.
pub fn run(segmenter: &Segmenter) {
    for case in TEST_CASES.iter().copied() {
        assert_segments(case, segmenter);
    }
}

pub fn assert_segments(case: &[&str], segmenter: &Segmenter) {
    let text = case.concat();
    let cmp = segmenter.cut(&text).collect::<Vec<_>>();
    assert_eq!(cmp, case);
}

pub fn check_segments(case: &[&str], segmenter: &Segmenter) -> bool {
    let text = case.concat();
    segmenter.cut(&text).eq(case.iter().copied())
}

/// Built-in test cases
///
/// These are exposed so that you can test with different dictionaries.
pub const TEST_CASES: &[&[&str]] = &[
    &["我", "来到", "北京", "清华大学"],
    &["我", "来到", "北京", "天安门"],
    &["我", "是", "中国", "人"],
    &["他", "来到", "上海"],
    &["我", "的", "iPhone8", "也", "来到", "北京"],
    &["中国", "人", "在", "北京", "上海"],
];
