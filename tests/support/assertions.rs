use alloy_primitives::U256;

pub fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

pub fn assert_u256_near(actual: U256, expected: U256, tolerance: U256) {
    let diff = abs_diff(actual, expected);
    assert!(
        diff <= tolerance,
        "expected {} ± {}, got {} (off by {})",
        expected,
        tolerance,
        actual,
        diff
    );
}
