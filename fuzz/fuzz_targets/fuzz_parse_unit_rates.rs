#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary response bodies must never panic the parser
    let Ok(rates) = plunge::rates::parse_unit_rates(data) else {
        return;
    };

    let ranges = plunge::negative::negative_ranges(&rates);
    for range in &ranges {
        assert!(range.from < range.to);
    }
    for pair in ranges.windows(2) {
        assert!(pair[0].from <= pair[1].from);
    }
});
