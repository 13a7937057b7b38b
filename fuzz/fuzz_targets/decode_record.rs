#![no_main]
use field_pack::{decompress_fields, print, Arena, Registry};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let registry = Registry::default();
    let mut arena = Arena::with_limit(1 << 20);
    let _ = decompress_fields(&registry, data, &mut arena);
    assert_eq!(arena.watermark(), 0);
    let _ = print::to_text(&registry, data, &mut arena);
    assert_eq!(arena.watermark(), 0);
});
