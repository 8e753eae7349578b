#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let doc = match kbin::decode(data) {
        Ok(doc) => doc,
        Err(_) => return,
    };
    // Whatever the encoder produces must decode again and encode to the same bytes
    if let Ok(bytes) = kbin::encode(&doc) {
        let again = kbin::decode(&bytes).expect("decoding encoder output");
        assert_eq!(kbin::encode(&again).expect("re-encoding"), bytes);
    }
});
