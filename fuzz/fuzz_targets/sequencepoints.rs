#![no_main]

use libfuzzer_sys::fuzz_target;
use pdbscope::metadata::sequencepoints::SequencePointsBlob;

fuzz_target!(|data: &[u8]| {
    let Some((&document, blob)) = data.split_first() else {
        return;
    };

    let document = (document != 0).then_some(u32::from(document));
    if let Ok(decoded) = SequencePointsBlob::decode(blob, document) {
        // Whatever decodes must encode back to the same bytes
        let encoded = decoded.encode().expect("decoded blob must encode");
        assert_eq!(encoded, blob);
    }
});
