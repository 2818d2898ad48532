#![no_main]

use libfuzzer_sys::fuzz_target;
use pdbscope::{enc::DocumentId, EncSession};

fuzz_target!(|data: &[u8]| {
    let mut session = EncSession::default();
    if session.apply_delta(data, Vec::new()).is_err() {
        return;
    }

    if let Some(snapshot) = session.current() {
        for document in snapshot.documents().take(16) {
            let _ = snapshot.methods_containing(document, 1);
            let _ = snapshot.closest_line(document, 1);
        }
        let _ = snapshot.closest_line(DocumentId::new(1), 0);
    }
});
