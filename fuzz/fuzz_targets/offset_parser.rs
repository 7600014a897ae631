#![no_main]

use libfuzzer_sys::fuzz_target;

// The offset flag parser must never panic, whatever the shell hands it.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = xdma_diag::cli::parse_offset(text);
    }
});
