// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: 2026 Trustfacts Contributors

#![no_main]

use libfuzzer_sys::fuzz_target;
use trustfacts_core::fetch::{last_page_number, parse_link_header};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let links = parse_link_header(s);
        if let Some(last) = links.last {
            let _ = last_page_number(&last);
        }
    }
});
