// SPDX-License-Identifier: Apache-2.0
// SPDX-FileCopyrightText: 2026 Trustfacts Contributors

#![no_main]

use libfuzzer_sys::fuzz_target;
use trustfacts_core::MetricRequest;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(request) = MetricRequest::from_json(s) {
            let _ = request.project();
        }
    }
});
