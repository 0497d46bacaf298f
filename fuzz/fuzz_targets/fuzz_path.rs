// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for NotePath parsing and manipulation

#![no_main]

use libfuzzer_sys::fuzz_target;
use lockin_core::{markup::sidecar_path, NotePath};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let path = NotePath::new(input);

        // Parsing is stable under re-rendering and never yields empty or
        // relative segments.
        assert_eq!(NotePath::new(path.as_string()), path);
        assert!(path.segments().iter().all(|s| !s.is_empty() && s != "." && s != ".."));

        let _ = path.name();
        let _ = path.extension();
        let _ = path.stem();

        if let Some(parent) = path.parent() {
            assert!(path.starts_with(&parent));
            assert_eq!(parent.depth() + 1, path.depth());
        }

        if !path.is_root() {
            assert_eq!(sidecar_path(&path).parent(), path.parent());
        }

        if let Some((head, tail)) = input.split_once('/') {
            let joined = NotePath::new(head).join(tail);
            assert!(joined.depth() <= NotePath::new(head).depth() + tail.split('/').count());
        }
    }
});
