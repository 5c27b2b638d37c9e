/*
 * SPDX-FileCopyrightText: Copyright (c) 2023 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: MIT
 *
 * Permission is hereby granted, free of charge, to any person obtaining a
 * copy of this software and associated documentation files (the "Software"),
 * to deal in the Software without restriction, including without limitation
 * the rights to use, copy, modify, merge, publish, distribute, sublicense,
 * and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
 * THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
 * FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
 * DEALINGS IN THE SOFTWARE.
 */
//! Firmware version ordering.
//!
//! Dell versions are mostly dotted decimals ("2.30.30.30", "2.19.1") but not
//! always ("1.0.0-A00", "A07"). A version is split on `.` and `-`, and every
//! piece further into runs of digits and runs of anything else, so "A10"
//! becomes `A`, `10`. Runs compare pairwise: numbers as numbers, text as
//! text, and a number sorts before text. The shorter version is padded with
//! zeros, so "1.0" == "1.0.0" and "1.0" < "1.0.a".

use std::{cmp::Ordering, fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Number(String),
    Text(String),
}

impl Part {
    fn order(&self, other: &Part) -> Ordering {
        match (self, other) {
            (Part::Number(a), Part::Number(b)) => cmp_numeric(a, b),
            (Part::Text(a), Part::Text(b)) => a.cmp(b),
            (Part::Number(_), Part::Text(_)) => Ordering::Less,
            (Part::Text(_), Part::Number(_)) => Ordering::Greater,
        }
    }
}

static PADDING: Part = Part::Number(String::new());

#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    parts: Vec<Part>,
}

impl Version {
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

// Splits one piece into alternating digit and non-digit runs.
fn runs(piece: &str) -> impl Iterator<Item = Part> + '_ {
    let mut rest = piece;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let numeric = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != numeric)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some(if numeric {
            Part::Number(run.to_string())
        } else {
            Part::Text(run.to_string())
        })
    })
}

impl From<&str> for Version {
    fn from(raw: &str) -> Self {
        let raw = raw.trim();
        Version {
            raw: raw.to_string(),
            parts: raw
                .split(['.', '-'])
                .map(str::trim)
                .flat_map(runs)
                .collect(),
        }
    }
}

impl From<String> for Version {
    fn from(raw: String) -> Self {
        Version::from(raw.as_str())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// Compares digit strings of any length without parsing them. The empty
// string is zero.
fn cmp_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Orders two versions. Never fails: a string with no parts at all ("", "...") is all
/// padding and equals "0".
pub fn compare(a: &Version, b: &Version) -> Ordering {
    let len = a.parts.len().max(b.parts.len());
    (0..len)
        .map(|i| {
            let x = a.parts.get(i).unwrap_or(&PADDING);
            let y = b.parts.get(i).unwrap_or(&PADDING);
            x.order(y)
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}
