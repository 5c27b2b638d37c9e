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

// parse.rs
// racadm has no structured output. Every dump is a run of "label = value"
// lines, sometimes grouped into records by a delimiter line. This is the one
// place that knows how to pull values out of them; the dump layouts live in
// the model modules as lists of Field.

use crate::RacadmError;

/// A labelled value in a console dump. The value starts right after `label`
/// and runs to `terminator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub terminator: &'static str,
}

impl Field {
    pub const fn new(label: &'static str, terminator: &'static str) -> Self {
        Field { label, terminator }
    }

    /// A value that runs to the end of its line.
    pub const fn line(label: &'static str) -> Self {
        Field::new(label, "\n")
    }
}

// field_not_found creates a RacadmError::FieldNotFound error.
fn field_not_found(field: &Field) -> RacadmError {
    RacadmError::FieldNotFound {
        label: field.label.trim().to_string(),
    }
}

// extract returns the trimmed text between the first occurrence of the field's
// label and the following terminator (or the end of the dump). A missing label
// means the command failed or its format changed, so it is an error rather
// than an empty value.
pub fn extract<'a>(dump: &'a str, field: &Field) -> Result<&'a str, RacadmError> {
    let start = dump
        .find(field.label)
        .ok_or_else(|| field_not_found(field))?
        + field.label.len();
    let rest = &dump[start..];
    let end = rest.find(field.terminator).unwrap_or(rest.len());
    Ok(rest[..end].trim())
}

// extract_owned is extract for callers that keep the value past the dump.
pub fn extract_owned(dump: &str, field: &Field) -> Result<String, RacadmError> {
    extract(dump, field).map(str::to_string)
}

// chunks splits a dump on a record delimiter. The first chunk is whatever
// preceded the first delimiter, usually the echoed command.
pub fn chunks<'a>(dump: &'a str, delimiter: &'a str) -> impl Iterator<Item = &'a str> {
    dump.split(delimiter)
}

// is_echo reports whether a chunk is the shell echoing our own command back.
pub fn is_echo(chunk: &str) -> bool {
    chunk.contains("racadm")
}

// records is chunks without the blank pieces and the command echo.
pub fn records<'a>(dump: &'a str, delimiter: &'a str) -> impl Iterator<Item = &'a str> {
    chunks(dump, delimiter).filter(|c| !c.trim().is_empty() && !is_echo(c))
}

// strip_echo drops the first line of a reply, where the shell echoes our command.
// Whatever the command contained cannot then be mistaken for the answer.
pub fn strip_echo(reply: &str) -> &str {
    reply.split_once('\n').map_or("", |(_, rest)| rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSION: Field = Field::new("Firmware Version        = ", "\r\n");

    // test_extract_success tests that extract stops at the terminator.
    #[test]
    fn test_extract_success() {
        let dump = "RAC Information:\r\nFirmware Version        = 2.30.30.30\r\nFirmware Build          = 50\r\n";
        assert_eq!(extract(dump, &VERSION).unwrap(), "2.30.30.30");
    }

    // test_extract_missing_label tests the error when the label is not in the dump.
    #[test]
    fn test_extract_missing_label() {
        let result = extract("ERROR: Invalid subcommand specified.\r\n", &VERSION);
        match result {
            Err(RacadmError::FieldNotFound { label }) => assert_eq!(label, "Firmware Version        ="),
            other => panic!("unexpected {other:?}"),
        }
    }

    // test_extract_without_terminator tests that a value at the end of the dump is returned whole.
    #[test]
    fn test_extract_without_terminator() {
        let field = Field::line("Status=");
        assert_eq!(extract("Status=Completed ", &field).unwrap(), "Completed");
    }

    // test_extract_line_trims_carriage_return tests that CRLF dumps work with a "\n" terminator.
    #[test]
    fn test_extract_line_trims_carriage_return() {
        let field = Field::line("Message=");
        let dump = "Message=[JCP000: Downloading]\r\nStatus=Downloading\r\n";
        assert_eq!(extract(dump, &field).unwrap(), "[JCP000: Downloading]");
    }

    // test_strip_echo tests that only the echoed command line is dropped.
    #[test]
    fn test_strip_echo() {
        let reply = "racadm set x successfully\r\nERROR: rejected\r\n/admin1-> ";
        assert_eq!(strip_echo(reply), "ERROR: rejected\r\n/admin1-> ");
        assert_eq!(strip_echo("racadm>> "), "");
    }

    // test_records_skip_echo_and_blank tests the chunk filter.
    #[test]
    fn test_records_skip_echo_and_blank() {
        let dump = "racadm raid get pdisks\r\n|A\r\n|\n|B\r\n";
        let got: Vec<&str> = records(dump, "|").collect();
        assert_eq!(got, vec!["A\r\n", "B\r\n"]);
    }
}
